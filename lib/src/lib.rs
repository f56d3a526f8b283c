mod aggregate;
mod bucket;
mod error;
mod pipeline;
mod policy;
mod query;
mod sample;
mod source;
mod table;

pub use aggregate::*;
pub use bucket::*;
pub use error::*;
pub use pipeline::*;
pub use policy::*;
pub use query::*;
pub use sample::*;
pub use source::*;
pub use table::*;
