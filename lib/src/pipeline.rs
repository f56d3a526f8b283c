use std::num::NonZeroUsize;

use tracing::debug;

use crate::{aggregate, bucketize, AggregatedRow, FieldPolicy, Sample};

/// Chart resolution used by the wind service: one point every five minutes
/// across a day.
pub const DEFAULT_POINTS: NonZeroUsize = match NonZeroUsize::new(24 * 60 / 5) {
    Some(n) => n,
    None => panic!("zero points"),
};

/// Output of [`downsample`]. Short inputs pass through untouched, so callers
/// must not assume every result went through the policy table.
#[derive(Debug, Clone, PartialEq)]
pub enum Downsampled {
    Raw(Vec<Sample>),
    Aggregated(Vec<AggregatedRow>),
}

impl Downsampled {
    pub fn len(&self) -> usize {
        match self {
            Downsampled::Raw(samples) => samples.len(),
            Downsampled::Aggregated(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_aggregated(&self) -> bool {
        matches!(self, Downsampled::Aggregated(_))
    }
}

/// Reduce time-ordered samples to at most `target` rows.
///
/// With fewer samples than `target` the samples are returned as they are.
/// Otherwise they are split into contiguous buckets and each bucket is
/// reduced through `policy`, keeping time order.
pub fn downsample(samples: Vec<Sample>, target: NonZeroUsize, policy: &FieldPolicy) -> Downsampled {
    if samples.len() < target.get() {
        debug!(samples = samples.len(), points = target.get(), "passing samples through");
        return Downsampled::Raw(samples);
    }

    let buckets = bucketize(samples.len(), target);
    debug!(
        samples = samples.len(),
        points = target.get(),
        step = buckets.step(),
        "downsampling"
    );
    let rows = buckets
        .map(|range| aggregate(&samples[range], policy))
        .collect();
    Downsampled::Aggregated(rows)
}

/// A point count and policy bundled together, shareable across threads.
#[derive(Debug, Clone)]
pub struct Downsampler {
    target: NonZeroUsize,
    policy: FieldPolicy,
}

impl Default for Downsampler {
    fn default() -> Self {
        Downsampler::new(DEFAULT_POINTS, FieldPolicy::wind())
    }
}

impl Downsampler {
    pub fn new(target: NonZeroUsize, policy: FieldPolicy) -> Self {
        Downsampler { target, policy }
    }

    pub fn target(&self) -> NonZeroUsize {
        self.target
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    pub fn run(&self, samples: Vec<Sample>) -> Downsampled {
        downsample(samples, self.target, &self.policy)
    }
}
