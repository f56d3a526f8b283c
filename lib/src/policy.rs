use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::{Error, Result};

/// How the values of one field are reduced to a single value per bucket.
/// Every kind ignores null values and yields null when none are left.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Reduction {
    Max,
    Sum,
    Mean,
    /// Mean over a periodic domain of width `period`, e.g. 360 for compass
    /// degrees, so that 350 and 10 average to 0 rather than 180.
    CircularMean { period: f64 },
}

impl Reduction {
    pub const DEGREES: Reduction = Reduction::CircularMean { period: 360.0 };
}

impl FromStr for Reduction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "max" => return Ok(Reduction::Max),
            "sum" => return Ok(Reduction::Sum),
            "mean" => return Ok(Reduction::Mean),
            "circular" => return Ok(Reduction::DEGREES),
            _ => {}
        }

        let period = s
            .strip_prefix("circular:")
            .ok_or_else(|| Error::Policy(format!("unknown reduction {:?}", s)))?;
        let period: f64 = period
            .trim()
            .parse()
            .map_err(|_| Error::Policy(format!("bad circular period {:?}", period)))?;
        if !period.is_finite() || period <= 0.0 {
            return Err(Error::Policy(format!(
                "circular period must be positive, got {}",
                period
            )));
        }
        Ok(Reduction::CircularMean { period })
    }
}

impl TryFrom<String> for Reduction {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reduction::Max => write!(f, "max"),
            Reduction::Sum => write!(f, "sum"),
            Reduction::Mean => write!(f, "mean"),
            Reduction::CircularMean { period } => write!(f, "circular:{}", period),
        }
    }
}

/// Ordered table of field name to reduction. Aggregated rows carry exactly
/// these fields, in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPolicy {
    fields: Vec<(Arc<str>, Reduction)>,
}

impl FieldPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wind-chart policy: peak gust, mean wind and timestamp, and the
    /// circular mean of the compass direction, in that column order.
    pub fn wind() -> Self {
        FieldPolicy::new()
            .with("gust", Reduction::Max)
            .with("wind", Reduction::Mean)
            .with("timestamp", Reduction::Mean)
            .with("direction", Reduction::DEGREES)
    }

    /// Adds `field`, replacing the reduction in place if it is already present.
    pub fn with(mut self, field: &str, reduction: Reduction) -> Self {
        match self.fields.iter_mut().find(|(name, _)| &**name == field) {
            Some(entry) => entry.1 = reduction,
            None => self.fields.push((Arc::from(field), reduction)),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<Reduction> {
        self.fields
            .iter()
            .find(|(name, _)| &**name == field)
            .map(|(_, r)| *r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, Reduction)> {
        self.fields.iter().map(|(name, r)| (name, *r))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| &**name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parses `"wind=mean,gust=max,direction=circular:360"`.
impl FromStr for FieldPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut policy = FieldPolicy::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, reduction) = part
                .split_once('=')
                .ok_or_else(|| Error::Policy(format!("expected field=reduction, got {:?}", part)))?;
            let field = field.trim();
            if field.is_empty() {
                return Err(Error::Policy(format!("missing field name in {:?}", part)));
            }
            policy = policy.with(field, reduction.parse()?);
        }
        if policy.is_empty() {
            return Err(Error::Policy("empty policy".to_string()));
        }
        Ok(policy)
    }
}

impl fmt::Display for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (field, reduction)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", field, reduction)?;
        }
        Ok(())
    }
}

// Deserialized from a map so configuration files keep the order they list
// fields in, where the format preserves it.
impl<'de> Deserialize<'de> for FieldPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PolicyVisitor;

        impl<'de> Visitor<'de> for PolicyVisitor {
            type Value = FieldPolicy;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a table of field name to reduction")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<FieldPolicy, A::Error> {
                let mut policy = FieldPolicy::new();
                while let Some((field, reduction)) = map.next_entry::<String, Reduction>()? {
                    policy = policy.with(&field, reduction);
                }
                Ok(policy)
            }
        }

        deserializer.deserialize_map(PolicyVisitor)
    }
}
