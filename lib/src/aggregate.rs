use std::f64::consts::TAU;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{FieldPolicy, Reduction, Sample};

/// Mean resultant lengths below this are treated as a zero vector, which
/// happens when a bucket's angles cancel out (e.g. 0° and 180°).
const MIN_RESULTANT: f64 = 1e-9;

/// One output row: the fields of the policy in policy order, each reduced
/// over a bucket. Fields with no values in the bucket are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    values: Vec<(Arc<str>, Option<f64>)>,
}

impl AggregatedRow {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| &**name == field)
            .and_then(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(name, v)| (&**name, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(&**name, value)?;
        }
        map.end()
    }
}

/// Reduce one bucket of samples to a row, field by field, skipping samples
/// where the field is null.
pub fn aggregate(samples: &[Sample], policy: &FieldPolicy) -> AggregatedRow {
    let values = policy
        .iter()
        .map(|(field, reduction)| {
            let mut acc = Accumulator::new(reduction);
            for value in samples.iter().filter_map(|s| s.get(field)) {
                acc.add(value);
            }
            (field.clone(), acc.close())
        })
        .collect();

    AggregatedRow { values }
}

/// Running state of one reduction. Values go in through `add`, the result
/// comes out of `close`.
#[derive(Debug, Clone)]
enum Accumulator {
    Max(Option<f64>),
    Sum(Option<f64>),
    Mean {
        sum: f64,
        count: usize,
    },
    Circular {
        period: f64,
        sin: f64,
        cos: f64,
        count: usize,
        first: f64,
        uniform: bool,
    },
}

impl Accumulator {
    fn new(reduction: Reduction) -> Self {
        match reduction {
            Reduction::Max => Accumulator::Max(None),
            Reduction::Sum => Accumulator::Sum(None),
            Reduction::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            Reduction::CircularMean { period } => Accumulator::Circular {
                period,
                sin: 0.0,
                cos: 0.0,
                count: 0,
                first: 0.0,
                uniform: true,
            },
        }
    }

    fn add(&mut self, value: f64) {
        match self {
            Accumulator::Max(max) => {
                *max = Some(max.map_or(value, |m| m.max(value)));
            }
            Accumulator::Sum(sum) => {
                *sum = Some(sum.unwrap_or(0.0) + value);
            }
            Accumulator::Mean { sum, count } => {
                *sum += value;
                *count += 1;
            }
            Accumulator::Circular {
                period,
                sin,
                cos,
                count,
                first,
                uniform,
            } => {
                let theta = TAU * value / *period;
                *sin += theta.sin();
                *cos += theta.cos();
                if *count == 0 {
                    *first = value;
                } else if value != *first {
                    *uniform = false;
                }
                *count += 1;
            }
        }
    }

    fn close(self) -> Option<f64> {
        match self {
            Accumulator::Max(max) => max,
            Accumulator::Sum(sum) => sum,
            Accumulator::Mean { sum, count } => {
                if count == 0 {
                    None
                } else {
                    Some(sum / count as f64)
                }
            }
            Accumulator::Circular {
                period,
                sin,
                cos,
                count,
                first,
                uniform,
            } => {
                if count == 0 {
                    return None;
                }
                // Identical readings average to themselves; going through
                // sin/cos and back would only add rounding error.
                if uniform {
                    return Some(wrap(first, period));
                }

                let n = count as f64;
                let (sin, cos) = (sin / n, cos / n);
                if sin.hypot(cos) < MIN_RESULTANT {
                    return Some(0.0);
                }

                Some(period * wrap(sin.atan2(cos), TAU) / TAU)
            }
        }
    }
}

/// Folds `v` into `[0, period)`. A tiny negative value can round up to a
/// full period, which is folded to zero.
fn wrap(v: f64, period: f64) -> f64 {
    let r = v.rem_euclid(period);
    if r >= period {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winds(values: &[Option<f64>]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(v) => Sample::new(i as i64).with("wind", *v),
                None => Sample::new(i as i64).with_null("wind"),
            })
            .collect()
    }

    fn reduce(reduction: Reduction, values: &[Option<f64>]) -> Option<f64> {
        let policy = FieldPolicy::new().with("wind", reduction);
        aggregate(&winds(values), &policy).get("wind")
    }

    fn circular(values: &[f64]) -> f64 {
        let values: Vec<_> = values.iter().map(|v| Some(*v)).collect();
        reduce(Reduction::DEGREES, &values).unwrap()
    }

    /// Shortest distance between two compass bearings.
    fn bearing_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn max_ignores_nulls() {
        assert_eq!(
            reduce(Reduction::Max, &[Some(3.0), None, Some(-1.0), Some(7.5)]),
            Some(7.5)
        );
        assert_eq!(reduce(Reduction::Max, &[Some(-4.0), Some(-2.0)]), Some(-2.0));
    }

    #[test]
    fn max_of_nothing_is_null() {
        assert_eq!(reduce(Reduction::Max, &[]), None);
        assert_eq!(reduce(Reduction::Max, &[None, None]), None);
    }

    #[test]
    fn sum_ignores_nulls() {
        assert_eq!(
            reduce(Reduction::Sum, &[Some(0.2), None, Some(0.4), Some(0.0)]),
            Some(0.2 + 0.4)
        );
        assert_eq!(reduce(Reduction::Sum, &[None, None]), None);
        assert_eq!(reduce(Reduction::Sum, &[Some(0.0)]), Some(0.0));
    }

    #[test]
    fn mean_ignores_nulls() {
        assert_eq!(
            reduce(Reduction::Mean, &[Some(1.0), None, Some(2.0), Some(6.0)]),
            Some(3.0)
        );
        assert_eq!(reduce(Reduction::Mean, &[None]), None);
        assert_eq!(reduce(Reduction::Mean, &[]), None);
    }

    #[test]
    fn mean_matches_arithmetic_mean() {
        let values: Vec<f64> = (0..97).map(|i| (i as f64 * 0.37).sin() * 12.0).collect();
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let got = reduce(
            Reduction::Mean,
            &values.iter().map(|v| Some(*v)).collect::<Vec<_>>(),
        )
        .unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn circular_mean_wraps_around_north() {
        let mean = circular(&[10.0, 350.0]);
        assert!(bearing_distance(mean, 0.0) < 1e-9, "got {}", mean);
        assert!((0.0..360.0).contains(&mean));

        let mean = circular(&[355.0, 5.0, 15.0]);
        assert!(bearing_distance(mean, 5.0) < 1e-9, "got {}", mean);
    }

    #[test]
    fn circular_mean_of_identical_values_is_exact() {
        assert_eq!(circular(&[45.0, 45.0, 45.0]), 45.0);
    }

    #[test]
    fn circular_mean_of_opposite_values_is_zero() {
        let mean = circular(&[0.0, 180.0]);
        assert!(!mean.is_nan());
        assert_eq!(mean, 0.0);

        assert_eq!(circular(&[90.0, 270.0]), 0.0);
    }

    #[test]
    fn circular_mean_in_range() {
        let mean = circular(&[200.0, 250.0]);
        assert!((mean - 225.0).abs() < 1e-9, "got {}", mean);
    }

    #[test]
    fn circular_mean_other_periods() {
        // Hours on a 24h clock: 23h and 1h average to midnight.
        let policy = FieldPolicy::new().with("hour", Reduction::CircularMean { period: 24.0 });
        let samples = vec![Sample::new(0).with("hour", 23.0), Sample::new(1).with("hour", 1.0)];
        let hour = aggregate(&samples, &policy).get("hour").unwrap();
        assert!(hour < 1e-9 || (24.0 - hour) < 1e-9, "got {}", hour);
    }

    #[test]
    fn circular_mean_folds_into_one_period() {
        assert_eq!(reduce(Reduction::DEGREES, &[Some(360.0), Some(360.0)]), Some(0.0));
        assert_eq!(reduce(Reduction::DEGREES, &[Some(-10.0), Some(-10.0)]), Some(350.0));
        assert_eq!(reduce(Reduction::DEGREES, &[Some(720.5)]), Some(0.5));

        let north = reduce(Reduction::DEGREES, &[Some(360.0), Some(0.0)]).unwrap();
        assert!((0.0..1e-9).contains(&north), "got {}", north);

        let west = reduce(Reduction::DEGREES, &[Some(-10.0), Some(-11.0)]).unwrap();
        assert!((west - 349.5).abs() < 1e-9, "got {}", west);

        for v in [-720.0, -360.0, -0.0, 360.0, 1080.0, -1e-20] {
            let got = reduce(Reduction::DEGREES, &[Some(v)]).unwrap();
            assert!((0.0..360.0).contains(&got), "{} -> {}", v, got);
        }
    }

    #[test]
    fn circular_mean_of_nothing_is_null() {
        assert_eq!(reduce(Reduction::DEGREES, &[None, None]), None);
    }

    #[test]
    fn single_sample_round_trips() {
        for reduction in [Reduction::Max, Reduction::Mean, Reduction::DEGREES] {
            for v in [0.0, 3.3, 179.9, 359.5] {
                assert_eq!(reduce(reduction, &[Some(v)]), Some(v), "{}", reduction);
            }
        }
    }

    #[test]
    fn rows_follow_policy_order_and_keep_nulls() {
        let samples = vec![
            Sample::new(100).with("wind", 2.0).with("gust", 5.0),
            Sample::new(200).with("wind", 4.0).with_null("gust"),
        ];
        let policy = FieldPolicy::wind();
        let row = aggregate(&samples, &policy);

        let fields: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["gust", "wind", "timestamp", "direction"]);
        assert_eq!(row.get("timestamp"), Some(150.0));
        assert_eq!(row.get("wind"), Some(3.0));
        assert_eq!(row.get("gust"), Some(5.0));
        assert_eq!(row.get("direction"), None);
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn fields_outside_policy_are_dropped() {
        let samples = vec![Sample::new(0).with("wind", 1.0).with("pressure", 1013.0)];
        let row = aggregate(&samples, &FieldPolicy::new().with("wind", Reduction::Max));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("pressure"), None);
    }

    #[test]
    fn serializes_nulls() {
        let samples = vec![Sample::new(0).with("wind", 1.5)];
        let policy = FieldPolicy::new()
            .with("wind", Reduction::Mean)
            .with("gust", Reduction::Max);
        let json = serde_json::to_string(&aggregate(&samples, &policy)).unwrap();
        assert_eq!(json, r#"{"wind":1.5,"gust":null}"#);
    }
}
