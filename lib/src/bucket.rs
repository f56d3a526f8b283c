use std::num::NonZeroUsize;
use std::ops::Range;

/// Splits `len` ordered items into at most `target` contiguous, non-overlapping
/// index ranges that together cover `0..len`.
///
/// Buckets are laid out on a real-valued step of `len / target`, so adjacent
/// buckets differ in size by at most one item. Zero items yield zero buckets.
pub fn bucketize(len: usize, target: NonZeroUsize) -> Buckets {
    Buckets {
        len,
        target: target.get(),
        step: len as f64 / target.get() as f64,
        index: 0,
    }
}

/// Iterator over the bucket ranges produced by [`bucketize`].
#[derive(Debug, Clone)]
pub struct Buckets {
    len: usize,
    target: usize,
    step: f64,
    index: usize,
}

impl Buckets {
    pub fn step(&self) -> f64 {
        self.step
    }

    /// ceil(i * len / target), widened so the product cannot overflow.
    fn position(&self, i: usize) -> usize {
        let n = i as u128 * self.len as u128;
        let d = self.target as u128;
        ((n + d - 1) / d) as usize
    }
}

impl Iterator for Buckets {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        // Bucket i spans positions i*step up to (i+1)*step. Positions are
        // rounded up in integer arithmetic, which places an item sitting
        // exactly on a boundary in the later bucket without the float error
        // that i as f64 * step picks up.
        while self.index < self.target {
            let start = Buckets::position(self, self.index);
            self.index += 1;
            let end = Buckets::position(self, self.index).min(self.len);

            if start < end {
                return Some(start..end);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.target - self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ranges(len: usize, target: usize) -> Vec<Range<usize>> {
        bucketize(len, nz(target)).collect()
    }

    #[test]
    fn zero_items_yield_zero_buckets() {
        assert!(ranges(0, 1).is_empty());
        assert!(ranges(0, 288).is_empty());
    }

    #[test]
    fn even_step() {
        assert_eq!(ranges(10, 5), vec![0..2, 2..4, 4..6, 6..8, 8..10]);
    }

    #[test]
    fn fractional_step_seven_into_five() {
        assert_eq!(bucketize(7, nz(5)).step(), 1.4);
        assert_eq!(ranges(7, 5), vec![0..2, 2..3, 3..5, 5..6, 6..7]);
    }

    #[test]
    fn one_bucket_takes_everything() {
        assert_eq!(ranges(1, 1), vec![0..1]);
        assert_eq!(ranges(1000, 1), vec![0..1000]);
    }

    #[test]
    fn equal_len_and_target_gives_singletons() {
        let expected: Vec<_> = (0..288).map(|i| i..i + 1).collect();
        assert_eq!(ranges(288, 288), expected);
    }

    #[test]
    fn fewer_items_than_buckets_skips_empty_ranges() {
        assert_eq!(ranges(2, 5), vec![0..1, 1..2]);
        assert_eq!(ranges(3, 7), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn partitions_exactly_for_many_sizes() {
        for target in 1..=64 {
            for len in 0..=600 {
                let buckets = ranges(len, target);
                assert!(buckets.len() <= target, "len={} target={}", len, target);

                let mut cursor = 0;
                for r in &buckets {
                    assert_eq!(r.start, cursor, "gap or overlap at len={} target={}", len, target);
                    assert!(r.start < r.end, "empty bucket at len={} target={}", len, target);
                    cursor = r.end;
                }
                assert_eq!(cursor, len, "len={} target={}", len, target);

                if len >= target {
                    assert_eq!(buckets.len(), target, "len={} target={}", len, target);
                    let sizes: Vec<_> = buckets.iter().map(|r| r.len()).collect();
                    let min = sizes.iter().min().unwrap();
                    let max = sizes.iter().max().unwrap();
                    assert!(max - min <= 1, "len={} target={} sizes={:?}", len, target, sizes);
                }
            }
        }
    }

    #[test]
    fn partitions_a_week_of_readings() {
        // One reading a minute for seven days into the daily chart size.
        let len = 7 * 24 * 60;
        let buckets = ranges(len, 288);
        assert_eq!(buckets.len(), 288);
        assert_eq!(buckets.first(), Some(&(0..35)));
        assert_eq!(buckets.last().map(|r| r.end), Some(len));
        assert_eq!(buckets.iter().map(|r| r.len()).sum::<usize>(), len);
    }

    #[test]
    fn huge_inputs_do_not_overflow() {
        let len = usize::MAX / 2;
        let buckets: Vec<_> = bucketize(len, NonZeroUsize::new(1000).unwrap()).collect();
        assert_eq!(buckets.len(), 1000);
        assert_eq!(buckets[0].start, 0);
        assert_eq!(buckets[999].end, len);
        for w in buckets.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }
}
