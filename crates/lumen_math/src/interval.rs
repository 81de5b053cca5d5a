/// A closed range `[min, max]` of ray parameters or coordinates.
///
/// `min > max` marks an empty range. [`Interval::EMPTY`] is the canonical
/// one, and it is the identity for [`Interval::surrounding`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Inclusive on both ends.
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }

    /// True if `other` lies entirely inside this range.
    pub fn encloses(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Grows the range by `delta` in total, half on each side.
    pub fn expand(&self, delta: f64) -> Interval {
        let half = delta * 0.5;
        Interval::new(self.min - half, self.max + half)
    }

    /// Smallest range covering both `a` and `b`.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_bounds() {
        let t = Interval::new(1e-5, 8.0);
        assert!(t.contains(1e-5));
        assert!(t.contains(8.0));
        assert!(!t.contains(0.0));
        assert!(!t.contains(8.000001));
        assert_eq!(t.size(), 8.0 - 1e-5);
    }

    #[test]
    fn test_encloses_and_expand() {
        let cell = Interval::new(-1.0, 1.0);
        assert!(cell.encloses(&cell));
        assert!(cell.encloses(&Interval::new(-0.5, 0.25)));
        assert!(!cell.encloses(&Interval::new(0.5, 1.5)));

        let padded = cell.expand(1.0);
        assert_eq!(padded, Interval::new(-1.5, 1.5));
        assert!(padded.encloses(&Interval::new(0.5, 1.5)));
    }

    #[test]
    fn test_empty_is_union_identity() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(!Interval::new(f64::NEG_INFINITY, f64::INFINITY).is_empty());

        let a = Interval::new(2.0, 3.0);
        assert_eq!(Interval::surrounding(&Interval::EMPTY, &a), a);
        assert_eq!(
            Interval::surrounding(&a, &Interval::new(-4.0, 2.5)),
            Interval::new(-4.0, 3.0)
        );
    }
}
