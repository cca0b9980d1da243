/// Simulated time.
///
/// A logical timestamp measured in ticks. Time advances only when the
/// scheduler pops an event; nothing in the engine ever looks at the wall
/// clock.

/// A point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The instant every run starts at.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Wrap a raw tick count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// Raw tick count.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The time `delta` ticks after `self`, or `None` on overflow.
    #[inline]
    pub fn plus(self, delta: u64) -> Option<VirtualTime> {
        self.0.checked_add(delta).map(VirtualTime)
    }

    /// Shift by a signed number of ticks, clamping at zero.
    ///
    /// Returns `None` only when moving forward overflows.
    #[inline]
    pub fn shifted(self, delta: i64) -> Option<VirtualTime> {
        if delta >= 0 {
            self.plus(delta.unsigned_abs())
        } else {
            Some(VirtualTime(self.0.saturating_sub(delta.unsigned_abs())))
        }
    }

    /// Ticks elapsed since `earlier`, or `None` if `earlier` is later.
    #[inline]
    pub fn duration_since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// How many local steps a node running at `rate` ticks per step has
    /// completed at this instant.
    #[inline]
    pub fn local_steps(self, rate: f64) -> u64 {
        (self.0 as f64 / rate).floor() as u64
    }
}

/// Convert a duration in local steps into simulated ticks for a node whose
/// clock runs at `rate` ticks per step. Never shorter than one tick.
#[inline]
pub fn steps_to_ticks(steps: u64, rate: f64) -> u64 {
    let ticks = (steps as f64 * rate).round();
    if ticks < 1.0 {
        1
    } else if ticks >= u64::MAX as f64 {
        u64::MAX
    } else {
        ticks as u64
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let t1 = VirtualTime::new(10);
        let t2 = VirtualTime::new(20);
        assert!(t1 < t2);
        assert_eq!(VirtualTime::ZERO.ticks(), 0);
    }

    #[test]
    fn test_plus_overflow() {
        assert_eq!(VirtualTime::new(5).plus(3), Some(VirtualTime::new(8)));
        assert!(VirtualTime::new(u64::MAX).plus(1).is_none());
    }

    #[test]
    fn test_shifted_clamps_at_zero() {
        let t = VirtualTime::new(10);
        assert_eq!(t.shifted(5), Some(VirtualTime::new(15)));
        assert_eq!(t.shifted(-4), Some(VirtualTime::new(6)));
        assert_eq!(t.shifted(-40), Some(VirtualTime::ZERO));
    }

    #[test]
    fn test_duration_since() {
        let t1 = VirtualTime::new(10);
        let t2 = VirtualTime::new(30);
        assert_eq!(t2.duration_since(t1), Some(20));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_steps_to_ticks_scales_by_rate() {
        assert_eq!(steps_to_ticks(10, 1.0), 10);
        assert_eq!(steps_to_ticks(10, 2.0), 20);
        assert_eq!(steps_to_ticks(10, 0.5), 5);
        // Never collapses to zero.
        assert_eq!(steps_to_ticks(1, 0.1), 1);
    }

    #[test]
    fn test_local_steps() {
        assert_eq!(VirtualTime::new(20).local_steps(2.0), 10);
        assert_eq!(VirtualTime::new(21).local_steps(2.0), 10);
        assert_eq!(VirtualTime::new(7).local_steps(1.0), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", VirtualTime::new(42)), "T=42");
    }
}
