//! # Tick Clock
//!
//! Fixed-timestep bookkeeping for the simulation.
//!
//! ## Design
//!
//! Callers advance time in arbitrary chunks (`step_size` per script step).
//! The accumulator turns those chunks into a whole number of physics ticks and
//! carries the remainder into the next call, so the total number of ticks only
//! depends on the total time advanced, never on how it was chunked.

/// Converts between simulated seconds and physics ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickClock {
    /// Physics ticks per simulated second.
    physics_fps: u32,
}

impl TickClock {
    /// Creates a clock running at `physics_fps` ticks per second.
    ///
    /// A rate of zero is raised to one.
    #[must_use]
    pub fn new(physics_fps: u32) -> Self {
        Self {
            physics_fps: physics_fps.max(1),
        }
    }

    /// Ticks per simulated second.
    #[inline]
    #[must_use]
    pub const fn physics_fps(&self) -> u32 {
        self.physics_fps
    }

    /// Duration of one tick in seconds.
    #[inline]
    #[must_use]
    pub fn tick_duration(&self) -> f64 {
        1.0 / f64::from(self.physics_fps)
    }

    /// Nearest whole number of ticks for `time` seconds. Negative times map
    /// to zero.
    #[must_use]
    pub fn time_to_ticks(&self, time: f64) -> u32 {
        let ticks = (time * f64::from(self.physics_fps)).round();
        if ticks <= 0.0 {
            0
        } else {
            ticks as u32
        }
    }

    /// Simulated seconds covered by `ticks`.
    #[inline]
    #[must_use]
    pub fn ticks_to_time(&self, ticks: u32) -> f64 {
        f64::from(ticks) / f64::from(self.physics_fps)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(kartlab_shared::DEFAULT_PHYSICS_FPS)
    }
}

/// Leftover-time pool carried across step calls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepAccumulator {
    /// Time not yet converted into ticks. Within half a tick of zero.
    leftover: f64,
    /// Ticks produced since the last reset.
    total_ticks: u64,
}

impl StepAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            leftover: 0.0,
            total_ticks: 0,
        }
    }

    /// Adds `dt` seconds and returns how many ticks to run now.
    pub fn advance(&mut self, dt: f64, clock: &TickClock) -> u32 {
        self.leftover += dt;
        let ticks = clock.time_to_ticks(self.leftover);
        self.leftover -= clock.ticks_to_time(ticks);
        self.total_ticks += u64::from(ticks);
        ticks
    }

    /// Drops the leftover time and the tick count.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Time waiting to be converted into ticks.
    #[inline]
    #[must_use]
    pub const fn leftover(&self) -> f64 {
        self.leftover
    }

    /// Ticks produced since the last reset.
    #[inline]
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_conversions() {
        let clock = TickClock::new(120);
        assert_eq!(clock.time_to_ticks(1.0), 120);
        assert_eq!(clock.time_to_ticks(0.1), 12);
        assert_eq!(clock.time_to_ticks(-0.5), 0);
        assert!((clock.ticks_to_time(60) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        assert_eq!(TickClock::new(0).physics_fps(), 1);
    }

    #[test]
    fn test_one_big_step_equals_ten_small() {
        let clock = TickClock::new(10);

        let mut big = StepAccumulator::new();
        assert_eq!(big.advance(1.0, &clock), 10);

        let mut small = StepAccumulator::new();
        let ticks: u32 = (0..10).map(|_| small.advance(0.1, &clock)).sum();
        assert_eq!(ticks, 10);
        assert_eq!(big.total_ticks(), small.total_ticks());
    }

    #[test]
    fn test_rechunking_is_invariant() {
        let clock = TickClock::new(120);

        let mut whole = StepAccumulator::new();
        whole.advance(1.3, &clock);

        let mut chunked = StepAccumulator::new();
        for _ in 0..100 {
            chunked.advance(0.013, &clock);
        }

        let mut uneven = StepAccumulator::new();
        for dt in [0.25, 0.05, 0.7, 0.3] {
            uneven.advance(dt, &clock);
        }

        assert_eq!(whole.total_ticks(), 156);
        assert_eq!(chunked.total_ticks(), 156);
        assert_eq!(uneven.total_ticks(), 156);
    }

    #[test]
    fn test_leftover_is_carried() {
        let clock = TickClock::new(10);
        let mut acc = StepAccumulator::new();
        // 0.04s rounds to zero ticks; the time is kept.
        assert_eq!(acc.advance(0.04, &clock), 0);
        assert!((acc.leftover() - 0.04).abs() < 1e-12);
        // 0.08s total rounds to one tick.
        assert_eq!(acc.advance(0.04, &clock), 1);
        assert!(acc.leftover() < 0.0);

        acc.reset();
        assert_eq!(acc.total_ticks(), 0);
        assert_eq!(acc.leftover(), 0.0);
    }
}
