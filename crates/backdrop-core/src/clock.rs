use std::time::{Duration, Instant};

/// Process-relative effect time in seconds.
///
/// The origin is fixed on the first sample (or explicitly via `starting_at`),
/// and returned values never decrease even if a caller passes an older
/// `Instant`.
#[derive(Debug, Clone, Default)]
pub struct EffectClock {
    origin: Option<Instant>,
    last: f32,
}

impl EffectClock {
    /// A clock whose origin is the first call to `elapsed_at`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock counting from a known instant (e.g. process start).
    pub fn starting_at(origin: Instant) -> Self {
        Self {
            origin: Some(origin),
            last: 0.0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.origin.is_some()
    }

    /// Fix the origin if it is not set yet.
    pub fn start(&mut self, now: Instant) {
        self.origin.get_or_insert(now);
    }

    /// Seconds elapsed between the origin and `now`, clamped to be monotonic.
    pub fn elapsed_at(&mut self, now: Instant) -> f32 {
        let origin = *self.origin.get_or_insert(now);
        let secs = now.saturating_duration_since(origin).as_secs_f32();
        self.last = self.last.max(secs);
        self.last
    }

    pub fn elapsed(&mut self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    /// Last value handed out, without sampling.
    pub fn last(&self) -> Duration {
        Duration::from_secs_f32(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_zero() {
        let mut clock = EffectClock::new();
        assert!(!clock.is_started());
        assert_eq!(clock.elapsed_at(Instant::now()), 0.0);
        assert!(clock.is_started());
    }

    #[test]
    fn counts_from_explicit_origin() {
        let origin = Instant::now();
        let mut clock = EffectClock::starting_at(origin);
        let t = clock.elapsed_at(origin + Duration::from_millis(2500));
        assert!((t - 2.5).abs() < 1e-6, "t={t}");
    }

    #[test]
    fn never_goes_backward() {
        let origin = Instant::now();
        let mut clock = EffectClock::starting_at(origin);
        let later = clock.elapsed_at(origin + Duration::from_secs(3));
        let earlier = clock.elapsed_at(origin + Duration::from_secs(1));
        assert_eq!(later, 3.0);
        assert_eq!(earlier, 3.0);
        assert_eq!(clock.last(), Duration::from_secs(3));
    }

    #[test]
    fn start_does_not_move_an_existing_origin() {
        let origin = Instant::now();
        let mut clock = EffectClock::starting_at(origin);
        clock.start(origin + Duration::from_secs(5));
        let t = clock.elapsed_at(origin + Duration::from_secs(6));
        assert_eq!(t, 6.0);
    }
}
