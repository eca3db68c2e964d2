use std::time::Instant;

use crate::clock::EffectClock;

// ---------------------------------------------------------------------------
// Seams — implemented by the GPU layer and the host shell
// ---------------------------------------------------------------------------

/// Something the driver can draw one frame into.
///
/// `acquire` opens the frame (drawable view + command recording scope),
/// `record` encodes the effect into it, `submit` hands it to the queue and
/// presents. An acquired frame is always either submitted or dropped before
/// the next `acquire`.
pub trait FrameTarget {
    type Frame;
    type Error;

    /// `Ok(None)` means the drawable is temporarily unavailable; the tick is
    /// skipped and retried on the next refresh.
    fn acquire(&mut self) -> Result<Option<Self::Frame>, Self::Error>;

    fn record(&mut self, frame: &mut Self::Frame, timestamp_secs: f32);

    fn submit(&mut self, frame: Self::Frame) -> Result<(), Self::Error>;
}

/// The host's "call me again on the next display refresh" primitive.
pub trait FrameScheduler {
    fn request_frame(&self);

    /// Called instead of `request_frame` after a skipped tick. Nothing was
    /// presented, so present-mode pacing does not apply; hosts should delay
    /// the retry (or wait for a resize) rather than redraw immediately.
    fn retry_later(&self) {
        self.request_frame()
    }
}

impl<F: Fn()> FrameScheduler for F {
    fn request_frame(&self) {
        self()
    }
}

// ---------------------------------------------------------------------------
// FrameDriver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverState {
    /// No tick has run yet.
    #[default]
    Idle,
    /// Steady loop; there is no terminal state reachable from here.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Drawn { timestamp_secs: f32 },
    /// Drawable unavailable; nothing was recorded or submitted.
    Skipped,
    /// `request_stop` was called; nothing was touched and nothing scheduled.
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: u64,
    pub skipped: u64,
}

/// Runs one frame per refresh callback. Each tick completes through queue
/// submission before the next one is scheduled, so at most one frame is
/// being recorded at a time.
#[derive(Debug, Default)]
pub struct FrameDriver {
    state: DriverState,
    clock: EffectClock,
    stats: FrameStats,
    stop_requested: bool,
}

impl FrameDriver {
    /// Effect time starts at zero on the first tick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit clock, e.g. one anchored at process start.
    pub fn with_clock(clock: EffectClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Stop scheduling further frames. Takes effect at the top of the next tick.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_requested
    }

    /// Run one iteration. Fatal errors from the target are returned without
    /// scheduling another frame; a skipped draw asks the scheduler to retry later.
    pub fn tick<T, S>(
        &mut self,
        target: &mut T,
        scheduler: &S,
        now: Instant,
    ) -> Result<TickOutcome, T::Error>
    where
        T: FrameTarget,
        S: FrameScheduler + ?Sized,
    {
        if self.stop_requested {
            return Ok(TickOutcome::Stopped);
        }

        if self.state == DriverState::Idle {
            log::debug!("frame driver running");
            self.clock.start(now);
            self.state = DriverState::Running;
        }

        match target.acquire()? {
            Some(mut frame) => {
                let timestamp_secs = self.clock.elapsed_at(now);
                target.record(&mut frame, timestamp_secs);
                target.submit(frame)?;
                self.stats.drawn += 1;
                scheduler.request_frame();
                Ok(TickOutcome::Drawn { timestamp_secs })
            }
            None => {
                self.stats.skipped += 1;
                scheduler.retry_later();
                Ok(TickOutcome::Skipped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Commands a mock frame accumulates between acquire and submit.
    #[derive(Debug, Default)]
    struct MockFrame {
        uniform_writes: Vec<f32>,
        draws: u32,
    }

    #[derive(Debug, PartialEq)]
    enum MockError {
        DeviceLost,
    }

    /// Scripted acquire results: `true` = drawable available.
    #[derive(Default)]
    struct MockTarget {
        script: VecDeque<bool>,
        open_frames: u32,
        submitted: Vec<MockFrame>,
        fail_submit: bool,
    }

    impl MockTarget {
        fn with_script(script: &[bool]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl FrameTarget for MockTarget {
        type Frame = MockFrame;
        type Error = MockError;

        fn acquire(&mut self) -> Result<Option<MockFrame>, MockError> {
            assert_eq!(self.open_frames, 0, "previous frame still open");
            if self.script.pop_front().unwrap_or(true) {
                self.open_frames += 1;
                Ok(Some(MockFrame::default()))
            } else {
                Ok(None)
            }
        }

        fn record(&mut self, frame: &mut MockFrame, timestamp_secs: f32) {
            frame.uniform_writes.push(timestamp_secs);
            frame.draws += 1;
        }

        fn submit(&mut self, frame: MockFrame) -> Result<(), MockError> {
            self.open_frames -= 1;
            if self.fail_submit {
                return Err(MockError::DeviceLost);
            }
            self.submitted.push(frame);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingScheduler {
        frames: Cell<u32>,
        retries: Cell<u32>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.frames.set(self.frames.get() + 1);
        }

        fn retry_later(&self) {
            self.retries.set(self.retries.get() + 1);
        }
    }

    #[test]
    fn first_tick_moves_idle_to_running() {
        let mut driver = FrameDriver::new();
        assert_eq!(driver.state(), DriverState::Idle);
        let mut target = MockTarget::default();
        let scheduled = Cell::new(0);
        let outcome = driver
            .tick(&mut target, &|| scheduled.set(scheduled.get() + 1), Instant::now())
            .unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(outcome, TickOutcome::Drawn { timestamp_secs: 0.0 });
        assert_eq!(scheduled.get(), 1);
    }

    #[test]
    fn surface_lost_once_skips_exactly_one_draw() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget::with_script(&[true, false, true]);
        let scheduled = Cell::new(0);
        let schedule = || scheduled.set(scheduled.get() + 1);
        let start = Instant::now();

        let mut outcomes = Vec::new();
        for i in 0..3u64 {
            let now = start + Duration::from_millis(16 * i);
            outcomes.push(driver.tick(&mut target, &schedule, now).unwrap());
        }

        assert!(matches!(outcomes[0], TickOutcome::Drawn { .. }));
        assert_eq!(outcomes[1], TickOutcome::Skipped);
        assert!(matches!(outcomes[2], TickOutcome::Drawn { .. }));
        assert_eq!(driver.stats(), FrameStats { drawn: 2, skipped: 1 });
        assert_eq!(target.submitted.len(), 2);
        assert_eq!(target.open_frames, 0);
        assert_eq!(scheduled.get(), 3);
    }

    #[test]
    fn skipped_tick_defers_to_retry_instead_of_redrawing() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget::with_script(&[false, false, true]);
        let scheduler = CountingScheduler::default();
        let start = Instant::now();

        for i in 0..2u64 {
            let now = start + Duration::from_millis(16 * i);
            let outcome = driver.tick(&mut target, &scheduler, now).unwrap();
            assert_eq!(outcome, TickOutcome::Skipped);
        }
        assert_eq!(scheduler.frames.get(), 0);
        assert_eq!(scheduler.retries.get(), 2);

        let outcome = driver.tick(&mut target, &scheduler, start + Duration::from_millis(32));
        assert!(matches!(outcome, Ok(TickOutcome::Drawn { .. })));
        assert_eq!(scheduler.frames.get(), 1);
        assert_eq!(scheduler.retries.get(), 2);
    }

    #[test]
    fn each_tick_emits_one_write_and_one_draw() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget::default();
        let start = Instant::now();

        driver.tick(&mut target, &|| {}, start).unwrap();
        driver
            .tick(&mut target, &|| {}, start + Duration::from_millis(16))
            .unwrap();

        assert_eq!(target.submitted.len(), 2);
        for frame in &target.submitted {
            assert_eq!(frame.uniform_writes.len(), 1);
            assert_eq!(frame.draws, 1);
        }
        assert_eq!(target.submitted[0].uniform_writes[0], 0.0);
        assert!((target.submitted[1].uniform_writes[0] - 0.016).abs() < 1e-6);
    }

    #[test]
    fn timestamps_increase_across_ticks() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget::default();
        let start = Instant::now();
        let mut last = -1.0f32;
        for i in 0..10u64 {
            let now = start + Duration::from_millis(7 * i);
            match driver.tick(&mut target, &|| {}, now).unwrap() {
                TickOutcome::Drawn { timestamp_secs } => {
                    assert!(timestamp_secs > last);
                    last = timestamp_secs;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn submission_error_propagates_without_scheduling() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget {
            fail_submit: true,
            ..MockTarget::default()
        };
        let scheduled = Cell::new(false);
        let err = driver
            .tick(&mut target, &|| scheduled.set(true), Instant::now())
            .unwrap_err();
        assert_eq!(err, MockError::DeviceLost);
        assert!(!scheduled.get());
        assert_eq!(driver.stats().drawn, 0);
    }

    #[test]
    fn stop_takes_effect_on_next_tick() {
        let mut driver = FrameDriver::new();
        let mut target = MockTarget::default();
        let scheduled = Cell::new(0);
        let schedule = || scheduled.set(scheduled.get() + 1);

        driver.tick(&mut target, &schedule, Instant::now()).unwrap();
        driver.request_stop();
        let outcome = driver.tick(&mut target, &schedule, Instant::now()).unwrap();

        assert_eq!(outcome, TickOutcome::Stopped);
        assert!(driver.is_stopped());
        assert_eq!(scheduled.get(), 1);
        assert_eq!(target.submitted.len(), 1);
    }

    #[test]
    fn clock_anchored_before_first_tick() {
        let origin = Instant::now();
        let mut driver = FrameDriver::with_clock(EffectClock::starting_at(origin));
        let mut target = MockTarget::default();
        let outcome = driver
            .tick(&mut target, &|| {}, origin + Duration::from_secs(2))
            .unwrap();
        assert_eq!(outcome, TickOutcome::Drawn { timestamp_secs: 2.0 });
    }
}
