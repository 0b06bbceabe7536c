//! # Frame Scheduler Module
//!
//! Drives the per-frame update of the active visualizer. The front end owns
//! the actual timer (an `iced` subscription in the GUI); the scheduler decides
//! whether a tick should still do anything and forwards it to the visualizer.
//!
//! Teardown is cooperative: cancelling the `CancelToken` makes every later
//! tick a no-op and reports the loop inactive so the timer can be dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::PitchEvent;
use crate::render::DrawOp;

/// Something that can be drawn frame by frame.
pub trait Visualizer {
    /// Recomputes the layout for a new surface size and returns the full
    /// background.
    fn resize(&mut self, width: f32, height: f32) -> Vec<DrawOp>;

    /// Incremental per-frame update with the most recent pitch, if any.
    /// Returns `None` when nothing needs redrawing this frame.
    fn update(&mut self, latest: Option<&PitchEvent>, now_ms: u64) -> Option<Vec<DrawOp>>;
}

/// Shared cancellation flag for a render loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct FrameScheduler {
    interval: Duration,
    token: CancelToken,
    frames: u64,
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::with_token(interval, CancelToken::new())
    }

    pub fn with_token(interval: Duration, token: CancelToken) -> Self {
        Self {
            interval,
            token,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A handle that can stop this loop from anywhere.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Number of ticks forwarded to a visualizer so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame. After cancellation this returns `None` without
    /// touching the visualizer.
    pub fn tick<V: Visualizer + ?Sized>(
        &mut self,
        visualizer: &mut V,
        latest: Option<&PitchEvent>,
        now_ms: u64,
    ) -> Option<Vec<DrawOp>> {
        if !self.is_active() {
            return None;
        }
        self.frames += 1;
        visualizer.update(latest, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<u64>,
    }

    impl Visualizer for Recorder {
        fn resize(&mut self, _width: f32, _height: f32) -> Vec<DrawOp> {
            Vec::new()
        }

        fn update(&mut self, _latest: Option<&PitchEvent>, now_ms: u64) -> Option<Vec<DrawOp>> {
            self.updates.push(now_ms);
            Some(Vec::new())
        }
    }

    #[test]
    fn ticks_reach_the_visualizer_until_cancelled() {
        let mut scheduler = FrameScheduler::new(Duration::from_millis(16));
        let mut recorder = Recorder::default();
        assert!(scheduler.tick(&mut recorder, None, 0).is_some());
        assert!(scheduler.tick(&mut recorder, None, 16).is_some());

        let token = scheduler.token();
        token.cancel();

        assert!(!scheduler.is_active());
        assert!(scheduler.tick(&mut recorder, None, 32).is_none());
        assert_eq!(recorder.updates, vec![0, 16]);
        assert_eq!(scheduler.frames(), 2);
    }

    #[test]
    fn cancellation_from_another_thread_is_seen() {
        let scheduler = FrameScheduler::new(Duration::from_millis(16));
        let token = scheduler.token();
        std::thread::spawn(move || token.cancel()).join().unwrap();
        assert!(!scheduler.is_active());
    }

    #[test]
    fn works_through_a_trait_object() {
        let mut scheduler = FrameScheduler::new(Duration::from_millis(16));
        let mut recorder = Recorder::default();
        let visualizer: &mut dyn Visualizer = &mut recorder;
        scheduler.tick(visualizer, None, 5);
        assert_eq!(recorder.updates, vec![5]);
    }
}
