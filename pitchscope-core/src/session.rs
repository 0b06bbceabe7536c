//! # Session Module
//!
//! The UI-side handle for one run of the pipeline. A session owns the
//! receiving end of the pitch channel, the clock that stamps events, the
//! pitch listeners and (with the `capture` feature) the live input stream.
//!
//! ## Lifecycle
//! - `connect` wires both channel directions and posts `init`, handing back
//!   the realtime-side processor for whoever feeds audio
//! - `start` does the same against the default microphone
//! - `poll` delivers detected pitches on the UI side
//! - `stop` ends capture and cancels the render loop

use std::fmt;
use std::time::Instant;

use log::{debug, info};

use crate::PitchEvent;
use crate::channel::{self, ChannelMessage, MessageReceiver};
use crate::config::PipelineConfig;
use crate::processor::PitchProcessor;
use crate::scheduler::CancelToken;

#[cfg(feature = "capture")]
use crate::capture::{CaptureError, CaptureStream, InputDevice};

/// Monotonic milliseconds since the session started.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

type PitchListener = Box<dyn FnMut(&PitchEvent)>;

pub struct Session {
    inbox: MessageReceiver,
    clock: SessionClock,
    listeners: Vec<PitchListener>,
    latest: Option<PitchEvent>,
    token: CancelToken,
    sample_rate: f32,
    #[cfg(feature = "capture")]
    stream: Option<CaptureStream>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sample_rate", &self.sample_rate)
            .field("latest", &self.latest)
            .field("listeners", &self.listeners.len())
            .field("stopped", &self.token.is_cancelled())
            .finish()
    }
}

impl Session {
    /// Headless session at the configured sample rate.
    pub fn connect(config: &PipelineConfig) -> (Session, PitchProcessor) {
        Self::connect_at_rate(config, config.preferred_sample_rate as f32)
    }

    /// Headless session for audio arriving at `sample_rate`.
    ///
    /// The `init` message is already queued when this returns, so the first
    /// chunk given to the processor is analyzed against the new engine.
    pub fn connect_at_rate(config: &PipelineConfig, sample_rate: f32) -> (Session, PitchProcessor) {
        let (control_tx, control_rx) = channel::channel();
        let (pitch_tx, pitch_rx) = channel::channel();

        control_tx.post(ChannelMessage::Init {
            engine_bytes: config.engine.to_bytes(),
            sample_rate,
            window_size: config.window_size,
        });

        let processor = PitchProcessor::new(control_rx, pitch_tx);
        let session = Session {
            inbox: pitch_rx,
            clock: SessionClock::new(),
            listeners: Vec::new(),
            latest: None,
            token: CancelToken::new(),
            sample_rate,
            #[cfg(feature = "capture")]
            stream: None,
        };
        info!(
            "[SESSION] Connected: {} samples per window at {sample_rate} Hz",
            config.window_size
        );
        (session, processor)
    }

    /// Opens the default microphone and starts analyzing it.
    #[cfg(feature = "capture")]
    pub fn start(config: &PipelineConfig) -> Result<Session, CaptureError> {
        let device = InputDevice::open_default(config.preferred_sample_rate)?;
        let (mut session, processor) = Self::connect_at_rate(config, device.sample_rate() as f32);
        session.stream = Some(device.start(processor)?);
        Ok(session)
    }

    /// Stops capture and cancels the render loop. Idempotent.
    pub fn stop(&mut self) {
        self.stop_capture();
        if !self.token.is_cancelled() {
            self.token.cancel();
            info!("[SESSION] Stopped");
        }
    }

    #[cfg(feature = "capture")]
    fn stop_capture(&mut self) {
        if self.stream.take().is_some() {
            info!("[SESSION] Capture stopped");
        }
    }

    #[cfg(not(feature = "capture"))]
    fn stop_capture(&mut self) {}

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Registers a listener fired once for every event `poll` delivers.
    pub fn on_pitch(&mut self, listener: impl FnMut(&PitchEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Delivers every pitch detected since the last call, stamped with
    /// `now_ms`, in detection order.
    pub fn poll(&mut self, now_ms: u64) -> Vec<PitchEvent> {
        let mut events = Vec::new();
        for message in self.inbox.drain() {
            match message {
                ChannelMessage::PitchDetected { frequency, clarity } => {
                    events.push(PitchEvent::new(frequency, now_ms, clarity));
                }
                other => debug!("[SESSION] Ignoring message not meant for the UI side: {other:?}"),
            }
        }
        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        if let Some(last) = events.last() {
            self.latest = Some(*last);
        }
        events
    }

    /// The most recent event ever delivered.
    pub fn latest(&self) -> Option<&PitchEvent> {
        self.latest.as_ref()
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    /// Cancellation handle for the render loop tied to this session.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Readiness;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn connect_queues_init_for_the_processor() {
        let (_session, mut processor) = Session::connect(&PipelineConfig::default());
        assert_eq!(processor.readiness(), Readiness::AwaitingInit);
        processor.process(&[0.0; 16]);
        assert_eq!(processor.readiness(), Readiness::Ready);
        assert_eq!(processor.window().capacity(), 1024);
    }

    #[test]
    fn bad_rate_leaves_processor_failed_and_silent() {
        let (mut session, mut processor) = Session::connect_at_rate(&PipelineConfig::default(), 0.0);
        processor.process(&[0.5; 2048]);
        assert_eq!(processor.readiness(), Readiness::Failed);
        assert!(session.poll(10).is_empty());
    }

    #[test]
    fn listeners_see_every_polled_event() {
        let (mut session, _processor) = Session::connect(&PipelineConfig::default());
        let (tx, rx) = channel::channel();
        session.inbox = rx;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.on_pitch(move |event| sink.borrow_mut().push(event.frequency));

        for frequency in [220.0, 330.0] {
            tx.post(ChannelMessage::PitchDetected { frequency, clarity: 0.9 });
        }
        let events = session.poll(42);

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.timestamp_ms == 42));
        assert_eq!(*seen.borrow(), vec![220.0, 330.0]);
        assert_eq!(session.latest().map(|e| e.frequency), Some(330.0));

        // An empty poll keeps the last event.
        assert!(session.poll(50).is_empty());
        assert_eq!(session.latest().map(|e| e.frequency), Some(330.0));
    }

    #[test]
    fn stop_cancels_the_render_token() {
        let (mut session, _processor) = Session::connect(&PipelineConfig::default());
        let token = session.token();
        assert!(session.is_running());
        session.stop();
        session.stop();
        assert!(token.is_cancelled());
        assert!(!session.is_running());
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = SessionClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
