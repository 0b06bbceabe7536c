//! # Realtime Pitch Processor
//!
//! The realtime-side half of the pipeline. It is invoked once per audio chunk
//! from the capture callback, so everything here must return promptly: no
//! blocking, no waiting on the UI side, no allocation once initialized.
//!
//! The processor owns its analysis window and engine exclusively and talks
//! to the UI side only through the two channel halves it was built with.

use log::{debug, info, trace, warn};

use crate::MIN_FREQUENCY;
use crate::channel::{ChannelMessage, MessageReceiver, MessageSender};
use crate::engine::{self, PitchEngine};
use crate::window::AnalysisWindow;

/// Whether the processor can analyze audio yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No `init` message handled yet; audio is discarded.
    AwaitingInit,
    /// Engine constructed; full windows are analyzed.
    Ready,
    /// Engine construction failed; audio is discarded for the rest of the
    /// session.
    Failed,
}

/// Realtime worker: buffers chunks, runs the engine on full windows and
/// posts `pitchDetected` for every usable result.
pub struct PitchProcessor {
    inbox: MessageReceiver,
    outbox: MessageSender,
    window: AnalysisWindow,
    engine: Option<Box<dyn PitchEngine>>,
    readiness: Readiness,
    detections: u64,
}

impl PitchProcessor {
    pub fn new(inbox: MessageReceiver, outbox: MessageSender) -> Self {
        Self {
            inbox,
            outbox,
            window: AnalysisWindow::placeholder(),
            engine: None,
            readiness: Readiness::AwaitingInit,
            detections: 0,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Number of times the engine has been run.
    pub fn detections(&self) -> u64 {
        self.detections
    }

    pub fn window(&self) -> &AnalysisWindow {
        &self.window
    }

    /// Handles one chunk of mono samples from the capture backend.
    ///
    /// Pending control messages are handled first, so a chunk arriving right
    /// after `init` is already analyzed.
    pub fn process(&mut self, chunk: &[f32]) {
        while let Some(message) = self.inbox.try_recv() {
            self.handle_message(message);
        }

        let full = self.window.append(chunk);
        if !full {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        self.detections += 1;
        let estimate = engine.detect(self.window.samples());
        if estimate.frequency > MIN_FREQUENCY {
            trace!("[PROCESSOR] Pitch {:.2} Hz (clarity {:.2})", estimate.frequency, estimate.clarity);
            self.outbox.post(ChannelMessage::PitchDetected {
                frequency: estimate.frequency,
                clarity: estimate.clarity,
            });
        }
    }

    fn handle_message(&mut self, message: ChannelMessage) {
        match message {
            ChannelMessage::Init {
                engine_bytes,
                sample_rate,
                window_size,
            } => self.initialize(&engine_bytes, sample_rate, window_size),
            other => debug!("[PROCESSOR] Ignoring message not meant for the realtime side: {other:?}"),
        }
    }

    fn initialize(&mut self, engine_bytes: &[u8], sample_rate: f32, window_size: usize) {
        if self.readiness != Readiness::AwaitingInit {
            warn!("[PROCESSOR] Ignoring repeated init message");
            return;
        }

        match engine::construct(engine_bytes, sample_rate, window_size) {
            Ok(engine) => {
                self.window = AnalysisWindow::new(window_size);
                self.engine = Some(engine);
                self.readiness = Readiness::Ready;
                info!("[PROCESSOR] Engine ready: {window_size} samples per analysis at {sample_rate} Hz");
            }
            Err(e) => {
                self.readiness = Readiness::Failed;
                warn!("[PROCESSOR] Engine initialization failed, no pitch will be reported: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::channel;
    use crate::engine::{EngineDescriptor, Estimate};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that counts calls and always reports a fixed pitch.
    struct CountingEngine {
        calls: Arc<AtomicUsize>,
        frequency: f32,
    }

    impl PitchEngine for CountingEngine {
        fn detect(&mut self, window: &[f32]) -> Estimate {
            assert_eq!(window.len(), 8);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Estimate {
                frequency: self.frequency,
                clarity: 0.75,
            }
        }
    }

    fn ready_processor(frequency: f32) -> (PitchProcessor, MessageReceiver, Arc<AtomicUsize>) {
        let (_to_rt, inbox) = channel();
        let (outbox, from_rt) = channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut processor = PitchProcessor::new(inbox, outbox);
        processor.window = AnalysisWindow::new(8);
        processor.engine = Some(Box::new(CountingEngine {
            calls: calls.clone(),
            frequency,
        }));
        processor.readiness = Readiness::Ready;
        (processor, from_rt, calls)
    }

    #[test]
    fn detection_runs_only_on_exact_fill() {
        let (mut processor, _rx, calls) = ready_processor(440.0);
        processor.process(&[0.1; 3]);
        processor.process(&[0.1; 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        processor.process(&[0.1; 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Once full, every further chunk shifts and triggers again.
        processor.process(&[0.1; 5]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(processor.detections(), 2);
    }

    #[test]
    fn usable_pitch_is_posted() {
        let (mut processor, rx, _) = ready_processor(440.0);
        processor.process(&[0.1; 8]);
        assert_eq!(
            rx.try_recv(),
            Some(ChannelMessage::PitchDetected {
                frequency: 440.0,
                clarity: 0.75,
            })
        );
    }

    #[test]
    fn sentinel_frequencies_are_not_posted() {
        for frequency in [0.0, -1.0, 1.0] {
            let (mut processor, rx, calls) = ready_processor(frequency);
            processor.process(&[0.1; 8]);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(rx.try_recv().is_none());
        }
    }

    #[test]
    fn audio_before_init_is_dropped() {
        let (to_rt, inbox) = channel();
        let (outbox, _from_rt) = channel();
        let mut processor = PitchProcessor::new(inbox, outbox);

        processor.process(&[0.5; 512]);
        assert_eq!(processor.readiness(), Readiness::AwaitingInit);
        assert_eq!(processor.window().capacity(), 0);

        to_rt.post(ChannelMessage::Init {
            engine_bytes: EngineDescriptor::default().to_bytes(),
            sample_rate: 44100.0,
            window_size: 1024,
        });
        processor.process(&[0.5; 128]);
        assert_eq!(processor.readiness(), Readiness::Ready);
        // Only the post-init chunk made it into the window.
        assert_eq!(processor.window().len(), 128);
        assert_eq!(processor.window().capacity(), 1024);
    }

    #[test]
    fn failed_init_stays_unready() {
        let (to_rt, inbox) = channel();
        let (outbox, from_rt) = channel();
        let mut processor = PitchProcessor::new(inbox, outbox);

        to_rt.post(ChannelMessage::Init {
            engine_bytes: b"garbage".to_vec(),
            sample_rate: 44100.0,
            window_size: 1024,
        });
        // A later, valid init does not rescue the session.
        to_rt.post(ChannelMessage::Init {
            engine_bytes: EngineDescriptor::default().to_bytes(),
            sample_rate: 44100.0,
            window_size: 1024,
        });
        for _ in 0..16 {
            processor.process(&[0.5; 128]);
        }
        assert_eq!(processor.readiness(), Readiness::Failed);
        assert_eq!(processor.detections(), 0);
        assert!(from_rt.try_recv().is_none());
    }
}
