//! # Cross-Thread Channel Module
//!
//! Ordered, one-way message passing between the realtime audio context and
//! the UI context. Each direction is its own channel; nothing mutable is
//! shared between the two sides.
//!
//! ## Guarantees
//! - Messages arrive in the order they were posted on one channel
//! - Posting never blocks and never drops (the queue is unbounded)
//! - Receiving is non-blocking; a slow consumer just sees a longer queue
//!
//! The same messages also have a JSON wire form (`encode` / `decode`) for
//! transports that cannot move Rust values directly.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every message that crosses the realtime/UI boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChannelMessage {
    /// Sent once by the UI side: the serialized engine plus the stream
    /// geometry the realtime side needs to build its analysis window.
    #[serde(rename_all = "camelCase")]
    Init {
        engine_bytes: Vec<u8>,
        sample_rate: f32,
        window_size: usize,
    },
    /// Sent by the realtime side for every window that produced a pitch.
    PitchDetected {
        frequency: f32,
        #[serde(default = "full_clarity")]
        clarity: f32,
    },
}

fn full_clarity() -> f32 {
    1.0
}

/// Sending half of one direction of the channel.
#[derive(Debug, Clone)]
pub struct MessageSender {
    inner: Sender<ChannelMessage>,
}

/// Receiving half of one direction of the channel.
#[derive(Debug)]
pub struct MessageReceiver {
    inner: Receiver<ChannelMessage>,
}

/// Creates one direction of the channel.
pub fn channel() -> (MessageSender, MessageReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (MessageSender { inner: tx }, MessageReceiver { inner: rx })
}

impl MessageSender {
    /// Posts a message without blocking. Returns `false` if the receiving
    /// side is gone, in which case the message is discarded.
    pub fn post(&self, message: ChannelMessage) -> bool {
        match self.inner.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!("[CHANNEL] Receiver gone, dropping {:?}", e.into_inner());
                false
            }
        }
    }
}

impl MessageReceiver {
    /// Takes the next pending message, if any.
    pub fn try_recv(&self) -> Option<ChannelMessage> {
        match self.inner.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every message pending right now, in send order.
    pub fn drain(&self) -> impl Iterator<Item = ChannelMessage> + '_ {
        self.inner.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.inner.len()
    }
}

/// Errors raised while decoding a wire payload.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed channel message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Channel message has no string `kind` field")]
    MissingKind,
}

const KNOWN_KINDS: [&str; 2] = ["init", "pitchDetected"];

/// Encodes a message to its JSON wire form.
///
/// In-process sessions move `ChannelMessage` values directly and never call
/// this; it is the framing for transports that only carry bytes, such as a
/// socket to a UI running in another process.
pub fn encode(message: &ChannelMessage) -> Vec<u8> {
    // Only numbers, byte arrays and a tag: serialization cannot fail.
    serde_json::to_vec(message).unwrap_or_default()
}

/// Decodes a JSON wire payload produced by `encode` or by a foreign peer.
/// Messages of an unknown kind decode to `Ok(None)` and are meant to be
/// ignored.
pub fn decode(bytes: &[u8]) -> Result<Option<ChannelMessage>, WireError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let kind = value
        .get("kind")
        .and_then(|k| k.as_str())
        .ok_or(WireError::MissingKind)?;
    if !KNOWN_KINDS.contains(&kind) {
        debug!("[CHANNEL] Ignoring unknown message kind {kind:?}");
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_send_order() {
        let (tx, rx) = channel();
        for i in 0..100 {
            assert!(tx.post(ChannelMessage::PitchDetected {
                frequency: i as f32,
                clarity: 1.0,
            }));
        }
        assert_eq!(rx.pending(), 100);
        let received: Vec<f32> = rx
            .drain()
            .map(|m| match m {
                ChannelMessage::PitchDetected { frequency, .. } => frequency,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(received, (0..100).map(|i| i as f32).collect::<Vec<_>>());
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn order_survives_a_thread_hop() {
        let (tx, rx) = channel();
        let producer = std::thread::spawn(move || {
            for i in 0..1000 {
                tx.post(ChannelMessage::PitchDetected {
                    frequency: i as f32,
                    clarity: 0.5,
                });
            }
        });
        producer.join().unwrap();
        let mut expected = 0.0;
        while let Some(ChannelMessage::PitchDetected { frequency, .. }) = rx.try_recv() {
            assert_eq!(frequency, expected);
            expected += 1.0;
        }
        assert_eq!(expected, 1000.0);
    }

    #[test]
    fn post_after_receiver_dropped_reports_false() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.post(ChannelMessage::PitchDetected {
            frequency: 440.0,
            clarity: 1.0,
        }));
    }

    #[test]
    fn wire_schema_field_names() {
        let init = ChannelMessage::Init {
            engine_bytes: vec![1, 2, 3],
            sample_rate: 44100.0,
            window_size: 1024,
        };
        let json: serde_json::Value = serde_json::from_slice(&encode(&init)).unwrap();
        assert_eq!(json["kind"], "init");
        assert_eq!(json["engineBytes"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["sampleRate"], 44100.0);
        assert_eq!(json["windowSize"], 1024);
        assert_eq!(decode(&encode(&init)).unwrap(), Some(init));
    }

    #[test]
    fn pitch_without_clarity_defaults_to_full() {
        let decoded = decode(br#"{"kind":"pitchDetected","frequency":261.5}"#).unwrap();
        assert_eq!(
            decoded,
            Some(ChannelMessage::PitchDetected {
                frequency: 261.5,
                clarity: 1.0,
            })
        );
    }

    #[test]
    fn unknown_kinds_are_ignored() {
        assert_eq!(decode(br#"{"kind":"volume","level":3}"#).unwrap(), None);
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(decode(b"{not json"), Err(WireError::Malformed(_))));
        assert!(matches!(decode(br#"{"frequency":1.0}"#), Err(WireError::MissingKind)));
        assert!(matches!(
            decode(br#"{"kind":"pitchDetected"}"#),
            Err(WireError::Malformed(_))
        ));
    }
}
