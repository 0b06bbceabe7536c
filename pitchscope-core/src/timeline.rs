//! # Scrolling Timeline
//!
//! Renders recent pitch history as a strip chart: time runs left to right
//! with "now" at a fixed position, and each semitone of the octave gets a
//! horizontal lane. Points are colored by octave and joined into lines except
//! across silences.
//!
//! The only state kept between frames is the pruned history and the scales
//! for the current surface size.

use std::collections::VecDeque;

use log::debug;

use crate::PitchEvent;
use crate::config::TimelineConfig;
use crate::notes::{self, NOTE_SYMBOLS};
use crate::render::{DrawOp, LinearScale, Point, Rgba, TextAlign};
use crate::scheduler::Visualizer;

const BACKGROUND: Rgba = Rgba::rgb(0xf5, 0xf5, 0xf5);
const HIGHLIGHT: Rgba = Rgba::rgb(0x88, 0x88, 0x88);
const LINE_COLOR: Rgba = Rgba::rgba(0, 0, 0, 0.1);
const POINT_RADIUS: f32 = 3.0;
const LABEL_SIZE: f32 = 14.0;

/// Point colors, one per octave (MIDI octave -1 first).
pub const OCTAVE_COLORS: [Rgba; 9] = [
    Rgba::rgb(121, 85, 72),
    Rgba::rgb(158, 158, 158),
    Rgba::rgb(96, 125, 139),
    Rgba::rgb(76, 175, 80),
    Rgba::rgb(244, 67, 54),
    Rgba::rgb(33, 150, 243),
    Rgba::rgb(0, 150, 136),
    Rgba::rgb(255, 235, 59),
    Rgba::rgb(0, 188, 212),
];

/// Palette entry for a MIDI note; octaves outside the palette are clamped.
pub fn octave_color(midi_note: i32) -> Rgba {
    let index = (notes::octave_of_note(midi_note)).clamp(0, OCTAVE_COLORS.len() as i32 - 1);
    OCTAVE_COLORS[index as usize]
}

/// One history entry mapped to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlottedPoint {
    pub timestamp_ms: u64,
    pub position: Point,
    pub clarity: f32,
    pub color: Rgba,
}

/// Splits time-ordered points into runs; a run ends wherever two neighbors
/// are more than `gap_ms` apart.
pub fn segments(points: &[PlottedPoint], gap_ms: u64) -> Vec<Vec<Point>> {
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut previous: Option<u64> = None;
    for point in points {
        let connected = previous.is_some_and(|t| point.timestamp_ms.saturating_sub(t) <= gap_ms);
        if connected {
            if let Some(run) = runs.last_mut() {
                run.push(point.position);
            }
        } else {
            runs.push(vec![point.position]);
        }
        previous = Some(point.timestamp_ms);
    }
    runs
}

#[derive(Debug, Clone, Copy)]
struct Scales {
    width: f32,
    height: f32,
    x: LinearScale,
    y: LinearScale,
}

/// Note-over-time strip chart.
#[derive(Debug, Clone)]
pub struct TimelineVisualizer {
    config: TimelineConfig,
    history: VecDeque<PitchEvent>,
    scales: Option<Scales>,
    last_ingest_ms: Option<u64>,
    /// Newest pitch offered during a throttled call, held for the next
    /// accepted one.
    pending: Option<PitchEvent>,
}

impl TimelineVisualizer {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
            scales: None,
            last_ingest_ms: None,
            pending: None,
        }
    }

    pub fn history(&self) -> &VecDeque<PitchEvent> {
        &self.history
    }

    /// Appends an event. Events older than the current tail are dropped so
    /// the history stays time-ordered.
    pub fn push(&mut self, event: PitchEvent) {
        if let Some(last) = self.history.back() {
            if event.timestamp_ms < last.timestamp_ms {
                debug!(
                    "[TIMELINE] Dropping out-of-order event at {} ms (tail at {} ms)",
                    event.timestamp_ms, last.timestamp_ms
                );
                return;
            }
        }
        self.history.push_back(event);
    }

    /// Removes every event whose age is at least the horizon.
    pub fn prune(&mut self, now_ms: u64) {
        while let Some(front) = self.history.front() {
            if now_ms.saturating_sub(front.timestamp_ms) >= self.config.horizon_ms {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Throttled ingestion. A call closer than `throttle_ms` to the previous
    /// accepted call draws nothing and only remembers its pitch. An accepted
    /// call stamps the newest pitch seen since the last insertion with
    /// `now_ms`, stores it, and redraws the notes layer.
    pub fn ingest(&mut self, latest: Option<&PitchEvent>, now_ms: u64) -> Option<Vec<DrawOp>> {
        let fresh = latest.filter(|e| e.is_pitched()).copied();
        if let Some(last) = self.last_ingest_ms {
            if now_ms.saturating_sub(last) < self.config.throttle_ms {
                if fresh.is_some() {
                    self.pending = fresh;
                }
                return None;
            }
        }
        if let Some(event) = fresh.or(self.pending.take()) {
            self.push(PitchEvent::new(event.frequency, now_ms, event.clarity));
        }
        self.pending = None;
        self.last_ingest_ms = Some(now_ms);
        Some(self.render(now_ms))
    }

    /// Prunes, then maps every remaining event to the surface.
    pub fn plot(&mut self, now_ms: u64) -> Vec<PlottedPoint> {
        self.prune(now_ms);
        let Some(scales) = self.scales else {
            return Vec::new();
        };
        self.history
            .iter()
            .map(|event| {
                let note = notes::note_from_frequency(event.frequency);
                let age = event.timestamp_ms as f32 - now_ms as f32;
                PlottedPoint {
                    timestamp_ms: event.timestamp_ms,
                    position: Point::new(
                        scales.x.apply(age),
                        scales.y.apply(notes::continuous_note(event.frequency)),
                    ),
                    clarity: event.clarity,
                    color: octave_color(note),
                }
            })
            .collect()
    }

    /// The notes layer: connecting lines first, then one dot per event.
    pub fn render(&mut self, now_ms: u64) -> Vec<DrawOp> {
        let points = self.plot(now_ms);
        let mut ops = Vec::with_capacity(points.len() + 4);

        for run in segments(&points, self.config.gap_ms) {
            if run.len() > 1 {
                ops.push(DrawOp::Polyline {
                    points: run,
                    width: 1.0,
                    color: LINE_COLOR,
                });
            }
        }

        for point in &points {
            ops.push(DrawOp::Circle {
                center: point.position,
                radius: POINT_RADIUS,
                color: point.color.with_alpha(point.clarity * 0.5),
            });
        }
        ops
    }

    /// Lane grid, lane labels and the "now" marker.
    pub fn background(&self) -> Vec<DrawOp> {
        let Some(scales) = self.scales else {
            return Vec::new();
        };
        let now_x = scales.x.apply(0.0);
        let grid = HIGHLIGHT.with_alpha(0x55 as f32 / 255.0);

        let mut ops = vec![DrawOp::Clear { color: BACKGROUND }];
        for (lane, symbol) in NOTE_SYMBOLS.iter().enumerate() {
            let y = scales.y.apply(lane as f32);
            ops.push(DrawOp::FillRect {
                origin: Point::new(0.0, y),
                width: scales.width,
                height: 1.0,
                color: grid,
            });
            for x in [now_x + 20.0, 20.0] {
                ops.push(DrawOp::Text {
                    position: Point::new(x, y - 2.0 - LABEL_SIZE),
                    content: symbol.to_string(),
                    size: LABEL_SIZE,
                    color: HIGHLIGHT,
                    align: TextAlign::Left,
                });
            }
        }
        ops.push(DrawOp::FillRect {
            origin: Point::new(now_x, 0.0),
            width: 1.0,
            height: scales.height,
            color: grid,
        });
        ops
    }
}

impl Visualizer for TimelineVisualizer {
    fn resize(&mut self, width: f32, height: f32) -> Vec<DrawOp> {
        let offset = self.config.time_offset_ms as f32;
        let span = self.config.time_span_ms as f32;
        let margin = height / (NOTE_SYMBOLS.len() as f32 + 1.0);
        self.scales = Some(Scales {
            width,
            height,
            x: LinearScale::new((-offset, -offset + span), (0.0, width)),
            y: LinearScale::new((0.0, NOTE_SYMBOLS.len() as f32 - 1.0), (height - margin, margin)),
        });
        self.background()
    }

    fn update(&mut self, latest: Option<&PitchEvent>, now_ms: u64) -> Option<Vec<DrawOp>> {
        self.ingest(latest, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn timeline() -> TimelineVisualizer {
        let mut timeline = TimelineVisualizer::new(TimelineConfig::default());
        timeline.resize(600.0, 260.0);
        timeline
    }

    fn event(frequency: f32, timestamp_ms: u64) -> PitchEvent {
        PitchEvent::new(frequency, timestamp_ms, 1.0)
    }

    fn plotted(timestamps: &[u64]) -> Vec<PlottedPoint> {
        timestamps
            .iter()
            .map(|&t| PlottedPoint {
                timestamp_ms: t,
                position: Point::new(t as f32, 0.0),
                clarity: 1.0,
                color: OCTAVE_COLORS[0],
            })
            .collect()
    }

    #[test]
    fn prune_drops_events_at_or_past_the_horizon() {
        let mut timeline = timeline();
        for t in [0, 1000, 4999, 5000, 7000] {
            timeline.push(event(440.0, t));
        }
        timeline.prune(10_000);
        let kept: Vec<u64> = timeline.history().iter().map(|e| e.timestamp_ms).collect();
        // 10000 - 5000 == horizon, so 5000 goes too.
        assert_eq!(kept, vec![7000]);
    }

    #[test]
    fn no_event_survives_a_render_pass_past_the_horizon() {
        let mut timeline = timeline();
        let mut now = 0;
        for step in 0..400u64 {
            now += 17 + (step * 37) % 90;
            timeline.ingest(Some(&event(220.0 + step as f32, 0)), now);
            assert!(
                timeline
                    .history()
                    .iter()
                    .all(|e| now - e.timestamp_ms < TimelineConfig::default().horizon_ms)
            );
        }
        assert!(!timeline.history().is_empty());
    }

    #[test]
    fn ingestion_is_throttled() {
        let mut timeline = timeline();
        assert!(timeline.ingest(Some(&event(440.0, 0)), 1000).is_some());
        assert!(timeline.ingest(Some(&event(440.0, 0)), 1016).is_none());
        assert_eq!(timeline.history().len(), 1);
        assert!(timeline.ingest(Some(&event(440.0, 0)), 1017).is_some());
        assert_eq!(timeline.history().len(), 2);
    }

    #[test]
    fn pitch_offered_on_a_throttled_tick_is_kept_for_the_next_one() {
        let mut timeline = timeline();
        let ticks = [
            (0, Some(event(440.0, 0))),
            (16, Some(event(660.0, 16))),
            (32, None),
            (48, None),
        ];
        for (now, latest) in ticks {
            timeline.ingest(latest.as_ref(), now);
        }
        let stored: Vec<(f32, u64)> = timeline
            .history()
            .iter()
            .map(|e| (e.frequency, e.timestamp_ms))
            .collect();
        assert_eq!(stored, vec![(440.0, 0), (660.0, 32)]);
    }

    #[test]
    fn held_pitch_is_replaced_by_a_newer_one_and_used_once() {
        let mut timeline = timeline();
        timeline.ingest(None, 0);
        timeline.ingest(Some(&event(300.0, 5)), 5);
        timeline.ingest(Some(&event(310.0, 10)), 10);
        timeline.ingest(None, 20);
        timeline.ingest(None, 40);
        let stored: Vec<f32> = timeline.history().iter().map(|e| e.frequency).collect();
        assert_eq!(stored, vec![310.0]);
    }

    #[test]
    fn ingest_stamps_with_frame_time_and_skips_silence() {
        let mut timeline = timeline();
        timeline.ingest(Some(&event(440.0, 3)), 500);
        timeline.ingest(Some(&event(0.0, 4)), 600);
        timeline.ingest(None, 700);
        assert_eq!(timeline.history().len(), 1);
        assert_eq!(timeline.history()[0].timestamp_ms, 500);
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let mut timeline = timeline();
        timeline.push(event(440.0, 100));
        timeline.push(event(440.0, 50));
        timeline.push(event(440.0, 100));
        assert_eq!(timeline.history().len(), 2);
    }

    #[test]
    fn gaps_split_polylines() {
        let runs = segments(&plotted(&[0, 100, 600, 1101, 1200]), 500);
        // 100 -> 600 is exactly 500: connected. 600 -> 1101 is 501: split.
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 3);
        assert_eq!(runs[1].len(), 2);
        assert!(segments(&[], 500).is_empty());
    }

    #[test]
    fn single_points_produce_no_line() {
        let mut timeline = timeline();
        timeline.push(event(440.0, 0));
        timeline.push(event(440.0, 1000));
        let ops = timeline.render(1500);
        assert!(!ops.iter().any(|op| matches!(op, DrawOp::Polyline { .. })));
        assert_eq!(ops.iter().filter(|op| matches!(op, DrawOp::Circle { .. })).count(), 2);
    }

    #[test]
    fn points_map_time_and_note_to_the_surface() {
        let mut timeline = timeline();
        timeline.push(event(440.0, 10_000));
        let points = timeline.plot(10_000);
        // "now" sits at 5000 / 6000 of the width.
        assert_abs_diff_eq!(points[0].position.x, 500.0, epsilon = 1e-3);
        let margin = 260.0 / 13.0;
        let lane_a = (260.0 - margin) + 9.0 / 11.0 * (2.0 * margin - 260.0);
        assert_abs_diff_eq!(points[0].position.y, lane_a, epsilon = 1e-2);
        // A4 is MIDI 69, octave 4, fifth palette entry.
        assert_eq!(points[0].color, OCTAVE_COLORS[4]);
    }

    #[test]
    fn higher_notes_are_higher_on_screen() {
        let mut timeline = timeline();
        timeline.push(event(261.63, 0));
        timeline.push(event(493.88, 1));
        let points = timeline.plot(2);
        assert!(points[1].position.y < points[0].position.y);
    }

    #[test]
    fn dot_opacity_follows_clarity() {
        let mut timeline = timeline();
        timeline.push(PitchEvent::new(440.0, 0, 0.4));
        let ops = timeline.render(0);
        let alpha = ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Circle { color, radius, .. } => {
                    assert_eq!(*radius, 3.0);
                    Some(color.a)
                }
                _ => None,
            })
            .unwrap();
        assert_abs_diff_eq!(alpha, 0.2);
    }

    #[test]
    fn octave_palette_is_clamped() {
        assert_eq!(octave_color(0), OCTAVE_COLORS[0]);
        assert_eq!(octave_color(-30), OCTAVE_COLORS[0]);
        assert_eq!(octave_color(60), OCTAVE_COLORS[4]);
        assert_eq!(octave_color(127), OCTAVE_COLORS[8]);
    }

    #[test]
    fn background_has_a_lane_per_semitone_and_a_now_marker() {
        let ops = timeline().background();
        let rects = ops.iter().filter(|op| matches!(op, DrawOp::FillRect { .. })).count();
        let labels = ops.iter().filter(|op| matches!(op, DrawOp::Text { .. })).count();
        assert_eq!(rects, 13);
        assert_eq!(labels, 24);
        assert!(matches!(ops[0], DrawOp::Clear { .. }));
    }
}
