//! # Circular Tuning Dial
//!
//! Renders pitch as a needle on a ring, one full turn per octave, with C at
//! the top and the twelve semitones ascending clockwise.
//!
//! ## Layout
//! - Outer radius is a third of the smaller surface dimension, the inner
//!   radius 60% of that
//! - 60 ticks around the ring, every fifth one long (one per semitone)
//! - Note labels sit just outside the ring, each centered on its own angle

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::PitchEvent;
use crate::config::DialConfig;
use crate::notes::{self, NOTE_SYMBOLS};
use crate::render::{DrawOp, Point, Rgba, TextAlign};
use crate::scheduler::Visualizer;

const RING_FILL: Rgba = Rgba::rgb(204, 204, 240);
const RING_STROKE: Rgba = Rgba::rgb(110, 102, 102);
const NEEDLE_FILL: Rgba = Rgba::rgb(0, 128, 204);
const NEEDLE_STROKE: Rgba = Rgba::rgb(0, 77, 204);
const LABEL_COLOR: Rgba = Rgba::rgb(60, 60, 60);

const TICK_COUNT: usize = 60;
/// Half-width of the needle's base, in pixels.
const NEEDLE_HALF_BASE: f32 = 3.0;

/// Ring geometry for one surface size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialLayout {
    pub width: f32,
    pub height: f32,
    pub center: Point,
    pub inner_radius: f32,
    pub outer_radius: f32,
}

impl DialLayout {
    pub fn new(width: f32, height: f32) -> Self {
        let outer_radius = width.min(height).max(0.0) / 3.0;
        Self {
            width,
            height,
            center: Point::new(width / 2.0, height / 2.0),
            inner_radius: outer_radius * 0.6,
            outer_radius,
        }
    }

    fn at(&self, direction: (f32, f32), radius: f32) -> Point {
        Point::new(
            self.center.x + direction.0 * radius,
            self.center.y + direction.1 * radius,
        )
    }
}

/// A placed note label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub note_index: usize,
    /// Top-left corner on the surface.
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

/// Approximate text extents, since the core has no font rasterizer.
pub fn label_extent(text: &str, font_size: f32) -> (f32, f32) {
    (text.chars().count() as f32 * font_size * 0.6, font_size * 1.2)
}

/// Math angle (counter-clockwise, y up) at which a note's label is centered.
pub fn label_angle(note_index: usize) -> f32 {
    FRAC_PI_2 - note_index as f32 * TAU / 12.0
}

/// Screen direction (y down) of the needle for a dial angle.
///
/// A dial angle of 0 is A, which sits a half turn away from the unrotated
/// needle's zero reference, so the needle is turned by an extra π.
pub fn needle_direction(angle: f32) -> (f32, f32) {
    let screen_angle = angle + PI;
    (screen_angle.cos(), screen_angle.sin())
}

/// Offset from the dial center to the top-left corner of a `w` by `h` box so
/// that the box is centered on the ray at `angle` (math convention) and just
/// touches a circle of radius `r` without crossing it.
///
/// The quadrant is folded onto the first one. Near the axes the box's flat
/// edge touches the circle; in between, its nearest corner does, at the
/// distance `c` along the ray solving `c² − 2·c·a·cos(B) + (a² − r²) = 0`,
/// where `a` is the half-diagonal and `B` the angle between ray and diagonal.
pub fn radial_box_layout(angle: f32, r: f32, w: f32, h: f32) -> (f32, f32) {
    if r <= 0.0 {
        return (-w / 2.0, -h / 2.0);
    }

    let angle = angle.rem_euclid(TAU);
    let (sin, cos) = angle.sin_cos();
    let sign_x = if cos >= 0.0 { 1.0 } else { -1.0 };
    let sign_y = if sin >= 0.0 { 1.0 } else { -1.0 };
    let q = sin.abs().atan2(cos.abs());

    let side_range = (h / 2.0).atan2(r + w / 2.0);
    let top_range = (w / 2.0).atan2(r + h / 2.0);

    let (cx, cy) = if q <= side_range {
        // Left edge against the circle.
        let x = r + w / 2.0;
        (x, x * q.tan())
    } else if q >= FRAC_PI_2 - top_range {
        // Bottom edge against the circle.
        let y = r + h / 2.0;
        (y * (FRAC_PI_2 - q).tan(), y)
    } else {
        // Bottom-left corner against the circle.
        let a = (w * w / 4.0 + h * h / 4.0).sqrt();
        let b_angle = q - h.atan2(w);
        let disc = (r * r - a * a * b_angle.sin().powi(2)).max(0.0);
        let c = a * b_angle.cos() + disc.sqrt();
        (c * q.cos(), c * q.sin())
    };

    // Back to the original quadrant, then to screen coordinates (y down).
    (sign_x * cx - w / 2.0, -(sign_y * cy) - h / 2.0)
}

/// Tuning-dial visualizer. Stateless apart from the layout of the last size.
#[derive(Debug, Clone)]
pub struct CircularVisualizer {
    config: DialConfig,
    layout: Option<DialLayout>,
}

impl CircularVisualizer {
    pub fn new(config: DialConfig) -> Self {
        Self {
            config,
            layout: None,
        }
    }

    pub fn layout(&self) -> Option<&DialLayout> {
        self.layout.as_ref()
    }

    /// Places all twelve note labels around the ring.
    pub fn label_boxes(&self) -> Vec<LabelBox> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };
        let radius = layout.outer_radius + self.config.label_gap;
        NOTE_SYMBOLS
            .iter()
            .enumerate()
            .map(|(note_index, symbol)| {
                let (width, height) = label_extent(symbol, self.config.label_font_size);
                let (ox, oy) = radial_box_layout(label_angle(note_index), radius, width, height);
                LabelBox {
                    note_index,
                    origin: Point::new(layout.center.x + ox, layout.center.y + oy),
                    width,
                    height,
                }
            })
            .collect()
    }

    /// Ring, ticks and labels for the current layout.
    pub fn background(&self) -> Vec<DrawOp> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };

        let mut ops = Vec::with_capacity(TICK_COUNT + 14);
        ops.push(DrawOp::Ring {
            center: layout.center,
            inner_radius: layout.inner_radius,
            outer_radius: layout.outer_radius,
            fill: RING_FILL,
            stroke: RING_STROKE,
        });

        for i in 0..TICK_COUNT {
            let angle = i as f32 / TICK_COUNT as f32 * TAU;
            let length = if i % 5 == 0 { 1.0 } else { 0.5 };
            let direction = (angle.cos(), angle.sin());
            ops.push(DrawOp::Line {
                from: layout.at(direction, layout.outer_radius),
                to: layout.at(direction, (1.0 - 0.08 * length) * layout.outer_radius),
                width: 2.0,
                color: RING_STROKE,
            });
        }

        for label in self.label_boxes() {
            ops.push(DrawOp::Text {
                position: Point::new(label.origin.x + label.width / 2.0, label.origin.y),
                content: NOTE_SYMBOLS[label.note_index].to_string(),
                size: self.config.label_font_size,
                color: LABEL_COLOR,
                align: TextAlign::Center,
            });
        }
        ops
    }

    /// Triangular needle from the inner ring to the outer ring.
    pub fn needle(&self, angle: f32) -> Vec<DrawOp> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };
        let direction = needle_direction(angle);
        let normal = (-direction.1, direction.0);
        let base = layout.at(direction, layout.inner_radius);
        let opacity = self.config.needle_opacity;

        vec![DrawOp::Polygon {
            points: vec![
                Point::new(
                    base.x + NEEDLE_HALF_BASE * normal.0,
                    base.y + NEEDLE_HALF_BASE * normal.1,
                ),
                Point::new(
                    base.x - NEEDLE_HALF_BASE * normal.0,
                    base.y - NEEDLE_HALF_BASE * normal.1,
                ),
                layout.at(direction, layout.outer_radius),
            ],
            fill: NEEDLE_FILL.with_alpha(opacity),
            stroke: NEEDLE_STROKE.with_alpha(opacity),
        }]
    }

    /// Note name and frequency in the middle of the dial.
    pub fn readout(&self, frequency: f32) -> Vec<DrawOp> {
        let Some(layout) = self.layout else {
            return Vec::new();
        };
        let note = notes::freq_to_note(frequency);
        let size = (layout.inner_radius / 2.5).max(10.0);
        vec![
            DrawOp::Text {
                position: Point::new(layout.center.x, layout.center.y - size * 0.8),
                content: format!("{}{}", note.symbol(), note.octave),
                size,
                color: LABEL_COLOR,
                align: TextAlign::Center,
            },
            DrawOp::Text {
                position: Point::new(layout.center.x, layout.center.y + size * 0.4),
                content: format!("{} Hz", frequency.round() as i64),
                size: size / 2.0,
                color: LABEL_COLOR,
                align: TextAlign::Center,
            },
        ]
    }
}

impl Visualizer for CircularVisualizer {
    fn resize(&mut self, width: f32, height: f32) -> Vec<DrawOp> {
        self.layout = Some(DialLayout::new(width, height));
        self.background()
    }

    fn update(&mut self, latest: Option<&PitchEvent>, _now_ms: u64) -> Option<Vec<DrawOp>> {
        self.layout?;
        let event = latest.filter(|e| e.is_pitched())?;
        let mut ops = self.needle(notes::freq_to_angle(event.frequency));
        ops.extend(self.readout(event.frequency));
        Some(ops)
    }
}
