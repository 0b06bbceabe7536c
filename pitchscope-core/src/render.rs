//! # Render Primitives
//!
//! The drawing vocabulary shared by both visualizers. A visualizer never
//! touches a drawing surface: it turns a snapshot of its state into a list of
//! `DrawOp`s, and the front end replays them on whatever canvas it has.
//!
//! Coordinates are surface pixels with the origin at the top-left corner and
//! y growing downwards.

/// A point on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Horizontal anchoring of a text run relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Clears the surface to a color.
    Clear { color: Rgba },
    /// Filled axis-aligned rectangle.
    FillRect {
        origin: Point,
        width: f32,
        height: f32,
        color: Rgba,
    },
    /// Annulus between two radii, filled and outlined.
    Ring {
        center: Point,
        inner_radius: f32,
        outer_radius: f32,
        fill: Rgba,
        stroke: Rgba,
    },
    /// Straight line segment.
    Line {
        from: Point,
        to: Point,
        width: f32,
        color: Rgba,
    },
    /// Open connected line through the points.
    Polyline {
        points: Vec<Point>,
        width: f32,
        color: Rgba,
    },
    /// Closed filled and outlined polygon.
    Polygon {
        points: Vec<Point>,
        fill: Rgba,
        stroke: Rgba,
    },
    /// Filled circle.
    Circle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
    /// Text whose top edge sits at `position.y`.
    Text {
        position: Point,
        content: String,
        size: f32,
        color: Rgba,
        align: TextAlign,
    },
}

/// Linear mapping from a data domain to a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}
