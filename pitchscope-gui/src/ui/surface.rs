//! # Drawing Surface Widget
//!
//! Replays the core crate's `DrawOp` lists on an Iced canvas. The background
//! list only changes on resize or when the visualizer is swapped, so it is
//! drawn through a `canvas::Cache`; the foreground is redrawn every frame.

use iced::alignment;
use iced::widget::canvas::{self, Fill, Geometry, Path, Stroke, Style, fill};
use iced::widget::container;
use iced::{Color, Element, Pixels, Point, Rectangle, Renderer, Size, Theme, mouse};
use pitchscope_core::render::{self, DrawOp, Rgba, TextAlign};

/// Canvas program drawing one visualizer's output.
pub struct Surface<'a> {
    background: &'a [DrawOp],
    foreground: &'a [DrawOp],
    cache: &'a canvas::Cache,
}

impl<'a> Surface<'a> {
    pub fn new(background: &'a [DrawOp], foreground: &'a [DrawOp], cache: &'a canvas::Cache) -> Self {
        Self {
            background,
            foreground,
            cache,
        }
    }

    pub fn view(self) -> Element<'a, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Surface<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let background = self
            .cache
            .draw(renderer, bounds.size(), |frame| replay(frame, self.background));

        let mut frame = canvas::Frame::new(renderer, bounds.size());
        replay(&mut frame, self.foreground);

        vec![background, frame.into_geometry()]
    }
}

fn color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn point(p: render::Point) -> Point {
    Point::new(p.x, p.y)
}

fn stroke(width: f32, c: Rgba) -> Stroke<'static> {
    Stroke::default().with_width(width).with_color(color(c))
}

fn open_path(points: &[render::Point], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    Some(Path::new(|builder| {
        builder.move_to(point(*first));
        for p in rest {
            builder.line_to(point(*p));
        }
        if close {
            builder.close();
        }
    }))
}

/// Draws every operation in order onto `frame`.
pub fn replay(frame: &mut canvas::Frame, ops: &[DrawOp]) {
    for op in ops {
        match op {
            DrawOp::Clear { color: c } => {
                frame.fill_rectangle(Point::ORIGIN, frame.size(), color(*c));
            }
            DrawOp::FillRect {
                origin,
                width,
                height,
                color: c,
            } => {
                frame.fill_rectangle(point(*origin), Size::new(*width, *height), color(*c));
            }
            DrawOp::Ring {
                center,
                inner_radius,
                outer_radius,
                fill: f,
                stroke: s,
            } => {
                let ring = Path::new(|builder| {
                    builder.circle(point(*center), *outer_radius);
                    builder.circle(point(*center), *inner_radius);
                });
                frame.fill(
                    &ring,
                    Fill {
                        style: Style::Solid(color(*f)),
                        rule: fill::Rule::EvenOdd,
                    },
                );
                frame.stroke(&ring, stroke(1.0, *s));
            }
            DrawOp::Line {
                from,
                to,
                width,
                color: c,
            } => {
                frame.stroke(&Path::line(point(*from), point(*to)), stroke(*width, *c));
            }
            DrawOp::Polyline { points, width, color: c } => {
                if let Some(path) = open_path(points, false) {
                    frame.stroke(&path, stroke(*width, *c));
                }
            }
            DrawOp::Polygon { points, fill: f, stroke: s } => {
                if let Some(path) = open_path(points, true) {
                    frame.fill(&path, color(*f));
                    frame.stroke(&path, stroke(1.0, *s));
                }
            }
            DrawOp::Circle { center, radius, color: c } => {
                frame.fill(&Path::circle(point(*center), *radius), color(*c));
            }
            DrawOp::Text {
                position,
                content,
                size,
                color: c,
                align,
            } => {
                frame.fill_text(canvas::Text {
                    content: content.clone(),
                    position: point(*position),
                    color: color(*c),
                    size: Pixels(*size),
                    horizontal_alignment: match align {
                        TextAlign::Left => alignment::Horizontal::Left,
                        TextAlign::Center => alignment::Horizontal::Center,
                    },
                    vertical_alignment: alignment::Vertical::Top,
                    ..canvas::Text::default()
                });
            }
        }
    }
}
