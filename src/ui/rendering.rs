//! egui backend for the display list.
//!
//! Commands arrive in canvas bitmap pixels; they are mapped back into egui points by
//! dividing by `pixels_per_point` and offsetting by the canvas rect.

use crate::geometry::Point;
use crate::rendering::{DrawCommand, Rgba, Stroke, TextAnchor};
use eframe::egui;

/// Segments used to approximate a dashed circle.
const DASHED_CIRCLE_SEGMENTS: usize = 48;

fn color32(color: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

/// Maps canvas bitmap pixels onto the painter.
struct CanvasTransform {
    origin: egui::Pos2,
    pixels_per_point: f32,
}

impl CanvasTransform {
    fn pos(&self, p: Point) -> egui::Pos2 {
        self.origin + egui::vec2(p.x as f32, p.y as f32) / self.pixels_per_point
    }

    fn len(&self, pixels: f64) -> f32 {
        pixels as f32 / self.pixels_per_point
    }

    fn stroke(&self, stroke: &Stroke) -> egui::Stroke {
        egui::Stroke::new(self.len(stroke.width), color32(stroke.color))
    }

    fn dash(&self, stroke: &Stroke) -> Option<(f32, f32)> {
        stroke.dash.map(|[on, off]| (self.len(on), self.len(off)))
    }
}

fn polyline(painter: &egui::Painter, points: Vec<egui::Pos2>, stroke: egui::Stroke, dash: Option<(f32, f32)>, closed: bool) {
    match dash {
        Some((on, off)) => {
            let mut points = points;
            if closed {
                if let Some(first) = points.first().copied() {
                    points.push(first);
                }
            }
            painter.extend(egui::Shape::dashed_line(&points, stroke, on, off));
        }
        None if closed => {
            painter.add(egui::Shape::closed_line(points, stroke));
        }
        None => {
            painter.add(egui::Shape::line(points, stroke));
        }
    }
}

fn paint_text(
    painter: &egui::Painter,
    pos: egui::Pos2,
    text: &str,
    size: f32,
    color: egui::Color32,
    angle: f32,
    anchor: TextAnchor,
) {
    let galley = painter.layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(size.max(1.0)),
        color,
    );
    let box_size = galley.size();
    // Offset from the anchor point to the galley's top-left corner, before rotation.
    let offset = match anchor {
        TextAnchor::Center => -box_size / 2.0,
        TextAnchor::LeftBottom => egui::vec2(0.0, -box_size.y),
        TextAnchor::LeftBaseline => egui::vec2(0.0, -size),
    };
    let top_left = pos + egui::emath::Rot2::from_angle(angle) * offset;
    painter.add(egui::epaint::TextShape::new(top_left, galley, color).with_angle(angle));
}

/// Paints `commands` into `rect`.
///
/// # Arguments
///
/// * `painter` - Painter clipped to the canvas
/// * `rect` - Canvas rect in egui points
/// * `pixels_per_point` - Device pixels per egui point, as used when rendering
/// * `commands` - Display list in canvas bitmap pixels
pub fn paint_display_list(
    painter: &egui::Painter,
    rect: egui::Rect,
    pixels_per_point: f32,
    commands: &[DrawCommand],
) {
    let t = CanvasTransform {
        origin: rect.min,
        pixels_per_point: if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 },
    };

    for command in commands {
        match command {
            DrawCommand::Fill(color) => {
                painter.rect_filled(rect, 0.0, color32(*color));
            }
            DrawCommand::Line { from, to, stroke } => {
                polyline(painter, vec![t.pos(*from), t.pos(*to)], t.stroke(stroke), t.dash(stroke), false);
            }
            DrawCommand::Circle {
                center,
                radius,
                stroke,
                fill,
            } => {
                let center = t.pos(*center);
                let radius = t.len(*radius);
                if let Some(fill) = fill {
                    painter.circle_filled(center, radius, color32(*fill));
                }
                let Some(stroke) = stroke else {
                    continue;
                };
                match t.dash(stroke) {
                    None => {
                        painter.circle_stroke(center, radius, t.stroke(stroke));
                    }
                    dash => {
                        let points = (0..DASHED_CIRCLE_SEGMENTS)
                            .map(|i| {
                                let a = i as f32 / DASHED_CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
                                center + egui::vec2(a.cos(), a.sin()) * radius
                            })
                            .collect();
                        polyline(painter, points, t.stroke(stroke), dash, true);
                    }
                }
            }
            DrawCommand::Polygon { points, stroke } => {
                let points = points.iter().map(|p| t.pos(*p)).collect();
                polyline(painter, points, t.stroke(stroke), t.dash(stroke), true);
            }
            DrawCommand::Text {
                pos,
                text,
                size,
                color,
                angle,
                anchor,
            } => {
                paint_text(
                    painter,
                    t.pos(*pos),
                    text,
                    t.len(*size),
                    color32(*color),
                    *angle as f32,
                    *anchor,
                );
            }
        }
    }
}
