//! SVG serialisation of a rendered display list.
//!
//! Used as the intermediate for raster export: the display list produced in export mode is
//! written out as SVG and rasterised by the UI layer.

use crate::rendering::{DrawCommand, Rgba, Stroke, TextAnchor};
use std::fmt::Write as _;

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(
        "stroke=\"{}\" stroke-width=\"{:.2}\"",
        stroke.color.to_hex(),
        stroke.width
    );
    if stroke.color.a < 255 {
        let _ = write!(attrs, " stroke-opacity=\"{:.3}\"", stroke.color.opacity());
    }
    if let Some([on, off]) = stroke.dash {
        let _ = write!(attrs, " stroke-dasharray=\"{:.2} {:.2}\"", on, off);
    }
    attrs
}

fn fill_attrs(fill: Option<Rgba>) -> String {
    match fill {
        Some(color) if color.a < 255 => {
            format!("fill=\"{}\" fill-opacity=\"{:.3}\"", color.to_hex(), color.opacity())
        }
        Some(color) => format!("fill=\"{}\"", color.to_hex()),
        None => "fill=\"none\"".to_string(),
    }
}

/// Writes `commands` as a standalone SVG document of `width` x `height` pixels.
///
/// # Arguments
///
/// * `commands` - Display list in canvas pixel coordinates, back to front
/// * `width` - Canvas width in pixels
/// * `height` - Canvas height in pixels
pub fn to_svg(commands: &[DrawCommand], width: u32, height: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = height
    );

    for command in commands {
        match command {
            DrawCommand::Fill(color) => {
                let _ = writeln!(
                    out,
                    "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" {} />",
                    width,
                    height,
                    fill_attrs(Some(*color))
                );
            }
            DrawCommand::Line { from, to, stroke } => {
                let _ = writeln!(
                    out,
                    "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {} stroke-linecap=\"round\" />",
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    stroke_attrs(stroke)
                );
            }
            DrawCommand::Circle {
                center,
                radius,
                stroke,
                fill,
            } => {
                let stroke = stroke.as_ref().map(stroke_attrs).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" {} {} />",
                    center.x,
                    center.y,
                    radius,
                    fill_attrs(*fill),
                    stroke
                );
            }
            DrawCommand::Polygon { points, stroke } => {
                let mut coords = String::new();
                for (i, p) in points.iter().enumerate() {
                    if i > 0 {
                        coords.push(' ');
                    }
                    let _ = write!(coords, "{:.2},{:.2}", p.x, p.y);
                }
                let _ = writeln!(
                    out,
                    "<polygon points=\"{}\" fill=\"none\" {} stroke-linejoin=\"round\" />",
                    coords,
                    stroke_attrs(stroke)
                );
            }
            DrawCommand::Text {
                pos,
                text,
                size,
                color,
                angle,
                anchor,
            } => {
                let placement = match anchor {
                    TextAnchor::Center => " text-anchor=\"middle\" dominant-baseline=\"central\"",
                    TextAnchor::LeftBaseline => "",
                    TextAnchor::LeftBottom => " dominant-baseline=\"ideographic\"",
                };
                let rotation = if *angle != 0.0 {
                    format!(
                        " transform=\"rotate({:.3} {:.2} {:.2})\"",
                        angle.to_degrees(),
                        pos.x,
                        pos.y
                    )
                } else {
                    String::new()
                };
                let _ = writeln!(
                    out,
                    "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"sans-serif\" font-size=\"{:.2}\" {}{}{}>{}</text>",
                    pos.x,
                    pos.y,
                    size,
                    fill_attrs(Some(*color)),
                    placement,
                    rotation,
                    escape_xml(text)
                );
            }
        }
    }

    let _ = writeln!(out, "</svg>");
    out
}

fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}
