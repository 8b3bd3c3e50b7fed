//! Frame rendering into a backend-neutral display list.
//!
//! [`render`] is a pure function of a [`Scene`]: the document, the viewport, the selection
//! and the transient placement ghost. It returns [`DrawCommand`]s in canvas pixel
//! coordinates, back to front. The egui painter and the SVG writer both consume the same
//! list, so the editor view and exported images never diverge.

use crate::constants::{
    GRID_SIZE, LABEL_FONT_SIZE, NODE_MARKER_RADIUS, PREVIEW_ALPHA, TEXT_FONT_SIZE,
};
use crate::geometry::{
    cheese_glyph, custom_fitting_glyph, elbow_glyph, label_leader, meter_glyph, pipe_glyph,
    shape_radius, socket_glyph, text_width, union_glyph, valve_glyph, Point, Primitive,
};
use crate::interaction::Tool;
use crate::types::{Document, PipeColor, Shape, ShapeKind};
use crate::viewport::Viewport;
use std::f64::consts::FRAC_PI_2;

/// An sRGB colour with straight (unpremultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same colour with its alpha multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn opacity(self) -> f32 {
        self.a as f32 / 255.0
    }

    /// `#rrggbb`, ignoring alpha.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const BACKGROUND_COLOR: Rgba = Rgba::rgb(255, 255, 255);
pub const GRID_COLOR: Rgba = Rgba::rgb(0x37, 0x41, 0x51);
pub const EXISTING_COLOR: Rgba = Rgba::rgb(0x25, 0x63, 0xeb);
pub const NEW_WORK_COLOR: Rgba = Rgba::rgb(0xdc, 0x26, 0x26);
pub const TEXT_COLOR: Rgba = Rgba::rgb(0x11, 0x18, 0x27);
pub const METER_TEXT_COLOR: Rgba = Rgba::rgb(0, 0, 0);
pub const SELECTED_LABEL_COLOR: Rgba = Rgba::rgb(0xec, 0x48, 0x99);
pub const HALO_COLOR: Rgba = Rgba::rgba(236, 72, 153, 102);
pub const NODE_MARKER_COLOR: Rgba = Rgba::rgb(0x0e, 0xa5, 0xe9);
pub const GUIDE_COLOR: Rgba = Rgba::rgb(255, 165, 0);
pub const SNAP_COLOR: Rgba = Rgba::rgb(0x10, 0xb9, 0x81);

/// Stroke colour of a fitting's colour class.
pub fn stroke_color(color: PipeColor) -> Rgba {
    match color {
        PipeColor::Existing => EXISTING_COLOR,
        PipeColor::New => NEW_WORK_COLOR,
    }
}

/// Outline style, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Rgba,
    /// Dash and gap lengths
    pub dash: Option<[f64; 2]>,
}

impl Stroke {
    pub fn solid(width: f64, color: Rgba) -> Self {
        Self {
            width,
            color,
            dash: None,
        }
    }

    pub fn dashed(width: f64, color: Rgba, dash: [f64; 2]) -> Self {
        Self {
            width,
            color,
            dash: Some(dash),
        }
    }

    fn scaled(self, zoom: f64) -> Self {
        Self {
            width: self.width * zoom,
            dash: self.dash.map(|[on, off]| [on * zoom, off * zoom]),
            ..self
        }
    }
}

/// Which point of the text box sits on the given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Center,
    LeftBaseline,
    LeftBottom,
}

/// One drawing operation in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole canvas
    Fill(Rgba),
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Circle {
        center: Point,
        radius: f64,
        stroke: Option<Stroke>,
        fill: Option<Rgba>,
    },
    /// Closed outline
    Polygon {
        points: Vec<Point>,
        stroke: Stroke,
    },
    Text {
        pos: Point,
        text: String,
        size: f64,
        color: Rgba,
        /// Rotation in radians around `pos`
        angle: f64,
        anchor: TextAnchor,
    },
}

/// Uncommitted fitting following the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub tool: Tool,
    pub start: Point,
    /// Straight-through end of a tee whose branch is being aimed
    pub through: Option<Point>,
    pub end: Point,
    /// Elbow inlet direction
    pub base_angle: f64,
    /// Elbow outlet direction
    pub branch_angle: f64,
    pub color: PipeColor,
    pub flipped: bool,
}

/// Everything one frame depends on.
#[derive(Debug, Clone)]
pub struct Scene<'a> {
    pub document: &'a Document,
    pub viewport: Viewport,
    pub selected: Option<&'a str>,
    pub ghost: Option<Ghost>,
    pub snap_indicator: Option<Point>,
    pub socket_scale: f64,
    pub elbow_scale: f64,
}

impl<'a> Scene<'a> {
    /// A bare scene over `document`: no selection, no ghost, unit glyph scales.
    pub fn new(document: &'a Document, viewport: Viewport) -> Self {
        Self {
            document,
            viewport,
            selected: None,
            ghost: None,
            snap_indicator: None,
            socket_scale: 1.0,
            elbow_scale: 1.0,
        }
    }
}

/// Render-time switches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderOptions {
    /// Suppress grid, node markers, selection, ghost and snap indicator
    pub export: bool,
    /// Phase of the snap-indicator pulse in `[0, 1)`
    pub pulse: f64,
}

impl RenderOptions {
    pub fn export() -> Self {
        Self {
            export: true,
            pulse: 0.0,
        }
    }
}

enum Glyph {
    Pipe(Point, Point),
    Socket(Point, Point),
    Cheese(Point, Point, Option<Point>),
    Union(Point, Point),
    Meter(Point, Point),
    Valve(Point, Point),
    Custom(Point, Point),
    Elbow { node: Point, base: f64, branch: f64 },
}

impl Glyph {
    fn for_shape(document: &Document, shape: &Shape) -> Option<Glyph> {
        let pos = |id| document.node_position(id);
        Some(match shape.kind {
            ShapeKind::Pipe { a, b } => Glyph::Pipe(pos(a)?, pos(b)?),
            ShapeKind::Socket { a, b } => Glyph::Socket(pos(a)?, pos(b)?),
            ShapeKind::McUnion { a, b } => Glyph::Union(pos(a)?, pos(b)?),
            ShapeKind::Meter { a, b } => Glyph::Meter(pos(a)?, pos(b)?),
            ShapeKind::HojoValve { a, b } => Glyph::Valve(pos(a)?, pos(b)?),
            ShapeKind::FixedCustom { a, b } => Glyph::Custom(pos(a)?, pos(b)?),
            ShapeKind::Cheese { a, b, c } => {
                let branch = match c {
                    Some(c) => Some(pos(c)?),
                    None => None,
                };
                Glyph::Cheese(pos(a)?, pos(b)?, branch)
            }
            ShapeKind::Elbow {
                a,
                base_angle,
                branch_angle,
                ..
            } => {
                let base = base_angle.unwrap_or(0.0);
                Glyph::Elbow {
                    node: pos(a)?,
                    base,
                    branch: branch_angle.unwrap_or(base + FRAC_PI_2),
                }
            }
            ShapeKind::Text { .. } | ShapeKind::Label { .. } => return None,
        })
    }

    fn for_ghost(ghost: &Ghost) -> Option<Glyph> {
        let (a, b) = (ghost.start, ghost.end);
        Some(match ghost.tool {
            Tool::Pipe => Glyph::Pipe(a, b),
            Tool::Socket => Glyph::Socket(a, b),
            Tool::McUnion => Glyph::Union(a, b),
            Tool::Meter => Glyph::Meter(a, b),
            Tool::HojoValve => Glyph::Valve(a, b),
            Tool::FixedCustom => Glyph::Custom(a, b),
            Tool::Cheese => match ghost.through {
                Some(through) => Glyph::Cheese(a, through, Some(b)),
                None => Glyph::Cheese(a, b, None),
            },
            Tool::Elbow => Glyph::Elbow {
                node: a,
                base: ghost.base_angle,
                branch: ghost.branch_angle,
            },
            Tool::Select | Tool::Text => return None,
        })
    }

    fn line_width(&self) -> f64 {
        match self {
            Glyph::Pipe(..) => 3.0,
            _ => 2.0,
        }
    }

    fn primitives(&self, flipped: bool, socket_scale: f64, elbow_scale: f64) -> Vec<Primitive> {
        match *self {
            Glyph::Pipe(a, b) => pipe_glyph(a, b),
            Glyph::Socket(a, b) => socket_glyph(a, b, flipped, socket_scale),
            Glyph::Cheese(a, b, c) => cheese_glyph(a, b, c, flipped, socket_scale, elbow_scale),
            Glyph::Union(a, b) => union_glyph(a, b, flipped),
            Glyph::Meter(a, b) => meter_glyph(a, b, flipped),
            Glyph::Valve(a, b) => valve_glyph(a, b, flipped),
            Glyph::Custom(a, b) => custom_fitting_glyph(a, b, flipped),
            Glyph::Elbow { node, base, branch } => elbow_glyph(node, base, branch, elbow_scale),
        }
    }
}

/// Font size of a label: its `propFontSize`, or the default.
pub fn label_font_size(shape: &Shape) -> f64 {
    shape
        .prop_f64("propFontSize")
        .or_else(|| shape.prop_str("propFontSize")?.trim().parse().ok())
        .filter(|size| *size > 0.0)
        .unwrap_or(LABEL_FONT_SIZE)
}

/// Collects commands, converting world geometry to canvas pixels.
struct DisplayList {
    viewport: Viewport,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    fn screen(&self, p: Point) -> Point {
        self.viewport.world_to_screen(p)
    }

    /// `stroke` is given in world units.
    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.commands.push(DrawCommand::Line {
            from: self.screen(from),
            to: self.screen(to),
            stroke: stroke.scaled(self.zoom()),
        });
    }

    fn circle(&mut self, center: Point, radius: f64, stroke: Option<Stroke>, fill: Option<Rgba>) {
        let zoom = self.zoom();
        self.commands.push(DrawCommand::Circle {
            center: self.screen(center),
            radius: radius * zoom,
            stroke: stroke.map(|s| s.scaled(zoom)),
            fill,
        });
    }

    fn polygon(&mut self, points: &[Point], stroke: Stroke) {
        let points = points.iter().map(|p| self.screen(*p)).collect();
        self.commands.push(DrawCommand::Polygon {
            points,
            stroke: stroke.scaled(self.zoom()),
        });
    }

    fn text(&mut self, pos: Point, text: &str, size: f64, color: Rgba, angle: f64, anchor: TextAnchor) {
        self.commands.push(DrawCommand::Text {
            pos: self.screen(pos),
            text: text.to_string(),
            size: size * self.zoom(),
            color,
            angle,
            anchor,
        });
    }

    fn primitives(&mut self, primitives: &[Primitive], stroke: Stroke, text_color: Rgba) {
        for primitive in primitives {
            match primitive {
                Primitive::Line(a, b) => self.line(*a, *b, stroke),
                Primitive::Circle { center, radius } => {
                    self.circle(*center, *radius, Some(stroke), None)
                }
                Primitive::Polygon(points) => self.polygon(points, stroke),
                Primitive::Text {
                    center,
                    text,
                    size,
                    angle,
                } => self.text(*center, text, *size, text_color, *angle, TextAnchor::Center),
            }
        }
    }

    fn grid(&mut self, width: f64, height: f64) {
        let top_left = self.viewport.screen_to_world(Point::ZERO);
        let bottom_right = self.viewport.screen_to_world(Point::new(width, height));
        let stroke = Stroke::dashed(0.5, GRID_COLOR, [2.0, 4.0]);

        let mut x = (top_left.x / GRID_SIZE).floor() * GRID_SIZE;
        while x < bottom_right.x {
            self.line(Point::new(x, top_left.y), Point::new(x, bottom_right.y), stroke);
            x += GRID_SIZE;
        }
        let mut y = (top_left.y / GRID_SIZE).floor() * GRID_SIZE;
        while y < bottom_right.y {
            self.line(Point::new(top_left.x, y), Point::new(bottom_right.x, y), stroke);
            y += GRID_SIZE;
        }
    }

    fn halo(&mut self, document: &Document, shape: &Shape) {
        let stroke = Stroke::solid(12.0 / self.zoom(), HALO_COLOR);
        match &shape.kind {
            ShapeKind::Label { x, y, text, .. } => {
                let width = match text_width(text, label_font_size(shape)) {
                    w if w > 0.0 => w,
                    _ => 50.0,
                };
                let (left, top) = (x - 5.0, y - 15.0);
                let (right, bottom) = (left + width + 10.0, top + 20.0);
                self.polygon(
                    &[
                        Point::new(left, top),
                        Point::new(right, top),
                        Point::new(right, bottom),
                        Point::new(left, bottom),
                    ],
                    stroke,
                );
            }
            ShapeKind::Text { x, y, .. } => self.circle(Point::new(*x, *y), 20.0, Some(stroke), None),
            ShapeKind::Elbow { a, .. } => {
                if let Some(node) = document.node_position(*a) {
                    self.circle(node, 25.0, Some(stroke), None);
                }
            }
            kind => {
                let Some((a, b)) = kind.connector_pair() else {
                    return;
                };
                let (Some(pa), Some(pb)) = (document.node_position(a), document.node_position(b))
                else {
                    return;
                };
                if matches!(kind, ShapeKind::Pipe { .. }) {
                    self.line(pa, pb, stroke);
                } else {
                    self.circle(pa.midpoint(pb), 20.0, Some(stroke), None);
                }
            }
        }
    }

    fn label(&mut self, document: &Document, shape: &Shape, highlighted: bool) {
        let ShapeKind::Label {
            x,
            y,
            text,
            target_shape_id,
            target_type,
            target_x,
            target_y,
        } = &shape.kind
        else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let origin = Point::new(*x, *y);
        let size = label_font_size(shape);
        let width = text_width(text, size);
        let (color, line_width) = if highlighted {
            (SELECTED_LABEL_COLOR, 2.0)
        } else {
            (TEXT_COLOR, 1.0)
        };
        let stroke = Stroke::solid(line_width, color);

        self.text(origin, text, size, color, 0.0, TextAnchor::LeftBottom);

        let target_type = target_type.as_deref();
        if target_type == Some("pipe") {
            return;
        }
        self.line(
            Point::new(origin.x, origin.y + 2.0),
            Point::new(origin.x + width, origin.y + 2.0),
            stroke,
        );

        let Some(target_type) = target_type else {
            return;
        };
        let live = target_shape_id
            .as_deref()
            .and_then(|id| document.find_shape(id))
            .and_then(|target| document.shape_anchor(target));
        let stored = target_x.zip(*target_y).map(|(tx, ty)| Point::new(tx, ty));
        let Some(target) = live.or(stored) else {
            return;
        };
        if let Some((start, end)) = label_leader(origin, width, target, shape_radius(target_type)) {
            self.line(start, end, stroke);
            self.circle(end, 1.5, None, Some(color));
        }
    }

    fn shape(&mut self, scene: &Scene<'_>, shape: &Shape, highlighted: bool) {
        match &shape.kind {
            ShapeKind::Label { .. } => self.label(scene.document, shape, highlighted),
            ShapeKind::Text { x, y, text } => self.text(
                Point::new(*x, *y),
                text,
                TEXT_FONT_SIZE,
                TEXT_COLOR,
                0.0,
                TextAnchor::LeftBaseline,
            ),
            _ => match Glyph::for_shape(scene.document, shape) {
                Some(glyph) => {
                    let stroke = Stroke::solid(glyph.line_width(), stroke_color(shape.color));
                    let prims = glyph.primitives(shape.flipped, scene.socket_scale, scene.elbow_scale);
                    self.primitives(&prims, stroke, METER_TEXT_COLOR);
                }
                None => log::trace!("skipping shape {} with unresolved nodes", shape.id),
            },
        }
    }

    fn ghost(&mut self, scene: &Scene<'_>, ghost: &Ghost) {
        let Some(glyph) = Glyph::for_ghost(ghost) else {
            return;
        };
        let stroke = Stroke::solid(
            glyph.line_width(),
            stroke_color(ghost.color).with_opacity(PREVIEW_ALPHA),
        );
        let prims = glyph.primitives(ghost.flipped, scene.socket_scale, scene.elbow_scale);
        self.primitives(&prims, stroke, METER_TEXT_COLOR.with_opacity(PREVIEW_ALPHA));

        let zoom = self.zoom();
        match (ghost.tool, ghost.through) {
            (Tool::Cheese, Some(through)) => {
                let guide = Stroke::dashed(1.0 / zoom, GUIDE_COLOR, [2.0 / zoom, 2.0 / zoom]);
                self.line(ghost.start.midpoint(through), ghost.end, guide);
            }
            _ => {
                let guide = Stroke::dashed(2.0 / zoom, GUIDE_COLOR, [2.0 / zoom, 2.0 / zoom]);
                self.circle(ghost.end, 6.0 / zoom, Some(guide), None);
                self.circle(ghost.start, 2.0 / zoom, Some(guide), None);
            }
        }
    }
}

/// Renders one frame of `scene` onto a canvas of `canvas_size` pixels.
///
/// Z-order, back to front: background, grid, shapes in document order (each selection
/// halo right before its shape), node markers, placement ghost, snap indicator.
pub fn render(scene: &Scene<'_>, canvas_size: (f64, f64), options: RenderOptions) -> Vec<DrawCommand> {
    let mut list = DisplayList {
        viewport: scene.viewport,
        commands: vec![DrawCommand::Fill(BACKGROUND_COLOR)],
    };
    let zoom = list.zoom();
    let editing = !options.export;

    if editing {
        list.grid(canvas_size.0, canvas_size.1);
    }

    for shape in scene.document.shapes() {
        let selected = editing && scene.selected == Some(shape.id.as_str());
        if selected {
            list.halo(scene.document, shape);
        }
        list.shape(scene, shape, selected);
    }

    if !editing {
        return list.commands;
    }

    let marker = NODE_MARKER_RADIUS as f64 / zoom;
    for node in scene.document.nodes() {
        list.circle(node.position(), marker, None, Some(NODE_MARKER_COLOR));
    }

    if let Some(ghost) = &scene.ghost {
        list.ghost(scene, ghost);
    }

    if let Some(center) = scene.snap_indicator {
        let pulse = options.pulse.rem_euclid(1.0);
        let ring = Stroke::solid(2.0 / zoom, SNAP_COLOR.with_opacity(1.0 - 0.5 * pulse as f32));
        list.circle(center, (8.0 + 4.0 * pulse) / zoom, Some(ring), None);
    }

    list.commands
}

/// Viewport and canvas size that frame the whole document with `margin` world units
/// on every side, at `scale` pixels per world unit.
pub fn frame_document(document: &Document, margin: f64, scale: f64) -> (Viewport, (f64, f64)) {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let (min, max) = document
        .bounds()
        .unwrap_or((Point::ZERO, Point::new(400.0, 300.0)));
    let width = ((max.x - min.x + 2.0 * margin) * scale).ceil().max(1.0);
    let height = ((max.y - min.y + 2.0 * margin) * scale).ceil().max(1.0);
    let viewport = Viewport {
        pan_x: (margin - min.x) * scale,
        pan_y: (margin - min.y) * scale,
        zoom: scale,
    };
    (viewport, (width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, String) {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        let b = doc.create_node(100.0, 0.0);
        let c = doc.create_node(180.0, 0.0);
        doc.add_shape(Shape::new(ShapeKind::Pipe { a: a.id, b: b.id }, PipeColor::Existing, false));
        let socket = Shape::new(ShapeKind::Socket { a: b.id, b: c.id }, PipeColor::New, false);
        let id = socket.id.clone();
        doc.add_shape(socket);
        doc.add_shape(Shape::new(
            ShapeKind::Label {
                x: 150.0,
                y: -60.0,
                text: "HI Socket φ13".into(),
                target_shape_id: Some(id.clone()),
                target_type: Some("socket".into()),
                target_x: Some(140.0),
                target_y: Some(0.0),
            },
            PipeColor::Existing,
            false,
        ));
        (doc, id)
    }

    fn has_color(commands: &[DrawCommand], color: Rgba) -> bool {
        commands.iter().any(|c| match c {
            DrawCommand::Line { stroke, .. } | DrawCommand::Polygon { stroke, .. } => {
                stroke.color == color
            }
            DrawCommand::Circle { stroke, fill, .. } => {
                stroke.is_some_and(|s| s.color == color) || *fill == Some(color)
            }
            DrawCommand::Text { color: c, .. } => *c == color,
            DrawCommand::Fill(c) => *c == color,
        })
    }

    #[test]
    fn test_render_is_deterministic() {
        let (doc, id) = sample();
        let mut scene = Scene::new(&doc, Viewport::new(10.0, 20.0, 1.3));
        scene.selected = Some(&id);
        let first = render(&scene, (800.0, 600.0), RenderOptions::default());
        let second = render(&scene, (800.0, 600.0), RenderOptions::default());
        assert_eq!(first, second);
        assert_eq!(first[0], DrawCommand::Fill(BACKGROUND_COLOR));
    }

    #[test]
    fn test_export_mode_suppresses_editing_affordances() {
        let (doc, id) = sample();
        let mut scene = Scene::new(&doc, Viewport::new(0.0, 0.0, 1.0));
        scene.selected = Some(&id);
        scene.snap_indicator = Some(Point::ZERO);

        let editing = render(&scene, (400.0, 300.0), RenderOptions::default());
        assert!(has_color(&editing, GRID_COLOR));
        assert!(has_color(&editing, NODE_MARKER_COLOR));
        assert!(has_color(&editing, HALO_COLOR));

        let exported = render(&scene, (400.0, 300.0), RenderOptions::export());
        assert!(!has_color(&exported, GRID_COLOR));
        assert!(!has_color(&exported, NODE_MARKER_COLOR));
        assert!(!has_color(&exported, HALO_COLOR));
        assert!(!has_color(&exported, SNAP_COLOR));
        assert!(has_color(&exported, NEW_WORK_COLOR));
    }

    #[test]
    fn test_halo_is_drawn_right_before_selected_shape() {
        let (doc, id) = sample();
        let mut scene = Scene::new(&doc, Viewport::new(0.0, 0.0, 1.0));
        scene.selected = Some(&id);
        let commands = render(&scene, (10.0, 10.0), RenderOptions::export());
        assert!(!has_color(&commands, HALO_COLOR));

        let commands = render(&scene, (10.0, 10.0), RenderOptions::default());
        let halo = commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Circle { stroke: Some(s), .. } if s.color == HALO_COLOR));
        let Some(halo) = halo else {
            panic!("selected socket should have a halo");
        };
        assert!(matches!(&commands[halo + 1], DrawCommand::Line { stroke, .. } if stroke.color == NEW_WORK_COLOR));
    }

    #[test]
    fn test_shapes_with_missing_nodes_are_skipped() {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        let baseline = render(
            &Scene::new(&doc, Viewport::default()),
            (100.0, 100.0),
            RenderOptions::export(),
        );
        doc.add_shape(Shape::new(ShapeKind::Socket { a: a.id, b: 42 }, PipeColor::New, false));
        let commands = render(
            &Scene::new(&doc, Viewport::default()),
            (100.0, 100.0),
            RenderOptions::export(),
        );
        assert_eq!(commands, baseline);
    }

    #[test]
    fn test_ghost_is_translucent() {
        let doc = Document::new();
        let mut scene = Scene::new(&doc, Viewport::new(0.0, 0.0, 1.0));
        scene.ghost = Some(Ghost {
            tool: Tool::Socket,
            start: Point::ZERO,
            through: None,
            end: Point::new(80.0, 0.0),
            base_angle: 0.0,
            branch_angle: 0.0,
            color: PipeColor::Existing,
            flipped: false,
        });
        let commands = render(&scene, (100.0, 100.0), RenderOptions::default());
        assert!(has_color(&commands, EXISTING_COLOR.with_opacity(PREVIEW_ALPHA)));
        assert!(!has_color(&commands, EXISTING_COLOR));
        assert!(has_color(&commands, GUIDE_COLOR));

        let exported = render(&scene, (100.0, 100.0), RenderOptions::export());
        assert_eq!(exported, vec![DrawCommand::Fill(BACKGROUND_COLOR)]);
    }

    #[test]
    fn test_label_leader_follows_live_target() {
        let (mut doc, _) = sample();
        let scene_commands = |doc: &Document| {
            render(&Scene::new(doc, Viewport::new(0.0, 0.0, 1.0)), (1.0, 1.0), RenderOptions::export())
        };
        let dot = |commands: &[DrawCommand]| {
            commands.iter().find_map(|c| match c {
                DrawCommand::Circle { center, fill: Some(_), .. } => Some(*center),
                _ => None,
            })
        };
        let before = dot(&scene_commands(&doc));
        if let Some(node) = doc.node_mut(3) {
            node.y = 100.0;
        }
        let after = dot(&scene_commands(&doc));
        assert!(before.is_some() && after.is_some());
        assert_ne!(before, after);
    }

    #[test]
    fn test_frame_document_covers_bounds() {
        let (doc, _) = sample();
        let (viewport, (width, height)) = frame_document(&doc, 20.0, 2.0);
        let top_left = viewport.world_to_screen(Point::new(0.0, -60.0));
        assert_eq!(top_left, Point::new(40.0, 40.0));
        assert_eq!(width, (180.0 + 40.0) * 2.0);
        assert_eq!(height, (60.0 + 40.0) * 2.0);
    }
}
