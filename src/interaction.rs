//! Interaction/tool state machine and the editor session that owns the document.
//!
//! [`Editor`] is the only writer of the [`Document`]. It receives pointer, wheel and key
//! events in canvas pixel coordinates, converts them through the [`Viewport`], and moves
//! through the mutually exclusive [`Interaction`] states. Every structural edit records an
//! undo snapshot before it mutates the document. The renderer and the property panel only
//! read the session through [`Editor::scene`] and [`Editor::selected_shape`].

use crate::constants::{
    CHEESE_BRANCH_LENGTH, CONNECTOR_HIT_RADIUS, ELBOW_HIT_RADIUS, LABEL_HIT_BOX,
    LABEL_PLACEMENT_OFFSET, METER_LENGTH, MIN_SEGMENT_LENGTH, NODE_GRAB_RADIUS,
    PLACEMENT_SNAP_RADIUS, SOCKET_LENGTH, TEXT_HIT_RADIUS, UNION_LENGTH, VALVE_LENGTH,
};
use crate::error::DocumentError;
use crate::geometry::{snapped_endpoint, Point};
use crate::history::History;
use crate::properties;
use crate::rendering::{Ghost, Scene};
use crate::types::{catalogue_name, Document, NodeId, PipeColor, Shape, ShapeId, ShapeKind};
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};

/// Active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    Select,
    #[default]
    Pipe,
    Socket,
    Elbow,
    Cheese,
    McUnion,
    Meter,
    HojoValve,
    FixedCustom,
    Text,
}

impl Tool {
    /// Every tool, in toolbar order.
    pub const ALL: [Tool; 10] = [
        Tool::Select,
        Tool::Pipe,
        Tool::Socket,
        Tool::Elbow,
        Tool::Cheese,
        Tool::McUnion,
        Tool::Meter,
        Tool::HojoValve,
        Tool::FixedCustom,
        Tool::Text,
    ];

    /// Toolbar caption.
    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Pipe => "Pipe",
            Tool::Socket => "Socket",
            Tool::Elbow => "Elbow",
            Tool::Cheese => "Tee",
            Tool::McUnion => "MC Union",
            Tool::Meter => "Meter",
            Tool::HojoValve => "Aux. Valve",
            Tool::FixedCustom => "Elastic Joint",
            Tool::Text => "Text",
        }
    }

    /// Fixed footprint of the fitting, or `None` when the pointer distance is used.
    pub fn fixed_length(self) -> Option<f64> {
        match self {
            Tool::Socket | Tool::Cheese => Some(SOCKET_LENGTH),
            Tool::McUnion | Tool::FixedCustom => Some(UNION_LENGTH),
            Tool::HojoValve => Some(VALVE_LENGTH),
            Tool::Meter => Some(METER_LENGTH),
            Tool::Select | Tool::Pipe | Tool::Elbow | Tool::Text => None,
        }
    }

    /// Whether the tool places a node-connected fitting.
    pub fn places_connector(self) -> bool {
        !matches!(self, Tool::Select | Tool::Text)
    }
}

/// Top-level editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Tools place and select fittings
    #[default]
    Drawing,
    /// Clicks annotate fittings with labels
    Label,
}

/// Pointer buttons the editor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Delete,
    Backspace,
    Escape,
    Z,
    Y,
}

/// Modifier state accompanying a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Ctrl, or Cmd on macOS
    pub command: bool,
    pub shift: bool,
}

/// Live end of a pending placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    /// Where the end would land
    pub end: Point,
    /// Quantized direction from the placement origin
    pub angle: f64,
    /// Existing node the end locks onto, if any
    pub snapped: Option<NodeId>,
}

/// A fitting placement waiting for its next click.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub tool: Tool,
    pub start: NodeId,
    /// Straight-through node of a tee once its second click has landed
    pub through: Option<NodeId>,
    pub preview: Option<Preview>,
}

/// The single interaction in progress. Variants are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Placing(Placement),
    DraggingNode {
        id: NodeId,
        before: Document,
        moved: bool,
    },
    DraggingLabel {
        shape_id: ShapeId,
        /// Label position when the drag started
        origin: Point,
        /// Pointer position when the drag started
        grab: Point,
        before: Document,
        moved: bool,
    },
    Panning {
        last: Point,
        /// Placement to resume once panning ends
        suspended: Option<Placement>,
    },
}

impl Interaction {
    /// The pending placement, including one suspended by panning.
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Interaction::Placing(placement) => Some(placement),
            Interaction::Panning { suspended, .. } => suspended.as_ref(),
            _ => None,
        }
    }
}

/// Result of resolving a clicked position against the existing nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint {
    Existing(NodeId),
    New(Point),
}

/// Decides whether a placement click reuses a node or creates one.
///
/// The pointer itself is checked first so a run can end on a node that is off the 45°
/// grid; then the quantized `candidate`. Nodes listed in `exclude` never match.
pub fn resolve_endpoint(
    document: &Document,
    pointer: Point,
    candidate: Option<Point>,
    radius: f64,
    exclude: &[NodeId],
) -> Endpoint {
    let near = |p: Point| document.find_node_near(p, radius, exclude).map(|n| n.id);
    match near(pointer).or_else(|| candidate.and_then(|c| near(c))) {
        Some(id) => Endpoint::Existing(id),
        None => Endpoint::New(candidate.unwrap_or(pointer)),
    }
}

/// Computes the live end of `placement` for a pointer at `pointer` (world units).
///
/// Returns `None` when the placement's nodes no longer exist.
pub fn compute_preview(
    document: &Document,
    snap_radius: f64,
    placement: &Placement,
    pointer: Point,
) -> Option<Preview> {
    let start = document.node_position(placement.start)?;
    let (origin, length, exclude) = match placement.through {
        Some(through) => (
            start.midpoint(document.node_position(through)?),
            Some(CHEESE_BRANCH_LENGTH),
            vec![placement.start, through],
        ),
        None => (start, placement.tool.fixed_length(), vec![placement.start]),
    };
    let (mut end, angle) = snapped_endpoint(origin, pointer, length);
    let snapped = match resolve_endpoint(document, pointer, Some(end), snap_radius, &exclude) {
        Endpoint::Existing(id) => {
            end = document.node_position(id)?;
            Some(id)
        }
        Endpoint::New(_) => None,
    };
    Some(Preview {
        end,
        angle,
        snapped,
    })
}

/// What the select tool finds under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Node(NodeId),
    Label(ShapeId),
    Shape(ShapeId),
}

/// An editing session over one document.
#[derive(Debug)]
pub struct Editor {
    document: Document,
    history: History,
    /// Pan/zoom of the canvas
    pub viewport: Viewport,
    mode: Mode,
    tool: Tool,
    /// Colour class applied to newly placed fittings
    pub pipe_color: PipeColor,
    /// Flip state of the ghost, copied into placed fittings
    pub preview_flipped: bool,
    interaction: Interaction,
    selected: Option<ShapeId>,
    snap_indicator: Option<NodeId>,
    space_down: bool,
    /// Scale of socket glyphs (also the tee body)
    pub socket_scale: f64,
    /// Scale of elbow glyphs (also the tee branch)
    pub elbow_scale: f64,
    status: String,
}

impl Default for Editor {
    fn default() -> Self {
        Self::with_document(Document::new())
    }
}

impl Editor {
    /// Creates a session over an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session over `document` with an empty history.
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            history: History::new(),
            viewport: Viewport::default(),
            mode: Mode::default(),
            tool: Tool::default(),
            pipe_color: PipeColor::default(),
            preview_flipped: false,
            interaction: Interaction::Idle,
            selected: None,
            snap_indicator: None,
            space_down: false,
            socket_scale: 1.0,
            elbow_scale: 1.0,
            status: "Ready".to_string(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Short description of the last transition, for the status bar.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected shape, if the selection still resolves.
    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected
            .as_deref()
            .and_then(|id| self.document.find_shape(id))
    }

    /// Node currently eligible for an implicit connection.
    pub fn snap_indicator(&self) -> Option<NodeId> {
        self.snap_indicator
    }

    /// Switches the active tool. Any pending placement is abandoned.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        self.abandon_placement();
        self.tool = tool;
        self.status = format!("Tool: {}", tool.label());
        log::debug!("tool changed to {:?}", tool);
    }

    /// Switches between drawing and labelling. Any pending placement is abandoned.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.abandon_placement();
        self.mode = mode;
        self.status = match mode {
            Mode::Drawing => "Drawing mode".to_string(),
            Mode::Label => "Label mode: click a fitting to annotate it".to_string(),
        };
        log::debug!("mode changed to {:?}", mode);
    }

    fn abandon_placement(&mut self) {
        match self.interaction {
            Interaction::Placing(_) => self.interaction = Interaction::Idle,
            Interaction::Panning {
                ref mut suspended, ..
            } => *suspended = None,
            _ => {}
        }
        self.snap_indicator = None;
    }

    fn world(&self, screen: Point) -> Point {
        self.viewport.screen_to_world(screen)
    }

    fn snap_radius(&self) -> f64 {
        self.viewport.world_radius(PLACEMENT_SNAP_RADIUS)
    }

    fn materialize(&mut self, endpoint: Endpoint) -> NodeId {
        match endpoint {
            Endpoint::Existing(id) => id,
            Endpoint::New(p) => self.document.create_node(p.x, p.y).id,
        }
    }

    /// Handles a button press at a canvas pixel position.
    ///
    /// Presses that arrive while a drag or pan is in progress are ignored.
    pub fn pointer_down(&mut self, screen: Point, button: PointerButton) {
        if self.is_busy() {
            return;
        }
        if button == PointerButton::Middle || (button == PointerButton::Primary && self.space_down)
        {
            self.start_panning(screen);
            return;
        }
        if button != PointerButton::Primary {
            return;
        }

        let pos = self.world(screen);
        match (self.mode, self.tool) {
            (Mode::Label, _) => self.label_press(pos),
            (Mode::Drawing, Tool::Select) => self.select_press(pos),
            (Mode::Drawing, Tool::Text) => self.place_text(pos),
            (Mode::Drawing, _) => self.placement_press(pos),
        }
    }

    fn start_panning(&mut self, screen: Point) {
        let suspended = match std::mem::take(&mut self.interaction) {
            Interaction::Placing(placement) => Some(placement),
            _ => None,
        };
        self.interaction = Interaction::Panning {
            last: screen,
            suspended,
        };
    }

    fn finish_panning(&mut self) {
        self.interaction = match std::mem::take(&mut self.interaction) {
            Interaction::Panning { suspended, .. } => {
                suspended.map_or(Interaction::Idle, Interaction::Placing)
            }
            other => other,
        };
    }

    /// Handles pointer motion at a canvas pixel position.
    pub fn pointer_move(&mut self, screen: Point) {
        let pos = self.world(screen);
        let snap_radius = self.snap_radius();
        let mut abandon = false;

        match &mut self.interaction {
            Interaction::Panning { last, .. } => {
                let delta = screen - *last;
                *last = screen;
                self.viewport.pan_by(delta.x, delta.y);
            }
            Interaction::DraggingNode { id, moved, .. } => match self.document.node_mut(*id) {
                Some(node) => {
                    node.x = pos.x;
                    node.y = pos.y;
                    *moved = true;
                }
                None => abandon = true,
            },
            Interaction::DraggingLabel {
                shape_id,
                origin,
                grab,
                moved,
                ..
            } => {
                let target = *origin + (pos - *grab);
                match self.document.shape_mut(shape_id).map(|s| &mut s.kind) {
                    Some(ShapeKind::Label { x, y, .. }) => {
                        *x = target.x;
                        *y = target.y;
                        *moved = true;
                    }
                    _ => abandon = true,
                }
            }
            Interaction::Placing(placement) => {
                placement.preview = compute_preview(&self.document, snap_radius, placement, pos);
                match placement.preview {
                    Some(preview) => self.snap_indicator = preview.snapped,
                    None => abandon = true,
                }
            }
            Interaction::Idle => {
                self.snap_indicator = if self.mode == Mode::Drawing && self.tool.places_connector()
                {
                    self.document
                        .find_node_near(pos, snap_radius, &[])
                        .map(|n| n.id)
                } else {
                    None
                };
            }
        }

        if abandon {
            log::warn!("interaction target disappeared; returning to idle");
            self.interaction = Interaction::Idle;
            self.snap_indicator = None;
        }
    }

    /// Ends a drag or pan. A drag that moved something becomes one undo step.
    pub fn pointer_up(&mut self) {
        if matches!(self.interaction, Interaction::Panning { .. }) {
            self.finish_panning();
            return;
        }
        match std::mem::take(&mut self.interaction) {
            Interaction::DraggingNode { before, moved, .. }
            | Interaction::DraggingLabel { before, moved, .. } => {
                if moved {
                    self.history.push_snapshot(before);
                    self.status = "Moved".to_string();
                }
            }
            other => self.interaction = other,
        }
    }

    /// Zooms one notch around a canvas pixel position.
    pub fn wheel(&mut self, screen: Point, zoom_in: bool) {
        self.viewport.zoom_at(screen, zoom_in);
    }

    /// Handles a key press.
    ///
    /// # Returns
    ///
    /// `true` if the key triggered an action
    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        match key {
            Key::Space => {
                self.space_down = true;
                true
            }
            Key::Delete | Key::Backspace => self.delete_selected(),
            Key::Escape => {
                if matches!(self.interaction, Interaction::Placing(_)) {
                    self.abandon_placement();
                    self.status = "Placement cancelled".to_string();
                    true
                } else {
                    false
                }
            }
            Key::Z if modifiers.command && modifiers.shift => self.redo(),
            Key::Z if modifiers.command => self.undo(),
            Key::Y if modifiers.command => self.redo(),
            _ => false,
        }
    }

    /// Handles a key release. Releasing Space ends a space-bar pan.
    pub fn key_up(&mut self, key: Key) {
        if key == Key::Space {
            self.space_down = false;
            self.finish_panning();
        }
    }

    /// Finds what the select tool would pick at a world position.
    ///
    /// Nodes win over labels, labels over other shapes; among shapes the one drawn last wins.
    pub fn hit_test(&self, pos: Point) -> Option<Hit> {
        let grab = self.viewport.world_radius(NODE_GRAB_RADIUS);
        if let Some(node) = self.document.find_node_near(pos, grab, &[]) {
            return Some(Hit::Node(node.id));
        }
        self.hit_label(pos)
            .map(Hit::Label)
            .or_else(|| self.hit_shape(pos).map(Hit::Shape))
    }

    fn hit_label(&self, pos: Point) -> Option<ShapeId> {
        let (left, top, right, bottom) = LABEL_HIT_BOX;
        self.document
            .shapes()
            .iter()
            .find(|s| match s.kind {
                ShapeKind::Label { x, y, .. } => {
                    pos.x >= x + left && pos.x <= x + right && pos.y >= y + top && pos.y <= y + bottom
                }
                _ => false,
            })
            .map(|s| s.id.clone())
    }

    fn hit_shape(&self, pos: Point) -> Option<ShapeId> {
        self.document
            .shapes()
            .iter()
            .rev()
            .find(|s| self.shape_contains(s, pos))
            .map(|s| s.id.clone())
    }

    fn shape_contains(&self, shape: &Shape, pos: Point) -> bool {
        let within = |center: Point, pixels: f64| {
            let r = self.viewport.world_radius(pixels);
            center.distance_sq(pos) < r * r
        };
        match &shape.kind {
            ShapeKind::Label { .. } => false,
            ShapeKind::Text { x, y, .. } => within(Point::new(*x, *y), TEXT_HIT_RADIUS),
            ShapeKind::Elbow { a, .. } => self
                .document
                .node_position(*a)
                .is_some_and(|p| within(p, ELBOW_HIT_RADIUS)),
            kind => kind
                .connector_pair()
                .and_then(|(a, b)| {
                    Some(
                        self.document
                            .node_position(a)?
                            .midpoint(self.document.node_position(b)?),
                    )
                })
                .is_some_and(|mid| within(mid, CONNECTOR_HIT_RADIUS)),
        }
    }

    fn select_press(&mut self, pos: Point) {
        match self.hit_test(pos) {
            Some(Hit::Node(id)) => {
                self.interaction = Interaction::DraggingNode {
                    id,
                    before: self.document.clone(),
                    moved: false,
                };
                self.status = "Moving node".to_string();
            }
            Some(Hit::Label(id)) => self.start_label_drag(id, pos),
            Some(Hit::Shape(id)) => {
                if let Some(shape) = self.document.find_shape(&id) {
                    self.status = format!("Selected: {}", catalogue_name(shape.type_name()));
                }
                self.selected = Some(id);
            }
            None => {
                self.selected = None;
                self.status = "Selection cleared".to_string();
            }
        }
    }

    fn start_label_drag(&mut self, id: ShapeId, pos: Point) {
        let origin = match self.document.find_shape(&id).map(|s| &s.kind) {
            Some(ShapeKind::Label { x, y, .. }) => Point::new(*x, *y),
            _ => return,
        };
        self.selected = Some(id.clone());
        self.interaction = Interaction::DraggingLabel {
            shape_id: id,
            origin,
            grab: pos,
            before: self.document.clone(),
            moved: false,
        };
        self.status = "Moving label".to_string();
    }

    fn label_press(&mut self, pos: Point) {
        if let Some(id) = self.hit_label(pos) {
            self.start_label_drag(id, pos);
            return;
        }
        match self.hit_shape(pos) {
            Some(target) => self.create_label(&target, pos),
            None => {
                self.selected = None;
                self.status = "Selection cleared".to_string();
            }
        }
    }

    fn create_label(&mut self, target_id: &str, pos: Point) {
        let Some(target) = self.document.find_shape(target_id) else {
            return;
        };
        let type_name = target.type_name();
        let anchor = self.document.shape_anchor(target);
        let (dx, dy) = LABEL_PLACEMENT_OFFSET;
        let label = Shape::new(
            ShapeKind::Label {
                x: pos.x + dx,
                y: pos.y + dy,
                text: catalogue_name(type_name).to_string(),
                target_shape_id: Some(target_id.to_string()),
                target_type: Some(type_name.to_string()),
                target_x: anchor.map(|p| p.x),
                target_y: anchor.map(|p| p.y),
            },
            PipeColor::default(),
            false,
        );

        self.history.commit(&self.document);
        self.selected = Some(label.id.clone());
        log::debug!("label {} added for {}", label.id, target_id);
        self.document.add_shape(label);
        self.status = "Label added".to_string();
    }

    fn place_text(&mut self, pos: Point) {
        self.history.commit(&self.document);
        let shape = Shape::new(
            ShapeKind::Text {
                x: pos.x,
                y: pos.y,
                text: "Text".to_string(),
            },
            self.pipe_color,
            false,
        );
        self.selected = Some(shape.id.clone());
        self.document.add_shape(shape);
        self.revert_to_pipe();
        self.status = "Text placed (back to pipe)".to_string();
    }

    fn revert_to_pipe(&mut self) {
        self.tool = Tool::Pipe;
        self.snap_indicator = None;
    }

    fn placement_press(&mut self, pos: Point) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Placing(placement) => self.advance_placement(placement, pos),
            _ => {
                let endpoint = resolve_endpoint(&self.document, pos, None, self.snap_radius(), &[]);
                let start = self.materialize(endpoint);
                self.interaction = Interaction::Placing(Placement {
                    tool: self.tool,
                    start,
                    through: None,
                    preview: None,
                });
                self.status = "Start point set. Click the end point.".to_string();
            }
        }
    }

    fn advance_placement(&mut self, mut placement: Placement, pos: Point) {
        let Some(preview) = compute_preview(&self.document, self.snap_radius(), &placement, pos)
        else {
            log::warn!("placement start node {} no longer exists", placement.start);
            self.snap_indicator = None;
            return;
        };
        let origin = match placement.through {
            Some(through) => self
                .document
                .node_position(placement.start)
                .zip(self.document.node_position(through))
                .map(|(a, b)| a.midpoint(b)),
            None => self.document.node_position(placement.start),
        }
        .unwrap_or(preview.end);

        if preview.end.distance(origin) < MIN_SEGMENT_LENGTH {
            placement.preview = Some(preview);
            self.interaction = Interaction::Placing(placement);
            self.status = "Too short; click further away".to_string();
            return;
        }

        if placement.tool == Tool::Cheese && placement.through.is_none() {
            let through = self.materialize_preview(&preview);
            placement.through = Some(through);
            placement.preview = None;
            self.interaction = Interaction::Placing(placement);
            self.status = "Run set. Click the branch direction.".to_string();
            return;
        }

        let base = self
            .document
            .incoming_pipe_angle(placement.start)
            .unwrap_or(0.0);

        self.history.commit(&self.document);
        let end = self.materialize_preview(&preview);
        let (a, b) = (placement.start, end);
        let kind = match placement.tool {
            Tool::Pipe => ShapeKind::Pipe { a, b },
            Tool::Socket => ShapeKind::Socket { a, b },
            Tool::McUnion => ShapeKind::McUnion { a, b },
            Tool::Meter => ShapeKind::Meter { a, b },
            Tool::HojoValve => ShapeKind::HojoValve { a, b },
            Tool::FixedCustom => ShapeKind::FixedCustom { a, b },
            Tool::Elbow => ShapeKind::Elbow {
                a,
                b: Some(b),
                base_angle: Some(base),
                branch_angle: Some(preview.angle),
            },
            Tool::Cheese => ShapeKind::Cheese {
                a,
                b: placement.through.unwrap_or(b),
                c: Some(b),
            },
            Tool::Select | Tool::Text => return,
        };
        let shape = Shape::new(kind, self.pipe_color, self.preview_flipped).with_default_props();
        log::debug!("placed {} {}", shape.type_name(), shape.id);
        self.document.add_shape(shape);
        self.snap_indicator = None;

        if placement.tool == Tool::Pipe {
            self.status = "Placed".to_string();
        } else {
            self.revert_to_pipe();
            self.status = "Placed (back to pipe)".to_string();
        }
    }

    fn materialize_preview(&mut self, preview: &Preview) -> NodeId {
        match preview.snapped {
            Some(id) => id,
            None => self.materialize(Endpoint::New(preview.end)),
        }
    }

    /// True while a drag or pan owns the pointer.
    fn is_busy(&self) -> bool {
        !matches!(
            self.interaction,
            Interaction::Idle | Interaction::Placing(_)
        )
    }

    fn cancel_interaction(&mut self) {
        self.interaction = Interaction::Idle;
        self.snap_indicator = None;
    }

    fn drop_stale_selection(&mut self) {
        if self.selected_shape().is_none() {
            self.selected = None;
        }
    }

    /// Restores the previous snapshot. A no-op on an empty history.
    pub fn undo(&mut self) -> bool {
        self.cancel_interaction();
        if !self.history.undo(&mut self.document) {
            self.status = "Nothing to undo".to_string();
            return false;
        }
        self.drop_stale_selection();
        self.status = "Undone".to_string();
        log::debug!("undo");
        true
    }

    /// Re-applies the last undone snapshot. A no-op when nothing was undone.
    pub fn redo(&mut self) -> bool {
        self.cancel_interaction();
        if !self.history.redo(&mut self.document) {
            self.status = "Nothing to redo".to_string();
            return false;
        }
        self.drop_stale_selection();
        self.status = "Redone".to_string();
        log::debug!("redo");
        true
    }

    /// Removes the selected shape. Its nodes stay in the document.
    ///
    /// Ignored while a drag or pan is in progress.
    pub fn delete_selected(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        let Some(id) = self.selected.take() else {
            return false;
        };
        if self.document.find_shape(&id).is_none() {
            return false;
        }
        self.history.commit(&self.document);
        self.document.remove_shape(|s| s.id == id);
        self.status = "Deleted".to_string();
        log::debug!("deleted shape {id}");
        true
    }

    /// Empties the drawing as one undoable step. Ignored while a drag or pan is in progress.
    pub fn clear(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.cancel_interaction();
        self.history.commit(&self.document);
        self.document.clear();
        self.selected = None;
        self.status = "Cleared".to_string();
        true
    }

    /// Replaces the document and starts a fresh history.
    pub fn load(&mut self, document: Document) {
        self.document = document;
        self.history.clear();
        self.cancel_interaction();
        self.selected = None;
        self.status = "Loaded".to_string();
    }

    /// Loads a persisted document, falling back to an empty one if it cannot be parsed.
    ///
    /// # Returns
    ///
    /// `false` if the fallback was taken
    pub fn load_json(&mut self, json: &str) -> bool {
        match Document::from_json(json) {
            Ok(document) => {
                self.load(document);
                true
            }
            Err(e) => {
                log::warn!("stored drawing could not be read, starting empty: {e}");
                self.load(Document::new());
                self.status = "Stored drawing was unreadable; started a new one".to_string();
                false
            }
        }
    }

    /// Snapshot of the current document.
    pub fn save(&self) -> Document {
        self.document.clone()
    }

    /// Serializes the current document.
    pub fn save_json(&self) -> Result<String, DocumentError> {
        Ok(self.document.to_json()?)
    }

    /// Writes a free-form field on the selected shape. Not recorded in history.
    pub fn set_selected_property(&mut self, key: &str, value: &str) -> bool {
        match self.selected.as_deref() {
            Some(id) => properties::set_property(&mut self.document, id, key, value),
            None => false,
        }
    }

    /// Changes the colour class of the selected shape. Not recorded in history.
    pub fn set_selected_color(&mut self, color: PipeColor) -> bool {
        match self.selected.as_deref() {
            Some(id) => properties::set_color(&mut self.document, id, color),
            None => false,
        }
    }

    /// Toggles the flip flag of the selected shape. Not recorded in history.
    pub fn toggle_selected_flipped(&mut self) -> bool {
        match self.selected.as_deref() {
            Some(id) => properties::toggle_flipped(&mut self.document, id),
            None => false,
        }
    }

    fn ghost(&self) -> Option<Ghost> {
        let placement = self.interaction.placement()?;
        let preview = placement.preview.as_ref()?;
        let start = self.document.node_position(placement.start)?;
        let through = match placement.through {
            Some(id) => Some(self.document.node_position(id)?),
            None => None,
        };
        Some(Ghost {
            tool: placement.tool,
            start,
            through,
            end: preview.end,
            base_angle: self
                .document
                .incoming_pipe_angle(placement.start)
                .unwrap_or(0.0),
            branch_angle: preview.angle,
            color: self.pipe_color,
            flipped: self.preview_flipped,
        })
    }

    /// Everything the renderer needs for one frame.
    pub fn scene(&self) -> Scene<'_> {
        Scene {
            document: &self.document,
            viewport: self.viewport,
            selected: self.selected.as_deref(),
            ghost: self.ghost(),
            snap_indicator: self
                .snap_indicator
                .and_then(|id| self.document.node_position(id)),
            socket_scale: self.socket_scale,
            elbow_scale: self.elbow_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn editor() -> Editor {
        let mut editor = Editor::new();
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor
    }

    fn click(editor: &mut Editor, x: f64, y: f64) {
        let p = Point::new(x, y);
        editor.pointer_move(p);
        editor.pointer_down(p, PointerButton::Primary);
        editor.pointer_up();
    }

    fn node_pos(editor: &Editor, id: NodeId) -> Point {
        editor.document().node_position(id).unwrap_or(Point::new(f64::NAN, f64::NAN))
    }

    fn socket_document() -> (Document, NodeId) {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        let b = doc.create_node(80.0, 0.0);
        let m = doc.create_node(40.0, 0.0);
        doc.add_shape(Shape::new(
            ShapeKind::Socket { a: a.id, b: b.id },
            PipeColor::Existing,
            false,
        ));
        (doc, m.id)
    }

    #[test]
    fn test_socket_end_is_always_eighty_units_away() {
        for pointer in [(300.0, 10.0), (5.0, 20.0), (-90.0, -95.0)] {
            let mut editor = editor();
            editor.set_tool(Tool::Socket);
            click(&mut editor, 0.0, 0.0);
            click(&mut editor, pointer.0, pointer.1);

            let shape = &editor.document().shapes()[0];
            let Some((a, b)) = shape.kind.connector_pair() else {
                panic!("socket should reference two nodes");
            };
            assert!((node_pos(&editor, a).distance(node_pos(&editor, b)) - 80.0).abs() < 1e-9);
            assert_eq!(shape.prop_str("propType"), Some("HI"));
            assert_eq!(editor.tool(), Tool::Pipe, "fitting tools revert to pipe");
        }
    }

    #[test]
    fn test_placement_reuses_nearby_node() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        click(&mut editor, 103.0, 2.0);
        click(&mut editor, 100.0, 100.0);

        let shapes = editor.document().shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(editor.document().nodes().len(), 3);
        assert_eq!(
            shapes[0].kind.connector_pair().map(|p| p.1),
            shapes[1].kind.connector_pair().map(|p| p.0)
        );
        assert_eq!(editor.tool(), Tool::Pipe);
    }

    #[test]
    fn test_preview_locks_onto_existing_node() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        let target = editor.document().nodes()[1].id;

        click(&mut editor, 0.0, 200.0);
        editor.pointer_move(Point::new(96.0, 4.0));
        assert_eq!(editor.snap_indicator(), Some(target));
        let ghost = editor.scene().ghost.map(|g| g.end);
        assert_eq!(ghost, Some(Point::new(100.0, 0.0)));
    }

    #[test]
    fn test_degenerate_commit_keeps_placement_pending() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 0.3, 0.0);
        assert!(editor.document().shapes().is_empty());
        assert!(matches!(editor.interaction(), Interaction::Placing(_)));
    }

    #[test]
    fn test_elbow_inherits_direction_of_incoming_pipe() {
        let mut editor = editor();
        click(&mut editor, 100.0, -100.0);
        click(&mut editor, 100.0, 0.0);
        editor.set_tool(Tool::Elbow);
        click(&mut editor, 100.0, 0.0);
        editor.pointer_move(Point::new(200.0, 0.0));

        let base = editor.scene().ghost.map(|g| g.base_angle).unwrap_or(f64::NAN);
        assert!((base - FRAC_PI_2).abs() < 1e-9);

        click(&mut editor, 200.0, 0.0);
        match editor.document().shapes().last().map(|s| &s.kind) {
            Some(ShapeKind::Elbow {
                base_angle: Some(base),
                branch_angle: Some(branch),
                b: Some(_),
                ..
            }) => {
                assert!((base - FRAC_PI_2).abs() < 1e-9);
                assert!(branch.abs() < 1e-9);
            }
            other => panic!("expected an elbow, got {other:?}"),
        }
    }

    #[test]
    fn test_elbow_without_pipe_defaults_to_zero_base() {
        let mut editor = editor();
        editor.set_tool(Tool::Elbow);
        click(&mut editor, 0.0, 0.0);
        editor.pointer_move(Point::new(0.0, 50.0));
        let base = editor.scene().ghost.map(|g| g.base_angle);
        assert_eq!(base, Some(0.0));
    }

    #[test]
    fn test_cheese_takes_three_clicks() {
        let mut editor = editor();
        editor.set_tool(Tool::Cheese);
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 200.0, 3.0);
        assert!(editor.document().shapes().is_empty());
        click(&mut editor, 40.0, 100.0);

        match editor.document().shapes().first().map(|s| &s.kind) {
            Some(ShapeKind::Cheese { a, b, c: Some(c) }) => {
                assert_eq!(node_pos(&editor, *a), Point::new(0.0, 0.0));
                assert!(node_pos(&editor, *b).distance(Point::new(80.0, 0.0)) < 1e-9);
                assert!(node_pos(&editor, *c).distance(Point::new(40.0, 45.0)) < 1e-9);
            }
            other => panic!("expected a tee, got {other:?}"),
        }
        assert_eq!(editor.tool(), Tool::Pipe);
    }

    #[test]
    fn test_node_wins_over_overlapping_shape() {
        let (doc, middle) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        assert_eq!(editor.hit_test(Point::new(40.0, 0.0)), Some(Hit::Node(middle)));
        assert!(matches!(
            editor.hit_test(Point::new(40.0, 20.0)),
            Some(Hit::Shape(_))
        ));
        assert_eq!(editor.hit_test(Point::new(400.0, 400.0)), None);
    }

    #[test]
    fn test_label_wins_over_overlapping_shape() {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        let b = doc.create_node(100.0, 0.0);
        doc.add_shape(Shape::new(
            ShapeKind::Socket { a: a.id, b: b.id },
            PipeColor::Existing,
            false,
        ));
        let label = Shape::new(
            ShapeKind::Label {
                x: 30.0,
                y: 10.0,
                text: "HI Socket φ13".to_string(),
                target_shape_id: None,
                target_type: None,
                target_x: None,
                target_y: None,
            },
            PipeColor::Existing,
            false,
        );
        let label_id = label.id.clone();
        doc.add_shape(label);
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);

        // the socket midpoint lies inside the label box
        assert_eq!(editor.hit_test(Point::new(50.0, 0.0)), Some(Hit::Label(label_id)));
        // above the box only the socket answers
        assert!(matches!(
            editor.hit_test(Point::new(50.0, -15.0)),
            Some(Hit::Shape(_))
        ));
    }

    #[test]
    fn test_press_during_drag_is_ignored() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor.set_tool(Tool::Select);
        let first = editor.document().nodes()[0].id;

        editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Primary);
        editor.pointer_move(Point::new(0.0, 50.0));
        editor.pointer_down(Point::new(80.0, 0.0), PointerButton::Primary);
        editor.pointer_down(Point::new(0.0, 50.0), PointerButton::Middle);
        assert!(matches!(
            editor.interaction(),
            Interaction::DraggingNode { id, .. } if *id == first
        ));

        editor.pointer_up();
        assert_eq!(node_pos(&editor, first), Point::new(0.0, 50.0));
        assert_eq!(editor.history().undo_len(), 1);
    }

    #[test]
    fn test_delete_during_drag_is_ignored() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor.set_tool(Tool::Select);
        click(&mut editor, 40.0, 20.0);
        assert!(editor.selected_id().is_some());
        let first = editor.document().nodes()[0].id;

        editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Primary);
        editor.pointer_move(Point::new(0.0, 50.0));
        assert!(!editor.key_down(Key::Delete, Modifiers::default()));
        assert!(!editor.clear());
        editor.pointer_up();

        assert_eq!(editor.document().shapes().len(), 1);
        assert_eq!(editor.history().undo_len(), 1);

        assert!(editor.key_down(Key::Delete, Modifiers::default()));
        assert!(editor.document().shapes().is_empty());
        assert!(editor.undo());
        assert_eq!(editor.document().shapes().len(), 1);
        assert_eq!(node_pos(&editor, first), Point::new(0.0, 50.0));
        assert!(editor.undo());
        assert_eq!(node_pos(&editor, first), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_node_ids_are_not_reused_after_undo() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        let highest = editor.document().nodes().iter().map(|n| n.id).max().unwrap_or(0);
        assert!(editor.undo());

        click(&mut editor, 0.0, 300.0);
        click(&mut editor, 100.0, 300.0);
        let Some((a, b)) = editor.document().shapes()[0].kind.connector_pair() else {
            panic!("pipe should reference two nodes");
        };
        assert!(a > highest && b > highest);
        let mut ids: Vec<NodeId> = editor.document().nodes().iter().map(|n| n.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), editor.document().nodes().len());
    }

    #[test]
    fn test_undo_and_redo_placement() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        assert_eq!(editor.document().shapes().len(), 1);

        assert!(editor.undo());
        assert!(editor.document().shapes().is_empty());
        assert!(editor.redo());
        assert_eq!(editor.document().shapes().len(), 1);
        assert!(!editor.redo());
    }

    #[test]
    fn test_node_drag_is_a_single_undo_step() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor.set_tool(Tool::Select);

        editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Primary);
        editor.pointer_move(Point::new(10.0, 10.0));
        editor.pointer_move(Point::new(-20.0, 30.0));
        editor.pointer_up();

        let first = editor.document().nodes()[0].id;
        assert_eq!(node_pos(&editor, first), Point::new(-20.0, 30.0));
        assert_eq!(editor.history().undo_len(), 1);
        assert!(editor.undo());
        assert_eq!(node_pos(&editor, first), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_click_on_node_without_moving_records_nothing() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.set_tool(Tool::Select);
        editor.pointer_down(editor.viewport.world_to_screen(Point::ZERO), PointerButton::Primary);
        editor.pointer_up();
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_delete_keeps_referenced_nodes() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor.set_tool(Tool::Select);
        click(&mut editor, 40.0, 20.0);
        assert!(editor.selected_shape().is_some());

        assert!(editor.key_down(Key::Delete, Modifiers::default()));
        assert!(editor.document().shapes().is_empty());
        assert_eq!(editor.document().nodes().len(), 3);
        assert!(editor.selected_id().is_none());
    }

    #[test]
    fn test_label_mode_annotates_and_drags() {
        let (doc, _) = socket_document();
        let mut editor = Editor::with_document(doc);
        editor.viewport = Viewport::new(0.0, 0.0, 1.0);
        editor.set_mode(Mode::Label);
        click(&mut editor, 40.0, 20.0);

        let label = editor.selected_shape().cloned();
        let Some(Shape {
            kind:
                ShapeKind::Label {
                    x,
                    y,
                    text,
                    target_type,
                    target_x,
                    ..
                },
            ..
        }) = label
        else {
            panic!("label should be selected");
        };
        assert_eq!((x, y), (80.0, -20.0));
        assert_eq!(text, "HI Socket φ13");
        assert_eq!(target_type.as_deref(), Some("socket"));
        assert_eq!(target_x, Some(40.0));

        editor.pointer_down(Point::new(85.0, -25.0), PointerButton::Primary);
        editor.pointer_move(Point::new(95.0, -15.0));
        editor.pointer_up();
        match editor.selected_shape().map(|s| &s.kind) {
            Some(ShapeKind::Label { x, y, .. }) => assert_eq!((*x, *y), (90.0, -10.0)),
            other => panic!("expected a label, got {other:?}"),
        }
        assert_eq!(editor.history().undo_len(), 2);
    }

    #[test]
    fn test_text_tool_places_and_selects_text() {
        let mut editor = editor();
        editor.set_tool(Tool::Text);
        click(&mut editor, 10.0, 20.0);
        match editor.selected_shape().map(|s| &s.kind) {
            Some(ShapeKind::Text { x, y, text }) => {
                assert_eq!((*x, *y), (10.0, 20.0));
                assert_eq!(text, "Text");
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(editor.tool(), Tool::Pipe);
    }

    #[test]
    fn test_panning_suspends_and_resumes_placement() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        editor.pointer_down(Point::new(50.0, 50.0), PointerButton::Middle);
        editor.pointer_move(Point::new(60.0, 70.0));
        editor.pointer_up();

        assert_eq!((editor.viewport.pan_x, editor.viewport.pan_y), (10.0, 20.0));
        assert!(matches!(editor.interaction(), Interaction::Placing(_)));
    }

    #[test]
    fn test_space_bar_pans_with_primary_button() {
        let mut editor = editor();
        editor.key_down(Key::Space, Modifiers::default());
        editor.pointer_down(Point::new(0.0, 0.0), PointerButton::Primary);
        editor.pointer_move(Point::new(-5.0, 5.0));
        editor.key_up(Key::Space);
        assert!(matches!(editor.interaction(), Interaction::Idle));
        assert_eq!((editor.viewport.pan_x, editor.viewport.pan_y), (-5.0, 5.0));
        assert!(editor.document().nodes().is_empty());
    }

    #[test]
    fn test_escape_abandons_placement_leaving_orphan() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        assert!(editor.key_down(Key::Escape, Modifiers::default()));
        assert!(matches!(editor.interaction(), Interaction::Idle));
        assert_eq!(editor.document().nodes().len(), 1);
    }

    #[test]
    fn test_undo_shortcuts() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 0.0, 100.0);
        let command = Modifiers {
            command: true,
            shift: false,
        };
        assert!(editor.key_down(Key::Z, command));
        assert!(editor.document().shapes().is_empty());
        assert!(editor.key_down(Key::Y, command));
        assert_eq!(editor.document().shapes().len(), 1);
        assert!(!editor.key_down(Key::Z, Modifiers::default()));
    }

    #[test]
    fn test_clear_is_undoable_and_ids_keep_counting() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        let next = editor.document().next_node_id();
        assert!(editor.clear());
        assert!(editor.document().nodes().is_empty());
        assert_eq!(editor.document().next_node_id(), next);
        assert!(editor.undo());
        assert_eq!(editor.document().shapes().len(), 1);
    }

    #[test]
    fn test_malformed_document_loads_as_empty() {
        let mut editor = editor();
        click(&mut editor, 0.0, 0.0);
        assert!(!editor.load_json("{ not json"));
        assert!(editor.document().nodes().is_empty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut editor = editor();
        editor.pipe_color = PipeColor::New;
        click(&mut editor, 0.0, 0.0);
        click(&mut editor, 100.0, 0.0);
        let json = editor.save_json().unwrap_or_default();

        let mut other = Editor::new();
        assert!(other.load_json(&json));
        assert_eq!(other.document(), editor.document());
    }

    #[test]
    fn test_resolve_endpoint_prefers_pointer_then_candidate() {
        let (doc, middle) = socket_document();
        assert_eq!(
            resolve_endpoint(&doc, Point::new(41.0, 1.0), Some(Point::new(0.0, 0.0)), 10.0, &[]),
            Endpoint::Existing(middle)
        );
        assert_eq!(
            resolve_endpoint(&doc, Point::new(41.0, 1.0), None, 10.0, &[middle]),
            Endpoint::New(Point::new(41.0, 1.0))
        );
        let first = doc.nodes()[0].id;
        assert_eq!(
            resolve_endpoint(&doc, Point::new(500.0, 0.0), Some(Point::new(2.0, 0.0)), 10.0, &[]),
            Endpoint::Existing(first)
        );
    }
}
