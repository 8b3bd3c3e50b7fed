//! Core data types for the piping diagram.
//!
//! This module defines the persisted document: connector [`Node`]s, placed fittings and
//! annotations ([`Shape`]s), and the [`Document`] aggregate that owns both together with
//! the node-id counter. The document is the unit of persistence and of undo snapshots.

use crate::geometry::Point;
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a connector node. Never reused within a document.
pub type NodeId = u64;

/// Identifier of a placed shape.
pub type ShapeId = String;

/// A connector point in world space, shared by the fittings that meet there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique, monotonically allocated identifier
    pub id: NodeId,
    /// World x coordinate
    pub x: f64,
    /// World y coordinate
    pub y: f64,
}

impl Node {
    /// Position of the node as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Work classification of a fitting, each drawn in its own stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipeColor {
    /// Existing installation (blue)
    #[default]
    #[serde(rename = "blue")]
    Existing,
    /// Newly laid work (red)
    #[serde(rename = "red")]
    New,
}

impl PipeColor {
    /// Human-readable name for toolbars and property panels.
    pub fn label(self) -> &'static str {
        match self {
            PipeColor::Existing => "Existing (blue)",
            PipeColor::New => "New work (red)",
        }
    }
}

/// Variant-specific part of a shape: what it is and what it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ShapeKind {
    /// Straight pipe run between two nodes
    Pipe { a: NodeId, b: NodeId },
    /// Socket coupling
    Socket { a: NodeId, b: NodeId },
    /// Elbow anchored on `a`; the outlet direction is free, so both legs are stored as angles
    Elbow {
        a: NodeId,
        /// Node where the outlet run continues
        #[serde(default, skip_serializing_if = "Option::is_none")]
        b: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_angle: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_angle: Option<f64>,
    },
    /// Tee: through run `a`-`b`, branch towards `c`
    Cheese {
        a: NodeId,
        b: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        c: Option<NodeId>,
    },
    /// MC union
    McUnion { a: NodeId, b: NodeId },
    /// Water meter
    Meter { a: NodeId, b: NodeId },
    /// Auxiliary valve with check valve
    HojoValve { a: NodeId, b: NodeId },
    /// Meter elastic joint
    FixedCustom { a: NodeId, b: NodeId },
    /// Free text placed at a world position
    Text {
        x: f64,
        y: f64,
        #[serde(default)]
        text: String,
    },
    /// Annotation with a leader line to another shape
    Label {
        x: f64,
        y: f64,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_shape_id: Option<ShapeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_y: Option<f64>,
    },
}

impl ShapeKind {
    /// The persisted `type` tag of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShapeKind::Pipe { .. } => "pipe",
            ShapeKind::Socket { .. } => "socket",
            ShapeKind::Elbow { .. } => "elbow",
            ShapeKind::Cheese { .. } => "cheese",
            ShapeKind::McUnion { .. } => "mcUnion",
            ShapeKind::Meter { .. } => "meter",
            ShapeKind::HojoValve { .. } => "hojoValve",
            ShapeKind::FixedCustom { .. } => "fixedCustom",
            ShapeKind::Text { .. } => "text",
            ShapeKind::Label { .. } => "label",
        }
    }

    /// Every node this shape references, in `a`, `b`, `c` order.
    pub fn node_refs(&self) -> Vec<NodeId> {
        match *self {
            ShapeKind::Pipe { a, b }
            | ShapeKind::Socket { a, b }
            | ShapeKind::McUnion { a, b }
            | ShapeKind::Meter { a, b }
            | ShapeKind::HojoValve { a, b }
            | ShapeKind::FixedCustom { a, b } => vec![a, b],
            ShapeKind::Cheese { a, b, c } => [Some(a), Some(b), c].into_iter().flatten().collect(),
            ShapeKind::Elbow { a, b, .. } => [Some(a), b].into_iter().flatten().collect(),
            ShapeKind::Text { .. } | ShapeKind::Label { .. } => Vec::new(),
        }
    }

    /// The two-node connector pair, for variants drawn between two nodes.
    pub fn connector_pair(&self) -> Option<(NodeId, NodeId)> {
        match *self {
            ShapeKind::Pipe { a, b }
            | ShapeKind::Socket { a, b }
            | ShapeKind::McUnion { a, b }
            | ShapeKind::Meter { a, b }
            | ShapeKind::HojoValve { a, b }
            | ShapeKind::FixedCustom { a, b }
            | ShapeKind::Cheese { a, b, .. } => Some((a, b)),
            _ => None,
        }
    }
}

/// Catalogue name of a fitting type, used as default label text.
pub fn catalogue_name(type_name: &str) -> &'static str {
    match type_name {
        "pipe" => "Pipe",
        "socket" => "HI Socket φ13",
        "elbow" => "HI Elbow φ13",
        "cheese" => "HI Tee φ13",
        "mcUnion" => "MC Union φ13",
        "meter" => "Water Meter",
        "hojoValve" => "Auxiliary Valve w/ Check φ13",
        "fixedCustom" => "Meter Elastic Joint φ13",
        "text" => "Text",
        "label" => "Label",
        _ => "Fitting",
    }
}

/// A placed fitting or annotation.
///
/// The typed core (id, kind, colour, flip) is complemented by an open attribute bag
/// holding free-form property fields (`propType`, `propSize1`, ...) and anything else a
/// stored document carried, so that loading and saving never drops data.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Unique identifier
    pub id: ShapeId,
    /// Variant and node references
    pub kind: ShapeKind,
    /// Existing vs newly laid work
    pub color: PipeColor,
    /// Mirror flag; its exact effect depends on the glyph
    pub flipped: bool,
    /// Free-form attributes not covered by the typed core
    pub extra: Map<String, Value>,
}

impl Shape {
    /// Creates a shape with a fresh identifier and an empty attribute bag.
    pub fn new(kind: ShapeKind, color: PipeColor, flipped: bool) -> Self {
        Self {
            id: Self::new_id(),
            kind,
            color,
            flipped,
            extra: Map::new(),
        }
    }

    /// Generates a fresh shape identifier.
    pub fn new_id() -> ShapeId {
        format!("s_{}", Uuid::new_v4().simple())
    }

    /// Seeds the default property fields a freshly placed fitting carries.
    pub fn with_default_props(mut self) -> Self {
        self.extra.insert("propType".into(), Value::from("HI"));
        self.extra.insert("propSize1".into(), Value::from("13"));
        self.extra.insert("propSize2".into(), Value::from(""));
        if matches!(self.kind, ShapeKind::Pipe { .. }) {
            self.extra.insert("propLength".into(), Value::from(""));
        }
        self
    }

    /// The persisted `type` tag.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Reads a free-form attribute as text.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Reads a free-form attribute as a number.
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(Value::as_f64)
    }
}

impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = self.extra.clone();
        match serde_json::to_value(&self.kind).map_err(ser::Error::custom)? {
            Value::Object(kind_fields) => fields.extend(kind_fields),
            _ => return Err(ser::Error::custom("shape kind did not serialize to an object")),
        }
        fields.insert("id".into(), Value::from(self.id.clone()));
        fields.insert(
            "color".into(),
            serde_json::to_value(self.color).map_err(ser::Error::custom)?,
        );
        fields.insert("flipped".into(), Value::from(self.flipped));
        fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Shape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        let kind: ShapeKind =
            serde_json::from_value(Value::Object(fields.clone())).map_err(de::Error::custom)?;
        // Whatever the typed kind re-emits is owned by it; the rest stays in the bag.
        if let Ok(Value::Object(kind_fields)) = serde_json::to_value(&kind) {
            for key in kind_fields.keys() {
                fields.remove(key);
            }
        }

        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            Some(_) => return Err(de::Error::custom("shape id must be a string")),
            None => return Err(de::Error::missing_field("id")),
        };
        let color = match fields.remove("color") {
            None | Some(Value::Null) => PipeColor::default(),
            Some(value) => serde_json::from_value(value).map_err(de::Error::custom)?,
        };
        let flipped = match fields.remove("flipped") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => flag,
            Some(_) => return Err(de::Error::custom("flipped must be a boolean")),
        };

        Ok(Self {
            id,
            kind,
            color,
            flipped,
            extra: fields,
        })
    }
}

fn first_node_id() -> NodeId {
    1
}

/// The persisted drawing: nodes, shapes and the next node identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    shapes: Vec<Shape>,
    #[serde(rename = "nextNodeId", default = "first_node_id")]
    next_node_id: NodeId,
}

impl Default for Document {
    /// Creates an empty document whose first node will get id 1.
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            shapes: Vec::new(),
            next_node_id: first_node_id(),
        }
    }
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the document to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_str(json)?;
        doc.normalize();
        Ok(doc)
    }

    /// Deserialize a document from an already parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_value(value)?;
        doc.normalize();
        Ok(doc)
    }

    fn normalize(&mut self) {
        let floor = self.nodes.iter().map(|n| n.id + 1).max().unwrap_or(1);
        if self.next_node_id < floor {
            log::warn!(
                "nextNodeId {} does not exceed existing node ids; raising it to {}",
                self.next_node_id,
                floor
            );
            self.next_node_id = floor;
        }
        for (shape_id, node_id) in self.dangling_references() {
            log::warn!("shape {shape_id} references missing node {node_id}");
        }
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All shapes, in z-order (last drawn on top).
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The identifier the next created node will receive.
    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    /// Makes sure the next created node id is at least `floor`. The counter never goes down.
    pub fn raise_next_node_id(&mut self, floor: NodeId) {
        self.next_node_id = self.next_node_id.max(floor);
    }

    /// Allocates the next identifier and appends a node at `(x, y)`.
    pub fn create_node(&mut self, x: f64, y: f64) -> Node {
        let node = Node {
            id: self.next_node_id,
            x,
            y,
        };
        self.next_node_id += 1;
        self.nodes.push(node);
        node
    }

    /// Looks up a node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks up a node by id for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Position of a node, if it exists.
    pub fn node_position(&self, id: NodeId) -> Option<Point> {
        self.find_node(id).map(Node::position)
    }

    /// First node (in creation order) within `radius` of `pos`, skipping the ids in `exclude`.
    pub fn find_node_near(&self, pos: Point, radius: f64, exclude: &[NodeId]) -> Option<&Node> {
        let r2 = radius * radius;
        self.nodes
            .iter()
            .filter(|n| !exclude.contains(&n.id))
            .find(|n| n.position().distance_sq(pos) <= r2)
    }

    /// Appends a shape on top of the z-order.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Removes every shape matching `predicate`. Referenced nodes are never touched.
    ///
    /// # Returns
    ///
    /// The number of shapes removed.
    pub fn remove_shape(&mut self, mut predicate: impl FnMut(&Shape) -> bool) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(|s| !predicate(s));
        before - self.shapes.len()
    }

    /// Looks up a shape by id.
    pub fn find_shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Looks up a shape by id for mutation.
    pub fn shape_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    /// Removes all nodes and shapes. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.shapes.clear();
    }

    /// `(shape id, node id)` for every node reference that does not resolve.
    pub fn dangling_references(&self) -> Vec<(ShapeId, NodeId)> {
        self.shapes
            .iter()
            .flat_map(|s| {
                s.kind
                    .node_refs()
                    .into_iter()
                    .filter(|id| self.find_node(*id).is_none())
                    .map(move |id| (s.id.clone(), id))
            })
            .collect()
    }

    /// Point a shape is "at": text origin, elbow node, or the midpoint of a two-node fitting.
    pub fn shape_anchor(&self, shape: &Shape) -> Option<Point> {
        match &shape.kind {
            ShapeKind::Text { x, y, .. } | ShapeKind::Label { x, y, .. } => Some(Point::new(*x, *y)),
            ShapeKind::Elbow { a, .. } => self.node_position(*a),
            kind => {
                let (a, b) = kind.connector_pair()?;
                Some(self.node_position(a)?.midpoint(self.node_position(b)?))
            }
        }
    }

    /// Direction of the most recently placed pipe ending at `node`, pointing into the node.
    ///
    /// An elbow started on that node continues the run in this direction.
    pub fn incoming_pipe_angle(&self, node: NodeId) -> Option<f64> {
        let (a, b) = self.shapes.iter().rev().find_map(|s| match s.kind {
            ShapeKind::Pipe { a, b } if a == node || b == node => Some((a, b)),
            _ => None,
        })?;
        let pa = self.node_position(a)?;
        let pb = self.node_position(b)?;
        Some(if b == node {
            pa.angle_to(pb)
        } else {
            pb.angle_to(pa)
        })
    }

    /// Axis-aligned bounds of everything drawable, as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let points = self.nodes.iter().map(Node::position).chain(
            self.shapes.iter().filter_map(|s| match &s.kind {
                ShapeKind::Text { x, y, .. } | ShapeKind::Label { x, y, .. } => {
                    Some(Point::new(*x, *y))
                }
                _ => None,
            }),
        );
        points.fold(None, |acc, p| {
            Some(match acc {
                None => (p, p),
                Some((min, max)) => (
                    Point::new(min.x.min(p.x), min.y.min(p.y)),
                    Point::new(max.x.max(p.x), max.y.max(p.y)),
                ),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        let b = doc.create_node(100.0, 0.0);
        let c = doc.create_node(50.0, 45.0);
        doc.add_shape(
            Shape::new(ShapeKind::Pipe { a: a.id, b: b.id }, PipeColor::New, false)
                .with_default_props(),
        );
        doc.add_shape(Shape::new(
            ShapeKind::Cheese {
                a: a.id,
                b: b.id,
                c: Some(c.id),
            },
            PipeColor::Existing,
            true,
        ));
        doc.add_shape(Shape::new(
            ShapeKind::Elbow {
                a: b.id,
                b: None,
                base_angle: Some(0.0),
                branch_angle: Some(std::f64::consts::FRAC_PI_2),
            },
            PipeColor::Existing,
            false,
        ));
        let mut label = Shape::new(
            ShapeKind::Label {
                x: 10.5,
                y: -20.25,
                text: "HI Socket φ13".into(),
                target_shape_id: Some("s_target".into()),
                target_type: Some("socket".into()),
                target_x: Some(50.0),
                target_y: Some(0.0),
            },
            PipeColor::Existing,
            false,
        );
        label.extra.insert("propFontSize".into(), json!(24));
        doc.add_shape(label);
        doc
    }

    #[test]
    fn test_document_default() {
        let doc = Document::default();
        assert!(doc.nodes().is_empty());
        assert!(doc.shapes().is_empty());
        assert_eq!(doc.next_node_id(), 1);
    }

    #[test]
    fn test_node_ids_are_monotonic() {
        let mut doc = Document::new();
        let mut last = 0;
        for i in 0..20 {
            let node = doc.create_node(i as f64, 0.0);
            assert!(node.id > last);
            last = node.id;
        }
        doc.clear();
        assert!(doc.create_node(0.0, 0.0).id > last);
    }

    #[test]
    fn test_document_roundtrip_serialization() {
        let doc = sample_document();
        let json = doc.to_json().expect("serialize");
        let restored = Document::from_json(&json).expect("deserialize");
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let input = json!({
            "nodes": [{"id": 1, "x": 0.0, "y": 0.0}, {"id": 2, "x": 80.0, "y": 0.0}],
            "shapes": [{
                "id": "s_1", "type": "socket", "a": 1, "b": 2,
                "color": "red", "flipped": false,
                "propType": "HI", "propSize1": "13", "vendorNote": {"lot": 7},
                "c": null
            }],
            "nextNodeId": 3
        });
        let doc = Document::from_value(input).expect("parse");
        let shape = &doc.shapes()[0];
        assert_eq!(shape.color, PipeColor::New);
        assert_eq!(shape.prop_str("propType"), Some("HI"));
        assert_eq!(shape.extra.get("vendorNote"), Some(&json!({"lot": 7})));
        assert_eq!(shape.extra.get("c"), Some(&Value::Null));
        let again = Document::from_json(&doc.to_json().expect("serialize")).expect("reparse");
        assert_eq!(again, doc);
    }

    #[test]
    fn test_shape_json_uses_camel_case_tags() {
        let doc = sample_document();
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["nextNodeId"], json!(4));
        assert_eq!(value["shapes"][2]["type"], json!("elbow"));
        assert!(value["shapes"][2].get("baseAngle").is_some());
        assert_eq!(value["shapes"][3]["targetShapeId"], json!("s_target"));
        assert_eq!(value["shapes"][0]["color"], json!("red"));
    }

    #[test]
    fn test_next_node_id_is_raised_on_load() {
        let doc = Document::from_value(json!({
            "nodes": [{"id": 7, "x": 0.0, "y": 0.0}],
            "shapes": [],
            "nextNodeId": 2
        }))
        .expect("parse");
        assert_eq!(doc.next_node_id(), 8);
    }

    #[test]
    fn test_remove_shape_keeps_nodes() {
        let mut doc = sample_document();
        let nodes_before = doc.nodes().len();
        let removed = doc.remove_shape(|s| s.type_name() == "pipe");
        assert_eq!(removed, 1);
        assert_eq!(doc.nodes().len(), nodes_before);
        let json = doc.to_json().expect("serialize");
        assert_eq!(Document::from_json(&json).expect("parse").nodes().len(), nodes_before);
    }

    #[test]
    fn test_dangling_references_are_reported() {
        let mut doc = Document::new();
        let a = doc.create_node(0.0, 0.0);
        doc.add_shape(Shape::new(ShapeKind::Pipe { a: a.id, b: 99 }, PipeColor::Existing, false));
        assert_eq!(doc.dangling_references(), vec![(doc.shapes()[0].id.clone(), 99)]);
    }

    #[test]
    fn test_incoming_pipe_angle_follows_the_run() {
        let mut doc = Document::new();
        let a = doc.create_node(100.0, -100.0);
        let b = doc.create_node(100.0, 0.0);
        doc.add_shape(Shape::new(ShapeKind::Pipe { a: a.id, b: b.id }, PipeColor::Existing, false));
        let angle = doc.incoming_pipe_angle(b.id).unwrap_or(f64::NAN);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        let reverse = doc.incoming_pipe_angle(a.id).unwrap_or(f64::NAN);
        assert!((reverse + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!(doc.incoming_pipe_angle(42).is_none());
    }

    #[test]
    fn test_malformed_shape_is_rejected() {
        let result = Document::from_value(json!({
            "nodes": [],
            "shapes": [{"id": 3, "type": "pipe", "a": 1, "b": 2}],
            "nextNodeId": 1
        }));
        assert!(result.is_err());
    }
}
