//! Selection-driven property editing.
//!
//! Fields are untyped key/value pairs stored on the shape's open attribute bag, plus the
//! text of text and label shapes. Writes go straight to the document and are not
//! recorded in the undo history.

use crate::constants::LABEL_FONT_SIZE;
use crate::types::{Document, PipeColor, Shape, ShapeKind};
use serde_json::Value;

/// Well-known fields with their captions, in panel order.
const KNOWN_FIELDS: [(&str, &str); 5] = [
    ("propType", "Type"),
    ("propSize1", "Size 1"),
    ("propSize2", "Size 2"),
    ("propLength", "Length"),
    ("propFontSize", "Font size"),
];

/// Key under which the text of text and label shapes is edited.
pub const TEXT_KEY: &str = "text";

/// One editable field as shown in the properties panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyField {
    pub key: String,
    pub caption: String,
    pub value: String,
}

impl PropertyField {
    fn new(key: &str, caption: &str, value: String) -> Self {
        Self {
            key: key.to_string(),
            caption: caption.to_string(),
            value,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Editable fields of `shape`.
///
/// Text and label shapes lead with their text; labels always offer a font size. Every
/// other scalar attribute in the bag is listed too, under its raw key.
pub fn property_fields(shape: &Shape) -> Vec<PropertyField> {
    let mut fields = Vec::new();
    match &shape.kind {
        ShapeKind::Text { text, .. } => {
            fields.push(PropertyField::new(TEXT_KEY, "Text", text.clone()));
        }
        ShapeKind::Label { text, .. } => {
            fields.push(PropertyField::new(TEXT_KEY, "Text", text.clone()));
            let size = shape
                .extra
                .get("propFontSize")
                .and_then(value_text)
                .unwrap_or_else(|| LABEL_FONT_SIZE.to_string());
            fields.push(PropertyField::new("propFontSize", "Font size", size));
        }
        _ => {}
    }

    for (key, caption) in KNOWN_FIELDS {
        if fields.iter().any(|f| f.key == key) {
            continue;
        }
        if let Some(value) = shape.extra.get(key).and_then(value_text) {
            fields.push(PropertyField::new(key, caption, value));
        }
    }

    let mut others: Vec<_> = shape
        .extra
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.iter().any(|(k, _)| k == key))
        .filter_map(|(key, value)| value_text(value).map(|v| (key.clone(), v)))
        .collect();
    others.sort();
    fields.extend(
        others
            .into_iter()
            .map(|(key, value)| PropertyField::new(&key, &key, value)),
    );
    fields
}

/// Writes a field on shape `id`.
///
/// `text` on text/label shapes edits the text itself; a numeric `propFontSize` is stored
/// as a number; everything else is stored as a string.
///
/// # Returns
///
/// `false` if the shape does not exist
pub fn set_property(document: &mut Document, id: &str, key: &str, value: &str) -> bool {
    let Some(shape) = document.shape_mut(id) else {
        return false;
    };
    match (&mut shape.kind, key) {
        (ShapeKind::Text { text, .. } | ShapeKind::Label { text, .. }, TEXT_KEY) => {
            *text = value.to_string();
        }
        (_, "propFontSize") => {
            let stored = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|size| *size > 0.0)
                .map_or_else(|| Value::from(value), Value::from);
            shape.extra.insert(key.to_string(), stored);
        }
        _ => {
            shape.extra.insert(key.to_string(), Value::from(value));
        }
    }
    true
}

/// Sets the colour class of shape `id`.
pub fn set_color(document: &mut Document, id: &str, color: PipeColor) -> bool {
    match document.shape_mut(id) {
        Some(shape) => {
            shape.color = color;
            true
        }
        None => false,
    }
}

/// Toggles the flip flag of shape `id`.
pub fn toggle_flipped(document: &mut Document, id: &str) -> bool {
    match document.shape_mut(id) {
        Some(shape) => {
            shape.flipped = !shape.flipped;
            true
        }
        None => false,
    }
}
