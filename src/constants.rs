//! Shared application-wide constants.
//! Centralizes tweakable values used across placement, hit-testing and rendering.

// Snapping
/// Radius (in screen pixels) within which a placement click reuses an existing node.
/// Divided by the zoom factor to get world units.
pub const PLACEMENT_SNAP_RADIUS: f64 = 10.0;
/// Radius (in screen pixels) within which the select tool grabs a node.
pub const NODE_GRAB_RADIUS: f64 = 15.0;
/// Direction quantum for every connector placement (45 degrees).
pub const ANGLE_STEP: f64 = std::f64::consts::FRAC_PI_4;
/// Commits shorter than this (in world units) are rejected as degenerate.
pub const MIN_SEGMENT_LENGTH: f64 = 1.0;

// Fixed fitting footprints (world units)
/// Socket and tee through-run length.
pub const SOCKET_LENGTH: f64 = 80.0;
/// MC union and meter elastic joint length.
pub const UNION_LENGTH: f64 = 70.0;
/// Auxiliary valve length.
pub const VALVE_LENGTH: f64 = 80.0;
/// Meter length.
pub const METER_LENGTH: f64 = 70.0;
/// Distance from the tee midpoint to its branch node.
pub const CHEESE_BRANCH_LENGTH: f64 = 45.0;

// Hit-testing (screen pixels, divided by zoom)
/// Hit radius around a text anchor.
pub const TEXT_HIT_RADIUS: f64 = 20.0;
/// Hit radius around an elbow's node.
pub const ELBOW_HIT_RADIUS: f64 = 30.0;
/// Hit radius around the midpoint of any two-node fitting.
pub const CONNECTOR_HIT_RADIUS: f64 = 25.0;
/// Nominal label hit box relative to the label origin: (left, top, right, bottom) in world units.
pub const LABEL_HIT_BOX: (f64, f64, f64, f64) = (-10.0, -20.0, 100.0, 10.0);
/// Offset of a freshly created label from the click that created it.
pub const LABEL_PLACEMENT_OFFSET: (f64, f64) = (40.0, -40.0);

// Viewport
/// Initial zoom of a new editor session.
pub const DEFAULT_ZOOM: f64 = 0.8;
/// Lower zoom bound.
pub const MIN_ZOOM: f64 = 0.1;
/// Upper zoom bound.
pub const MAX_ZOOM: f64 = 5.0;
/// Multiplicative zoom step per wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

// Undo/redo
/// Maximum number of undo snapshots to retain.
pub const MAX_UNDO_HISTORY: usize = 50;

// Grid/drawing
/// Grid cell size in world units.
pub const GRID_SIZE: f64 = 40.0;
/// Radius of connector node markers (screen pixels).
pub const NODE_MARKER_RADIUS: f32 = 3.0;
/// Opacity of the placement ghost.
pub const PREVIEW_ALPHA: f32 = 0.6;
/// Font size of free text shapes (world units).
pub const TEXT_FONT_SIZE: f64 = 14.0;
/// Default label font size (world units).
pub const LABEL_FONT_SIZE: f64 = 20.0;
/// Average glyph advance as a fraction of the font size, used to estimate text widths.
pub const TEXT_ADVANCE_RATIO: f64 = 0.6;
