//! # Pipe Sketch
//!
//! An editor for 2D piping schematics: pipe runs and standard fittings joined at shared
//! connector nodes, with labels and free text.
//!
//! ## Features
//! - Placement of pipes, sockets, elbows, tees, unions, meters, valves and elastic joints
//!   with 45° angle snapping and implicit connection to nearby nodes
//! - Selection, node and label dragging, deletion
//! - Labels with leader lines that follow the annotated fitting
//! - Canvas panning and cursor-anchored zooming
//! - Bounded snapshot undo/redo
//! - JSON documents and PNG export
//!
//! The editing core ([`Editor`], [`Document`], [`render`]) has no dependency on the GUI;
//! [`run_app`] wraps it in an eframe window.

#![deny(unsafe_code)]

pub mod constants;
pub mod error;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod properties;
pub mod rendering;
pub mod svg;
pub mod types;
pub mod viewport;
mod ui;

pub use error::DocumentError;
pub use geometry::Point;
pub use history::History;
pub use interaction::{Editor, Interaction, Mode, Tool};
pub use rendering::{render, DrawCommand, RenderOptions, Scene};
pub use types::{Document, Node, NodeId, PipeColor, Shape, ShapeId, ShapeKind};
pub use ui::{EditorSettings, PipeSketchApp};
pub use viewport::Viewport;

/// Runs the editor with default window options.
///
/// UI settings saved by a previous session are restored.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), eframe::Error> {
///     pipe_sketch::run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Pipe Sketch",
        options,
        Box::new(|cc| Ok(Box::new(PipeSketchApp::new(cc)))),
    )
}
