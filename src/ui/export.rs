//! PNG export of the drawing (native builds only).
//!
//! The document is rendered in export mode, framed to its bounds plus a margin, written
//! out as SVG and rasterised with resvg.

use super::state::{FileOperationResult, PipeSketchApp};
#[cfg(not(target_arch = "wasm32"))]
use crate::error::DocumentError;
#[cfg(not(target_arch = "wasm32"))]
use crate::rendering::{frame_document, render, RenderOptions, Scene};
#[cfg(not(target_arch = "wasm32"))]
use crate::svg::to_svg;
#[cfg(not(target_arch = "wasm32"))]
use crate::types::Document;
use eframe::egui;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;

/// Builds the export SVG for `document`.
///
/// # Returns
///
/// The SVG text and its pixel size
#[cfg(not(target_arch = "wasm32"))]
pub fn export_svg(
    document: &Document,
    scale: f64,
    margin: f64,
    socket_scale: f64,
    elbow_scale: f64,
) -> (String, u32, u32) {
    let (viewport, (width, height)) = frame_document(document, margin.max(0.0), scale);
    let mut scene = Scene::new(document, viewport);
    scene.socket_scale = socket_scale;
    scene.elbow_scale = elbow_scale;
    let commands = render(&scene, (width, height), RenderOptions::export());
    let (width, height) = (width as u32, height as u32);
    (to_svg(&commands, width, height), width, height)
}

/// Rasterises an SVG string into a pixmap of `width` x `height` pixels.
#[cfg(not(target_arch = "wasm32"))]
pub fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<tiny_skia::Pixmap, DocumentError> {
    let mut opt = usvg::Options::default();
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    opt.fontdb = Arc::new(db);

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opt)
        .map_err(|e| DocumentError::Export(format!("failed to parse SVG: {e}")))?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| DocumentError::Export(format!("failed to create pixmap {width}x{height}")))?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap)
}

impl PipeSketchApp {
    /// Renders the drawing to PNG and saves it through a file dialog.
    pub fn export_png(&mut self, ctx: &egui::Context) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let (svg, width, height) = export_svg(
                self.editor.document(),
                self.settings.png_scale.clamp(0.25, 8.0),
                self.settings.png_margin,
                self.settings.socket_scale,
                self.settings.elbow_scale,
            );
            let pixmap = match rasterize_svg(&svg, width, height) {
                Ok(pixmap) => pixmap,
                Err(e) => {
                    self.apply_file_result(FileOperationResult::OperationFailed(e.to_string()));
                    return;
                }
            };

            let sender = self.file.file_operation_sender.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let Some(handle) = rfd::AsyncFileDialog::new()
                    .add_filter("PNG", &["png"])
                    .set_file_name("drawing.png")
                    .save_file()
                    .await
                else {
                    return;
                };
                let path = handle.path();
                let result = match pixmap.save_png(path) {
                    Ok(()) => FileOperationResult::ExportCompleted(path.display().to_string()),
                    Err(e) => FileOperationResult::OperationFailed(
                        DocumentError::Export(format!("failed to save PNG: {e}")).to_string(),
                    ),
                };
                let _ = sender.send(result);
                ctx.request_repaint();
            });
        }

        #[cfg(target_arch = "wasm32")]
        {
            let _ = ctx;
            self.apply_file_result(FileOperationResult::OperationFailed(
                "PNG export is not available on this platform".to_string(),
            ));
        }
    }
}
