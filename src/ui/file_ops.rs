//! File operations for saving and loading drawings.
//!
//! Dialogs and disk I/O run on the tokio runtime; their outcomes come back to the UI
//! thread as [`FileOperationResult`] messages.

use super::state::{FileOperationResult, PendingLoadOperation, PendingSaveOperation, PipeSketchApp};
use eframe::egui;

impl PipeSketchApp {
    /// Handles pending file operations.
    ///
    /// This method processes completed async file operations and initiates new ones.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context for requesting repaints
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.file.file_operation_receiver.try_recv() {
            self.apply_file_result(result);
        }

        if let Some(save_op) = self.file.pending_save_operation.take() {
            self.start_save(ctx, save_op);
        }

        if let Some(PendingLoadOperation::Load) = self.file.pending_load_operation.take() {
            self.start_load(ctx);
        }
    }

    /// Applies the outcome of a finished async operation.
    pub fn apply_file_result(&mut self, result: FileOperationResult) {
        match result {
            FileOperationResult::SaveCompleted(path) => {
                log::info!("drawing saved to {path}");
                self.file.last_message = Some(format!("Saved {path}"));
                self.file.current_path = Some(path);
            }
            FileOperationResult::LoadCompleted(path, content) => {
                if self.editor.load_json(&content) {
                    log::info!("drawing loaded from {path}");
                    self.file.last_message = Some(format!("Opened {path}"));
                    self.file.current_path = Some(path);
                } else {
                    self.file.last_message = Some(format!("{path} is not a readable drawing"));
                    self.file.current_path = None;
                }
            }
            FileOperationResult::ExportCompleted(path) => {
                log::info!("PNG exported to {path}");
                self.file.last_message = Some(format!("Exported {path}"));
            }
            FileOperationResult::OperationFailed(error) => {
                log::error!("file operation failed: {error}");
                self.file.last_message = Some(error);
            }
        }
    }

    fn start_save(&mut self, ctx: &egui::Context, save_op: PendingSaveOperation) {
        let json = match self.editor.save_json() {
            Ok(json) => json,
            Err(e) => {
                self.apply_file_result(FileOperationResult::OperationFailed(format!(
                    "Failed to serialize drawing: {e}"
                )));
                return;
            }
        };
        let path = match (save_op, self.file.current_path.clone()) {
            (PendingSaveOperation::Save, Some(path)) => Some(path),
            _ => None,
        };
        let sender = self.file.file_operation_sender.clone();
        let ctx = ctx.clone();

        #[cfg(not(target_arch = "wasm32"))]
        tokio::spawn(async move {
            let path = match path {
                Some(path) => std::path::PathBuf::from(path),
                None => match rfd::AsyncFileDialog::new()
                    .add_filter("JSON", &["json"])
                    .set_file_name("drawing.json")
                    .save_file()
                    .await
                {
                    Some(handle) => handle.path().to_path_buf(),
                    None => return,
                },
            };
            let result = match std::fs::write(&path, json) {
                Ok(()) => FileOperationResult::SaveCompleted(path.display().to_string()),
                Err(e) => FileOperationResult::OperationFailed(format!("Failed to save file: {e}")),
            };
            let _ = sender.send(result);
            ctx.request_repaint();
        });

        #[cfg(target_arch = "wasm32")]
        {
            let _ = (json, path, ctx);
            let _ = sender.send(FileOperationResult::OperationFailed(
                "Saving is not available on this platform".to_string(),
            ));
        }
    }

    fn start_load(&mut self, ctx: &egui::Context) {
        let sender = self.file.file_operation_sender.clone();
        let ctx = ctx.clone();

        #[cfg(not(target_arch = "wasm32"))]
        tokio::spawn(async move {
            let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("JSON", &["json"])
                .pick_file()
                .await
            else {
                return;
            };
            let path = handle.path();
            let result = match std::fs::read_to_string(path) {
                Ok(json) => FileOperationResult::LoadCompleted(path.display().to_string(), json),
                Err(e) => FileOperationResult::OperationFailed(format!("Failed to read file: {e}")),
            };
            let _ = sender.send(result);
            ctx.request_repaint();
        });

        #[cfg(target_arch = "wasm32")]
        {
            let _ = ctx;
            let _ = sender.send(FileOperationResult::OperationFailed(
                "Opening files is not available on this platform".to_string(),
            ));
        }
    }

    /// Opens a file dialog to save the drawing with a new name.
    pub fn save_as_document(&mut self) {
        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
    }

    /// Saves the drawing to the current file path, or triggers "Save As" if no path is set.
    pub fn save_document(&mut self) {
        if self.file.current_path.is_some() {
            self.file.pending_save_operation = Some(PendingSaveOperation::Save);
        } else {
            self.save_as_document();
        }
    }

    /// Opens a file dialog to load a drawing from disk.
    pub fn open_document(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::Load);
    }

    /// Starts a new drawing. Clearing is undoable; the file association is dropped.
    pub fn new_document(&mut self) {
        if !self.editor.clear() {
            return;
        }
        self.file.current_path = None;
        self.file.last_message = None;
    }
}
