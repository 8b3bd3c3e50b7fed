//! Application state management structures.
//!
//! The drawing itself lives in the [`Editor`]; this module holds what the desktop shell
//! adds around it: persisted UI settings and the state of async file operations.

use crate::interaction::Editor;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Storage key under which [`EditorSettings`] are persisted.
pub const SETTINGS_KEY: &str = "pipe_sketch_settings";

/// UI settings remembered across sessions.
///
/// The drawing is never stored here; it is only written by an explicit save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Scale of socket glyphs (and the tee body)
    pub socket_scale: f64,
    /// Scale of elbow glyphs (and the tee branch)
    pub elbow_scale: f64,
    /// Remembered width of the properties panel
    pub properties_panel_width: f32,
    /// Pixels per world unit in exported PNGs
    pub png_scale: f64,
    /// Blank border around the drawing in exported PNGs, in world units
    pub png_margin: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            socket_scale: 1.0,
            elbow_scale: 1.0,
            properties_panel_width: 260.0,
            png_scale: 2.0,
            png_margin: 40.0,
        }
    }
}

impl EditorSettings {
    /// Serializes the settings to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// State related to file operations.
///
/// Dialogs run on the async runtime and report back over a channel that the UI
/// drains once per frame.
pub struct FileState {
    /// Path the drawing was last saved to or opened from
    pub current_path: Option<String>,
    pub pending_save_operation: Option<PendingSaveOperation>,
    pub pending_load_operation: Option<PendingLoadOperation>,
    /// Channel for receiving file operation results from async contexts
    pub file_operation_sender: Sender<FileOperationResult>,
    pub file_operation_receiver: Receiver<FileOperationResult>,
    /// Outcome of the last file operation, shown in the status bar
    pub last_message: Option<String>,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            current_path: None,
            pending_save_operation: None,
            pending_load_operation: None,
            file_operation_sender: sender,
            file_operation_receiver: receiver,
            last_message: None,
        }
    }
}

/// Represents a pending save operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSaveOperation {
    /// Save with a new file path (show file picker)
    SaveAs,
    /// Save to the existing file path
    Save,
}

/// Represents a pending load operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingLoadOperation {
    /// Load from a file (show file picker)
    Load,
}

/// Messages sent from async file operations back to the main app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// Save operation completed successfully with the given path
    SaveCompleted(String),
    /// Load operation completed successfully with path and content
    LoadCompleted(String, String),
    /// PNG export was written to the given path
    ExportCompleted(String),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// The main application structure: the editing session plus the desktop shell around it.
pub struct PipeSketchApp {
    /// The drawing session
    pub editor: Editor,
    /// Persisted UI settings
    pub settings: EditorSettings,
    /// File operations state
    pub file: FileState,
}

impl Default for PipeSketchApp {
    fn default() -> Self {
        Self::with_settings(EditorSettings::default())
    }
}

impl PipeSketchApp {
    /// Creates the app with an empty drawing and the given settings.
    pub fn with_settings(settings: EditorSettings) -> Self {
        let mut editor = Editor::new();
        editor.socket_scale = settings.socket_scale;
        editor.elbow_scale = settings.elbow_scale;
        Self {
            editor,
            settings,
            file: FileState::default(),
        }
    }

    /// Creates the app, restoring settings saved by a previous session.
    ///
    /// Unreadable settings are discarded in favour of the defaults.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        Self::from_storage(cc.storage)
    }

    /// Restores settings from `storage`, if any were saved.
    pub fn from_storage(storage: Option<&dyn eframe::Storage>) -> Self {
        let settings = storage
            .and_then(|s| s.get_string(SETTINGS_KEY))
            .and_then(|json| match EditorSettings::from_json(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("ignoring unreadable settings: {e}");
                    None
                }
            })
            .unwrap_or_default();
        Self::with_settings(settings)
    }

    /// Pushes settings that affect drawing into the editor.
    pub fn apply_settings(&mut self) {
        self.editor.socket_scale = self.settings.socket_scale;
        self.editor.elbow_scale = self.settings.elbow_scale;
    }
}
