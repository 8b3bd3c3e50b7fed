//! User interface for the piping sketch editor.
//!
//! The editing logic lives in [`crate::interaction::Editor`]; this module is the egui
//! shell around it: toolbar, properties panel, status bar and canvas.
//!
//! # Module Organization
//!
//! - `state` - Settings, file-operation state and the main [`PipeSketchApp`]
//! - `file_ops` - Async open/save through native file dialogs
//! - `canvas` - Pointer, wheel and keyboard input for the canvas
//! - `rendering` - Painting the display list with egui
//! - `export` - PNG export

mod canvas;
mod export;
mod file_ops;
mod rendering;
mod state;

pub use state::{EditorSettings, PipeSketchApp, SETTINGS_KEY};

use crate::interaction::{Mode, Tool};
use crate::properties::property_fields;
use crate::types::{catalogue_name, PipeColor};
use eframe::egui;

impl eframe::App for PipeSketchApp {
    /// Persist UI settings between restarts. The drawing itself is only saved on request.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.settings.to_json() {
            Ok(json) => storage.set_string(SETTINGS_KEY, json),
            Err(err) => log::error!("failed to serialize settings: {err}"),
        }
    }

    /// Main update function called by egui for each frame.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `_frame` - The eframe frame
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::light());

        self.handle_pending_operations(ctx);
        self.handle_file_shortcuts(ctx);
        self.handle_editor_keys(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let max_width = (viewport_width * 0.9).max(180.0);
        let clamped_width = self.settings.properties_panel_width.clamp(180.0, max_width);

        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(clamped_width)
            .show(ctx, |ui| {
                self.settings.properties_panel_width = ui.available_width().clamp(180.0, max_width);
                self.draw_properties_panel(ui);
            });

        self.apply_settings();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_canvas(ui);
            });
    }
}

impl PipeSketchApp {
    /// Handles file-related keyboard shortcuts: Open, Save and Save As.
    ///
    /// Raw key events are scanned so the shortcuts also fire in headless frames.
    fn handle_file_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (save, save_as, open) = ctx.input(|i| {
            let mut found = (false, false, false);
            for event in &i.events {
                let egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } = event
                else {
                    continue;
                };
                if !(modifiers.command || modifiers.ctrl) {
                    continue;
                }
                match key {
                    egui::Key::S if modifiers.shift => found.1 = true,
                    egui::Key::S => found.0 = true,
                    egui::Key::O => found.2 = true,
                    _ => {}
                }
            }
            found
        });
        if save_as {
            self.save_as_document();
        } else if save {
            self.save_document();
        }
        if open {
            self.open_document();
        }
    }

    /// Renders the toolbar with file operations, history, mode, tools and placement options.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("New").clicked() {
                self.new_document();
            }
            if ui.button("Open").clicked() {
                self.open_document();
            }
            if ui.button("Save").clicked() {
                self.save_document();
            }
            if ui.button("Save As").clicked() {
                self.save_as_document();
            }
            if ui.button("Export PNG").clicked() {
                self.export_png(ui.ctx());
            }

            ui.separator();

            ui.add_enabled_ui(self.editor.history().can_undo(), |ui| {
                if ui.button("⟲ Undo").clicked() {
                    self.editor.undo();
                }
            });
            ui.add_enabled_ui(self.editor.history().can_redo(), |ui| {
                if ui.button("⟳ Redo").clicked() {
                    self.editor.redo();
                }
            });

            ui.separator();

            let mut mode = self.editor.mode();
            ui.selectable_value(&mut mode, Mode::Drawing, "Draw");
            ui.selectable_value(&mut mode, Mode::Label, "Label");
            if mode != self.editor.mode() {
                self.editor.set_mode(mode);
            }

            ui.separator();

            ui.add_enabled_ui(self.editor.mode() == Mode::Drawing, |ui| {
                let mut tool = self.editor.tool();
                for candidate in Tool::ALL {
                    ui.selectable_value(&mut tool, candidate, candidate.label());
                }
                if tool != self.editor.tool() {
                    self.editor.set_tool(tool);
                }
            });

            ui.separator();

            egui::ComboBox::from_id_salt("pipe_color_combo")
                .selected_text(self.editor.pipe_color.label())
                .show_ui(ui, |ui| {
                    for color in [PipeColor::Existing, PipeColor::New] {
                        ui.selectable_value(&mut self.editor.pipe_color, color, color.label());
                    }
                });
            ui.checkbox(&mut self.editor.preview_flipped, "Flip");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let name = self.file.current_path.as_deref().unwrap_or("Untitled");
                ui.label(name);
                ui.label(format!("Zoom: {:.0}%", self.editor.viewport.zoom * 100.0));
            });
        });
    }

    /// Renders the properties panel for the selected shape, followed by the settings.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.heading("Properties");
                ui.separator();

                match self.editor.selected_shape().cloned() {
                    Some(shape) => {
                        ui.label(egui::RichText::new(catalogue_name(shape.type_name())).strong());
                        ui.label(egui::RichText::new(&shape.id).small().weak());
                        ui.separator();

                        let mut color = shape.color;
                        ui.horizontal(|ui| {
                            ui.label("Colour:");
                            for candidate in [PipeColor::Existing, PipeColor::New] {
                                ui.radio_value(&mut color, candidate, candidate.label());
                            }
                        });
                        if color != shape.color {
                            self.editor.set_selected_color(color);
                        }
                        let mut flipped = shape.flipped;
                        if ui.checkbox(&mut flipped, "Flipped").changed() {
                            self.editor.toggle_selected_flipped();
                        }

                        ui.separator();
                        egui::Grid::new("shape_property_grid")
                            .num_columns(2)
                            .striped(true)
                            .show(ui, |ui| {
                                for field in property_fields(&shape) {
                                    ui.label(&field.caption);
                                    let mut value = field.value.clone();
                                    if ui.text_edit_singleline(&mut value).changed() {
                                        self.editor.set_selected_property(&field.key, &value);
                                    }
                                    ui.end_row();
                                }
                            });
                    }
                    None => {
                        ui.label("Nothing selected");
                        ui.label(
                            egui::RichText::new("Use the Select tool or Label mode to pick a fitting.")
                                .weak(),
                        );
                    }
                }

                ui.add_space(12.0);
                ui.collapsing("Settings", |ui| {
                    egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                        ui.label("Socket scale");
                        ui.add(egui::DragValue::new(&mut self.settings.socket_scale).speed(0.01).range(0.2..=5.0));
                        ui.end_row();
                        ui.label("Elbow scale");
                        ui.add(egui::DragValue::new(&mut self.settings.elbow_scale).speed(0.01).range(0.2..=5.0));
                        ui.end_row();
                        ui.label("PNG scale");
                        ui.add(egui::DragValue::new(&mut self.settings.png_scale).speed(0.05).range(0.25..=8.0));
                        ui.end_row();
                        ui.label("PNG margin");
                        ui.add(egui::DragValue::new(&mut self.settings.png_margin).speed(1.0).range(0.0..=500.0));
                        ui.end_row();
                    });
                });
            });
    }

    /// Renders the status line: last editor message, file message and drawing statistics.
    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(self.editor.status());
            if let Some(message) = &self.file.last_message {
                ui.separator();
                ui.label(message);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let document = self.editor.document();
                ui.label(format!(
                    "{} nodes, {} shapes",
                    document.nodes().len(),
                    document.shapes().len()
                ));
                ui.separator();
                let mode = match self.editor.mode() {
                    Mode::Drawing => self.editor.tool().label(),
                    Mode::Label => "Label",
                };
                ui.label(mode);
            });
        });
    }
}
