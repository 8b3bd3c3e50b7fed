//! Canvas interaction and navigation functionality.
//!
//! Translates egui pointer, wheel and keyboard input into editor events and paints the
//! rendered frame.

use super::rendering::paint_display_list;
use super::state::PipeSketchApp;
use crate::geometry::Point;
use crate::interaction::{Key, Modifiers, PointerButton};
use crate::rendering::{render, RenderOptions};
use crate::viewport::CanvasMetrics;
use eframe::egui;

fn pointer_button(button: egui::PointerButton) -> PointerButton {
    match button {
        egui::PointerButton::Middle => PointerButton::Middle,
        egui::PointerButton::Primary => PointerButton::Primary,
        _ => PointerButton::Secondary,
    }
}

fn editor_key(key: egui::Key) -> Option<Key> {
    Some(match key {
        egui::Key::Space => Key::Space,
        egui::Key::Delete => Key::Delete,
        egui::Key::Backspace => Key::Backspace,
        egui::Key::Escape => Key::Escape,
        egui::Key::Z => Key::Z,
        egui::Key::Y => Key::Y,
        _ => return None,
    })
}

/// Converts a position in egui points to canvas bitmap pixels.
fn canvas_position(metrics: &CanvasMetrics, rect: egui::Rect, pos: egui::Pos2) -> Point {
    metrics.to_bitmap(Point::new(
        (pos.x - rect.min.x) as f64,
        (pos.y - rect.min.y) as f64,
    ))
}

impl PipeSketchApp {
    /// Allocates the canvas, feeds this frame's input to the editor and paints the result.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let pixels_per_point = ui.ctx().pixels_per_point();
        let metrics = CanvasMetrics::from_display(
            rect.width() as f64,
            rect.height() as f64,
            pixels_per_point as f64,
        );

        self.handle_canvas_pointer(ui, rect, &metrics);
        self.handle_canvas_zoom(ui, &response, &metrics);

        let pulse = ui.input(|i| i.time).fract();
        let commands = render(
            &self.editor.scene(),
            metrics.bitmap_size(),
            RenderOptions {
                export: false,
                pulse,
            },
        );
        paint_display_list(&painter, rect, pixels_per_point, &commands);

        if self.editor.snap_indicator().is_some() {
            // keep the snap ring pulsing
            ui.ctx().request_repaint();
        }
    }

    /// Forwards raw pointer events over the canvas to the editor, in arrival order.
    ///
    /// Presses outside the canvas are ignored; motion and releases are forwarded while
    /// an interaction is in progress so drags and pans survive leaving the canvas.
    fn handle_canvas_pointer(&mut self, ui: &egui::Ui, rect: egui::Rect, metrics: &CanvasMetrics) {
        let events = ui.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => {
                    self.editor
                        .pointer_move(canvas_position(metrics, rect, pos));
                }
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    ..
                } if rect.contains(pos) => {
                    let screen = canvas_position(metrics, rect, pos);
                    self.editor.pointer_move(screen);
                    self.editor.pointer_down(screen, pointer_button(button));
                }
                egui::Event::PointerButton { pressed: false, .. } => {
                    self.editor.pointer_up();
                }
                _ => {}
            }
        }
    }

    /// Handles scroll wheel zooming around the cursor, one step per wheel event.
    ///
    /// Only zooms if the cursor is over the canvas.
    fn handle_canvas_zoom(&mut self, ui: &egui::Ui, response: &egui::Response, metrics: &CanvasMetrics) {
        let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
        if scroll_delta == 0.0 {
            return;
        }
        let Some(mouse_pos) = ui.input(|i| i.pointer.hover_pos()) else {
            return;
        };
        if !response.rect.contains(mouse_pos) {
            return;
        }
        let screen = canvas_position(metrics, response.rect, mouse_pos);
        self.editor.wheel(screen, scroll_delta > 0.0);
    }

    /// Forwards editing keys to the editor. Presses are skipped while a text field has
    /// keyboard focus; releases always go through so a held Space cannot get stuck.
    pub fn handle_editor_keys(&mut self, ctx: &egui::Context) {
        let text_focused = ctx.wants_keyboard_input();
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            let egui::Event::Key {
                key,
                pressed,
                repeat,
                modifiers,
                ..
            } = event
            else {
                continue;
            };
            let Some(key) = editor_key(key) else {
                continue;
            };
            if pressed {
                if text_focused || (repeat && key != Key::Space) {
                    continue;
                }
                self.editor.key_down(
                    key,
                    Modifiers {
                        command: modifiers.command || modifiers.ctrl,
                        shift: modifiers.shift,
                    },
                );
            } else {
                self.editor.key_up(key);
            }
        }
    }
}
