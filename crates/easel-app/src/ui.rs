//! Control panel built with egui.

use easel_core::{Direction, FontStyle, SerializableColor, TextDefaults, UiAction};
use egui::{Align2, Color32, Context, CornerRadius, Frame, Margin, Stroke, Vec2};

/// Something the panel asks the shell to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// Forward to the input bridge.
    Editor(UiAction),
    /// Open the platform image picker. The picked file comes back as
    /// [`UiAction::ImageFile`].
    PickImage,
}

/// Widget values that persist between frames.
#[derive(Debug, Clone)]
pub struct UiState {
    pub text_value: String,
    pub color: Color32,
    pub font_style: FontStyle,
    /// Last error, shown under the controls.
    pub status: Option<String>,
    pub video_attached: bool,
    pub video_paused: bool,
}

impl UiState {
    /// Start the widgets from the editor's shared text values.
    pub fn from_defaults(defaults: &TextDefaults) -> Self {
        let fill = defaults.fill;
        Self {
            text_value: defaults.content.clone(),
            color: Color32::from_rgba_unmultiplied(fill.r, fill.g, fill.b, fill.a),
            font_style: defaults.font_style,
            status: None,
            video_attached: false,
            video_paused: false,
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::from_defaults(&TextDefaults {
            content: String::new(),
            fill: SerializableColor::black(),
            font_style: FontStyle::Normal,
        })
    }
}

/// Hex form accepted by the color parser.
pub fn color_to_hex(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    SerializableColor::new(r, g, b, a).to_hex()
}

fn panel_frame() -> Frame {
    Frame::new()
        .fill(Color32::from_rgb(255, 255, 255))
        .corner_radius(CornerRadius::same(8))
        .stroke(Stroke::new(1.0, Color32::from_gray(220)))
        .shadow(egui::epaint::Shadow {
            spread: 0,
            blur: 8,
            offset: [0, 2],
            color: Color32::from_black_alpha(15),
        })
        .inner_margin(Margin::same(8))
}

fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.label(
        egui::RichText::new(text)
            .size(10.0)
            .color(Color32::from_gray(120)),
    );
}

/// Draw the control panel and collect what was triggered this frame.
pub fn render_ui(ctx: &Context, ui_state: &mut UiState) -> Vec<PanelAction> {
    let mut actions = Vec::new();

    egui::Area::new(egui::Id::new("controls"))
        .anchor(Align2::RIGHT_TOP, Vec2::new(-12.0, 12.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.set_max_width(220.0);
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(6.0, 6.0);

                    section_label(ui, "Image");
                    ui.horizontal(|ui| {
                        if ui.button("Upload Image…").clicked() {
                            actions.push(PanelAction::PickImage);
                        }
                        if ui.button("Remove Images").clicked() {
                            actions.push(PanelAction::Editor(UiAction::RemoveImages));
                        }
                    });

                    ui.separator();
                    render_text_controls(ui, ui_state, &mut actions);

                    ui.separator();
                    render_video_controls(ui, ui_state, &mut actions);

                    if let Some(status) = &ui_state.status {
                        ui.separator();
                        ui.colored_label(Color32::from_rgb(220, 38, 38), status);
                    }
                });
            });
        });

    actions
}

fn render_text_controls(ui: &mut egui::Ui, ui_state: &mut UiState, actions: &mut Vec<PanelAction>) {
    section_label(ui, "Text");
    let response = ui.add(
        egui::TextEdit::singleline(&mut ui_state.text_value).desired_width(f32::INFINITY),
    );
    if response.changed() {
        actions.push(PanelAction::Editor(UiAction::SetText(ui_state.text_value.clone())));
    }

    ui.horizontal(|ui| {
        if ui.color_edit_button_srgba(&mut ui_state.color).changed() {
            actions.push(PanelAction::Editor(UiAction::SetColor(color_to_hex(ui_state.color))));
        }

        egui::ComboBox::from_id_salt("font_style")
            .selected_text(ui_state.font_style.display_name())
            .show_ui(ui, |ui| {
                for &style in FontStyle::all() {
                    if ui
                        .selectable_value(&mut ui_state.font_style, style, style.display_name())
                        .clicked()
                    {
                        actions.push(PanelAction::Editor(UiAction::SetFontStyle(
                            style.as_str().to_string(),
                        )));
                    }
                }
            });
    });

    ui.horizontal(|ui| {
        if ui.button("Add Text").clicked() {
            actions.push(PanelAction::Editor(UiAction::AddText));
        }
        if ui.button("Remove Text").clicked() {
            actions.push(PanelAction::Editor(UiAction::RemoveText));
        }
    });

    ui.horizontal(|ui| {
        for &direction in Direction::all() {
            if ui.button(direction.symbol()).clicked() {
                actions.push(PanelAction::Editor(UiAction::Move(direction)));
            }
        }
    });
}

fn render_video_controls(ui: &mut egui::Ui, ui_state: &UiState, actions: &mut Vec<PanelAction>) {
    section_label(ui, "Video");
    ui.horizontal(|ui| {
        if ui
            .add_enabled(!ui_state.video_attached, egui::Button::new("Add Video"))
            .clicked()
        {
            actions.push(PanelAction::Editor(UiAction::AddVideo));
        }

        let label = if ui_state.video_attached && !ui_state.video_paused {
            "Pause"
        } else {
            "Play"
        };
        if ui.button(label).clicked() {
            actions.push(PanelAction::Editor(UiAction::TogglePlayback));
        }

        if ui.button("Remove Video").clicked() {
            actions.push(PanelAction::Editor(UiAction::RemoveVideo));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_defaults() {
        let defaults = TextDefaults {
            content: "Editable Text".to_string(),
            fill: SerializableColor::new(255, 0, 0, 255),
            font_style: FontStyle::Bold,
        };
        let state = UiState::from_defaults(&defaults);
        assert_eq!(state.text_value, "Editable Text");
        assert_eq!(state.color, Color32::from_rgb(255, 0, 0));
        assert_eq!(state.font_style, FontStyle::Bold);
        assert!(state.status.is_none());
    }

    #[test]
    fn test_color_hex_parses_back() {
        let hex = color_to_hex(Color32::from_rgb(0, 161, 255));
        let parsed = SerializableColor::parse(&hex).unwrap();
        assert_eq!(parsed, SerializableColor::new(0, 161, 255, 255));
    }

    #[test]
    fn test_empty_frame_emits_nothing() {
        let ctx = Context::default();
        let mut state = UiState::default();
        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = render_ui(ctx, &mut state);
        });
        assert!(actions.is_empty());
    }
}
