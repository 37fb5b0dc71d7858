//! Easel Application
//!
//! Window, GPU surface, control panel and platform media for the Easel
//! canvas editor.

mod app;
mod media;
mod ui;

pub use app::{App, AppConfig, AppError};
pub use ui::{PanelAction, UiState, render_ui};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::run_wasm;
