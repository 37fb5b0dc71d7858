//! WebAssembly entry point.

use easel_core::EditorConfig;
use wasm_bindgen::prelude::*;

/// Read `video=<url>` from the page's query string or hash.
fn video_url_param() -> Option<String> {
    let location = web_sys::window()?.location();
    [location.search().ok(), location.hash().ok()]
        .into_iter()
        .flatten()
        .find_map(|s| parse_video_param(&s))
}

fn parse_video_param(s: &str) -> Option<String> {
    s.trim_start_matches(['?', '#'])
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == "video" && !value.is_empty())
        .and_then(|(_, value)| js_sys::decode_uri_component(value).ok())
        .and_then(|value| value.as_string())
}

/// Initialize and run the WASM application.
#[wasm_bindgen(start)]
pub async fn run_wasm() {
    console_error_panic_hook::set_once();

    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("Failed to initialize logger: {e}").into());
    }

    log::info!("Starting Easel (WASM)");

    let mut config = EditorConfig::default();
    if let Some(url) = video_url_param() {
        log::info!("Video from URL: {}", url);
        config.video_url = url;
    }

    if let Err(e) = crate::App::run(config).await {
        log::error!("{}", e);
    }
}
