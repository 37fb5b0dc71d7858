//! Main application entry point (native).

#[cfg(feature = "native")]
fn main() {
    env_logger::init();
    log::info!("Starting Easel");

    let config = match std::env::var_os("EASEL_CONFIG") {
        Some(path) => match easel_core::EditorConfig::load(std::path::Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(2);
            }
        },
        None => easel_core::EditorConfig::default(),
    };

    if let Err(e) = pollster::block_on(easel_app::App::run(config)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
