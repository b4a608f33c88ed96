// StockSync - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing and config loading
// 2. Logging initialisation (debug mode support)
// 3. Async runtime, backend client and backend process startup
// 4. eframe GUI launch
// 5. Backend shutdown once the window closes

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod gui;

// Re-export modules from the library crate so that `gui.rs` can keep using
// `crate::app::...`, `crate::core::...` etc.
pub use stocksync::app;
pub use stocksync::core;
pub use stocksync::platform;
pub use stocksync::ui;
pub use stocksync::util;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::analytics::AnalyticsRegistry;
use crate::core::i18n::Language;
use crate::core::submission::JobProcessor;
use crate::platform::backend::{BackendClient, StockRuptureFetcher};
use crate::platform::backend_process::BackendProcess;
use crate::platform::config::{self, PlatformPaths};
use crate::platform::host::{DesktopHost, HostBridge};
use crate::util::error::StockSyncError;

/// Edge length of the generated window icon.
const ICON_SIZE: u32 = 64;

/// Build the window icon: three ascending bars on a rounded teal tile.
///
/// Drawn at startup with `image` so no asset has to ship next to the binary.
fn app_icon() -> egui::IconData {
    let [r, g, b] = crate::core::export::category_rgb("Test");
    let size = ICON_SIZE as i64;
    let radius = 12i64;
    let img = image::RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let (x, y) = (x as i64, y as i64);
        // Rounded-corner mask.
        let cx = x.clamp(radius, size - 1 - radius);
        let cy = y.clamp(radius, size - 1 - radius);
        if (x - cx).pow(2) + (y - cy).pow(2) > radius * radius {
            return image::Rgba([0, 0, 0, 0]);
        }
        // Bars: columns 14-23, 27-36, 40-49 with rising heights.
        let bar = match x {
            14..=23 => Some(38),
            27..=36 => Some(28),
            40..=49 => Some(16),
            _ => None,
        };
        match bar {
            Some(top) if (top..=50).contains(&y) => image::Rgba([255, 255, 255, 255]),
            _ => image::Rgba([r, g, b, 255]),
        }
    });
    egui::IconData {
        rgba: img.into_raw(),
        width: ICON_SIZE,
        height: ICON_SIZE,
    }
}

/// Configure fonts for the egui context.
///
/// On Windows, Segoe UI and Segoe UI Emoji are loaded from the system font
/// directory and put first in the proportional family. They cover the
/// accented French labels and the module glyphs; the egui built-ins stay
/// as fallbacks. Other platforms keep the egui defaults.
fn configure_fonts(ctx: &egui::Context) {
    #[cfg(target_os = "windows")]
    {
        let mut fonts = egui::FontDefinitions::default();
        let candidates: &[(&str, &str)] = &[
            ("Segoe UI", r"C:\Windows\Fonts\segoeui.ttf"),
            ("Segoe UI Emoji", r"C:\Windows\Fonts\seguiemj.ttf"),
        ];

        let mut loaded: Vec<&str> = Vec::new();
        for (name, path) in candidates {
            match std::fs::read(path) {
                Ok(data) => {
                    fonts
                        .font_data
                        .insert((*name).to_owned(), egui::FontData::from_owned(data).into());
                    loaded.push(name);
                }
                Err(e) => {
                    tracing::warn!(font = name, error = %e, "System font unavailable");
                }
            }
        }

        if !loaded.is_empty() {
            if let Some(proportional) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
                for (i, name) in loaded.iter().enumerate() {
                    proportional.insert(i, (*name).to_owned());
                }
            }
            if let Some(monospace) = fonts.families.get_mut(&egui::FontFamily::Monospace) {
                for name in &loaded {
                    monospace.push((*name).to_owned());
                }
            }
            ctx.set_fonts(fonts);
            tracing::info!(fonts = ?loaded, "System fonts configured");
        }
    }

    #[cfg(not(target_os = "windows"))]
    let _ = ctx;
}

/// StockSync - desktop hub for inventory report processing.
///
/// Submits SAP report exports to the local processing backend, keeps a
/// session history of the results and runs analytics on daily stock reports.
#[derive(Parser, Debug)]
#[command(name = "StockSync", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Backend base URL, overriding `[backend] url`.
    #[arg(short = 'u', long = "backend-url")]
    backend_url: Option<String>,

    /// Do not launch the bundled backend; expect one already running.
    #[arg(long = "no-backend")]
    no_backend: bool,

    /// UI language code (en, fr), overriding `[ui] language`.
    #[arg(short = 'l', long = "language")]
    language: Option<String>,

    /// Directory holding config.toml, overriding the platform default.
    #[arg(short = 'c', long = "config-dir")]
    config_dir: Option<PathBuf>,
}

/// Multi-threaded runtime for backend calls and the update check.
fn build_runtime() -> util::error::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("stocksync-worker")
        .build()
        .map_err(StockSyncError::Runtime)
}

/// Log a startup error and exit.
fn fatal(err: &StockSyncError) -> ! {
    tracing::error!(error = %err, "Startup failed");
    eprintln!("Error: {err}");
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| platform_paths.config_dir.clone());
    let (config, mut warnings) = config::load_config(&config_dir);

    util::logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref().map(Path::new),
    );
    for w in &warnings {
        tracing::warn!(warning = %w, "Configuration warning");
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config_dir = %config_dir.display(),
        "StockSync starting"
    );

    // The runtime outlives the window: background tasks run on it and the
    // backend shutdown request is sent through it after `run_native` returns.
    let runtime = match build_runtime() {
        Ok(rt) => rt,
        Err(e) => fatal(&e),
    };

    let backend_url = cli
        .backend_url
        .clone()
        .unwrap_or_else(|| config.backend_url.clone());
    let client = match BackendClient::new(
        &backend_url,
        Duration::from_secs(config.request_timeout_secs),
    ) {
        Ok(c) => Arc::new(c),
        Err(e) => fatal(&StockSyncError::from(e)),
    };
    tracing::info!(url = client.base_url(), "Backend client ready");

    let mut backend = None;
    if config.backend_autostart && !cli.no_backend {
        let program = config::resolve_app_relative(&config.backend_executable);
        match BackendProcess::spawn(&program) {
            Ok(process) => backend = Some(process),
            Err(e) => {
                tracing::warn!(error = %e, "Backend not started; requests will fail until one is running");
                warnings.push(e.to_string());
            }
        }
    }

    let language = match cli.language.as_deref() {
        Some(code) => Language::parse(code).unwrap_or_else(|| {
            warnings.push(format!("Unknown language '{code}' on the command line; using {}", config.language));
            config.language
        }),
        None => config.language,
    };

    let registry = Arc::new(AnalyticsRegistry::builtin(Arc::new(
        StockRuptureFetcher::new(client.clone()),
    )));
    let host: Arc<dyn HostBridge> = Arc::new(DesktopHost::new(
        config.update_feed_url.clone(),
        config.updater_path.clone(),
    ));
    let processor: Arc<dyn JobProcessor> = client.clone();

    let mut state = app::state::AppState::new(
        registry,
        language,
        config.fanout_policy,
        config.check_updates_on_startup,
        cli.debug,
    );
    state.dark_mode = config.dark_mode;
    state.font_size = config.font_size;
    state.show_warnings = !warnings.is_empty();
    state.warnings = warnings;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(util::constants::APP_NAME)
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_icon(app_icon()),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    let result = eframe::run_native(
        util::constants::APP_NAME,
        native_options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Ok(Box::new(gui::StockSyncApp::new(
                &cc.egui_ctx,
                state,
                handle,
                host,
                processor,
            )))
        }),
    );

    // Ask the backend to exit, then make sure it does.
    if let Err(e) = runtime.block_on(client.shutdown()) {
        tracing::debug!(error = %e, "Backend shutdown request failed");
    }
    if let Some(mut process) = backend {
        process.terminate();
    }
    runtime.shutdown_timeout(Duration::from_secs(2));

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to launch GUI");
        eprintln!("Error: Failed to launch StockSync GUI: {e}");
        std::process::exit(1);
    }
    tracing::info!("StockSync exited");
}
