// StockSync - platform/fs.rs
//
// File-manager integration for saved exports and downloads.

use std::path::Path;

/// Open the system file manager and highlight `path` within it.
///
/// - **Windows**: `explorer.exe /select,"<path>"`
/// - **macOS**: `open -R "<path>"`
/// - **Linux**: `xdg-open "<parent>"` (no portable per-file selection)
///
/// Launch failures are logged at WARN and never propagated.
pub fn reveal_in_file_manager(path: &Path) {
    #[cfg(target_os = "windows")]
    {
        // `/select,<path>` must be a single argument, with no space after the comma.
        let arg = format!("/select,{}", path.display());
        if let Err(e) = std::process::Command::new("explorer").arg(arg).spawn() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to reveal file in Explorer");
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Err(e) = std::process::Command::new("open").arg("-R").arg(path).spawn() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to reveal file in Finder");
        }
    }
    #[cfg(target_os = "linux")]
    {
        let parent = path.parent().unwrap_or(path);
        if let Err(e) = std::process::Command::new("xdg-open").arg(parent).spawn() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open folder in file manager");
        }
    }
}
