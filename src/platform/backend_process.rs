// StockSync - platform/backend_process.rs
//
// Lifetime of the bundled backend executable. The app starts it on launch
// and, on exit, asks it to stop over HTTP before killing the process tree.

use crate::util::error::HostError;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// A running backend child process.
#[derive(Debug)]
pub struct BackendProcess {
    child: Option<Child>,
    program: PathBuf,
}

impl BackendProcess {
    /// Start `program` with all stdio discarded.
    pub fn spawn(program: &Path) -> Result<Self, HostError> {
        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        if let Some(dir) = program.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| HostError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
        tracing::info!(program = %program.display(), pid = child.id(), "Backend process started");

        Ok(Self {
            child: Some(child),
            program: program.to_path_buf(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Kill the backend and everything it started. Safe to call twice.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();

        #[cfg(target_os = "windows")]
        {
            // The backend may have spawned workers; /t takes the whole tree.
            let status = Command::new("taskkill")
                .args(["/pid", &pid.to_string(), "/f", "/t"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if let Err(e) = status {
                tracing::warn!(pid, error = %e, "taskkill failed; killing backend directly");
                let _ = child.kill();
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Err(e) = child.kill() {
                // InvalidInput means it already exited.
                tracing::debug!(pid, error = %e, "Backend kill returned an error");
            }
        }

        match child.wait() {
            Ok(status) => tracing::info!(
                program = %self.program.display(),
                pid,
                %status,
                "Backend process stopped"
            ),
            Err(e) => tracing::warn!(
                program = %self.program.display(),
                pid,
                error = %e,
                "Could not reap backend process"
            ),
        }
    }
}

impl Drop for BackendProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_missing_program_is_spawn_error() {
        let err = BackendProcess::spawn(Path::new("/definitely/not/here/backend-app")).unwrap_err();
        assert!(matches!(err, HostError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_is_idempotent() {
        let mut proc = BackendProcess::spawn(Path::new("/bin/sleep")).unwrap();
        assert!(proc.pid().is_some());
        proc.terminate();
        assert!(proc.pid().is_none());
        proc.terminate();
    }
}
