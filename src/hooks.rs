use std::path::Path;
use tokio::process::Command;

pub const EXPORT_PATH_VAR: &str = "PAIRSCAN_EXPORT_PATH";
pub const RECORD_COUNT_VAR: &str = "PAIRSCAN_RECORD_COUNT";

/// Hand a finished export to the user's share command
///
/// Runs `command` through `sh -c` in the background with the artifact path and
/// row count in its environment. Failures are logged and never reach the
/// workflow.
pub fn run_export_hook(command: &str, export_path: &Path, record_count: usize) {
    let command = command.to_owned();
    let export_path = export_path.to_path_buf();

    tokio::task::spawn(async move {
        tracing::info!("[export] Running hook: {}", command);

        match Command::new("sh")
            .arg("-c")
            .arg(&command)
            .env(EXPORT_PATH_VAR, &export_path)
            .env(RECORD_COUNT_VAR, record_count.to_string())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        tracing::warn!(
                            "[export] Hook exited with {}: {}",
                            output.status,
                            stderr.trim()
                        );
                    }
                }
                Err(e) => tracing::warn!("[export] Failed to wait on hook: {}", e),
            },
            Err(e) => tracing::warn!("[export] Failed to spawn hook: {}", e),
        }
    });
}
