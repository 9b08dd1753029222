// Reveal the scan artifact in the platform file browser

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use discscan_core::port::{ArtifactRevealer, RevealError};

pub struct SystemRevealer;

/// Program and arguments that open a file browser at `path`
pub(crate) fn reveal_command(path: &Path) -> (&'static str, Vec<OsString>) {
    if cfg!(target_os = "windows") {
        let mut select = OsString::from("/select,");
        select.push(path.as_os_str());
        ("explorer", vec![select])
    } else if cfg!(target_os = "macos") {
        ("open", vec![OsString::from("-R"), path.as_os_str().to_owned()])
    } else {
        // xdg-open has no "select file" mode; open the containing directory
        let dir = path.parent().unwrap_or(path);
        ("xdg-open", vec![dir.as_os_str().to_owned()])
    }
}

#[async_trait]
impl ArtifactRevealer for SystemRevealer {
    async fn reveal(&self, path: &Path) -> Result<(), RevealError> {
        let (program, args) = reveal_command(path);

        // The file browser outlives the request; it is not waited for
        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RevealError {
                path: path.display().to_string(),
                reason: format!("{program}: {e}"),
            })?;

        info!(path = %path.display(), program, "Revealed scan artifact");
        Ok(())
    }
}
