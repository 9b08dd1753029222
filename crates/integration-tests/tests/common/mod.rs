//! Fake scanner installation shared by the end-to-end tests

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use discscan_core::domain::ScannerLayout;
use tempfile::TempDir;

pub struct Installation {
    dir: TempDir,
    pub layout: ScannerLayout,
}

impl Installation {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = ScannerLayout::new(dir.path());
        Self { dir, layout }
    }

    /// Install a fake scanner; the body runs with the install dir as cwd
    pub fn with_scanner(body: &str) -> Self {
        let installation = Self::new();
        let exe = installation.layout.executable();
        let script = format!(
            "#!/bin/sh\nout=_internal/scan_output\nmkdir -p \"$out\"\nlog=\"$out/log.txt\"\n{}\n",
            body
        );
        std::fs::write(&exe, script).unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        installation
    }

    pub fn write_previous_log(&self, content: &str) {
        std::fs::create_dir_all(self.layout.output_dir()).unwrap();
        std::fs::write(self.layout.log_file(), content).unwrap();
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

