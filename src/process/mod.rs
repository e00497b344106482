use std::process::{Child, Command, Stdio};

use log::{debug, info, warn};

use crate::env;

#[derive(Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Spawn the game process: the extracted executable, with the boot data
    /// file as its single argument and the app directory as working
    /// directory. Returns the child handle so the caller can wait for exit.
    pub fn launch(&self) -> Result<Child, String> {
        let base_dir = env::default_app_dir();
        let executable = env::game_executable_path();
        let boot_data = env::boot_data_path();

        if !executable.exists() {
            warn!("launch: game not found at {}", executable.display());
            return Err(format!(
                "game executable not found at {}",
                executable.display()
            ));
        }

        info!("launch: starting {}", executable.display());
        debug!(
            "launch: cwd={} boot_data={}",
            base_dir.display(),
            boot_data.display()
        );

        let mut cmd = Command::new(&executable);
        cmd.arg(&boot_data);
        cmd.current_dir(&base_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW | DETACHED_PROCESS
            cmd.creation_flags(0x08000000 | 0x00000008);
        }

        let child = cmd
            .spawn()
            .map_err(|e| format!("failed to start game process: {e}"))?;
        info!("launch: process started (pid {})", child.id());
        Ok(child)
    }
}
