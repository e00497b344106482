use crate::engine::models::Manifest;

// The central source of truth for the UI.
#[derive(Clone, Debug)]
pub enum AppState {
    Initialising,
    Reconciling,
    /// Informational push of the staged manifest before downloads begin.
    ManifestStaged {
        manifest: Manifest,
    },
    Downloading {
        file: String,
        /// Fraction in `0.0..=1.0`.
        progress: f32,
        speed: String,
    },
    Extracting {
        file: String,
    },
    Ready {
        manifest: Manifest,
    },
    Playing,
    /// The game process exited; the launcher should close.
    GameExited,
    Error(String),
}

// Actions triggered by the user from the UI layer.
#[derive(Clone, Copy, Debug)]
pub enum UserAction {
    LaunchGame,
    CheckForUpdates,
}
