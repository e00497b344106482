use std::env;
use std::fs;
use std::path::PathBuf;

/// Returns the root directory used by the launcher (matches the directory the
/// original launcher kept its downloads in).
pub fn default_app_dir() -> PathBuf {
    let base = match env::consts::OS {
        "windows" => env::var_os("APPDATA").map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Preferences")),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join("karanten")
}

/// Directory both artifact archives are extracted into.
pub fn install_dir() -> PathBuf {
    default_app_dir().join("bin").join("latest")
}

pub fn game_executable_path() -> PathBuf {
    let name = if cfg!(target_os = "windows") {
        "quarantine.exe"
    } else {
        "quarantine"
    };
    install_dir().join(name)
}

pub fn boot_data_path() -> PathBuf {
    install_dir().join("hlboot.dat")
}

/// Create the on-disk folder layout expected by the launcher.
pub fn ensure_base_dirs() -> std::io::Result<()> {
    let folders = [default_app_dir(), install_dir()];
    for dir in folders {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
