use clap::Parser;
use env_logger::Env;

mod archive;
mod engine;
mod env;
mod manifest;
mod networking;
mod process;
mod storage;
mod ui;
mod updater;
mod util;

#[derive(Parser, Debug)]
#[command(
    name = "Karanten Launcher",
    author,
    version,
    about = "Downloads the latest Karanten build and starts the game"
)]
struct Cli {
    /// Print launcher version and exit without starting the UI.
    #[arg(long)]
    version_only: bool,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("Karanten Launcher {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_icon(app_icon())
            .with_decorations(false)
            .with_resizable(false)
            .with_maximize_button(false)
            .with_inner_size(eframe::egui::vec2(800.0, 420.0)),
        ..Default::default()
    };
    eframe::run_native(
        "Karanten Launcher",
        options,
        Box::new(|cc| Ok(Box::new(ui::LauncherApp::new(cc)))),
    )
}

fn app_icon() -> eframe::egui::IconData {
    // Simple 2x2 icon: dark background with a cyan accent.
    let rgba: Vec<u8> = vec![
        20, 24, 32, 255, 30, 196, 220, 255, //
        20, 24, 32, 255, 20, 150, 180, 255,
    ];
    eframe::egui::IconData {
        rgba,
        width: 2,
        height: 2,
    }
}
