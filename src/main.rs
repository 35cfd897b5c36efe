use window_pin::gui::PinApp;
use window_pin::logging;
use window_pin::settings::{Settings, SETTINGS_FILE};

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    let _log_guard = logging::init(settings.debug_logging);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([260.0, 160.0])
            .with_min_inner_size([220.0, 140.0])
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "Window Pin",
        native_options,
        Box::new(move |_cc| Box::new(PinApp::new(settings))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run UI: {e}"))?;

    Ok(())
}
