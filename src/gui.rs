use crate::controller::{Notice, NoticeBuffer, NoticeSink, PinController, PinMode};
use crate::settings::Settings;
use crate::win_util;
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct PinApp {
    controller: PinController,
    notices: Arc<NoticeBuffer>,
    toasts: Toasts,
    settings: Settings,
    own_window_set: bool,
    ignore_toggle_until: Option<Instant>,
}

impl PinApp {
    pub fn new(settings: Settings) -> Self {
        let notices = Arc::new(NoticeBuffer::default());
        let sink: Arc<dyn NoticeSink> = notices.clone();
        let controller = PinController::new(
            sink,
            settings.marker_size,
            settings.track_interval_ms as u32,
        );
        Self {
            controller,
            notices,
            toasts: Toasts::new().anchor(egui::Align2::RIGHT_TOP, [10.0, 10.0]),
            settings,
            own_window_set: false,
            ignore_toggle_until: None,
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        tracing::warn!(%notice, "notice");
        if self.settings.enable_toasts {
            self.toasts.add(Toast {
                text: notice.to_string().into(),
                kind: if notice.is_error() {
                    ToastKind::Error
                } else {
                    ToastKind::Warning
                },
                options: ToastOptions::default()
                    .duration_in_seconds(self.settings.toast_duration as f64),
            });
        }
    }
}

impl eframe::App for PinApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if !self.own_window_set {
            if let Some(own) = win_util::own_window_handle(frame) {
                self.controller.set_own_window(own);
                self.own_window_set = true;
            }
        }

        // The update loop is the UI thread: pending clicks and marker
        // tracking are both handled here.
        self.controller.tick();

        for notice in self.notices.drain() {
            if notice == Notice::SelfTargeted {
                // The press that landed on this window already left
                // pin mode; swallow the matching button release so it
                // does not immediately re-arm.
                self.ignore_toggle_until = Some(Instant::now() + Duration::from_millis(400));
            }
            self.show_notice(&notice);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("📌 Window Pin");
            ui.add_space(8.0);

            let pin_label = match self.controller.mode() {
                PinMode::Idle => "Pin Window",
                PinMode::Arming => "Cancel Pinning",
            };
            if ui.button(pin_label).clicked() {
                let suppressed = self
                    .ignore_toggle_until
                    .map(|until| Instant::now() < until)
                    .unwrap_or(false);
                if !suppressed {
                    self.controller.toggle_pin_mode();
                }
            }
            if ui.button("Unpin Window").clicked() {
                self.controller.unpin_last();
            }

            ui.add_space(8.0);
            match self.controller.mode() {
                PinMode::Arming => {
                    ui.label("Click any window to pin it on top.");
                }
                PinMode::Idle => {
                    ui.label(format!("Pinned windows: {}", self.controller.pinned_count()));
                }
            }
        });

        self.toasts.show(ctx);

        // Keep ticking at the tracking cadence even when no input
        // arrives, so markers follow their windows.
        ctx.request_repaint_after(Duration::from_millis(self.settings.track_interval_ms));
    }
}
