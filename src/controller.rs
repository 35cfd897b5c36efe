//! Pin/unpin state machine and the bookkeeping between hook, locator,
//! z-order control, and markers.
//!
//! Everything here runs on the UI thread. The hook thread only feeds
//! the click channel; `tick` drains it, so registry mutation never
//! races with event delivery.

use crate::hook::{DefaultHookBackend, HookBackend, HookEvent};
use crate::locator::{DefaultWindowLocator, WindowHandle, WindowLocator};
use crate::marker::{DefaultMarkerFactory, MarkerFactory};
use crate::registry::{PinRegistry, PinnedEntry};
use crate::zorder::{DefaultZOrderController, ZOrderController};
use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Idle,
    /// Hook installed, waiting for exactly one click.
    Arming,
}

/// User-visible outcome of a pin or unpin attempt. Rendered as a
/// toast by the GUI; none of these ever aborts the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoWindowAtPoint,
    SelfTargeted,
    NoValidWindow,
    NothingPinned,
    PinFailed(String),
    UnpinFailed(String),
    HookFailed(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::PinFailed(_) | Notice::UnpinFailed(_) | Notice::HookFailed(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoWindowAtPoint => write!(f, "No window at the clicked point"),
            Notice::SelfTargeted => write!(f, "Please select a window other than Window Pin"),
            Notice::NoValidWindow => write!(f, "No valid window selected"),
            Notice::NothingPinned => write!(f, "No windows are pinned"),
            Notice::PinFailed(err) => write!(f, "Failed to pin window: {err}"),
            Notice::UnpinFailed(err) => write!(f, "Failed to unpin window: {err}"),
            Notice::HookFailed(err) => write!(f, "Failed to enter pin mode: {err}"),
        }
    }
}

pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Queueing sink: the controller pushes from wherever it runs, the
/// GUI drains once per frame.
#[derive(Default)]
pub struct NoticeBuffer {
    queue: Mutex<Vec<Notice>>,
}

impl NoticeBuffer {
    pub fn drain(&self) -> Vec<Notice> {
        self.queue
            .lock()
            .map(|mut q| std::mem::take(&mut *q))
            .unwrap_or_default()
    }
}

impl NoticeSink for NoticeBuffer {
    fn notify(&self, notice: Notice) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push(notice);
        }
    }
}

pub struct PinController {
    hook: Box<dyn HookBackend>,
    locator: Arc<dyn WindowLocator>,
    zorder: Arc<dyn ZOrderController>,
    markers: Arc<dyn MarkerFactory>,
    sink: Arc<dyn NoticeSink>,
    registry: PinRegistry,
    mode: PinMode,
    clicks: Option<Receiver<HookEvent>>,
    own_window: Option<WindowHandle>,
}

impl PinController {
    pub fn new(sink: Arc<dyn NoticeSink>, marker_size: i32, track_interval_ms: u32) -> Self {
        Self::with_backends(
            Box::new(DefaultHookBackend::default()),
            Arc::new(DefaultWindowLocator),
            Arc::new(DefaultZOrderController),
            Arc::new(DefaultMarkerFactory::new(marker_size, track_interval_ms)),
            sink,
        )
    }

    pub fn with_backends(
        hook: Box<dyn HookBackend>,
        locator: Arc<dyn WindowLocator>,
        zorder: Arc<dyn ZOrderController>,
        markers: Arc<dyn MarkerFactory>,
        sink: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            hook,
            locator,
            zorder,
            markers,
            sink,
            registry: PinRegistry::default(),
            mode: PinMode::Idle,
            clicks: None,
            own_window: None,
        }
    }

    /// Identify the application's own window so it can never pin
    /// itself.
    pub fn set_own_window(&mut self, window: WindowHandle) {
        self.own_window = Some(window);
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }

    pub fn pinned_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pinned_windows(&self) -> Vec<WindowHandle> {
        self.registry.windows()
    }

    /// The "pin window" trigger: arms when idle, cancels when armed.
    pub fn toggle_pin_mode(&mut self) {
        match self.mode {
            PinMode::Idle => self.arm(),
            PinMode::Arming => {
                tracing::info!("pin mode cancelled");
                self.disarm();
            }
        }
    }

    fn arm(&mut self) {
        let (tx, rx) = mpsc::channel();
        if let Err(err) = self.hook.install(tx) {
            tracing::error!(?err, "failed to install pointer hook");
            self.sink.notify(Notice::HookFailed(err.to_string()));
            self.mode = PinMode::Idle;
            return;
        }
        self.clicks = Some(rx);
        self.mode = PinMode::Arming;
        tracing::info!("pin mode armed, waiting for a click");
    }

    fn disarm(&mut self) {
        if let Err(err) = self.hook.uninstall() {
            tracing::error!(?err, "failed to uninstall pointer hook");
        }
        self.clicks = None;
        self.mode = PinMode::Idle;
    }

    /// One UI-thread step: consume a pending click when armed, then
    /// track every marker against its target window.
    pub fn tick(&mut self) {
        if self.mode == PinMode::Arming {
            let event = self.clicks.as_ref().and_then(|rx| rx.try_recv().ok());
            if let Some(event) = event {
                // Disarm before resolving anything: a double-click
                // queues two events, but the receiver dies here and
                // only the first can ever act.
                self.disarm();
                match event {
                    HookEvent::PrimaryButtonDown { x, y } => self.handle_click(x, y),
                    HookEvent::HookLost => {
                        self.sink.notify(Notice::HookFailed(
                            "pointer hook stopped unexpectedly".into(),
                        ));
                    }
                }
            }
        }

        self.sync_markers();
    }

    fn handle_click(&mut self, x: i32, y: i32) {
        let Some(root) = self.locator.root_window_at(x, y) else {
            self.sink.notify(Notice::NoWindowAtPoint);
            return;
        };
        if self.own_window == Some(root) {
            self.sink.notify(Notice::SelfTargeted);
            return;
        }
        // A missing or blank title usually means a shell surface or
        // tooltip rather than a real application window.
        let titled = self
            .locator
            .window_title(root)
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if !titled {
            self.sink.notify(Notice::NoValidWindow);
            return;
        }
        if self.registry.contains(root) {
            tracing::debug!(window = root.0, "window already pinned");
            return;
        }
        let Some(rect) = self.locator.window_rect(root) else {
            self.sink
                .notify(Notice::PinFailed("window disappeared".into()));
            return;
        };
        if let Err(err) = self.zorder.set_topmost(root, true) {
            self.sink.notify(Notice::PinFailed(err.to_string()));
            return;
        }
        let marker = self.markers.create(rect.left, rect.top);
        if let Err(mut entry) = self.registry.insert(PinnedEntry { window: root, marker }) {
            entry.marker.destroy();
            return;
        }
        tracing::info!(window = root.0, "window pinned");
    }

    /// The "unpin" trigger: release the most recently pinned window.
    pub fn unpin_last(&mut self) {
        let Some(mut entry) = self.registry.pop() else {
            self.sink.notify(Notice::NothingPinned);
            return;
        };
        entry.marker.destroy();
        if let Err(err) = self.zorder.set_topmost(entry.window, false) {
            // The entry stays removed: a window that no longer exists
            // cannot be un-pinned, and must not block cleanup.
            self.sink.notify(Notice::UnpinFailed(err.to_string()));
        }
        tracing::info!(window = entry.window.0, "window unpinned");
    }

    fn sync_markers(&mut self) {
        let mut lost = Vec::new();
        for entry in self.registry.entries_mut() {
            match self.locator.window_rect(entry.window) {
                Some(rect) => entry.marker.set_position(rect.left, rect.top),
                None => lost.push(entry.window),
            }
        }
        for window in lost {
            if let Some(mut entry) = self.registry.remove(window) {
                entry.marker.destroy();
                if let Err(err) = self.zorder.set_topmost(window, false) {
                    tracing::debug!(?err, window = window.0, "lost target not restored");
                }
                tracing::warn!(window = window.0, "pinned window disappeared, marker removed");
            }
        }
    }

    /// Restore every remaining pinned window and drop all markers.
    /// Runs from `Drop` too, so exiting without manual unpins leaves
    /// nothing stuck topmost. One failing entry never stops the rest.
    pub fn shutdown(&mut self) {
        if self.mode == PinMode::Arming {
            self.disarm();
        }
        for mut entry in self.registry.drain() {
            entry.marker.destroy();
            if let Err(err) = self.zorder.set_topmost(entry.window, false) {
                tracing::warn!(?err, window = entry.window.0, "cleanup failed for window");
            }
        }
    }
}

impl Drop for PinController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
