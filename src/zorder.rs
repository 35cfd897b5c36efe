//! Z-order band control: moving a window into or out of the topmost
//! band without touching its position or size.

use crate::locator::WindowHandle;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ZOrderError {
    /// The handle no longer refers to a live window. Recoverable:
    /// callers treat the window as already gone.
    #[error("window {0:?} is no longer valid")]
    InvalidHandle(WindowHandle),
    #[error("z-order change failed: {0}")]
    Os(String),
}

pub trait ZOrderController: Send + Sync {
    /// Move `window` into (`true`) or out of (`false`) the topmost
    /// band. Never moves, resizes, or activates the target.
    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> Result<(), ZOrderError>;
}

#[cfg(windows)]
#[derive(Debug, Default)]
pub struct DefaultZOrderController;

#[cfg(windows)]
impl ZOrderController for DefaultZOrderController {
    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> Result<(), ZOrderError> {
        use windows::Win32::UI::WindowsAndMessaging::{
            IsWindow, SetWindowPos, HWND_NOTOPMOST, HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOMOVE,
            SWP_NOSIZE,
        };

        let hwnd = window.as_hwnd();
        if !unsafe { IsWindow(hwnd) }.as_bool() {
            return Err(ZOrderError::InvalidHandle(window));
        }
        let band = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(hwnd, band, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE)
                .map_err(|e| ZOrderError::Os(e.to_string()))
        }
    }
}

#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct DefaultZOrderController;

#[cfg(not(windows))]
impl ZOrderController for DefaultZOrderController {
    fn set_topmost(&self, _window: WindowHandle, _topmost: bool) -> Result<(), ZOrderError> {
        Err(ZOrderError::Os(
            "z-order control is not supported on this platform".into(),
        ))
    }
}

/// Records every call and tracks which windows are currently topmost;
/// individual handles can be made to fail with `InvalidHandle`.
#[derive(Default)]
pub struct MockZOrderController {
    calls: Mutex<Vec<(WindowHandle, bool)>>,
    topmost: Mutex<HashSet<WindowHandle>>,
    failing: Mutex<HashSet<WindowHandle>>,
}

impl MockZOrderController {
    pub fn fail_for(&self, window: WindowHandle) {
        if let Ok(mut guard) = self.failing.lock() {
            guard.insert(window);
        }
    }

    pub fn calls(&self) -> Vec<(WindowHandle, bool)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn is_topmost(&self, window: WindowHandle) -> bool {
        self.topmost
            .lock()
            .map(|t| t.contains(&window))
            .unwrap_or(false)
    }
}

impl ZOrderController for MockZOrderController {
    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> Result<(), ZOrderError> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((window, topmost));
        }
        if self.failing.lock().map(|f| f.contains(&window)).unwrap_or(false) {
            return Err(ZOrderError::InvalidHandle(window));
        }
        if let Ok(mut guard) = self.topmost.lock() {
            if topmost {
                guard.insert(window);
            } else {
                guard.remove(&window);
            }
        }
        Ok(())
    }
}
