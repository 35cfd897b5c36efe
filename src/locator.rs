//! Point-to-window resolution and the pure window queries the rest of
//! the system relies on. Everything here is read-only with respect to
//! the window manager.

#[cfg(windows)]
use windows::Win32::Foundation::HWND;

/// Opaque identifier for a top-level window. The underlying window is
/// owned by some other process and may disappear at any time; every
/// query on a `WindowHandle` returns `Option`/`Result` accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

#[cfg(windows)]
impl WindowHandle {
    pub(crate) fn from_hwnd(hwnd: HWND) -> Self {
        Self(hwnd.0 as isize)
    }

    pub(crate) fn as_hwnd(self) -> HWND {
        HWND(self.0 as *mut core::ffi::c_void)
    }
}

/// Screen rectangle of a window, in virtual-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

pub trait WindowLocator: Send + Sync {
    /// Resolve the top-level window occupying a screen point, walking
    /// child windows up to their root. `None` when nothing is there.
    fn root_window_at(&self, x: i32, y: i32) -> Option<WindowHandle>;

    /// Title bar text of a window. `None` for dead handles and
    /// windows with a zero-length title.
    fn window_title(&self, window: WindowHandle) -> Option<String>;

    /// Current screen rectangle. `None` once the window is gone.
    fn window_rect(&self, window: WindowHandle) -> Option<WindowRect>;
}

#[cfg(windows)]
#[derive(Debug, Default)]
pub struct DefaultWindowLocator;

#[cfg(windows)]
impl WindowLocator for DefaultWindowLocator {
    fn root_window_at(&self, x: i32, y: i32) -> Option<WindowHandle> {
        use windows::Win32::Foundation::POINT;
        use windows::Win32::UI::WindowsAndMessaging::{GetAncestor, WindowFromPoint, GA_ROOT};

        let hit = unsafe { WindowFromPoint(POINT { x, y }) };
        if hit.0.is_null() {
            return None;
        }
        // A click usually lands on a child control; GA_ROOT stops at
        // the top-level window without crossing into the desktop.
        let root = unsafe { GetAncestor(hit, GA_ROOT) };
        if root.0.is_null() {
            None
        } else {
            Some(WindowHandle::from_hwnd(root))
        }
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        use windows::Win32::UI::WindowsAndMessaging::{GetWindowTextLengthW, GetWindowTextW};

        let hwnd = window.as_hwnd();
        let len = unsafe { GetWindowTextLengthW(hwnd) };
        if len <= 0 {
            return None;
        }
        let mut buf = vec![0u16; len as usize + 1];
        let read = unsafe { GetWindowTextW(hwnd, &mut buf) };
        if read <= 0 {
            return None;
        }
        buf.truncate(read as usize);
        String::from_utf16(&buf).ok()
    }

    fn window_rect(&self, window: WindowHandle) -> Option<WindowRect> {
        use windows::Win32::Foundation::RECT;
        use windows::Win32::UI::WindowsAndMessaging::GetWindowRect;

        let mut rect = RECT::default();
        if unsafe { GetWindowRect(window.as_hwnd(), &mut rect).is_ok() } {
            Some(WindowRect {
                left: rect.left,
                top: rect.top,
                right: rect.right,
                bottom: rect.bottom,
            })
        } else {
            None
        }
    }
}

#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct DefaultWindowLocator;

#[cfg(not(windows))]
impl WindowLocator for DefaultWindowLocator {
    fn root_window_at(&self, _x: i32, _y: i32) -> Option<WindowHandle> {
        None
    }

    fn window_title(&self, _window: WindowHandle) -> Option<String> {
        None
    }

    fn window_rect(&self, _window: WindowHandle) -> Option<WindowRect> {
        None
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct MockWindow {
    title: String,
    rect: WindowRect,
}

/// Scriptable locator for tests: a table of live windows plus the
/// handle currently "under the cursor".
#[derive(Default)]
pub struct MockWindowLocator {
    windows: Mutex<HashMap<WindowHandle, MockWindow>>,
    at_point: Mutex<Option<WindowHandle>>,
}

impl MockWindowLocator {
    pub fn add_window(&self, window: WindowHandle, title: &str, rect: WindowRect) {
        if let Ok(mut guard) = self.windows.lock() {
            guard.insert(
                window,
                MockWindow {
                    title: title.to_string(),
                    rect,
                },
            );
        }
    }

    /// Simulate the window being closed by its owner.
    pub fn close_window(&self, window: WindowHandle) {
        if let Ok(mut guard) = self.windows.lock() {
            guard.remove(&window);
        }
    }

    pub fn set_window_at_point(&self, window: Option<WindowHandle>) {
        if let Ok(mut guard) = self.at_point.lock() {
            *guard = window;
        }
    }

    pub fn move_window(&self, window: WindowHandle, left: i32, top: i32) {
        if let Ok(mut guard) = self.windows.lock() {
            if let Some(entry) = guard.get_mut(&window) {
                let width = entry.rect.right - entry.rect.left;
                let height = entry.rect.bottom - entry.rect.top;
                entry.rect = WindowRect {
                    left,
                    top,
                    right: left + width,
                    bottom: top + height,
                };
            }
        }
    }
}

impl WindowLocator for MockWindowLocator {
    fn root_window_at(&self, _x: i32, _y: i32) -> Option<WindowHandle> {
        let at = self.at_point.lock().ok().and_then(|guard| *guard)?;
        let windows = self.windows.lock().ok()?;
        windows.contains_key(&at).then_some(at)
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        let windows = self.windows.lock().ok()?;
        let title = windows.get(&window).map(|w| w.title.clone())?;
        (!title.is_empty()).then_some(title)
    }

    fn window_rect(&self, window: WindowHandle) -> Option<WindowRect> {
        let windows = self.windows.lock().ok()?;
        windows.get(&window).map(|w| w.rect)
    }
}
