use crate::locator::WindowHandle;

/// Extract this application's own window handle from an eframe
/// [`Frame`](eframe::Frame), so the controller can refuse to pin it.
#[cfg(windows)]
pub fn own_window_handle(frame: &eframe::Frame) -> Option<WindowHandle> {
    use raw_window_handle::{HasWindowHandle, RawWindowHandle};

    frame
        .window_handle()
        .ok()
        .and_then(|wh| match wh.as_raw() {
            RawWindowHandle::Win32(handle) => Some(WindowHandle(handle.hwnd.get() as isize)),
            _ => None,
        })
}

#[cfg(not(windows))]
pub fn own_window_handle(_frame: &eframe::Frame) -> Option<WindowHandle> {
    None
}
