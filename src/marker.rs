//! Floating pushpin marker glued to a pinned window's origin.
//!
//! The default backend owns a small layered window on a dedicated
//! thread. The window is click-through and never activates, so it is
//! purely cosmetic. Positions are published into a shared snapshot by
//! the controller (on the UI thread) and applied by the window's own
//! timer, which also re-asserts the topmost band each tick.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub trait MarkerOverlay: Send {
    /// Publish a new screen origin for the overlay.
    fn set_position(&mut self, x: i32, y: i32);

    /// Tear the overlay down. Idempotent; blocks until the window is
    /// gone so no stale marker outlives its registry entry.
    fn destroy(&mut self);
}

pub trait MarkerFactory: Send + Sync {
    fn create(&self, x: i32, y: i32) -> Box<dyn MarkerOverlay>;
}

#[cfg(windows)]
struct MarkerShared {
    pos: Mutex<(i32, i32)>,
    size: i32,
}

#[cfg(windows)]
pub struct GdiMarker {
    shared: Arc<MarkerShared>,
    hwnd: Arc<Mutex<Option<isize>>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(windows)]
impl GdiMarker {
    fn spawn(x: i32, y: i32, size: i32, interval_ms: u32) -> Self {
        let shared = Arc::new(MarkerShared {
            pos: Mutex::new((x, y)),
            size,
        });
        let hwnd_store: Arc<Mutex<Option<isize>>> = Arc::new(Mutex::new(None));

        // Wait for the window to exist (or fail) before returning, so
        // destroy() always has something to post WM_CLOSE at.
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<()>(1);

        let thread_shared = Arc::clone(&shared);
        let thread_store = Arc::clone(&hwnd_store);
        let thread = std::thread::spawn(move || {
            marker_window_thread(thread_shared, thread_store, x, y, interval_ms, ready_tx);
        });

        let _ = ready_rx.recv_timeout(std::time::Duration::from_secs(2));

        Self {
            shared,
            hwnd: hwnd_store,
            thread: Some(thread),
        }
    }
}

#[cfg(windows)]
impl MarkerOverlay for GdiMarker {
    fn set_position(&mut self, x: i32, y: i32) {
        if let Ok(mut pos) = self.shared.pos.lock() {
            *pos = (x, y);
        }
    }

    fn destroy(&mut self) {
        if let Ok(store) = self.hwnd.lock() {
            if let Some(hwnd) = *store {
                unsafe {
                    let _ = windows::Win32::UI::WindowsAndMessaging::PostMessageW(
                        windows::Win32::Foundation::HWND(hwnd as *mut _),
                        windows::Win32::UI::WindowsAndMessaging::WM_CLOSE,
                        windows::Win32::Foundation::WPARAM(0),
                        windows::Win32::Foundation::LPARAM(0),
                    );
                }
            }
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(windows)]
fn marker_window_thread(
    shared: Arc<MarkerShared>,
    hwnd_store: Arc<Mutex<Option<isize>>>,
    x: i32,
    y: i32,
    interval_ms: u32,
    ready_tx: std::sync::mpsc::SyncSender<()>,
) {
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreatePen, CreateSolidBrush, DeleteObject, Ellipse, EndPaint, FillRect,
        GetStockObject, LineTo, MoveToEx, SelectObject, BLACK_BRUSH, HBRUSH, PAINTSTRUCT,
        PS_SOLID,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, GetWindowLongPtrW,
        KillTimer, PostQuitMessage, RegisterClassW, SetLayeredWindowAttributes, SetTimer,
        SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage, GWLP_USERDATA, HMENU,
        HWND_TOPMOST, LWA_COLORKEY, MSG, SWP_NOACTIVATE, SWP_NOSIZE, SW_SHOWNA, WM_DESTROY,
        WM_PAINT, WM_TIMER, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
        WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
    };

    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let state_ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA);
        if state_ptr != 0 {
            let shared = &*(state_ptr as *const MarkerShared);
            if msg == WM_TIMER {
                let (x, y) = shared.pos.lock().map(|p| *p).unwrap_or((0, 0));
                // Re-assert the topmost band every tick so the marker
                // stays above the window it decorates.
                let _ = SetWindowPos(
                    hwnd,
                    HWND_TOPMOST,
                    x,
                    y,
                    0,
                    0,
                    SWP_NOSIZE | SWP_NOACTIVATE,
                );
                return LRESULT(0);
            }
            if msg == WM_PAINT {
                let mut paint = PAINTSTRUCT::default();
                let hdc = BeginPaint(hwnd, &mut paint);
                FillRect(hdc, &paint.rcPaint, HBRUSH(GetStockObject(BLACK_BRUSH).0));

                let s = shared.size;
                // Pushpin glyph: round head with a needle below it.
                let head = CreateSolidBrush(COLORREF(0x002020e0));
                let old_brush = SelectObject(hdc, head);
                let _ = Ellipse(hdc, s / 4, s / 8, s * 3 / 4, s * 5 / 8);
                SelectObject(hdc, old_brush);
                let _ = DeleteObject(head);

                let needle = CreatePen(PS_SOLID, (s / 16).max(2), COLORREF(0x00c0c0c0));
                let old_pen = SelectObject(hdc, needle);
                let _ = MoveToEx(hdc, s / 2, s * 5 / 8, None);
                let _ = LineTo(hdc, s / 2, s * 15 / 16);
                SelectObject(hdc, old_pen);
                let _ = DeleteObject(needle);

                let _ = EndPaint(hwnd, &paint);
                return LRESULT(0);
            }
        }
        if msg == WM_DESTROY {
            let _ = KillTimer(hwnd, 1);
            PostQuitMessage(0);
        }
        DefWindowProcW(hwnd, msg, wparam, lparam)
    }

    unsafe {
        let class_name = w!("WindowPinMarker");
        let hinstance = GetModuleHandleW(None).unwrap_or_default();
        let wc = WNDCLASSW {
            lpfnWndProc: Some(wndproc),
            hInstance: hinstance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };
        // Fails after the first marker; the class is already there.
        let _ = RegisterClassW(&wc);

        let hwnd = CreateWindowExW(
            WS_EX_LAYERED
                | WS_EX_TRANSPARENT
                | WS_EX_TOPMOST
                | WS_EX_TOOLWINDOW
                | WS_EX_NOACTIVATE,
            wc.lpszClassName,
            PCWSTR::null(),
            WS_POPUP,
            x,
            y,
            shared.size,
            shared.size,
            None,
            HMENU::default(),
            hinstance,
            None,
        )
        .ok();

        let hwnd = match hwnd {
            Some(h) if !h.0.is_null() => h,
            _ => {
                tracing::error!("failed to create marker overlay window");
                let _ = ready_tx.send(());
                return;
            }
        };

        SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*shared as *const _ as isize);
        let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), 0, LWA_COLORKEY);
        let _ = ShowWindow(hwnd, SW_SHOWNA);
        let _ = SetTimer(hwnd, 1, interval_ms, None);
        if let Ok(mut store) = hwnd_store.lock() {
            *store = Some(hwnd.0 as isize);
        }
        let _ = ready_tx.send(());

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).into() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(windows)]
pub struct DefaultMarkerFactory {
    size: i32,
    interval_ms: u32,
}

#[cfg(windows)]
impl DefaultMarkerFactory {
    pub fn new(size: i32, interval_ms: u32) -> Self {
        Self { size, interval_ms }
    }
}

#[cfg(windows)]
impl MarkerFactory for DefaultMarkerFactory {
    fn create(&self, x: i32, y: i32) -> Box<dyn MarkerOverlay> {
        Box::new(GdiMarker::spawn(x, y, self.size, self.interval_ms))
    }
}

#[derive(Default)]
pub struct NoopMarker;

impl MarkerOverlay for NoopMarker {
    fn set_position(&mut self, _x: i32, _y: i32) {}

    fn destroy(&mut self) {}
}

#[cfg(not(windows))]
pub struct DefaultMarkerFactory;

#[cfg(not(windows))]
impl DefaultMarkerFactory {
    pub fn new(_size: i32, _interval_ms: u32) -> Self {
        Self
    }
}

#[cfg(not(windows))]
impl MarkerFactory for DefaultMarkerFactory {
    fn create(&self, _x: i32, _y: i32) -> Box<dyn MarkerOverlay> {
        Box::new(NoopMarker)
    }
}

#[derive(Default)]
struct MockMarkerState {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    positions: Mutex<Vec<(i32, i32)>>,
}

/// Factory handing out recording markers; tests assert on the number
/// of live overlays and the positions they were driven through.
#[derive(Clone, Default)]
pub struct MockMarkerFactory {
    state: Arc<MockMarkerState>,
}

impl MockMarkerFactory {
    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.state.destroyed.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.created() - self.destroyed()
    }

    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.state
            .positions
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl MarkerFactory for MockMarkerFactory {
    fn create(&self, x: i32, y: i32) -> Box<dyn MarkerOverlay> {
        self.state.created.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut positions) = self.state.positions.lock() {
            positions.push((x, y));
        }
        Box::new(MockMarker {
            state: Arc::clone(&self.state),
            destroyed: false,
        })
    }
}

struct MockMarker {
    state: Arc<MockMarkerState>,
    destroyed: bool,
}

impl MarkerOverlay for MockMarker {
    fn set_position(&mut self, x: i32, y: i32) {
        if let Ok(mut positions) = self.state.positions.lock() {
            positions.push((x, y));
        }
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.state.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
