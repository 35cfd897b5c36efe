//! System-wide pointer-button listener.
//!
//! The low-level mouse hook is a process-wide resource, so dispatch
//! state lives in a single `OnceCell` owned by this module and the
//! backend enforces an explicit install/uninstall lifecycle.
//! Installing while a hook is active is a no-op.

use anyhow::anyhow;
use std::sync::mpsc::Sender;
#[cfg(windows)]
use std::sync::atomic::AtomicBool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Event forwarded from the hook thread to the UI thread. The hook
/// procedure itself never performs window management; it only
/// enqueues one of these.
#[derive(Debug, Clone, Copy)]
pub enum HookEvent {
    /// Primary button pressed at a screen coordinate.
    PrimaryButtonDown { x: i32, y: i32 },
    /// The hook thread's message loop died. Surfaced so an armed
    /// controller can disarm instead of silently waiting forever.
    HookLost,
}

pub trait HookBackend: Send {
    fn install(&mut self, sender: Sender<HookEvent>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

#[cfg(windows)]
struct HookThread {
    thread_id: u32,
    join: std::thread::JoinHandle<()>,
}

#[cfg(windows)]
#[derive(Default)]
pub struct DefaultHookBackend {
    hook_thread: Option<HookThread>,
}

#[cfg(windows)]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, sender: Sender<HookEvent>) -> anyhow::Result<()> {
        if self.hook_thread.is_some() {
            return Ok(());
        }

        // Put the sender where the hook proc can see it.
        hook_dispatch().set_sender(Some(sender));
        hook_dispatch().set_enabled(true);

        use std::time::Duration;
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::Win32::System::Threading::GetCurrentThreadId;
        use windows::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
            UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_MOUSE_LL,
        };

        // Handshake so install() only returns once the hook thread is
        // actually receiving events, and fails fast when it is not.
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<u32>>(1);

        let join = std::thread::spawn(move || {
            // Ensure the thread has a message queue before anyone
            // posts WM_QUIT at it.
            let mut msg = MSG::default();
            unsafe {
                let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
            }

            let thread_id = unsafe { GetCurrentThreadId() };

            let hmodule = match unsafe { GetModuleHandleW(None) } {
                Ok(h) => h,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow!(e)));
                    return;
                }
            };

            let hook = match unsafe {
                SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
            } {
                Ok(h) if !h.0.is_null() => h,
                Ok(_) => {
                    let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                    return;
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow!(e)));
                    return;
                }
            };

            let _ = ready_tx.send(Ok(thread_id));

            // Message loop keeps WH_MOUSE_LL callbacks flowing.
            loop {
                let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                if r.0 == 0 {
                    // WM_QUIT
                    break;
                }
                if r.0 == -1 {
                    tracing::error!("pointer hook message loop failed, hook is dead");
                    hook_dispatch().send(HookEvent::HookLost);
                    break;
                }
                unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }

            unsafe {
                let _ = UnhookWindowsHookEx(hook);
            }
        });

        let thread_id = match ready_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                hook_dispatch().set_enabled(false);
                hook_dispatch().set_sender(None);
                let _ = join.join();
                return Err(e);
            }
            Err(_) => {
                hook_dispatch().set_enabled(false);
                hook_dispatch().set_sender(None);
                return Err(anyhow!("hook thread did not signal readiness"));
            }
        };

        self.hook_thread = Some(HookThread { thread_id, join });
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        // Stop dispatch first: once the sender is gone no click can be
        // delivered, even one racing with the quit message below.
        hook_dispatch().set_enabled(false);
        hook_dispatch().set_sender(None);

        if let Some(th) = self.hook_thread.take() {
            use windows::Win32::Foundation::{LPARAM, WPARAM};
            use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
            unsafe {
                let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            let _ = th.join.join();
        }

        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.hook_thread.is_some()
    }
}

#[cfg(not(windows))]
#[derive(Default)]
pub struct DefaultHookBackend;

#[cfg(not(windows))]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, _sender: Sender<HookEvent>) -> anyhow::Result<()> {
        Err(anyhow!("pointer hooks are not supported on this platform"))
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

#[cfg(windows)]
struct HookDispatch {
    enabled: AtomicBool,
    sender: Mutex<Option<Sender<HookEvent>>>,
}

#[cfg(windows)]
impl HookDispatch {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn set_sender(&self, sender: Option<Sender<HookEvent>>) {
        if let Ok(mut guard) = self.sender.lock() {
            *guard = sender;
        }
    }

    fn send(&self, event: HookEvent) {
        if let Ok(guard) = self.sender.try_lock() {
            if let Some(sender) = guard.as_ref() {
                let _ = sender.send(event);
            }
        }
    }
}

#[cfg(windows)]
static HOOK_DISPATCH: once_cell::sync::OnceCell<HookDispatch> = once_cell::sync::OnceCell::new();

#[cfg(windows)]
fn hook_dispatch() -> &'static HookDispatch {
    HOOK_DISPATCH.get_or_init(|| HookDispatch {
        enabled: AtomicBool::new(false),
        sender: Mutex::new(None),
    })
}

#[cfg(windows)]
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: windows::Win32::Foundation::WPARAM,
    l_param: windows::Win32::Foundation::LPARAM,
) -> windows::Win32::Foundation::LRESULT {
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, HC_ACTION, MSLLHOOKSTRUCT, WM_LBUTTONDOWN,
    };

    if n_code == HC_ACTION as i32 && w_param.0 as u32 == WM_LBUTTONDOWN {
        let dispatch = hook_dispatch();
        if dispatch.enabled.load(Ordering::Acquire) {
            let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
            dispatch.send(HookEvent::PrimaryButtonDown {
                x: info.pt.x,
                y: info.pt.y,
            });
        }
    }

    // The click is observed, never consumed: it still reaches the
    // window being pinned.
    CallNextHookEx(
        windows::Win32::UI::WindowsAndMessaging::HHOOK(std::ptr::null_mut()),
        n_code,
        w_param,
        l_param,
    )
}

#[derive(Clone)]
pub struct MockHookBackend {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    sender: Mutex<Option<Sender<HookEvent>>>,
}

impl MockHookBackend {
    pub fn new() -> (Self, MockHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHookHandle { state },
        )
    }
}

impl HookBackend for MockHookBackend {
    fn install(&mut self, sender: Sender<HookEvent>) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    /// Deliver an event as the hook thread would. Returns `false`
    /// once the hook is uninstalled: nothing is delivered.
    pub fn emit(&self, event: HookEvent) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// A backend whose install always fails, for exercising the
/// failed-install path.
#[derive(Default)]
pub struct FailingHookBackend;

impl HookBackend for FailingHookBackend {
    fn install(&mut self, _sender: Sender<HookEvent>) -> anyhow::Result<()> {
        Err(anyhow!("install refused"))
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}
