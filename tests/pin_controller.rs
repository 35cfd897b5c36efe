use std::sync::Arc;
use window_pin::controller::{Notice, NoticeBuffer, PinController, PinMode};
use window_pin::hook::{FailingHookBackend, HookEvent, MockHookBackend, MockHookHandle};
use window_pin::locator::{MockWindowLocator, WindowHandle, WindowRect};
use window_pin::marker::MockMarkerFactory;
use window_pin::zorder::MockZOrderController;

struct Harness {
    controller: PinController,
    hook: MockHookHandle,
    locator: Arc<MockWindowLocator>,
    zorder: Arc<MockZOrderController>,
    markers: MockMarkerFactory,
    notices: Arc<NoticeBuffer>,
}

fn harness() -> Harness {
    let (backend, hook) = MockHookBackend::new();
    let locator = Arc::new(MockWindowLocator::default());
    let zorder = Arc::new(MockZOrderController::default());
    let markers = MockMarkerFactory::default();
    let notices = Arc::new(NoticeBuffer::default());
    let controller = PinController::with_backends(
        Box::new(backend),
        locator.clone(),
        zorder.clone(),
        Arc::new(markers.clone()),
        notices.clone(),
    );
    Harness {
        controller,
        hook,
        locator,
        zorder,
        markers,
        notices,
    }
}

fn rect_at(left: i32, top: i32) -> WindowRect {
    WindowRect {
        left,
        top,
        right: left + 400,
        bottom: top + 300,
    }
}

/// Arm pin mode and deliver one click over whatever window the mock
/// locator currently reports under the cursor.
fn arm_and_click(h: &mut Harness) {
    h.controller.toggle_pin_mode();
    assert!(h.hook.emit(HookEvent::PrimaryButtonDown { x: 100, y: 100 }));
    h.controller.tick();
}

#[test]
fn pin_and_unpin_round_trip() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(10, 20));
    h.locator.set_window_at_point(Some(a));

    arm_and_click(&mut h);

    assert_eq!(h.controller.mode(), PinMode::Idle);
    assert_eq!(h.controller.pinned_windows(), vec![a]);
    assert!(h.zorder.is_topmost(a));
    assert_eq!(h.markers.live(), 1);
    assert_eq!(h.markers.positions().first(), Some(&(10, 20)));
    assert_eq!(h.hook.uninstall_count(), 1);
    assert!(h.notices.drain().is_empty());

    h.controller.unpin_last();

    assert_eq!(h.controller.pinned_count(), 0);
    assert!(!h.zorder.is_topmost(a));
    assert_eq!(h.markers.live(), 0);
    assert!(h.notices.drain().is_empty());
}

#[test]
fn own_window_is_rejected() {
    let mut h = harness();
    let own = WindowHandle(0x1);
    h.locator.add_window(own, "Window Pin", rect_at(0, 0));
    h.locator.set_window_at_point(Some(own));
    h.controller.set_own_window(own);

    arm_and_click(&mut h);

    assert_eq!(h.notices.drain(), vec![Notice::SelfTargeted]);
    assert_eq!(h.controller.pinned_count(), 0);
    assert!(h.zorder.calls().is_empty());
    assert_eq!(h.controller.mode(), PinMode::Idle);
    assert_eq!(h.hook.uninstall_count(), 1);
}

#[test]
fn click_on_nothing_is_rejected() {
    let mut h = harness();
    h.locator.set_window_at_point(None);

    arm_and_click(&mut h);

    assert_eq!(h.notices.drain(), vec![Notice::NoWindowAtPoint]);
    assert_eq!(h.controller.pinned_count(), 0);
    assert!(h.zorder.calls().is_empty());
    assert_eq!(h.markers.created(), 0);
}

#[test]
fn untitled_window_is_rejected() {
    let mut h = harness();
    let blank = WindowHandle(0x20);
    h.locator.add_window(blank, "   ", rect_at(0, 0));
    h.locator.set_window_at_point(Some(blank));

    arm_and_click(&mut h);

    assert_eq!(h.notices.drain(), vec![Notice::NoValidWindow]);
    assert_eq!(h.controller.pinned_count(), 0);
    assert!(h.zorder.calls().is_empty());
}

#[test]
fn pinning_twice_is_idempotent() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.set_window_at_point(Some(a));

    arm_and_click(&mut h);
    arm_and_click(&mut h);

    assert_eq!(h.controller.pinned_count(), 1);
    assert_eq!(h.zorder.calls(), vec![(a, true)]);
    assert_eq!(h.markers.created(), 1);
    // The duplicate attempt is a silent no-op.
    assert!(h.notices.drain().is_empty());
}

#[test]
fn unpin_is_lifo() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    let b = WindowHandle(0x20);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.add_window(b, "Calculator", rect_at(100, 100));

    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);
    h.locator.set_window_at_point(Some(b));
    arm_and_click(&mut h);

    h.controller.unpin_last();

    assert_eq!(h.controller.pinned_windows(), vec![a]);
    assert!(h.zorder.is_topmost(a));
    assert!(!h.zorder.is_topmost(b));
    assert_eq!(h.markers.live(), 1);
}

#[test]
fn failed_attempts_do_not_disturb_lifo_order() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    let b = WindowHandle(0x20);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.add_window(b, "Calculator", rect_at(100, 100));

    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);
    // A failed attempt between the two successful pins.
    h.locator.set_window_at_point(None);
    arm_and_click(&mut h);
    h.locator.set_window_at_point(Some(b));
    arm_and_click(&mut h);

    h.controller.unpin_last();
    assert_eq!(h.controller.pinned_windows(), vec![a]);
    h.controller.unpin_last();
    assert_eq!(h.controller.pinned_count(), 0);
}

#[test]
fn unpin_with_empty_registry_warns_without_os_calls() {
    let mut h = harness();

    h.controller.unpin_last();

    assert_eq!(h.notices.drain(), vec![Notice::NothingPinned]);
    assert!(h.zorder.calls().is_empty());
}

#[test]
fn unpin_removes_entry_even_when_restore_fails() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);

    // The window dies between pin and unpin.
    h.zorder.fail_for(a);
    h.controller.unpin_last();

    assert_eq!(h.controller.pinned_count(), 0);
    assert_eq!(h.markers.live(), 0);
    let notices = h.notices.drain();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::UnpinFailed(_)));
}

#[test]
fn shutdown_restores_everything_despite_failures() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    let b = WindowHandle(0x20);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.add_window(b, "Calculator", rect_at(100, 100));

    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);
    h.locator.set_window_at_point(Some(b));
    arm_and_click(&mut h);

    h.zorder.fail_for(b);
    h.controller.shutdown();

    assert_eq!(h.controller.pinned_count(), 0);
    assert_eq!(h.markers.live(), 0);
    let calls = h.zorder.calls();
    assert!(calls.contains(&(a, false)));
    assert!(calls.contains(&(b, false)));
}

#[test]
fn dropping_the_controller_unpins_remaining_windows() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);

    let Harness {
        controller,
        zorder,
        markers,
        ..
    } = h;
    drop(controller);

    assert!(!zorder.is_topmost(a));
    assert_eq!(markers.live(), 0);
}

#[test]
fn hook_install_failure_leaves_idle_mode() {
    let locator = Arc::new(MockWindowLocator::default());
    let zorder = Arc::new(MockZOrderController::default());
    let markers = MockMarkerFactory::default();
    let notices = Arc::new(NoticeBuffer::default());
    let mut controller = PinController::with_backends(
        Box::new(FailingHookBackend),
        locator.clone(),
        zorder.clone(),
        Arc::new(markers.clone()),
        notices.clone(),
    );

    controller.toggle_pin_mode();

    assert_eq!(controller.mode(), PinMode::Idle);
    let reported = notices.drain();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], Notice::HookFailed(_)));
}

#[test]
fn double_click_pins_at_most_once() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.set_window_at_point(Some(a));

    h.controller.toggle_pin_mode();
    assert!(h.hook.emit(HookEvent::PrimaryButtonDown { x: 100, y: 100 }));
    assert!(h.hook.emit(HookEvent::PrimaryButtonDown { x: 100, y: 100 }));
    h.controller.tick();
    h.controller.tick();

    assert_eq!(h.controller.pinned_count(), 1);
    assert_eq!(h.zorder.calls(), vec![(a, true)]);
    assert_eq!(h.hook.uninstall_count(), 1);
    // After the disarm nothing can be delivered any more.
    assert!(!h.hook.emit(HookEvent::PrimaryButtonDown { x: 0, y: 0 }));
}

#[test]
fn cancel_disarms_without_side_effects() {
    let mut h = harness();

    h.controller.toggle_pin_mode();
    assert_eq!(h.controller.mode(), PinMode::Arming);
    h.controller.toggle_pin_mode();

    assert_eq!(h.controller.mode(), PinMode::Idle);
    assert_eq!(h.hook.install_count(), 1);
    assert_eq!(h.hook.uninstall_count(), 1);
    assert_eq!(h.controller.pinned_count(), 0);
    assert!(h.notices.drain().is_empty());
}

#[test]
fn marker_follows_a_moving_window() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(10, 20));
    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);

    h.locator.move_window(a, 50, 60);
    h.controller.tick();

    assert_eq!(h.markers.positions().last(), Some(&(50, 60)));
}

#[test]
fn vanished_target_prunes_entry_and_marker() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);

    h.locator.close_window(a);
    h.controller.tick();

    assert_eq!(h.controller.pinned_count(), 0);
    assert_eq!(h.markers.live(), 0);
    // Best-effort restore is still attempted on the dead handle.
    assert!(h.zorder.calls().contains(&(a, false)));
}

#[test]
fn hook_loss_while_armed_reports_and_disarms() {
    let mut h = harness();

    h.controller.toggle_pin_mode();
    assert!(h.hook.emit(HookEvent::HookLost));
    h.controller.tick();

    assert_eq!(h.controller.mode(), PinMode::Idle);
    let reported = h.notices.drain();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], Notice::HookFailed(_)));
}

#[test]
fn registry_never_holds_duplicate_handles() {
    let mut h = harness();
    let a = WindowHandle(0x10);
    let b = WindowHandle(0x20);
    h.locator.add_window(a, "Notepad", rect_at(0, 0));
    h.locator.add_window(b, "Calculator", rect_at(50, 50));

    for target in [a, b, a, b, a] {
        h.locator.set_window_at_point(Some(target));
        arm_and_click(&mut h);
    }
    h.controller.unpin_last();
    h.locator.set_window_at_point(Some(a));
    arm_and_click(&mut h);

    let mut windows = h.controller.pinned_windows();
    windows.sort_by_key(|w| w.0);
    windows.dedup();
    assert_eq!(windows.len(), h.controller.pinned_count());
}
