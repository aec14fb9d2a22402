//! Input router
//!
//! Decides, per window message, whether the overlay consumes it or the game
//! gets it. Every message has exactly one outcome: [`InputOutcome::Consumed`]
//! or [`InputOutcome::Forward`], never both.
//!
//! Holding the right mouse button hands the mouse to the game camera: while
//! it is down, mouse moves, clicks and wheel bypass the UI and the modules.
//! Button releases always reach every module so nothing is left stuck.

use gwtb_sdk::messages::*;

use crate::modules::{ChatCommands, GameSettings};
use crate::toolbox::Toolbox;
use crate::ui::UiIo;

/// Returned to the host for consumed messages
pub const CONSUMED_RESULT: isize = 1;

/// What happens to a message after routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Handled by the overlay; return this value without forwarding
    Consumed(isize),
    /// Pass to the original window procedure
    Forward,
}

/// Router state carried between messages
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    pub right_mouse_down: bool,
}

fn is_mouse_input(msg: u32) -> bool {
    matches!(
        msg,
        WM_LBUTTONDOWN | WM_LBUTTONDBLCLK | WM_MOUSEMOVE | WM_MOUSEWHEEL
    )
}

fn is_button_release(msg: u32) -> bool {
    matches!(msg, WM_LBUTTONUP | WM_RBUTTONUP)
}

fn is_key_release(msg: u32) -> bool {
    matches!(msg, WM_KEYUP | WM_SYSKEYUP | WM_MBUTTONUP | WM_XBUTTONUP)
}

fn is_keyboard_input(msg: u32) -> bool {
    matches!(
        msg,
        WM_KEYDOWN
            | WM_KEYUP
            | WM_SYSKEYDOWN
            | WM_SYSKEYUP
            | WM_CHAR
            | WM_SYSCHAR
            | WM_IME_CHAR
            | WM_XBUTTONDOWN
            | WM_XBUTTONUP
            | WM_XBUTTONDBLCLK
            | WM_MBUTTONDOWN
            | WM_MBUTTONUP
            | WM_MBUTTONDBLCLK
    )
}

/// Feed a message into the UI input model
fn translate(io: &mut UiIo, msg: &WindowMessage, right_mouse_down: bool) {
    match msg.msg {
        WM_LBUTTONDOWN | WM_LBUTTONDBLCLK => {
            if !right_mouse_down {
                io.mouse_down[0] = true;
            }
        }
        WM_LBUTTONUP => io.mouse_down[0] = false,
        WM_MBUTTONDOWN | WM_MBUTTONDBLCLK => {
            if !right_mouse_down {
                io.set_key_down(vk::MBUTTON as usize, true);
                io.mouse_down[2] = true;
            }
        }
        WM_MBUTTONUP => {
            io.set_key_down(vk::MBUTTON as usize, false);
            io.mouse_down[2] = false;
        }
        WM_MOUSEWHEEL => {
            if !right_mouse_down {
                let steps = if msg.wheel_delta() > 0 { 1.0 } else { -1.0 };
                io.add_mouse_wheel(steps);
            }
        }
        WM_MOUSEMOVE => {
            if !right_mouse_down {
                io.mouse_pos = (msg.x() as f32, msg.y() as f32);
            }
        }
        WM_XBUTTONDOWN | WM_XBUTTONDBLCLK => {
            if !right_mouse_down {
                set_xbutton(io, msg, true);
            }
        }
        WM_XBUTTONUP => set_xbutton(io, msg, false),
        WM_KEYDOWN | WM_SYSKEYDOWN => io.set_key_down(msg.wparam, true),
        WM_KEYUP | WM_SYSKEYUP => io.set_key_down(msg.wparam, false),
        WM_CHAR => {
            if let Ok(c) = u16::try_from(msg.wparam) {
                if c > 0 {
                    io.add_input_character(c);
                }
            }
        }
        _ => {}
    }
}

fn set_xbutton(io: &mut UiIo, msg: &WindowMessage, down: bool) {
    match msg.xbutton() {
        XBUTTON1 => {
            io.set_key_down(vk::XBUTTON1 as usize, down);
            io.mouse_down[3] = down;
        }
        XBUTTON2 => {
            io.set_key_down(vk::XBUTTON2 as usize, down);
            io.mouse_down[4] = down;
        }
        _ => {}
    }
}

/// Alt+Enter toggles fullscreen in the game, which breaks a borderless window
fn blocks_fullscreen_toggle(toolbox: &Toolbox) -> bool {
    let borderless = toolbox
        .modules
        .get::<GameSettings>()
        .map(|settings| settings.borderless_window)
        .unwrap_or(false);
    borderless
        && toolbox.platform.is_async_key_down(vk::MENU)
        && toolbox.platform.is_async_key_down(vk::RETURN)
}

/// Route one message
pub fn route_message(toolbox: &mut Toolbox, msg: WindowMessage) -> InputOutcome {
    if matches!(msg.msg, WM_QUIT | WM_CLOSE) {
        toolbox.save_settings();
        return InputOutcome::Forward;
    }

    match msg.msg {
        WM_RBUTTONDOWN | WM_RBUTTONDBLCLK => toolbox.input.right_mouse_down = true,
        WM_RBUTTONUP => toolbox.input.right_mouse_down = false,
        _ => {}
    }
    let right_mouse_down = toolbox.input.right_mouse_down;

    translate(&mut toolbox.io, &msg, right_mouse_down);

    if is_button_release(msg.msg) {
        toolbox.modules.dispatch_message(&msg, false);
        return InputOutcome::Forward;
    }

    if is_mouse_input(msg.msg) {
        if right_mouse_down {
            return InputOutcome::Forward;
        }
        if toolbox.io.want_capture_mouse {
            return InputOutcome::Consumed(CONSUMED_RESULT);
        }
        if toolbox.modules.dispatch_message(&msg, true) {
            return InputOutcome::Consumed(CONSUMED_RESULT);
        }
        return InputOutcome::Forward;
    }

    if is_keyboard_input(msg.msg) {
        if toolbox.io.want_text_input {
            if is_key_release(msg.msg) {
                toolbox.modules.dispatch_message(&msg, false);
                return InputOutcome::Forward;
            }
            return InputOutcome::Consumed(CONSUMED_RESULT);
        }

        let camera_consumed = toolbox
            .modules
            .get_mut::<ChatCommands>()
            .map(|commands| commands.handle_camera_input(&msg))
            .unwrap_or(false);
        if camera_consumed {
            return InputOutcome::Consumed(CONSUMED_RESULT);
        }

        toolbox.modules.dispatch_message(&msg, false);

        if blocks_fullscreen_toggle(toolbox) {
            return InputOutcome::Consumed(CONSUMED_RESULT);
        }
    }

    InputOutcome::Forward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::tests::Recorder;
    use crate::modules::ModuleOrigin;
    use crate::testing::{calls, fixture};

    fn msg(id: u32) -> WindowMessage {
        WindowMessage::new(id, 0, 0)
    }

    fn recorderd() -> (crate::testing::TestFixture, crate::testing::CallLog) {
        let log = calls();
        let mut fx = fixture();
        fx.toolbox.initialize();
        fx.toolbox
            .modules_mut()
            .register(Box::new(Recorder::new("recorder", &log)), ModuleOrigin::Plugin);
        (fx, log)
    }

    #[test]
    fn test_right_mouse_bypasses_ui() {
        let (mut fx, log) = recorderd();
        let tb = &mut fx.toolbox;

        assert_eq!(route_message(tb, msg(WM_RBUTTONDOWN)), InputOutcome::Forward);
        tb.io.want_capture_mouse = true;
        let moved = WindowMessage::new(WM_MOUSEMOVE, 0, WindowMessage::pack_point(40, 50));
        assert_eq!(route_message(tb, moved), InputOutcome::Forward);
        assert_eq!(route_message(tb, msg(WM_LBUTTONDOWN)), InputOutcome::Forward);

        // Nothing reached the UI model or the modules
        assert_eq!(tb.io.mouse_pos, (-1.0, -1.0));
        assert!(!tb.io.mouse_down[0]);
        assert!(log.lock().is_empty());

        // Button-up still reaches every module
        assert_eq!(route_message(tb, msg(WM_LBUTTONUP)), InputOutcome::Forward);
        assert_eq!(*log.lock(), vec!["recorder:msg0x202"]);
        route_message(tb, msg(WM_RBUTTONUP));
        assert!(!tb.input.right_mouse_down);
    }

    #[test]
    fn test_ui_mouse_capture_consumes() {
        let (mut fx, log) = recorderd();
        let tb = &mut fx.toolbox;
        tb.io.want_capture_mouse = true;

        let moved = WindowMessage::new(WM_MOUSEMOVE, 0, WindowMessage::pack_point(-5, 12));
        assert_eq!(route_message(tb, moved), InputOutcome::Consumed(CONSUMED_RESULT));
        assert_eq!(tb.io.mouse_pos, (-5.0, 12.0));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_module_capture_consumes_mouse() {
        let log = calls();
        let mut fx = fixture();
        fx.toolbox.modules_mut().register(
            Box::new(Recorder {
                captures: true,
                ..Recorder::new("grabby", &log)
            }),
            ModuleOrigin::Plugin,
        );
        fx.toolbox
            .modules_mut()
            .register(Box::new(Recorder::new("after", &log)), ModuleOrigin::Plugin);

        let outcome = route_message(&mut fx.toolbox, msg(WM_LBUTTONDOWN));

        assert_eq!(outcome, InputOutcome::Consumed(CONSUMED_RESULT));
        assert_eq!(*log.lock(), vec!["grabby:msg0x201"]);
    }

    #[test]
    fn test_text_input_consumes_keys_but_delivers_releases() {
        let (mut fx, log) = recorderd();
        let tb = &mut fx.toolbox;
        tb.io.want_text_input = true;

        let down = WindowMessage::new(WM_KEYDOWN, 0x41, 0);
        let up = WindowMessage::new(WM_KEYUP, 0x41, 0);
        let ch = WindowMessage::new(WM_CHAR, 'a' as usize, 0);
        assert_eq!(route_message(tb, down), InputOutcome::Consumed(CONSUMED_RESULT));
        assert_eq!(route_message(tb, ch), InputOutcome::Consumed(CONSUMED_RESULT));
        assert_eq!(route_message(tb, up), InputOutcome::Forward);

        assert_eq!(*log.lock(), vec!["recorder:msg0x101"]);
        assert_eq!(tb.io.input_characters(), &['a' as u16]);
    }

    #[test]
    fn test_keys_reach_every_module() {
        let log = calls();
        let mut fx = fixture();
        for name in ["a", "b"] {
            fx.toolbox.modules_mut().register(
                Box::new(Recorder {
                    captures: true,
                    ..Recorder::new(name, &log)
                }),
                ModuleOrigin::Plugin,
            );
        }

        let outcome = route_message(&mut fx.toolbox, WindowMessage::new(WM_KEYDOWN, 0x42, 0));

        assert_eq!(outcome, InputOutcome::Forward);
        assert_eq!(*log.lock(), vec!["a:msg0x100", "b:msg0x100"]);
        assert!(fx.toolbox.io.is_key_down(0x42));
    }

    #[test]
    fn test_unlocked_camera_swallows_movement() {
        let (mut fx, log) = recorderd();
        let tb = &mut fx.toolbox;
        tb.modules_mut()
            .get_mut::<ChatCommands>()
            .unwrap()
            .execute("/cam unlock");

        let w = WindowMessage::new(WM_KEYDOWN, 0x57, 0);
        assert_eq!(route_message(tb, w), InputOutcome::Consumed(CONSUMED_RESULT));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_alt_enter_blocked_when_borderless() {
        let mut fx = fixture();
        fx.toolbox.initialize();
        fx.platform.hold_async(&[vk::MENU, vk::RETURN]);
        let enter = WindowMessage::new(WM_SYSKEYDOWN, vk::RETURN as usize, 0);

        assert_eq!(route_message(&mut fx.toolbox, enter), InputOutcome::Forward);

        fx.toolbox
            .modules_mut()
            .get_mut::<GameSettings>()
            .unwrap()
            .borderless_window = true;
        assert_eq!(
            route_message(&mut fx.toolbox, enter),
            InputOutcome::Consumed(CONSUMED_RESULT)
        );
    }

    #[test]
    fn test_close_saves_and_forwards() {
        let (mut fx, log) = recorderd();

        assert_eq!(route_message(&mut fx.toolbox, msg(WM_CLOSE)), InputOutcome::Forward);

        assert_eq!(*log.lock(), vec!["recorder:save"]);
        assert!(fx.toolbox.paths().settings_file().exists());
    }
}
