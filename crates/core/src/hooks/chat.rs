//! Chat entry points
//!
//! The game layer calls these from its chat hooks. Commands are queued and
//! run on the next frame; incoming lines are checked against the chat
//! filter on the spot, and pass through whenever the toolbox is busy.

use gwtb_host::ChatHooks;

use crate::overlay;

/// Hooks handed to [`gwtb_host::GameApi::install_chat_hooks`]
pub fn chat_hooks() -> ChatHooks {
    ChatHooks {
        on_command: on_chat_command,
        on_message: on_chat_message,
    }
}

fn on_chat_command(line: &str) {
    if let Some(overlay) = overlay::current() {
        overlay.on_chat_command(line);
    }
}

fn on_chat_message(text: &str) -> bool {
    overlay::current().is_some_and(|overlay| overlay.on_chat_message(text))
}
