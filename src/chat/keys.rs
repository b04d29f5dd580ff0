//! Enter-key handling for the line editor.
//!
//! The editor owns the line being typed; [`EnterKeyHandler`] mirrors it into
//! an [`InputBox`] on every Enter and lets the box decide between submitting
//! and inserting a line break.

use std::sync::{Mutex, PoisonError};

use rustyline::{
    Cmd, ConditionalEventHandler, Editor, Event, EventContext, EventHandler, Helper, KeyCode,
    KeyEvent, Modifiers, RepeatCount, history::History,
};

use crate::input::{InputBox, KeyAction, KeyPress};

/// Classify an editor key. Shift or Alt held with Enter both count as
/// Shift+Enter, since many terminals only report one of them.
pub fn key_press(key: &KeyEvent) -> KeyPress {
    match key {
        KeyEvent(KeyCode::Enter, mods) => KeyPress::Enter {
            shift: mods.intersects(Modifiers::SHIFT | Modifiers::ALT),
        },
        _ => KeyPress::Other,
    }
}

/// Routes Enter through an [`InputBox`].
#[derive(Debug, Default)]
pub struct EnterKeyHandler {
    input: Mutex<InputBox>,
}

impl EnterKeyHandler {
    /// Creates a handler with an empty box.
    pub fn new() -> Self {
        Self::default()
    }

    /// The editor command for `key` pressed while the editor holds `line`,
    /// or `None` to fall back to the editor's own binding.
    pub fn command_for(&self, key: &KeyEvent, line: &str) -> Option<Cmd> {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        input.set_value(line);
        match input.on_key(key_press(key)) {
            KeyAction::Submit => {
                input.take_prompt();
                Some(Cmd::AcceptLine)
            }
            KeyAction::InsertNewline => {
                tracing::debug!(
                    height = input.height(),
                    scrolling = input.is_scrollable(),
                    "input grew"
                );
                Some(Cmd::Newline)
            }
            KeyAction::None => None,
        }
    }
}

impl ConditionalEventHandler for EnterKeyHandler {
    fn handle(
        &self,
        evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext,
    ) -> Option<Cmd> {
        let key = evt.get(0)?;
        self.command_for(key, ctx.line())
    }
}

/// Bind Enter, Shift+Enter and Alt+Enter on `editor` to an [`EnterKeyHandler`].
pub fn bind_enter_keys<H: Helper, I: History>(editor: &mut Editor<H, I>) {
    for mods in [Modifiers::NONE, Modifiers::SHIFT, Modifiers::ALT] {
        let handler = EventHandler::Conditional(Box::new(EnterKeyHandler::new()));
        editor.bind_sequence(KeyEvent(KeyCode::Enter, mods), handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LINE_HEIGHT;

    fn enter(mods: Modifiers) -> KeyEvent {
        KeyEvent(KeyCode::Enter, mods)
    }

    #[test]
    fn keys_are_classified() {
        assert_eq!(
            key_press(&enter(Modifiers::NONE)),
            KeyPress::Enter { shift: false }
        );
        assert_eq!(
            key_press(&enter(Modifiers::SHIFT)),
            KeyPress::Enter { shift: true }
        );
        assert_eq!(
            key_press(&enter(Modifiers::ALT)),
            KeyPress::Enter { shift: true }
        );
        assert_eq!(
            key_press(&KeyEvent(KeyCode::Char('a'), Modifiers::NONE)),
            KeyPress::Other
        );
    }

    #[test]
    fn enter_accepts_the_line() {
        let handler = EnterKeyHandler::new();
        assert_eq!(
            handler.command_for(&enter(Modifiers::NONE), "hello"),
            Some(Cmd::AcceptLine)
        );
        let input = handler.input.lock().unwrap();
        assert_eq!(input.value(), "");
        assert_eq!(input.height(), LINE_HEIGHT);
    }

    #[test]
    fn shift_enter_inserts_a_line_break() {
        let handler = EnterKeyHandler::new();
        assert_eq!(
            handler.command_for(&enter(Modifiers::SHIFT), "one\ntwo"),
            Some(Cmd::Newline)
        );
        let input = handler.input.lock().unwrap();
        assert_eq!(input.value(), "one\ntwo\n");
        assert_eq!(input.height(), 3 * LINE_HEIGHT);
    }

    #[test]
    fn other_keys_fall_back_to_the_editor() {
        let handler = EnterKeyHandler::new();
        let key = KeyEvent(KeyCode::Tab, Modifiers::NONE);
        assert_eq!(handler.command_for(&key, "x"), None);
    }
}
