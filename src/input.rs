//! The message input box.
//!
//! Tracks the text being composed, its displayed height, and whether it
//! currently accepts input. Height is measured in layout units of
//! [`LINE_HEIGHT`] per line and stops growing at [`MAX_INPUT_HEIGHT`], past
//! which the box scrolls.

/// Height of one line of input.
pub const LINE_HEIGHT: u16 = 22;

/// Height the box never grows beyond.
pub const MAX_INPUT_HEIGHT: u16 = 132;

/// A key press relevant to the input box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    /// Enter, with or without Shift held.
    Enter {
        /// Whether Shift was held.
        shift: bool,
    },
    /// Any other key.
    Other,
}

/// What the input box wants done after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Submit the current value.
    Submit,
    /// A line break was inserted into the value.
    InsertNewline,
    /// Nothing to do.
    None,
}

/// State of the input box.
#[derive(Debug, Clone)]
pub struct InputBox {
    value: String,
    initial_height: u16,
    height: u16,
    scrollable: bool,
    enabled: bool,
    focused: bool,
}

impl InputBox {
    /// Creates an empty, enabled, focused box one line tall.
    pub fn new() -> Self {
        Self {
            value: String::new(),
            initial_height: LINE_HEIGHT,
            height: LINE_HEIGHT,
            scrollable: false,
            enabled: true,
            focused: true,
        }
    }

    /// The text currently in the box.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the text and recompute the height.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.on_input();
    }

    /// Current height in layout units.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Whether the content overflows and the box scrolls.
    pub fn is_scrollable(&self) -> bool {
        self.scrollable
    }

    /// Recompute the height from the content.
    pub fn on_input(&mut self) {
        let lines = self.value.split('\n').count().max(1);
        let content = u16::try_from(lines)
            .unwrap_or(u16::MAX)
            .saturating_mul(LINE_HEIGHT);
        if content > MAX_INPUT_HEIGHT {
            self.height = MAX_INPUT_HEIGHT;
            self.scrollable = true;
        } else {
            self.height = content.max(self.initial_height);
            self.scrollable = false;
        }
    }

    /// Handle a key press. Enter submits; Shift+Enter inserts a line break.
    pub fn on_key(&mut self, key: KeyPress) -> KeyAction {
        match key {
            KeyPress::Enter { shift: false } => KeyAction::Submit,
            KeyPress::Enter { shift: true } => {
                self.value.push('\n');
                self.on_input();
                KeyAction::InsertNewline
            }
            KeyPress::Other => KeyAction::None,
        }
    }

    /// The value with `\r\n` normalized to `\n`, without clearing it.
    pub fn prompt(&self) -> String {
        self.value.replace("\r\n", "\n")
    }

    /// Take the normalized value out of the box, resetting it to empty at
    /// its initial height.
    pub fn take_prompt(&mut self) -> String {
        let prompt = self.prompt();
        self.value.clear();
        self.reset_height();
        prompt
    }

    /// Shrink back to the initial height.
    pub fn reset_height(&mut self) {
        self.height = self.initial_height;
        self.scrollable = false;
    }

    /// Whether the box accepts input.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop accepting input.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.focused = false;
    }

    /// Accept input again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Whether the box has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Give the box focus if it is enabled.
    pub fn focus(&mut self) {
        self.focused = self.enabled;
    }
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_tracks_content() {
        let mut input = InputBox::new();
        assert_eq!(input.height(), LINE_HEIGHT);

        input.set_value("one\ntwo\nthree");
        assert_eq!(input.height(), 3 * LINE_HEIGHT);
        assert!(!input.is_scrollable());
    }

    #[test]
    fn height_caps_at_maximum() {
        let mut input = InputBox::new();
        input.set_value("1\n2\n3\n4\n5\n6");
        assert_eq!(input.height(), MAX_INPUT_HEIGHT);
        assert!(!input.is_scrollable());

        input.set_value("1\n2\n3\n4\n5\n6\n7");
        assert_eq!(input.height(), MAX_INPUT_HEIGHT);
        assert!(input.is_scrollable());
    }

    #[test]
    fn enter_submits_shift_enter_inserts_newline() {
        let mut input = InputBox::new();
        input.set_value("hello");
        assert_eq!(input.on_key(KeyPress::Enter { shift: false }), KeyAction::Submit);
        assert_eq!(input.value(), "hello");

        assert_eq!(
            input.on_key(KeyPress::Enter { shift: true }),
            KeyAction::InsertNewline
        );
        assert_eq!(input.value(), "hello\n");
        assert_eq!(input.height(), 2 * LINE_HEIGHT);
        assert_eq!(input.on_key(KeyPress::Other), KeyAction::None);
    }

    #[test]
    fn take_prompt_normalizes_and_resets() {
        let mut input = InputBox::new();
        input.set_value("a\r\nb\r\nc");
        assert_eq!(input.take_prompt(), "a\nb\nc");
        assert_eq!(input.value(), "");
        assert_eq!(input.height(), LINE_HEIGHT);
    }

    #[test]
    fn disabled_box_cannot_take_focus() {
        let mut input = InputBox::new();
        input.disable();
        assert!(!input.is_enabled());
        input.focus();
        assert!(!input.is_focused());

        input.enable();
        input.focus();
        assert!(input.is_enabled());
        assert!(input.is_focused());
    }
}
