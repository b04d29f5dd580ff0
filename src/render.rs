//! Output rendering for the chat client.
//!
//! A [`Renderer`] is the view the request lifecycle drives: it owns the
//! region the in-flight reply occupies, replaces that region's content on
//! every render pass, and shows a cursor marker while the reply is streaming.

use std::io::{self, Stdout, Write};

use console::measure_text_width;

use crate::theme::Theme;

/// ANSI escape code for bold text (used for labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for green text (assistant label on dark backgrounds).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for blue text (assistant label on light backgrounds).
const ANSI_BLUE: &str = "\x1b[34m";

/// Clear from the cursor to the end of the screen.
const ANSI_CLEAR_DOWN: &str = "\x1b[0J";

/// Marker shown after the reply while it is still streaming.
pub const CURSOR_MARKER: &str = "▌";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - In-place redraw on an ANSI terminal
/// - Plain output for pipes and dumb terminals
/// - In-memory capture for embedding and tests
pub trait Renderer: Send {
    /// Append the user's message to the transcript.
    fn print_user(&mut self, text: &str);

    /// Open a new reply region showing only the cursor marker.
    fn start_response(&mut self);

    /// Replace the reply region's content with `rendered` and re-append the
    /// cursor marker.
    fn replace_response(&mut self, rendered: &str);

    /// Remove the cursor marker; the reply region keeps its content.
    fn finish_response(&mut self);

    /// Replace the reply region's content with `message`, dropping the
    /// cursor marker.
    fn fail_response(&mut self, message: &str);

    /// Bring the end of the transcript into view.
    fn scroll_to_bottom(&mut self) {}

    /// Print an error message outside the transcript.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Restyle for a new theme.
    fn set_theme(&mut self, theme: Theme) {
        _ = theme;
    }
}

/// Renderer that redraws the reply in place on an ANSI terminal.
///
/// The reply region is tracked as the number of terminal rows it occupies;
/// each render pass moves the cursor back to the region's first row, clears
/// to the end of the screen, and prints the new content. The region never
/// grows past the screen: leading lines that would not fit are printed once
/// into scrollback and left out of later passes.
pub struct TerminalRenderer {
    stdout: Stdout,
    theme: Theme,
    content: String,
    drawn_rows: usize,
    committed_lines: usize,
    active: bool,
}

impl TerminalRenderer {
    /// Creates a terminal renderer for `theme`.
    pub fn new(theme: Theme) -> Self {
        Self {
            stdout: io::stdout(),
            theme,
            content: String::new(),
            drawn_rows: 0,
            committed_lines: 0,
            active: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label_color(&self) -> &'static str {
        match self.theme {
            Theme::Dark => ANSI_GREEN,
            Theme::Light => ANSI_BLUE,
        }
    }

    /// Move back to the first row of the reply region and clear it.
    fn erase_region(&mut self) {
        if self.drawn_rows == 0 {
            return;
        }
        let (_, screen_rows) = terminal_size();
        // Only a single line taller than the screen reaches the clamp.
        let up = (self.drawn_rows - 1).min(screen_rows.saturating_sub(1));
        print!("\r");
        if up > 0 {
            print!("\x1b[{up}A");
        }
        print!("{ANSI_CLEAR_DOWN}");
        self.drawn_rows = 0;
    }

    fn draw(&mut self, text: &str) {
        let (columns, screen_rows) = terminal_size();
        let max_rows = screen_rows.saturating_sub(1).max(1);
        let plan = plan_redraw(text, self.committed_lines, columns, max_rows);
        for line in &plan.commit {
            println!("{line}");
        }
        self.committed_lines += plan.commit.len();
        print!("{}", plan.live);
        self.drawn_rows = count_rows(&plan.live, columns);
        self.flush();
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl Renderer for TerminalRenderer {
    fn print_user(&mut self, _text: &str) {
        // The line editor has already echoed the prompt.
    }

    fn start_response(&mut self) {
        let color = self.label_color();
        println!("{ANSI_BOLD}{color}Assistant:{ANSI_RESET}");
        self.content.clear();
        self.drawn_rows = 0;
        self.committed_lines = 0;
        self.active = true;
        self.draw(CURSOR_MARKER);
    }

    fn replace_response(&mut self, rendered: &str) {
        self.erase_region();
        self.content = rendered.to_string();
        let text = format!("{rendered}{ANSI_RESET}{CURSOR_MARKER}");
        self.draw(&text);
    }

    fn finish_response(&mut self) {
        if !self.active {
            return;
        }
        self.erase_region();
        let content = std::mem::take(&mut self.content);
        let (columns, _) = terminal_size();
        let plan = plan_redraw(&content, self.committed_lines, columns, usize::MAX);
        println!("{}{ANSI_RESET}", plan.live);
        self.committed_lines = 0;
        self.active = false;
        self.flush();
    }

    fn fail_response(&mut self, message: &str) {
        self.erase_region();
        self.content.clear();
        self.committed_lines = 0;
        println!("{ANSI_RED}{message}{ANSI_RESET}");
        self.active = false;
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}

/// Renderer for output without cursor control.
///
/// Render passes are kept in memory and the final reply is printed once, so
/// piped output carries each reply exactly one time.
pub struct PlainTextRenderer {
    stdout: Stdout,
    content: String,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            content: String::new(),
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_user(&mut self, _text: &str) {}

    fn start_response(&mut self) {
        self.content.clear();
    }

    fn replace_response(&mut self, rendered: &str) {
        self.content = rendered.to_string();
    }

    fn finish_response(&mut self) {
        let content = std::mem::take(&mut self.content);
        println!("{content}");
        self.flush();
    }

    fn fail_response(&mut self, message: &str) {
        self.content.clear();
        println!("{message}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("Error: {error}");
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person at the keyboard.
    User,
    /// The remote endpoint.
    Assistant,
}

/// One message in a captured transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Author of the message.
    pub role: Role,
    /// Rendered content of the message.
    pub text: String,
}

/// Renderer that captures the transcript in memory.
#[derive(Debug, Default)]
pub struct BufferRenderer {
    entries: Vec<TranscriptEntry>,
    cursor_visible: bool,
    render_passes: usize,
    scrolls: usize,
    info: Vec<String>,
    errors: Vec<String>,
    theme: Option<Theme>,
}

impl BufferRenderer {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// All transcript entries, oldest first.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Content of the most recent reply region, if one was opened.
    pub fn last_response(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.role == Role::Assistant)
            .map(|entry| entry.text.as_str())
    }

    /// Whether the cursor marker is currently shown.
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Number of times the reply content was replaced.
    pub fn render_passes(&self) -> usize {
        self.render_passes
    }

    /// Number of scroll-to-bottom requests.
    pub fn scroll_count(&self) -> usize {
        self.scrolls
    }

    /// Informational messages, in order.
    pub fn info(&self) -> &[String] {
        &self.info
    }

    /// Error messages, in order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The last theme applied, if any.
    pub fn theme(&self) -> Option<Theme> {
        self.theme
    }

    fn response_mut(&mut self) -> Option<&mut TranscriptEntry> {
        self.entries
            .iter_mut()
            .rev()
            .find(|entry| entry.role == Role::Assistant)
    }
}

impl Renderer for BufferRenderer {
    fn print_user(&mut self, text: &str) {
        self.entries.push(TranscriptEntry {
            role: Role::User,
            text: text.to_string(),
        });
    }

    fn start_response(&mut self) {
        self.entries.push(TranscriptEntry {
            role: Role::Assistant,
            text: String::new(),
        });
        self.cursor_visible = true;
    }

    fn replace_response(&mut self, rendered: &str) {
        if let Some(entry) = self.response_mut() {
            entry.text = rendered.to_string();
        }
        self.render_passes += 1;
        self.cursor_visible = true;
    }

    fn finish_response(&mut self) {
        self.cursor_visible = false;
    }

    fn fail_response(&mut self, message: &str) {
        if let Some(entry) = self.response_mut() {
            entry.text = message.to_string();
        }
        self.cursor_visible = false;
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolls += 1;
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = Some(theme);
    }
}

/// Terminal size as `(columns, rows)`, with a conventional fallback.
fn terminal_size() -> (usize, usize) {
    match crossterm::terminal::size() {
        Ok((columns, rows)) if columns > 0 && rows > 0 => (columns as usize, rows as usize),
        _ => (80, 24),
    }
}

/// Number of terminal rows `text` occupies at the given width.
fn count_rows(text: &str, columns: usize) -> usize {
    text.split('\n').map(|line| line_rows(line, columns)).sum()
}

fn line_rows(line: &str, columns: usize) -> usize {
    measure_text_width(line).div_ceil(columns.max(1)).max(1)
}

/// One render pass, split between scrollback and the live region.
#[derive(Debug, PartialEq, Eq)]
struct Redraw<'a> {
    /// Lines printed once above the live region and never redrawn.
    commit: Vec<&'a str>,
    /// Content of the live region.
    live: String,
}

/// Split `text` so the live region fits in `max_rows` rows.
///
/// The first `committed` lines are already in scrollback and are skipped.
/// The last line always stays live.
fn plan_redraw(text: &str, committed: usize, columns: usize, max_rows: usize) -> Redraw<'_> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut tail = &lines[committed.min(lines.len())..];
    let mut rows: usize = tail.iter().map(|line| line_rows(line, columns)).sum();
    let mut commit = Vec::new();
    while rows > max_rows && tail.len() > 1 {
        rows -= line_rows(tail[0], columns);
        commit.push(tail[0]);
        tail = &tail[1..];
    }
    Redraw {
        commit,
        live: tail.join("\n"),
    }
}
