//! Syntax highlighting for fenced code blocks.

use std::sync::OnceLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntectTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

use crate::theme::Theme;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

const ANSI_RESET: &str = "\x1b[0m";

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "InspiredGitHub",
        Theme::Dark => "base16-ocean.dark",
    }
}

/// Highlights code into 24-bit ANSI escapes for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    theme: Theme,
}

impl Highlighter {
    /// Creates a highlighter for `theme`.
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// The theme colors are taken from.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch to another theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Highlight `code` as `lang`.
    ///
    /// Code with no language, or a language the syntax set does not know, is
    /// returned unchanged.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let Some(syntax) = lang.and_then(find_syntax) else {
            return code.to_string();
        };
        let Some(theme) = self.syntect_theme() else {
            return code.to_string();
        };

        let ss = syntax_set();
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut out = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, ss) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false)),
                Err(err) => {
                    tracing::debug!(error = %err, "highlighting failed; emitting plain code");
                    return code.to_string();
                }
            }
        }
        out.push_str(ANSI_RESET);
        out
    }

    fn syntect_theme(&self) -> Option<&'static SyntectTheme> {
        let themes = &theme_set().themes;
        themes
            .get(theme_name(self.theme))
            .or_else(|| themes.values().next())
    }
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let lang = lang.trim();
    if lang.is_empty() {
        return None;
    }
    let ss = syntax_set();
    ss.find_syntax_by_token(lang)
        .or_else(|| ss.find_syntax_by_name(lang))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_is_unchanged() {
        let highlighter = Highlighter::new(Theme::Dark);
        let code = "some <code> here\n";
        assert_eq!(highlighter.highlight(code, Some("no-such-language")), code);
        assert_eq!(highlighter.highlight(code, None), code);
        assert_eq!(highlighter.highlight(code, Some("  ")), code);
    }

    #[test]
    fn known_language_gets_escapes() {
        let highlighter = Highlighter::new(Theme::Dark);
        assert!(find_syntax("rust").is_some());
        let out = highlighter.highlight("fn main() {}\n", Some("rust"));
        assert!(out.contains("\x1b[38;2;"));
        assert!(out.contains("main"));
        assert!(out.ends_with(ANSI_RESET));
    }

    #[test]
    fn themes_color_differently() {
        let dark = Highlighter::new(Theme::Dark).highlight("let x = 1;\n", Some("rs"));
        let mut light = Highlighter::new(Theme::Dark);
        light.set_theme(Theme::Light);
        assert_eq!(light.theme(), Theme::Light);
        assert_ne!(dark, light.highlight("let x = 1;\n", Some("rs")));
    }
}
