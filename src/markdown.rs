//! Markdown rendering for the terminal.
//!
//! The whole reply buffer is parsed from scratch on every render. Markdown is
//! not local (a fence opened in one chunk may close in a later one), so a
//! fresh parse of the full source is always correct where diffing would not
//! be. Parsing follows GitHub-flavored markdown (tables, strikethrough, task
//! lists), renders soft breaks as line breaks, and never emits heading ids.

use console::{measure_text_width, strip_ansi_codes};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::highlight::Highlighter;
use crate::theme::Theme;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_UNDERLINE: &str = "\x1b[4m";
const ANSI_STRIKE: &str = "\x1b[9m";
const ANSI_RESET: &str = "\x1b[0m";

const RULE_WIDTH: usize = 40;

/// Whether rendered output carries ANSI escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// Styled output for a color terminal.
    Ansi,
    /// Text only.
    Plain,
}

/// Colors that change with the theme.
#[derive(Debug, Clone, Copy)]
struct Palette {
    heading: &'static str,
    code: &'static str,
    link: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Palette {
                heading: "\x1b[36m",
                code: "\x1b[33m",
                link: "\x1b[34m",
            },
            Theme::Light => Palette {
                heading: "\x1b[34m",
                code: "\x1b[35m",
                link: "\x1b[34m",
            },
        }
    }
}

/// Renders markdown source to terminal text.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    style: RenderStyle,
    highlighter: Highlighter,
}

impl MarkdownRenderer {
    /// Creates a renderer with the given output style and theme.
    pub fn new(style: RenderStyle, theme: Theme) -> Self {
        Self {
            style,
            highlighter: Highlighter::new(theme),
        }
    }

    /// The output style.
    pub fn style(&self) -> RenderStyle {
        self.style
    }

    /// The active theme.
    pub fn theme(&self) -> Theme {
        self.highlighter.theme()
    }

    /// Switch themes for subsequent renders.
    pub fn set_theme(&mut self, theme: Theme) {
        self.highlighter.set_theme(theme);
    }

    /// Render the full markdown `source`.
    ///
    /// Every code block in the output is highlighted again on each call.
    /// Trailing line breaks are trimmed so a caller can append a marker
    /// directly after the last rendered character.
    pub fn render(&self, source: &str) -> String {
        let options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let mut writer = Writer::new(self.style, &self.highlighter);
        for event in Parser::new_ext(source, options) {
            writer.event(event);
        }
        writer.finish()
    }
}

struct CodeBlock {
    lang: Option<String>,
    text: String,
}

#[derive(Default)]
struct Table {
    alignments: Vec<Alignment>,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Option<String>,
}

struct Writer<'a> {
    style: RenderStyle,
    palette: Palette,
    highlighter: &'a Highlighter,
    out: String,
    styles: Vec<&'static str>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    at_line_start: bool,
    item_fresh: bool,
    code: Option<CodeBlock>,
    table: Option<Table>,
    links: Vec<String>,
}

impl<'a> Writer<'a> {
    fn new(style: RenderStyle, highlighter: &'a Highlighter) -> Self {
        Self {
            style,
            palette: Palette::for_theme(highlighter.theme()),
            highlighter,
            out: String::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            at_line_start: true,
            item_fresh: false,
            code: None,
            table: None,
            links: Vec::new(),
        }
    }

    fn ansi(&self) -> bool {
        self.style == RenderStyle::Ansi
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(code) = self.code.as_mut() {
                    code.text.push_str(&text);
                } else {
                    self.text(&text);
                }
            }
            Event::Code(code) => {
                if self.ansi() {
                    self.push_style(self.palette.code);
                    self.text(&code);
                    self.pop_style();
                } else {
                    self.text(&format!("`{code}`"));
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::FootnoteReference(name) => self.text(&format!("[^{name}]")),
            Event::SoftBreak | Event::HardBreak => self.newline(),
            Event::Rule => {
                self.block_break();
                self.text(&"─".repeat(RULE_WIDTH));
                self.newline();
            }
            Event::TaskListMarker(checked) => {
                self.text(if checked { "[x] " } else { "[ ] " });
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.item_fresh {
                    self.block_break();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_break();
                if self.ansi() {
                    self.push_style(ANSI_BOLD);
                    self.push_style(self.palette.heading);
                }
                self.text(&format!("{} ", "#".repeat(level as usize)));
            }
            Tag::BlockQuote { .. } => {
                self.block_break();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string)
                        .filter(|lang| !lang.is_empty()),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeBlock {
                    lang,
                    text: String::new(),
                });
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.ensure_newline();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.ensure_newline();
                let depth = self.lists.len();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.write_quote_prefix();
                self.raw(&"  ".repeat(depth.saturating_sub(1)));
                self.raw(&marker);
                self.at_line_start = false;
                self.item_fresh = true;
                return;
            }
            Tag::Table(alignments) => {
                self.block_break();
                self.table = Some(Table {
                    alignments,
                    ..Table::default()
                });
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell = Some(String::new());
                }
            }
            Tag::Emphasis => self.push_style_if_ansi(ANSI_ITALIC),
            Tag::Strong => self.push_style_if_ansi(ANSI_BOLD),
            Tag::Strikethrough => self.push_style_if_ansi(ANSI_STRIKE),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                if self.ansi() {
                    self.push_style(ANSI_UNDERLINE);
                    self.push_style(self.palette.link);
                }
            }
            Tag::Image { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.text("[image: ");
            }
            _ => {}
        }
        self.item_fresh = false;
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.ensure_newline(),
            TagEnd::Heading { .. } => {
                if self.ansi() {
                    self.pop_style();
                    self.pop_style();
                }
                self.ensure_newline();
            }
            TagEnd::BlockQuote { .. } => {
                self.ensure_newline();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.code_block(code);
                }
            }
            TagEnd::List { .. } => {
                self.ensure_newline();
                self.lists.pop();
            }
            TagEnd::Item => self.ensure_newline(),
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = Some(std::mem::take(&mut table.row));
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = table.cell.take().unwrap_or_default();
                    table.row.push(cell);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.table_block(table);
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                if self.ansi() {
                    self.pop_style();
                }
            }
            TagEnd::Link => {
                let url = self.links.pop().unwrap_or_default();
                // Autolinks already show their target.
                let shown = self.written_ends_with(&url);
                if self.ansi() {
                    self.pop_style();
                    self.pop_style();
                }
                if !shown {
                    self.link_target(&url);
                }
            }
            TagEnd::Image => {
                self.text("]");
                if let Some(url) = self.links.pop() {
                    self.link_target(&url);
                }
            }
            _ => {}
        }
        self.item_fresh = false;
    }

    fn link_target(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        if self.ansi() {
            self.push_style(ANSI_DIM);
            self.text(&format!(" ({url})"));
            self.pop_style();
        } else {
            self.text(&format!(" ({url})"));
        }
    }

    fn code_block(&mut self, code: CodeBlock) {
        let body = if self.ansi() {
            self.highlighter.highlight(&code.text, code.lang.as_deref())
        } else {
            code.text
        };
        for line in body.split_inclusive('\n') {
            // Escapes trailing the last line.
            if !line.ends_with('\n') && strip_ansi_codes(line).is_empty() {
                self.raw(line);
                continue;
            }
            self.write_prefix();
            self.raw(line.trim_end_matches('\n'));
            self.raw("\n");
            self.at_line_start = true;
        }
        if self.ansi() {
            self.raw(ANSI_RESET);
            self.reapply_styles();
        }
    }

    fn table_block(&mut self, table: Table) {
        let columns = table
            .header
            .iter()
            .chain(table.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in table.header.iter().chain(table.rows.iter()) {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(measure_text_width(cell));
            }
        }

        let mut lines = Vec::new();
        if let Some(header) = &table.header {
            let line = self.table_row(header, &widths, &table.alignments);
            if self.ansi() {
                lines.push(format!("{ANSI_BOLD}{line}{ANSI_RESET}"));
            } else {
                lines.push(line);
            }
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            lines.push(rule.join("─┼─"));
        }
        for row in &table.rows {
            lines.push(self.table_row(row, &widths, &table.alignments));
        }

        for line in lines {
            self.write_prefix();
            self.raw(line.trim_end());
            self.raw("\n");
            self.at_line_start = true;
        }
    }

    fn table_row(&self, row: &[String], widths: &[usize], alignments: &[Alignment]) -> String {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(idx, width)| {
                let cell = row.get(idx).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(measure_text_width(cell));
                match alignments.get(idx) {
                    Some(Alignment::Right) => format!("{}{cell}", " ".repeat(pad)),
                    Some(Alignment::Center) => {
                        let left = pad / 2;
                        format!("{}{cell}{}", " ".repeat(left), " ".repeat(pad - left))
                    }
                    _ => format!("{cell}{}", " ".repeat(pad)),
                }
            })
            .collect();
        cells.join(" │ ")
    }

    /// Write text, emitting line prefixes after every line break.
    fn text(&mut self, text: &str) {
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            if !line.is_empty() {
                if self.at_line_start && self.table.is_none() {
                    self.write_prefix();
                }
                self.raw(line);
                self.at_line_start = false;
            }
            if lines.peek().is_some() {
                self.newline();
            }
        }
    }

    fn newline(&mut self) {
        if let Some(cell) = self.table.as_mut().and_then(|t| t.cell.as_mut()) {
            cell.push(' ');
            return;
        }
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn ensure_newline(&mut self) {
        if self.table.is_some() {
            return;
        }
        if !self.out.is_empty() && !self.at_line_start {
            self.newline();
        }
    }

    /// Separate a new block from the previous one by a blank line.
    fn block_break(&mut self) {
        if self.out.is_empty() || self.table.is_some() {
            return;
        }
        self.ensure_newline();
        if !self.out.ends_with("\n\n") {
            if self.quote_depth > 0 {
                self.write_quote_prefix();
                let trimmed = self.out.trim_end_matches(' ').len();
                self.out.truncate(trimmed);
            }
            self.out.push('\n');
        }
        self.at_line_start = true;
    }

    fn write_prefix(&mut self) {
        self.write_quote_prefix();
        if !self.lists.is_empty() {
            self.raw(&"  ".repeat(self.lists.len()));
        }
    }

    fn write_quote_prefix(&mut self) {
        if self.quote_depth == 0 {
            return;
        }
        let bars = "│ ".repeat(self.quote_depth);
        if self.ansi() {
            self.raw(ANSI_RESET);
            self.raw(ANSI_DIM);
            self.raw(&bars);
            self.raw(ANSI_RESET);
            self.reapply_styles();
        } else {
            self.raw(&bars);
        }
    }

    /// Whether the buffer `raw` currently writes to ends with `s`.
    fn written_ends_with(&self, s: &str) -> bool {
        match self.table.as_ref().and_then(|t| t.cell.as_ref()) {
            Some(cell) => cell.ends_with(s),
            None => self.out.ends_with(s),
        }
    }

    fn raw(&mut self, s: &str) {
        match self.table.as_mut().and_then(|t| t.cell.as_mut()) {
            Some(cell) => cell.push_str(s),
            None => self.out.push_str(s),
        }
    }

    fn push_style_if_ansi(&mut self, code: &'static str) {
        if self.ansi() {
            self.push_style(code);
        }
    }

    fn push_style(&mut self, code: &'static str) {
        self.styles.push(code);
        self.raw(code);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
        self.raw(ANSI_RESET);
        self.reapply_styles();
    }

    fn reapply_styles(&mut self) {
        let styles: String = self.styles.concat();
        self.raw(&styles);
    }

    fn finish(mut self) -> String {
        if self.ansi() && !self.styles.is_empty() {
            self.styles.clear();
            self.out.push_str(ANSI_RESET);
        }
        let trimmed = self.out.trim_end_matches(['\n', ' ']).len();
        self.out.truncate(trimmed);
        self.out
    }
}
