//! Terminal output: bordered panels, markdown answers and the wait spinner.

use console::{measure_text_width, pad_str, truncate_str, Alignment, Style};
use indicatif::{ProgressBar, ProgressStyle};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::borrow::Cow;
use std::time::Duration;

use crate::store::QueryHit;

/// Total width of a panel, borders included
pub const PANEL_WIDTH: usize = 80;

const HORIZONTAL_PADDING: usize = 2;
const INNER_WIDTH: usize = PANEL_WIDTH - 2;
const CONTENT_WIDTH: usize = INNER_WIDTH - 2 * HORIZONTAL_PADDING;

/// How well a retrieved chunk matches, judged from its distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Good,
    Fair,
    Bad,
}

impl Quality {
    pub fn from_distance(distance: f32) -> Self {
        if distance > 1.5 {
            Self::Bad
        } else if distance > 1.25 {
            Self::Fair
        } else {
            Self::Good
        }
    }

    fn style(&self) -> Style {
        let style = Style::new().bold();
        match self {
            Self::Good => style.green().bright(),
            Self::Fair => style.yellow().bright(),
            Self::Bad => style.red().bright(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelKind {
    Query,
    Result,
    Question,
    Answer,
}

impl PanelKind {
    fn border(&self) -> Style {
        match self {
            Self::Query | Self::Question => Style::new().blue().bright(),
            Self::Result | Self::Answer => Style::new().magenta().bright(),
        }
    }

    fn title(&self) -> Style {
        let style = Style::new().bold().black();
        match self {
            Self::Query | Self::Question => style.on_blue().on_bright(),
            Self::Result | Self::Answer => style.on_magenta().on_bright(),
        }
    }
}

pub fn query_panel(query: &str) -> String {
    panel(PanelKind::Query, "Query", &wrap_plain(query, CONTENT_WIDTH), None)
}

pub fn question_panel(question: &str) -> String {
    panel(PanelKind::Question, "Question", &wrap_plain(question, CONTENT_WIDTH), None)
}

/// One retrieved chunk, titled with its source and footed with its distance
pub fn result_panel(hit: &QueryHit) -> String {
    let quality = Quality::from_distance(hit.distance);
    let subtitle = quality
        .style()
        .apply_to(format!(" Distance: {:.2} ", hit.distance))
        .to_string();

    panel(
        PanelKind::Result,
        &format!("Source: {}", hit.source),
        &wrap_plain(&hit.content, CONTENT_WIDTH),
        Some(&subtitle),
    )
}

pub fn answer_panel(markdown: &str) -> String {
    panel(
        PanelKind::Answer,
        "Answer",
        &render_markdown(markdown, CONTENT_WIDTH),
        None,
    )
}

fn panel(kind: PanelKind, title: &str, lines: &[String], subtitle: Option<&str>) -> String {
    let border = kind.border();
    let title = format!(" {} ", truncate_str(title, INNER_WIDTH - 4, "..."));
    let title_width = measure_text_width(&title);

    let mut out = Vec::with_capacity(lines.len() + 4);

    out.push(format!(
        "{}{}{}",
        border.apply_to("┏━"),
        kind.title().apply_to(&title),
        border.apply_to(format!("{}┓", "━".repeat(INNER_WIDTH - 1 - title_width)))
    ));

    let blank = format!(
        "{}{}{}",
        border.apply_to("┃"),
        " ".repeat(INNER_WIDTH),
        border.apply_to("┃")
    );
    let margin = " ".repeat(HORIZONTAL_PADDING);

    out.push(blank.clone());
    for line in lines {
        out.push(format!(
            "{}{}{}{}{}",
            border.apply_to("┃"),
            margin,
            pad_str(line, CONTENT_WIDTH, Alignment::Left, Some("…")),
            margin,
            border.apply_to("┃")
        ));
    }
    out.push(blank);

    let bottom = match subtitle {
        Some(subtitle) => {
            let subtitle_width = measure_text_width(subtitle).min(INNER_WIDTH - 2);
            format!(
                "{}{}{}",
                border.apply_to(format!("┗{}", "━".repeat(INNER_WIDTH - 1 - subtitle_width))),
                subtitle,
                border.apply_to("━┛")
            )
        }
        None => border
            .apply_to(format!("┗{}┛", "━".repeat(INNER_WIDTH)))
            .to_string(),
    };
    out.push(bottom);

    out.join("\n")
}

/// Greedy word wrap that keeps the text's own line breaks and splits words
/// wider than `width`.
pub fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut line = String::new();
        let mut line_width = 0;

        for word in source_line.split_whitespace() {
            for piece in split_long_word(word, width) {
                let piece_width = measure_text_width(&piece);
                if line_width > 0 && line_width + 1 + piece_width > width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                if line_width > 0 {
                    line.push(' ');
                    line_width += 1;
                }
                line.push_str(&piece);
                line_width += piece_width;
            }
        }

        lines.push(line);
    }

    lines
}

fn split_long_word(word: &str, width: usize) -> Vec<String> {
    if measure_text_width(word) <= width {
        return vec![word.to_string()];
    }

    let chars: Vec<char> = word.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Render markdown to styled lines at most `width` columns wide
pub fn render_markdown(markdown: &str, width: usize) -> Vec<String> {
    let mut writer = MarkdownWriter::new(width);

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                writer.block_break();
                writer.heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                writer.heading = None;
                writer.block_break();
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if writer.lists.is_empty() {
                    writer.block_break();
                } else {
                    writer.flush_line();
                }
            }
            Event::Start(Tag::BlockQuote) => {
                writer.block_break();
                writer.indents.push("│ ".to_string());
                writer.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote) => {
                writer.flush_line();
                writer.indents.pop();
                writer.quote_depth -= 1;
                writer.block_break();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                writer.block_break();
                writer.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                writer.in_code_block = false;
                writer.block_break();
            }
            Event::Start(Tag::List(first)) => {
                if writer.lists.is_empty() {
                    writer.block_break();
                } else {
                    writer.flush_line();
                }
                writer.lists.push(first);
            }
            Event::End(TagEnd::List(_)) => {
                writer.flush_line();
                writer.lists.pop();
                if writer.lists.is_empty() {
                    writer.block_break();
                }
            }
            Event::Start(Tag::Item) => {
                writer.flush_line();
                let marker = match writer.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                writer.indents.push(" ".repeat(measure_text_width(&marker)));
                writer.marker = Some(marker);
            }
            Event::End(TagEnd::Item) => {
                writer.flush_line();
                writer.indents.pop();
            }
            Event::Start(Tag::Emphasis) => writer.italic += 1,
            Event::End(TagEnd::Emphasis) => writer.italic -= 1,
            Event::Start(Tag::Strong) => writer.bold += 1,
            Event::End(TagEnd::Strong) => writer.bold -= 1,
            Event::Start(Tag::Link { .. }) => writer.link += 1,
            Event::End(TagEnd::Link) => writer.link -= 1,
            Event::Code(code) => writer.code_span(&code),
            Event::Text(text) => {
                if writer.in_code_block {
                    writer.code_block(&text);
                } else {
                    writer.text(&text);
                }
            }
            Event::Html(html) => writer.text(&html),
            Event::SoftBreak => writer.space = true,
            Event::HardBreak => writer.flush_line(),
            Event::Rule => {
                writer.block_break();
                let rule = Style::new().dim().apply_to("─".repeat(width)).to_string();
                writer.lines.push(rule);
                writer.block_break();
            }
            _ => {}
        }
    }

    writer.finish()
}

struct MarkdownWriter {
    width: usize,
    lines: Vec<String>,
    line: String,
    line_width: usize,
    /// Whether the current line has content past its prefix
    line_open: bool,
    space: bool,
    indents: Vec<String>,
    /// List marker replacing the innermost indent on the next line
    marker: Option<String>,
    lists: Vec<Option<u64>>,
    heading: Option<HeadingLevel>,
    bold: usize,
    italic: usize,
    link: usize,
    quote_depth: usize,
    in_code_block: bool,
}

impl MarkdownWriter {
    fn new(width: usize) -> Self {
        Self {
            width: width.max(8),
            lines: Vec::new(),
            line: String::new(),
            line_width: 0,
            line_open: false,
            space: false,
            indents: Vec::new(),
            marker: None,
            lists: Vec::new(),
            heading: None,
            bold: 0,
            italic: 0,
            link: 0,
            quote_depth: 0,
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        let mut style = Style::new();
        if let Some(level) = self.heading {
            style = style.bold().cyan();
            if level == HeadingLevel::H1 {
                style = style.underlined();
            }
        }
        if self.bold > 0 {
            style = style.bold();
        }
        if self.italic > 0 {
            style = style.italic();
        }
        if self.link > 0 {
            style = style.blue().underlined();
        }
        if self.quote_depth > 0 {
            style = style.dim();
        }
        style
    }

    fn prefix(&mut self) -> String {
        match self.marker.take() {
            Some(marker) => {
                let outer = self.indents.len().saturating_sub(1);
                format!("{}{}", self.indents[..outer].concat(), marker)
            }
            None => self.indents.concat(),
        }
    }

    fn open_line(&mut self) {
        if !self.line_open {
            let prefix = self.prefix();
            self.line_width = measure_text_width(&prefix);
            self.line = prefix;
            self.line_open = true;
            self.space = false;
        }
    }

    fn text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.space = true;
        }
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                self.space = true;
            }
            let styled = self.style().apply_to(word).to_string();
            self.word(&styled, measure_text_width(word));
        }
        if text.ends_with(char::is_whitespace) {
            self.space = true;
        }
    }

    fn code_span(&mut self, code: &str) {
        let styled = Style::new().yellow().apply_to(code).to_string();
        self.word(&styled, measure_text_width(code));
    }

    fn word(&mut self, styled: &str, width: usize) {
        self.open_line();
        let gap = usize::from(self.space && self.has_content());
        if self.has_content() && self.line_width + gap + width > self.width {
            self.flush_line();
            self.open_line();
        } else if gap == 1 {
            self.line.push(' ');
            self.line_width += 1;
        }
        self.line.push_str(styled);
        self.line_width += width;
        self.space = false;
    }

    fn has_content(&self) -> bool {
        self.line_open && self.line_width > measure_text_width(&self.indents.concat())
    }

    fn code_block(&mut self, text: &str) {
        let style = Style::new().yellow();
        for line in text.lines() {
            self.flush_line();
            self.open_line();
            let available = self.width.saturating_sub(self.line_width + 2);
            let shown = truncate_str(line, available, "…");
            self.line.push_str("  ");
            self.line.push_str(&style.apply_to(shown.as_ref()).to_string());
            self.line_width += 2 + measure_text_width(&shown);
            self.flush_line();
        }
    }

    fn flush_line(&mut self) {
        if self.line_open {
            let line = std::mem::take(&mut self.line);
            self.lines.push(line.trim_end().to_string());
            self.line_open = false;
            self.line_width = 0;
        }
        self.space = false;
    }

    /// End the current block, leaving one blank line before the next
    fn block_break(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush_line();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Spinner shown on stderr while waiting on retrieval or the language model
pub fn spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
