//! Review summary pane.

use once_cell::sync::Lazy;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use regex::Regex;

static SPOILER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\|(.+?)\|\|").expect("spoiler pattern is valid"));

const SPOILER_MASK: char = '▒';
const LOADING_TEXT: &str = "Gemini is thinking...";

/// Displays the generated summary with light Markdown styling.
///
/// Quiz answers written as `||answer||` stay masked until revealed.
#[derive(Debug, Default)]
pub struct SummaryView {
    scroll: u16,
    reveal_answers: bool,
}

impl SummaryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll) + delta;
        self.scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Jump back to the top and hide answers; called whenever new text arrives.
    pub fn reset(&mut self) {
        self.scroll = 0;
        self.reveal_answers = false;
    }

    pub fn toggle_answers(&mut self) {
        self.reveal_answers = !self.reveal_answers;
    }

    pub fn answers_revealed(&self) -> bool {
        self.reveal_answers
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, text: &str, loading: bool) {
        let block = Block::default()
            .title("Re:Mark")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if loading {
                Color::Yellow
            } else {
                Color::DarkGray
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if loading {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(inner);
            let spinner = Paragraph::new(LOADING_TEXT)
                .alignment(Alignment::Center)
                .style(
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::ITALIC),
                );
            frame.render_widget(spinner, rows[1]);
            return;
        }

        let paragraph = Paragraph::new(summary_lines(text, self.reveal_answers))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, inner);
    }
}

/// Convert summary Markdown into styled lines.
pub fn summary_lines(text: &str, reveal_answers: bool) -> Vec<Line<'static>> {
    text.lines()
        .map(|line| style_line(line, reveal_answers))
        .collect()
}

fn style_line(line: &str, reveal_answers: bool) -> Line<'static> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        let heading = trimmed.trim_start_matches('#').trim_start();
        let level = trimmed.len() - trimmed.trim_start_matches('#').len();
        let color = if level <= 1 { Color::Cyan } else { Color::LightBlue };
        let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        return Line::from(spoiler_spans(heading, style, reveal_answers));
    }

    let (prefix, rest) = match trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        Some(rest) => {
            let indent = &line[..line.len() - trimmed.len()];
            (Some(format!("{indent}• ")), rest)
        }
        None => (None, line),
    };

    let mut spans = Vec::new();
    if let Some(prefix) = prefix {
        spans.push(Span::styled(prefix, Style::default().fg(Color::DarkGray)));
    }
    spans.extend(spoiler_spans(rest, Style::default(), reveal_answers));
    Line::from(spans)
}

fn spoiler_spans(text: &str, base: Style, reveal_answers: bool) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for capture in SPOILER.captures_iter(text) {
        let (Some(whole), Some(answer)) = (capture.get(0), capture.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::styled(text[last..whole.start()].to_owned(), base));
        }
        if reveal_answers {
            spans.push(Span::styled(
                answer.as_str().to_owned(),
                base.fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        } else {
            let width = answer.as_str().chars().count().max(3);
            spans.push(Span::styled(
                SPOILER_MASK.to_string().repeat(width),
                Style::default().fg(Color::DarkGray),
            ));
        }
        last = whole.end();
    }
    if last < text.len() || spans.is_empty() {
        spans.push(Span::styled(text[last..].to_owned(), base));
    }
    spans
}
