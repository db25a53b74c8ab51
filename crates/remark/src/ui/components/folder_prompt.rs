//! Overlay for typing the study folder path.

use std::path::PathBuf;

use anyhow::{Result, bail};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Input state backing the folder overlay.
#[derive(Debug, Default, Clone)]
pub struct FolderPromptState {
    visible: bool,
    input: String,
    error: Option<String>,
}

impl FolderPromptState {
    /// Show the overlay, prefilled with the current folder if any.
    pub fn open_with<S: Into<String>>(&mut self, content: S) {
        self.visible = true;
        self.input = content.into();
        self.error = None;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.error = None;
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
        self.error = None;
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
        self.error = None;
    }

    /// Keep the overlay open and explain why the input was rejected.
    pub fn set_error<S: Into<String>>(&mut self, message: S) {
        self.error = Some(message.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Turn typed input into an existing directory path, expanding a leading `~`.
pub fn resolve_folder_input(raw: &str) -> Result<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("enter a folder path");
    }

    let path = match trimmed.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let Some(home) = dirs_next::home_dir() else {
                bail!("unable to resolve home directory for {trimmed}");
            };
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(trimmed),
    };

    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(path)
}

#[derive(Debug, Default)]
pub struct FolderPrompt;

impl FolderPrompt {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &FolderPromptState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(7) / 2,
            width,
            height: 6.min(area.height),
        };

        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Select Folder")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let input = Paragraph::new(Line::from(vec![
            Span::styled("› ", Style::default().fg(Color::Cyan)),
            Span::raw(state.input().to_owned()),
            Span::styled("▏", Style::default().fg(Color::Gray)),
        ]));
        frame.render_widget(input, rows[0]);

        let hint = Paragraph::new("enter to confirm · esc to cancel")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, rows[1]);

        if let Some(error) = state.error() {
            let message = Paragraph::new(error.to_owned())
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
            frame.render_widget(message, rows[2]);
        }
    }
}
