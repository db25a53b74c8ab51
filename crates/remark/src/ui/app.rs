//! Application loop for the TUI.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinError;

use crate::app::review::ReviewService;
use crate::app::session::{FolderStore, SavedState};
use crate::app::state::{Action, AppState, Effect, update};
use crate::domain::errors::ReviewError;
use crate::domain::model::TargetLanguage;
use crate::infra::config::Config;
use crate::infra::gemini::GeminiClient;
use crate::ui::components::folder_prompt::{FolderPrompt, FolderPromptState, resolve_folder_input};
use crate::ui::components::summary::SummaryView;

const TICK_RATE: Duration = Duration::from_millis(120);
const PAGE: i32 = 10;

type ReviewOutcome = Result<String, ReviewError>;

/// Primary entry point for running the interactive TUI.
pub struct UiApp {
    state: AppState,
    store: FolderStore,
    service: Arc<ReviewService<GeminiClient>>,
    runtime: Runtime,
    outcome_tx: UnboundedSender<ReviewOutcome>,
    outcome_rx: UnboundedReceiver<ReviewOutcome>,
    summary: SummaryView,
    folder_prompt: FolderPromptState,
    folder_prompt_component: FolderPrompt,
    status: Option<StatusMessage>,
    should_quit: bool,
}

impl UiApp {
    /// Build the app from configuration and the persisted folder choice.
    pub fn new(config: &Config, store: FolderStore) -> Result<Self> {
        let saved = store.load_or_default();
        let language = saved.language.unwrap_or(config.defaults.language);
        let service = ReviewService::from_config(config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Ok(Self {
            state: AppState::restored(saved.selected_path, language),
            store,
            service: Arc::new(service),
            runtime,
            outcome_tx,
            outcome_rx,
            summary: SummaryView::new(),
            folder_prompt: FolderPromptState::default(),
            folder_prompt_component: FolderPrompt,
            status: None,
            should_quit: false,
        })
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
        terminal.hide_cursor().ok();

        let event_loop_result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        event_loop_result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick();

            if self.should_quit {
                break;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        let finished = matches!(action, Action::ReviewFinished(_));
        let (next, effect) = update(std::mem::take(&mut self.state), action);
        self.state = next;
        if finished {
            self.summary.reset();
        }
        if let Some(effect) = effect {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Persist {
                selected_path,
                language,
            } => {
                let saved = SavedState {
                    selected_path,
                    language: Some(language),
                };
                if let Err(err) = self.store.save(&saved) {
                    tracing::warn!(error = %err, "failed to persist folder choice");
                    self.set_status(StatusLevel::Error, format!("{err:#}"));
                }
            }
            Effect::StartReview { root, language } => {
                let service = Arc::clone(&self.service);
                let tx = self.outcome_tx.clone();
                self.summary.reset();
                forward_outcome(
                    &self.runtime,
                    async move { service.review(Some(&root), language).await },
                    tx,
                );
            }
        }
    }

    fn tick(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.dispatch(Action::ReviewFinished(outcome));
        }
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(size);

        self.render_header(frame, layout[0]);
        self.summary.render(
            frame,
            layout[1],
            &self.state.summary_text,
            self.state.is_loading,
        );
        self.render_hints(frame, layout[2]);
        self.render_status(frame, layout[3]);
        self.folder_prompt_component
            .render(frame, size, &self.folder_prompt);
    }

    fn render_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(46)])
            .split(inner);

        let folder = match &self.state.selected_path {
            Some(path) => Line::from(vec![
                Span::styled("Folder ", Style::default().fg(Color::Gray)),
                Span::styled(
                    path.display().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            None => Line::styled(
                "Select Folder (press o)",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        frame.render_widget(Paragraph::new(folder), columns[0]);

        let mut picker = vec![Span::styled(
            "Output Language: ",
            Style::default().fg(Color::Gray),
        )];
        for language in TargetLanguage::ALL {
            let style = if language == self.state.language {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            picker.push(Span::styled(format!(" {} ", language.label()), style));
            picker.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(picker)), columns[1]);
    }

    fn render_hints(&self, frame: &mut Frame<'_>, area: Rect) {
        let answers = if self.summary.answers_revealed() {
            " hide answers · "
        } else {
            " show answers · "
        };
        let hints = Paragraph::new(Line::from(vec![
            Span::styled("r", Style::default().fg(Color::Cyan)),
            Span::raw(" review random note · "),
            Span::styled("o", Style::default().fg(Color::Cyan)),
            Span::raw(" folder · "),
            Span::styled("tab", Style::default().fg(Color::Cyan)),
            Span::raw(" language · "),
            Span::styled("a", Style::default().fg(Color::Cyan)),
            Span::raw(answers),
            Span::styled("j/k", Style::default().fg(Color::Cyan)),
            Span::raw(" scroll · "),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(" quit"),
        ]))
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(hints, area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let message = self.status.as_ref().map(|status| {
            let style = match status.level {
                StatusLevel::Info => Style::default().fg(Color::Gray),
                StatusLevel::Error => Style::default().fg(Color::Red),
            };
            Line::styled(status.text.clone(), style)
        });

        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let line = message.unwrap_or_else(|| {
            let text = if self.state.is_loading {
                "Reviewing…"
            } else {
                "Ready"
            };
            Line::styled(text, Style::default().fg(Color::DarkGray))
        });
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key_event(key),
            _ => {}
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }

        if self.folder_prompt.is_open() {
            self.handle_folder_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('o') => {
                let current = self
                    .state
                    .selected_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                self.folder_prompt.open_with(current);
            }
            KeyCode::Char('r') | KeyCode::Enter => {
                if self.state.is_loading {
                    self.set_status(StatusLevel::Info, "A review is already running");
                }
                self.dispatch(Action::ReviewRequested);
            }
            KeyCode::Tab | KeyCode::Char('l') => {
                let next = self.state.language.toggle();
                self.dispatch(Action::LanguageChanged(next));
            }
            KeyCode::Char('a') => {
                self.summary.toggle_answers();
            }
            KeyCode::Char('j') | KeyCode::Down => self.summary.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.summary.scroll_by(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.summary.scroll_by(PAGE),
            KeyCode::PageUp => self.summary.scroll_by(-PAGE),
            _ => {}
        }
    }

    fn handle_folder_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.folder_prompt.close();
            }
            KeyCode::Enter => match resolve_folder_input(self.folder_prompt.input()) {
                Ok(path) => {
                    self.folder_prompt.close();
                    self.set_status(
                        StatusLevel::Info,
                        format!("Reviewing notes under {}", path.display()),
                    );
                    self.dispatch(Action::FolderSelected(path));
                }
                Err(err) => {
                    self.folder_prompt.set_error(err.to_string());
                }
            },
            KeyCode::Backspace => {
                self.folder_prompt.pop_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.folder_prompt.push_char(ch);
                }
            }
            _ => {}
        }
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, text: S) {
        self.status = Some(StatusMessage::new(level, text.into()));
    }
}

/// Run `review` in the background and always report one outcome on `tx`.
fn forward_outcome<F>(runtime: &Runtime, review: F, tx: UnboundedSender<ReviewOutcome>)
where
    F: Future<Output = ReviewOutcome> + Send + 'static,
{
    let task = runtime.spawn(review);
    runtime.spawn(async move {
        let outcome = task.await.unwrap_or_else(|err| Err(review_task_failed(err)));
        // The receiver only disappears when the UI is shutting down.
        let _ = tx.send(outcome);
    });
}

/// A review task that died without reporting still has to clear the loading state.
fn review_task_failed(err: JoinError) -> ReviewError {
    tracing::error!(error = %err, "review task did not complete");
    ReviewError::ExternalCallFailure(format!("review task did not complete: {err}"))
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusLevel {
    Info,
    Error,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn finished_review_is_forwarded() {
        let runtime = runtime();
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_outcome(&runtime, async { Ok("# Summary".to_owned()) }, tx);
        let outcome = runtime.block_on(rx.recv());
        assert_eq!(outcome, Some(Ok("# Summary".to_owned())));
    }

    #[test]
    fn panicked_review_still_clears_loading_state() {
        let runtime = runtime();
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_outcome(
            &runtime,
            async {
                if true {
                    panic!("client blew up");
                }
                Ok(String::new())
            },
            tx,
        );

        let outcome = runtime.block_on(rx.recv()).expect("an outcome is always sent");
        let Err(ReviewError::ExternalCallFailure(message)) = &outcome else {
            panic!("expected an external call failure, got {outcome:?}");
        };
        assert!(message.contains("review task did not complete"));

        let (loading, _) = update(
            AppState::restored(Some(PathBuf::from("/notes")), TargetLanguage::English),
            Action::ReviewRequested,
        );
        assert!(loading.is_loading);
        let (finished, effect) = update(loading, Action::ReviewFinished(outcome));
        assert!(!finished.is_loading);
        assert!(effect.is_none());

        let (retried, effect) = update(finished, Action::ReviewRequested);
        assert!(retried.is_loading);
        assert!(matches!(effect, Some(Effect::StartReview { .. })));
    }
}
