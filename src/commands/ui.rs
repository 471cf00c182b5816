//! `dog ui` — interactive terminal menu.

use std::io;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};

/// Top-level menu sections.
const MENU_ITEMS: &[(&str, &str)] = &[
    ("Metrics", "Submit and query metrics"),
    ("Monitors", "Manage monitors"),
    ("Dashboards", "View and export dashboards"),
    ("Hosts", "List and manage hosts"),
    ("Logs", "Search and submit logs"),
];

/// Menu state: the selected index, with wrap-around navigation.
#[derive(Debug, Default)]
struct Menu {
    selected: usize,
}

impl Menu {
    fn next(&mut self) {
        self.selected = if self.selected + 1 < MENU_ITEMS.len() {
            self.selected + 1
        } else {
            0
        };
    }

    fn previous(&mut self) {
        self.selected = if self.selected > 0 {
            self.selected - 1
        } else {
            MENU_ITEMS.len() - 1
        };
    }
}

/// Runs the interactive menu until the user quits.
pub fn run() -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>) -> Result<()> {
    let mut menu = Menu::default();

    loop {
        terminal.draw(|frame| draw(frame, &menu))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Up => menu.previous(),
                KeyCode::Down => menu.next(),
                KeyCode::Enter => {
                    // TODO: open the section screen for the selected entry
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame, menu: &Menu) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(MENU_ITEMS.len() as u16 + 1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(Span::styled(
        " dog - Datadog CLI ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(title, chunks[0]);

    let lines: Vec<Line> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(index, (label, description))| {
            let selected = index == menu.selected;
            let marker = if selected { "❯ " } else { "  " };
            let style = if selected {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{}{}", marker, label), style),
                Span::styled(
                    format!(" - {}", description),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[1]);

    let help = Paragraph::new(Line::from(Span::styled(
        "↑/↓ Navigate • Enter Select • q Quit",
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(help, chunks[2]);
}
