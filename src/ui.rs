use crate::events::Notification;
use crate::library::ScanReport;
use crate::model::{Catalog, PlayMode, PlaybackState, Track};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const APP_TITLE: &str = "tunedeck  ";
const KEY_HELP: &str =
    "enter play  space toggle  n/p next/prev  s stop  m mode  +/- volume  r rescan  q quit";

const BG: Color = Color::Rgb(10, 15, 24);
const PANEL_BG: Color = Color::Rgb(19, 29, 43);
const BORDER: Color = Color::Rgb(69, 121, 176);
const TEXT: Color = Color::Rgb(214, 228, 248);
const MUTED: Color = Color::Rgb(149, 173, 204);
const ACCENT: Color = Color::Rgb(100, 203, 184);
const ALERT: Color = Color::Rgb(249, 174, 88);
const SELECTED_BG: Color = Color::Rgb(34, 55, 82);

/// Everything the screen shows, fed by navigator notifications.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub catalog: Catalog,
    pub mode: PlayMode,
    pub state: PlaybackState,
    pub now_playing: Option<Track>,
    pub volume: u8,
    pub cursor: usize,
    pub status: String,
}

impl ViewState {
    pub fn new(mode: PlayMode, volume: u8) -> Self {
        Self {
            catalog: Catalog::new(),
            mode,
            state: PlaybackState::Stopped,
            now_playing: None,
            volume,
            cursor: 0,
            status: String::from("Ready"),
        }
    }

    pub fn apply(&mut self, notification: Notification) {
        match notification {
            Notification::DataChanged { catalog, mode } => {
                self.catalog = catalog;
                self.mode = mode;
                self.now_playing = None;
                self.cursor = 0;
            }
            Notification::StateChanged { state, track } => {
                self.state = state;
                self.now_playing = track;
            }
            Notification::ModeChanged(mode) => {
                self.mode = mode;
                self.status = format!("Mode: {}", mode.label());
            }
            Notification::VolumeChanged(level) => {
                self.volume = level;
                self.status = format!("Volume: {level}%");
            }
            Notification::PlaybackFailed { path, reason } => {
                self.status = format!("cannot play {}: {reason}", path.display());
            }
        }
    }

    pub fn note_scan(&mut self, report: &ScanReport) {
        self.status = if report.skipped.is_empty() {
            format!("Loaded {} tracks", report.catalog.len())
        } else {
            format!(
                "Loaded {} tracks, skipped {} directories",
                report.catalog.len(),
                report.skipped.len()
            )
        };
    }

    pub fn move_cursor(&mut self, down: bool) -> usize {
        let last = self.catalog.len().saturating_sub(1);
        self.cursor = if down {
            (self.cursor + 1).min(last)
        } else {
            self.cursor.saturating_sub(1)
        };
        self.cursor
    }
}

pub fn state_label(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Stopped => "Stopped",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    }
}

pub fn draw(frame: &mut Frame, view: &ViewState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(state_label(view.state), Style::default().fg(TEXT)),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(
            format!("Mode {}", view.mode.label()),
            Style::default().fg(ALERT),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(format!("Vol {}%", view.volume), Style::default().fg(TEXT)),
    ]))
    .block(panel_block("Status"));
    frame.render_widget(header, vertical[0]);

    let playing_index = view.now_playing.as_ref().map(|track| track.index);
    let items: Vec<ListItem> = view
        .catalog
        .iter()
        .map(|track| {
            let marker = if Some(track.index) == playing_index {
                "  > "
            } else {
                "    "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(MUTED)),
                Span::styled(track.name.as_str(), Style::default().fg(TEXT)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!view.catalog.is_empty()).then_some(view.cursor));

    let title = format!("Tracks ({})", view.catalog.len());
    let list = List::new(items)
        .block(panel_block(&title))
        .highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, vertical[1], &mut state);

    let now_playing = view
        .now_playing
        .as_ref()
        .map(|track| track.name.as_str())
        .unwrap_or("-");
    let footer = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Now: ", Style::default().fg(MUTED)),
            Span::styled(now_playing, Style::default().fg(ACCENT)),
            Span::styled("  ", Style::default()),
            Span::styled(view.status.as_str(), Style::default().fg(TEXT)),
        ]),
        Line::from(Span::styled(KEY_HELP, Style::default().fg(MUTED))),
    ])
    .block(panel_block("Player"));
    frame.render_widget(footer, vertical[2]);
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(PANEL_BG))
}
