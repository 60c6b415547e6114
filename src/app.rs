use crate::audio::{DecodeWorker, NullOutput, OutputSink, RodioOutput};
use crate::config::{self, SettingsFile};
use crate::events::Notification;
use crate::navigator::Navigator;
use crate::ui::{self, ViewState};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, unbounded};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct AppStartupOptions {
    /// Replaces the stored directory list before the first scan.
    pub directories: Option<Vec<PathBuf>>,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let settings = SettingsFile::open(config::settings_path()?);
    let worker = DecodeWorker::spawn(open_output).context("failed to start decode worker")?;
    let mut navigator = Navigator::new(Box::new(worker), Box::new(settings));

    let (tx, notifications) = unbounded();
    navigator.register_observer(Rc::new(tx));

    let report = match options.directories {
        Some(directories) => navigator.update_directories(directories),
        None => navigator.rescan(),
    };
    let mut view = ViewState::new(navigator.mode(), navigator.volume());
    drain(&notifications, &mut view);
    follow_cursor(&mut navigator, &view);
    view.note_scan(&report);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut dirty = true;
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        navigator.pump();
        if drain(&notifications, &mut view) {
            follow_cursor(&mut navigator, &view);
            dirty = true;
        }

        if dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| ui::draw(frame, &view))?;
            dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(&mut navigator, &mut view, key) {
            break Ok(());
        }
        dirty = true;
    };

    navigator.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn open_output() -> Box<dyn OutputSink> {
    match RodioOutput::open_default() {
        Ok(output) => Box::new(output),
        Err(err) => {
            tracing::warn!("no audio device, continuing silently: {err:#}");
            Box::new(NullOutput::paced())
        }
    }
}

fn drain(notifications: &Receiver<Notification>, view: &mut ViewState) -> bool {
    let mut changed = false;
    for notification in notifications.try_iter() {
        view.apply(notification);
        changed = true;
    }
    changed
}

/// Keeps the navigator's selection on the highlighted row.
fn follow_cursor(navigator: &mut Navigator, view: &ViewState) {
    if navigator.selected().map(|track| track.index) != Some(view.cursor) {
        navigator.select(view.cursor);
    }
}

/// Applies one key press. Returns `true` when the app should quit.
fn handle_key(navigator: &mut Navigator, view: &mut ViewState, key: KeyEvent) -> bool {
    let outcome = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') => return true,
        KeyCode::Down | KeyCode::Char('j') => {
            let cursor = view.move_cursor(true);
            navigator.select(cursor);
            Ok(())
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let cursor = view.move_cursor(false);
            navigator.select(cursor);
            Ok(())
        }
        KeyCode::Enter => navigator.activate(view.cursor),
        KeyCode::Char(' ') => navigator.toggle_play(),
        KeyCode::Char('n') => navigator.next(),
        KeyCode::Char('p') => navigator.previous(),
        KeyCode::Char('s') => {
            navigator.stop();
            Ok(())
        }
        KeyCode::Char('m') => {
            navigator.cycle_mode();
            Ok(())
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            navigator.adjust_volume(true);
            Ok(())
        }
        KeyCode::Char('-') => {
            navigator.adjust_volume(false);
            Ok(())
        }
        KeyCode::Char('r') => {
            let report = navigator.rescan();
            view.note_scan(&report);
            Ok(())
        }
        _ => Ok(()),
    };

    if let Err(err) = outcome {
        view.status = format!("playback error: {err}");
    }
    false
}
