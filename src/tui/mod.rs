mod export;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::engine::RosterClient;
use crate::model::{InfoEvent, Phase, RosterEvent, SortKey, SortOrder};
use crate::orchestrator::{self, UiCommand};
use crate::roster::{RosterTable, COLUMNS};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use export::{copy_to_clipboard, export_roster_csv, export_roster_json};
use help::draw_help;
use state::UiState;

pub async fn run(args: Cli) -> Result<()> {
    let client = RosterClient::new(&build_config(&args))?;

    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RosterEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, args.fetch_on_launch, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<RosterEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState {
        save_snapshots: args.save,
        sort_key: args.sort.unwrap_or_default(),
        ..Default::default()
    };
    if !args.fetch_on_launch {
        state.info = "Press 'r' to fetch the roster".into();
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&args, &mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('r')) => {
                        state.info = "Fetch requested…".into();
                        let _ = cmd_tx.send(UiCommand::Fetch);
                    }
                    (_, KeyCode::Char('u')) => {
                        if state.table.is_empty() {
                            state.info = "Nothing to upload yet.".into();
                        } else {
                            state.info = format!("Uploading {} student(s)…", state.table.len());
                            let _ = cmd_tx.send(UiCommand::Upload(state.table.to_students()));
                        }
                    }
                    (_, KeyCode::Char('s')) => {
                        if state.tab == 0 {
                            state.sort_displayed();
                        }
                    }
                    (_, KeyCode::Left) | (_, KeyCode::Char('h')) => {
                        if state.tab == 0 {
                            state.sort_key = state.sort_key.prev();
                        }
                    }
                    (_, KeyCode::Right) | (_, KeyCode::Char('l')) => {
                        if state.tab == 0 {
                            state.sort_key = state.sort_key.next();
                        }
                    }
                    (_, KeyCode::Char('e')) => {
                        if state.tab == 0 && !state.table.is_empty() {
                            match export_roster_json(&state.table.to_students()) {
                                Ok(p) => {
                                    state.last_exported_path = Some(p.to_string_lossy().to_string());
                                    state.info = format!("Exported JSON: {}", p.display());
                                }
                                Err(e) => {
                                    state.info = format!("JSON export failed: {e:#}");
                                }
                            }
                        }
                    }
                    (_, KeyCode::Char('c')) => {
                        if state.tab == 0 && !state.table.is_empty() {
                            match export_roster_csv(&state.table.to_students()) {
                                Ok(p) => {
                                    state.last_exported_path = Some(p.to_string_lossy().to_string());
                                    state.info = format!("Exported CSV: {}", p.display());
                                }
                                Err(e) => {
                                    state.info = format!("CSV export failed: {e:#}");
                                }
                            }
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        if let Some(row) = state.selected_row() {
                            let email = row[SortKey::Email.column()].clone();
                            state.info = match copy_to_clipboard(&email) {
                                Ok(_) => format!("✓ Copied to clipboard: {email}"),
                                Err(e) => format!("Clipboard copy failed: {e:#}"),
                            };
                        } else {
                            state.info = "No row selected.".into();
                        }
                    }
                    (_, KeyCode::Char('a')) => {
                        state.save_snapshots = !state.save_snapshots;
                        state.info = if state.save_snapshots {
                            "Snapshot saving enabled".into()
                        } else {
                            "Snapshot saving disabled".into()
                        };
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 2;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 1;
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(args: &Cli, state: &mut UiState, ev: RosterEvent) {
    match ev {
        RosterEvent::PhaseStarted { phase } => {
            state.phase = phase;
            if phase != Phase::Idle {
                state.info = format!("{phase:?}…");
            }
        }
        RosterEvent::Fetched { students } => {
            let processed = orchestrator::process_fetch(args, state.save_snapshots, students);
            let sorted_by = args
                .sort
                .map(|key| (key, orchestrator::sort_order(args)));
            state.set_table(RosterTable::from_students(&processed.students), sorted_by);
            state.fetch_count += 1;

            state.info = format!("Fetched {} student(s)", state.table.len());
            if let Some(path) = processed.saved_path.as_ref() {
                state.info = format!("{}; saved: {}", state.info, path.display());
            }
            if let Some(path) = processed.exported_paths.last() {
                state.last_exported_path = Some(path.to_string_lossy().to_string());
            }
            let export_notes: Vec<&str> = processed
                .export_messages
                .iter()
                .chain(processed.export_errors.iter())
                .map(String::as_str)
                .collect();
            if !export_notes.is_empty() {
                state.info = export_notes.join("; ");
            }
        }
        RosterEvent::Uploaded { count, status } => {
            state.info = format!("Uploaded {count} student(s) (HTTP {status})");
        }
        RosterEvent::Info(info) => {
            if let InfoEvent::Failed { .. } = info {
                state.phase = Phase::Idle;
            }
            state.info = info.to_message();
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Roster"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("roster-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_roster(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }
}

fn header_label(idx: usize, state: &UiState) -> String {
    let key = SortKey::ALL[idx];
    match state.sorted_by {
        Some((k, SortOrder::Ascending)) if k == key => format!("{} ▲", COLUMNS[idx]),
        Some((k, SortOrder::Descending)) if k == key => format!("{} ▼", COLUMNS[idx]),
        _ => COLUMNS[idx].to_string(),
    }
}

fn draw_roster(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(5)].as_ref())
        .split(area);

    let header = Row::new((0..COLUMNS.len()).map(|idx| {
        let style = if SortKey::ALL[idx] == state.sort_key {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)
        };
        Cell::from(header_label(idx, state)).style(style)
    }));

    let rows = state
        .table
        .rows
        .iter()
        .map(|cells| Row::new(cells.iter().map(|c| Cell::from(c.as_str()))));

    // Header labels may gain a sort arrow.
    let widths = state
        .table
        .column_widths()
        .map(|w| Constraint::Length((w + 2).min(u16::MAX as usize) as u16));

    let title = format!(
        "Students ({}/{})",
        if state.table.is_empty() {
            0
        } else {
            state.selected + 1
        },
        state.table.len()
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    let mut table_state = TableState::default();
    if !state.table.is_empty() {
        table_state.select(Some(state.selected));
    }
    f.render_stateful_widget(table, chunks[0], &mut table_state);

    let status = Paragraph::new(status_lines(state))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[1]);
}

fn status_lines(state: &UiState) -> Vec<Line<'_>> {
    let phase_style = if state.is_busy() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    };
    vec![
        Line::from(vec![
            Span::styled("Phase: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:?}", state.phase), phase_style),
            Span::raw("   "),
            Span::styled("Sort column: ", Style::default().fg(Color::Gray)),
            Span::raw(COLUMNS[state.sort_key.column()]),
            Span::raw("   "),
            Span::styled("Snapshots: ", Style::default().fg(Color::Gray)),
            Span::raw(if state.save_snapshots { "on" } else { "off" }),
            Span::raw("   "),
            Span::styled("Fetches: ", Style::default().fg(Color::Gray)),
            Span::raw(state.fetch_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Info: ", Style::default().fg(Color::Gray)),
            Span::raw(state.info.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Last export: ", Style::default().fg(Color::Gray)),
            Span::raw(state.last_exported_path.as_deref().unwrap_or("-")),
        ]),
    ]
}
