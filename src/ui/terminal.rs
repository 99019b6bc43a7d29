use crate::engine::DashboardEngine;
use crate::live::ConnectionState;
use crate::projector::{Bounds, MarkerSpec, Statistics, TableRow, TimeWindow};
use crate::views::{MapView, RenderError, StatsView, TableView};
use chrono::Utc;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Everything the terminal draws, as last pushed by the engine.
#[derive(Debug, Clone, Default)]
pub struct UiSnapshot {
    pub markers: Vec<MarkerSpec>,
    pub rows: Vec<TableRow>,
    pub stats: Option<Statistics>,
    pub viewport: Option<Bounds>,
}

/// View surfaces backed by shared state the render loop reads. The engine
/// writes through the view traits; the draw loop snapshots each frame.
#[derive(Debug, Default)]
pub struct UiViews {
    inner: Mutex<UiSnapshot>,
}

impl UiViews {
    pub fn snapshot(&self) -> Result<UiSnapshot, RenderError> {
        self.inner
            .lock()
            .map(|s| s.clone())
            .map_err(|_| RenderError::Unavailable("ui state poisoned".to_string()))
    }

    fn with<T>(&self, f: impl FnOnce(&mut UiSnapshot) -> T) -> Result<T, RenderError> {
        self.inner
            .lock()
            .map(|mut s| f(&mut s))
            .map_err(|_| RenderError::Unavailable("ui state poisoned".to_string()))
    }
}

impl MapView for UiViews {
    fn add_marker(&self, marker: &MarkerSpec) -> Result<(), RenderError> {
        self.with(|s| s.markers.push(marker.clone()))
    }

    fn clear_markers(&self) -> Result<(), RenderError> {
        self.with(|s| s.markers.clear())
    }

    fn fit_to_markers(&self, bounds: Option<Bounds>) -> Result<(), RenderError> {
        self.with(|s| {
            // Empty marker set leaves the viewport where it was
            if bounds.is_some() {
                s.viewport = bounds;
            }
        })
    }
}

impl TableView for UiViews {
    fn prepend_row(&self, row: &TableRow) -> Result<(), RenderError> {
        self.with(|s| s.rows.insert(0, row.clone()))
    }

    fn replace_all_rows(&self, rows: &[TableRow]) -> Result<(), RenderError> {
        self.with(|s| s.rows = rows.to_vec())
    }
}

impl StatsView for UiViews {
    fn set_stats(&self, stats: &Statistics) -> Result<(), RenderError> {
        self.with(|s| s.stats = Some(stats.clone()))
    }
}

/// Run the TUI event loop.
///
/// Keys: 1/2/3 switch the time window, `/` enters search mode (type to
/// filter, Enter or Esc leaves it), Backspace edits the query, q or Esc
/// quits.
pub async fn run_ui(
    views: Arc<UiViews>,
    engine: Arc<tokio::sync::Mutex<DashboardEngine>>,
    conn_rx: watch::Receiver<ConnectionState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen isolates the dashboard from stderr logs
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;

    terminal.clear()?;

    let mut search_mode = false;
    let mut query = String::new();
    let refresh_interval = Duration::from_millis(250);

    'outer: loop {
        if crossterm::event::poll(refresh_interval)? {
            if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                use crossterm::event::KeyCode;
                if search_mode {
                    match key.code {
                        KeyCode::Esc | KeyCode::Enter => search_mode = false,
                        KeyCode::Backspace => {
                            query.pop();
                            engine
                                .lock()
                                .await
                                .set_search_query(query.clone(), Utc::now());
                        }
                        KeyCode::Char(c) => {
                            query.push(c);
                            engine
                                .lock()
                                .await
                                .set_search_query(query.clone(), Utc::now());
                        }
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break 'outer,
                        KeyCode::Char('/') => search_mode = true,
                        KeyCode::Char('1') => {
                            engine.lock().await.set_time_window(TimeWindow::Day, Utc::now());
                        }
                        KeyCode::Char('2') => {
                            engine.lock().await.set_time_window(TimeWindow::Week, Utc::now());
                        }
                        KeyCode::Char('3') => {
                            engine
                                .lock()
                                .await
                                .set_time_window(TimeWindow::Month, Utc::now());
                        }
                        KeyCode::Backspace => {
                            query.pop();
                            engine
                                .lock()
                                .await
                                .set_search_query(query.clone(), Utc::now());
                        }
                        _ => {}
                    }
                }
            }
        }

        let snapshot = views.snapshot()?;
        let window = engine.lock().await.filter().window;
        let connection = *conn_rx.borrow();

        terminal.draw(|f| {
            crate::ui::layout::render_layout(f, &snapshot, window, &query, search_mode, connection);
        })?;
    }

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
}
