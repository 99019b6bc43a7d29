use crate::live::ConnectionState;
use crate::projector::TimeWindow;
use crate::ui::terminal::UiSnapshot;
use ratatui::{
    layout::{Constraint, Layout as RatLayout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Map, MapResolution},
        Block, Borders, Paragraph, Row, Table,
    },
    Frame,
};

/// Render the full dashboard: stats header, world map with event markers,
/// event table, status footer.
pub fn render_layout(
    f: &mut Frame,
    snapshot: &UiSnapshot,
    window: TimeWindow,
    query: &str,
    search_mode: bool,
    connection: ConnectionState,
) {
    let chunks = RatLayout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header with stats
            Constraint::Min(0),    // Map + table
            Constraint::Length(3), // Footer/status
        ])
        .split(f.area());

    render_header(f, chunks[0], snapshot);

    let main = RatLayout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_map(f, main[0], snapshot);
    render_events_table(f, main[1], snapshot);

    render_footer(f, chunks[2], window, query, search_mode, connection);
}

fn render_header(f: &mut Frame, area: Rect, snapshot: &UiSnapshot) {
    let header = Block::default()
        .borders(Borders::ALL)
        .title("Quakeflow - Earthquake Monitor");

    let stats_line = match &snapshot.stats {
        Some(stats) => Line::from(vec![
            Span::styled("Last 24h: ", Style::default().fg(Color::Cyan)),
            Span::raw(stats.total_24h.to_string()),
            Span::raw("  "),
            Span::styled("Avg magnitude: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{:.2}", stats.avg_magnitude)),
            Span::raw("  "),
            Span::styled("Active alerts: ", Style::default().fg(Color::Red)),
            Span::raw(stats.active_alerts.to_string()),
            Span::raw("  "),
            Span::styled("Updated: ", Style::default().fg(Color::Cyan)),
            Span::raw(stats.last_update.format("%H:%M:%S UTC").to_string()),
        ]),
        None => Line::from(Span::raw("Waiting for first snapshot...")),
    };

    let text = vec![
        Line::from(Span::styled(
            "Quakeflow",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        stats_line,
    ];

    f.render_widget(Paragraph::new(text).block(header), area);
}

fn render_map(f: &mut Frame, area: Rect, snapshot: &UiSnapshot) {
    // Fit the viewport to the markers with 10% padding; fall back to the
    // whole world before the first marker arrives
    let (x_bounds, y_bounds) = match snapshot.viewport.map(|b| b.padded(0.1)) {
        Some(vp) => (
            widen([vp.min_lon, vp.max_lon], 5.0, 180.0),
            widen([vp.min_lat, vp.max_lat], 2.5, 90.0),
        ),
        None => ([-180.0, 180.0], [-90.0, 90.0]),
    };

    let markers = &snapshot.markers;
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Map"))
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: Color::DarkGray,
            });
            for marker in markers {
                ctx.draw(&Circle {
                    x: marker.longitude,
                    y: marker.latitude,
                    radius: marker.radius / 10.0,
                    color: hex_to_color(marker.color),
                });
            }
        });

    f.render_widget(canvas, area);
}

fn render_events_table(f: &mut Frame, area: Rect, snapshot: &UiSnapshot) {
    let header = Row::new(vec!["Time", "Place", "Mag", "Depth", "Status"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = snapshot
        .rows
        .iter()
        .take(50)
        .map(|row| {
            let color = match row.status {
                crate::model::EventStatus::Alert => Color::Red,
                crate::model::EventStatus::Warning => Color::Yellow,
                crate::model::EventStatus::Safe => Color::Green,
            };
            Row::new(vec![
                row.time.format("%m-%d %H:%M").to_string(),
                row.place.clone(),
                format!("{:.1}", row.magnitude),
                format!("{:.1} km", row.depth),
                row.status.as_str().to_string(),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent Events"));

    f.render_widget(table, area);
}

fn render_footer(
    f: &mut Frame,
    area: Rect,
    window: TimeWindow,
    query: &str,
    search_mode: bool,
    connection: ConnectionState,
) {
    let connection_color = match connection {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        _ => Color::Red,
    };

    let search_display = if search_mode {
        format!("/{}_", query)
    } else if query.is_empty() {
        "(none)".to_string()
    } else {
        format!("/{}", query)
    };

    let text = vec![Line::from(vec![
        Span::styled("Feed: ", Style::default().fg(Color::Cyan)),
        Span::styled(connection.label(), Style::default().fg(connection_color)),
        Span::raw(" | "),
        Span::styled("Window: ", Style::default().fg(Color::Cyan)),
        Span::raw(window.label()),
        Span::raw(" | "),
        Span::styled("Search: ", Style::default().fg(Color::Cyan)),
        Span::raw(search_display),
        Span::raw(" | 1/2/3 window, / search, q quit"),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(text).block(footer), area);
}

fn hex_to_color(hex: &str) -> Color {
    match hex {
        "#FF0000" => Color::Red,
        "#FFA500" => Color::Yellow,
        _ => Color::Green,
    }
}

/// Canvas bounds need some width even for a single marker.
fn widen(bounds: [f64; 2], min_half_span: f64, limit: f64) -> [f64; 2] {
    let [lo, hi] = bounds;
    if hi - lo < min_half_span * 2.0 {
        let mid = (lo + hi) / 2.0;
        [
            (mid - min_half_span).max(-limit),
            (mid + min_half_span).min(limit),
        ]
    } else {
        bounds
    }
}
