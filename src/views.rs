use crate::projector::{Bounds, MarkerSpec, Statistics, TableRow};

/// A view surface failing to render. Never fatal: the engine logs it and
/// moves on to the next surface.
#[derive(Debug)]
pub enum RenderError {
    Unavailable(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Unavailable(msg) => write!(f, "View unavailable: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// Map surface. `fit_to_markers` receives `None` when there are no visible
/// markers; the viewport must stay where it is then.
pub trait MapView: Send + Sync {
    fn add_marker(&self, marker: &MarkerSpec) -> Result<(), RenderError>;
    fn clear_markers(&self) -> Result<(), RenderError>;
    fn fit_to_markers(&self, bounds: Option<Bounds>) -> Result<(), RenderError>;
}

/// Event list surface. Full refreshes come time-descending through
/// `replace_all_rows`; a single live event arrives via `prepend_row`.
pub trait TableView: Send + Sync {
    fn prepend_row(&self, row: &TableRow) -> Result<(), RenderError>;
    fn replace_all_rows(&self, rows: &[TableRow]) -> Result<(), RenderError>;
}

/// Aggregate statistics surface.
pub trait StatsView: Send + Sync {
    fn set_stats(&self, stats: &Statistics) -> Result<(), RenderError>;
}

/// Headless view set that just logs what it would draw. Used when the
/// terminal UI is disabled.
#[derive(Debug, Default)]
pub struct LogViews;

impl MapView for LogViews {
    fn add_marker(&self, marker: &MarkerSpec) -> Result<(), RenderError> {
        log::debug!(
            "Marker {} at ({:.3}, {:.3}) r={:.1} color={}",
            marker.id,
            marker.latitude,
            marker.longitude,
            marker.radius,
            marker.color
        );
        Ok(())
    }

    fn clear_markers(&self) -> Result<(), RenderError> {
        log::debug!("Markers cleared");
        Ok(())
    }

    fn fit_to_markers(&self, bounds: Option<Bounds>) -> Result<(), RenderError> {
        if let Some(b) = bounds {
            log::debug!(
                "Viewport fit to [{:.2}, {:.2}] x [{:.2}, {:.2}]",
                b.min_lat,
                b.max_lat,
                b.min_lon,
                b.max_lon
            );
        }
        Ok(())
    }
}

impl TableView for LogViews {
    fn prepend_row(&self, row: &TableRow) -> Result<(), RenderError> {
        log::info!(
            "New event: M{:.1} {} ({})",
            row.magnitude,
            row.place,
            row.status.as_str()
        );
        Ok(())
    }

    fn replace_all_rows(&self, rows: &[TableRow]) -> Result<(), RenderError> {
        log::debug!("Table refreshed: {} rows", rows.len());
        Ok(())
    }
}

impl StatsView for LogViews {
    fn set_stats(&self, stats: &Statistics) -> Result<(), RenderError> {
        log::debug!(
            "Stats: total_24h={} avg_mag={:.2} alerts={}",
            stats.total_24h,
            stats.avg_magnitude,
            stats.active_alerts
        );
        Ok(())
    }
}
