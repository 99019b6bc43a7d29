use crate::model::{EventRecord, EventStatus};
use chrono::{DateTime, Duration, Months, Utc};

/// Time window the dashboard is currently scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
    /// One calendar month back, not a fixed 30 days.
    Month,
}

impl TimeWindow {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeWindow::Day => now - Duration::days(1),
            TimeWindow::Week => now - Duration::days(7),
            TimeWindow::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Day => "24h",
            TimeWindow::Week => "Week",
            TimeWindow::Month => "Month",
        }
    }
}

/// Active filter state: time window plus case-insensitive substring search
/// over the place label. Both filters intersect.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter {
    pub window: TimeWindow,
    pub search: String,
}

impl ViewFilter {
    pub fn matches(&self, record: &EventRecord, now: DateTime<Utc>) -> bool {
        if record.time < self.window.cutoff(now) {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        record
            .place
            .to_lowercase()
            .contains(&self.search.to_lowercase())
    }
}

/// One map marker, fully specified: position, size, color, popup text.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub color: &'static str,
    pub popup: String,
}

/// One table row, newest-first in full renders.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub place: String,
    pub magnitude: f64,
    pub depth: f64,
    pub time: DateTime<Utc>,
    pub status: EventStatus,
}

/// Aggregate figures shown in the stats header. Recomputed on every
/// projection, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_24h: usize,
    pub avg_magnitude: f64,
    pub active_alerts: usize,
    pub last_update: DateTime<Utc>,
}

/// Everything the views need for one full refresh.
#[derive(Debug, Clone)]
pub struct Projection {
    pub markers: Vec<MarkerSpec>,
    pub rows: Vec<TableRow>,
    pub stats: Statistics,
}

/// Geographic bounding box for fit-to-markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// None when there are no markers; the viewport is left untouched then.
    pub fn around(markers: &[MarkerSpec]) -> Option<Bounds> {
        let first = markers.first()?;
        let mut bounds = Bounds {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lon: first.longitude,
            max_lon: first.longitude,
        };
        for marker in &markers[1..] {
            bounds.min_lat = bounds.min_lat.min(marker.latitude);
            bounds.max_lat = bounds.max_lat.max(marker.latitude);
            bounds.min_lon = bounds.min_lon.min(marker.longitude);
            bounds.max_lon = bounds.max_lon.max(marker.longitude);
        }
        Some(bounds)
    }

    pub fn padded(&self, factor: f64) -> Bounds {
        let lat_pad = (self.max_lat - self.min_lat) * factor;
        let lon_pad = (self.max_lon - self.min_lon) * factor;
        Bounds {
            min_lat: (self.min_lat - lat_pad).max(-90.0),
            max_lat: (self.max_lat + lat_pad).min(90.0),
            min_lon: (self.min_lon - lon_pad).max(-180.0),
            max_lon: (self.max_lon + lon_pad).min(180.0),
        }
    }
}

pub fn marker_radius(magnitude: f64) -> f64 {
    (magnitude * 5.0).max(8.0)
}

pub fn marker_color(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Alert => "#FF0000",
        EventStatus::Warning => "#FFA500",
        EventStatus::Safe => "#90EE90",
    }
}

pub fn marker_for(record: &EventRecord) -> MarkerSpec {
    MarkerSpec {
        id: record.id.clone(),
        latitude: record.latitude,
        longitude: record.longitude,
        radius: marker_radius(record.magnitude),
        color: marker_color(record.status),
        popup: format!(
            "M{:.1} - {}\nDepth: {:.1} km\n{}\nStatus: {}",
            record.magnitude,
            record.place,
            record.depth,
            record.time.format("%Y-%m-%d %H:%M:%S UTC"),
            record.status.as_str(),
        ),
    }
}

pub fn row_for(record: &EventRecord) -> TableRow {
    TableRow {
        id: record.id.clone(),
        place: record.place.clone(),
        magnitude: record.magnitude,
        depth: record.depth,
        time: record.time,
        status: record.status,
    }
}

/// Derive the full view state from the canonical event set. Pure: same
/// inputs, same projection.
pub fn project<'a>(
    events: impl Iterator<Item = &'a EventRecord>,
    filter: &ViewFilter,
    now: DateTime<Utc>,
) -> Projection {
    let mut visible: Vec<&EventRecord> = Vec::new();
    let mut stats_events: Vec<&EventRecord> = Vec::new();
    for record in events {
        if filter.matches(record, now) {
            visible.push(record);
        }
        if record.time >= now - Duration::days(1) {
            stats_events.push(record);
        }
    }

    visible.sort_by(|a, b| b.time.cmp(&a.time));

    Projection {
        markers: visible.iter().map(|r| marker_for(r)).collect(),
        rows: visible.iter().map(|r| row_for(r)).collect(),
        stats: stats_from(&stats_events, now),
    }
}

/// Stats always cover the last 24 hours regardless of the active window.
pub fn compute_stats<'a>(
    events: impl Iterator<Item = &'a EventRecord>,
    now: DateTime<Utc>,
) -> Statistics {
    let cutoff = now - Duration::days(1);
    let recent: Vec<&EventRecord> = events.filter(|r| r.time >= cutoff).collect();
    stats_from(&recent, now)
}

fn stats_from(recent: &[&EventRecord], now: DateTime<Utc>) -> Statistics {
    let total = recent.len();
    let avg = if total == 0 {
        0.0
    } else {
        let sum: f64 = recent.iter().map(|r| r.magnitude).sum();
        (sum / total as f64 * 100.0).round() / 100.0
    };
    Statistics {
        total_24h: total,
        avg_magnitude: avg,
        active_alerts: recent
            .iter()
            .filter(|r| r.status == EventStatus::Alert)
            .count(),
        last_update: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_event(id: &str, place: &str, magnitude: f64, time: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            place: place.to_string(),
            latitude: 35.0,
            longitude: 139.0,
            magnitude,
            depth: 10.0,
            time,
            status: EventStatus::for_magnitude(magnitude),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_window_boundaries() {
        // Events at now, now-2d, now-10d, now-40d against each window
        let now = now();
        let events = vec![
            make_event("now", "A", 1.0, now),
            make_event("2d", "B", 1.0, now - Duration::days(2)),
            make_event("10d", "C", 1.0, now - Duration::days(10)),
            make_event("40d", "D", 1.0, now - Duration::days(40)),
        ];

        let day = project(events.iter(), &ViewFilter::default(), now);
        assert_eq!(ids(&day), vec!["now"]);

        let week = project(
            events.iter(),
            &ViewFilter { window: TimeWindow::Week, search: String::new() },
            now,
        );
        assert_eq!(ids(&week), vec!["now", "2d"]);

        let month = project(
            events.iter(),
            &ViewFilter { window: TimeWindow::Month, search: String::new() },
            now,
        );
        assert_eq!(ids(&month), vec!["now", "2d", "10d"]);
    }

    #[test]
    fn test_month_window_is_calendar_based() {
        // March 15 minus one month is February 15, not a fixed 30 days
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let cutoff = TimeWindow::Month.cutoff(now);
        // chrono clamps 2024-02-31 to 2024-02-29
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let now = now();
        let events = vec![
            make_event("1", "Off the coast of Honshu, Japan", 1.0, now),
            make_event("2", "Southern California", 1.0, now),
        ];

        let filter = ViewFilter { window: TimeWindow::Day, search: "JAPAN".to_string() };
        let projection = project(events.iter(), &filter, now);
        assert_eq!(ids(&projection), vec!["1"]);

        // Empty query matches everything
        let all = project(events.iter(), &ViewFilter::default(), now);
        assert_eq!(all.rows.len(), 2);
    }

    #[test]
    fn test_rows_are_newest_first() {
        let now = now();
        let events = vec![
            make_event("old", "A", 1.0, now - Duration::hours(5)),
            make_event("new", "B", 1.0, now - Duration::hours(1)),
            make_event("mid", "C", 1.0, now - Duration::hours(3)),
        ];
        let projection = project(events.iter(), &ViewFilter::default(), now);
        assert_eq!(ids(&projection), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_marker_radius_has_floor() {
        assert_eq!(marker_radius(0.0), 8.0);
        assert_eq!(marker_radius(1.0), 8.0);
        assert_eq!(marker_radius(1.5), 8.0);
        assert_eq!(marker_radius(2.0), 10.0);
        assert_eq!(marker_radius(6.0), 30.0);
    }

    #[test]
    fn test_marker_colors_match_severity() {
        assert_eq!(marker_color(EventStatus::Alert), "#FF0000");
        assert_eq!(marker_color(EventStatus::Warning), "#FFA500");
        assert_eq!(marker_color(EventStatus::Safe), "#90EE90");
        // Unknown wire status degrades to safe, so it renders green
        assert_eq!(marker_color(EventStatus::from_wire("mystery")), "#90EE90");
    }

    #[test]
    fn test_stats_cover_last_24h_only() {
        let now = now();
        let events = vec![
            make_event("a", "A", 6.0, now - Duration::hours(1)), // alert
            make_event("b", "B", 2.0, now - Duration::hours(2)),
            make_event("c", "C", 8.0, now - Duration::days(3)), // outside 24h
        ];
        let stats = compute_stats(events.iter(), now);
        assert_eq!(stats.total_24h, 2);
        assert_eq!(stats.avg_magnitude, 4.0);
        assert_eq!(stats.active_alerts, 1);
        assert_eq!(stats.last_update, now);
    }

    #[test]
    fn test_stats_empty_set_is_zero() {
        let stats = compute_stats(std::iter::empty(), now());
        assert_eq!(stats.total_24h, 0);
        assert_eq!(stats.avg_magnitude, 0.0);
        assert_eq!(stats.active_alerts, 0);
    }

    #[test]
    fn test_stats_average_rounds_to_two_decimals() {
        let now = now();
        let events = vec![
            make_event("a", "A", 1.0, now),
            make_event("b", "B", 2.0, now),
            make_event("c", "C", 2.5, now),
        ];
        // 5.5 / 3 = 1.8333...
        let stats = compute_stats(events.iter(), now);
        assert_eq!(stats.avg_magnitude, 1.83);
    }

    #[test]
    fn test_stats_ignore_active_filter() {
        // Window and search scope the views, not the stats
        let now = now();
        let events = vec![make_event("a", "Alaska", 6.0, now - Duration::hours(1))];
        let filter = ViewFilter { window: TimeWindow::Day, search: "nomatch".to_string() };
        let projection = project(events.iter(), &filter, now);
        assert!(projection.rows.is_empty());
        assert_eq!(projection.stats.total_24h, 1);
    }

    #[test]
    fn test_bounds_fit_and_padding() {
        let now = now();
        let events = vec![
            make_event("a", "A", 1.0, now),
            EventRecord { latitude: 45.0, longitude: -120.0, ..make_event("b", "B", 1.0, now) },
        ];
        let projection = project(events.iter(), &ViewFilter::default(), now);
        let bounds = Bounds::around(&projection.markers).expect("non-empty");
        assert_eq!(bounds.min_lat, 35.0);
        assert_eq!(bounds.max_lat, 45.0);
        assert_eq!(bounds.min_lon, -120.0);
        assert_eq!(bounds.max_lon, 139.0);

        let padded = bounds.padded(0.1);
        assert_eq!(padded.min_lat, 34.0);
        assert_eq!(padded.max_lat, 46.0);

        // No markers: no bounds, viewport untouched
        assert!(Bounds::around(&[]).is_none());
    }

    fn ids(projection: &Projection) -> Vec<&str> {
        projection.rows.iter().map(|r| r.id.as_str()).collect()
    }
}
