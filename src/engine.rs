use crate::model::EventRecord;
use crate::projector::{self, Bounds, TimeWindow, ViewFilter};
use crate::store::{EventStore, UpsertSummary};
use crate::views::{MapView, RenderError, StatsView, TableView};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Owns the canonical store, the filter state, and the view surfaces.
/// Every mutation applies its store change and its view updates inside one
/// call, so callers holding the engine lock get atomic updates. Exactly one
/// projection recompute per call, however large the batch.
pub struct DashboardEngine {
    store: EventStore,
    filter: ViewFilter,
    map: Arc<dyn MapView>,
    table: Arc<dyn TableView>,
    stats: Arc<dyn StatsView>,
}

impl DashboardEngine {
    pub fn new(
        map: Arc<dyn MapView>,
        table: Arc<dyn TableView>,
        stats: Arc<dyn StatsView>,
    ) -> Self {
        Self {
            store: EventStore::new(),
            filter: ViewFilter::default(),
            map,
            table,
            stats,
        }
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn event_count(&self) -> usize {
        self.store.len()
    }

    /// Apply one snapshot batch: bulk upsert, then one full view refresh.
    pub fn apply_snapshot(
        &mut self,
        records: Vec<EventRecord>,
        now: DateTime<Utc>,
    ) -> UpsertSummary {
        let summary = self.store.upsert_many(records);
        log::info!(
            "📊 Snapshot applied: {} new, {} updated, {} total",
            summary.inserted,
            summary.replaced,
            self.store.len()
        );
        self.refresh_views(now);
        summary
    }

    /// Apply one live event. A genuinely new visible event is a delta
    /// (marker add + row prepend); a replacement re-renders fully so the
    /// table never shows the same id twice. Stats always recompute.
    pub fn apply_live_event(&mut self, record: EventRecord, now: DateTime<Utc>) {
        let visible = self.filter.matches(&record, now);
        let was_new = self.store.upsert_one(record.clone());

        if !was_new {
            self.refresh_views(now);
            return;
        }

        if visible {
            let projection = projector::project(self.store.iter(), &self.filter, now);
            report("map", self.map.add_marker(&projector::marker_for(&record)));
            report(
                "map",
                self.map.fit_to_markers(Bounds::around(&projection.markers)),
            );
            report("table", self.table.prepend_row(&projector::row_for(&record)));
            report("stats", self.stats.set_stats(&projection.stats));
        } else {
            let stats = projector::compute_stats(self.store.iter(), now);
            report("stats", self.stats.set_stats(&stats));
        }
    }

    pub fn set_time_window(&mut self, window: TimeWindow, now: DateTime<Utc>) {
        if self.filter.window != window {
            self.filter.window = window;
            log::info!("🔎 Time window: {}", window.label());
            self.refresh_views(now);
        }
    }

    pub fn set_search_query(&mut self, query: String, now: DateTime<Utc>) {
        if self.filter.search != query {
            self.filter.search = query;
            self.refresh_views(now);
        }
    }

    /// Full refresh of every surface from one projection. A failing surface
    /// is logged and skipped for this cycle; the others still update.
    fn refresh_views(&self, now: DateTime<Utc>) {
        let projection = projector::project(self.store.iter(), &self.filter, now);

        let map_ok = report("map", self.map.clear_markers());
        if map_ok {
            for marker in &projection.markers {
                if !report("map", self.map.add_marker(marker)) {
                    break;
                }
            }
            report("map", self.map.fit_to_markers(Bounds::around(&projection.markers)));
        }

        report("table", self.table.replace_all_rows(&projection.rows));
        report("stats", self.stats.set_stats(&projection.stats));
    }
}

fn report(surface: &str, result: Result<(), RenderError>) -> bool {
    if let Err(e) = result {
        log::warn!("⚠️ {} view render failed: {}", surface, e);
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventStatus;
    use crate::projector::{MarkerSpec, Statistics, TableRow};
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    /// In-memory view set that records what the engine pushed to it.
    #[derive(Default)]
    struct FakeViews {
        markers: Mutex<Vec<MarkerSpec>>,
        rows: Mutex<Vec<TableRow>>,
        stats: Mutex<Option<Statistics>>,
        viewport: Mutex<Option<Bounds>>,
        fail_map: Mutex<bool>,
    }

    impl MapView for FakeViews {
        fn add_marker(&self, marker: &MarkerSpec) -> Result<(), RenderError> {
            if *self.fail_map.lock().unwrap() {
                return Err(RenderError::Unavailable("map down".to_string()));
            }
            self.markers.lock().unwrap().push(marker.clone());
            Ok(())
        }

        fn clear_markers(&self) -> Result<(), RenderError> {
            if *self.fail_map.lock().unwrap() {
                return Err(RenderError::Unavailable("map down".to_string()));
            }
            self.markers.lock().unwrap().clear();
            Ok(())
        }

        fn fit_to_markers(&self, bounds: Option<Bounds>) -> Result<(), RenderError> {
            if let Some(b) = bounds {
                *self.viewport.lock().unwrap() = Some(b);
            }
            Ok(())
        }
    }

    impl TableView for FakeViews {
        fn prepend_row(&self, row: &TableRow) -> Result<(), RenderError> {
            self.rows.lock().unwrap().insert(0, row.clone());
            Ok(())
        }

        fn replace_all_rows(&self, rows: &[TableRow]) -> Result<(), RenderError> {
            *self.rows.lock().unwrap() = rows.to_vec();
            Ok(())
        }
    }

    impl StatsView for FakeViews {
        fn set_stats(&self, stats: &Statistics) -> Result<(), RenderError> {
            *self.stats.lock().unwrap() = Some(stats.clone());
            Ok(())
        }
    }

    fn make_engine() -> (DashboardEngine, Arc<FakeViews>) {
        let views = Arc::new(FakeViews::default());
        let engine = DashboardEngine::new(views.clone(), views.clone(), views.clone());
        (engine, views)
    }

    fn make_event(id: &str, magnitude: f64, time: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            place: format!("Region {}", id),
            latitude: 10.0,
            longitude: 20.0,
            magnitude,
            depth: 5.0,
            time,
            status: EventStatus::for_magnitude(magnitude),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_snapshot_refreshes_all_surfaces() {
        let (mut engine, views) = make_engine();
        let now = now();
        engine.apply_snapshot(
            vec![
                make_event("a", 2.0, now - Duration::hours(1)),
                make_event("b", 6.0, now - Duration::hours(2)),
            ],
            now,
        );

        assert_eq!(views.markers.lock().unwrap().len(), 2);
        let rows = views.rows.lock().unwrap();
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[1].id, "b");
        let stats = views.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.total_24h, 2);
        assert_eq!(stats.active_alerts, 1);
        assert!(views.viewport.lock().unwrap().is_some());
    }

    #[test]
    fn test_live_new_event_prepends() {
        let (mut engine, views) = make_engine();
        let now = now();
        engine.apply_snapshot(vec![make_event("a", 2.0, now - Duration::hours(3))], now);
        engine.apply_live_event(make_event("b", 3.0, now), now);

        let rows = views.rows.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "b");
        assert_eq!(views.markers.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_live_duplicate_id_does_not_duplicate_row() {
        let (mut engine, views) = make_engine();
        let now = now();
        engine.apply_snapshot(vec![make_event("a", 2.0, now - Duration::hours(1))], now);
        // Same id arrives over the live feed with an updated magnitude
        engine.apply_live_event(make_event("a", 2.5, now - Duration::hours(1)), now);

        let rows = views.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].magnitude, 2.5);
        assert_eq!(views.markers.lock().unwrap().len(), 1);
        assert_eq!(engine.event_count(), 1);
    }

    #[test]
    fn test_live_event_outside_filter_updates_stats_only() {
        let (mut engine, views) = make_engine();
        let now = now();
        engine.set_search_query("nowhere".to_string(), now);
        views.stats.lock().unwrap().take();

        engine.apply_live_event(make_event("a", 6.0, now), now);

        assert!(views.rows.lock().unwrap().is_empty());
        assert!(views.markers.lock().unwrap().is_empty());
        let stats = views.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.total_24h, 1);
        assert_eq!(stats.active_alerts, 1);
    }

    #[test]
    fn test_filter_change_rerenders() {
        let (mut engine, views) = make_engine();
        let now = now();
        engine.apply_snapshot(
            vec![
                make_event("recent", 2.0, now - Duration::hours(1)),
                make_event("older", 2.0, now - Duration::days(3)),
            ],
            now,
        );
        assert_eq!(views.rows.lock().unwrap().len(), 1);

        engine.set_time_window(TimeWindow::Week, now);
        assert_eq!(views.rows.lock().unwrap().len(), 2);

        engine.set_search_query("region recent".to_string(), now);
        let rows = views.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "recent");
    }

    #[test]
    fn test_failing_map_view_does_not_block_table_or_stats() {
        let (mut engine, views) = make_engine();
        let now = now();
        *views.fail_map.lock().unwrap() = true;

        engine.apply_snapshot(vec![make_event("a", 2.0, now)], now);

        assert!(views.markers.lock().unwrap().is_empty());
        assert_eq!(views.rows.lock().unwrap().len(), 1);
        assert!(views.stats.lock().unwrap().is_some());
    }
}
