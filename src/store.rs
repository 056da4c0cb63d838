//! Application state stores.
//!
//! Each concern (catalog, filter, sort, columns) lives in its own [`Store`].
//! Readers take an immutable snapshot; writers dispatch a named action that
//! produces the next snapshot, which replaces the current one wholesale.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{self, ChartData, Difficulty, PlayMode, RadarType};
use crate::filter::{self, FilterSpec, RadarRange};
use crate::sort::{self, ColumnId, SortSpec};
use crate::source::{DatasetSource, FetchError};

/// State that changes only through named actions.
pub trait Reducer: Sized {
    type Action;
    fn reduce(&self, action: Self::Action) -> Self;
}

/// Holder of one immutable state snapshot.
#[derive(Debug)]
pub struct Store<S> {
    state: Arc<S>,
    revision: u64,
}

impl<S: Reducer + PartialEq> Store<S> {
    pub fn new(initial: S) -> Self {
        Self { state: Arc::new(initial), revision: 0 }
    }

    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.state)
    }

    pub fn get(&self) -> &S {
        &self.state
    }

    /// Bumped on every change; lets views skip recomputation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&mut self, action: S::Action) -> bool {
        let next = self.state.reduce(action);
        if next == *self.state {
            return false;
        }
        self.state = Arc::new(next);
        self.revision += 1;
        true
    }
}

impl<S: Reducer + PartialEq + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

/// Loaded records plus load status and the active play mode.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub charts: Arc<Vec<ChartData>>,
    pub loading: bool,
    pub error: Option<String>,
    pub play_mode: PlayMode,
    pub loaded_at: Option<DateTime<Utc>>,
}

// Record sets are compared by identity; each refresh installs a new one.
impl PartialEq for CatalogState {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.charts, &other.charts)
            && self.loading == other.loading
            && self.error == other.error
            && self.play_mode == other.play_mode
            && self.loaded_at == other.loaded_at
    }
}

#[derive(Debug)]
pub enum CatalogAction {
    SetPlayMode(PlayMode),
    TogglePlayMode,
    RefreshStarted,
    RefreshSucceeded { charts: Vec<ChartData>, at: DateTime<Utc> },
    RefreshFailed(String),
}

impl Reducer for CatalogState {
    type Action = CatalogAction;

    fn reduce(&self, action: CatalogAction) -> Self {
        let mut next = self.clone();
        match action {
            CatalogAction::SetPlayMode(mode) => next.play_mode = mode,
            CatalogAction::TogglePlayMode => next.play_mode = self.play_mode.toggled(),
            CatalogAction::RefreshStarted => {
                next.loading = true;
                next.error = None;
            }
            CatalogAction::RefreshSucceeded { charts, at } => {
                next.charts = Arc::new(charts);
                next.loading = false;
                next.loaded_at = Some(at);
            }
            // Previously loaded records stay in place.
            CatalogAction::RefreshFailed(message) => {
                next.loading = false;
                next.error = Some(message);
            }
        }
        next
    }
}

/// Fetch and aggregate a fresh record set, installing it only on success.
pub fn refresh(
    catalog: &mut Store<CatalogState>,
    source: &dyn DatasetSource,
) -> Result<usize, FetchError> {
    catalog.dispatch(CatalogAction::RefreshStarted);
    log::info!("Loading datasets from {}", source.describe());

    match source.fetch_all() {
        Ok(raw) => {
            let charts = catalog::aggregate(&raw);
            let count = charts.len();
            catalog.dispatch(CatalogAction::RefreshSucceeded { charts, at: Utc::now() });
            Ok(count)
        }
        Err(e) => {
            log::warn!("Refresh failed: {e}");
            catalog.dispatch(CatalogAction::RefreshFailed(e.to_string()));
            Err(e)
        }
    }
}

#[derive(Debug, Clone)]
pub enum FilterAction {
    SetSearchText(String),
    ToggleDifficulty(Difficulty),
    SetDifficulties(BTreeSet<Difficulty>),
    SetLevelRange(u32, u32),
    SetBpmRange(String, String),
    SetNotesRange(String, String),
    SetRadarRange(RadarType, RadarRange),
    ToggleRadarExpanded,
    Reset,
}

impl Reducer for FilterSpec {
    type Action = FilterAction;

    fn reduce(&self, action: FilterAction) -> Self {
        let mut next = self.clone();
        match action {
            FilterAction::SetSearchText(text) => next.search_text = text,
            FilterAction::ToggleDifficulty(d) => {
                if !next.difficulties.remove(&d) {
                    next.difficulties.insert(d);
                }
            }
            FilterAction::SetDifficulties(set) => next.difficulties = set,
            FilterAction::SetLevelRange(min, max) => {
                next.level_min = min;
                next.level_max = max;
            }
            FilterAction::SetBpmRange(min, max) => {
                next.bpm_min = min;
                next.bpm_max = max;
            }
            FilterAction::SetNotesRange(min, max) => {
                next.notes_min = min;
                next.notes_max = max;
            }
            FilterAction::SetRadarRange(kind, range) => *next.radar_filters.get_mut(kind) = range,
            FilterAction::ToggleRadarExpanded => {
                next.radar_filter_expanded = !next.radar_filter_expanded;
            }
            FilterAction::Reset => return FilterSpec::default(),
        }
        next
    }
}

#[derive(Debug, Clone)]
pub enum SortAction {
    Set(SortSpec),
    ToggleColumn(ColumnId),
    Reset,
}

impl Reducer for SortSpec {
    type Action = SortAction;

    fn reduce(&self, action: SortAction) -> Self {
        match action {
            SortAction::Set(spec) => spec,
            SortAction::ToggleColumn(column) => self.toggled(column),
            SortAction::Reset => SortSpec::default(),
        }
    }
}

/// Columns currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnVisibility {
    #[serde(deserialize_with = "crate::prefs::lenient_set")]
    pub visible_columns: BTreeSet<ColumnId>,
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self::preset(false)
    }
}

impl ColumnVisibility {
    /// Every column, or the compact set (no BPM / note count) for narrow screens.
    pub fn preset(compact: bool) -> Self {
        let visible_columns = ColumnId::ALL
            .into_iter()
            .filter(|c| !compact || !matches!(c, ColumnId::Bpm | ColumnId::NoteCount))
            .collect();
        Self { visible_columns }
    }

    pub fn is_visible(&self, column: ColumnId) -> bool {
        self.visible_columns.contains(&column)
    }

    /// Visible columns in table order.
    pub fn ordered(&self) -> Vec<ColumnId> {
        ColumnId::ALL.into_iter().filter(|c| self.is_visible(*c)).collect()
    }
}

#[derive(Debug, Clone)]
pub enum ColumnAction {
    Toggle(ColumnId),
    SetVisible(ColumnId, bool),
    Reset { compact: bool },
}

impl Reducer for ColumnVisibility {
    type Action = ColumnAction;

    fn reduce(&self, action: ColumnAction) -> Self {
        let mut next = self.clone();
        match action {
            ColumnAction::Toggle(c) => {
                if !next.visible_columns.remove(&c) {
                    next.visible_columns.insert(c);
                }
            }
            ColumnAction::SetVisible(c, true) => {
                next.visible_columns.insert(c);
            }
            ColumnAction::SetVisible(c, false) => {
                next.visible_columns.remove(&c);
            }
            ColumnAction::Reset { compact } => return Self::preset(compact),
        }
        next
    }
}

/// All stores of one session.
#[derive(Debug, Default)]
pub struct Stores {
    pub catalog: Store<CatalogState>,
    pub filter: Store<FilterSpec>,
    pub sort: Store<SortSpec>,
    pub columns: Store<ColumnVisibility>,
}

impl Stores {
    fn stamp(&self) -> (u64, u64, u64) {
        (self.catalog.revision(), self.filter.revision(), self.sort.revision())
    }
}

/// Filtered, sorted row order over the current record set.
///
/// Rows are indices into the catalog's record vector and are recomputed in
/// full whenever any input store changes.
#[derive(Debug, Default)]
pub struct RowView {
    charts: Arc<Vec<ChartData>>,
    rows: Vec<usize>,
    stamp: Option<(u64, u64, u64)>,
}

impl RowView {
    /// Recompute if any input changed. Returns whether it did.
    pub fn sync(&mut self, stores: &Stores) -> bool {
        let stamp = stores.stamp();
        if self.stamp == Some(stamp) {
            return false;
        }
        let catalog = stores.catalog.snapshot();
        self.charts = Arc::clone(&catalog.charts);
        self.rows = compute_rows(&self.charts, stores.filter.get(), stores.sort.get(), catalog.play_mode);
        self.stamp = Some(stamp);
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ChartData> {
        self.rows.get(row).map(|&i| &self.charts[i])
    }

    pub fn slice(&self, range: std::ops::Range<usize>) -> impl Iterator<Item = (usize, &ChartData)> {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        self.rows[start..end]
            .iter()
            .enumerate()
            .map(move |(offset, &i)| (start + offset, &self.charts[i]))
    }

    pub fn all(&self) -> Vec<&ChartData> {
        self.rows.iter().map(|&i| &self.charts[i]).collect()
    }
}

/// Filter then stable-sort, as indices into `charts`.
pub fn compute_rows(charts: &[ChartData], filter: &FilterSpec, sort: &SortSpec, mode: PlayMode) -> Vec<usize> {
    let compiled = filter.compile(mode);
    let mut rows: Vec<usize> = charts
        .iter()
        .enumerate()
        .filter(|(_, c)| compiled.matches(c))
        .map(|(i, _)| i)
        .collect();
    if !sort.0.is_empty() {
        rows.sort_by(|&a, &b| sort.compare(&charts[a], &charts[b]));
    }
    rows
}

/// Filter then sort, as references. Convenience for one-shot callers.
pub fn query<'a>(charts: &'a [ChartData], filter: &FilterSpec, sort_spec: &SortSpec, mode: PlayMode) -> Vec<&'a ChartData> {
    let mut rows = filter::apply(charts, filter, mode);
    sort::sort(&mut rows, sort_spec);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::raw::{RawDatasets, RawRadarEntry};
    use crate::catalog::RadarData;

    struct FixedSource(Option<RawDatasets>);

    impl DatasetSource for FixedSource {
        fn describe(&self) -> String {
            "fixture".into()
        }

        fn fetch_all(&self) -> Result<RawDatasets, FetchError> {
            match &self.0 {
                Some(raw) => Ok(raw.clone()),
                None => Err(FetchError::Io {
                    path: "fixture".into(),
                    source: std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
                }),
            }
        }
    }

    fn end_to_end_raw() -> RawDatasets {
        let mut raw = RawDatasets::default();
        raw.titles.insert("1".into(), "Song A".into());
        raw.sp_radar.insert(
            "1".into(),
            RawRadarEntry {
                notes: vec![Some(0.0), Some(0.0), Some(5.0), Some(0.0), Some(0.0)],
                peak: vec![Some(0.0); 5],
                scratch: vec![Some(0.0); 5],
                soflan: vec![Some(0.0); 5],
                charge: vec![Some(0.0); 5],
                chord: vec![Some(0.0); 5],
            },
        );
        raw
    }

    #[test]
    fn test_dispatch_replaces_snapshot() {
        let mut store = Store::new(FilterSpec::default());
        let before = store.snapshot();
        assert!(store.dispatch(FilterAction::SetSearchText("abc".into())));
        assert_eq!(before.search_text, "");
        assert_eq!(store.get().search_text, "abc");
        assert_eq!(store.revision(), 1);
        // No-op actions do not bump the revision.
        assert!(!store.dispatch(FilterAction::SetSearchText("abc".into())));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_toggle_difficulty() {
        let mut store = Store::new(FilterSpec::default());
        store.dispatch(FilterAction::ToggleDifficulty(Difficulty::Beginner));
        assert!(!store.get().difficulties.contains(&Difficulty::Beginner));
        store.dispatch(FilterAction::ToggleDifficulty(Difficulty::Beginner));
        assert_eq!(store.get().difficulties.len(), 5);
    }

    #[test]
    fn test_filter_reset() {
        let mut store = Store::new(FilterSpec::default());
        store.dispatch(FilterAction::SetLevelRange(10, 12));
        store.dispatch(FilterAction::SetRadarRange(RadarType::Peak, RadarRange { min: 50.0, max: 80.0 }));
        store.dispatch(FilterAction::Reset);
        assert_eq!(*store.get(), FilterSpec::default());
    }

    #[test]
    fn test_column_toggle_and_preset() {
        let mut store = Store::new(ColumnVisibility::default());
        store.dispatch(ColumnAction::Toggle(ColumnId::Bpm));
        assert!(!store.get().is_visible(ColumnId::Bpm));
        store.dispatch(ColumnAction::SetVisible(ColumnId::Bpm, true));
        assert!(store.get().is_visible(ColumnId::Bpm));
        store.dispatch(ColumnAction::Reset { compact: true });
        assert_eq!(store.get().ordered().len(), 9);
    }

    #[test]
    fn test_refresh_installs_records() {
        let mut catalog = Store::new(CatalogState::default());
        let count = refresh(&mut catalog, &FixedSource(Some(end_to_end_raw()))).unwrap();
        assert_eq!(count, 1);
        let state = catalog.get();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert!(state.loaded_at.is_some());
    }

    #[test]
    fn test_initial_refresh_failure_leaves_empty_errored_state() {
        let mut catalog = Store::new(CatalogState::default());
        assert!(refresh(&mut catalog, &FixedSource(None)).is_err());
        let state = catalog.get();
        assert!(state.charts.is_empty());
        assert!(state.error.as_deref().unwrap().contains("timed out"));
        assert!(!state.loading);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_records() {
        let mut catalog = Store::new(CatalogState::default());
        refresh(&mut catalog, &FixedSource(Some(end_to_end_raw()))).unwrap();
        assert!(refresh(&mut catalog, &FixedSource(None)).is_err());
        assert_eq!(catalog.get().charts.len(), 1);
        assert!(catalog.get().error.is_some());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut stores = Stores::default();
        refresh(&mut stores.catalog, &FixedSource(Some(end_to_end_raw()))).unwrap();

        let charts = stores.catalog.get().charts.clone();
        assert_eq!(charts.len(), 1);
        let chart = &charts[0];
        assert_eq!(chart.song_id, "1");
        assert_eq!(chart.play_mode, PlayMode::Single);
        assert_eq!(chart.difficulty, Difficulty::Hyper);
        assert_eq!(chart.radar, RadarData { notes: 5.0, ..Default::default() });

        stores.filter.dispatch(FilterAction::SetDifficulties([Difficulty::Hyper].into_iter().collect()));
        stores.filter.dispatch(FilterAction::SetLevelRange(0, 12));

        let mut view = RowView::default();
        assert!(view.sync(&stores));
        assert_eq!(view.len(), 1);
        assert!(!view.sync(&stores));

        stores.catalog.dispatch(CatalogAction::SetPlayMode(PlayMode::Double));
        assert!(view.sync(&stores));
        assert!(view.is_empty());
    }

    #[test]
    fn test_compute_rows_matches_query() {
        let mut stores = Stores::default();
        refresh(&mut stores.catalog, &FixedSource(Some(end_to_end_raw()))).unwrap();
        let charts = stores.catalog.get().charts.clone();
        let filter = FilterSpec { level_min: 0, ..Default::default() };
        let by_index = compute_rows(&charts, &filter, &SortSpec::default(), PlayMode::Single);
        let by_ref = query(&charts, &filter, &SortSpec::default(), PlayMode::Single);
        assert_eq!(by_index.len(), by_ref.len());
        assert_eq!(by_index.len(), 1);
    }

    #[test]
    fn test_row_view_slice_clamps() {
        let mut stores = Stores::default();
        refresh(&mut stores.catalog, &FixedSource(Some(end_to_end_raw()))).unwrap();
        stores.filter.dispatch(FilterAction::SetLevelRange(0, 12));
        let mut view = RowView::default();
        view.sync(&stores);
        let rows: Vec<_> = view.slice(0..50).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 0);
        assert_eq!(view.slice(5..10).count(), 0);
    }
}
