//! Catalog filtering.
//!
//! A [`FilterSpec`] is the user-editable filter state. Before a pass it is
//! compiled into a [`CompiledFilter`] (search text lowercased, string bounds
//! parsed), then every record is tested once against all predicates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{ChartData, Difficulty, PlayMode, RadarType};

pub const LEVEL_MIN: u32 = 1;
pub const LEVEL_MAX: u32 = 12;
pub const RADAR_MIN: f64 = 0.0;
pub const RADAR_MAX: f64 = 200.0;

/// Inclusive numeric range for one radar dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarRange {
    pub min: f64,
    pub max: f64,
}

impl Default for RadarRange {
    fn default() -> Self {
        Self { min: RADAR_MIN, max: RADAR_MAX }
    }
}

impl RadarRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-dimension radar ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarFilters {
    pub notes: RadarRange,
    pub peak: RadarRange,
    pub scratch: RadarRange,
    pub soflan: RadarRange,
    pub charge: RadarRange,
    pub chord: RadarRange,
}

impl RadarFilters {
    pub fn get(&self, kind: RadarType) -> RadarRange {
        match kind {
            RadarType::Notes => self.notes,
            RadarType::Peak => self.peak,
            RadarType::Scratch => self.scratch,
            RadarType::Soflan => self.soflan,
            RadarType::Charge => self.charge,
            RadarType::Chord => self.chord,
        }
    }

    pub fn get_mut(&mut self, kind: RadarType) -> &mut RadarRange {
        match kind {
            RadarType::Notes => &mut self.notes,
            RadarType::Peak => &mut self.peak,
            RadarType::Scratch => &mut self.scratch,
            RadarType::Soflan => &mut self.soflan,
            RadarType::Charge => &mut self.charge,
            RadarType::Chord => &mut self.chord,
        }
    }
}

/// User filter state. String bounds are kept as typed; empty means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    pub search_text: String,
    #[serde(deserialize_with = "crate::prefs::lenient_set")]
    pub difficulties: BTreeSet<Difficulty>,
    pub level_min: u32,
    pub level_max: u32,
    pub bpm_min: String,
    pub bpm_max: String,
    pub notes_min: String,
    pub notes_max: String,
    pub radar_filters: RadarFilters,
    pub radar_filter_expanded: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            difficulties: Difficulty::ALL.into_iter().collect(),
            level_min: LEVEL_MIN,
            level_max: LEVEL_MAX,
            bpm_min: String::new(),
            bpm_max: String::new(),
            notes_min: String::new(),
            notes_max: String::new(),
            radar_filters: RadarFilters::default(),
            radar_filter_expanded: false,
        }
    }
}

impl FilterSpec {
    pub fn compile(&self, mode: PlayMode) -> CompiledFilter<'_> {
        CompiledFilter {
            mode,
            search: self.search_text.to_lowercase(),
            difficulties: &self.difficulties,
            level: (self.level_min, self.level_max),
            bpm_min: parse_bound(&self.bpm_min),
            bpm_max: parse_bound(&self.bpm_max),
            notes_min: parse_bound(&self.notes_min),
            notes_max: parse_bound(&self.notes_max),
            radar: self.radar_filters,
        }
    }
}

/// Parse a user-typed bound. Empty or non-numeric text is unbounded.
pub fn parse_bound(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            log::debug!("Ignoring non-numeric filter bound '{trimmed}'");
            None
        }
    }
}

/// A [`FilterSpec`] prepared for one evaluation pass.
#[derive(Debug)]
pub struct CompiledFilter<'a> {
    mode: PlayMode,
    search: String,
    difficulties: &'a BTreeSet<Difficulty>,
    level: (u32, u32),
    bpm_min: Option<f64>,
    bpm_max: Option<f64>,
    notes_min: Option<f64>,
    notes_max: Option<f64>,
    radar: RadarFilters,
}

impl CompiledFilter<'_> {
    pub fn matches(&self, chart: &ChartData) -> bool {
        if chart.play_mode != self.mode {
            return false;
        }

        if !self.search.is_empty() && !chart.title_folded.contains(&self.search) {
            return false;
        }

        if !self.difficulties.contains(&chart.difficulty) {
            return false;
        }

        if chart.level < self.level.0 || chart.level > self.level.1 {
            return false;
        }

        // Overlap, not containment: a variable-tempo chart passes when any
        // part of its range intersects the requested one.
        if self.bpm_min.is_some() || self.bpm_max.is_some() {
            let (chart_min, chart_max) = chart.bpm_bounds();
            if self.bpm_min.is_some_and(|lo| chart_max < lo) {
                return false;
            }
            if self.bpm_max.is_some_and(|hi| chart_min > hi) {
                return false;
            }
        }

        let notes = f64::from(chart.note_count);
        if self.notes_min.is_some_and(|lo| notes < lo) || self.notes_max.is_some_and(|hi| notes > hi) {
            return false;
        }

        RadarType::ALL
            .iter()
            .all(|&kind| self.radar.get(kind).contains(chart.radar.get(kind)))
    }
}

/// Records matching `spec` in `mode`, in their original relative order.
pub fn apply<'a>(charts: &'a [ChartData], spec: &FilterSpec, mode: PlayMode) -> Vec<&'a ChartData> {
    let compiled = spec.compile(mode);
    charts.iter().filter(|c| compiled.matches(c)).collect()
}
