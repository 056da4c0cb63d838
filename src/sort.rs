use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{ChartData, RadarType};

/// A catalog table column. Also the sort key for that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnId {
    Title,
    Difficulty,
    Level,
    Bpm,
    NoteCount,
    Notes,
    Peak,
    Scratch,
    Soflan,
    Charge,
    Chord,
}

impl ColumnId {
    /// Table order.
    pub const ALL: [ColumnId; 11] = [
        ColumnId::Title,
        ColumnId::Difficulty,
        ColumnId::Level,
        ColumnId::Bpm,
        ColumnId::NoteCount,
        ColumnId::Notes,
        ColumnId::Peak,
        ColumnId::Scratch,
        ColumnId::Soflan,
        ColumnId::Charge,
        ColumnId::Chord,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Difficulty => "difficulty",
            Self::Level => "level",
            Self::Bpm => "bpm",
            Self::NoteCount => "noteCount",
            Self::Notes => "notes",
            Self::Peak => "peak",
            Self::Scratch => "scratch",
            Self::Soflan => "soflan",
            Self::Charge => "charge",
            Self::Chord => "chord",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Difficulty => "Diff",
            Self::Level => "Lv",
            Self::Bpm => "BPM",
            Self::NoteCount => "Notes#",
            other => other.radar().map(RadarType::label).unwrap_or(""),
        }
    }

    pub fn radar(self) -> Option<RadarType> {
        match self {
            Self::Notes => Some(RadarType::Notes),
            Self::Peak => Some(RadarType::Peak),
            Self::Scratch => Some(RadarType::Scratch),
            Self::Soflan => Some(RadarType::Soflan),
            Self::Charge => Some(RadarType::Charge),
            Self::Chord => Some(RadarType::Chord),
            _ => None,
        }
    }

    /// Display text of this column for one chart.
    pub fn cell_text(self, chart: &ChartData) -> String {
        match self {
            Self::Title => chart.title.clone(),
            Self::Difficulty => chart.difficulty.short(chart.play_mode),
            Self::Level => chart.level.to_string(),
            Self::Bpm => chart.bpm.clone(),
            Self::NoteCount => chart.note_count.to_string(),
            radar_column => radar_column
                .radar()
                .map(|kind| format!("{:.2}", chart.radar.get(kind)))
                .unwrap_or_default(),
        }
    }

    /// Compare two charts on this column, ascending.
    pub fn compare(self, a: &ChartData, b: &ChartData) -> Ordering {
        match self {
            Self::Title => compare_folded(&a.title, &b.title),
            Self::Difficulty => a.difficulty.cmp(&b.difficulty),
            Self::Level => a.level.cmp(&b.level),
            Self::NoteCount => a.note_count.cmp(&b.note_count),
            Self::Bpm => compare_bpm(a.bpm_range, b.bpm_range),
            radar_column => match radar_column.radar() {
                Some(kind) => a.radar.get(kind).total_cmp(&b.radar.get(kind)),
                None => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.id().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown column '{s}'"))
    }
}

/// Case-insensitive comparison without allocating.
fn compare_folded(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Known tempos by (min, max); unknown tempo after every known one.
fn compare_bpm(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub id: ColumnId,
    pub desc: bool,
}

impl SortKey {
    pub fn asc(id: ColumnId) -> Self {
        Self { id, desc: false }
    }

    pub fn desc(id: ColumnId) -> Self {
        Self { id, desc: true }
    }
}

/// Ordered sort keys, primary first. Empty means unsorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(#[serde(deserialize_with = "lenient_keys")] pub Vec<SortKey>);

impl Default for SortSpec {
    fn default() -> Self {
        Self(vec![SortKey::asc(ColumnId::Title)])
    }
}

impl SortSpec {
    pub fn unsorted() -> Self {
        Self(Vec::new())
    }

    pub fn primary(&self) -> Option<SortKey> {
        self.0.first().copied()
    }

    /// Direction of `column` if it is the active sort.
    pub fn direction_of(&self, column: ColumnId) -> Option<bool> {
        self.primary().filter(|k| k.id == column).map(|k| k.desc)
    }

    /// Header click: ascending → descending → unsorted. Replaces the active sort.
    pub fn toggled(&self, column: ColumnId) -> Self {
        match self.direction_of(column) {
            Some(false) => Self(vec![SortKey::desc(column)]),
            Some(true) => Self::unsorted(),
            None => Self(vec![SortKey::asc(column)]),
        }
    }

    pub fn compare(&self, a: &ChartData, b: &ChartData) -> Ordering {
        for key in &self.0 {
            let ord = key.id.compare(a, b);
            let ord = if key.desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Drop keys naming columns this build does not know.
fn lenient_keys<'de, D>(deserializer: D) -> Result<Vec<SortKey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<Value> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<SortKey>(v) {
            Ok(key) => Some(key),
            Err(e) => {
                log::warn!("Dropping stored sort key: {e}");
                None
            }
        })
        .collect())
}

/// Stable in-place sort; ties beyond every key keep the incoming order.
pub fn sort(rows: &mut [&ChartData], spec: &SortSpec) {
    if spec.0.is_empty() {
        return;
    }
    rows.sort_by(|a, b| spec.compare(a, b));
}
