//! Raw dataset shapes as served by the data table endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use super::bpm::BpmEncoding;
use super::{PlayMode, RadarType};

/// Song id → display title.
pub type TitleTable = HashMap<String, String>;

/// Song id → radar vectors for one play mode.
pub type RadarTable = HashMap<String, RawRadarEntry>;

/// Song id → chart info.
pub type ChartInfoTable = HashMap<String, RawChartInfo>;

/// An explicit `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One radar vector per radar type, one slot per difficulty tier.
/// Missing vectors and null slots read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRadarEntry {
    #[serde(rename = "NOTES", deserialize_with = "null_as_default")]
    pub notes: Vec<Option<f64>>,
    #[serde(rename = "PEAK", deserialize_with = "null_as_default")]
    pub peak: Vec<Option<f64>>,
    #[serde(rename = "SCRATCH", deserialize_with = "null_as_default")]
    pub scratch: Vec<Option<f64>>,
    #[serde(rename = "SOFLAN", deserialize_with = "null_as_default")]
    pub soflan: Vec<Option<f64>>,
    #[serde(rename = "CHARGE", deserialize_with = "null_as_default")]
    pub charge: Vec<Option<f64>>,
    #[serde(rename = "CHORD", deserialize_with = "null_as_default")]
    pub chord: Vec<Option<f64>>,
}

impl RawRadarEntry {
    pub fn vector(&self, kind: RadarType) -> &[Option<f64>] {
        match kind {
            RadarType::Notes => &self.notes,
            RadarType::Peak => &self.peak,
            RadarType::Scratch => &self.scratch,
            RadarType::Soflan => &self.soflan,
            RadarType::Charge => &self.charge,
            RadarType::Chord => &self.chord,
        }
    }

    /// Value at a difficulty slot, zero when absent.
    pub fn value(&self, kind: RadarType, index: usize) -> f64 {
        self.vector(kind).get(index).copied().flatten().unwrap_or(0.0)
    }
}

/// Per-mode table of five integers (levels or note counts).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModeTable {
    #[serde(deserialize_with = "null_as_default")]
    pub sp: Vec<Option<u32>>,
    #[serde(deserialize_with = "null_as_default")]
    pub dp: Vec<Option<u32>>,
}

impl ModeTable {
    pub fn get(&self, mode: PlayMode, index: usize) -> u32 {
        let slots = match mode {
            PlayMode::Single => &self.sp,
            PlayMode::Double => &self.dp,
        };
        slots.get(index).copied().flatten().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawChartInfo {
    pub bpm: Option<BpmEncoding>,
    #[serde(deserialize_with = "null_as_default")]
    pub level: ModeTable,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: ModeTable,
    // Availability flags; carried for completeness, unused by the catalog.
    #[serde(deserialize_with = "null_as_default")]
    pub in_ac: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub in_inf: bool,
}

/// The four datasets a catalog is built from.
#[derive(Debug, Clone, Default)]
pub struct RawDatasets {
    pub titles: TitleTable,
    pub sp_radar: RadarTable,
    pub dp_radar: RadarTable,
    pub chart_info: ChartInfoTable,
}

impl RawDatasets {
    pub fn radar(&self, mode: PlayMode) -> &RadarTable {
        match mode {
            PlayMode::Single => &self.sp_radar,
            PlayMode::Double => &self.dp_radar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radar_entry_tolerates_missing_and_null() {
        let json = r#"{"NOTES": [1.5, null, 3.0], "PEAK": [0, 0, 0, 0, 0]}"#;
        let e: RawRadarEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.value(RadarType::Notes, 0), 1.5);
        assert_eq!(e.value(RadarType::Notes, 1), 0.0);
        assert_eq!(e.value(RadarType::Notes, 4), 0.0);
        assert_eq!(e.value(RadarType::Chord, 2), 0.0);
    }

    #[test]
    fn test_chart_info_deserialize() {
        let json = r#"{
            "bpm": 150,
            "level": {"sp": [3, 6, 9, 12, 0], "dp": [4, 7, 10, 12, 0]},
            "notes": {"sp": [300, 600, 900, 1200, 0], "dp": [310, 610, 910, 1210, 0]},
            "in_ac": true,
            "in_inf": false
        }"#;
        let info: RawChartInfo = serde_json::from_str(json).unwrap();
        assert!(info.bpm.is_some());
        assert_eq!(info.level.get(PlayMode::Single, 3), 12);
        assert_eq!(info.notes.get(PlayMode::Double, 2), 910);
        assert!(info.in_ac);
    }

    #[test]
    fn test_chart_info_missing_fields_default() {
        let info: RawChartInfo = serde_json::from_str("{}").unwrap();
        assert!(info.bpm.is_none());
        assert_eq!(info.level.get(PlayMode::Double, 4), 0);
    }

    #[test]
    fn test_null_radar_vector_reads_as_zero() {
        let json = r#"{"1": {"NOTES": null, "PEAK": [1, 0, 0, 0, 0]}}"#;
        let table: RadarTable = serde_json::from_str(json).unwrap();
        let e = &table["1"];
        assert_eq!(e.value(RadarType::Notes, 0), 0.0);
        assert_eq!(e.value(RadarType::Peak, 0), 1.0);
    }

    #[test]
    fn test_null_tables_and_flags_default() {
        let json = r#"{
            "bpm": null,
            "level": null,
            "notes": {"sp": null, "dp": [310, null, 910, 1210, 0]},
            "in_ac": null,
            "in_inf": null
        }"#;
        let info: RawChartInfo = serde_json::from_str(json).unwrap();
        assert!(info.bpm.is_none());
        assert_eq!(info.level.get(PlayMode::Single, 3), 0);
        assert_eq!(info.notes.get(PlayMode::Single, 0), 0);
        assert_eq!(info.notes.get(PlayMode::Double, 0), 310);
        assert_eq!(info.notes.get(PlayMode::Double, 1), 0);
        assert!(!info.in_ac);
        assert!(!info.in_inf);
    }
}
