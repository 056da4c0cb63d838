use super::raw::RawRadarEntry;
use super::{RadarData, RadarType};

/// Extract the radar values for one difficulty slot.
///
/// Returns `None` when the entry is absent or every value at the slot is
/// exactly zero; that is how the datasets mark a chart that does not exist.
pub fn extract(entry: Option<&RawRadarEntry>, difficulty_index: usize) -> Option<RadarData> {
    let entry = entry?;
    let radar = RadarData {
        notes: entry.value(RadarType::Notes, difficulty_index),
        peak: entry.value(RadarType::Peak, difficulty_index),
        scratch: entry.value(RadarType::Scratch, difficulty_index),
        soflan: entry.value(RadarType::Soflan, difficulty_index),
        charge: entry.value(RadarType::Charge, difficulty_index),
        chord: entry.value(RadarType::Chord, difficulty_index),
    };

    if radar.is_empty() { None } else { Some(radar) }
}
