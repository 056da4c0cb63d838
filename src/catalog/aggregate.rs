use std::collections::BTreeSet;

use super::raw::RawDatasets;
use super::{bpm, radar, ChartData, Difficulty, PlayMode};

/// Merge the four raw datasets into one row per existing chart.
///
/// Every song id that appears in any dataset is visited. A chart exists when
/// its radar slot is non-empty; titles, levels, note counts and BPM are then
/// filled from whatever the other datasets provide.
pub fn aggregate(raw: &RawDatasets) -> Vec<ChartData> {
    let song_ids: BTreeSet<&str> = raw
        .titles
        .keys()
        .chain(raw.sp_radar.keys())
        .chain(raw.dp_radar.keys())
        .chain(raw.chart_info.keys())
        .map(String::as_str)
        .collect();

    let mut charts = Vec::new();
    let mut placeholder_titles = 0usize;

    for song_id in song_ids {
        let title = match raw.titles.get(song_id) {
            Some(t) => t.clone(),
            None => {
                placeholder_titles += 1;
                format!("Unknown ({song_id})")
            }
        };
        let info = raw.chart_info.get(song_id);

        for mode in PlayMode::ALL {
            let radar_entry = raw.radar(mode).get(song_id);

            for difficulty in Difficulty::ALL {
                let idx = difficulty.index();
                let Some(radar) = radar::extract(radar_entry, idx) else {
                    continue;
                };

                let (level, note_count, bpm) = match info {
                    Some(info) => (
                        info.level.get(mode, idx),
                        info.notes.get(mode, idx),
                        info.bpm
                            .as_ref()
                            .map(|b| b.format(mode, idx))
                            .unwrap_or_else(|| bpm::UNKNOWN.to_string()),
                    ),
                    None => (0, 0, bpm::UNKNOWN.to_string()),
                };

                charts.push(ChartData::new(
                    song_id,
                    title.clone(),
                    mode,
                    difficulty,
                    level,
                    note_count,
                    bpm,
                    radar,
                ));
            }
        }
    }

    if placeholder_titles > 0 {
        log::debug!("{placeholder_titles} songs have no title entry, using placeholders");
    }
    log::info!("Aggregated {} charts", charts.len());
    charts
}
