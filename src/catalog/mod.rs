pub mod aggregate;
pub mod bpm;
pub mod radar;
pub mod raw;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use aggregate::aggregate;

/// Keyboard configuration a chart is played on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayMode {
    #[default]
    #[serde(rename = "SP")]
    Single,
    #[serde(rename = "DP")]
    Double,
}

impl PlayMode {
    pub const ALL: [PlayMode; 2] = [PlayMode::Single, PlayMode::Double];

    pub fn code(self) -> &'static str {
        match self {
            Self::Single => "SP",
            Self::Double => "DP",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Single => Self::Double,
            Self::Double => Self::Single,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SP" => Ok(Self::Single),
            "DP" => Ok(Self::Double),
            other => Err(format!("unknown play mode '{other}' (expected SP or DP)")),
        }
    }
}

/// Difficulty tier. The discriminant is the slot index in the raw per-tier arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Beginner = 0,
    Normal = 1,
    Hyper = 2,
    Another = 3,
    Leggendaria = 4,
}

impl Difficulty {
    /// Display order, which is also slot order.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Beginner,
        Difficulty::Normal,
        Difficulty::Hyper,
        Difficulty::Another,
        Difficulty::Leggendaria,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Beginner => "BEGINNER",
            Self::Normal => "NORMAL",
            Self::Hyper => "HYPER",
            Self::Another => "ANOTHER",
            Self::Leggendaria => "LEGGENDARIA",
        }
    }

    /// Short label such as "SPA" or "DPL".
    pub fn short(self, mode: PlayMode) -> String {
        let tier = match self {
            Self::Beginner => 'B',
            Self::Normal => 'N',
            Self::Hyper => 'H',
            Self::Another => 'A',
            Self::Leggendaria => 'L',
        };
        format!("{}{tier}", mode.code())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let found = Self::ALL.iter().copied().find(|d| {
            d.name() == upper || (upper.len() == 1 && d.name().starts_with(&upper))
        });
        found.ok_or_else(|| format!("unknown difficulty '{s}'"))
    }
}

/// One of the six radar dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadarType {
    Notes,
    Peak,
    Scratch,
    Soflan,
    Charge,
    Chord,
}

impl RadarType {
    pub const ALL: [RadarType; 6] = [
        RadarType::Notes,
        RadarType::Peak,
        RadarType::Scratch,
        RadarType::Soflan,
        RadarType::Charge,
        RadarType::Chord,
    ];

    /// Key used in the raw radar tables.
    pub fn raw_key(self) -> &'static str {
        match self {
            Self::Notes => "NOTES",
            Self::Peak => "PEAK",
            Self::Scratch => "SCRATCH",
            Self::Soflan => "SOFLAN",
            Self::Charge => "CHARGE",
            Self::Chord => "CHORD",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Soflan => "SOF-LAN",
            other => other.raw_key(),
        }
    }
}

impl FromStr for RadarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase().replace('-', "");
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.raw_key() == key)
            .ok_or_else(|| format!("unknown radar type '{s}'"))
    }
}

/// Radar values of a single chart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RadarData {
    pub notes: f64,
    pub peak: f64,
    pub scratch: f64,
    pub soflan: f64,
    pub charge: f64,
    pub chord: f64,
}

impl RadarData {
    pub fn get(&self, kind: RadarType) -> f64 {
        match kind {
            RadarType::Notes => self.notes,
            RadarType::Peak => self.peak,
            RadarType::Scratch => self.scratch,
            RadarType::Soflan => self.soflan,
            RadarType::Charge => self.charge,
            RadarType::Chord => self.chord,
        }
    }

    /// The "no chart" sentinel: every dimension exactly zero.
    pub fn is_empty(&self) -> bool {
        RadarType::ALL.iter().all(|&r| self.get(r) == 0.0)
    }
}

/// One playable chart: a (song, play mode, difficulty) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub song_id: String,
    pub title: String,
    pub play_mode: PlayMode,
    pub difficulty: Difficulty,
    pub level: u32,
    pub note_count: u32,
    pub bpm: String,
    pub radar: RadarData,
    /// `bpm` parsed back into (min, max); `None` for "-". Computed once at construction.
    #[serde(skip)]
    pub bpm_range: Option<(f64, f64)>,
    /// Lowercased `title` for the search filter.
    #[serde(skip)]
    pub title_folded: String,
}

impl ChartData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        song_id: impl Into<String>,
        title: impl Into<String>,
        play_mode: PlayMode,
        difficulty: Difficulty,
        level: u32,
        note_count: u32,
        bpm: impl Into<String>,
        radar: RadarData,
    ) -> Self {
        let bpm = bpm.into();
        let bpm_range = bpm::parse_range(&bpm);
        let title = title.into();
        Self {
            song_id: song_id.into(),
            title_folded: title.to_lowercase(),
            title,
            play_mode,
            difficulty,
            level,
            note_count,
            bpm,
            radar,
            bpm_range,
        }
    }

    /// Tempo range used by the BPM filter. Unknown tempo spans [0, 999].
    pub fn bpm_bounds(&self) -> (f64, f64) {
        self.bpm_range.unwrap_or(bpm::UNKNOWN_BOUNDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_index_matches_slot_order() {
        for (i, d) in Difficulty::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("hyper".parse::<Difficulty>(), Ok(Difficulty::Hyper));
        assert_eq!("A".parse::<Difficulty>(), Ok(Difficulty::Another));
        assert_eq!("l".parse::<Difficulty>(), Ok(Difficulty::Leggendaria));
        assert!("EXTREME".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_short_label() {
        assert_eq!(Difficulty::Another.short(PlayMode::Single), "SPA");
        assert_eq!(Difficulty::Leggendaria.short(PlayMode::Double), "DPL");
    }

    #[test]
    fn test_radar_type_parse_accepts_label() {
        assert_eq!("sof-lan".parse::<RadarType>(), Ok(RadarType::Soflan));
        assert_eq!("Chord".parse::<RadarType>(), Ok(RadarType::Chord));
    }

    #[test]
    fn test_play_mode_serde_codes() {
        assert_eq!(serde_json::to_string(&PlayMode::Double).unwrap(), "\"DP\"");
        let m: PlayMode = serde_json::from_str("\"SP\"").unwrap();
        assert_eq!(m, PlayMode::Single);
    }

    #[test]
    fn test_chart_bounds_cached() {
        let c = ChartData::new(
            "1", "A", PlayMode::Single, Difficulty::Hyper, 10, 1000, "100-200",
            RadarData { notes: 1.0, ..Default::default() },
        );
        assert_eq!(c.bpm_range, Some((100.0, 200.0)));
        assert_eq!(c.bpm_bounds(), (100.0, 200.0));

        let unknown = ChartData::new(
            "2", "B", PlayMode::Double, Difficulty::Normal, 5, 300, "-",
            RadarData { peak: 2.0, ..Default::default() },
        );
        assert_eq!(unknown.bpm_range, None);
        assert_eq!(unknown.bpm_bounds(), (0.0, 999.0));
    }

    #[test]
    fn test_folded_title_cached() {
        let c = ChartData::new(
            "1", "FLOWER Ex", PlayMode::Single, Difficulty::Another, 12, 1500, "160",
            RadarData::default(),
        );
        assert_eq!(c.title_folded, "flower ex");
        assert_eq!(c.title, "FLOWER Ex");
    }
}
