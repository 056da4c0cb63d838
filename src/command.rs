//! Text commands for editing the filter, sort and column state.
//!
//! ```text
//! search <text>            title substring, empty clears
//! level 10-12              level range, either side optional
//! bpm 150-                 BPM overlap range
//! notes 1000-2000          note count range
//! radar notes 50-200       one radar dimension
//! diff a                   toggle a difficulty
//! diffs h,a,l              set the allowed difficulties
//! col bpm                  toggle a column
//! sort level desc          sort by one column (`sort none` to unsort)
//! mode dp                  play mode
//! reset                    restore the default filter and sort
//! ```

use std::collections::BTreeSet;
use std::str::FromStr;

use thiserror::Error;

use crate::catalog::{Difficulty, PlayMode, RadarType};
use crate::filter::{LEVEL_MAX, LEVEL_MIN, RADAR_MAX, RADAR_MIN, RadarRange};
use crate::sort::{ColumnId, SortKey, SortSpec};
use crate::store::{CatalogAction, ColumnAction, FilterAction, SortAction, Stores};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("Invalid range '{0}'")]
    BadRange(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    Level(u32, u32),
    Bpm(String, String),
    Notes(String, String),
    Radar(RadarType, RadarRange),
    ToggleDifficulty(Difficulty),
    Difficulties(BTreeSet<Difficulty>),
    ToggleColumn(ColumnId),
    Sort(SortSpec),
    Mode(PlayMode),
    Reset,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, rest) = match s.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (s, ""),
        };
        let arg = |command: &'static str, expected: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument { command, expected })
            } else {
                Ok(rest)
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "search" | "s" => Ok(Command::Search(rest.to_string())),
            "level" | "lv" => {
                let (lo, hi) = parse_range(arg("level", "a range like 10-12")?)?;
                let lo = lo.map(parse_level).transpose()?.unwrap_or(LEVEL_MIN);
                let hi = hi.map(parse_level).transpose()?.unwrap_or(LEVEL_MAX);
                if lo > hi {
                    return Err(CommandError::BadRange(rest.to_string()));
                }
                Ok(Command::Level(lo, hi))
            }
            "bpm" => {
                let (lo, hi) = parse_number_bounds(arg("bpm", "a range like 150-180")?)?;
                Ok(Command::Bpm(lo, hi))
            }
            "notes" => {
                let (lo, hi) = parse_number_bounds(arg("notes", "a range like 1000-2000")?)?;
                Ok(Command::Notes(lo, hi))
            }
            "radar" => {
                let rest = arg("radar", "a dimension and a range")?;
                let (kind, range) = rest.split_once(char::is_whitespace).ok_or(
                    CommandError::MissingArgument { command: "radar", expected: "a dimension and a range" },
                )?;
                let kind: RadarType = kind.parse().map_err(CommandError::Invalid)?;
                let (lo, hi) = parse_range(range.trim())?;
                let min = lo.map(parse_f64).transpose()?.unwrap_or(RADAR_MIN);
                let max = hi.map(parse_f64).transpose()?.unwrap_or(RADAR_MAX);
                if min > max {
                    return Err(CommandError::BadRange(range.trim().to_string()));
                }
                Ok(Command::Radar(kind, RadarRange { min, max }))
            }
            "diff" | "d" => {
                let d = arg("diff", "a difficulty")?.parse().map_err(CommandError::Invalid)?;
                Ok(Command::ToggleDifficulty(d))
            }
            "diffs" => {
                let set = parse_difficulties(arg("diffs", "a list like h,a,l")?)?;
                Ok(Command::Difficulties(set))
            }
            "col" | "column" => {
                let c = arg("col", "a column")?.parse().map_err(CommandError::Invalid)?;
                Ok(Command::ToggleColumn(c))
            }
            "sort" => {
                let rest = arg("sort", "a column and optional direction")?;
                let spec = match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                    ["none"] => SortSpec::unsorted(),
                    [column] => parse_sort(column)?,
                    [column, dir] => parse_sort(&format!("{column}:{dir}"))?,
                    _ => return Err(CommandError::Invalid(format!("bad sort '{rest}'"))),
                };
                Ok(Command::Sort(spec))
            }
            "mode" => {
                let m = arg("mode", "SP or DP")?.parse().map_err(CommandError::Invalid)?;
                Ok(Command::Mode(m))
            }
            "reset" => Ok(Command::Reset),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

impl Command {
    /// Dispatch to the owning store. Returns whether any state changed.
    pub fn apply(self, stores: &mut Stores) -> bool {
        match self {
            Command::Search(text) => stores.filter.dispatch(FilterAction::SetSearchText(text)),
            Command::Level(lo, hi) => stores.filter.dispatch(FilterAction::SetLevelRange(lo, hi)),
            Command::Bpm(lo, hi) => stores.filter.dispatch(FilterAction::SetBpmRange(lo, hi)),
            Command::Notes(lo, hi) => stores.filter.dispatch(FilterAction::SetNotesRange(lo, hi)),
            Command::Radar(kind, range) => stores.filter.dispatch(FilterAction::SetRadarRange(kind, range)),
            Command::ToggleDifficulty(d) => stores.filter.dispatch(FilterAction::ToggleDifficulty(d)),
            Command::Difficulties(set) => stores.filter.dispatch(FilterAction::SetDifficulties(set)),
            Command::ToggleColumn(c) => stores.columns.dispatch(ColumnAction::Toggle(c)),
            Command::Sort(spec) => stores.sort.dispatch(SortAction::Set(spec)),
            Command::Mode(m) => stores.catalog.dispatch(CatalogAction::SetPlayMode(m)),
            Command::Reset => {
                let f = stores.filter.dispatch(FilterAction::Reset);
                let s = stores.sort.dispatch(SortAction::Reset);
                f || s
            }
        }
    }
}

/// Split `lo-hi` where either side may be empty. A lone value is an exact range.
pub fn parse_range(text: &str) -> Result<(Option<&str>, Option<&str>), CommandError> {
    let text = text.trim();
    fn nonempty(s: &str) -> Option<&str> {
        let s = s.trim();
        (!s.is_empty()).then_some(s)
    }
    match text.split_once('-') {
        Some((lo, hi)) => {
            let (lo, hi) = (nonempty(lo), nonempty(hi));
            if lo.is_none() && hi.is_none() {
                return Err(CommandError::BadRange(text.to_string()));
            }
            Ok((lo, hi))
        }
        None if text.is_empty() => Err(CommandError::BadRange(text.to_string())),
        None => Ok((Some(text), Some(text))),
    }
}

/// Comma-separated `column[:asc|:desc]` keys, primary first.
pub fn parse_sort(text: &str) -> Result<SortSpec, CommandError> {
    let keys = text
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|key| {
            let (column, dir) = key.split_once(':').unwrap_or((key, "asc"));
            let id: ColumnId = column.parse().map_err(CommandError::Invalid)?;
            match dir.to_ascii_lowercase().as_str() {
                "asc" => Ok(SortKey::asc(id)),
                "desc" => Ok(SortKey::desc(id)),
                other => Err(CommandError::Invalid(format!("unknown direction '{other}'"))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SortSpec(keys))
}

/// Comma-separated difficulty names or initials.
pub fn parse_difficulties(text: &str) -> Result<BTreeSet<Difficulty>, CommandError> {
    text.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse().map_err(CommandError::Invalid))
        .collect()
}

fn parse_level(s: &str) -> Result<u32, CommandError> {
    s.parse().map_err(|_| CommandError::Invalid(format!("'{s}' is not a level")))
}

fn parse_f64(s: &str) -> Result<f64, CommandError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::Invalid(format!("'{s}' is not a number")))
}

/// Numeric bounds kept as their typed text, empty for unset.
fn parse_number_bounds(text: &str) -> Result<(String, String), CommandError> {
    let (lo, hi) = parse_range(text)?;
    let check = |v: Option<&str>| -> Result<String, CommandError> {
        match v {
            Some(s) => parse_f64(s).map(|_| s.to_string()),
            None => Ok(String::new()),
        }
    };
    Ok((check(lo)?, check(hi)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Command, CommandError> {
        s.parse()
    }

    #[test]
    fn test_ranges() {
        assert_eq!(parse_range("10-12").unwrap(), (Some("10"), Some("12")));
        assert_eq!(parse_range("150-").unwrap(), (Some("150"), None));
        assert_eq!(parse_range("-200").unwrap(), (None, Some("200")));
        assert_eq!(parse_range("11").unwrap(), (Some("11"), Some("11")));
        assert!(parse_range("-").is_err());
        assert!(parse_range("").is_err());
    }

    #[test]
    fn test_level_command() {
        assert_eq!(parse("level 10-12"), Ok(Command::Level(10, 12)));
        assert_eq!(parse("LV 11-"), Ok(Command::Level(11, LEVEL_MAX)));
        assert_eq!(parse("level -3"), Ok(Command::Level(LEVEL_MIN, 3)));
        assert_eq!(parse("level 12-10"), Err(CommandError::BadRange("12-10".into())));
        assert!(matches!(parse("level"), Err(CommandError::MissingArgument { command: "level", .. })));
        assert!(matches!(parse("level x-3"), Err(CommandError::Invalid(_))));
    }

    #[test]
    fn test_bound_commands_keep_text() {
        assert_eq!(parse("bpm 150-"), Ok(Command::Bpm("150".into(), String::new())));
        assert_eq!(parse("notes 1000-2000"), Ok(Command::Notes("1000".into(), "2000".into())));
        assert!(parse("bpm fast-").is_err());
    }

    #[test]
    fn test_radar_command() {
        assert_eq!(
            parse("radar notes 50-"),
            Ok(Command::Radar(RadarType::Notes, RadarRange { min: 50.0, max: RADAR_MAX }))
        );
        assert_eq!(
            parse("radar sof-lan 0-80.5"),
            Ok(Command::Radar(RadarType::Soflan, RadarRange { min: 0.0, max: 80.5 }))
        );
        assert!(parse("radar notes").is_err());
        assert!(parse("radar tempo 1-2").is_err());
    }

    #[test]
    fn test_sort_command() {
        assert_eq!(
            parse("sort level desc"),
            Ok(Command::Sort(SortSpec(vec![SortKey::desc(ColumnId::Level)])))
        );
        assert_eq!(parse("sort none"), Ok(Command::Sort(SortSpec::unsorted())));
        assert_eq!(
            parse_sort("noteCount:desc, title").unwrap(),
            SortSpec(vec![SortKey::desc(ColumnId::NoteCount), SortKey::asc(ColumnId::Title)])
        );
        assert!(parse_sort("level:sideways").is_err());
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(parse("diff a"), Ok(Command::ToggleDifficulty(Difficulty::Another)));
        assert_eq!(
            parse("diffs h, leggendaria"),
            Ok(Command::Difficulties(BTreeSet::from([Difficulty::Hyper, Difficulty::Leggendaria])))
        );
        assert_eq!(parse("col note_count"), Ok(Command::ToggleColumn(ColumnId::NoteCount)));
        assert_eq!(parse("mode dp"), Ok(Command::Mode(PlayMode::Double)));
        assert_eq!(parse("search "), Ok(Command::Search(String::new())));
        assert_eq!(parse("  reset "), Ok(Command::Reset));
        assert_eq!(parse(""), Err(CommandError::Empty));
        assert_eq!(parse("jump 3"), Err(CommandError::Unknown("jump".into())));
    }

    #[test]
    fn test_apply_dispatches_to_stores() {
        let mut stores = Stores::default();
        assert!(parse("level 10-12").unwrap().apply(&mut stores));
        assert!(!parse("level 10-12").unwrap().apply(&mut stores));
        assert_eq!(stores.filter.get().level_min, 10);

        assert!(parse("col bpm").unwrap().apply(&mut stores));
        assert!(!stores.columns.get().is_visible(ColumnId::Bpm));

        assert!(parse("mode dp").unwrap().apply(&mut stores));
        assert_eq!(stores.catalog.get().play_mode, PlayMode::Double);

        assert!(parse("reset").unwrap().apply(&mut stores));
        assert_eq!(stores.filter.get().level_min, LEVEL_MIN);
    }
}
