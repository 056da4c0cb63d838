//! BPM decoding and canonical formatting.
//!
//! The chart-info `bpm` field comes in several shapes. It is classified into
//! [`BpmEncoding`] once, at deserialization, and formatted per chart slot.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::PlayMode;

/// Canonical string for an unknown tempo.
pub const UNKNOWN: &str = "-";

/// Bounds the BPM filter assumes for charts with unknown tempo.
pub const UNKNOWN_BOUNDS: (f64, f64) = (0.0, 999.0);

/// Number of difficulty slots per play mode.
const SLOTS: usize = 5;

/// One per-difficulty slot: a fixed tempo or the values of a variable-tempo chart.
#[derive(Debug, Clone, PartialEq)]
pub enum BpmSlot {
    Fixed(f64),
    Variable(Vec<f64>),
}

/// Decoded BPM field, variants in discrimination order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum BpmEncoding {
    /// One tempo for every chart of the song.
    Scalar(f64),
    /// Global `[min, max]` pair.
    Range(f64, f64),
    /// Five slots per play mode.
    PerDifficulty {
        sp: [BpmSlot; SLOTS],
        dp: [BpmSlot; SLOTS],
    },
    /// Any other array; nested numbers flattened one level.
    Fallback(Vec<f64>),
    /// Shapes nothing can be recovered from.
    Unrecognized,
}

impl From<Value> for BpmEncoding {
    fn from(value: Value) -> Self {
        Self::classify(&value)
    }
}

impl BpmEncoding {
    /// Classify a raw JSON value. Order matters: scalar, pair, per-difficulty
    /// object, then any other array.
    pub fn classify(value: &Value) -> Self {
        if let Some(n) = value.as_f64() {
            return Self::Scalar(n);
        }

        if let Some(items) = value.as_array() {
            if let [a, b] = items.as_slice() {
                if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
                    return Self::Range(a, b);
                }
            }
        }

        if let Some(per_difficulty) = per_difficulty(value) {
            return per_difficulty;
        }

        if let Some(items) = value.as_array() {
            let flat = items
                .iter()
                .flat_map(|v| match v {
                    Value::Array(inner) => inner.iter().filter_map(Value::as_f64).collect(),
                    other => other.as_f64().into_iter().collect::<Vec<_>>(),
                })
                .collect();
            return Self::Fallback(flat);
        }

        Self::Unrecognized
    }

    /// Canonical BPM string for one chart slot.
    pub fn format(&self, mode: PlayMode, difficulty_index: usize) -> String {
        let formatted = match self {
            // A zero tempo is how the tables mark "not known yet".
            Self::Scalar(n) if *n == 0.0 => return UNKNOWN.to_string(),
            Self::Scalar(n) => Some(format_number(*n)),
            Self::Range(a, b) => format_span(&[*a, *b]),
            Self::PerDifficulty { sp, dp } => {
                let slots = match mode {
                    PlayMode::Single => sp,
                    PlayMode::Double => dp,
                };
                slots.get(difficulty_index).and_then(|slot| match slot {
                    BpmSlot::Fixed(n) => Some(format_number(*n)),
                    BpmSlot::Variable(values) => format_span(values),
                })
            }
            Self::Fallback(values) => format_span(values),
            Self::Unrecognized => None,
        };

        formatted.unwrap_or_else(|| {
            log::debug!(
                "Unrecognized BPM encoding for {mode} slot {difficulty_index}: {self:?}"
            );
            UNKNOWN.to_string()
        })
    }
}

fn per_difficulty(value: &Value) -> Option<BpmEncoding> {
    let object = value.as_object()?;
    Some(BpmEncoding::PerDifficulty {
        sp: slots(object.get("sp")?)?,
        dp: slots(object.get("dp")?)?,
    })
}

fn slots(value: &Value) -> Option<[BpmSlot; SLOTS]> {
    let items = value.as_array()?;
    if items.len() != SLOTS {
        return None;
    }
    let parsed: Vec<BpmSlot> = items
        .iter()
        .map(|v| match v {
            Value::Array(inner) => Some(BpmSlot::Variable(
                inner.iter().filter_map(Value::as_f64).collect(),
            )),
            other => other.as_f64().map(BpmSlot::Fixed),
        })
        .collect::<Option<_>>()?;
    parsed.try_into().ok()
}

/// Native decimal rendering: `150`, `150.5`.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}

/// `"{min}-{max}"`, or a single value when they coincide. `None` when empty.
fn format_span(values: &[f64]) -> Option<String> {
    let (min, max) = min_max(values)?;
    if min == max {
        Some(format_number(min))
    } else {
        Some(format!("{}-{}", format_number(min), format_number(max)))
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:-\s*(\d+(?:\.\d+)?)\s*)?$")
        .expect("canonical BPM regex")
});

/// Parse a canonical BPM string back into `(min, max)`.
/// Returns `None` for `"-"` or anything unparseable.
pub fn parse_range(canonical: &str) -> Option<(f64, f64)> {
    let caps = CANONICAL_RE.captures(canonical)?;
    let a: f64 = caps.get(1)?.as_str().parse().ok()?;
    let b: f64 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => a,
    };
    Some((a.min(b), a.max(b)))
}
