use serde::Serialize;

use crate::catalog::{ChartData, RadarType};

/// Summary statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of every numeric column over a set of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub count: usize,
    pub note_count: Summary,
    pub radar: Vec<(RadarType, Summary)>,
}

/// `None` for an empty slice.
pub fn summarize(values: &mut [f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let mid = n / 2;
    let median = if n % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Some(Summary {
        mean: values.iter().sum::<f64>() / n as f64,
        median,
        min: values[0],
        max: values[n - 1],
    })
}

pub fn compute(rows: &[&ChartData]) -> Option<CatalogStats> {
    let mut notes: Vec<f64> = rows.iter().map(|c| f64::from(c.note_count)).collect();
    let note_count = summarize(&mut notes)?;

    let radar = RadarType::ALL
        .iter()
        .filter_map(|&kind| {
            let mut values: Vec<f64> = rows.iter().map(|c| c.radar.get(kind)).collect();
            summarize(&mut values).map(|s| (kind, s))
        })
        .collect();

    Some(CatalogStats { count: rows.len(), note_count, radar })
}
