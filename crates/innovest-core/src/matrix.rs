//! Persona × need grids and their normalization to 0..1 weights.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Weight given to a cell that is neither numeric nor a known token.
pub const UNKNOWN_CELL_WEIGHT: f64 = 0.2;

const CATEGORICAL_WEIGHTS: &[(&str, f64)] = &[
    ("high", 1.0),
    ("medium", 0.6),
    ("low", 0.3),
    ("yes", 1.0),
    ("no", 0.0),
    ("critical", 1.0),
    ("important", 0.7),
    ("optional", 0.3),
];

static NON_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.\-]").unwrap());
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").unwrap());

/// Extract a number from free text: strip everything except digits, `.` and
/// `-`, then read the longest leading decimal literal.
///
/// `"85%"` → 85, `"$1,200"` → 1200, `"4/5"` → 45, `"high"` → `None`.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let stripped = NON_NUMERIC.replace_all(text, "");
    let literal = LEADING_NUMBER.find(&stripped)?;
    literal.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A raw grid cell: a number, or text kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Interpret markup cell text: numeric when a number can be extracted,
    /// otherwise the trimmed text.
    pub fn from_cell_text(text: &str) -> Self {
        match parse_leading_number(text) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(text.trim().to_string()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Number(_) => None,
            CellValue::Text(s) => parse_leading_number(s.trim()),
        }
    }

    fn categorical_weight(&self) -> Option<f64> {
        let CellValue::Text(s) = self else {
            return None;
        };
        let key = s.trim().to_lowercase();
        CATEGORICAL_WEIGHTS
            .iter()
            .find(|(token, _)| *token == key)
            .map(|(_, w)| *w)
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Personas (rows) × needs (columns) with raw cell values.
///
/// Every row holds exactly `needs.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsMatrix {
    pub personas: Vec<String>,
    pub needs: Vec<String>,
    pub values: Vec<Vec<CellValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NeedsMatrix {
    /// Build a matrix, padding short rows with empty text and truncating long
    /// ones. Missing rows are added empty.
    pub fn new(personas: Vec<String>, needs: Vec<String>, mut values: Vec<Vec<CellValue>>) -> Self {
        values.resize_with(personas.len(), Vec::new);
        for row in &mut values {
            row.resize_with(needs.len(), CellValue::default);
        }
        Self {
            personas,
            needs,
            values,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn normalize(&self) -> NormalizedMatrix {
        normalize(&self.personas, &self.needs, &self.values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixScale {
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "score-1-5")]
    Score1To5,
    #[serde(rename = "score-0-10")]
    Score0To10,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "categorical")]
    Categorical,
    #[serde(rename = "unknown")]
    Unknown,
}

impl MatrixScale {
    pub fn as_str(self) -> &'static str {
        match self {
            MatrixScale::Percentage => "percentage",
            MatrixScale::Score1To5 => "score-1-5",
            MatrixScale::Score0To10 => "score-0-10",
            MatrixScale::Binary => "binary",
            MatrixScale::Categorical => "categorical",
            MatrixScale::Unknown => "unknown",
        }
    }

    /// Classify a numeric range. Ranges outside 0..100 fall back to 0-10.
    fn detect(min: f64, max: f64) -> Self {
        if min < 0.0 {
            MatrixScale::Score0To10
        } else if max <= 1.0 {
            MatrixScale::Binary
        } else if max <= 5.0 {
            MatrixScale::Score1To5
        } else if max <= 10.0 {
            MatrixScale::Score0To10
        } else if max <= 100.0 {
            MatrixScale::Percentage
        } else {
            MatrixScale::Score0To10
        }
    }
}

impl fmt::Display for MatrixScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMatrix {
    pub personas: Vec<String>,
    pub needs: Vec<String>,
    /// Same shape as the raw grid; every weight lies in [0, 1].
    pub weights: Vec<Vec<f64>>,
    pub scale: MatrixScale,
}

impl NormalizedMatrix {
    /// Weight at (persona, need), 0 outside the grid.
    pub fn weight(&self, persona: usize, need: usize) -> f64 {
        self.weights
            .get(persona)
            .and_then(|row| row.get(need))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Convert a raw grid into 0..1 weights plus a detected scale.
pub fn normalize(personas: &[String], needs: &[String], values: &[Vec<CellValue>]) -> NormalizedMatrix {
    let numbers: Vec<Vec<Option<f64>>> = values
        .iter()
        .map(|row| row.iter().map(CellValue::as_number).collect())
        .collect();

    let observed = numbers.iter().flatten().flatten().copied();
    let range = observed.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    // weight = clamp((v - floor) / denom, 0, 1)
    let (scale, floor, denom) = match range {
        None => (MatrixScale::Categorical, 0.0, 1.0),
        Some((min, max)) => match MatrixScale::detect(min, max) {
            MatrixScale::Percentage => (MatrixScale::Percentage, 0.0, 100.0),
            scale => {
                let floor = min.max(0.0);
                let denom = [max - floor, max]
                    .into_iter()
                    .find(|d| *d != 0.0)
                    .unwrap_or(1.0);
                (scale, floor, denom)
            }
        },
    };

    let weights = values
        .iter()
        .zip(&numbers)
        .map(|(row, nums)| {
            row.iter()
                .zip(nums)
                .map(|(cell, num)| match num {
                    Some(v) => ((v - floor) / denom).clamp(0.0, 1.0),
                    None => cell.categorical_weight().unwrap_or(UNKNOWN_CELL_WEIGHT),
                })
                .collect()
        })
        .collect();

    NormalizedMatrix {
        personas: personas.to_vec(),
        needs: needs.to_vec(),
        weights,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix} {i}")).collect()
    }

    #[test]
    fn leading_number_extraction() {
        assert_eq!(parse_leading_number("85%"), Some(85.0));
        assert_eq!(parse_leading_number(" $1,200 "), Some(1200.0));
        assert_eq!(parse_leading_number("-2.5 pts"), Some(-2.5));
        assert_eq!(parse_leading_number("1.2.3"), Some(1.2));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("high"), None);
        assert_eq!(parse_leading_number("--"), None);
        assert_eq!(parse_leading_number(""), None);
    }

    #[test]
    fn cell_text_keeps_non_numeric_verbatim() {
        assert_eq!(CellValue::from_cell_text(" 4 "), CellValue::Number(4.0));
        assert_eq!(CellValue::from_cell_text("  Medium "), text("Medium"));
    }

    #[test]
    fn new_pads_and_truncates_rows() {
        let m = NeedsMatrix::new(
            labels("Persona", 3),
            labels("Need", 2),
            vec![
                vec![CellValue::Number(1.0)],
                vec![CellValue::Number(1.0), CellValue::Number(2.0), CellValue::Number(3.0)],
            ],
        );
        assert_eq!(m.values.len(), 3);
        assert!(m.values.iter().all(|row| row.len() == 2));
        assert_eq!(m.values[0][1], text(""));
        assert_eq!(m.values[2], vec![text(""), text("")]);
    }

    #[test]
    fn score_scale_uses_observed_range() {
        let values = vec![
            vec![CellValue::Number(1.0), CellValue::Number(5.0)],
            vec![CellValue::Number(3.0), text("n/a")],
        ];
        let n = normalize(&labels("P", 2), &labels("N", 2), &values);
        assert_eq!(n.scale, MatrixScale::Score1To5);
        // floor is the observed min (1), range is 4
        assert_eq!(n.weights[0], vec![0.0, 1.0]);
        assert_eq!(n.weights[1], vec![0.5, UNKNOWN_CELL_WEIGHT]);
    }

    #[test]
    fn percentage_divides_by_hundred() {
        let values = vec![vec![text("85%"), CellValue::Number(20.0), text("100")]];
        let n = normalize(&labels("P", 1), &labels("N", 3), &values);
        assert_eq!(n.scale, MatrixScale::Percentage);
        assert_eq!(n.weights[0], vec![0.85, 0.2, 1.0]);
    }

    #[test]
    fn binary_and_large_ranges() {
        let values = vec![vec![CellValue::Number(0.0), CellValue::Number(1.0)]];
        let n = normalize(&labels("P", 1), &labels("N", 2), &values);
        assert_eq!(n.scale, MatrixScale::Binary);
        assert_eq!(n.weights[0], vec![0.0, 1.0]);

        let values = vec![vec![CellValue::Number(250.0), CellValue::Number(500.0)]];
        let n = normalize(&labels("P", 1), &labels("N", 2), &values);
        assert_eq!(n.scale, MatrixScale::Score0To10);
        assert_eq!(n.weights[0], vec![0.0, 1.0]);

        let values = vec![vec![CellValue::Number(-5.0), CellValue::Number(5.0)]];
        let n = normalize(&labels("P", 1), &labels("N", 2), &values);
        assert_eq!(n.scale, MatrixScale::Score0To10);
        assert_eq!(n.weights[0], vec![0.0, 1.0]);
    }

    #[test]
    fn constant_grid_falls_back_to_max() {
        let values = vec![vec![CellValue::Number(3.0), CellValue::Number(3.0)]];
        let n = normalize(&labels("P", 1), &labels("N", 2), &values);
        assert_eq!(n.weights[0], vec![0.0, 0.0]);

        let values = vec![vec![CellValue::Number(0.0), CellValue::Number(0.0)]];
        let n = normalize(&labels("P", 1), &labels("N", 2), &values);
        assert_eq!(n.weights[0], vec![0.0, 0.0]);
    }

    #[test]
    fn categorical_grid_reports_categorical() {
        let values = vec![
            vec![text("High"), text(" medium "), text("LOW")],
            vec![text("critical"), text("optional"), text("whatever")],
        ];
        let n = normalize(&labels("P", 2), &labels("N", 3), &values);
        assert_eq!(n.scale, MatrixScale::Categorical);
        assert_eq!(n.weights[0], vec![1.0, 0.6, 0.3]);
        assert_eq!(n.weights[1], vec![1.0, 0.3, UNKNOWN_CELL_WEIGHT]);
    }

    #[test]
    fn mixed_grid_keeps_numeric_scale() {
        let values = vec![vec![
            CellValue::Number(2.0),
            CellValue::Number(8.0),
            text("yes"),
            text("no"),
        ]];
        let n = normalize(&labels("P", 1), &labels("N", 4), &values);
        assert_eq!(n.scale, MatrixScale::Score0To10);
        assert_eq!(n.weights[0], vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn scale_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&MatrixScale::Score1To5).unwrap(),
            "\"score-1-5\""
        );
        let cell: CellValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(cell, CellValue::Number(3.5));
        let cell: CellValue = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(cell, text("high"));
    }

    fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            (-1000.0f64..1000.0).prop_map(CellValue::Number),
            prop::sample::select(vec!["high", "medium", "low", "yes", "no", "critical", "?", ""])
                .prop_map(|s| CellValue::Text(s.to_string())),
            "[a-z0-9%$.\\-]{0,6}".prop_map(CellValue::Text),
        ]
    }

    proptest! {
        #[test]
        fn weights_always_in_unit_interval(
            grid in prop::collection::vec(prop::collection::vec(arb_cell(), 1..6), 1..6)
        ) {
            let needs = labels("N", 6);
            let personas = labels("P", grid.len());
            let m = NeedsMatrix::new(personas, needs, grid);
            let n = m.normalize();
            for row in &n.weights {
                prop_assert_eq!(row.len(), 6);
                for w in row {
                    prop_assert!((0.0..=1.0).contains(w), "weight {w}");
                }
            }
        }

        #[test]
        fn token_only_grids_are_categorical(
            grid in prop::collection::vec(
                prop::collection::vec(prop::sample::select(vec!["high", "medium", "low"]), 3),
                1..5,
            )
        ) {
            let values: Vec<Vec<CellValue>> = grid
                .iter()
                .map(|row| row.iter().map(|s| CellValue::Text(s.to_string())).collect())
                .collect();
            let n = normalize(&labels("P", values.len()), &labels("N", 3), &values);
            prop_assert_eq!(n.scale, MatrixScale::Categorical);
        }
    }
}
