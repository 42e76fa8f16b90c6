use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::{
    data::{Column, Table, format_number},
    error::Notice,
};

pub const DEFAULT_VALUE_COLUMN: &str = "value";

const NUMERIC_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const CATEGORICAL_LABELS: [&str; 4] = ["count", "unique", "top", "freq"];

/// Everything the summary page shows below the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub value_column: String,
    pub total: Option<f64>,
    #[serde(serialize_with = "serialize_notice")]
    pub notice: Option<Notice>,
    pub statistics: Statistics,
}

fn serialize_notice<S>(notice: &Option<Notice>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match notice {
        Some(n) => serializer.serialize_some(&n.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum Statistics {
    Numeric(Vec<NumericStats>),
    /// Used when the table has no numeric column at all.
    Categorical(Vec<CategoricalStats>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalStats {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: Option<usize>,
}

pub fn summarize(table: &Table, value_column: &str) -> Summary {
    let (total, notice) = match total_value(table, value_column) {
        Ok(total) => (Some(total), None),
        Err(notice) => (None, Some(notice)),
    };
    let statistics = describe(table);
    info!(
        "Summarized {} row(s); total for '{value_column}': {}",
        table.row_count(),
        total.map(format_number).unwrap_or_else(|| "n/a".to_string())
    );
    Summary {
        value_column: value_column.to_string(),
        total,
        notice,
        statistics,
    }
}

/// Sum of the non-missing entries of `column`, or the notice explaining why
/// there is no metric.
pub fn total_value(table: &Table, column: &str) -> Result<f64, Notice> {
    let column = table
        .column(column)
        .ok_or_else(|| Notice::MissingColumn(column.to_string()))?;
    if !column.is_numeric() {
        return Err(Notice::NonNumericColumn(column.name.clone()));
    }
    Ok(column.numbers().sum())
}

pub fn describe(table: &Table) -> Statistics {
    let numeric = table
        .numeric_columns()
        .map(NumericStats::from_column)
        .collect::<Vec<_>>();
    if numeric.is_empty() && table.column_count() > 0 {
        Statistics::Categorical(
            table
                .columns()
                .iter()
                .map(CategoricalStats::from_column)
                .collect(),
        )
    } else {
        Statistics::Numeric(numeric)
    }
}

impl NumericStats {
    fn from_column(column: &Column) -> Self {
        let mut values = column.numbers().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
        let std = match mean {
            Some(mean) if count > 1 => {
                let squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
                Some((squares / (count as f64 - 1.0)).sqrt())
            }
            _ => None,
        };
        Self {
            column: column.name.clone(),
            count,
            mean,
            std,
            min: values.first().copied(),
            p25: quantile(&values, 0.25),
            p50: quantile(&values, 0.5),
            p75: quantile(&values, 0.75),
            max: values.last().copied(),
        }
    }

    fn render_cells(&self) -> [String; 8] {
        let fmt = |metric: Option<f64>| metric.map(format_statistic).unwrap_or_default();
        [
            self.count.to_string(),
            fmt(self.mean),
            fmt(self.std),
            fmt(self.min),
            fmt(self.p25),
            fmt(self.p50),
            fmt(self.p75),
            fmt(self.max),
        ]
    }
}

impl CategoricalStats {
    fn from_column(column: &Column) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for value in column.values.iter().flatten() {
            let display = value.as_display();
            let entry = counts.entry(display.clone()).or_insert_with(|| {
                order.push(display);
                0
            });
            *entry += 1;
        }
        // First value reaching the highest count wins ties.
        let top = order
            .iter()
            .fold(None::<(&String, usize)>, |best, candidate| {
                let freq = counts[candidate];
                match best {
                    Some((_, best_freq)) if best_freq >= freq => best,
                    _ => Some((candidate, freq)),
                }
            });
        Self {
            column: column.name.clone(),
            count: column.non_missing(),
            unique: order.len(),
            top: top.map(|(value, _)| value.clone()),
            freq: top.map(|(_, freq)| freq),
        }
    }

    fn render_cells(&self) -> [String; 4] {
        [
            self.count.to_string(),
            self.unique.to_string(),
            self.top.clone().unwrap_or_default(),
            self.freq.map(|f| f.to_string()).unwrap_or_default(),
        ]
    }
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        match self {
            Statistics::Numeric(columns) => columns.is_empty(),
            Statistics::Categorical(columns) => columns.is_empty(),
        }
    }

    /// Table layout with one row per statistic and one column per table column.
    pub fn to_table(&self) -> (Vec<String>, Vec<Vec<String>>) {
        match self {
            Statistics::Numeric(columns) => {
                let cells = columns.iter().map(NumericStats::render_cells).collect::<Vec<_>>();
                let names = columns.iter().map(|c| c.column.clone());
                transpose(&NUMERIC_LABELS, names, |col, stat| cells[col][stat].clone())
            }
            Statistics::Categorical(columns) => {
                let cells = columns
                    .iter()
                    .map(CategoricalStats::render_cells)
                    .collect::<Vec<_>>();
                let names = columns.iter().map(|c| c.column.clone());
                transpose(&CATEGORICAL_LABELS, names, |col, stat| {
                    cells[col][stat].clone()
                })
            }
        }
    }
}

fn transpose<I, F>(labels: &[&str], names: I, cell: F) -> (Vec<String>, Vec<Vec<String>>)
where
    I: Iterator<Item = String>,
    F: Fn(usize, usize) -> String,
{
    let mut headers = vec![String::new()];
    headers.extend(names);
    let rows = labels
        .iter()
        .enumerate()
        .map(|(stat, label)| {
            let mut row = vec![label.to_string()];
            row.extend((0..headers.len() - 1).map(|col| cell(col, stat)));
            row
        })
        .collect();
    (headers, rows)
}

/// Linear interpolation between the closest ranks of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn format_statistic(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

/// Formats a metric with comma thousands separators, e.g. `1,234.5`.
pub fn format_thousands(value: f64) -> String {
    let text = format_number(value);
    if !value.is_finite() {
        return text;
    }
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Source,
        ingest::{IngestOptions, read_csv},
    };

    fn table(text: &str) -> Table {
        read_csv(text.as_bytes(), Source::First, &IngestOptions::default()).unwrap()
    }

    #[test]
    fn total_value_skips_missing_entries() {
        let t = table("product_id,value\n1,\n2,10\n3,20\n");
        assert_eq!(total_value(&t, "value"), Ok(30.0));
    }

    #[test]
    fn total_value_reports_absent_or_text_columns() {
        let t = table("product_id,value,name\n1,x,A\n");
        assert_eq!(
            total_value(&t, "amount"),
            Err(Notice::MissingColumn("amount".into()))
        );
        assert_eq!(
            total_value(&t, "value"),
            Err(Notice::NonNumericColumn("value".into()))
        );
    }

    #[test]
    fn describe_matches_interpolated_quartiles() {
        let t = table("value\n1\n2\n3\n4\n\n");
        let Statistics::Numeric(stats) = describe(&t) else {
            panic!("expected numeric statistics");
        };
        let value = &stats[0];
        assert_eq!(value.count, 4);
        assert_eq!(value.mean, Some(2.5));
        assert_eq!(value.min, Some(1.0));
        assert_eq!(value.p25, Some(1.75));
        assert_eq!(value.p50, Some(2.5));
        assert_eq!(value.p75, Some(3.25));
        assert_eq!(value.max, Some(4.0));
        let std = value.std.unwrap();
        assert!((std - 1.290_994_448_7).abs() < 1e-9);
    }

    #[test]
    fn single_value_has_no_standard_deviation() {
        let t = table("value\n5\n");
        let Statistics::Numeric(stats) = describe(&t) else {
            panic!("expected numeric statistics");
        };
        assert_eq!(stats[0].std, None);
        assert_eq!(stats[0].p75, Some(5.0));
    }

    #[test]
    fn describe_falls_back_to_categorical_without_numbers() {
        let t = table("name,grade\nA,x\nB,y\nA,\n");
        let Statistics::Categorical(stats) = describe(&t) else {
            panic!("expected categorical statistics");
        };
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[0].unique, 2);
        assert_eq!(stats[0].top.as_deref(), Some("A"));
        assert_eq!(stats[0].freq, Some(2));
        assert_eq!(stats[1].count, 2);
        assert_eq!(stats[1].top.as_deref(), Some("x"));
    }

    #[test]
    fn to_table_puts_statistics_in_rows() {
        let t = table("product_id,value\n1,10\n2,20\n");
        let (headers, rows) = describe(&t).to_table();
        assert_eq!(headers, vec!["", "product_id", "value"]);
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], vec!["count", "2", "2"]);
        assert_eq!(rows[1], vec!["mean", "1.5000", "15"]);
    }

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(30.0), "30");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-1234.5), "-1,234.5");
        assert_eq!(format_thousands(999.25), "999.25");
    }
}
