use std::{cmp::Ordering, fmt};

/// A non-missing table cell. Missing cells are `None` in [`Column::values`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Renders a float without a trailing `.0` when it holds an integral value.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    String,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Number => "numeric",
            ColumnKind::String => "text",
        }
    }
}

/// Field contents read as a missing cell in any column kind.
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for an empty field or a not-available marker such as `NaN` or `NULL`.
pub fn is_missing(raw: &str) -> bool {
    raw.is_empty() || MISSING_MARKERS.contains(&raw)
}

/// Parses a raw field as a number, trimming ASCII whitespace first. `NaN`
/// never comes back, so a parsed cell is always comparable.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Infers a column kind: numeric when every non-missing field parses as a number.
pub fn infer_kind<'a, I>(fields: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let all_numeric = fields
        .into_iter()
        .filter(|raw| !is_missing(raw))
        .all(|raw| parse_number(raw).is_some());
    if all_numeric {
        ColumnKind::Number
    } else {
        ColumnKind::String
    }
}

/// Converts a raw field into a typed cell under an already inferred kind.
pub fn parse_typed_value(raw: &str, kind: ColumnKind) -> Option<Value> {
    if is_missing(raw) {
        return None;
    }
    match kind {
        ColumnKind::Number => parse_number(raw).map(Value::Number),
        ColumnKind::String => Some(Value::String(raw.to_string())),
    }
}

/// Total order over optional cells used to sort join keys: numbers ascend
/// numerically, strings lexicographically, missing values sort last.
pub fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.total_cmp(b),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(_)), Some(Value::String(_))) => Ordering::Less,
        (Some(Value::String(_)), Some(Value::Number(_))) => Ordering::Greater,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Number
    }

    /// Non-missing numeric entries in row order.
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .filter_map(|cell| cell.as_ref().and_then(Value::as_number))
    }

    pub fn non_missing(&self) -> usize {
        self.values.iter().filter(|cell| cell.is_some()).count()
    }
}

/// An ordered set of equally long named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table, checking that every column has the same length.
    pub fn from_columns(columns: Vec<Column>) -> Option<Self> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        if columns.iter().any(|c| c.values.len() != rows) {
            return None;
        }
        Some(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// Display strings for the first `limit` rows (all rows when `None`).
    pub fn display_rows(&self, limit: Option<usize>) -> Vec<Vec<String>> {
        let take = limit.map_or(self.rows, |l| l.min(self.rows));
        (0..take)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| {
                        c.values[row]
                            .as_ref()
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}
