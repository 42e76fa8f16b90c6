use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::{
    data::{Column, Table, Value, compare_cells},
    error::{DashboardError, DashboardResult, Source},
};

pub const DEFAULT_KEY_COLUMN: &str = "product_id";
pub const DEFAULT_SUFFIXES: (&str, &str) = ("_x", "_y");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub key: String,
    /// Appended to non-key column names present in both tables.
    pub suffixes: (String, String),
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY_COLUMN.to_string(),
            suffixes: (DEFAULT_SUFFIXES.0.to_string(), DEFAULT_SUFFIXES.1.to_string()),
        }
    }
}

/// Hashable form of a key cell. Missing keys match each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Missing,
    Number(u64),
    Text(String),
}

impl JoinKey {
    fn from_cell(cell: Option<&Value>) -> Self {
        match cell {
            None => JoinKey::Missing,
            // -0.0 and 0.0 must land in the same bucket.
            Some(Value::Number(n)) => JoinKey::Number((n + 0.0).to_bits()),
            Some(Value::String(s)) => JoinKey::Text(s.clone()),
        }
    }
}

/// Full outer join of `first` and `second` on `options.key`.
///
/// Rows come out ordered by key (missing keys last); rows sharing a key are
/// the cross product of both sides, first-table-major in ingestion order.
pub fn outer_merge(first: &Table, second: &Table, options: &MergeOptions) -> DashboardResult<Table> {
    let key = options.key.as_str();
    let first_key = first
        .column_index(key)
        .ok_or_else(|| DashboardError::key(key, Source::First))?;
    let second_key = second
        .column_index(key)
        .ok_or_else(|| DashboardError::key(key, Source::Second))?;

    let first_kind = first.columns()[first_key].kind;
    let second_kind = second.columns()[second_key].kind;
    if first_kind != second_kind {
        return Err(DashboardError::KeyTypeMismatch {
            column: key.to_string(),
            first: first_kind.label(),
            second: second_kind.label(),
        });
    }

    let first_keys = &first.columns()[first_key].values;
    let second_keys = &second.columns()[second_key].values;

    let mut lookup: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (row, cell) in second_keys.iter().enumerate() {
        lookup
            .entry(JoinKey::from_cell(cell.as_ref()))
            .or_default()
            .push(row);
    }

    let mut matched = vec![false; second.row_count()];
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    let mut matched_rows = 0usize;
    for (row, cell) in first_keys.iter().enumerate() {
        match lookup.get(&JoinKey::from_cell(cell.as_ref())) {
            Some(bucket) => {
                for &other in bucket {
                    matched[other] = true;
                    matched_rows += 1;
                    pairs.push((Some(row), Some(other)));
                }
            }
            None => pairs.push((Some(row), None)),
        }
    }
    pairs.extend(
        matched
            .iter()
            .enumerate()
            .filter(|(_, hit)| !**hit)
            .map(|(row, _)| (None, Some(row))),
    );

    let key_of = |pair: &(Option<usize>, Option<usize>)| match *pair {
        (Some(row), _) => first_keys[row].as_ref(),
        (None, Some(row)) => second_keys[row].as_ref(),
        (None, None) => None,
    };
    pairs.sort_by(|a, b| compare_cells(key_of(a), key_of(b)));

    let (first_names, second_names) = output_names(first, second, first_key, second_key, options);

    let mut columns = Vec::with_capacity(first.column_count() + second.column_count() - 1);
    for (idx, (column, name)) in first.columns().iter().zip(first_names).enumerate() {
        let values = pairs
            .iter()
            .map(|pair| {
                if idx == first_key {
                    key_of(pair).cloned()
                } else {
                    pair.0.and_then(|row| column.values[row].clone())
                }
            })
            .collect();
        columns.push(Column::new(name, column.kind, values));
    }
    for (idx, column) in second.columns().iter().enumerate() {
        if idx == second_key {
            continue;
        }
        let values = pairs
            .iter()
            .map(|pair| pair.1.and_then(|row| column.values[row].clone()))
            .collect();
        columns.push(Column::new(second_names[idx].clone(), column.kind, values));
    }

    let merged = Table::from_columns(columns).ok_or_else(|| DashboardError::Merge {
        reason: format!("columns differ in length from {} paired row(s)", pairs.len()),
    })?;
    info!(
        "Merge on '{key}' complete: {} output row(s), {} matched row(s)",
        merged.row_count(),
        matched_rows
    );
    Ok(merged)
}

/// Output names for both tables' columns. Non-key names present on both sides
/// receive the configured suffixes; a suffixed name that still collides gets a
/// numeric tail.
fn output_names(
    first: &Table,
    second: &Table,
    first_key: usize,
    second_key: usize,
    options: &MergeOptions,
) -> (Vec<String>, Vec<String>) {
    let first_plain: HashSet<&str> = first
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != first_key)
        .map(|(_, c)| c.name.as_str())
        .collect();
    let second_plain: HashSet<&str> = second
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != second_key)
        .map(|(_, c)| c.name.as_str())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut claim = |base: String| {
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        seen.insert(candidate.clone());
        candidate
    };

    let first_names = first
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if idx != first_key && second_plain.contains(c.name.as_str()) {
                claim(format!("{}{}", c.name, options.suffixes.0))
            } else {
                claim(c.name.clone())
            }
        })
        .collect::<Vec<_>>();
    let second_names = second
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if idx == second_key {
                c.name.clone()
            } else if first_plain.contains(c.name.as_str()) {
                claim(format!("{}{}", c.name, options.suffixes.1))
            } else {
                claim(c.name.clone())
            }
        })
        .collect::<Vec<_>>();
    debug!("Merged column names: {first_names:?} + {second_names:?}");
    (first_names, second_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::ColumnKind,
        ingest::{IngestOptions, read_csv},
    };

    fn table(text: &str) -> Table {
        read_csv(text.as_bytes(), Source::First, &IngestOptions::default()).unwrap()
    }

    fn cells(table: &Table, name: &str) -> Vec<String> {
        table
            .column(name)
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_ref().map(Value::as_display).unwrap_or_default())
            .collect()
    }

    #[test]
    fn outer_merge_keeps_keys_from_both_sides() {
        let first = table("product_id,name\n1,A\n2,B\n");
        let second = table("product_id,value\n2,10\n3,20\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(merged.headers(), vec!["product_id", "name", "value"]);
        assert_eq!(cells(&merged, "product_id"), vec!["1", "2", "3"]);
        assert_eq!(cells(&merged, "name"), vec!["A", "B", ""]);
        assert_eq!(cells(&merged, "value"), vec!["", "10", "20"]);
        assert_eq!(merged.column("value").unwrap().kind, ColumnKind::Number);
    }

    #[test]
    fn shared_non_key_columns_are_suffixed() {
        let first = table("product_id,price\n1,5\n");
        let second = table("product_id,price\n1,6\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(merged.headers(), vec!["product_id", "price_x", "price_y"]);
        assert_eq!(cells(&merged, "price_x"), vec!["5"]);
        assert_eq!(cells(&merged, "price_y"), vec!["6"]);
    }

    #[test]
    fn suffix_collisions_get_numeric_tail() {
        let first = table("product_id,price,price_x\n1,5,7\n");
        let second = table("product_id,price\n1,6\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(
            merged.headers(),
            vec!["product_id", "price_x", "price_x_1", "price_y"]
        );
    }

    #[test]
    fn duplicate_keys_expand_as_cross_product() {
        let first = table("product_id,a\n1,p\n1,q\n");
        let second = table("product_id,b\n1,r\n1,s\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(merged.row_count(), 4);
        assert_eq!(cells(&merged, "a"), vec!["p", "p", "q", "q"]);
        assert_eq!(cells(&merged, "b"), vec!["r", "s", "r", "s"]);
    }

    #[test]
    fn missing_keys_sort_last_and_match_each_other() {
        let first = table("product_id,a\n,x\n2,y\n");
        let second = table("product_id,b\n,z\n1,w\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(cells(&merged, "product_id"), vec!["1", "2", ""]);
        assert_eq!(cells(&merged, "a"), vec!["", "y", "x"]);
        assert_eq!(cells(&merged, "b"), vec!["w", "", "z"]);
    }

    #[test]
    fn header_only_tables_merge_to_empty_table() {
        let first = table("product_id,name\n");
        let second = table("product_id,value\n");
        let merged = outer_merge(&first, &second, &MergeOptions::default()).unwrap();
        assert_eq!(merged.row_count(), 0);
        assert_eq!(merged.headers(), vec!["product_id", "name", "value"]);
    }

    #[test]
    fn missing_key_column_names_the_side() {
        let first = table("product_id,a\n1,x\n");
        let second = table("sku,b\n1,y\n");
        let err = outer_merge(&first, &second, &MergeOptions::default()).unwrap_err();
        assert_eq!(err, DashboardError::key("product_id", Source::Second));
    }

    #[test]
    fn key_type_mismatch_is_rejected() {
        let first = table("product_id,a\n1,x\n");
        let second = table("product_id,b\nP-1,y\n");
        let err = outer_merge(&first, &second, &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, DashboardError::KeyTypeMismatch { .. }));
    }

    #[test]
    fn text_keys_sort_lexicographically() {
        let first = table("sku,a\nb,1\n");
        let second = table("sku,c\na,2\n");
        let options = MergeOptions {
            key: "sku".into(),
            ..MergeOptions::default()
        };
        let merged = outer_merge(&first, &second, &options).unwrap();
        assert_eq!(cells(&merged, "sku"), vec!["a", "b"]);
    }
}
