use crate::domain::{Table, Value};
use crate::ports::{EtlError, Result};
use std::collections::HashMap;
use tracing::debug;

pub const ID_COLUMN: &str = "id";
pub const CATEGORIES_COLUMN: &str = "categories";

/// Left-joins `categories` onto `messages` on the `id` column.
///
/// Every message row appears exactly once in the output, in input order.
/// Columns are the message columns followed by the non-key category columns;
/// names present on both sides get `_x` / `_y` suffixes. When an id repeats in
/// `categories`, its first row is used. Unmatched rows get Null category cells.
pub fn merge_datasets(messages: &Table, categories: &Table) -> Result<Table> {
    let left_key = require_column(messages, ID_COLUMN, "messages")?;
    let right_key = require_column(categories, ID_COLUMN, "categories")?;
    require_column(categories, CATEGORIES_COLUMN, "categories")?;

    let right_columns: Vec<usize> = (0..categories.columns.len())
        .filter(|&i| i != right_key)
        .collect();

    let mut columns = Vec::with_capacity(messages.columns.len() + right_columns.len());
    for (i, name) in messages.columns.iter().enumerate() {
        let clashes = i != left_key
            && right_columns
                .iter()
                .any(|&j| &categories.columns[j] == name);
        columns.push(if clashes {
            format!("{}_x", name)
        } else {
            name.clone()
        });
    }
    for &j in &right_columns {
        let name = &categories.columns[j];
        let clashes = messages
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| i != left_key && c == name);
        columns.push(if clashes {
            format!("{}_y", name)
        } else {
            name.clone()
        });
    }

    let mut lookup: HashMap<&Value, &Vec<Value>> = HashMap::with_capacity(categories.len());
    for row in &categories.rows {
        lookup.entry(&row[right_key]).or_insert(row);
    }

    let mut merged = Table::new(columns);
    let mut unmatched = 0usize;
    for row in &messages.rows {
        let mut out = row.clone();
        match lookup.get(&row[left_key]).filter(|_| !row[left_key].is_null()) {
            Some(matched) => out.extend(right_columns.iter().map(|&j| matched[j].clone())),
            None => {
                unmatched += 1;
                out.extend(right_columns.iter().map(|_| Value::Null));
            }
        }
        merged.rows.push(out);
    }

    debug!(
        rows = merged.len(),
        columns = merged.columns.len(),
        unmatched,
        "merged messages with categories"
    );
    Ok(merged)
}

fn require_column(table: &Table, name: &str, dataset: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| EtlError::Parse(format!("{} dataset has no '{}' column", dataset, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Table {
        Table {
            columns: vec!["id".into(), "message".into(), "genre".into()],
            rows: vec![
                vec![Value::Integer(2), "water please".into(), "direct".into()],
                vec![Value::Integer(7), "need food".into(), "news".into()],
                vec![Value::Integer(12), "storm".into(), "social".into()],
            ],
        }
    }

    fn categories() -> Table {
        Table {
            columns: vec!["id".into(), "categories".into()],
            rows: vec![
                vec![Value::Integer(12), "related-1;offer-0".into()],
                vec![Value::Integer(2), "related-0;offer-1".into()],
                vec![Value::Integer(2), "related-1;offer-1".into()],
            ],
        }
    }

    #[test]
    fn test_merge_keeps_every_message_once() {
        let merged = merge_datasets(&messages(), &categories()).unwrap();
        assert_eq!(merged.len(), 3);
        let ids: Vec<_> = merged.column_values(0).cloned().collect();
        assert_eq!(ids, vec![Value::Integer(2), Value::Integer(7), Value::Integer(12)]);
    }

    #[test]
    fn test_merge_columns() {
        let merged = merge_datasets(&messages(), &categories()).unwrap();
        assert_eq!(merged.columns, vec!["id", "message", "genre", "categories"]);
    }

    #[test]
    fn test_merge_unmatched_is_null() {
        let merged = merge_datasets(&messages(), &categories()).unwrap();
        assert_eq!(merged.rows[1][3], Value::Null);
        assert_eq!(merged.rows[2][3], Value::from("related-1;offer-0"));
    }

    #[test]
    fn test_merge_repeated_id_uses_first() {
        let merged = merge_datasets(&messages(), &categories()).unwrap();
        assert_eq!(merged.rows[0][3], Value::from("related-0;offer-1"));
    }

    #[test]
    fn test_merge_suffixes_clashing_columns() {
        let mut cats = categories();
        cats.columns.push("genre".into());
        for row in &mut cats.rows {
            row.push("tagged".into());
        }
        let merged = merge_datasets(&messages(), &cats).unwrap();
        assert_eq!(
            merged.columns,
            vec!["id", "message", "genre_x", "categories", "genre_y"]
        );
    }

    #[test]
    fn test_merge_null_id_never_matches() {
        let mut msgs = messages();
        msgs.rows.push(vec![Value::Null, "blank".into(), "direct".into()]);
        let mut cats = categories();
        cats.rows.push(vec![Value::Null, "related-1;offer-1".into()]);
        let merged = merge_datasets(&msgs, &cats).unwrap();
        assert_eq!(merged.rows[3][3], Value::Null);
    }

    #[test]
    fn test_merge_missing_id_column() {
        let mut msgs = messages();
        msgs.columns[0] = "message_id".into();
        assert!(matches!(
            merge_datasets(&msgs, &categories()),
            Err(EtlError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_missing_categories_column() {
        let mut cats = categories();
        cats.columns[1] = "labels".into();
        assert!(matches!(
            merge_datasets(&messages(), &cats),
            Err(EtlError::Parse(_))
        ));
    }
}
