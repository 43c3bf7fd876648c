use crate::domain::{Table, Value};
use crate::loader::CATEGORIES_COLUMN;
use crate::ports::{EtlError, Result};
use crate::utils::{label_name, label_value};
use std::collections::HashSet;
use tracing::debug;

pub const LABEL_DELIMITER: char = ';';
pub const RELATED_COLUMN: &str = "related";
pub const CHILD_ALONE_COLUMN: &str = "child_alone";

/// `related` value marking an ambiguous label
const AMBIGUOUS_RELATED: i64 = 2;

/// Expands the packed `categories` field into integer label columns, then
/// drops `child_alone`, rows with `related == 2`, and exact duplicate rows.
pub fn clean_data(merged: Table) -> Result<Table> {
    let mut table = expand_categories(merged)?;

    let child_alone = table.column_index(CHILD_ALONE_COLUMN).ok_or_else(|| {
        EtlError::Parse(format!("no '{}' label to drop", CHILD_ALONE_COLUMN))
    })?;
    table.drop_column(child_alone);

    let related = table
        .column_index(RELATED_COLUMN)
        .ok_or_else(|| EtlError::Parse(format!("no '{}' label to filter on", RELATED_COLUMN)))?;
    let before = table.len();
    table
        .rows
        .retain(|row| row[related] != Value::Integer(AMBIGUOUS_RELATED));
    debug!(dropped = before - table.len(), "filtered ambiguous related rows");

    let before = table.len();
    drop_duplicates(&mut table);
    debug!(dropped = before - table.len(), "dropped duplicate rows");

    Ok(table)
}

/// Splits `categories` into one integer column per label, appended by row
/// position, and removes the packed column.
///
/// Label names and count come from the first row. Rows without categories,
/// or with fewer tokens, get Null for the missing labels. A label name that
/// repeats, or matches an existing column, is a parse error.
pub fn expand_categories(mut table: Table) -> Result<Table> {
    let packed = table
        .column_index(CATEGORIES_COLUMN)
        .ok_or_else(|| EtlError::Parse(format!("no '{}' column", CATEGORIES_COLUMN)))?;

    let names = category_names(&table, packed)?;

    let mut taken: HashSet<&str> = table
        .columns
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != packed)
        .map(|(_, c)| c.as_str())
        .collect();
    if let Some(clash) = names.iter().find(|name| !taken.insert(name.as_str())) {
        return Err(EtlError::Parse(format!(
            "category label '{}' clashes with an existing column",
            clash
        )));
    }

    for (row_index, row) in table.rows.iter_mut().enumerate() {
        let labels = match &row[packed] {
            Value::Text(text) => decode_row(text, names.len(), row_index)?,
            Value::Null => vec![Value::Null; names.len()],
            other => decode_row(&other.to_string(), names.len(), row_index)?,
        };
        row.extend(labels);
    }
    table.columns.extend(names);
    table.drop_column(packed);

    debug!(columns = table.columns.len(), "expanded category labels");
    Ok(table)
}

/// Derives label column names from the first row's packed categories
pub fn category_names(table: &Table, packed: usize) -> Result<Vec<String>> {
    let first = table
        .rows
        .first()
        .ok_or_else(|| EtlError::Parse("no rows to derive category names from".to_string()))?;

    match &first[packed] {
        Value::Null => Err(EtlError::Parse(
            "first row has no categories to derive names from".to_string(),
        )),
        value => Ok(value
            .to_string()
            .split(LABEL_DELIMITER)
            .map(|token| label_name(token).to_string())
            .collect()),
    }
}

fn decode_row(packed: &str, width: usize, row: usize) -> Result<Vec<Value>> {
    let mut labels = Vec::with_capacity(width);
    let mut tokens = packed.split(LABEL_DELIMITER);
    for _ in 0..width {
        match tokens.next() {
            Some(token) => labels.push(Value::Integer(label_value(token, row)?)),
            None => labels.push(Value::Null),
        }
    }
    Ok(labels)
}

/// Removes exact duplicate rows, keeping the first occurrence in order
pub fn drop_duplicates(table: &mut Table) {
    let mut seen = HashSet::with_capacity(table.len());
    table.rows.retain(|row| seen.insert(row.clone()));
}
