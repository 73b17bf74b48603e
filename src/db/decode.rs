//! Row materialization shared by the network backends.

use tracing::warn;

use super::{ColumnInfo, Row, Value};

/// Builds rows from per-cell decoders.
///
/// `cell(row, index)` returns `None` for a non-null value the backend driver
/// could not decode (e.g. `DECIMAL` without a numeric mapping). Such cells
/// become NULL and are reported once per column.
pub(crate) fn materialize_rows<R, F>(
    rows: &[R],
    columns: &[ColumnInfo],
    mut cell: F,
) -> Vec<Row>
where
    F: FnMut(&R, usize) -> Option<Value>,
{
    let mut undecodable = vec![0usize; columns.len()];
    let mut result = Vec::with_capacity(rows.len());

    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            let value = cell(row, index).unwrap_or_else(|| {
                undecodable[index] += 1;
                Value::Null
            });
            values.push(value);
        }
        result.push(values);
    }

    for (column, cells) in undecodable_columns(columns, &undecodable) {
        warn!(
            column = %column.name,
            data_type = %column.data_type,
            cells,
            "Could not decode column values, returning NULL"
        );
    }

    result
}

fn undecodable_columns<'a>(
    columns: &'a [ColumnInfo],
    counts: &[usize],
) -> Vec<(&'a ColumnInfo, usize)> {
    columns
        .iter()
        .zip(counts)
        .filter(|(_, count)| **count > 0)
        .map(|(column, count)| (column, *count))
        .collect()
}
