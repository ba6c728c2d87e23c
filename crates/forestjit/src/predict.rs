//! Input conversion at the Predictor boundary.
//!
//! All input acceptance funnels through these two functions so the shape
//! contract lives in exactly one place: rows of `num_features` doubles,
//! flattened row-major before they cross the native boundary.

use crate::error::{Error, Result};

/// Flatten nested rows into one contiguous row-major buffer. Every row must
/// have exactly `num_features` values.
pub(crate) fn flatten_rows<R: AsRef<[f64]>>(
    rows: &[R],
    num_features: usize,
) -> Result<(Vec<f64>, usize)> {
    let mut buf = Vec::with_capacity(rows.len() * num_features);
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != num_features {
            return Err(Error::InvalidShape(format!(
                "row {i} has {} values, model expects {num_features} features per row",
                row.len()
            )));
        }
        buf.extend_from_slice(row);
    }
    Ok((buf, rows.len()))
}

/// Validate a flat row-major buffer and return its row count.
pub(crate) fn validate_row_major(values: &[f64], num_features: usize) -> Result<usize> {
    if values.len() % num_features != 0 {
        return Err(Error::InvalidShape(format!(
            "buffer of {} values is not a multiple of {num_features} features per row",
            values.len()
        )));
    }
    Ok(values.len() / num_features)
}
