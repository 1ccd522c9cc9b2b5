use serde_json::Value;
use std::io;

use super::{cell, row_array};

/// Write output as CSV to stdout.
///
/// Projections write the cashflow table, sweeps their point rows; anything
/// else becomes two-column `field,value` records.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value.get("result").unwrap_or(value);
    let outcome = match (row_array(result), result) {
        (Some(rows), _) => write_rows(&mut wtr, rows),
        (None, Value::Array(rows)) => write_rows(&mut wtr, rows),
        (None, Value::Object(map)) => write_fields(&mut wtr, map),
        (None, other) => wtr.write_record([cell(other)]),
    };

    if let Err(e) = outcome.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!(error = %e, "failed to write CSV");
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            wtr.write_record([cell(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&String> = first.keys().collect();
    wtr.write_record(&headers)?;
    for item in rows {
        if let Value::Object(map) = item {
            wtr.write_record(headers.iter().map(|h| map.get(*h).map(cell).unwrap_or_default()))?;
        }
    }
    Ok(())
}

/// Nested objects are flattened to dotted field names.
fn write_fields<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    map: &serde_json::Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        match val {
            Value::Object(inner) => {
                for (sub, v) in inner {
                    wtr.write_record([format!("{}.{}", key, sub), cell(v)])?;
                }
            }
            other => wtr.write_record([key.clone(), cell(other)])?,
        }
    }
    Ok(())
}
