use serde_json::Value;

use super::{cell, row_array};

/// KPIs worth a one-line answer, most important first.
const PRIORITY_KEYS: [&str; 6] = [
    "project_npv",
    "project_irr",
    "min_dscr",
    "avg_dscr",
    "payback_period",
    "profitability_index",
];

/// Print just the headline numbers.
///
/// A projection prints its NPV; a sweep prints one `point: NPV` line per row.
pub fn print_minimal(value: &Value) {
    let result = value.get("result").unwrap_or(value);

    if let (Some(rows), None) = (row_array(result), result.get("kpis")) {
        for row in rows {
            println!("{}: {}", row_label(row), headline(row));
        }
        return;
    }

    let kpis = result.get("kpis").unwrap_or(result);
    println!("{}", headline(kpis));
}

fn headline(kpis: &Value) -> String {
    if let Value::Object(map) = kpis {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return cell(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, cell(val));
        }
    }
    cell(kpis)
}

fn row_label(row: &Value) -> String {
    ["scenario", "value", "shock", "field"]
        .iter()
        .find_map(|k| row.get(*k))
        .map(cell)
        .unwrap_or_default()
}
