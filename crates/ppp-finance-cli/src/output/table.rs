use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, row_array};

/// Render output as tables: headline sections first, then the row table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(envelope) if envelope.contains_key("result") => {
            let result = &envelope["result"];
            print_sections(result);
            if let Some(rows) = row_array(result) {
                println!();
                print_rows(rows);
            }
            print_footer(envelope);
        }
        Value::Object(map) => print_fields(map.iter()),
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", cell(other)),
    }
}

/// Scalars as one Field/Value table, nested objects as titled sub-tables.
fn print_sections(result: &Value) {
    let Value::Object(map) = result else {
        println!("{}", cell(result));
        return;
    };

    let scalars: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .collect();
    if !scalars.is_empty() {
        print_fields(scalars.into_iter());
    }

    for (key, val) in map {
        if let Value::Object(section) = val {
            if key == "cashflow_table" {
                continue;
            }
            println!("\n{}:", key);
            print_fields(section.iter());
        }
    }
}

fn print_fields<'a>(fields: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in fields {
        builder.push_record([key.clone(), cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in rows {
        if let Value::Object(map) = item {
            builder.push_record(headers.iter().map(|h| row_cell(map, h)));
        }
    }
    println!("{}", Table::from(builder));
}

fn row_cell(map: &Map<String, Value>, header: &str) -> String {
    match map.get(header) {
        Some(Value::Null) => "n/a".to_string(),
        Some(v) => cell(v),
        None => String::new(),
    }
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
