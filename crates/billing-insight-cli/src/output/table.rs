use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, warnings};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_footer(value, map);
            } else {
                print_fields(map);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", format_scalar(value)),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Array(rows) => print_rows(rows),
        Value::Object(map) => {
            // Scalar fields first, then any list of records as its own table.
            let (lists, fields): (Vec<_>, Vec<_>) = map
                .iter()
                .partition(|(_, v)| is_record_list(v));
            let fields: Map<String, Value> =
                fields.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            if !fields.is_empty() {
                print_fields(&fields);
            }
            for (key, list) in lists {
                println!("\n{}:", key);
                if let Value::Array(rows) = list {
                    print_rows(rows);
                }
            }
        }
        other => println!("{}", format_scalar(other)),
    }
}

fn print_footer(envelope: &Value, map: &Map<String, Value>) {
    let ws = warnings(envelope);
    if !ws.is_empty() {
        println!("\nWarnings:");
        for w in ws {
            println!("  - {}", w);
        }
    }

    if let Some(Value::String(meth)) = map.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_scalar(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = rows.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for row in rows {
            if let Value::Object(map) = row {
                let cells: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_scalar).unwrap_or_default())
                    .collect();
                builder.push_record(cells);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in rows {
            println!("{}", format_scalar(item));
        }
    }
}
