use serde_json::Value;
use std::io::{self, Write};

use super::{format_scalar, warnings};

/// Write output as CSV to stdout. Envelope warnings go to stderr so the
/// CSV stays machine-readable.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let stderr = io::stderr();
    write_csv(value, stdout.lock(), &mut stderr.lock());
}

fn write_csv<W: Write, E: Write>(value: &Value, out: W, err: &mut E) {
    let mut wtr = csv::Writer::from_writer(out);

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
            Some(Value::Object(result)) => {
                // Ranked output: the branch list is the table.
                if let Some(Value::Array(rows)) = result.get("branches") {
                    write_rows(&mut wtr, rows);
                } else {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in result {
                        let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
                    }
                }
            }
            _ => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
                }
            }
        },
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_scalar(value)]);
        }
    }

    let _ = wtr.flush();
    for w in warnings(value) {
        let _ = writeln!(err, "{}", w);
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    if rows.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = rows.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);
        for row in rows {
            if let Value::Object(map) = row {
                let cells: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&cells);
            }
        }
    } else {
        let _ = wtr.write_record(["value"]);
        for item in rows {
            let _ = wtr.write_record([&format_scalar(item)]);
        }
    }
}
