use serde_json::Value;

use super::{format_scalar, warnings};

/// Key output fields, in priority order.
const PRIORITY_KEYS: [&str; 6] = [
    "performance_score",
    "collection_rate",
    "total_payments",
    "retail_mix",
    "status",
    "year",
];

/// Fields naming a row in a list.
const ROW_NAME_KEYS: [&str; 4] = ["label", "branch", "proc_code", "id"];

/// Print just the key answer value from the output, then any warnings
/// on stderr.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_text(value));
    for w in warnings(value) {
        eprintln!("{}", w);
    }
}

fn minimal_text(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            for key in PRIORITY_KEYS {
                if let Some(val) = map.get(key) {
                    return format_scalar(val);
                }
            }
            map.iter()
                .next()
                .map(|(k, v)| format!("{}: {}", k, format_scalar(v)))
                .unwrap_or_default()
        }
        // Lists print one line per entry.
        Value::Array(rows) => rows
            .iter()
            .map(|row| match row {
                Value::Object(obj) => {
                    let name = ROW_NAME_KEYS
                        .iter()
                        .find_map(|k| obj.get(*k).and_then(Value::as_str));
                    match name {
                        Some(name) => format!("{}: {}", name, minimal_text(row)),
                        None => minimal_text(row),
                    }
                }
                other => format_scalar(other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => format_scalar(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_key_and_null() {
        let v = json!({"result": {"total_items": 3, "collection_rate": null}});
        assert_eq!(minimal_text(&v), "N/A");
    }

    #[test]
    fn test_list_of_ids() {
        let v = json!(["A1", "B2"]);
        assert_eq!(minimal_text(&v), "A1\nB2");
    }

    #[test]
    fn test_named_rows() {
        let v = json!({"result": [
            {"label": "2024", "total_payments": "10.00"},
            {"label": "TOTAL", "total_payments": "25.00"}
        ]});
        assert_eq!(minimal_text(&v), "2024: 10.00\nTOTAL: 25.00");
    }
}
