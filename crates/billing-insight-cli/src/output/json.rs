use serde_json::Value;

/// Print JSON to stdout: pretty on a terminal, one line per document when piped.
pub fn print_json(value: &Value) {
    let pretty = atty::is(atty::Stream::Stdout);
    match render_json(value, pretty) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

pub fn render_json(value: &Value, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
