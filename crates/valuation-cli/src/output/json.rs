use serde_json::Value;

/// Pretty-print a computation envelope to stdout. Decimal fields arrive
/// as JSON strings, which keeps scenario and valuation figures exact.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}
