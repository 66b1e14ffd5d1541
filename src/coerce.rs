use regex::Regex;
use serde_json::Value;

/// Coerces a loosely typed invoice field into a number.
///
/// Vision models return numeric fields in whatever shape the bill showed
/// them: plain numbers, `"50 Mtr"`, `"Rs. 120.50"`, `"-4,500"`, `null`, or
/// nothing at all. This function is total: every input maps to an `f64`,
/// and anything unparseable maps to `0.0`.
///
/// Rules:
/// 1. `null`, empty strings, booleans, arrays, and objects yield `0.0`.
/// 2. JSON numbers are taken at face value.
/// 3. Strings are stripped of thousands-separator commas, then the first
///    substring matching an optionally signed decimal number is parsed.
///    Trailing numbers are ignored ("2 x 500" -> 2.0).
pub fn extract_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => extract_from_text(s),
        _ => 0.0,
    }
}

/// String arm of [`extract_number`]; also used for raw text fields that
/// never arrive as JSON numbers.
pub fn extract_from_text(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let cleaned = text.replace(',', "");
    // Optionally signed integer with optional decimal fraction
    let number_regex = Regex::new(r"-?\d+(?:\.\d+)?").unwrap();
    match number_regex.find(&cleaned) {
        Some(m) => m.as_str().parse::<f64>().unwrap_or(0.0),
        None => 0.0,
    }
}

/// Renders a loose field as text for keyword checks and tax parsing.
/// `null` reads as empty; scalars read as their display form.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
