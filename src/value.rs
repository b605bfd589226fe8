// 🧩 Loose value model
// Data-only value tree produced by the literal interpreter, plus the
// script-style coercions (`String(x || '')`, `Number(x)`) that the catalog
// normalizer and the relay payload builders both rely on.

/// A data-only literal value. Objects keep source order; on duplicate keys
/// the last occurrence wins, as it would in a script engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

static UNDEFINED: Value = Value::Undefined;

impl Value {
    /// Property lookup. Missing keys and non-objects yield `Undefined`.
    pub fn get(&self, key: &str) -> &Value {
        match self {
            Value::Object(entries) => entries
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// `String(value)`.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// `String(value || '')`: falsy values become the empty string.
    pub fn text_or_empty(&self) -> String {
        if self.is_truthy() {
            self.to_text()
        } else {
            String::new()
        }
    }

    /// `Number(value)`. Containers go through their text form, so `[]` is 0,
    /// `["5"]` is 5 and objects are NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_number_text(s),
            Value::Array(_) | Value::Object(_) => parse_number_text(&self.to_text()),
        }
    }

    /// `Number(value) || 0`: NaN and zero collapse to 0.
    pub fn number_or_zero(&self) -> f64 {
        let n = self.to_number();
        if n.is_nan() || n == 0.0 {
            0.0
        } else {
            n
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Number-to-text the way a script engine prints it for everyday values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// String-to-number with script semantics: surrounding whitespace ignored,
/// empty text is 0, `0x`/`0o`/`0b` prefixes, signed `Infinity`, and NaN for
/// anything else that is not a plain decimal literal.
pub fn parse_number_text(text: &str) -> f64 {
    let t = text.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let lower = t.get(..2).map(str::to_ascii_lowercase);
    let radix = match lower.as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&t[2..], radix);
    }

    let plain = t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !plain {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut acc = 0.0f64;
    for ch in digits.chars() {
        match ch.to_digit(radix) {
            Some(d) => acc = acc * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::String("".into()).to_number(), 0.0);
        assert_eq!(Value::String("  12.5 ".into()).to_number(), 12.5);
        assert_eq!(Value::String("0x1F".into()).to_number(), 31.0);
        assert_eq!(Value::String("-Infinity".into()).to_number(), f64::NEG_INFINITY);
        assert!(Value::String("inf".into()).to_number().is_nan());
        assert!(Value::String("1 200".into()).to_number().is_nan());
        assert!(Value::String("12abc".into()).to_number().is_nan());
        assert_eq!(Value::Array(vec![]).to_number(), 0.0);
        assert_eq!(Value::Array(vec![Value::String("5".into())]).to_number(), 5.0);
        assert!(Value::Object(vec![]).to_number().is_nan());
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(Value::Number(10.0).to_text(), "10");
        assert_eq!(Value::Number(1.5).to_text(), "1.5");
        assert_eq!(Value::Number(0.0).text_or_empty(), "");
        assert_eq!(Value::Undefined.text_or_empty(), "");
        assert_eq!(Value::Bool(true).text_or_empty(), "true");
        assert_eq!(
            Value::Array(vec![Value::Number(1.0), Value::Null, Value::String("x".into())]).to_text(),
            "1,,x"
        );
        assert_eq!(Value::Object(vec![]).to_text(), "[object Object]");
    }

    #[test]
    fn test_number_or_zero() {
        assert_eq!(Value::String("abc".into()).number_or_zero(), 0.0);
        assert_eq!(Value::Undefined.number_or_zero(), 0.0);
        assert_eq!(Value::String("1500".into()).number_or_zero(), 1500.0);
    }

    #[test]
    fn test_get_last_key_wins() {
        let obj = Value::Object(vec![
            ("name".into(), Value::String("first".into())),
            ("name".into(), Value::String("second".into())),
        ]);
        assert_eq!(obj.get("name"), &Value::String("second".into()));
        assert_eq!(obj.get("missing"), &Value::Undefined);
        assert_eq!(Value::Null.get("name"), &Value::Undefined);
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"payer": "ACME", "amount": 12, "tags": [true, null]});
        let value = Value::from(json);
        assert_eq!(value.get("payer").to_text(), "ACME");
        assert_eq!(value.get("amount").to_number(), 12.0);
        assert_eq!(value.get("tags").as_array().map(|a| a.len()), Some(2));
    }
}
