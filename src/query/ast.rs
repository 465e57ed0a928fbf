use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `%`, a path pattern match.
    Like,
}

impl Operator {
    /// Longest symbols first so `>=` wins over `>`.
    const BY_LENGTH: [Operator; 7] = [
        Operator::Ge,
        Operator::Le,
        Operator::Ne,
        Operator::Eq,
        Operator::Lt,
        Operator::Gt,
        Operator::Like,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "%",
        }
    }

    /// Splits the longest operator symbol off the front of `s`.
    pub fn split_prefix(s: &str) -> Option<(Operator, &str)> {
        Self::BY_LENGTH
            .iter()
            .find_map(|op| s.strip_prefix(op.symbol()).map(|rest| (*op, rest)))
    }

    pub fn is_lower_bound(self) -> bool {
        matches!(self, Operator::Gt | Operator::Ge)
    }

    pub fn is_upper_bound(self) -> bool {
        matches!(self, Operator::Lt | Operator::Le)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Types an unquoted operand. Quoted operands are always text and never
    /// reach this.
    pub fn infer(bare: &str) -> Self {
        match bare {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }

        // Only lexemes that print back unchanged; `007`, `1.50` and `1e999`
        // stay text so they reach the server as written.
        if looks_numeric(bare) {
            if let Ok(n) = bare.parse::<f64>() {
                if n.is_finite() && n.to_string() == bare {
                    return Value::Number(n);
                }
            }
        }

        match parse_timestamp(bare) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(bare.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamps, and text in one of the accepted ISO forms.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(&quote(s)),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(ts) if ts.time() == chrono::NaiveTime::MIN => {
                write!(f, "{}", ts.format("%Y-%m-%d"))
            }
            Value::Timestamp(ts) if ts.nanosecond() == 0 => {
                write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S"))
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Timestamp(date.and_time(chrono::NaiveTime::MIN))
    }
}

fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

/// Accepts `2024-01-31`, `2024-01-31T08:00:00[.fff]`, `2024-01-31 08:00:00`
/// and RFC 3339 with an offset (converted to UTC).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(chrono::NaiveTime::MIN));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Prefers double quotes, falls back to single quotes when the text holds a
/// double quote, and escapes double quotes when it holds both. Backslashes are
/// always escaped since the tokenizer treats them as escapes inside quotes.
fn quote(s: &str) -> String {
    let (delimiter, escape_delimiter) = match (s.contains('"'), s.contains('\'')) {
        (false, _) => ('"', false),
        (true, false) => ('\'', false),
        (true, true) => ('"', true),
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        if c == '\\' || (escape_delimiter && c == '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(delimiter);
    out
}
