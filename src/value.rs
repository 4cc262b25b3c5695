use std::cmp::Ordering;
use std::fmt;

/// A dynamically typed Scratch value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    String(String),
    Pointer(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    Bool,
    String,
    Pointer,
}

impl Default for Value {
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Pointer(_) => ValueType::Pointer,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_infinity(&self) -> bool {
        match self {
            Value::Number(number) => *number == f64::INFINITY,
            Value::String(string) => parse_number(string) == Some(f64::INFINITY),
            _ => false,
        }
    }

    pub fn is_negative_infinity(&self) -> bool {
        match self {
            Value::Number(number) => *number == f64::NEG_INFINITY,
            Value::String(string) => parse_number(string) == Some(f64::NEG_INFINITY),
            _ => false,
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Value::Number(number) => number.is_nan(),
            Value::String(string) => parse_number(string).is_some_and(f64::is_nan),
            _ => false,
        }
    }

    /// True when the value converts to a number without falling back to zero.
    pub fn is_valid_number(&self) -> bool {
        match self {
            Value::Number(number) => !number.is_nan(),
            Value::Bool(_) => true,
            Value::String(string) => parse_number(string).is_some_and(|n| !n.is_nan()),
            Value::Pointer(_) => false,
        }
    }

    /// Whether the value looks like an integer for `pick random`.
    pub fn is_int(&self) -> bool {
        match self {
            Value::Number(number) => number.is_finite() && number.fract() == 0.,
            Value::Bool(_) => true,
            Value::String(string) => !string.contains('.'),
            Value::Pointer(_) => false,
        }
    }

    /// Raw numeric conversion. `"NaN"` and `NaN` stay `NaN`; anything
    /// non-numeric becomes zero.
    pub fn to_double(&self) -> f64 {
        match self {
            Value::Number(number) => *number,
            Value::Bool(bool) => *bool as u8 as f64,
            Value::String(string) => parse_number(string).unwrap_or(0.),
            Value::Pointer(_) => 0.,
        }
    }

    /// Numeric conversion used by arithmetic, where `NaN` counts as zero.
    pub fn to_number(&self) -> f64 {
        let number = self.to_double();
        if number.is_nan() {
            0.
        } else {
            number
        }
    }

    pub fn to_long(&self) -> i64 {
        self.to_number() as i64
    }

    pub fn to_int(&self) -> i32 {
        self.to_number() as i32
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Number(number) => *number != 0. && !number.is_nan(),
            Value::Bool(bool) => *bool,
            Value::String(string) => {
                !(string.is_empty() || string == "0" || string.eq_ignore_ascii_case("false"))
            }
            Value::Pointer(pointer) => *pointer != 0,
        }
    }

    pub fn map_as_str<T, F: FnOnce(&str) -> T>(&self, map: F) -> T {
        match self {
            Value::String(string) => map(string.as_str()),
            other => map(other.to_string().as_str()),
        }
    }

    /// Strict equality used for constant interning: same type and same payload.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            _ => false,
        }
    }

    /// Number used when comparing: booleans are 0/1, blank strings and
    /// non-numeric strings have none.
    fn comparable_number(&self) -> Option<f64> {
        let number = match self {
            Value::Number(number) => *number,
            Value::Bool(bool) => *bool as u8 as f64,
            Value::String(string) => parse_number(string)?,
            Value::Pointer(_) => return None,
        };
        (!number.is_nan()).then_some(number)
    }

    pub fn compare(&self, other: &Value) -> Ordering {
        if let (Some(a), Some(b)) = (self.comparable_number(), other.comparable_number()) {
            return if a == b {
                Ordering::Equal
            } else if a < b {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let a = self.to_string().to_lowercase();
        let b = other.to_string().to_lowercase();
        a.cmp(&b)
    }

    pub fn add(&self, other: &Value) -> Value {
        Value::Number(self.to_number() + other.to_number())
    }

    pub fn subtract(&self, other: &Value) -> Value {
        Value::Number(self.to_number() - other.to_number())
    }

    pub fn multiply(&self, other: &Value) -> Value {
        Value::Number(self.to_number() * other.to_number())
    }

    pub fn divide(&self, other: &Value) -> Value {
        Value::Number(self.to_number() / other.to_number())
    }

    /// Floored modulo: the result takes the sign of the divisor.
    pub fn modulo(&self, other: &Value) -> Value {
        let n = self.to_number();
        let modulus = other.to_number();
        let mut result = n % modulus;
        if result / modulus < 0. {
            result += modulus;
        }
        Value::Number(result)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{}", format_number(*number)),
            Value::Bool(bool) => write!(f, "{bool}"),
            Value::String(string) => write!(f, "{string}"),
            Value::Pointer(_) => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(number as f64)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number as f64)
    }
}

impl From<usize> for Value {
    fn from(number: usize) -> Self {
        Value::Number(number as f64)
    }
}

impl From<bool> for Value {
    fn from(bool: bool) -> Self {
        Value::Bool(bool)
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        Value::String(string.to_string())
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Value::String(string)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Number(number) => Value::Number(number.as_f64().unwrap_or(0.)),
            serde_json::Value::Bool(bool) => Value::Bool(*bool),
            serde_json::Value::String(string) => Value::String(string.clone()),
            serde_json::Value::Null => Value::default(),
            other => Value::String(other.to_string()),
        }
    }
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Parses a string the way Scratch converts text to a number.
///
/// Leading and trailing whitespace is ignored. Accepts an optional sign,
/// decimal digits with an optional fraction and exponent, the literals
/// `Infinity`/`-Infinity`/`NaN`, and whole `0x`/`0o`/`0b` integers (no sign,
/// no fraction). Returns `None` for blank or non-numeric text.
pub fn parse_number(string: &str) -> Option<f64> {
    let trimmed = string.trim_matches(is_blank);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        "NaN" => return Some(f64::NAN),
        _ => {}
    }
    let bytes = trimmed.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return parse_radix(&trimmed[2..], radix);
        }
    }
    if is_decimal(bytes) {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    let mut result = 0.;
    for c in digits.chars() {
        result = result * radix as f64 + c.to_digit(radix)? as f64;
    }
    Some(result)
}

fn is_decimal(bytes: &[u8]) -> bool {
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let integer_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - integer_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let fraction_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - fraction_start;
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exponent_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exponent_start {
            return false;
        }
    }
    i == bytes.len()
}

/// Formats a number like JavaScript's `Number.prototype.toString`.
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.is_infinite() {
        return if number > 0. { "Infinity" } else { "-Infinity" }.to_string();
    }
    if number == 0. {
        return "0".to_string();
    }
    let sign = if number < 0. { "-" } else { "" };
    let exponential = format!("{:e}", number.abs());
    let (mantissa, exponent) = exponential
        .split_once('e')
        .unwrap_or((exponential.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;
    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        if k == 1 {
            format!("{digits}e{e_sign}{}", e.abs())
        } else {
            format!("{}.{}e{e_sign}{}", &digits[..1], &digits[1..], e.abs())
        }
    };
    format!("{sign}{body}")
}
