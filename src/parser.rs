use lazy_static::lazy_static;
use regex::Regex;

/// Placeholder shown for a cell whose ticker has not been fetched yet.
pub const UNLOADED: &str = "...";

lazy_static! {
    // Longest numeric prefix, after optional leading whitespace.
    static ref FLOAT_PREFIX: Regex =
        Regex::new(r"^\s*([+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?))")
            .unwrap();
}

/// Converts a scraped or typed string into a number.
///
/// Checked in order:
/// * the unloaded sentinel `"..."` is `NaN`
/// * a trailing `%` divides by 100
/// * a trailing `M`, `B` or `T` multiplies by 1e6, 1e9 or 1e12
/// * anything else is read as a plain float
///
/// Text with no numeric prefix is `NaN`, never an error.
///
/// # Examples
/// ```
/// use stockgrid::parser::parse_value;
///
/// assert_eq!(parse_value("12.5%"), 0.125);
/// assert_eq!(parse_value("3B"), 3e9);
/// assert!(parse_value("N/A").is_nan());
/// ```
pub fn parse_value(input: &str) -> f64 {
    if input == UNLOADED {
        return f64::NAN;
    }
    if let Some(rest) = input.strip_suffix('%') {
        return parse_float(rest) / 100.0;
    }
    let scaled = [('M', 1e6), ('B', 1e9), ('T', 1e12)];
    for (suffix, factor) in scaled {
        if let Some(rest) = input.strip_suffix(suffix) {
            return parse_float(rest) * factor;
        }
    }
    parse_float(input)
}

/// Plain float read: the longest numeric prefix wins, so `"1,234"` is 1 and
/// `"12abc"` is 12.
pub fn parse_float(input: &str) -> f64 {
    FLOAT_PREFIX
        .captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Anything that can be fed to a formula.
///
/// Already-numeric values pass through untouched.
pub trait ToNumber {
    fn to_number(&self) -> f64;
}

impl ToNumber for str {
    fn to_number(&self) -> f64 {
        parse_value(self)
    }
}

impl ToNumber for String {
    fn to_number(&self) -> f64 {
        parse_value(self)
    }
}

impl ToNumber for f64 {
    fn to_number(&self) -> f64 {
        *self
    }
}
