use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use laisuat_core::rate_in_band;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").unwrap());

/// Parse a percentage cell like `"4,85%"`, `" 5.2 % "` or `"4.7"` into a
/// decimal rate. Comma decimals are mapped to dots; when a cell carries more
/// than one number the first wins. Values outside the real-world band
/// [0.1, 30] are rejected as mis-parses.
pub fn parse_rate(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| *c != '%')
        .collect();

    let token = NUMBER_RE.find(&cleaned)?;
    let value = Decimal::from_str(token.as_str()).ok()?;
    rate_in_band(value).then_some(value)
}
