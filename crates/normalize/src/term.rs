use once_cell::sync::Lazy;
use regex::Regex;

static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:tháng|thang|months?)").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:năm|nam|years?)").unwrap());
static WEEK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:tuần|tuan|weeks?)").unwrap());
static DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:ngày|ngay|days?)").unwrap());
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Parse a tenor cell into `(months, display label)`.
///
/// Sub-month tenors (weeks, days) and demand deposits ("không kỳ hạn") come
/// back as zero months; the caller's `months > 0` gate drops them. A bare
/// number is read as months, which is how most bank tables abbreviate.
pub fn parse_term(text: &str) -> Option<(u32, String)> {
    let lower = text.to_lowercase();

    if let Some(caps) = MONTH_RE.captures(&lower) {
        let n: u32 = caps[1].parse().ok()?;
        return Some((n, format!("{n} tháng")));
    }

    if let Some(caps) = YEAR_RE.captures(&lower) {
        let n: u32 = caps[1].parse().ok()?;
        return Some((n.checked_mul(12)?, format!("{n} năm")));
    }

    if let Some(caps) = WEEK_RE.captures(&lower) {
        let n: u32 = caps[1].parse().ok()?;
        return Some((0, format!("{n} tuần")));
    }

    if let Some(caps) = DAY_RE.captures(&lower) {
        let n: u32 = caps[1].parse().ok()?;
        return Some((0, format!("{n} ngày")));
    }

    if lower.contains("không kỳ hạn") || lower.contains("khong ky han") || lower.contains("kkh") {
        return Some((0, "Không kỳ hạn".to_string()));
    }

    let n: u32 = INT_RE.find(&lower)?.as_str().parse().ok()?;
    let label = standard_term_label(n)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{n} tháng"));
    Some((n, label))
}

/// Canonical Vietnamese labels for the tenors banks actually quote. Long
/// tenors are quoted in years on every sheet we consume.
pub fn standard_term_label(months: u32) -> Option<&'static str> {
    match months {
        1 => Some("1 tháng"),
        3 => Some("3 tháng"),
        6 => Some("6 tháng"),
        9 => Some("9 tháng"),
        12 => Some("12 tháng"),
        13 => Some("13 tháng"),
        18 => Some("18 tháng"),
        24 => Some("24 tháng"),
        36 => Some("36 tháng"),
        48 => Some("48 tháng"),
        60 => Some("60 tháng"),
        120 => Some("10 năm"),
        180 => Some("15 năm"),
        240 => Some("20 năm"),
        300 => Some("25 năm"),
        360 => Some("30 năm"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_terms() {
        assert_eq!(parse_term("6 tháng"), Some((6, "6 tháng".to_string())));
        assert_eq!(parse_term("6 thang"), Some((6, "6 tháng".to_string())));
        assert_eq!(parse_term("Kỳ hạn 12 tháng"), Some((12, "12 tháng".to_string())));
        assert_eq!(parse_term("3 months"), Some((3, "3 tháng".to_string())));
        assert_eq!(parse_term("1 month"), Some((1, "1 tháng".to_string())));
    }

    #[test]
    fn test_year_terms_convert_to_months() {
        assert_eq!(parse_term("2 năm"), Some((24, "2 năm".to_string())));
        assert_eq!(parse_term("1 year"), Some((12, "1 năm".to_string())));
        assert_eq!(parse_term("5 nam"), Some((60, "5 năm".to_string())));
    }

    #[test]
    fn test_sub_month_terms_signal_zero() {
        assert_eq!(parse_term("2 tuần"), Some((0, "2 tuần".to_string())));
        assert_eq!(parse_term("7 ngày"), Some((0, "7 ngày".to_string())));
        assert_eq!(parse_term("14 days"), Some((0, "14 ngày".to_string())));
    }

    #[test]
    fn test_demand_deposit() {
        assert_eq!(
            parse_term("Không kỳ hạn"),
            Some((0, "Không kỳ hạn".to_string()))
        );
        assert_eq!(parse_term("KKH"), Some((0, "Không kỳ hạn".to_string())));
    }

    #[test]
    fn test_bare_integer_read_as_months() {
        assert_eq!(parse_term("9"), Some((9, "9 tháng".to_string())));
        assert_eq!(parse_term("13"), Some((13, "13 tháng".to_string())));
        // non-standard tenors still get a month label
        assert_eq!(parse_term("7"), Some((7, "7 tháng".to_string())));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_term("lãi suất"), None);
        assert_eq!(parse_term(""), None);
    }

    #[test]
    fn test_label_table() {
        assert_eq!(standard_term_label(12), Some("12 tháng"));
        assert_eq!(standard_term_label(120), Some("10 năm"));
        assert_eq!(standard_term_label(360), Some("30 năm"));
        assert_eq!(standard_term_label(7), None);
    }
}
