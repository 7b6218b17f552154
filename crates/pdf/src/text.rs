use once_cell::sync::Lazy;
use regex::Regex;

use laisuat_normalize::fold::{fold_ascii, is_combining_mark};

// Extraction sometimes spells a keyword one letter at a time.
static SPACED_THANG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bt\s+h\s+a\s+n\s+g\b").unwrap());
static SPACED_NAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bn\s+a\s+m\b").unwrap());
static SPACED_KY_HAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bk\s+y\s+h\s+a\s+n\b").unwrap());

/// Flatten PDF-extracted text into the ascii-folded form the table parsers
/// match on. Repairs the two artifacts Vietnamese rate sheets produce:
/// combining accents detached from their vowel by a stray space, and unit
/// keywords spelled one letter at a time.
pub fn normalize_pdf_text(text: &str) -> String {
    let mut joined = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if (c == ' ' || c == '\t') && matches!(chars.peek(), Some(&n) if is_combining_mark(n)) {
            // drop the space; the marks themselves fall out in fold_ascii
            continue;
        }
        joined.push(c);
    }

    let folded = fold_ascii(&joined);
    let folded = SPACED_THANG.replace_all(&folded, "thang");
    let folded = SPACED_NAM.replace_all(&folded, "nam");
    let folded = SPACED_KY_HAN.replace_all(&folded, "ky han");
    folded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_combining_acute() {
        assert_eq!(normalize_pdf_text("6 tha \u{0301}ng"), "6 thang");
        assert_eq!(normalize_pdf_text("6 tha\u{0301}ng"), "6 thang");
    }

    #[test]
    fn test_letter_spaced_keywords() {
        assert_eq!(normalize_pdf_text("6 t h á n g"), "6 thang");
        assert_eq!(normalize_pdf_text("2 n ă m"), "2 nam");
        assert_eq!(normalize_pdf_text("K ỳ h ạ n 6 tháng"), "ky han 6 thang");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(normalize_pdf_text("Kỳ hạn 6 tháng 4,70%"), "ky han 6 thang 4,70%");
    }
}
