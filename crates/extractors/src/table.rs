use std::collections::HashSet;

use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use laisuat_core::RateRecord;
use laisuat_normalize::{fold_ascii, parse_rate, parse_term};

/// A tenor/rate pair pulled out of a table row.
pub type RateRow = (u32, String, Decimal);

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Walk every `<table>` whose header row mentions "lãi suất" or "kỳ hạn"
/// (any diacritic spelling): the first cell of each row is read as a tenor,
/// every later cell as a candidate rate. Multi-column sheets therefore emit
/// several rows per tenor; `dedup` collapses exact repeats.
pub fn parse_rate_tables(html: &str) -> Vec<RateRow> {
    let document = Html::parse_document(html);
    let Some(table_sel) = selector("table") else {
        return Vec::new();
    };
    let Some(row_sel) = selector("tr") else {
        return Vec::new();
    };
    let Some(cell_sel) = selector("td, th") else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for table in document.select(&table_sel) {
        if !is_rate_table(&table, &row_sel) {
            continue;
        }

        for tr in table.select(&row_sel) {
            let cells: Vec<String> = tr
                .select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();
            let Some((first, rest)) = cells.split_first() else {
                continue;
            };

            // header rows have no digits in the first cell and fall out here
            let Some((months, label)) = parse_term(first) else {
                continue;
            };

            for cell in rest {
                if let Some(rate) = parse_rate(cell) {
                    rows.push((months, label.clone(), rate));
                }
            }
        }
    }

    dedup_rows(rows)
}

fn is_rate_table(table: &ElementRef<'_>, row_sel: &Selector) -> bool {
    let Some(header) = table.select(row_sel).next() else {
        return false;
    };
    let header_text = fold_ascii(&header.text().collect::<String>());
    header_text.contains("lai suat") || header_text.contains("ky han")
}

/// Drop rows with sub-month tenors and build the emitted records,
/// deduplicated on `(term_months, rate)`.
pub fn records_from_rows(
    bank_code: &str,
    bank_name: &str,
    rows: impl IntoIterator<Item = RateRow>,
) -> Vec<RateRecord> {
    let records = rows
        .into_iter()
        .filter(|(months, _, _)| *months >= 1)
        .map(|(months, label, rate)| RateRecord::new(bank_code, bank_name, months, label, rate))
        .collect();
    dedup_records(records)
}

pub fn dedup_records(records: Vec<RateRecord>) -> Vec<RateRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.term_months, r.rate)))
        .collect()
}

fn dedup_rows(rows: Vec<RateRow>) -> Vec<RateRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|(months, _, rate)| seen.insert((*months, *rate)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SIMPLE_TABLE: &str = r#"
        <html><body>
        <table>
          <tr><th>Kỳ hạn</th><th>Lãi suất (%/năm)</th></tr>
          <tr><td>1 tháng</td><td>3,10</td></tr>
          <tr><td>6 tháng</td><td>4,70</td></tr>
          <tr><td>12 tháng</td><td>5,30</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_simple_rate_table() {
        let rows = parse_rate_tables(SIMPLE_TABLE);
        assert_eq!(
            rows,
            vec![
                (1, "1 tháng".to_string(), dec!(3.10)),
                (6, "6 tháng".to_string(), dec!(4.70)),
                (12, "12 tháng".to_string(), dec!(5.30)),
            ]
        );
    }

    #[test]
    fn test_unrelated_tables_are_skipped() {
        let html = r#"
            <table>
              <tr><th>Chi nhánh</th><th>Địa chỉ</th></tr>
              <tr><td>1 Hà Nội</td><td>2,50</td></tr>
            </table>
        "#;
        assert!(parse_rate_tables(html).is_empty());
    }

    #[test]
    fn test_multi_column_rows_emit_every_rate() {
        // online vs counter columns for the same tenor
        let html = r#"
            <table>
              <tr><th>Kỳ hạn</th><th>Tại quầy</th><th>Online</th></tr>
              <tr><td>6 tháng</td><td>4,50</td><td>4,70</td></tr>
            </table>
        "#;
        let rows = parse_rate_tables(html);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].2, dec!(4.50));
        assert_eq!(rows[1].2, dec!(4.70));
    }

    #[test]
    fn test_duplicate_term_rate_pairs_collapse() {
        let html = r#"
            <table>
              <tr><th>Kỳ hạn</th><th>A</th><th>B</th></tr>
              <tr><td>6 tháng</td><td>4,70</td><td>4,70</td></tr>
            </table>
        "#;
        assert_eq!(parse_rate_tables(html).len(), 1);
    }

    #[test]
    fn test_out_of_band_cells_are_dropped() {
        let html = r#"
            <table>
              <tr><th>Kỳ hạn</th><th>Lãi suất</th><th>Số dư tối thiểu</th></tr>
              <tr><td>6 tháng</td><td>4,70</td><td>1000000</td></tr>
            </table>
        "#;
        let rows = parse_rate_tables(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, dec!(4.70));
    }

    #[test]
    fn test_records_gate_sub_month_tenors() {
        let rows = vec![
            (0, "Không kỳ hạn".to_string(), dec!(0.5)),
            (6, "6 tháng".to_string(), dec!(4.7)),
        ];
        let records = records_from_rows("mb", "MB Bank", rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].term_months, 6);
        assert_eq!(records[0].bank_code, "mb");
        assert_eq!(records[0].product_type, "deposit");
        assert_eq!(records[0].currency, "VND");
    }
}
