//! 以 `zip` 寫出最小的 Office Open XML 活頁簿（單一工作表）。

use crate::domain::mapper::{KO_COLUMN, SAMPLE_COLUMN};
use crate::domain::table::Table;
use crate::utils::error::{BioremError, Result};
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Excel 單一工作表的列數上限（含標題列）
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_CELL_CHARS: usize = 32_767;
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// 識別碼欄位一律寫成文字，避免 `12.50` 這類樣本名稱被轉成數值
const TEXT_COLUMNS: [&str; 2] = [SAMPLE_COLUMN, KO_COLUMN];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

pub fn write_workbook(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    check_limits(table)?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(&sanitize_sheet_name(sheet_name)).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(sheet_xml(table).as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn check_limits(table: &Table) -> Result<()> {
    let total_rows = table.len() + 1;
    if total_rows > MAX_ROWS {
        return Err(BioremError::ExportError {
            message: format!(
                "table '{}' has {} rows, Excel supports at most {}",
                table.name(),
                total_rows,
                MAX_ROWS
            ),
        });
    }

    if table.columns().len() > MAX_COLUMNS {
        return Err(BioremError::ExportError {
            message: format!(
                "table '{}' has {} columns, Excel supports at most {}",
                table.name(),
                table.columns().len(),
                MAX_COLUMNS
            ),
        });
    }

    let cells = table.columns().iter().chain(table.rows().iter().flatten());
    if let Some(cell) = cells.into_iter().find(|c| c.chars().count() > MAX_CELL_CHARS) {
        return Err(BioremError::ExportError {
            message: format!(
                "table '{}' has a cell of {} characters, Excel supports at most {}",
                table.name(),
                cell.chars().count(),
                MAX_CELL_CHARS
            ),
        });
    }

    Ok(())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(sheet_name)
    )
}

fn sheet_xml(table: &Table) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header_types = vec![false; table.columns().len()];
    let numeric_columns: Vec<bool> = table
        .columns()
        .iter()
        .map(|c| !TEXT_COLUMNS.contains(&c.as_str()))
        .collect();

    write_row(&mut xml, 1, table.columns(), &header_types);
    for (i, row) in table.rows().iter().enumerate() {
        write_row(&mut xml, i + 2, row, &numeric_columns);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn write_row(xml: &mut String, row_number: usize, cells: &[String], numeric_columns: &[bool]) {
    xml.push_str(&format!(r#"<row r="{}">"#, row_number));
    for (col, value) in cells.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        let reference = format!("{}{}", column_letter(col), row_number);
        if numeric_columns[col] && is_numeric(value) {
            xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value));
        } else {
            let space = if value.trim() != value {
                r#" xml:space="preserve""#
            } else {
                ""
            };
            xml.push_str(&format!(
                r#"<c r="{}" t="inlineStr"><is><t{}>{}</t></is></c>"#,
                reference,
                space,
                escape_xml(value)
            ));
        }
    }
    xml.push_str("</row>");
}

/// 0 → A, 25 → Z, 26 → AA
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 只有一般十進位數字才寫成數值；像 `007` 這類前導零字串保留為文字
pub fn is_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let Some(first) = digits.chars().next() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    let bytes = digits.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit() {
        return false;
    }
    if !digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return false;
    }
    value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 不允許的控制字元
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_numeric_detection() {
        assert!(is_numeric("42"));
        assert!(is_numeric("-0.5"));
        assert!(is_numeric("1e-3"));
        assert!(is_numeric("0"));
        assert!(!is_numeric("007"));
        assert!(!is_numeric("K00001"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn test_sheet_name_sanitizing() {
        assert_eq!(sanitize_sheet_name("a/b:c"), "abc");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sanitize_sheet_name("[]"), "Sheet1");
    }

    #[test]
    fn test_workbook_contains_escaped_cells() {
        let mut table = Table::new("t", vec!["Sample", "value"]);
        table
            .push_row(vec!["A&B <x>".to_string(), "0.25".to_string()])
            .unwrap();

        let bytes = write_workbook(&table, "results").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("[Content_Types].xml").is_ok());

        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();

        assert!(sheet.contains("A&amp;B &lt;x&gt;"));
        assert!(sheet.contains(r#"<c r="B2"><v>0.25</v></c>"#));
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr"><is><t>Sample</t></is></c>"#));
    }

    fn sheet_of(table: &Table) -> String {
        let bytes = write_workbook(table, "results").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        sheet
    }

    #[test]
    fn test_identifier_columns_stay_text() {
        let mut table = Table::new("t", vec!["Sample", "KO", "score"]);
        table
            .push_row(vec!["12.50".to_string(), "K00001".to_string(), "12.50".to_string()])
            .unwrap();

        let sheet = sheet_of(&table);
        assert!(sheet.contains(r#"<c r="A2" t="inlineStr"><is><t>12.50</t></is></c>"#));
        assert!(sheet.contains(r#"<c r="C2"><v>12.50</v></c>"#));
    }

    #[test]
    fn test_oversized_cell_is_rejected() {
        let mut table = Table::new("t", vec!["Sample", "note"]);
        table
            .push_row(vec!["S1".to_string(), "x".repeat(MAX_CELL_CHARS + 1)])
            .unwrap();
        assert!(matches!(
            write_workbook(&table, "t"),
            Err(BioremError::ExportError { .. })
        ));

        let mut at_limit = Table::new("t", vec!["Sample", "note"]);
        at_limit
            .push_row(vec!["S1".to_string(), "x".repeat(MAX_CELL_CHARS)])
            .unwrap();
        assert!(write_workbook(&at_limit, "t").is_ok());
    }

    #[test]
    fn test_too_many_columns_is_rejected() {
        let columns: Vec<String> = (0..=MAX_COLUMNS).map(|i| format!("c{}", i)).collect();
        let table = Table::new("wide", columns);
        assert!(matches!(
            write_workbook(&table, "wide"),
            Err(BioremError::ExportError { .. })
        ));
    }
}
