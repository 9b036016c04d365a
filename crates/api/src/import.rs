//! Spreadsheet reading for the expense import.
//!
//! Only the first worksheet is read. Every cell is rendered to text so the
//! row parser in `projectflow_core::expense` sees one representation whether
//! the sheet stores a value as a number, a date or a string.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use projectflow_core::validation::DATE_FORMAT;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Unable to read spreadsheet: {0}")]
    Unreadable(#[from] calamine::Error),

    #[error("Spreadsheet has no worksheets")]
    NoSheet,

    #[error("Spreadsheet is empty")]
    Empty,
}

/// Read the first worksheet as rows of cell text, header row included.
pub fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoSheet)??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    if rows.len() < 2 {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Whole numbers come back as floats; keep document numbers like
        // 10023 from turning into "10023.0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.date().format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(10023.0)), "10023");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
    }

    #[test]
    fn strings_are_trimmed() {
        assert_eq!(cell_text(&Data::String("  labor ".into())), "labor");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        assert_matches!(
            read_first_sheet(b"definitely not a workbook".to_vec()),
            Err(ImportError::Unreadable(_))
        );
    }
}
