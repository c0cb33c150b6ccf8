//! The parsed output of one successful result-page scrape.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::grade::ResultCode;

/// One subject row of the scraped result grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRow {
    pub subject_code: String,
    pub subject_name: String,
    pub internal: u32,
    pub external: u32,
    pub total: u32,
    pub result: ResultCode,
}

/// A student's full scraped result for one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSheet {
    /// USN as printed on the result page (uppercased).
    pub usn: String,
    /// Student name as printed on the result page (uppercased).
    pub student_name: String,
    pub rows: Vec<MarkRow>,
}

impl MarkSheet {
    /// Build a sheet from the raw grid cells extracted in the browser.
    ///
    /// Each row carries exactly six cells: subject code, subject name,
    /// internal, external, total, result letter. Rows are sorted by subject
    /// code so repeated scrapes of the same page are deterministic.
    pub fn from_cells(
        usn: &str,
        student_name: &str,
        cell_rows: Vec<Vec<String>>,
    ) -> AppResult<Self> {
        let mut rows = Vec::with_capacity(cell_rows.len());
        for cells in cell_rows {
            rows.push(MarkRow::from_cells(cells)?);
        }
        rows.sort_by(|a, b| a.subject_code.cmp(&b.subject_code));

        Ok(Self {
            usn: usn.trim().to_uppercase(),
            student_name: student_name.trim().to_uppercase(),
            rows,
        })
    }
}

impl MarkRow {
    fn from_cells(cells: Vec<String>) -> AppResult<Self> {
        if cells.len() != 6 {
            return Err(AppError::malformed_sheet(format!(
                "expected 6 cells per row, got {}",
                cells.len()
            )));
        }

        let result = ResultCode::from_label(&cells[5])
            .ok_or_else(|| AppError::field_parse("result", cells[5].clone()))?;

        Ok(Self {
            subject_code: cells[0].trim().to_uppercase(),
            subject_name: cells[1].trim().to_string(),
            internal: parse_marks("internal", &cells[2])?,
            external: parse_marks("external", &cells[3])?,
            total: parse_marks("total", &cells[4])?,
            result,
        })
    }
}

fn parse_marks(field: &'static str, raw: &str) -> AppResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| AppError::field_parse(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, tot: &str, res: &str) -> Vec<String> {
        vec![
            code.to_string(),
            "SOME SUBJECT".to_string(),
            "18".to_string(),
            "40".to_string(),
            tot.to_string(),
            res.to_string(),
        ]
    }

    #[test]
    fn rows_are_sorted_by_subject_code() {
        let sheet = MarkSheet::from_cells(
            "1ox21cs001",
            "Asha Rao",
            vec![row("21CS53", "58", "P"), row("21CS51", "82", "P")],
        )
        .expect("sheet parses");

        assert_eq!(sheet.usn, "1OX21CS001");
        assert_eq!(sheet.student_name, "ASHA RAO");
        assert_eq!(sheet.rows[0].subject_code, "21CS51");
        assert_eq!(sheet.rows[1].subject_code, "21CS53");
    }

    #[test]
    fn malformed_row_width_is_rejected() {
        let err = MarkSheet::from_cells("U", "N", vec![vec!["only".to_string()]]);
        assert!(err.is_err());
    }

    #[test]
    fn non_numeric_marks_are_rejected() {
        let err = MarkSheet::from_cells("U", "N", vec![row("21CS51", "--", "P")]);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_result_letter_is_rejected() {
        let err = MarkSheet::from_cells("U", "N", vec![row("21CS51", "55", "X")]);
        assert!(err.is_err());
    }
}
