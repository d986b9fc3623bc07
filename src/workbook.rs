//! XLSX output for a [`Report`].
//!
//! Sheet names are checked up front so an invalid or colliding name aborts
//! before anything reaches disk.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{ColNum, Workbook};

use crate::report::{Report, ReportSheet};
use crate::{AppError, Result};

pub const REPORT_EXTENSION: &str = "xlsx";
pub const MAX_SHEET_NAME_CHARS: usize = 31;
/// Longest string a single xlsx cell accepts.
pub const MAX_CELL_CHARS: usize = 32_767;
pub const COLUMN_WIDTH: f64 = 11.0;
/// Columns A..=H get the fixed width.
const SIZED_COLUMNS: ColNum = 8;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const DEFAULT_SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub path: PathBuf,
    pub sheets: usize,
    pub rows: usize,
}

pub fn report_path(output_dir: &Path, month: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", month, REPORT_EXTENSION))
}

pub fn sanitize_sheet_name(name: &str) -> Result<String> {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let truncated: String = replaced
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let sanitized = truncated.trim_end_matches('\'').to_string();

    if sanitized.trim().is_empty() || sanitized.eq_ignore_ascii_case("history") {
        return Err(AppError::InvalidSheetName(name.to_string()));
    }
    Ok(sanitized)
}

/// `text` cut to [`MAX_CELL_CHARS`] characters, borrowed when already short enough.
pub fn fit_cell_text(text: &str) -> Cow<'_, str> {
    if text.chars().nth(MAX_CELL_CHARS).is_some() {
        Cow::Owned(text.chars().take(MAX_CELL_CHARS).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Sanitized names in sheet order; fails on the first case-insensitive collision.
pub fn sheet_names(sheets: &[ReportSheet]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let name = sanitize_sheet_name(&sheet.name)?;
        if !seen.insert(name.to_lowercase()) {
            return Err(AppError::DuplicateSheetName(name));
        }
        if name != sheet.name {
            tracing::warn!(
                original = %sheet.name,
                sheet = %name,
                "sheet name adjusted for xlsx"
            );
        }
        names.push(name);
    }
    Ok(names)
}

/// In-memory workbook; released on drop whether or not it was saved.
pub struct ReportWorkbook {
    workbook: Workbook,
    sheets: usize,
    rows: usize,
    saved: bool,
}

impl ReportWorkbook {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            sheets: 0,
            rows: 0,
            saved: false,
        }
    }

    pub fn add_sheet(&mut self, name: &str, sheet: &ReportSheet) -> Result<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(name).map_err(xlsx_error)?;

        for (index, row) in sheet.rows.iter().enumerate() {
            let row_num = u32::try_from(index)
                .map_err(|_| AppError::Xlsx(format!("too many rows in sheet {}", name)))?;
            worksheet
                .write_string(row_num, 0, row.date.as_str())
                .map_err(xlsx_error)?;
            worksheet
                .write_string(row_num, 1, row.time.as_str())
                .map_err(xlsx_error)?;
            let text = fit_cell_text(&row.text);
            if let Cow::Owned(_) = text {
                tracing::warn!(
                    sender = %sheet.sender_id,
                    ts = %row.ts,
                    chars = row.text.chars().count(),
                    "message text truncated to the xlsx cell limit"
                );
            }
            worksheet
                .write_string(row_num, 2, text.as_ref())
                .map_err(xlsx_error)?;
        }

        for col in 0..SIZED_COLUMNS {
            worksheet
                .set_column_width(col, COLUMN_WIDTH)
                .map_err(xlsx_error)?;
        }

        self.sheets += 1;
        self.rows += sheet.rows.len();
        Ok(())
    }

    pub fn save(mut self, path: &Path) -> Result<ReportFile> {
        if self.sheets == 0 {
            let worksheet = self.workbook.add_worksheet();
            worksheet.set_name(DEFAULT_SHEET_NAME).map_err(xlsx_error)?;
        }

        self.workbook.save(path).map_err(xlsx_error)?;
        self.saved = true;

        Ok(ReportFile {
            path: path.to_path_buf(),
            sheets: self.sheets,
            rows: self.rows,
        })
    }
}

impl Default for ReportWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReportWorkbook {
    fn drop(&mut self) {
        if !self.saved {
            tracing::debug!(sheets = self.sheets, "discarding unsaved workbook");
        }
    }
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> AppError {
    AppError::Xlsx(e.to_string())
}

pub fn write_report(report: &Report, output_dir: &Path) -> Result<ReportFile> {
    let names = sheet_names(&report.sheets)?;

    fs::create_dir_all(output_dir).map_err(|e| AppError::WriteFile {
        path: output_dir.display().to_string(),
        source: e,
    })?;
    let path = report_path(output_dir, &report.month);

    let mut workbook = ReportWorkbook::new();
    for (name, sheet) in names.iter().zip(&report.sheets) {
        workbook.add_sheet(name, sheet)?;
    }
    workbook.save(&path)
}

#[cfg(test)]
mod tests {
    use calamine::{Data, Range, Reader, Xlsx, open_workbook};
    use tempfile::tempdir;
    use tracing_test::traced_test;

    use super::*;
    use crate::report::ReportRow;

    fn read_sheet(path: &Path, name: &str) -> Range<Data> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        workbook.worksheet_range(name).unwrap()
    }

    fn cell(range: &Range<Data>, row: u32, col: u32) -> Option<String> {
        range.get_value((row, col)).map(|d| d.to_string())
    }

    fn sheet(name: &str, rows: usize) -> ReportSheet {
        ReportSheet {
            name: name.to_string(),
            sender_id: format!("U-{}", name),
            rows: (0..rows)
                .map(|i| ReportRow {
                    date: "2024-03-01".to_string(),
                    time: format!("09:00:{:02}", i),
                    text: format!("message {}", i),
                    ts: format!("1709251200.{:06}", i),
                })
                .collect(),
        }
    }

    fn report(sheets: Vec<ReportSheet>) -> Report {
        Report {
            month: "202403".to_string(),
            sheets,
        }
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path(Path::new("out"), "202403"),
            PathBuf::from("out/202403.xlsx")
        );
    }

    #[test]
    fn test_sanitize_keeps_valid_name() {
        assert_eq!(sanitize_sheet_name("Taro Yamada").unwrap(), "Taro Yamada");
        assert_eq!(sanitize_sheet_name("山田 太郎").unwrap(), "山田 太郎");
    }

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(
            sanitize_sheet_name("R&D: Ops/Infra [x]").unwrap(),
            "R&D_ Ops_Infra _x_"
        );
        assert_eq!(sanitize_sheet_name("a*b?c\\d").unwrap(), "a_b_c_d");
    }

    #[test]
    fn test_sanitize_trims_apostrophes() {
        assert_eq!(sanitize_sheet_name("'quoted'").unwrap(), "quoted");
    }

    #[test]
    fn test_sanitize_truncates_by_chars() {
        let long = "あ".repeat(40);
        let sanitized = sanitize_sheet_name(&long).unwrap();
        assert_eq!(sanitized.chars().count(), MAX_SHEET_NAME_CHARS);
    }

    #[test]
    fn test_sanitize_rejects_empty_and_reserved() {
        assert!(matches!(sanitize_sheet_name(""), Err(AppError::InvalidSheetName(_))));
        assert!(matches!(sanitize_sheet_name("''"), Err(AppError::InvalidSheetName(_))));
        assert!(matches!(sanitize_sheet_name("History"), Err(AppError::InvalidSheetName(_))));
    }

    #[test]
    fn test_sheet_names_rejects_case_insensitive_duplicates() {
        let sheets = vec![sheet("Taro Yamada", 1), sheet("taro yamada", 1)];
        assert!(matches!(sheet_names(&sheets), Err(AppError::DuplicateSheetName(_))));
    }

    #[test]
    fn test_sheet_names_rejects_collision_after_truncation() {
        let base = "x".repeat(MAX_SHEET_NAME_CHARS);
        let sheets = vec![sheet(&format!("{}A", base), 1), sheet(&format!("{}B", base), 1)];
        assert!(matches!(sheet_names(&sheets), Err(AppError::DuplicateSheetName(_))));
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempdir().unwrap();
        let report = report(vec![sheet("Taro Yamada", 3), sheet("Hanako Sato", 2)]);

        let file = write_report(&report, dir.path()).unwrap();

        assert_eq!(file.path, dir.path().join("202403.xlsx"));
        assert_eq!(file.sheets, 2);
        assert_eq!(file.rows, 5);
        let bytes = fs::read(&file.path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_write_report_empty_report_still_writes_workbook() {
        let dir = tempdir().unwrap();

        let file = write_report(&report(vec![]), dir.path()).unwrap();

        assert_eq!(file.sheets, 0);
        assert!(file.path.exists());
    }

    #[test]
    fn test_write_report_creates_output_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("reports").join("2024");

        let file = write_report(&report(vec![sheet("Taro", 1)]), &nested).unwrap();
        assert!(file.path.starts_with(&nested));
        assert!(file.path.exists());
    }

    #[test]
    fn test_write_report_duplicate_writes_nothing() {
        let dir = tempdir().unwrap();
        let report = report(vec![sheet("Taro", 1), sheet("TARO", 1)]);

        let err = write_report(&report, dir.path()).unwrap_err();

        assert!(matches!(err, AppError::DuplicateSheetName(_)));
        assert!(!dir.path().join("202403.xlsx").exists());
    }

    #[test]
    fn test_unsaved_workbook_leaves_no_file() {
        let dir = tempdir().unwrap();
        {
            let mut workbook = ReportWorkbook::new();
            workbook.add_sheet("Taro", &sheet("Taro", 2)).unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_fit_cell_text() {
        assert!(matches!(fit_cell_text("short"), Cow::Borrowed("short")));
        let exact = "x".repeat(MAX_CELL_CHARS);
        assert!(matches!(fit_cell_text(&exact), Cow::Borrowed(_)));
        let long = "é".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(fit_cell_text(&long).chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn test_write_report_cells_start_at_a1_without_header() {
        let dir = tempdir().unwrap();
        let report = report(vec![sheet("Taro Yamada", 2), sheet("Hanako Sato", 1)]);

        let file = write_report(&report, dir.path()).unwrap();

        let workbook: Xlsx<_> = open_workbook(&file.path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Taro Yamada", "Hanako Sato"]);

        let range = read_sheet(&file.path, "Taro Yamada");
        assert_eq!(range.start(), Some((0, 0)));
        assert_eq!(range.get_size(), (2, 3));
        assert_eq!(cell(&range, 0, 0).as_deref(), Some("2024-03-01"));
        assert_eq!(cell(&range, 0, 1).as_deref(), Some("09:00:00"));
        assert_eq!(cell(&range, 0, 2).as_deref(), Some("message 0"));
        assert_eq!(cell(&range, 1, 0).as_deref(), Some("2024-03-01"));
        assert_eq!(cell(&range, 1, 1).as_deref(), Some("09:00:01"));
        assert_eq!(cell(&range, 1, 2).as_deref(), Some("message 1"));

        let range = read_sheet(&file.path, "Hanako Sato");
        assert_eq!(range.get_size(), (1, 3));
    }

    #[test]
    #[traced_test]
    fn test_write_report_truncates_long_text() {
        let dir = tempdir().unwrap();
        let mut long = sheet("Taro Yamada", 2);
        long.rows[0].text = "x".repeat(40_000);

        let file = write_report(&report(vec![long]), dir.path()).unwrap();

        assert_eq!(file.rows, 2);
        let range = read_sheet(&file.path, "Taro Yamada");
        assert_eq!(cell(&range, 0, 2).map(|t| t.chars().count()), Some(MAX_CELL_CHARS));
        assert_eq!(cell(&range, 1, 2).as_deref(), Some("message 1"));
        assert!(logs_contain("truncated to the xlsx cell limit"));
        assert!(logs_contain("1709251200.000000"));
    }
}
