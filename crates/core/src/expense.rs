//! Expense rules: types, voucher lists, budget execution and spreadsheet
//! import planning.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::parse_date;

pub const SOURCE_MANUAL: &str = "manual";
pub const SOURCE_IMPORT: &str = "import";

/// Budget line an expense is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Labor,
    Direct,
    Outsourcing,
    Other,
}

impl ExpenseType {
    pub const ALL: [ExpenseType; 4] = [
        ExpenseType::Labor,
        ExpenseType::Direct,
        ExpenseType::Outsourcing,
        ExpenseType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseType::Labor => "labor",
            ExpenseType::Direct => "direct",
            ExpenseType::Outsourcing => "outsourcing",
            ExpenseType::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExpenseType::Labor => "人工费用",
            ExpenseType::Direct => "直接投入费用",
            ExpenseType::Outsourcing => "委托研发费用",
            ExpenseType::Other => "其他费用",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the stored code or the display label.
impl FromStr for ExpenseType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ExpenseType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.label() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid expense type '{s}'. Must be one of: labor, direct, outsourcing, other"
                ))
            })
    }
}

/// Amounts must be finite and positive.
pub fn validate_amount(amount: f64) -> Result<(), CoreError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::Validation(
            "Amount must be a positive number".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vouchers
// ---------------------------------------------------------------------------

/// Remove the voucher at `index`, returning the removed path.
pub fn take_voucher(paths: &mut Vec<String>, index: usize) -> Result<String, CoreError> {
    if index >= paths.len() {
        return Err(CoreError::Validation(format!(
            "Voucher index {index} out of range (expense has {} voucher(s))",
            paths.len()
        )));
    }
    Ok(paths.remove(index))
}

/// Look up the voucher at `index`.
pub fn voucher_at(paths: &[String], index: usize) -> Result<&str, CoreError> {
    paths.get(index).map(String::as_str).ok_or_else(|| {
        CoreError::Validation(format!(
            "Voucher index {index} out of range (expense has {} voucher(s))",
            paths.len()
        ))
    })
}

// ---------------------------------------------------------------------------
// Budget execution
// ---------------------------------------------------------------------------

/// Budget, actual spend and execution rate (percent) of one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetLine {
    pub budget: f64,
    pub actual: f64,
    pub rate: f64,
}

impl BudgetLine {
    pub fn new(budget: f64, actual: f64) -> Self {
        let rate = if budget > 0.0 {
            actual / budget * 100.0
        } else {
            0.0
        };
        Self {
            budget,
            actual,
            rate,
        }
    }
}

/// Per-project budget versus actual spend.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetComparison {
    pub project_id: DbId,
    pub project_name: String,
    pub labor: BudgetLine,
    pub direct: BudgetLine,
    pub outsourcing: BudgetLine,
    pub other: BudgetLine,
    pub total: BudgetLine,
}

/// Budget lines of a project, in [`ExpenseType::ALL`] order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Budgets {
    pub labor: f64,
    pub direct: f64,
    pub outsourcing: f64,
    pub other: f64,
}

/// Build the comparison for one project from its budgets and the per-type
/// actual totals. Types missing from `actuals` count as zero spend.
pub fn compare_budget(
    project_id: DbId,
    project_name: &str,
    budgets: Budgets,
    actuals: &HashMap<ExpenseType, f64>,
) -> BudgetComparison {
    let actual = |t: ExpenseType| actuals.get(&t).copied().unwrap_or(0.0);

    let labor = BudgetLine::new(budgets.labor, actual(ExpenseType::Labor));
    let direct = BudgetLine::new(budgets.direct, actual(ExpenseType::Direct));
    let outsourcing = BudgetLine::new(budgets.outsourcing, actual(ExpenseType::Outsourcing));
    let other = BudgetLine::new(budgets.other, actual(ExpenseType::Other));

    let total = BudgetLine::new(
        labor.budget + direct.budget + outsourcing.budget + other.budget,
        labor.actual + direct.actual + outsourcing.actual + other.actual,
    );

    BudgetComparison {
        project_id,
        project_name: project_name.to_string(),
        labor,
        direct,
        outsourcing,
        other,
        total,
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet import
// ---------------------------------------------------------------------------

/// Column positions of the import sheet.
pub mod columns {
    pub const DOCUMENT_NO: usize = 0;
    pub const EXPENSE_DATE: usize = 1;
    pub const EXPENSE_TYPE: usize = 2;
    pub const AMOUNT: usize = 3;
    pub const PROJECT_NO: usize = 4;
    pub const DESCRIPTION: usize = 5;
    pub const REMARK: usize = 6;
}

/// One parsed data row of the import sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    /// 1-based sheet row number, for error reporting.
    pub row_number: usize,
    pub document_no: String,
    pub expense_date: NaiveDate,
    pub expense_type: ExpenseType,
    pub amount: f64,
    /// Blank means the expense is not linked to a project.
    pub project_no: Option<String>,
    pub description: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Rows to reconcile, deduplicated by document number.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    pub rows: Vec<ImportRow>,
    /// Rows without a document number.
    pub blank: usize,
    /// Earlier occurrences superseded by a later row with the same number.
    pub superseded: usize,
    pub errors: Vec<RowError>,
}

impl ImportPlan {
    /// Rows that will not be written.
    pub fn skipped(&self) -> usize {
        self.blank + self.superseded + self.errors.len()
    }
}

/// Turn raw cell text (header row included) into an [`ImportPlan`].
///
/// Duplicate document numbers within one sheet collapse to the last
/// occurrence, kept at the position of the first.
pub fn plan_import(sheet: &[Vec<String>]) -> ImportPlan {
    let mut plan = ImportPlan::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, cells) in sheet.iter().enumerate().skip(1) {
        let row_number = idx + 1;
        let document_no = cell(cells, columns::DOCUMENT_NO);
        if document_no.is_empty() {
            plan.blank += 1;
            continue;
        }

        match parse_row(row_number, cells) {
            Ok(row) => match positions.get(&row.document_no) {
                Some(&pos) => {
                    plan.rows[pos] = row;
                    plan.superseded += 1;
                }
                None => {
                    positions.insert(row.document_no.clone(), plan.rows.len());
                    plan.rows.push(row);
                }
            },
            Err(message) => plan.errors.push(RowError {
                row: row_number,
                message,
            }),
        }
    }

    plan
}

fn cell(cells: &[String], col: usize) -> &str {
    cells.get(col).map(|s| s.trim()).unwrap_or("")
}

fn optional_cell(cells: &[String], col: usize) -> Option<String> {
    let value = cell(cells, col);
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_row(row_number: usize, cells: &[String]) -> Result<ImportRow, String> {
    let raw_date = cell(cells, columns::EXPENSE_DATE);
    let expense_date = parse_sheet_date(raw_date)
        .ok_or_else(|| format!("Invalid expense date '{raw_date}'"))?;

    let expense_type = cell(cells, columns::EXPENSE_TYPE)
        .parse::<ExpenseType>()
        .map_err(|e| e.to_string())?;

    let raw_amount = cell(cells, columns::AMOUNT);
    let amount = parse_amount(raw_amount).ok_or_else(|| format!("Invalid amount '{raw_amount}'"))?;

    Ok(ImportRow {
        row_number,
        document_no: cell(cells, columns::DOCUMENT_NO).to_string(),
        expense_date,
        expense_type,
        amount,
        project_no: optional_cell(cells, columns::PROJECT_NO),
        description: optional_cell(cells, columns::DESCRIPTION),
        remark: optional_cell(cells, columns::REMARK),
    })
}

/// Sheet dates arrive as `YYYY-MM-DD`, `YYYY/MM/DD` or with a time suffix.
fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split([' ', 'T']).next().unwrap_or("");
    parse_date(&date_part.replace('/', "-")).ok()
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | ' '))
        .collect();
    let amount: f64 = cleaned.parse().ok()?;
    validate_amount(amount).ok().map(|()| amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn header() -> Vec<String> {
        row(&["单据号", "日期", "类型", "金额", "项目编号", "说明", "备注"])
    }

    #[test]
    fn expense_type_accepts_code_and_label() {
        assert_eq!("labor".parse::<ExpenseType>().unwrap(), ExpenseType::Labor);
        assert_eq!("委托研发费用".parse::<ExpenseType>().unwrap(), ExpenseType::Outsourcing);
        assert!("travel".parse::<ExpenseType>().is_err());
    }

    #[test]
    fn rate_is_zero_without_budget() {
        let line = BudgetLine::new(0.0, 50.0);
        assert_eq!(line.rate, 0.0);
        let line = BudgetLine::new(200.0, 50.0);
        assert_eq!(line.rate, 25.0);
    }

    #[test]
    fn comparison_sums_lines() {
        let mut actuals = HashMap::new();
        actuals.insert(ExpenseType::Labor, 40.0);
        actuals.insert(ExpenseType::Other, 10.0);
        let cmp = compare_budget(
            7,
            "Pack line",
            Budgets {
                labor: 100.0,
                direct: 0.0,
                outsourcing: 0.0,
                other: 100.0,
            },
            &actuals,
        );
        assert_eq!(cmp.labor.rate, 40.0);
        assert_eq!(cmp.direct.actual, 0.0);
        assert_eq!(cmp.total.budget, 200.0);
        assert_eq!(cmp.total.actual, 50.0);
        assert_eq!(cmp.total.rate, 25.0);
    }

    #[test]
    fn voucher_index_is_bounds_checked() {
        let mut paths = vec!["a.pdf".to_string(), "b.pdf".to_string()];
        assert_eq!(voucher_at(&paths, 1).unwrap(), "b.pdf");
        assert!(voucher_at(&paths, 2).is_err());
        assert_eq!(take_voucher(&mut paths, 0).unwrap(), "a.pdf");
        assert_eq!(paths, vec!["b.pdf".to_string()]);
        assert!(take_voucher(&mut paths, 5).is_err());
    }

    #[test]
    fn header_row_is_ignored() {
        let plan = plan_import(&[header()]);
        assert!(plan.rows.is_empty());
        assert_eq!(plan.skipped(), 0);
    }

    #[test]
    fn rows_without_document_number_are_skipped() {
        let plan = plan_import(&[
            header(),
            row(&["", "2024-03-01", "labor", "100", "", "", ""]),
            row(&["BX-1", "2024-03-01", "labor", "100", "", "", ""]),
        ]);
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.blank, 1);
    }

    #[test]
    fn row_fields_are_mapped_by_position() {
        let plan = plan_import(&[
            header(),
            row(&["BX-7", "2024/03/05", "直接投入费用", "1,250.50", "PRJ202403050001", "材料", "急"]),
        ]);
        let parsed = &plan.rows[0];
        assert_eq!(parsed.row_number, 2);
        assert_eq!(parsed.document_no, "BX-7");
        assert_eq!(parsed.expense_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(parsed.expense_type, ExpenseType::Direct);
        assert_eq!(parsed.amount, 1250.5);
        assert_eq!(parsed.project_no.as_deref(), Some("PRJ202403050001"));
        assert_eq!(parsed.remark.as_deref(), Some("急"));
    }

    #[test]
    fn blank_project_number_means_unclassified() {
        let plan = plan_import(&[header(), row(&["BX-1", "2024-03-01", "other", "9"])]);
        assert_eq!(plan.rows[0].project_no, None);
        assert_eq!(plan.rows[0].description, None);
    }

    #[test]
    fn duplicate_document_numbers_keep_last_row() {
        let plan = plan_import(&[
            header(),
            row(&["BX-1", "2024-03-01", "labor", "100"]),
            row(&["BX-2", "2024-03-01", "labor", "5"]),
            row(&["BX-1", "2024-03-02", "labor", "120"]),
        ]);
        assert_eq!(plan.rows.len(), 2);
        assert_eq!(plan.rows[0].document_no, "BX-1");
        assert_eq!(plan.rows[0].amount, 120.0);
        assert_eq!(plan.superseded, 1);
    }

    #[test]
    fn invalid_rows_are_reported_with_row_number() {
        let plan = plan_import(&[
            header(),
            row(&["BX-1", "not a date", "labor", "100"]),
            row(&["BX-2", "2024-03-01", "labor", "-3"]),
            row(&["BX-3", "2024-03-01", "travel", "3"]),
        ]);
        assert!(plan.rows.is_empty());
        let rows: Vec<usize> = plan.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert_eq!(plan.skipped(), 3);
    }

    #[test]
    fn timestamps_in_date_column_are_truncated() {
        let plan = plan_import(&[header(), row(&["BX-1", "2024-03-01 00:00:00", "labor", "1"])]);
        assert_eq!(
            plan.rows[0].expense_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}
