//! Product spreadsheet import rules
//!
//! Column resolution, per-row validation and coercion into [`ProductDraft`],
//! and the report returned to the uploader. Persistence lives in the backend;
//! everything here is deterministic so the rules can be tested on plain sheets.

use std::collections::BTreeMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use validator::Validate;

use crate::models::{ProductCategory, ProductDraft, DEFAULT_MINIMUM_QUANTITY};
use crate::normalize::fold;
use crate::spreadsheet::{Cell, Sheet, SheetError};

/// Columns understood by the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportColumn {
    Name,
    Quantity,
    UnitValue,
    Category,
    MinimumQuantity,
}

impl ImportColumn {
    pub const REQUIRED: [ImportColumn; 4] = [
        ImportColumn::Name,
        ImportColumn::Quantity,
        ImportColumn::UnitValue,
        ImportColumn::Category,
    ];

    /// Canonical header as printed on the import template
    pub fn header(&self) -> &'static str {
        match self {
            ImportColumn::Name => "Nome",
            ImportColumn::Quantity => "Quantidade",
            ImportColumn::UnitValue => "Valor Unitário",
            ImportColumn::Category => "Categoria",
            ImportColumn::MinimumQuantity => "Quantidade Mínima",
        }
    }

    /// Accepted headers, already folded
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ImportColumn::Name => &["nome", "name"],
            ImportColumn::Quantity => &["quantidade", "quantity"],
            ImportColumn::UnitValue => &["valor unitario", "unit value"],
            ImportColumn::Category => &["categoria", "category"],
            ImportColumn::MinimumQuantity => &["quantidade minima", "minimum quantity"],
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let folded = fold(header.trim());
        [
            ImportColumn::Name,
            ImportColumn::Quantity,
            ImportColumn::UnitValue,
            ImportColumn::Category,
            ImportColumn::MinimumQuantity,
        ]
        .into_iter()
        .find(|col| col.aliases().contains(&folded.as_str()))
    }
}

/// Failures that stop an import before any row is processed
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Why a single row was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowFailure {
    #[error("missing required fields")]
    MissingFields,

    #[error("quantity must be numeric")]
    QuantityNotNumeric,

    #[error("quantity must not be negative")]
    NegativeQuantity,

    #[error("minimum quantity must be numeric")]
    MinimumQuantityNotNumeric,

    #[error("minimum quantity must be at least 1")]
    MinimumQuantityTooSmall,

    #[error("unit value must be numeric")]
    UnitValueNotNumeric,

    #[error("unit value must not be negative")]
    NegativeUnitValue,

    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("{0}")]
    Invalid(String),
}

/// Where each known column sits in the sheet
#[derive(Debug, Clone)]
pub struct ColumnMap {
    headers: Vec<String>,
    name: usize,
    quantity: usize,
    unit_value: usize,
    category: usize,
    minimum_quantity: Option<usize>,
}

impl ColumnMap {
    /// Locate the required columns. The first matching header wins.
    pub fn resolve(headers: &[String]) -> Result<Self, ImportError> {
        let position = |wanted: ImportColumn| {
            headers
                .iter()
                .position(|h| ImportColumn::from_header(h) == Some(wanted))
        };

        let missing: Vec<String> = ImportColumn::REQUIRED
            .iter()
            .filter(|col| position(**col).is_none())
            .map(|col| col.header().to_string())
            .collect();

        match (
            position(ImportColumn::Name),
            position(ImportColumn::Quantity),
            position(ImportColumn::UnitValue),
            position(ImportColumn::Category),
        ) {
            (Some(name), Some(quantity), Some(unit_value), Some(category)) => Ok(Self {
                headers: headers.to_vec(),
                name,
                quantity,
                unit_value,
                category,
                minimum_quantity: position(ImportColumn::MinimumQuantity),
            }),
            _ => Err(ImportError::MissingColumns(missing)),
        }
    }

    /// Validate and coerce one data row
    pub fn validate_row(&self, row: &[Cell]) -> Result<ProductDraft, RowFailure> {
        let name = Sheet::cell(row, self.name);
        let quantity = Sheet::cell(row, self.quantity);
        let unit_value = Sheet::cell(row, self.unit_value);
        let category = Sheet::cell(row, self.category);

        if [name, quantity, unit_value, category].iter().any(|c| c.is_blank()) {
            return Err(RowFailure::MissingFields);
        }

        let quantity = quantity.as_number().ok_or(RowFailure::QuantityNotNumeric)?;
        let quantity = to_int(quantity).ok_or(RowFailure::QuantityNotNumeric)?;
        if quantity < 0 {
            return Err(RowFailure::NegativeQuantity);
        }

        let minimum_quantity = match self.minimum_quantity.map(|i| Sheet::cell(row, i)) {
            None => DEFAULT_MINIMUM_QUANTITY,
            Some(cell) if cell.is_blank() => DEFAULT_MINIMUM_QUANTITY,
            Some(cell) => cell
                .as_number()
                .and_then(to_int)
                .ok_or(RowFailure::MinimumQuantityNotNumeric)?,
        };
        if minimum_quantity < 1 {
            return Err(RowFailure::MinimumQuantityTooSmall);
        }

        let unit_value = to_decimal(unit_value).ok_or(RowFailure::UnitValueNotNumeric)?;
        if unit_value < Decimal::ZERO {
            return Err(RowFailure::NegativeUnitValue);
        }

        let category_text = category.to_text();
        let category = ProductCategory::parse_lenient(&category_text)
            .ok_or(RowFailure::InvalidCategory(category_text))?;

        let draft = ProductDraft {
            name: name.to_text(),
            quantity,
            minimum_quantity,
            unit_value,
            category,
        };
        draft
            .validate()
            .map_err(|e| RowFailure::Invalid(first_message(&e)))?;

        Ok(draft)
    }

    /// The row's non-blank values keyed by header, for error reports
    pub fn row_data(&self, row: &[Cell]) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .filter_map(|(i, header)| {
                let cell = Sheet::cell(row, i);
                (!cell.is_blank()).then(|| (header.clone(), cell.to_text()))
            })
            .collect()
    }
}

/// Truncate toward zero like an integer cast, refusing values outside `i32`
fn to_int(value: f64) -> Option<i32> {
    let truncated = value.trunc();
    (truncated >= f64::from(i32::MIN) && truncated <= f64::from(i32::MAX)).then_some(truncated as i32)
}

fn to_decimal(cell: &Cell) -> Option<Decimal> {
    let number = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(_) => Cell::infer(&cell.to_text()).as_number(),
        _ => None,
    }?;
    Decimal::from_f64(number).map(|d| d.round_dp(2))
}

fn first_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .first()
        .and_then(|(field, errs)| {
            errs.first().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid {}", field))
            })
        })
        .unwrap_or_else(|| "invalid row".to_string())
}

/// 1-based sheet line of a data row; the header occupies line 1
pub fn sheet_row_number(data_index: usize) -> usize {
    data_index + 2
}

/// Rows where every cell is blank are skipped entirely
pub fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// A rejected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
    pub data: BTreeMap<String, String>,
}

/// Result of an import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub errors: Vec<RowError>,
}

/// Overall shape of an import result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    NothingToImport,
    Complete,
    Partial,
    Failed,
}

impl ImportReport {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, row: usize, error: impl ToString, data: BTreeMap<String, String>) {
        self.errors.push(RowError {
            row,
            error: error.to_string(),
            data,
        });
    }

    pub fn outcome(&self) -> ImportOutcome {
        match (self.success_count, self.errors.len()) {
            (0, 0) => ImportOutcome::NothingToImport,
            (_, 0) => ImportOutcome::Complete,
            (0, _) => ImportOutcome::Failed,
            _ => ImportOutcome::Partial,
        }
    }

    /// One-line message for the uploader
    pub fn summary(&self) -> String {
        match self.outcome() {
            ImportOutcome::NothingToImport => "No rows to import".to_string(),
            ImportOutcome::Complete => {
                format!("{} products imported successfully", self.success_count)
            }
            ImportOutcome::Partial => format!(
                "Partial import: {} succeeded, {} failed",
                self.success_count,
                self.errors.len()
            ),
            ImportOutcome::Failed => {
                format!("Import failed: all {} rows were rejected", self.errors.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn standard_map() -> ColumnMap {
        ColumnMap::resolve(&headers(&["Nome", "Quantidade", "Valor Unitário", "Categoria"])).unwrap()
    }

    #[test]
    fn test_header_matching_ignores_accents_and_case() {
        assert_eq!(ImportColumn::from_header("VALOR UNITARIO"), Some(ImportColumn::UnitValue));
        assert_eq!(ImportColumn::from_header(" Quantidade Mínima "), Some(ImportColumn::MinimumQuantity));
        assert_eq!(ImportColumn::from_header("Unit Value"), Some(ImportColumn::UnitValue));
        assert_eq!(ImportColumn::from_header("Preço"), None);
    }

    #[test]
    fn test_missing_columns_listed() {
        let err = ColumnMap::resolve(&headers(&["Nome", "Quantidade", "Categoria"])).unwrap_err();
        match err {
            ImportError::MissingColumns(cols) => assert_eq!(cols, vec!["Valor Unitário"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_row_coerced() {
        let row = vec![text("Tinta Azul"), Cell::Number(12.9), Cell::Number(7.456), text("Sublimação")];
        let draft = standard_map().validate_row(&row).unwrap();
        assert_eq!(draft.name, "Tinta Azul");
        assert_eq!(draft.quantity, 12);
        assert_eq!(draft.minimum_quantity, DEFAULT_MINIMUM_QUANTITY);
        assert_eq!(draft.unit_value, Decimal::new(746, 2));
        assert_eq!(draft.category, ProductCategory::Sublimacao);
    }

    #[test]
    fn test_blank_required_field() {
        let row = vec![text("Tinta"), Cell::Empty, Cell::Number(1.0), text("OUTROS")];
        assert_eq!(standard_map().validate_row(&row), Err(RowFailure::MissingFields));

        let short_row = vec![text("Tinta"), Cell::Number(1.0)];
        assert_eq!(standard_map().validate_row(&short_row), Err(RowFailure::MissingFields));
    }

    #[test]
    fn test_quantity_must_be_numeric() {
        let row = vec![text("Tinta"), text("dez"), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(standard_map().validate_row(&row), Err(RowFailure::QuantityNotNumeric));
    }

    #[test]
    fn test_missing_fields_checked_before_numeric() {
        let row = vec![Cell::Empty, text("dez"), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(standard_map().validate_row(&row), Err(RowFailure::MissingFields));
    }

    #[test]
    fn test_minimum_quantity_column() {
        let map = ColumnMap::resolve(&headers(&[
            "Nome",
            "Quantidade",
            "Quantidade Mínima",
            "Valor Unitário",
            "Categoria",
        ]))
        .unwrap();

        let row = vec![text("Tinta"), Cell::Number(3.0), Cell::Number(2.0), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(map.validate_row(&row).unwrap().minimum_quantity, 2);

        let row = vec![text("Tinta"), Cell::Number(3.0), Cell::Empty, Cell::Number(1.0), text("OUTROS")];
        assert_eq!(map.validate_row(&row).unwrap().minimum_quantity, DEFAULT_MINIMUM_QUANTITY);

        let row = vec![text("Tinta"), Cell::Number(3.0), Cell::Number(0.0), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(map.validate_row(&row), Err(RowFailure::MinimumQuantityTooSmall));

        let row = vec![text("Tinta"), Cell::Number(3.0), text("duas"), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(map.validate_row(&row), Err(RowFailure::MinimumQuantityNotNumeric));
    }

    #[test]
    fn test_range_and_category_failures() {
        let map = standard_map();

        let row = vec![text("Tinta"), Cell::Number(-1.0), Cell::Number(1.0), text("OUTROS")];
        assert_eq!(map.validate_row(&row), Err(RowFailure::NegativeQuantity));

        let row = vec![text("Tinta"), Cell::Number(1.0), Cell::Number(-0.5), text("OUTROS")];
        assert_eq!(map.validate_row(&row), Err(RowFailure::NegativeUnitValue));

        let row = vec![text("Tinta"), Cell::Number(1.0), text("caro"), text("OUTROS")];
        assert_eq!(map.validate_row(&row), Err(RowFailure::UnitValueNotNumeric));

        let row = vec![text("Tinta"), Cell::Number(1.0), Cell::Number(1.0), text("Vinil")];
        assert_eq!(
            map.validate_row(&row),
            Err(RowFailure::InvalidCategory("Vinil".to_string()))
        );
    }

    #[test]
    fn test_overlong_name_rejected_by_draft_validation() {
        let long = "x".repeat(101);
        let row = vec![text(&long), Cell::Number(1.0), Cell::Number(1.0), text("OUTROS")];
        assert!(matches!(standard_map().validate_row(&row), Err(RowFailure::Invalid(_))));
    }

    #[test]
    fn test_row_data_keeps_non_blank_as_text() {
        let row = vec![text("Tinta"), Cell::Empty, Cell::Number(2.0), text("OUTROS")];
        let data = standard_map().row_data(&row);
        assert_eq!(data.len(), 3);
        assert_eq!(data["Nome"], "Tinta");
        assert_eq!(data["Valor Unitário"], "2");
        assert!(!data.contains_key("Quantidade"));
    }

    #[test]
    fn test_report_outcomes() {
        let mut report = ImportReport::default();
        assert_eq!(report.outcome(), ImportOutcome::NothingToImport);

        report.record_success();
        assert_eq!(report.outcome(), ImportOutcome::Complete);
        assert_eq!(report.summary(), "1 products imported successfully");

        report.record_failure(3, RowFailure::MissingFields, BTreeMap::new());
        assert_eq!(report.outcome(), ImportOutcome::Partial);
        assert_eq!(report.summary(), "Partial import: 1 succeeded, 1 failed");
        assert_eq!(report.errors[0].error, "missing required fields");
    }

    #[test]
    fn test_row_numbers_offset_by_header() {
        assert_eq!(sheet_row_number(0), 2);
        assert!(is_blank_row(&[Cell::Empty, text("  ")]));
        assert!(!is_blank_row(&[Cell::Empty, Cell::Number(0.0)]));
    }
}
