use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::expense::{describe_expenses, Expense};

/// Columns every source row must carry. A header missing any of these means
/// the publisher changed the schema, and the whole year is rejected rather
/// than guessed at.
pub const EXPECTED_FIELDS: [&str; 24] = [
    "Parliamentary ID",
    "Year",
    "Date",
    "Claim Number",
    "Name",
    "Constituency",
    "Category",
    "Cost Type",
    "Short Description",
    "Details",
    "Journey Type",
    "From",
    "To",
    "Travel",
    "Nights",
    "Mileage",
    "Amount Claimed",
    "Amount Paid",
    "Amount Not Paid",
    "Amount Repaid",
    "Status",
    "Reason If Not Paid",
    "Supply Month",
    "Supply Period",
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("source data is missing expected column '{column}'")]
    MissingColumn { column: String },
    #[error("line {line}: missing value for required field '{field}'")]
    MissingValue { line: usize, field: String },
    #[error("line {line}: invalid value '{value}' for field '{field}'")]
    InvalidValue {
        line: usize,
        field: String,
        value: String,
    },
    #[error("no valid date format found for '{0}'")]
    BadDate(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse a source date. The publisher has used both ISO and UK day-first
/// forms across years.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ImportError> {
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(ImportError::BadDate(raw.to_string()))
}

/// Coerce an optional decimal-like field. Missing, non-numeric and
/// non-positive values all become absent; they are never an error.
pub fn positive_decimal_or_none(raw: Option<&str>) -> Option<Decimal> {
    let parsed: Decimal = raw?.trim().parse().ok()?;
    (parsed > Decimal::ZERO).then_some(parsed)
}

/// Read a year's worth of expense rows from CSV.
///
/// Fails fast on schema drift (missing column) or a hole in a required
/// field; tolerant fields (mileage, nights, free text) coerce to absent.
pub fn read_expenses<R: Read>(reader: R) -> Result<Vec<Expense>, ImportError> {
    let mut reader = csv::Reader::from_reader(reader);

    let headers = reader.headers()?.clone();
    for column in EXPECTED_FIELDS {
        if !headers.iter().any(|header| header == column) {
            return Err(ImportError::MissingColumn {
                column: column.to_string(),
            });
        }
    }
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(position, header)| (header, position))
        .collect();

    let mut expenses = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // +2: one for the header row, one for zero-based counting.
        let line = row + 2;

        let member_id_raw = required(&index, &record, line, "Parliamentary ID")?;
        let member_id = member_id_raw
            .parse()
            .map_err(|_| ImportError::InvalidValue {
                line,
                field: "Parliamentary ID".to_string(),
                value: member_id_raw.to_string(),
            })?;

        expenses.push(Expense {
            member_id,
            year_code: required(&index, &record, line, "Year")?.to_string(),
            claim_number: required(&index, &record, line, "Claim Number")?.to_string(),
            date: parse_date(required(&index, &record, line, "Date")?)?,
            category: required(&index, &record, line, "Category")?.to_string(),
            expense_type: required(&index, &record, line, "Cost Type")?.to_uppercase(),
            amount_claimed: required_decimal(&index, &record, line, "Amount Claimed")?,
            amount_paid: required_decimal(&index, &record, line, "Amount Paid")?,
            status: required(&index, &record, line, "Status")?.to_string(),
            short_desc: field(&index, &record, "Short Description").map(str::to_string),
            details: field(&index, &record, "Details").map(str::to_string),
            travel_from: field(&index, &record, "From").map(str::to_string),
            travel_to: field(&index, &record, "To").map(str::to_string),
            travel_type: field(&index, &record, "Travel").map(str::to_string),
            mileage: positive_decimal_or_none(field(&index, &record, "Mileage")),
            nights: positive_decimal_or_none(field(&index, &record, "Nights")),
        });
    }

    Ok(expenses)
}

fn field<'r>(
    index: &HashMap<&str, usize>,
    record: &'r csv::StringRecord,
    name: &str,
) -> Option<&'r str> {
    index
        .get(name)
        .and_then(|&position| record.get(position))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required<'r>(
    index: &HashMap<&str, usize>,
    record: &'r csv::StringRecord,
    line: usize,
    name: &str,
) -> Result<&'r str, ImportError> {
    field(index, record, name).ok_or_else(|| ImportError::MissingValue {
        line,
        field: name.to_string(),
    })
}

fn required_decimal(
    index: &HashMap<&str, usize>,
    record: &csv::StringRecord,
    line: usize,
    name: &str,
) -> Result<Decimal, ImportError> {
    let raw = required(index, record, line, name)?;
    raw.parse().map_err(|_| ImportError::InvalidValue {
        line,
        field: name.to_string(),
        value: raw.to_string(),
    })
}

/// Where a run's expense rows come from. The production fetcher (HTTP with
/// retry and caching) is one implementor; tests and local runs use
/// [`CsvDirSource`].
pub trait ExpenseSource {
    /// Load all rows published under one spreadsheet year code.
    fn load_year(&self, year_code: &str) -> anyhow::Result<Vec<Expense>>;
}

/// Reads `<dir>/<year_code>.csv`, the layout the fetcher's local cache uses.
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvDirSource { dir: dir.into() }
    }

    fn year_path(&self, year_code: &str) -> PathBuf {
        self.dir.join(format!("{year_code}.csv"))
    }
}

impl ExpenseSource for CsvDirSource {
    fn load_year(&self, year_code: &str) -> anyhow::Result<Vec<Expense>> {
        let path = self.year_path(year_code);
        if !path.exists() {
            // Year codes run ahead of publication, so a missing file is
            // expected for the newest codes.
            log::warn!("no data file at {}, treating year as empty", path.display());
            return Ok(Vec::new());
        }
        let file = File::open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let expenses = read_expenses(file)
            .with_context(|| format!("reading expenses for year {year_code}"))?;
        Ok(expenses)
    }
}

/// Load several years and combine them. Every year must load cleanly before
/// filtering starts; one bad year fails the batch.
pub fn load_years(
    source: &dyn ExpenseSource,
    year_codes: &[String],
) -> anyhow::Result<Vec<Expense>> {
    let mut all = Vec::new();
    for year_code in year_codes {
        let expenses = source.load_year(year_code)?;
        log::info!("year {year_code}: {}", describe_expenses(&expenses));
        all.extend(expenses);
    }
    Ok(all)
}

/// Spreadsheet year code for the financial year starting in `start_year`,
/// e.g. 2022 -> "22_23".
pub fn year_code(start_year: i32) -> String {
    format!(
        "{:02}_{:02}",
        start_year.rem_euclid(100),
        (start_year + 1).rem_euclid(100)
    )
}

/// Year codes from `from_year` through `to_year` inclusive.
pub fn year_codes_range(from_year: i32, to_year: i32) -> Vec<String> {
    (from_year..=to_year).map(year_code).collect()
}
