//! Rule sheet loader.
//!
//! Reads the CSV export of the authoring spreadsheet into `RuleRow`s.
//! Columns are located by header name, so column order is free and extra
//! columns are ignored.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use mxfw_core::{ANY, AddressType, Policy, RuleRow};

// ── Columns ─────────────────────────────────────────────────────────

const DEVICE: &[&str] = &["Device"];
const RULE_NUMBER: &[&str] = &["Rule#", "Rule #"];
const COMMENT: &[&str] = &["Comment"];
const POLICY: &[&str] = &["Policy"];
const PROTOCOL: &[&str] = &["Protocol"];
const SRC_TYPE: &[&str] = &["Src Type"];
const SRC_VALUE: &[&str] = &["Src Value"];
const DST_TYPE: &[&str] = &["Dst Type"];
const DST_VALUE: &[&str] = &["Dst Value"];
const SRC_PORT: &[&str] = &["Src Port"];
const DST_PORT: &[&str] = &["Dst Port"];

/// Columns that must be present in the header.
const REQUIRED: &[&[&str]] = &[DEVICE, POLICY, SRC_TYPE, SRC_VALUE, DST_TYPE, DST_VALUE];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },
}

/// Header positions resolved once per sheet.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Result<Self, SheetError> {
        let columns = Self {
            headers: headers
                .iter()
                .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
                .collect(),
        };
        for names in REQUIRED {
            if columns.position(names).is_none() {
                return Err(SheetError::MissingColumn(names[0]));
            }
        }
        Ok(columns)
    }

    fn position(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    }

    /// Trimmed cell value; empty when the column or cell is absent.
    fn get<'r>(&self, row: &'r csv::StringRecord, names: &[&str]) -> &'r str {
        self.position(names)
            .and_then(|idx| row.get(idx))
            .map_or("", str::trim)
    }
}

fn or_any(value: &str) -> String {
    if value.is_empty() {
        ANY.to_owned()
    } else {
        value.to_owned()
    }
}

fn parse_row(columns: &Columns, row: &csv::StringRecord, line: u64) -> Result<RuleRow, SheetError> {
    let fail = |reason: String| SheetError::Row { line, reason };

    let device_ref = columns.get(row, DEVICE);
    if device_ref.is_empty() {
        return Err(fail("device is blank".into()));
    }

    let raw_policy = columns.get(row, POLICY);
    let policy: Policy = raw_policy
        .parse()
        .map_err(|_| fail(format!("policy must be allow or deny, got '{raw_policy}'")))?;

    let raw_sequence = columns.get(row, RULE_NUMBER);
    let sequence = if raw_sequence.is_empty() {
        None
    } else {
        Some(
            raw_sequence
                .parse::<u32>()
                .map_err(|_| fail(format!("rule number '{raw_sequence}' is not a whole number")))?,
        )
    };

    Ok(RuleRow {
        device_ref: device_ref.to_owned(),
        sequence,
        comment: columns.get(row, COMMENT).to_owned(),
        policy,
        protocol: or_any(&columns.get(row, PROTOCOL).to_ascii_lowercase()),
        src_type: AddressType::parse_tag(columns.get(row, SRC_TYPE)),
        src_value: columns.get(row, SRC_VALUE).to_owned(),
        dst_type: AddressType::parse_tag(columns.get(row, DST_TYPE)),
        dst_value: columns.get(row, DST_VALUE).to_owned(),
        src_port: or_any(columns.get(row, SRC_PORT)),
        dst_port: or_any(columns.get(row, DST_PORT)),
    })
}

/// Parse rule rows from CSV text with a header row. Blank rows are skipped.
pub fn parse_rules<R: Read>(input: R) -> Result<Vec<RuleRow>, SheetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let columns = Columns::new(reader.headers()?)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);
        rows.push(parse_row(&columns, &record, line)?);
    }
    Ok(rows)
}

/// Load rule rows from a CSV file.
pub fn load_rules(path: &Path) -> Result<Vec<RuleRow>, SheetError> {
    let file = std::fs::File::open(path)?;
    parse_rules(std::io::BufReader::new(file))
}
