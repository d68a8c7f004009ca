//! CSV ingestion
//!
//! Two readers share one CSV dialect (comma separated, header row required,
//! blank lines skipped, ragged rows tolerated):
//!
//! - [`parse_correlated_csv`] is lenient: every row becomes a
//!   [`CorrelatedResult`], coercing what it can and keeping the rest verbatim.
//! - [`parse_strict_csv`] is used by the raw event importer: a missing or
//!   malformed required column rejects the whole file with the row number.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::models::{parse_number, CorrelatedResult, RawAllEvent, RawGwEvent};
use crate::time::parse_utc_timestamp;
use crate::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_bom(input: &[u8]) -> &[u8] {
    input.strip_prefix(UTF8_BOM).unwrap_or(input)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Parse correlator output into correlated results
///
/// Returns an empty vector for an empty or header-only file; callers decide
/// whether that is an error. Bytes that are not valid UTF-8 are replaced
/// with U+FFFD rather than failing the file. A repeated column name is
/// read from its first occurrence only.
pub fn parse_correlated_csv(input: &[u8]) -> Result<Vec<CorrelatedResult>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(input));

    let mut seen = HashSet::new();
    let columns: Vec<Option<String>> = reader
        .byte_headers()?
        .iter()
        .map(|raw| {
            let name = String::from_utf8_lossy(raw).into_owned();
            if name.is_empty() || !seen.insert(name.clone()) {
                None
            } else {
                Some(name)
            }
        })
        .collect();
    let mut rows = Vec::new();

    for (index, record) in reader.byte_records().enumerate() {
        let record = record?;
        if record
            .iter()
            .all(|field| field.iter().all(u8::is_ascii_whitespace)) {
            continue;
        }
        if record.len() > columns.len() {
            debug!(
                row = index + 1,
                extra = record.len() - columns.len(),
                "Ignoring values beyond the header row"
            );
        }

        let mut result = CorrelatedResult::default();
        for (column, raw) in columns.iter().zip(record.iter()) {
            if let Some(name) = column {
                result.set_raw_field(name, &String::from_utf8_lossy(raw));
            }
        }
        rows.push(result);
    }

    Ok(rows)
}

/// One data row of a strict CSV, addressed by column name
pub struct CsvRow<'a> {
    /// 1-based data row number (header excluded)
    pub line: usize,
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl<'a> CsvRow<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        let index = self.headers.iter().position(|h| h == name)?;
        self.record.get(index).map(str::trim).filter(|v| !v.is_empty())
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidInput(format!("row {}: {}", self.line, message))
    }

    pub fn required_text(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(str::to_string)
            .ok_or_else(|| self.invalid(format!("missing required column '{}'", name)))
    }

    pub fn required_number(&self, name: &str) -> Result<f64> {
        let raw = self
            .get(name)
            .ok_or_else(|| self.invalid(format!("missing required column '{}'", name)))?;
        parse_number(raw)
            .ok_or_else(|| self.invalid(format!("column '{}' is not a number: {}", name, raw)))
    }

    pub fn optional_number(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => parse_number(raw).map(Some).ok_or_else(|| {
                self.invalid(format!("column '{}' is not a number: {}", name, raw))
            }),
        }
    }

    pub fn required_time(&self, name: &str) -> Result<DateTime<Utc>> {
        let raw = self
            .get(name)
            .ok_or_else(|| self.invalid(format!("missing required column '{}'", name)))?;
        parse_utc_timestamp(raw)
            .ok_or_else(|| self.invalid(format!("column '{}' is not a timestamp: {}", name, raw)))
    }

    pub fn required_bool(&self, name: &str) -> Result<bool> {
        let raw = self
            .get(name)
            .ok_or_else(|| self.invalid(format!("missing required column '{}'", name)))?;
        match raw.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.invalid(format!("column '{}' is not a boolean: {}", name, raw))),
        }
    }
}

/// A record type that can be built from one strict CSV row
pub trait FromCsvRow: Sized {
    fn from_csv_row(row: &CsvRow<'_>) -> Result<Self>;
}

impl FromCsvRow for RawGwEvent {
    fn from_csv_row(row: &CsvRow<'_>) -> Result<Self> {
        Ok(Self {
            event_id: row.required_text("event_id")?,
            source: row.required_text("source")?,
            event_type: row.required_text("event_type")?,
            utc_time: row.required_time("utc_time")?,
            ra_deg: row.optional_number("ra_deg")?,
            dec_deg: row.optional_number("dec_deg")?,
            pos_error_deg: row.optional_number("pos_error_deg")?,
            strength_signal: row.optional_number("strength_signal")?,
        })
    }
}

impl FromCsvRow for RawAllEvent {
    fn from_csv_row(row: &CsvRow<'_>) -> Result<Self> {
        Ok(Self {
            rank: row.required_number("rank")?,
            gw_event_id: row.required_text("gw_event_id")?,
            grb_event_id: row.required_text("grb_event_id")?,
            confidence_score: row.required_number("confidence_score")?,
            time_diff_sec: row.required_number("time_diff_sec")?,
            time_diff_hours: row.required_number("time_diff_hours")?,
            angular_sep_deg: row.required_number("angular_sep_deg")?,
            within_error_circle: row.required_bool("within_error_circle")?,
            temporal_score: row.required_number("temporal_score")?,
            spatial_score: row.required_number("spatial_score")?,
            significance_score: row.required_number("significance_score")?,
            gw_time: row.required_time("gw_time")?,
            grb_time: row.required_time("grb_time")?,
            gw_ra: row.required_number("gw_ra")?,
            gw_dec: row.required_number("gw_dec")?,
            grb_ra: row.required_number("grb_ra")?,
            grb_dec: row.required_number("grb_dec")?,
            gw_snr: row.required_number("gw_snr")?,
            grb_flux: row.required_number("grb_flux")?,
            gw_pos_error: row.required_number("gw_pos_error")?,
            grb_pos_error: row.required_number("grb_pos_error")?,
            combined_error_deg: row.required_number("combined_error_deg")?,
        })
    }
}

/// Parse every data row as `T`, failing on the first invalid row
pub fn parse_strict_csv<T: FromCsvRow>(input: &[u8]) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(input));

    let headers = reader.headers()?.clone();
    let mut out = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let row = CsvRow {
            line: index + 1,
            headers: &headers,
            record: &record,
        };
        out.push(T::from_csv_row(&row)?);
    }

    Ok(out)
}
