//! Record schemas for the three stored collections
//!
//! - [`RawGwEvent`]: one gravitational-wave detection
//! - [`RawAllEvent`]: a fully populated GW/GRB pair (every column required)
//! - [`CorrelatedResult`]: a correlator output row; every declared column is
//!   optional and undeclared columns are kept in `additional_fields`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::time::parse_utc_timestamp;

/// Column holding the "inside the combined error circle" flag
pub const BOOLEAN_FIELD: &str = "within_error_circle";

/// Columns coerced from string to number during ingestion
pub const NUMERIC_FIELDS: [&str; 17] = [
    "rank",
    "confidence_score",
    "time_diff_sec",
    "time_diff_hours",
    "angular_sep_deg",
    "temporal_score",
    "spatial_score",
    "significance_score",
    "gw_ra",
    "gw_dec",
    "grb_ra",
    "grb_dec",
    "gw_snr",
    "grb_flux",
    "gw_pos_error",
    "grb_pos_error",
    "combined_error_deg",
];

/// Names assigned by the store; CSV columns with these names are dropped
pub const RESERVED_FIELDS: [&str; 3] = ["id", "batch_id", "created_at"];

/// Gravitational-wave detection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGwEvent {
    pub event_id: String,
    pub source: String,
    pub event_type: String,
    pub utc_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ra_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dec_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_error_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_signal: Option<f64>,
}

/// Strict GW/GRB pair record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAllEvent {
    pub rank: f64,
    pub gw_event_id: String,
    pub grb_event_id: String,
    pub confidence_score: f64,
    pub time_diff_sec: f64,
    pub time_diff_hours: f64,
    pub angular_sep_deg: f64,
    pub within_error_circle: bool,
    pub temporal_score: f64,
    pub spatial_score: f64,
    pub significance_score: f64,
    pub gw_time: DateTime<Utc>,
    pub grb_time: DateTime<Utc>,
    pub gw_ra: f64,
    pub gw_dec: f64,
    pub grb_ra: f64,
    pub grb_dec: f64,
    pub gw_snr: f64,
    pub grb_flux: f64,
    pub gw_pos_error: f64,
    pub grb_pos_error: f64,
    pub combined_error_deg: f64,
}

/// Declared columns of a correlated result, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_diff_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_diff_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angular_sep_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within_error_circle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_ra: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_dec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_ra: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_dec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_snr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_flux: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw_pos_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grb_pos_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_error_deg: Option<f64>,
}

impl CorrelatedFields {
    fn numeric_slot(&mut self, name: &str) -> Option<&mut Option<f64>> {
        let slot = match name {
            "rank" => &mut self.rank,
            "confidence_score" => &mut self.confidence_score,
            "time_diff_sec" => &mut self.time_diff_sec,
            "time_diff_hours" => &mut self.time_diff_hours,
            "angular_sep_deg" => &mut self.angular_sep_deg,
            "temporal_score" => &mut self.temporal_score,
            "spatial_score" => &mut self.spatial_score,
            "significance_score" => &mut self.significance_score,
            "gw_ra" => &mut self.gw_ra,
            "gw_dec" => &mut self.gw_dec,
            "grb_ra" => &mut self.grb_ra,
            "grb_dec" => &mut self.grb_dec,
            "gw_snr" => &mut self.gw_snr,
            "grb_flux" => &mut self.grb_flux,
            "gw_pos_error" => &mut self.gw_pos_error,
            "grb_pos_error" => &mut self.grb_pos_error,
            "combined_error_deg" => &mut self.combined_error_deg,
            _ => return None,
        };
        Some(slot)
    }
}

/// Correlator output row
///
/// Serializes as a single flat object: declared columns first, then every
/// entry of `additional_fields`. A declared column whose raw value could not
/// be coerced is kept verbatim in `additional_fields` under its own name, so
/// the flat form still shows the original string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelatedResult {
    #[serde(flatten)]
    pub fields: CorrelatedFields,
    #[serde(flatten)]
    pub additional_fields: BTreeMap<String, String>,
}

impl CorrelatedResult {
    /// Apply one raw CSV cell to the record
    ///
    /// - `within_error_circle` becomes `true` only for a case-insensitive "true"
    /// - numeric columns are parsed when non-empty and finite
    /// - `gw_time` / `grb_time` are parsed as UTC timestamps
    /// - anything else, or anything that fails to coerce, lands in
    ///   `additional_fields` untouched
    ///
    /// Setting the same column twice keeps only the later value.
    pub fn set_raw_field(&mut self, name: &str, raw: &str) {
        self.additional_fields.remove(name);
        match name {
            BOOLEAN_FIELD => {
                self.fields.within_error_circle = Some(raw.to_lowercase() == "true");
            }
            "gw_event_id" => self.fields.gw_event_id = Some(raw.to_string()),
            "grb_event_id" => self.fields.grb_event_id = Some(raw.to_string()),
            "gw_time" | "grb_time" => {
                let parsed = parse_utc_timestamp(raw);
                if name == "gw_time" {
                    self.fields.gw_time = parsed;
                } else {
                    self.fields.grb_time = parsed;
                }
                if parsed.is_none() {
                    self.keep_raw(name, raw);
                }
            }
            _ if RESERVED_FIELDS.contains(&name) => {
                tracing::debug!(column = name, "Dropping CSV column with reserved name");
            }
            _ if NUMERIC_FIELDS.contains(&name) => {
                let parsed = parse_number(raw);
                if let Some(slot) = self.fields.numeric_slot(name) {
                    *slot = parsed;
                }
                if parsed.is_none() {
                    self.keep_raw(name, raw);
                }
            }
            _ => self.keep_raw(name, raw),
        }
    }

    fn keep_raw(&mut self, name: &str, raw: &str) {
        self.additional_fields
            .insert(name.to_string(), raw.to_string());
    }

    /// The (gw_event_id, grb_event_id) pair, when both are present
    pub fn pair_key(&self) -> Option<(&str, &str)> {
        match (&self.fields.gw_event_id, &self.fields.grb_event_id) {
            (Some(gw), Some(grb)) => Some((gw.as_str(), grb.as_str())),
            _ => None,
        }
    }
}

/// Parse a numeric cell; empty, non-numeric and non-finite values yield `None`
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A correlated result as stored, with store-assigned metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCorrelated {
    pub id: i64,
    pub batch_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: CorrelatedResult,
}

/// A raw record as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: i64,
    #[serde(flatten)]
    pub record: T,
}
