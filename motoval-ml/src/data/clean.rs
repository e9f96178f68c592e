//! Listing cleaner: text-encoded numeric fields, imputation and derived features.
//!
//! The steps run in a fixed order because later steps read columns produced
//! by earlier ones:
//!
//! 1. drop duplicate rows, trim column names
//! 2. derive `cc` from the model name
//! 3. derive `brand` from the model name
//! 4. parse `mileage`, then impute it with the brand-group mean
//! 5. parse `power`, impute with the dataset mean
//! 6. parse `kms_driven`, impute with the dataset mean
//! 7. derive `bike_age` from the reference year
//! 8. drop rows without a price
//!
//! Unparsable values never raise; they become missing and are then imputed.

use crate::data::frame::{Cell, Frame, parse_number};
use crate::data::schema::columns;
use crate::error::MlError;
use motoval_core::CleaningConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

// ASCII digits only: `\d` would also match digits from other scripts, which
// `u32::from_str` cannot parse.
static CC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s?cc").expect("static cc pattern"));

/// Engine displacement from a free-text model name.
///
/// Matches `<digits>cc` or `<digits> cc` case-insensitively; the first match wins.
/// Only ASCII digits count, so `"３５０cc"` is skipped in favour of a later
/// ASCII match. No plausibility check is applied to the number.
pub fn extract_cc(model_name: &str) -> Option<u32> {
    let lowered = model_name.to_lowercase();
    CC_PATTERN
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First whitespace-delimited token of the model name, verbatim.
///
/// Spelling or casing variants of one manufacturer stay distinct brands.
pub fn extract_brand(model_name: &str) -> Option<String> {
    model_name.split_whitespace().next().map(str::to_string)
}

/// `"45 kmpl"` -> 45.0. Strips `kmpl` then `kms` after lower-casing.
pub fn parse_mileage(raw: &str) -> Option<f64> {
    let lowered = raw.to_lowercase();
    parse_number(&lowered.replace("kmpl", "").replace("kms", ""))
}

/// `"20 bhp"` -> 20.0. Strips `bhp` then `hp` after lower-casing.
pub fn parse_power(raw: &str) -> Option<f64> {
    let lowered = raw.to_lowercase();
    parse_number(&lowered.replace("bhp", "").replace("hp", ""))
}

/// `"17,000 km"` -> 17000.0. Strips `km` and thousands separators.
///
/// The unit match is case-sensitive, so `"17,000 Km"` does not parse and is imputed.
pub fn parse_kms_driven(raw: &str) -> Option<f64> {
    parse_number(&raw.replace("km", "").replace(',', ""))
}

/// Per-field parse and imputation counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub column: String,
    /// Present values that did not parse.
    pub parse_failures: usize,
    /// Values filled by imputation.
    pub imputed: usize,
    /// Values filled from the dataset mean because their group had no observations.
    pub group_fallbacks: usize,
    /// Values still missing after imputation.
    pub remaining_missing: usize,
}

/// Summary of a cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub missing_price_dropped: usize,
    pub output_rows: usize,
    pub unknown_cc: usize,
    pub fields: Vec<FieldStats>,
}

impl CleaningReport {
    pub fn field(&self, column: &str) -> Option<&FieldStats> {
        self.fields.iter().find(|f| f.column == column)
    }
}

/// Best-effort cleaner for raw listings.
#[derive(Debug, Clone)]
pub struct Cleaner {
    reference_year: i32,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::from_config(&CleaningConfig::default())
    }
}

impl Cleaner {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(config.reference_year)
    }

    /// Clean a raw frame. Fails only when a required column is absent.
    pub fn clean(&self, mut frame: Frame) -> Result<(Frame, CleaningReport), MlError> {
        let mut report = CleaningReport {
            input_rows: frame.row_count(),
            ..Default::default()
        };

        report.duplicates_removed = frame.drop_duplicates();
        frame.trim_column_names();

        for required in columns::CLEANER_REQUIRED {
            frame.require_column(required)?;
        }
        let name_idx = frame.require_column(columns::MODEL_NAME)?;

        let names: Vec<Option<String>> = frame.column_values(name_idx).map(Cell::to_text).collect();

        let cc: Vec<Option<u32>> = names
            .iter()
            .map(|n| n.as_deref().and_then(extract_cc))
            .collect();
        report.unknown_cc = cc.iter().filter(|c| c.is_none()).count();

        let brands: Vec<Option<String>> = names
            .iter()
            .map(|n| n.as_deref().and_then(extract_brand))
            .collect();

        let (mut mileage, mut mileage_stats) =
            parse_column(&frame, columns::MILEAGE, parse_mileage)?;
        impute_by_group(&mut mileage, &brands, &mut mileage_stats);

        let (mut power, mut power_stats) = parse_column(&frame, columns::POWER, parse_power)?;
        impute_global(&mut power, &mut power_stats);

        let (mut kms, mut kms_stats) = parse_column(&frame, columns::KMS_DRIVEN, parse_kms_driven)?;
        impute_global(&mut kms, &mut kms_stats);

        let year_idx = frame.require_column(columns::MODEL_YEAR)?;
        let reference_year = f64::from(self.reference_year);
        let bike_age: Vec<Cell> = frame
            .column_values(year_idx)
            .map(|year| Cell::from_number(year.to_number().map(|y| reference_year - y)))
            .collect();

        frame.upsert_column(columns::MILEAGE, to_cells(mileage))?;
        frame.upsert_column(columns::POWER, to_cells(power))?;
        frame.upsert_column(columns::KMS_DRIVEN, to_cells(kms))?;
        frame.upsert_column(
            columns::CC,
            cc.into_iter()
                .map(|c| Cell::from_number(c.map(f64::from)))
                .collect(),
        )?;
        frame.upsert_column(
            columns::BRAND,
            brands
                .into_iter()
                .map(|b| b.map_or(Cell::Missing, Cell::Text))
                .collect(),
        )?;
        frame.upsert_column(columns::BIKE_AGE, bike_age)?;

        let price_idx = frame.require_column(columns::PRICE)?;
        let prices: Vec<Cell> = frame
            .column_values(price_idx)
            .map(|p| Cell::from_number(p.to_number()))
            .collect();
        frame.set_column(price_idx, prices)?;
        report.missing_price_dropped = frame.retain_rows(|row| !row[price_idx].is_missing());

        report.output_rows = frame.row_count();
        report.fields = vec![mileage_stats, power_stats, kms_stats];

        tracing::info!(
            input_rows = report.input_rows,
            duplicates_removed = report.duplicates_removed,
            missing_price_dropped = report.missing_price_dropped,
            output_rows = report.output_rows,
            unknown_cc = report.unknown_cc,
            "cleaning complete"
        );
        for stats in &report.fields {
            tracing::debug!(
                column = %stats.column,
                parse_failures = stats.parse_failures,
                imputed = stats.imputed,
                group_fallbacks = stats.group_fallbacks,
                remaining_missing = stats.remaining_missing,
                "field imputation"
            );
        }

        Ok((frame, report))
    }

    /// Read a raw CSV, clean it, and write the cleaned CSV (parent directories are created).
    pub fn clean_file(&self, input: &Path, output: &Path) -> Result<CleaningReport, MlError> {
        let raw = Frame::read_csv(input)?;
        let (cleaned, report) = self.clean(raw)?;
        cleaned.write_csv(output)?;
        tracing::info!(output = %output.display(), rows = report.output_rows, "cleaned dataset written");
        Ok(report)
    }
}

fn parse_column(
    frame: &Frame,
    column: &str,
    parse: fn(&str) -> Option<f64>,
) -> Result<(Vec<Option<f64>>, FieldStats), MlError> {
    let idx = frame.require_column(column)?;
    let mut stats = FieldStats {
        column: column.to_string(),
        ..Default::default()
    };
    let values = frame
        .column_values(idx)
        .map(|cell| {
            let text = cell.to_text()?;
            let parsed = parse(&text);
            if parsed.is_none() {
                stats.parse_failures += 1;
            }
            parsed
        })
        .collect();
    Ok((values, stats))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fill gaps with the dataset-wide mean.
fn impute_global(values: &mut [Option<f64>], stats: &mut FieldStats) {
    let fill = mean(values.iter().flatten().copied());
    for value in values.iter_mut().filter(|v| v.is_none()) {
        if let Some(fill) = fill {
            *value = Some(fill);
            stats.imputed += 1;
        }
    }
    stats.remaining_missing = values.iter().filter(|v| v.is_none()).count();
    if stats.remaining_missing > 0 {
        tracing::warn!(
            column = %stats.column,
            missing = stats.remaining_missing,
            "column has no parseable values; leaving gaps unfilled"
        );
    }
}

/// Fill gaps with the mean of the row's group.
///
/// A group with no observed values (or a row with no group) falls back to the dataset mean.
fn impute_by_group(values: &mut [Option<f64>], groups: &[Option<String>], stats: &mut FieldStats) {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for (value, group) in values.iter().zip(groups) {
        if let (Some(v), Some(g)) = (value, group) {
            let entry = sums.entry(g.as_str()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    let global = mean(values.iter().flatten().copied());

    for (value, group) in values.iter_mut().zip(groups) {
        if value.is_some() {
            continue;
        }
        let group_mean = group
            .as_deref()
            .and_then(|g| sums.get(g))
            .map(|(sum, count)| sum / *count as f64);
        match (group_mean, global) {
            (Some(m), _) => {
                *value = Some(m);
                stats.imputed += 1;
            }
            (None, Some(m)) => {
                *value = Some(m);
                stats.imputed += 1;
                stats.group_fallbacks += 1;
            }
            (None, None) => {}
        }
    }

    stats.remaining_missing = values.iter().filter(|v| v.is_none()).count();
    if stats.group_fallbacks > 0 {
        tracing::warn!(
            column = %stats.column,
            rows = stats.group_fallbacks,
            "group had no observed values; imputed with dataset mean"
        );
    }
    if stats.remaining_missing > 0 {
        tracing::warn!(
            column = %stats.column,
            missing = stats.remaining_missing,
            "column has no parseable values; leaving gaps unfilled"
        );
    }
}

fn to_cells(values: Vec<Option<f64>>) -> Vec<Cell> {
    values.into_iter().map(Cell::from_number).collect()
}
