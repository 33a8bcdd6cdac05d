//! Row-level data quality rules for sales.
//!
//! Violations here are never fatal: the offending row is dropped and counted.
//! Rules run in a fixed order (duplicates, missing values, ranges) so a null is
//! never counted as a range violation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::mapping::{SalesSource, StagedSale};
use crate::domain::SalesChannel;
use crate::table::Value;

/// Why a row was filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityViolation {
    /// `sale_id` already seen earlier in concatenation order
    DuplicateKey,
    /// A required field is null, blank or not coercible to its type
    MissingRequired,
    /// `quantity <= 0`, `unit_price <= 0`, or revenue not representable
    OutOfRange,
}

impl QualityViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityViolation::DuplicateKey => "duplicate_key",
            QualityViolation::MissingRequired => "missing_required",
            QualityViolation::OutOfRange => "out_of_range",
        }
    }
}

/// Rows dropped per violation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub duplicate_key: usize,
    pub missing_required: usize,
    pub out_of_range: usize,
}

impl DropCounts {
    pub fn record(&mut self, violation: QualityViolation) {
        match violation {
            QualityViolation::DuplicateKey => self.duplicate_key += 1,
            QualityViolation::MissingRequired => self.missing_required += 1,
            QualityViolation::OutOfRange => self.out_of_range += 1,
        }
    }

    pub fn get(&self, violation: QualityViolation) -> usize {
        match violation {
            QualityViolation::DuplicateKey => self.duplicate_key,
            QualityViolation::MissingRequired => self.missing_required,
            QualityViolation::OutOfRange => self.out_of_range,
        }
    }

    pub fn total(&self) -> usize {
        self.duplicate_key + self.missing_required + self.out_of_range
    }
}

/// A sale whose required fields are present and typed
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedSale {
    pub source: SalesSource,
    pub source_row: usize,
    pub sale_id: String,
    /// Still raw; parsed after filtering so dropped rows never fail the run
    pub sale_date: Value,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub channel: SalesChannel,
    pub location: Option<String>,
}

/// Keep the first occurrence of each `sale_id`. All null ids share one key.
///
/// Ids are compared in the text form they are published in, trimmed, so `1001` and
/// `"1001 "` are the same sale.
pub fn deduplicate(staged: Vec<StagedSale>, counts: &mut DropCounts) -> Vec<StagedSale> {
    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(staged.len());
    staged
        .into_iter()
        .filter(|sale| {
            let fresh = seen.insert(sale.sale_id.coerce_text());
            if !fresh {
                debug!("Dropping duplicate sale_id {}", sale.sale_id);
                counts.record(QualityViolation::DuplicateKey);
            }
            fresh
        })
        .collect()
}

fn check(sale: &StagedSale) -> Option<CheckedSale> {
    Some(CheckedSale {
        source: sale.source,
        source_row: sale.source_row,
        sale_id: sale.sale_id.coerce_text()?,
        sale_date: sale.sale_date.clone(),
        product_id: sale.product_id.coerce_text()?,
        quantity: sale.quantity.coerce_i64()?,
        unit_price: sale.unit_price.coerce_decimal()?,
        channel: sale.channel,
        location: sale.location.coerce_text(),
    })
}

/// Drop rows whose sale_id, product_id, quantity or unit_price is missing
pub fn require_fields(staged: Vec<StagedSale>, counts: &mut DropCounts) -> Vec<CheckedSale> {
    staged
        .iter()
        .filter_map(|sale| {
            let checked = check(sale);
            if checked.is_none() {
                counts.record(QualityViolation::MissingRequired);
            }
            checked
        })
        .collect()
}

/// Drop rows with non-positive quantity or price
pub fn enforce_ranges(sales: Vec<CheckedSale>, counts: &mut DropCounts) -> Vec<CheckedSale> {
    sales
        .into_iter()
        .filter(|sale| {
            let in_range = sale.quantity > 0
                && sale.unit_price > Decimal::ZERO
                && Decimal::from(sale.quantity).checked_mul(sale.unit_price).is_some();
            if !in_range {
                counts.record(QualityViolation::OutOfRange);
            }
            in_range
        })
        .collect()
}

/// Run every sales rule in order
pub fn apply(staged: Vec<StagedSale>) -> (Vec<CheckedSale>, DropCounts) {
    let mut counts = DropCounts::default();
    let unique = deduplicate(staged, &mut counts);
    let complete = require_fields(unique, &mut counts);
    let valid = enforce_ranges(complete, &mut counts);
    (valid, counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(id: Value, product: Value, qty: Value, price: Value) -> StagedSale {
        StagedSale {
            source: SalesSource::Pos,
            source_row: 0,
            sale_id: id,
            sale_date: Value::from("2024-01-05"),
            product_id: product,
            quantity: qty,
            unit_price: price,
            channel: SalesChannel::Offline,
            location: Value::from("S1"),
        }
    }

    fn good(id: &str) -> StagedSale {
        staged(Value::from(id), Value::from("P1"), Value::Int64(2), Value::Decimal(Decimal::new(1000, 2)))
    }

    #[test]
    fn test_duplicates_keep_first() {
        let mut second = good("T1");
        second.product_id = Value::from("P9");
        let (valid, counts) = apply(vec![good("T1"), second, good("T2")]);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].product_id, "P1");
        assert_eq!(counts.duplicate_key, 1);
    }

    #[test]
    fn test_ids_collide_on_their_published_text() {
        let mut online = good(" 1001 ");
        online.source = SalesSource::Ecommerce;
        online.channel = SalesChannel::Online;
        let rows = vec![
            staged(Value::Int64(1001), Value::from("P1"), Value::Int64(1), Value::Decimal(Decimal::ONE)),
            online,
            good("T1 "),
            good("T1"),
        ];
        let (valid, counts) = apply(rows);
        let ids: Vec<&str> = valid.iter().map(|s| s.sale_id.as_str()).collect();
        assert_eq!(ids, vec!["1001", "T1"]);
        assert_eq!(valid[0].channel, SalesChannel::Offline);
        assert_eq!(counts.duplicate_key, 2);
    }

    #[test]
    fn test_null_is_missing_not_out_of_range() {
        let rows = vec![
            staged(Value::from("T1"), Value::from("P1"), Value::Null, Value::Decimal(Decimal::ONE)),
            staged(Value::from("T2"), Value::Null, Value::Int64(1), Value::Decimal(Decimal::ONE)),
            staged(Value::from("T3"), Value::from("P1"), Value::Int64(1), Value::from("n/a")),
        ];
        let (valid, counts) = apply(rows);
        assert!(valid.is_empty());
        assert_eq!(counts.missing_required, 3);
        assert_eq!(counts.out_of_range, 0);
    }

    #[test]
    fn test_non_positive_values_are_out_of_range() {
        let rows = vec![
            staged(Value::from("T1"), Value::from("P1"), Value::Int64(0), Value::Decimal(Decimal::ONE)),
            staged(Value::from("T2"), Value::from("P1"), Value::Int64(-1), Value::Decimal(Decimal::ONE)),
            staged(Value::from("T3"), Value::from("P1"), Value::Int64(1), Value::Decimal(Decimal::ZERO)),
            good("T4"),
        ];
        let (valid, counts) = apply(rows);
        assert_eq!(valid.len(), 1);
        assert_eq!(counts.out_of_range, 3);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_duplicate_check_runs_before_missing_check() {
        // the duplicate is dropped as a duplicate even though it is also incomplete
        let incomplete = staged(Value::from("T1"), Value::Null, Value::Int64(1), Value::Decimal(Decimal::ONE));
        let (_, counts) = apply(vec![good("T1"), incomplete]);
        assert_eq!(counts.duplicate_key, 1);
        assert_eq!(counts.missing_required, 0);
    }

    #[test]
    fn test_null_ids_share_one_key() {
        let a = staged(Value::Null, Value::from("P1"), Value::Int64(1), Value::Decimal(Decimal::ONE));
        let (_, counts) = apply(vec![a.clone(), a]);
        assert_eq!(counts.duplicate_key, 1);
        assert_eq!(counts.missing_required, 1);
    }

    #[test]
    fn test_violation_labels() {
        let mut counts = DropCounts::default();
        counts.record(QualityViolation::OutOfRange);
        assert_eq!(counts.get(QualityViolation::OutOfRange), 1);
        assert_eq!(QualityViolation::MissingRequired.as_str(), "missing_required");
    }
}
