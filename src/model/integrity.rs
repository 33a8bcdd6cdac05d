//! Referential completeness between `fact_sales` and its dimensions.
//!
//! Facts reference dimensions by natural key, so the check joins on
//! `product_id` and on the `(location, channel)` pair.

use std::collections::HashSet;
use tracing::debug;

use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::table::{Table, Value};

const MAX_LISTED_ORPHANS: usize = 5;

fn keys<'a>(table: &'a Table, name: &str, columns: &[&str]) -> Result<Vec<Vec<&'a Value>>> {
    let indexes = columns
        .iter()
        .map(|c| table.schema().require(name, c))
        .collect::<Result<Vec<_>>>()?;
    Ok(table
        .rows()
        .iter()
        .map(|row| indexes.iter().map(|&i| &row[i]).collect())
        .collect())
}

/// Distinct fact keys absent from the dimension, in first-seen order
fn orphans<'a>(
    facts: &'a Table,
    dimension: &Table,
    dimension_name: &str,
    columns: &[&str],
) -> Result<Vec<Vec<&'a Value>>> {
    let known: HashSet<Vec<&Value>> = keys(dimension, dimension_name, columns)?.into_iter().collect();
    let mut reported = HashSet::new();
    Ok(keys(facts, FACT_SALES, columns)?
        .into_iter()
        .filter(|key| !known.contains(key) && reported.insert(key.clone()))
        .collect())
}

fn describe(keys: &[Vec<&Value>]) -> String {
    let listed: Vec<String> = keys
        .iter()
        .take(MAX_LISTED_ORPHANS)
        .map(|key| {
            let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
            format!("({})", parts.join(", "))
        })
        .collect();
    if keys.len() > MAX_LISTED_ORPHANS {
        format!("{} and {} more", listed.join(", "), keys.len() - MAX_LISTED_ORPHANS)
    } else {
        listed.join(", ")
    }
}

/// Every fact key must resolve to a dimension member
pub fn check_referential_completeness(
    fact_sales: &Table,
    dim_product: &Table,
    dim_location: &Table,
) -> Result<()> {
    let products = orphans(fact_sales, dim_product, DIM_PRODUCT, &[PRODUCT_ID])?;
    if !products.is_empty() {
        return Err(PipelineError::Integrity(format!(
            "{} {} value(s) in {} missing from {}: {}",
            products.len(),
            PRODUCT_ID,
            FACT_SALES,
            DIM_PRODUCT,
            describe(&products)
        )));
    }

    let locations = orphans(fact_sales, dim_location, DIM_LOCATION, &[LOCATION, CHANNEL])?;
    if !locations.is_empty() {
        return Err(PipelineError::Integrity(format!(
            "{} ({}, {}) pair(s) in {} missing from {}: {}",
            locations.len(),
            LOCATION,
            CHANNEL,
            FACT_SALES,
            DIM_LOCATION,
            describe(&locations)
        )));
    }

    debug!(
        "{} rows of {} resolve against {} and {}",
        fact_sales.num_rows(),
        FACT_SALES,
        DIM_PRODUCT,
        DIM_LOCATION
    );
    Ok(())
}
