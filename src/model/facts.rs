use crate::domain::{CleanInventory, FactInventory, FactSales, UnifiedSale};
use crate::error::Result;
use crate::table::{from_table, to_table, Table};

/// One fact row per unified sale, `sale_key` assigned 1..=n in row order
pub fn build_fact_sales(sales: &Table) -> Result<Table> {
    let sales: Vec<UnifiedSale> = from_table(sales)?;
    let facts: Vec<FactSales> = sales
        .iter()
        .zip(1i64..)
        .map(|(sale, key)| FactSales::from_sale(key, sale))
        .collect();
    to_table(&facts)
}

/// One fact row per inventory position, `inventory_key` assigned 1..=n in row order
pub fn build_fact_inventory(inventory: &Table) -> Result<Table> {
    let positions: Vec<CleanInventory> = from_table(inventory)?;
    let facts: Vec<FactInventory> = positions
        .iter()
        .zip(1i64..)
        .map(|(position, key)| FactInventory::from_position(key, position))
        .collect();
    to_table(&facts)
}
