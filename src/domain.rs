//! Canonical record shapes for the conformed and dimensional layers.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::table::{RowView, ScalarType, Schema, TableRecord, Value};

/// Sales channel, fixed by the source a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SalesChannel {
    Offline,
    Online,
}

impl SalesChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesChannel::Offline => "OFFLINE",
            SalesChannel::Online => "ONLINE",
        }
    }
}

impl fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalesChannel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "OFFLINE" => Ok(SalesChannel::Offline),
            "ONLINE" => Ok(SalesChannel::Online),
            other => Err(format!("unknown channel '{}'", other)),
        }
    }
}

impl From<SalesChannel> for Value {
    fn from(channel: SalesChannel) -> Self {
        Value::from(channel.as_str())
    }
}

fn channel_at(row: &RowView<'_>, table: &str) -> Result<SalesChannel> {
    let raw = row.text(CHANNEL)?;
    raw.parse()
        .map_err(|_| PipelineError::parse(table, CHANNEL, row.row_index(), raw))
}

/// Full English weekday name ("Monday" ... "Sunday")
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One validated sale in the conformed `sales_unified` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSale {
    pub sale_id: String,
    pub sale_date: NaiveDate,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub channel: SalesChannel,
    pub location: Option<String>,
    pub total_revenue: Decimal,
    pub year: i32,
    pub month: u32,
    pub day_of_week: String,
}

impl UnifiedSale {
    /// Assemble a sale, deriving revenue and calendar fields.
    /// Returns `None` when `quantity * unit_price` does not fit a decimal.
    pub fn derive(
        sale_id: String,
        sale_date: NaiveDate,
        product_id: String,
        quantity: i64,
        unit_price: Decimal,
        channel: SalesChannel,
        location: Option<String>,
    ) -> Option<Self> {
        let total_revenue = Decimal::from(quantity).checked_mul(unit_price)?;
        Some(Self {
            sale_id,
            sale_date,
            product_id,
            quantity,
            unit_price,
            channel,
            location,
            total_revenue,
            year: sale_date.year(),
            month: sale_date.month(),
            day_of_week: weekday_name(sale_date.weekday()).to_string(),
        })
    }
}

impl TableRecord for UnifiedSale {
    const TABLE: &'static str = SALES_UNIFIED;

    fn schema() -> Schema {
        Schema::of(&[
            (SALE_ID, ScalarType::Utf8),
            (SALE_DATE, ScalarType::Date),
            (PRODUCT_ID, ScalarType::Utf8),
            (QUANTITY, ScalarType::Int64),
            (UNIT_PRICE, ScalarType::Decimal),
            (CHANNEL, ScalarType::Utf8),
            (LOCATION, ScalarType::Utf8),
            (TOTAL_REVENUE, ScalarType::Decimal),
            (YEAR, ScalarType::Int64),
            (MONTH, ScalarType::Int64),
            (DAY_OF_WEEK, ScalarType::Utf8),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.sale_id.as_str()),
            Value::Date(self.sale_date),
            Value::from(self.product_id.as_str()),
            Value::Int64(self.quantity),
            Value::Decimal(self.unit_price),
            Value::from(self.channel),
            Value::from(self.location.clone()),
            Value::Decimal(self.total_revenue),
            Value::Int64(i64::from(self.year)),
            Value::Int64(i64::from(self.month)),
            Value::from(self.day_of_week.as_str()),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            sale_id: row.text(SALE_ID)?,
            sale_date: row.date(SALE_DATE)?,
            product_id: row.text(PRODUCT_ID)?,
            quantity: row.int(QUANTITY)?,
            unit_price: row.decimal(UNIT_PRICE)?,
            channel: channel_at(row, Self::TABLE)?,
            location: row.opt_text(LOCATION)?,
            total_revenue: row.decimal(TOTAL_REVENUE)?,
            year: row.narrow_int(YEAR)?,
            month: row.narrow_int(MONTH)?,
            day_of_week: row.text(DAY_OF_WEEK)?,
        })
    }
}

/// One inventory position in the conformed `inventory_clean` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanInventory {
    pub warehouse_id: Option<String>,
    pub product_id: Option<String>,
    pub stock_on_hand: i64,
    pub reorder_level: i64,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub last_updated: NaiveDateTime,
}

impl CleanInventory {
    /// Clamp negative stock to zero and derive the stock flags
    pub fn derive(
        warehouse_id: Option<String>,
        product_id: Option<String>,
        stock_on_hand: i64,
        reorder_level: i64,
        last_updated: NaiveDateTime,
    ) -> Self {
        let stock_on_hand = stock_on_hand.max(0);
        Self {
            warehouse_id,
            product_id,
            stock_on_hand,
            reorder_level,
            is_low_stock: stock_on_hand < reorder_level,
            is_out_of_stock: stock_on_hand == 0,
            last_updated,
        }
    }
}

impl TableRecord for CleanInventory {
    const TABLE: &'static str = INVENTORY_CLEAN;

    fn schema() -> Schema {
        Schema::of(&[
            (WAREHOUSE_ID, ScalarType::Utf8),
            (PRODUCT_ID, ScalarType::Utf8),
            (STOCK_ON_HAND, ScalarType::Int64),
            (REORDER_LEVEL, ScalarType::Int64),
            (IS_LOW_STOCK, ScalarType::Boolean),
            (IS_OUT_OF_STOCK, ScalarType::Boolean),
            (LAST_UPDATED, ScalarType::Timestamp),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.warehouse_id.clone()),
            Value::from(self.product_id.clone()),
            Value::Int64(self.stock_on_hand),
            Value::Int64(self.reorder_level),
            Value::Boolean(self.is_low_stock),
            Value::Boolean(self.is_out_of_stock),
            Value::Timestamp(self.last_updated),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            warehouse_id: row.opt_text(WAREHOUSE_ID)?,
            product_id: row.opt_text(PRODUCT_ID)?,
            stock_on_hand: row.int(STOCK_ON_HAND)?,
            reorder_level: row.int(REORDER_LEVEL)?,
            is_low_stock: row.boolean(IS_LOW_STOCK)?,
            is_out_of_stock: row.boolean(IS_OUT_OF_STOCK)?,
            last_updated: row.timestamp(LAST_UPDATED)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimProduct {
    pub product_key: i64,
    pub product_id: String,
}

impl TableRecord for DimProduct {
    const TABLE: &'static str = DIM_PRODUCT;

    fn schema() -> Schema {
        Schema::of(&[(PRODUCT_KEY, ScalarType::Int64), (PRODUCT_ID, ScalarType::Utf8)])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![Value::Int64(self.product_key), Value::from(self.product_id.as_str())]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            product_key: row.int(PRODUCT_KEY)?,
            product_id: row.text(PRODUCT_ID)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimLocation {
    pub location_key: i64,
    pub location: Option<String>,
    pub channel: SalesChannel,
}

impl TableRecord for DimLocation {
    const TABLE: &'static str = DIM_LOCATION;

    fn schema() -> Schema {
        Schema::of(&[
            (LOCATION_KEY, ScalarType::Int64),
            (LOCATION, ScalarType::Utf8),
            (CHANNEL, ScalarType::Utf8),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int64(self.location_key),
            Value::from(self.location.clone()),
            Value::from(self.channel),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            location_key: row.int(LOCATION_KEY)?,
            location: row.opt_text(LOCATION)?,
            channel: channel_at(row, Self::TABLE)?,
        })
    }
}

/// One row of `fact_sales`; references dimensions by natural key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSales {
    pub sale_key: i64,
    pub sale_id: String,
    pub sale_date: NaiveDate,
    pub product_id: String,
    pub location: Option<String>,
    pub channel: SalesChannel,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_revenue: Decimal,
    pub year: i32,
    pub month: u32,
}

impl FactSales {
    pub fn from_sale(sale_key: i64, sale: &UnifiedSale) -> Self {
        Self {
            sale_key,
            sale_id: sale.sale_id.clone(),
            sale_date: sale.sale_date,
            product_id: sale.product_id.clone(),
            location: sale.location.clone(),
            channel: sale.channel,
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            total_revenue: sale.total_revenue,
            year: sale.year,
            month: sale.month,
        }
    }
}

impl TableRecord for FactSales {
    const TABLE: &'static str = FACT_SALES;

    fn schema() -> Schema {
        Schema::of(&[
            (SALE_KEY, ScalarType::Int64),
            (SALE_ID, ScalarType::Utf8),
            (SALE_DATE, ScalarType::Date),
            (PRODUCT_ID, ScalarType::Utf8),
            (LOCATION, ScalarType::Utf8),
            (CHANNEL, ScalarType::Utf8),
            (QUANTITY, ScalarType::Int64),
            (UNIT_PRICE, ScalarType::Decimal),
            (TOTAL_REVENUE, ScalarType::Decimal),
            (YEAR, ScalarType::Int64),
            (MONTH, ScalarType::Int64),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int64(self.sale_key),
            Value::from(self.sale_id.as_str()),
            Value::Date(self.sale_date),
            Value::from(self.product_id.as_str()),
            Value::from(self.location.clone()),
            Value::from(self.channel),
            Value::Int64(self.quantity),
            Value::Decimal(self.unit_price),
            Value::Decimal(self.total_revenue),
            Value::Int64(i64::from(self.year)),
            Value::Int64(i64::from(self.month)),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            sale_key: row.int(SALE_KEY)?,
            sale_id: row.text(SALE_ID)?,
            sale_date: row.date(SALE_DATE)?,
            product_id: row.text(PRODUCT_ID)?,
            location: row.opt_text(LOCATION)?,
            channel: channel_at(row, Self::TABLE)?,
            quantity: row.int(QUANTITY)?,
            unit_price: row.decimal(UNIT_PRICE)?,
            total_revenue: row.decimal(TOTAL_REVENUE)?,
            year: row.narrow_int(YEAR)?,
            month: row.narrow_int(MONTH)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactInventory {
    pub inventory_key: i64,
    pub warehouse_id: Option<String>,
    pub product_id: Option<String>,
    pub stock_on_hand: i64,
    pub reorder_level: i64,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub last_updated: NaiveDateTime,
}

impl FactInventory {
    pub fn from_position(inventory_key: i64, position: &CleanInventory) -> Self {
        Self {
            inventory_key,
            warehouse_id: position.warehouse_id.clone(),
            product_id: position.product_id.clone(),
            stock_on_hand: position.stock_on_hand,
            reorder_level: position.reorder_level,
            is_low_stock: position.is_low_stock,
            is_out_of_stock: position.is_out_of_stock,
            last_updated: position.last_updated,
        }
    }
}

impl TableRecord for FactInventory {
    const TABLE: &'static str = FACT_INVENTORY;

    fn schema() -> Schema {
        Schema::of(&[
            (INVENTORY_KEY, ScalarType::Int64),
            (WAREHOUSE_ID, ScalarType::Utf8),
            (PRODUCT_ID, ScalarType::Utf8),
            (STOCK_ON_HAND, ScalarType::Int64),
            (REORDER_LEVEL, ScalarType::Int64),
            (IS_LOW_STOCK, ScalarType::Boolean),
            (IS_OUT_OF_STOCK, ScalarType::Boolean),
            (LAST_UPDATED, ScalarType::Timestamp),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int64(self.inventory_key),
            Value::from(self.warehouse_id.clone()),
            Value::from(self.product_id.clone()),
            Value::Int64(self.stock_on_hand),
            Value::Int64(self.reorder_level),
            Value::Boolean(self.is_low_stock),
            Value::Boolean(self.is_out_of_stock),
            Value::Timestamp(self.last_updated),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            inventory_key: row.int(INVENTORY_KEY)?,
            warehouse_id: row.opt_text(WAREHOUSE_ID)?,
            product_id: row.opt_text(PRODUCT_ID)?,
            stock_on_hand: row.int(STOCK_ON_HAND)?,
            reorder_level: row.int(REORDER_LEVEL)?,
            is_low_stock: row.boolean(IS_LOW_STOCK)?,
            is_out_of_stock: row.boolean(IS_OUT_OF_STOCK)?,
            last_updated: row.timestamp(LAST_UPDATED)?,
        })
    }
}
