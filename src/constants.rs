/// Table names at each stage boundary. These are stable across runs.

// Raw layer (produced by ingestion)
pub const POS_TRANSACTIONS: &str = "pos_transactions";
pub const ECOMMERCE_ORDERS: &str = "ecommerce_orders";
pub const WAREHOUSE_INVENTORY: &str = "warehouse_inventory";

// Conformed layer
pub const SALES_UNIFIED: &str = "sales_unified";
pub const INVENTORY_CLEAN: &str = "inventory_clean";

// Dimensional layer
pub const DIM_PRODUCT: &str = "dim_product";
pub const DIM_LOCATION: &str = "dim_location";
pub const FACT_SALES: &str = "fact_sales";
pub const FACT_INVENTORY: &str = "fact_inventory";

// Ingestion metadata stamped on every raw table
pub const INGESTION_TIMESTAMP: &str = "ingestion_timestamp";
pub const SOURCE_SYSTEM: &str = "source_system";

// Source-system labels
pub const POS_SYSTEM: &str = "POS";
pub const ECOMMERCE_SYSTEM: &str = "ECOMMERCE";
pub const WAREHOUSE_SYSTEM: &str = "WAREHOUSE";

// Canonical sales columns
pub const SALE_ID: &str = "sale_id";
pub const SALE_DATE: &str = "sale_date";
pub const PRODUCT_ID: &str = "product_id";
pub const QUANTITY: &str = "quantity";
pub const UNIT_PRICE: &str = "unit_price";
pub const CHANNEL: &str = "channel";
pub const LOCATION: &str = "location";
pub const TOTAL_REVENUE: &str = "total_revenue";
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";
pub const DAY_OF_WEEK: &str = "day_of_week";

// Inventory columns
pub const WAREHOUSE_ID: &str = "warehouse_id";
pub const STOCK_ON_HAND: &str = "stock_on_hand";
pub const REORDER_LEVEL: &str = "reorder_level";
pub const IS_LOW_STOCK: &str = "is_low_stock";
pub const IS_OUT_OF_STOCK: &str = "is_out_of_stock";
pub const LAST_UPDATED: &str = "last_updated";

// Surrogate keys
pub const PRODUCT_KEY: &str = "product_key";
pub const LOCATION_KEY: &str = "location_key";
pub const SALE_KEY: &str = "sale_key";
pub const INVENTORY_KEY: &str = "inventory_key";

/// Every table the raw layer must provide
pub fn raw_tables() -> Vec<&'static str> {
    vec![POS_TRANSACTIONS, ECOMMERCE_ORDERS, WAREHOUSE_INVENTORY]
}
