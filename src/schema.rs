/// Column-name constants and fixed business thresholds.
/// Single source of truth - also exported to Python via PyO3.

// ── Inventory columns ───────────────────────────────────────────────────────
pub mod inventory {
    pub const SKU_ID: &str = "sku_id";
    pub const CATEGORY: &str = "category";
    pub const NAME: &str = "name";
    pub const MRP: &str = "mrp";
    pub const DISCOUNT_PERCENT: &str = "discount_percent";
    pub const AVAILABLE_QUANTITY: &str = "available_quantity";
    pub const DISCOUNTED_SELLING_PRICE: &str = "discounted_selling_price";
    pub const WEIGHT_IN_GMS: &str = "weight_in_gms";
    pub const OUT_OF_STOCK: &str = "out_of_stock";
    pub const QUANTITY: &str = "quantity";

    /// Table column order after loading.
    pub const ALL: [&str; 10] = [
        SKU_ID,
        CATEGORY,
        NAME,
        MRP,
        DISCOUNT_PERCENT,
        AVAILABLE_QUANTITY,
        DISCOUNTED_SELLING_PRICE,
        WEIGHT_IN_GMS,
        OUT_OF_STOCK,
        QUANTITY,
    ];
}

// ── Source header names ─────────────────────────────────────────────────────
pub mod source {
    use super::inventory;

    /// (source header, table column). Headers are matched case-insensitively,
    /// and the table column name itself is always accepted too.
    pub const HEADERS: [(&str, &str); 9] = [
        ("category", inventory::CATEGORY),
        ("name", inventory::NAME),
        ("mrp", inventory::MRP),
        ("discountPercent", inventory::DISCOUNT_PERCENT),
        ("availableQuantity", inventory::AVAILABLE_QUANTITY),
        ("discountedSellingPrice", inventory::DISCOUNTED_SELLING_PRICE),
        ("weightInGms", inventory::WEIGHT_IN_GMS),
        ("outOfStock", inventory::OUT_OF_STOCK),
        ("quantity", inventory::QUANTITY),
    ];

    pub const OPTIONAL: [&str; 2] = [inventory::CATEGORY, inventory::WEIGHT_IN_GMS];
}

// ── Derived query columns ───────────────────────────────────────────────────
pub mod derived {
    pub const REVENUE: &str = "revenue";
    pub const TOTAL_REVENUE: &str = "total_revenue";
    pub const AVG_DISCOUNT: &str = "avg_discount";
    pub const PRICE_PER_GRAM: &str = "price_per_gram";
    pub const TOTAL_WEIGHT_IN_GMS: &str = "total_weight_in_gms";
    pub const TOTAL_COUNT: &str = "total_count";
    pub const OUT_OF_STOCK_COUNT: &str = "out_of_stock_count";
    pub const OUT_OF_STOCK_RATE: &str = "out_of_stock_rate";
    pub const REVENUE_RANK: &str = "revenue_rank";
    pub const WEIGHT_CATEGORY: &str = "weight_category";
}

// ── Weight buckets ──────────────────────────────────────────────────────────
pub mod weight_bucket {
    pub const LOW: &str = "Low Weight";
    pub const MEDIUM: &str = "Medium Weight";
    pub const BULK: &str = "Bulk Weight";

    /// Below this is Low.
    pub const MEDIUM_MIN_GMS: i64 = 1000;
    /// Up to and including this is Medium.
    pub const MEDIUM_MAX_GMS: i64 = 5000;
}

// ── Business thresholds ─────────────────────────────────────────────────────
pub mod thresholds {
    /// Minor units per major unit (paise per rupee).
    pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;
    pub const HIGH_MRP: f64 = 300.0;
    pub const EXPENSIVE_MRP: f64 = 500.0;
    pub const LOW_DISCOUNT_PERCENT: f64 = 10.0;
    pub const TOP_REVENUE_RANK: u32 = 3;
    pub const DEFAULT_TOP_N: usize = 10;
}
