use polars::prelude::*;
use tracing::debug;

use crate::error::InventoryError;
use crate::schema::derived::*;
use crate::schema::inventory::*;
use crate::schema::{thresholds, weight_bucket};
use crate::table::InventoryTable;

/// The fixed catalog of analysis queries.
///
/// Every query is a pure read of the table; they can run in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    TopDiscounts,
    RevenueByCategory,
    HighMrpOutOfStock,
    AverageDiscountByCategory,
    BestValueForMoney,
    InventoryWeightByCategory,
    OutOfStockRateByCategory,
    TopRevenuePerCategory,
    LowDiscountExpensive,
    WeightBuckets,
}

/// Parameters shared by the queries that take any.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub top_n: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_n: thresholds::DEFAULT_TOP_N,
        }
    }
}

impl QueryOptions {
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.top_n == 0 {
            return Err(InventoryError::Config("top_n must be at least 1".into()));
        }
        Ok(())
    }
}

impl Query {
    pub const ALL: [Query; 10] = [
        Query::TopDiscounts,
        Query::RevenueByCategory,
        Query::HighMrpOutOfStock,
        Query::AverageDiscountByCategory,
        Query::BestValueForMoney,
        Query::InventoryWeightByCategory,
        Query::OutOfStockRateByCategory,
        Query::TopRevenuePerCategory,
        Query::LowDiscountExpensive,
        Query::WeightBuckets,
    ];

    /// Stable identifier, used for export file names and the Python API.
    pub fn slug(self) -> &'static str {
        match self {
            Query::TopDiscounts => "top_discounts",
            Query::RevenueByCategory => "revenue_by_category",
            Query::HighMrpOutOfStock => "high_mrp_out_of_stock",
            Query::AverageDiscountByCategory => "average_discount_by_category",
            Query::BestValueForMoney => "best_value_for_money",
            Query::InventoryWeightByCategory => "inventory_weight_by_category",
            Query::OutOfStockRateByCategory => "out_of_stock_rate_by_category",
            Query::TopRevenuePerCategory => "top_revenue_per_category",
            Query::LowDiscountExpensive => "low_discount_expensive",
            Query::WeightBuckets => "weight_buckets",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Query::TopDiscounts => "Top discounted products",
            Query::RevenueByCategory => "Estimated revenue by category",
            Query::HighMrpOutOfStock => "Out-of-stock products with MRP above 300",
            Query::AverageDiscountByCategory => "Average discount by category",
            Query::BestValueForMoney => "Best value for money (price per gram)",
            Query::InventoryWeightByCategory => "Inventory weight by category",
            Query::OutOfStockRateByCategory => "Out-of-stock rate by category",
            Query::TopRevenuePerCategory => "Top 3 products by revenue per category",
            Query::LowDiscountExpensive => "Expensive products with discount below 10%",
            Query::WeightBuckets => "Products by weight bucket",
        }
    }

    pub fn from_slug(s: &str) -> Option<Query> {
        Query::ALL.into_iter().find(|q| q.slug() == s)
    }

    pub fn run(
        self,
        table: &InventoryTable,
        options: &QueryOptions,
    ) -> Result<DataFrame, InventoryError> {
        options.validate()?;
        let df = match self {
            Query::TopDiscounts => top_discounts(table, options.top_n),
            Query::RevenueByCategory => revenue_by_category(table),
            Query::HighMrpOutOfStock => high_mrp_out_of_stock(table),
            Query::AverageDiscountByCategory => average_discount_by_category(table),
            Query::BestValueForMoney => best_value_for_money(table),
            Query::InventoryWeightByCategory => inventory_weight_by_category(table),
            Query::OutOfStockRateByCategory => out_of_stock_rate_by_category(table),
            Query::TopRevenuePerCategory => top_revenue_per_category(table),
            Query::LowDiscountExpensive => low_discount_expensive(table),
            Query::WeightBuckets => weight_buckets(table),
        }?;
        debug!(query = self.slug(), rows = df.height(), "query complete");
        Ok(df)
    }
}

// ── Queries ─────────────────────────────────────────────────────────────────

/// The `n` records with the highest discount. Returns `min(n, rows)` rows.
pub fn top_discounts(table: &InventoryTable, n: usize) -> Result<DataFrame, InventoryError> {
    let limit = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
    let df = table
        .lazy()
        .select([
            col(SKU_ID),
            col(NAME),
            col(CATEGORY),
            col(MRP),
            col(DISCOUNT_PERCENT),
        ])
        .sort_by_exprs([col(DISCOUNT_PERCENT)], sort_desc())
        .limit(limit)
        .collect()?;
    Ok(df)
}

/// Σ price × available quantity per category. Null categories form one group.
pub fn revenue_by_category(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .group_by([col(CATEGORY)])
        .agg([revenue().sum().alias(TOTAL_REVENUE)])
        .sort_by_exprs([col(TOTAL_REVENUE)], sort_desc())
        .collect()?;
    Ok(df)
}

/// Revenue of the whole table, for reconciling against the per-category sums.
pub fn total_revenue(table: &InventoryTable) -> Result<f64, InventoryError> {
    let df = table
        .lazy()
        .select([revenue().sum().alias(TOTAL_REVENUE)])
        .collect()?;
    Ok(df.column(TOTAL_REVENUE)?.f64()?.get(0).unwrap_or(0.0))
}

pub fn high_mrp_out_of_stock(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .filter(
            col(OUT_OF_STOCK)
                .and(col(MRP).gt(lit(thresholds::HIGH_MRP)))
                .fill_null(lit(false)),
        )
        .select([col(SKU_ID), col(NAME), col(CATEGORY), col(MRP)])
        .sort_by_exprs([col(MRP)], sort_desc())
        .collect()?;
    Ok(df)
}

/// Mean discount per category, rounded to 2 decimals.
pub fn average_discount_by_category(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .group_by([col(CATEGORY)])
        .agg([col(DISCOUNT_PERCENT).mean().alias(AVG_DISCOUNT)])
        .filter(col(AVG_DISCOUNT).is_not_null())
        .sort_by_exprs([col(AVG_DISCOUNT)], sort_desc())
        .collect()?;
    round_column(df, AVG_DISCOUNT, 2)
}

/// Records whose price per gram is strictly below the average price per gram.
///
/// Only records with a positive weight take part, both in the average and in
/// the result.
pub fn best_value_for_money(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .filter(col(WEIGHT_IN_GMS).gt(lit(0i64)).fill_null(lit(false)))
        .with_column(
            (col(DISCOUNTED_SELLING_PRICE) / col(WEIGHT_IN_GMS).cast(DataType::Float64))
                .alias(PRICE_PER_GRAM),
        )
        .filter(
            col(PRICE_PER_GRAM)
                .lt(col(PRICE_PER_GRAM).mean())
                .fill_null(lit(false)),
        )
        .select([
            col(SKU_ID),
            col(NAME),
            col(CATEGORY),
            col(DISCOUNTED_SELLING_PRICE),
            col(WEIGHT_IN_GMS),
            col(PRICE_PER_GRAM),
        ])
        .sort_by_exprs([col(PRICE_PER_GRAM)], sort_asc())
        .collect()?;
    Ok(df)
}

pub fn inventory_weight_by_category(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .group_by([col(CATEGORY)])
        .agg([(col(WEIGHT_IN_GMS) * col(AVAILABLE_QUANTITY))
            .sum()
            .alias(TOTAL_WEIGHT_IN_GMS)])
        .sort_by_exprs([col(TOTAL_WEIGHT_IN_GMS)], sort_desc())
        .collect()?;
    Ok(df)
}

/// Share of out-of-stock records per category, as a percentage (2 decimals).
pub fn out_of_stock_rate_by_category(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .group_by([col(CATEGORY)])
        .agg([
            col(SKU_ID).count().alias(TOTAL_COUNT),
            col(OUT_OF_STOCK)
                .cast(DataType::UInt32)
                .sum()
                .alias(OUT_OF_STOCK_COUNT),
        ])
        .with_column(
            (col(OUT_OF_STOCK_COUNT).cast(DataType::Float64)
                / col(TOTAL_COUNT).cast(DataType::Float64)
                * lit(100.0))
            .alias(OUT_OF_STOCK_RATE),
        )
        .sort_by_exprs([col(OUT_OF_STOCK_RATE)], sort_desc())
        .collect()?;
    round_column(df, OUT_OF_STOCK_RATE, 2)
}

/// Dense-ranks records by revenue within each category and keeps ranks 1-3.
///
/// Tied revenues share a rank, so more than three rows per category can
/// come back.
pub fn top_revenue_per_category(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let mut df = table
        .lazy()
        .select([
            col(SKU_ID),
            col(CATEGORY),
            col(NAME),
            col(DISCOUNTED_SELLING_PRICE),
            col(AVAILABLE_QUANTITY),
            revenue().alias(REVENUE),
        ])
        .sort_by_exprs(
            [col(CATEGORY), col(REVENUE)],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true])
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let ranks = {
        let categories = df.column(CATEGORY)?.str()?;
        let revenues = df.column(REVENUE)?.f64()?;
        dense_ranks(categories.into_iter().zip(revenues.into_iter()))
    };
    df.with_column(Column::new(REVENUE_RANK.into(), ranks))?;

    let df = df
        .lazy()
        .filter(col(REVENUE_RANK).lt_eq(lit(thresholds::TOP_REVENUE_RANK)))
        .collect()?;
    Ok(df)
}

pub fn low_discount_expensive(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .filter(
            col(MRP)
                .gt(lit(thresholds::EXPENSIVE_MRP))
                .and(col(DISCOUNT_PERCENT).lt(lit(thresholds::LOW_DISCOUNT_PERCENT)))
                .fill_null(lit(false)),
        )
        .select([
            col(SKU_ID),
            col(NAME),
            col(CATEGORY),
            col(MRP),
            col(DISCOUNT_PERCENT),
        ])
        .sort_by_exprs([col(MRP), col(DISCOUNT_PERCENT)], sort_desc())
        .collect()?;
    Ok(df)
}

/// Classify each record as Low (< 1000 g), Medium (1000-5000 g inclusive) or
/// Bulk (> 5000 g). A missing weight gets no bucket.
pub fn weight_buckets(table: &InventoryTable) -> Result<DataFrame, InventoryError> {
    let df = table
        .lazy()
        .select([
            col(SKU_ID),
            col(NAME),
            col(CATEGORY),
            col(WEIGHT_IN_GMS),
            weight_bucket_expr().alias(WEIGHT_CATEGORY),
        ])
        .collect()?;
    Ok(df)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn revenue() -> Expr {
    col(DISCOUNTED_SELLING_PRICE) * col(AVAILABLE_QUANTITY).cast(DataType::Float64)
}

fn weight_bucket_expr() -> Expr {
    when(col(WEIGHT_IN_GMS).is_null())
        .then(lit(NULL).cast(DataType::String))
        .when(col(WEIGHT_IN_GMS).lt(lit(weight_bucket::MEDIUM_MIN_GMS)))
        .then(lit(weight_bucket::LOW))
        .when(col(WEIGHT_IN_GMS).lt_eq(lit(weight_bucket::MEDIUM_MAX_GMS)))
        .then(lit(weight_bucket::MEDIUM))
        .otherwise(lit(weight_bucket::BULK))
}

fn sort_desc() -> SortMultipleOptions {
    SortMultipleOptions::default()
        .with_order_descending(true)
        .with_nulls_last(true)
        .with_maintain_order(true)
}

fn sort_asc() -> SortMultipleOptions {
    SortMultipleOptions::default()
        .with_nulls_last(true)
        .with_maintain_order(true)
}

/// Dense rank over rows already sorted by (key, value desc). The rank resets
/// when the key changes and advances only when the value changes.
fn dense_ranks<'a>(rows: impl Iterator<Item = (Option<&'a str>, Option<f64>)>) -> Vec<u32> {
    let mut ranks = Vec::new();
    let mut prev: Option<(Option<&str>, Option<f64>)> = None;
    let mut rank = 0u32;
    for (key, value) in rows {
        rank = match prev {
            Some((prev_key, prev_value)) if prev_key == key => {
                if prev_value == value {
                    rank
                } else {
                    rank + 1
                }
            }
            _ => 1,
        };
        prev = Some((key, value));
        ranks.push(rank);
    }
    ranks
}

/// Round a Float64 column half away from zero.
fn round_column(
    mut df: DataFrame,
    name: &str,
    decimals: i32,
) -> Result<DataFrame, InventoryError> {
    let factor = 10f64.powi(decimals);
    let rounded = df
        .column(name)?
        .f64()?
        .apply_values(move |v| (v * factor).round() / factor);
    df.with_column(rounded.into_series())?;
    Ok(df)
}
