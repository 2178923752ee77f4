use polars::prelude::*;
use tracing::{info, warn};

use crate::error::InventoryError;
use crate::schema::inventory::*;
use crate::table::{ids_of, InventoryTable};

/// The invariant checks the validator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    MissingFields,
    PriceInconsistent,
    NonPositivePrice,
    StockFlagMismatch,
}

impl Violation {
    pub const ALL: [Violation; 4] = [
        Violation::MissingFields,
        Violation::PriceInconsistent,
        Violation::NonPositivePrice,
        Violation::StockFlagMismatch,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Violation::MissingFields => "missing_fields",
            Violation::PriceInconsistent => "price_inconsistent",
            Violation::NonPositivePrice => "non_positive_price",
            Violation::StockFlagMismatch => "stock_flag_mismatch",
        }
    }

    /// Row predicate that is true for violating records. Never null.
    pub(crate) fn predicate(self) -> Expr {
        match self {
            Violation::MissingFields => {
                let blank_name = col(NAME)
                    .str()
                    .strip_chars(lit(" \t\r\n"))
                    .eq(lit(""))
                    .fill_null(lit(false));
                [
                    MRP,
                    DISCOUNT_PERCENT,
                    AVAILABLE_QUANTITY,
                    DISCOUNTED_SELLING_PRICE,
                    OUT_OF_STOCK,
                    QUANTITY,
                ]
                .into_iter()
                .fold(col(NAME).is_null().or(blank_name), |acc, c| {
                    acc.or(col(c).is_null())
                })
            }
            Violation::PriceInconsistent => col(DISCOUNTED_SELLING_PRICE)
                .gt(col(MRP))
                .fill_null(lit(false)),
            // A null or NaN price is not positive either.
            Violation::NonPositivePrice => col(MRP)
                .gt(lit(0.0))
                .and(col(MRP).is_finite())
                .and(col(DISCOUNTED_SELLING_PRICE).gt(lit(0.0)))
                .and(col(DISCOUNTED_SELLING_PRICE).is_finite())
                .fill_null(lit(false))
                .not(),
            Violation::StockFlagMismatch => col(OUT_OF_STOCK)
                .neq(col(AVAILABLE_QUANTITY).eq(lit(0i64)))
                .fill_null(lit(false)),
        }
    }
}

/// Record ids per violated invariant. Each list is sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub missing_fields: Vec<u32>,
    pub price_inconsistent: Vec<u32>,
    pub non_positive_price: Vec<u32>,
    pub stock_flag_mismatch: Vec<u32>,
}

impl ValidationReport {
    pub fn ids(&self, violation: Violation) -> &[u32] {
        match violation {
            Violation::MissingFields => &self.missing_fields,
            Violation::PriceInconsistent => &self.price_inconsistent,
            Violation::NonPositivePrice => &self.non_positive_price,
            Violation::StockFlagMismatch => &self.stock_flag_mismatch,
        }
    }

    pub fn counts(&self) -> [(Violation, usize); 4] {
        Violation::ALL.map(|v| (v, self.ids(v).len()))
    }

    pub fn total_violations(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total_violations() == 0
    }
}

/// Check every invariant against the table without mutating it.
pub fn validate(table: &InventoryTable) -> Result<ValidationReport, InventoryError> {
    let report = ValidationReport {
        missing_fields: matching_ids(table, Violation::MissingFields)?,
        price_inconsistent: matching_ids(table, Violation::PriceInconsistent)?,
        non_positive_price: matching_ids(table, Violation::NonPositivePrice)?,
        stock_flag_mismatch: matching_ids(table, Violation::StockFlagMismatch)?,
    };

    if report.is_clean() {
        info!(rows = table.height(), "inventory validation clean");
    } else {
        warn!(
            rows = table.height(),
            missing_fields = report.missing_fields.len(),
            price_inconsistent = report.price_inconsistent.len(),
            non_positive_price = report.non_positive_price.len(),
            stock_flag_mismatch = report.stock_flag_mismatch.len(),
            "inventory validation found violations"
        );
    }
    Ok(report)
}

pub(crate) fn matching_ids(
    table: &InventoryTable,
    violation: Violation,
) -> Result<Vec<u32>, InventoryError> {
    let df = table
        .lazy()
        .filter(violation.predicate())
        .select([col(SKU_ID)])
        .collect()?;
    let mut ids = ids_of(&df)?;
    ids.sort_unstable();
    Ok(ids)
}
