use polars::prelude::*;
use tracing::{info, warn};

use crate::error::InventoryError;
use crate::schema::inventory::*;
use crate::schema::thresholds::MINOR_UNITS_PER_MAJOR;
use crate::table::{ids_of, InventoryTable};
use crate::validate::{matching_ids, Violation};

/// Outcome of [`clean`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Ids of records deleted for a non-positive price.
    pub purged: Vec<u32>,
}

/// How to resolve an `out_of_stock` flag that disagrees with the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockFlagRepair {
    /// The quantity is right: `out_of_stock = available_quantity == 0`.
    TrustQuantity,
    /// The flag is right: out-of-stock rows get a quantity of 0. Rows flagged
    /// in stock with zero quantity stay unresolved.
    TrustFlag,
}

impl StockFlagRepair {
    pub fn from_slug(s: &str) -> Option<Self> {
        match s {
            "trust_quantity" => Some(Self::TrustQuantity),
            "trust_flag" => Some(Self::TrustFlag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub repaired: Vec<u32>,
    pub unresolved: Vec<u32>,
}

/// Normalize units, then purge records with a non-positive price.
pub fn clean(table: &mut InventoryTable) -> Result<CleanReport, InventoryError> {
    normalize_units(table)?;
    let purged = purge_invalid_prices(table)?;
    Ok(CleanReport { purged })
}

/// Convert `mrp` and `discounted_selling_price` from minor to major currency
/// units. Fails with [`InventoryError::AlreadyNormalized`] on a second call.
pub fn normalize_units(table: &mut InventoryTable) -> Result<(), InventoryError> {
    if table.is_normalized() {
        return Err(InventoryError::AlreadyNormalized);
    }

    let df = table
        .lazy()
        .with_columns([
            (col(MRP) / lit(MINOR_UNITS_PER_MAJOR)).alias(MRP),
            (col(DISCOUNTED_SELLING_PRICE) / lit(MINOR_UNITS_PER_MAJOR))
                .alias(DISCOUNTED_SELLING_PRICE),
        ])
        .collect()?;

    table.replace_frame(df);
    table.mark_normalized();
    info!(rows = table.height(), "normalized prices to major units");
    Ok(())
}

/// Delete every record whose `mrp` or `discounted_selling_price` is not
/// positive. Returns the deleted ids.
pub fn purge_invalid_prices(table: &mut InventoryTable) -> Result<Vec<u32>, InventoryError> {
    if !table.is_normalized() {
        warn!("purging invalid prices before unit normalization");
    }

    let purged = matching_ids(table, Violation::NonPositivePrice)?;
    if purged.is_empty() {
        return Ok(purged);
    }

    let df = table
        .lazy()
        .filter(Violation::NonPositivePrice.predicate().not())
        .collect()?;
    table.replace_frame(df);

    info!(
        purged = purged.len(),
        remaining = table.height(),
        "purged records with non-positive prices"
    );
    Ok(purged)
}

/// Resolve stock-flag mismatches with an explicit strategy.
pub fn repair_stock_flags(
    table: &mut InventoryTable,
    strategy: StockFlagRepair,
) -> Result<RepairOutcome, InventoryError> {
    let mismatched = matching_ids(table, Violation::StockFlagMismatch)?;
    if mismatched.is_empty() {
        return Ok(RepairOutcome::default());
    }

    let outcome = match strategy {
        StockFlagRepair::TrustQuantity => {
            let df = table
                .lazy()
                .with_column(
                    when(col(AVAILABLE_QUANTITY).is_not_null())
                        .then(col(AVAILABLE_QUANTITY).eq(lit(0i64)))
                        .otherwise(col(OUT_OF_STOCK))
                        .alias(OUT_OF_STOCK),
                )
                .collect()?;
            table.replace_frame(df);
            RepairOutcome {
                repaired: mismatched,
                unresolved: Vec::new(),
            }
        }
        StockFlagRepair::TrustFlag => {
            let flagged_with_stock = col(OUT_OF_STOCK).and(col(AVAILABLE_QUANTITY).gt(lit(0i64)));
            let repaired = ids_where(table, flagged_with_stock.clone())?;
            let unresolved = mismatched
                .into_iter()
                .filter(|id| repaired.binary_search(id).is_err())
                .collect();
            let df = table
                .lazy()
                .with_column(
                    when(flagged_with_stock)
                        .then(lit(0i64))
                        .otherwise(col(AVAILABLE_QUANTITY))
                        .alias(AVAILABLE_QUANTITY),
                )
                .collect()?;
            table.replace_frame(df);
            RepairOutcome {
                repaired,
                unresolved,
            }
        }
    };

    info!(
        ?strategy,
        repaired = outcome.repaired.len(),
        unresolved = outcome.unresolved.len(),
        "repaired stock flags"
    );
    Ok(outcome)
}

fn ids_where(table: &InventoryTable, predicate: Expr) -> Result<Vec<u32>, InventoryError> {
    let df = table
        .lazy()
        .filter(predicate.fill_null(lit(false)))
        .select([col(SKU_ID)])
        .collect()?;
    let mut ids = ids_of(&df)?;
    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::from_rows;
    use crate::table::RawRecord;
    use crate::validate::validate;

    fn row(name: &str, mrp: f64, dsp: f64, available: i64, out_of_stock: bool) -> RawRecord {
        RawRecord {
            category: Some("Dairy".into()),
            name: Some(name.into()),
            mrp,
            discounted_selling_price: dsp,
            available_quantity: available,
            out_of_stock,
            quantity: 1,
            ..Default::default()
        }
    }

    #[test]
    fn normalization_runs_once() {
        let mut table = from_rows(&[row("Milk", 5600.0, 5000.0, 3, false)]).unwrap();
        normalize_units(&mut table).unwrap();
        assert!(table.is_normalized());

        let err = normalize_units(&mut table).unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyNormalized));

        let record = table.record(1).unwrap().unwrap();
        assert_eq!(record.mrp, Some(56.0));
        assert_eq!(record.discounted_selling_price, Some(50.0));
    }

    #[test]
    fn purge_leaves_only_positive_prices() {
        let mut table = from_rows(&[
            row("Milk", 5600.0, 5000.0, 3, false),
            row("Curd", 0.0, 1000.0, 3, false),
            row("Paneer", 9000.0, 0.0, 3, false),
            row("Ghee", -100.0, -50.0, 3, false),
            row("Butter", 5000.0, 4500.0, 1, false),
        ])
        .unwrap();

        let report = clean(&mut table).unwrap();
        assert_eq!(report.purged, vec![2, 3, 4]);
        assert_eq!(table.ids().unwrap(), vec![1, 5]);
        for record in table.records().unwrap() {
            assert!(record.mrp.unwrap() > 0.0);
            assert!(record.discounted_selling_price.unwrap() > 0.0);
        }
        assert!(validate(&table).unwrap().non_positive_price.is_empty());
    }

    #[test]
    fn purge_is_idempotent() {
        let mut table = from_rows(&[
            row("Milk", 5600.0, 5000.0, 3, false),
            row("Curd", 0.0, 0.0, 3, false),
        ])
        .unwrap();
        clean(&mut table).unwrap();
        assert!(purge_invalid_prices(&mut table).unwrap().is_empty());
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn trust_quantity_rewrites_flags() {
        let mut table = from_rows(&[
            row("Milk", 100.0, 90.0, 0, false),
            row("Curd", 100.0, 90.0, 4, true),
            row("Ghee", 100.0, 90.0, 4, false),
        ])
        .unwrap();

        let outcome = repair_stock_flags(&mut table, StockFlagRepair::TrustQuantity).unwrap();
        assert_eq!(outcome.repaired, vec![1, 2]);
        assert!(outcome.unresolved.is_empty());

        let flags: Vec<Option<bool>> = table
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.out_of_stock)
            .collect();
        assert_eq!(flags, vec![Some(true), Some(false), Some(false)]);
        assert!(validate(&table).unwrap().stock_flag_mismatch.is_empty());
    }

    #[test]
    fn trust_flag_zeroes_quantity_and_reports_unresolved() {
        let mut table = from_rows(&[
            row("Milk", 100.0, 90.0, 0, false),
            row("Curd", 100.0, 90.0, 4, true),
            row("Ghee", 100.0, 90.0, 4, false),
        ])
        .unwrap();

        let outcome = repair_stock_flags(&mut table, StockFlagRepair::TrustFlag).unwrap();
        assert_eq!(outcome.repaired, vec![2]);
        assert_eq!(outcome.unresolved, vec![1]);

        let curd = table.record(2).unwrap().unwrap();
        assert_eq!(curd.available_quantity, Some(0));
        assert_eq!(curd.out_of_stock, Some(true));
        assert_eq!(validate(&table).unwrap().stock_flag_mismatch, vec![1]);
    }
}
