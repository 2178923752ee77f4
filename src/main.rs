use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use inventory_analytics::validate::Violation;
use inventory_analytics::{Pipeline, PipelineConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inventory_analytics=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env(std::env::args().nth(1))?;
    tracing::info!(source = %config.source.display(), "starting inventory report");

    let run = Pipeline::new(config).run()?;

    println!("== Data quality (as loaded)");
    for (violation, count) in run.initial.counts() {
        println!("{:<22} {}", violation.slug(), count);
    }
    println!(
        "purged {} record(s) with non-positive prices; {} remain",
        run.cleaned.purged.len(),
        run.table.height()
    );
    let mismatches = run.after_clean.ids(Violation::StockFlagMismatch).len();
    if mismatches > 0 {
        println!("{mismatches} record(s) still have an inconsistent out-of-stock flag");
    }

    for result in &run.results {
        println!();
        println!("== {}", result.query.title());
        println!("{}", result.frame);
    }

    for path in &run.exported {
        tracing::info!(path = %path.display(), "wrote result");
    }
    Ok(())
}
