use std::sync::Arc;

use chrono::Utc;
use projection::prelude::*;
use rust_decimal::Decimal;

fn main() -> Result<()> {
    let options = OptionMap::from([
        (ANALYSIS_LENGTH.to_string(), "12".to_string()),
        (SIM_COUNT.to_string(), "2000".to_string()),
        (RANDOM_VARIABLE_TYPE.to_string(), "NORMAL".to_string()),
        (RANDOM_VARIABLE_MU.to_string(), "0.01".to_string()),
        (RANDOM_VARIABLE_SIGMA.to_string(), "0.05".to_string()),
        (RANDOM_VARIABLE_SCALE_FACTOR.to_string(), "100".to_string()),
        (SEED.to_string(), "7".to_string()),
    ]);

    let book = InvestmentBook::new();
    book.upsert(
        Investment::new("acme".into(), Decimal::new(14_235, 2), Utc::now())
            .with_name("ACME Corp")
            .with_options(options),
    )?;

    let pipeline = MonteCarloPipeline::new(&EngineConfig::new())?;
    let cache = ProjectionCache::new(
        Arc::new(book),
        Arc::new(InMemoryProjectionStore::new()),
        Arc::new(pipeline),
    );

    let result = cache.get_or_compute(&"acme".into(), None)?;
    println!("step        min        avg        max");
    for i in 0..result.len() {
        println!(
            "{:>4} {:>10.2} {:>10.2} {:>10.2}",
            i,
            result.min()[i],
            result.avg()[i],
            result.max()[i]
        );
    }
    Ok(())
}
