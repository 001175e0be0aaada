use bakeplan_core::config::ConfigOverrides;
use bakeplan_db::DemoBakery;
use serde_json::json;

use crate::commands::{open_database, CommandResult, Failure, Invocation};

pub fn run(overrides: &ConfigOverrides) -> CommandResult {
    let invocation = match Invocation::start("seed", overrides) {
        Ok(invocation) => invocation,
        Err(result) => return result,
    };

    let result = invocation.block_on(async {
        let pool = open_database(&invocation.config).await?;

        let loaded = DemoBakery::load(&pool)
            .await
            .map_err(|error| Failure::seed("seed_execution", error.to_string()));
        let verified = match loaded {
            Ok(seed) => DemoBakery::verify(&pool)
                .await
                .map_err(|error| Failure::seed("seed_verification", error.to_string()))
                .map(|verification| (seed, verification)),
            Err(failure) => Err(failure),
        };
        pool.close().await;
        let (seed, verification) = verified?;

        if !verification.all_present {
            let failed: Vec<&str> = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect();
            return Err(Failure::seed("seed_verification", verification_message(&failed)));
        }

        let message = format!(
            "demo bakery loaded: {} ({} ingredients, {} sales events through {})",
            seed.recipes.join(", "),
            seed.ingredients,
            seed.sales_events,
            seed.anchor_date
        );
        Ok::<_, Failure>(CommandResult::success_with_data(
            "seed",
            message,
            Some(json!({
                "recipes": seed.recipes,
                "ingredients": seed.ingredients,
                "sales_events": seed.sales_events,
                "anchor_date": seed.anchor_date.to_string(),
            })),
        ))
    });

    invocation.finish(result)
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some demo data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
