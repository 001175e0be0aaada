use bakeplan_core::config::ConfigOverrides;

use crate::commands::{open_database, CommandResult, Failure, Invocation};

pub fn run(overrides: &ConfigOverrides) -> CommandResult {
    let invocation = match Invocation::start("migrate", overrides) {
        Ok(invocation) => invocation,
        Err(result) => return result,
    };

    let result = invocation.block_on(async {
        let pool = open_database(&invocation.config).await?;
        pool.close().await;
        tracing::info!(event_name = "cli.migrate.completed", "migrations applied");
        Ok::<_, Failure>(CommandResult::success("migrate", "applied pending migrations"))
    });

    invocation.finish(result)
}
