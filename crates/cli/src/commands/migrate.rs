use crate::commands::{self, CommandFailure, CommandResult};
use buyline_db::migrations;

pub fn run() -> CommandResult {
    let env = match commands::prepare("migrate") {
        Ok(env) => env,
        Err(result) => return *result,
    };

    let result = env.runtime.block_on(async {
        let pool = commands::open_pool(&env.config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), CommandFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
