use std::sync::Arc;

use crate::commands::{self, CommandFailure, CommandResult};
use buyline_agent::OrderValidator;
use buyline_core::domain::order::MediaBuyId;
use buyline_core::validation::OrderValidation;
use buyline_db::migrations;
use buyline_db::repositories::{
    SqlMediaBuyRepository, SqlPackageRepository, SqlPrincipalRepository, SqlProductRepository,
};

pub fn run(media_buy_id: &str) -> CommandResult {
    let env = match commands::prepare("validate") {
        Ok(env) => env,
        Err(result) => return *result,
    };

    let result = env.runtime.block_on(async {
        let pool = commands::open_pool(&env.config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let validator = OrderValidator::new(
            Arc::new(SqlMediaBuyRepository::new(pool.clone())),
            Arc::new(SqlPackageRepository::new(pool.clone())),
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlPrincipalRepository::new(pool.clone())),
        );
        let validation = validator.validate(&MediaBuyId(media_buy_id.to_string())).await;

        pool.close().await;
        Ok::<OrderValidation, CommandFailure>(validation)
    });

    match result {
        Ok(validation) => {
            let message = render_validation(&validation);
            if validation.all_passed {
                CommandResult::success("validate", message)
            } else {
                CommandResult::failure("validate", "validation_failed", message, 1)
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("validate", error_class, message, exit_code)
        }
    }
}

fn render_validation(validation: &OrderValidation) -> String {
    let mut lines = vec![validation.summary.clone()];
    for check in &validation.checks {
        let marker = if check.passed { "ok" } else { "fail" };
        lines.push(format!("- [{marker}] {}: {}", check.check_name, check.message));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use buyline_core::domain::order::MediaBuyId;
    use buyline_core::validation::{OrderValidation, ValidationResult};

    use super::render_validation;

    #[test]
    fn rendered_report_lists_every_check_with_markers() {
        let validation = OrderValidation::from_checks(
            MediaBuyId("mb".to_string()),
            vec![
                ValidationResult::pass("media_buy_exists", "found"),
                ValidationResult::fail("budget_limits", "over ceiling"),
            ],
        );

        let rendered = render_validation(&validation);
        assert!(rendered.starts_with("❌ VALIDATION FAILED: budget_limits"));
        assert!(rendered.contains("- [ok] media_buy_exists: found"));
        assert!(rendered.contains("- [fail] budget_limits: over ceiling"));
    }
}
