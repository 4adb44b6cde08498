use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use buyline_agent::{ApprovalWorkflow, AuditLogger, CemAgent, OrderValidator};
use buyline_core::config::{AppConfig, ConfigError, LoadOptions};
use buyline_db::repositories::{
    SqlAuditLogRepository, SqlMediaBuyRepository, SqlPackageRepository, SqlPrincipalRepository,
    SqlProductRepository,
};
use buyline_db::{connect_with_settings, migrations, DbPool};
use buyline_slack::events::{
    BlockActionHandler, EventDispatcher, SlashCommandHandler, ViewSubmissionHandler,
};
use buyline_slack::socket::{ReconnectPolicy, SocketModeRunner};
use buyline_slack::NoopSocketTransport;

use crate::approvals::{
    CampaignService, LoggingChatPoster, SlackApprovalNotifier, WorkflowApprovalService,
};
use crate::llm::HttpLlmClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<ApprovalWorkflow>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let media_buys = Arc::new(SqlMediaBuyRepository::new(db_pool.clone()));
    let packages = Arc::new(SqlPackageRepository::new(db_pool.clone()));
    let products = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let principals = Arc::new(SqlPrincipalRepository::new(db_pool.clone()));
    let audit = Arc::new(SqlAuditLogRepository::new(db_pool.clone()));

    let validator =
        OrderValidator::new(media_buys.clone(), packages.clone(), products.clone(), principals);
    let cem = CemAgent::new(Arc::new(HttpLlmClient::from_config(&config.llm)))
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    let notifier = Arc::new(SlackApprovalNotifier::new(
        Arc::new(LoggingChatPoster),
        config.slack.review_channel.clone(),
        packages,
        products,
    ));

    let workflow = Arc::new(ApprovalWorkflow::new(
        media_buys.clone(),
        validator,
        cem,
        AuditLogger::new(audit),
        notifier,
    ));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(CampaignService::new(
        workflow.clone(),
        media_buys,
    )));
    dispatcher.register(BlockActionHandler::new(WorkflowApprovalService::new(workflow.clone())));
    dispatcher.register(ViewSubmissionHandler::new(WorkflowApprovalService::new(
        workflow.clone(),
    )));

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, workflow, slack_runner })
}

#[cfg(test)]
mod tests {
    use buyline_agent::ActorContext;
    use buyline_core::config::{ConfigOverrides, LoadOptions};
    use buyline_core::domain::order::{MediaBuyId, OrderStatus};
    use buyline_db::DemoSeedDataset;

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_seed_and_approval_path() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('media_buys', 'products', 'principals', 'packages', 'audit_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables after bootstrap");
        assert_eq!(table_count, 5, "bootstrap should expose the order approval tables");

        DemoSeedDataset::load(&app.db_pool).await.expect("seed demo dataset");

        let media_buy_id = MediaBuyId("nike_running_gear_q1".to_string());
        let actor = ActorContext::new("U-smoke");

        let submission = app
            .workflow
            .submit_for_approval(&media_buy_id, &actor)
            .await
            .expect("submission should park the order for review");
        assert_eq!(submission.new_status, OrderStatus::PendingCemApproval);

        let decision = app
            .workflow
            .approve(&media_buy_id, &actor)
            .await
            .expect("approval should activate the order");
        assert_eq!(decision.new_status, OrderStatus::Active);

        let (decision_rows,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM audit_log WHERE operation = 'cem_approved' AND media_buy_id = ?",
        )
        .bind("nike_running_gear_q1")
        .fetch_one(&app.db_pool)
        .await
        .expect("audit query");
        assert_eq!(decision_rows, 1, "exactly one approval entry should be recorded");

        app.db_pool.close().await;
    }
}
