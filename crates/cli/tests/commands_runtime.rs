use std::env;
use std::sync::{Mutex, OnceLock};

use buyline_cli::commands::{migrate, seed, validate};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("BUYLINE_SLACK_APP_TOKEN", "xapp-test"),
            ("BUYLINE_SLACK_BOT_TOKEN", "xoxb-test"),
            ("BUYLINE_DATABASE_URL", "sqlite::memory:"),
            ("BUYLINE_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_without_tokens() {
    with_env(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_the_demo_dataset() {
    with_env(
        &[
            ("BUYLINE_SLACK_APP_TOKEN", "xapp-test"),
            ("BUYLINE_SLACK_BOT_TOKEN", "xoxb-test"),
            ("BUYLINE_DATABASE_URL", "sqlite::memory:"),
            ("BUYLINE_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected seed success");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("2 principals"));
            assert!(message.contains("3 products"));
            assert!(message.contains("2 media buys"));
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    let db_path = scratch_db_path("seed-idempotent");
    let db_url = format!("sqlite://{db_path}?mode=rwc");

    with_env(
        &[
            ("BUYLINE_SLACK_APP_TOKEN", "xapp-test"),
            ("BUYLINE_SLACK_BOT_TOKEN", "xoxb-test"),
            ("BUYLINE_DATABASE_URL", &db_url),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");

            let first_payload = parse_payload(&first.output);
            let second_payload = parse_payload(&second.output);
            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn validate_reports_every_check_for_a_seeded_order() {
    let db_path = scratch_db_path("validate-seeded");
    let db_url = format!("sqlite://{db_path}?mode=rwc");

    with_env(
        &[
            ("BUYLINE_SLACK_APP_TOKEN", "xapp-test"),
            ("BUYLINE_SLACK_BOT_TOKEN", "xoxb-test"),
            ("BUYLINE_DATABASE_URL", &db_url),
        ],
        || {
            let seeded = seed::run();
            assert_eq!(seeded.exit_code, 0, "expected seed success");

            let result = validate::run("nike_running_gear_q1");
            assert_eq!(result.exit_code, 0, "expected the seeded order to validate cleanly");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "validate");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("ALL VALIDATIONS PASSED (6/6)"));
            assert!(message.contains("- [ok] budget_limits"));
        },
    );

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn validate_fails_for_an_unknown_order() {
    with_env(
        &[
            ("BUYLINE_SLACK_APP_TOKEN", "xapp-test"),
            ("BUYLINE_SLACK_BOT_TOKEN", "xoxb-test"),
            ("BUYLINE_DATABASE_URL", "sqlite::memory:"),
            ("BUYLINE_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = validate::run("ghost_order");
            assert_eq!(result.exit_code, 1, "expected validation failure exit code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "validate");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "validation_failed");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("media_buy_exists"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn scratch_db_path(label: &str) -> String {
    let mut path = env::temp_dir();
    path.push(format!("buyline-cli-{label}-{}.db", std::process::id()));
    path.display().to_string()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BUYLINE_DATABASE_URL",
        "BUYLINE_DATABASE_MAX_CONNECTIONS",
        "BUYLINE_DATABASE_TIMEOUT_SECS",
        "BUYLINE_SLACK_APP_TOKEN",
        "BUYLINE_SLACK_BOT_TOKEN",
        "BUYLINE_SLACK_REVIEW_CHANNEL",
        "BUYLINE_LLM_PROVIDER",
        "BUYLINE_LLM_API_KEY",
        "BUYLINE_LLM_BASE_URL",
        "BUYLINE_LLM_MODEL",
        "BUYLINE_LLM_TIMEOUT_SECS",
        "BUYLINE_SERVER_BIND_ADDRESS",
        "BUYLINE_SERVER_HEALTH_CHECK_PORT",
        "BUYLINE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BUYLINE_LOG_LEVEL",
        "BUYLINE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
