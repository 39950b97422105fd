//! `validate` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BridgeConfig;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    redis_address: String,
    redis_db: i64,
    channel_count: usize,
    queue_count: usize,
    route_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let queue_count = queue_usage(&config).len();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    redis_address: config.redis.address(),
                    redis_db: config.redis.db,
                    channel_count: config.mappings.len(),
                    queue_count,
                    route_count: config.mappings.route_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{:#}", e)),
            warnings: None,
            summary: None,
        },
    }
}

/// Queue name -> channels that route to it
fn queue_usage(config: &BridgeConfig) -> BTreeMap<&str, Vec<&str>> {
    let mut usage: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (channel, queues) in config.mappings.iter() {
        for queue in queues {
            let channels = usage.entry(queue.as_str()).or_default();
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
    }
    usage
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.mappings.is_empty() {
        warnings.push("No channel mappings configured - the bridge will refuse to start".to_string());
    }

    for (channel, queues) in config.mappings.iter() {
        let mut seen = Vec::with_capacity(queues.len());
        for queue in queues {
            if seen.contains(&queue) {
                warnings.push(format!(
                    "Channel '{}' lists queue '{}' more than once - it will receive duplicates",
                    channel, queue
                ));
            } else {
                seen.push(queue);
            }
        }
    }

    for (queue, channels) in queue_usage(config) {
        if channels.len() > 1 {
            warnings.push(format!(
                "Queue '{}' is fed by several channels: {}",
                queue,
                channels.join(", ")
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Redis: {} (db {})", summary.redis_address, summary.redis_db);
            println!("  Channels: {}", summary.channel_count);
            println!("  Queues: {}", summary.queue_count);
            println!("  Routes: {}", summary.route_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn config(yaml: &str) -> BridgeConfig {
        config_loader::ConfigLoader::load_with_env(yaml, config_loader::ConfigFormat::Yaml, None)
            .unwrap()
    }

    #[test]
    fn test_no_warnings_for_clean_config() {
        let config = config("mappings:\n  orders: orders-queue\n  events: [events-queue, audit-queue]\n");
        assert!(collect_warnings(&config).is_empty());
    }

    #[test]
    fn test_warns_on_empty_mappings() {
        let warnings = collect_warnings(&config("redis:\n  port: 6379\n"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No channel mappings"));
    }

    #[test]
    fn test_warns_on_shared_and_duplicate_queues() {
        let config = config(
            "mappings:\n  orders: [orders-queue, audit-queue]\n  events: [audit-queue, audit-queue]\n",
        );
        let warnings = collect_warnings(&config);

        assert!(warnings
            .iter()
            .any(|w| w.contains("'events' lists queue 'audit-queue' more than once")));
        assert!(warnings
            .iter()
            .any(|w| w.contains("Queue 'audit-queue' is fed by several channels: events, orders")));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_validate_reports_invalid_mapping() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"mappings:\n  events: []\n").unwrap();

        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(!result.valid);
        let error = result.error.unwrap();
        assert!(error.contains("mapping for channel 'events' has empty queue list"));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/config.yaml"),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("Configuration file not found"));
    }
}
