//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BridgeConfig;

use super::load_config;
use crate::cli::InfoArgs;

const REDACTED: &str = "***";

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    redis: RedisInfo,
    mappings: Vec<MappingInfo>,
}

#[derive(Serialize)]
struct RedisInfo {
    host: String,
    port: u16,
    db: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'static str>,
}

#[derive(Serialize)]
struct MappingInfo {
    channel: String,
    queues: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig) -> ConfigInfo {
    ConfigInfo {
        redis: RedisInfo {
            host: config.redis.host.clone(),
            port: config.redis.port,
            db: config.redis.db,
            password: config.redis.password().map(|_| REDACTED),
        },
        mappings: config
            .mappings
            .iter()
            .map(|(channel, queues)| MappingInfo {
                channel: channel.to_string(),
                queues: queues.to_vec(),
            })
            .collect(),
    }
}

fn print_config_info(config: &BridgeConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Queue Bridge Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔌 Redis");
    println!("   ├─ Server: {}", config.redis.address());
    println!("   ├─ Database: {}", config.redis.db);
    match config.redis.password() {
        Some(_) => println!("   └─ Password: {}", REDACTED),
        None => println!("   └─ Password: (none)"),
    }

    let count = config.mappings.len();
    println!("\n🔀 Mappings ({})", count);
    if count == 0 {
        println!("   └─ (none)");
    }
    for (i, (channel, queues)) in config.mappings.iter().enumerate() {
        let is_last = i == count - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {}", prefix, channel);
        for (j, queue) in queues.iter().enumerate() {
            let queue_prefix = if j == queues.len() - 1 { "└─" } else { "├─" };
            println!("   {}  {} {}", child_prefix, queue_prefix, queue);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_redacted() {
        let config = config_loader::ConfigLoader::load_with_env(
            "redis:\n  password: hunter2\nmappings:\n  events: [events-queue, audit-queue]\n",
            config_loader::ConfigFormat::Yaml,
            None,
        )
        .unwrap();

        let json = serde_json::to_string(&build_config_info(&config)).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED));
        assert!(json.contains(r#""queues":["events-queue","audit-queue"]"#));
    }

    #[test]
    fn test_no_password_omitted() {
        let config = config_loader::ConfigLoader::load_with_env(
            "mappings:\n  orders: orders-queue\n",
            config_loader::ConfigFormat::Yaml,
            None,
        )
        .unwrap();

        let info = build_config_info(&config);
        assert!(info.redis.password.is_none());
        assert_eq!(info.mappings.len(), 1);
        assert_eq!(info.mappings[0].queues, vec!["orders-queue".to_string()]);
    }
}
