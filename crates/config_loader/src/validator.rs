//! 配置校验模块
//!
//! 校验规则：
//! - mapping 值只能是字符串或字符串列表
//! - 列表不能为空，列表元素必须是字符串
//! - channel / queue 名称非空
//! - redis.host 非空

use contracts::{
    BridgeConfig, ContractError, MappingTable, QueueList, RawBridgeConfig, RawMapping,
    RawQueueEntry,
};

/// 将原始配置归一化为 BridgeConfig
///
/// 返回第一个遇到的错误。
pub fn normalize(raw: RawBridgeConfig) -> Result<BridgeConfig, ContractError> {
    validate_redis(&raw)?;

    let mut entries = Vec::with_capacity(raw.mappings.len());
    for (channel, value) in raw.mappings {
        let queues = normalize_mapping(&channel, value)?;
        entries.push((channel, queues));
    }

    let mappings = MappingTable::from_entries(entries).map_err(to_validation_error)?;

    Ok(BridgeConfig {
        redis: raw.redis,
        mappings,
    })
}

/// 单个 mapping 值归一化为非空有序列表
fn normalize_mapping(channel: &str, value: RawMapping) -> Result<QueueList, ContractError> {
    let field = format!("mappings.{channel}");
    let queues = match value {
        RawMapping::Single(queue) => vec![queue],
        RawMapping::Many(entries) => {
            let mut queues = Vec::with_capacity(entries.len());
            for (idx, entry) in entries.into_iter().enumerate() {
                match entry {
                    RawQueueEntry::Name(queue) => queues.push(queue),
                    RawQueueEntry::Invalid(_) => {
                        return Err(ContractError::config_validation(
                            field,
                            format!(
                                "mapping for channel '{channel}' contains non-string value at index {idx}"
                            ),
                        ));
                    }
                }
            }
            if queues.is_empty() {
                return Err(ContractError::config_validation(
                    field,
                    format!("mapping for channel '{channel}' has empty queue list"),
                ));
            }
            queues
        }
        RawMapping::Invalid(_) => {
            return Err(ContractError::config_validation(
                field,
                format!(
                    "mapping for channel '{channel}' has invalid type: expected string or array"
                ),
            ));
        }
    };

    QueueList::new(channel, queues).map_err(to_validation_error)
}

/// 校验 redis 配置
fn validate_redis(raw: &RawBridgeConfig) -> Result<(), ContractError> {
    if raw.redis.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "redis.host",
            "host cannot be empty",
        ));
    }
    if raw.redis.db < 0 {
        return Err(ContractError::config_validation(
            "redis.db",
            format!("db must be >= 0, got {}", raw.redis.db),
        ));
    }
    Ok(())
}

fn to_validation_error(err: ContractError) -> ContractError {
    match err {
        ContractError::InvalidMapping { channel, message } => {
            ContractError::config_validation(format!("mappings.{channel}"), message)
        }
        other => other,
    }
}
