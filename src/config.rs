//! Environment-driven configuration for the forwarders

use crate::flatten::{FlattenConfig, FlattenEngine, DEFAULT_PREFIX};
use crate::forward::body::RESERVED_FIELDS;
use std::str::FromStr;
use thiserror::Error;

pub const TABLE_NAME_VAR: &str = "DYNAMODB_TABLE_NAME";
pub const COSMOS_CONNECTION_VAR: &str = "CosmosDbConnectionString";
pub const COSMOS_DATABASE_VAR: &str = "CosmosDbDatabaseName";
pub const COSMOS_CONTAINER_VAR: &str = "CosmosDbContainerName";
pub const BODY_PREFIX_VAR: &str = "INGOT_BODY_PREFIX";
pub const MAX_DEPTH_VAR: &str = "INGOT_MAX_DEPTH";
pub const DOCUMENT_ID_VAR: &str = "INGOT_DOCUMENT_ID";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// How a message body is flattened into the outbound record
#[derive(Debug, Clone)]
pub struct BodyConfig {
    /// Root of the dotted paths for the flattened body
    pub prefix: String,

    pub flatten: FlattenConfig,
}

impl Default for BodyConfig {
    fn default() -> Self {
        BodyConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            flatten: FlattenConfig::default(),
        }
    }
}

impl BodyConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BodyConfig::default();

        if let Some(prefix) = lookup(BODY_PREFIX_VAR) {
            if prefix.is_empty() || RESERVED_FIELDS.contains(&prefix.as_str()) {
                return Err(ConfigError::Invalid { name: BODY_PREFIX_VAR, value: prefix });
            }
            config.prefix = prefix;
        }

        if let Some(depth) = lookup(MAX_DEPTH_VAR) {
            config.flatten.max_depth = depth
                .parse()
                .map_err(|_| ConfigError::Invalid { name: MAX_DEPTH_VAR, value: depth })?;
        }

        Ok(config)
    }

    pub fn engine(&self) -> FlattenEngine {
        FlattenEngine::new(self.flatten.clone())
    }
}

/// Settings for the SQS to table forwarder
#[derive(Debug, Clone)]
pub struct SqsConfig {
    pub table_name: String,
    pub body: BodyConfig,
}

impl Default for SqsConfig {
    fn default() -> Self {
        SqsConfig {
            table_name: String::from("SqsMessages"),
            body: BodyConfig::default(),
        }
    }
}

impl SqsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SqsConfig {
            body: BodyConfig::from_lookup(&lookup)?,
            ..Default::default()
        };
        if let Some(table) = lookup(TABLE_NAME_VAR) {
            config.table_name = table;
        }
        Ok(config)
    }
}

/// Where a container document takes its `id` from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Reuse the message id, so a redelivered message conflicts instead of duplicating
    #[default]
    MessageId,

    /// Fresh UUID v4 per write
    Random,
}

impl FromStr for IdStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message-id" => Ok(IdStrategy::MessageId),
            "random" => Ok(IdStrategy::Random),
            other => Err(ConfigError::Invalid {
                name: DOCUMENT_ID_VAR,
                value: other.to_string(),
            }),
        }
    }
}

/// Settings for the Service Bus to container forwarder
#[derive(Debug, Clone)]
pub struct ServiceBusConfig {
    pub connection_string: String,
    pub database_name: String,
    pub container_name: String,
    pub partition_key_path: String,
    pub id_strategy: IdStrategy,
    pub body: BodyConfig,
}

impl ServiceBusConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        ServiceBusConfig {
            connection_string: connection_string.into(),
            database_name: String::from("MessageDatabase"),
            container_name: String::from("ServiceBusMessages"),
            partition_key_path: String::from("/MessageId"),
            id_strategy: IdStrategy::default(),
            body: BodyConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_string = lookup(COSMOS_CONNECTION_VAR)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(COSMOS_CONNECTION_VAR))?;

        let mut config = ServiceBusConfig::new(connection_string);
        config.body = BodyConfig::from_lookup(&lookup)?;

        if let Some(database) = lookup(COSMOS_DATABASE_VAR) {
            config.database_name = database;
        }
        if let Some(container) = lookup(COSMOS_CONTAINER_VAR) {
            config.container_name = container;
        }
        if let Some(strategy) = lookup(DOCUMENT_ID_VAR) {
            config.id_strategy = strategy.parse()?;
        }

        Ok(config)
    }
}
