// Keywarden Proxy Library
// Zero-knowledge credential injection for sandboxed agents

pub mod allowlist;
pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod flow;
pub mod stats;
pub mod strategies;
pub mod strategy;

// Re-export commonly used types
pub use builder::{build, BuiltConfig};
pub use config::{ConfigError, FailMode, RichConfig, Settings, StrategyConfig};
pub use dispatcher::{Dispatcher, Rule};
pub use flow::{Flow, SyntheticResponse};
pub use stats::{ProxyStats, StatsSnapshot};
pub use strategies::{ApiKeyStrategy, AwsSigV4Strategy, BearerStrategy};
pub use strategy::{InjectionStrategy, Secret, SecretSource, StrategyError};
