//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable)
//!     → cloned into each component at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BalancesConfig, FaucetConfig, FaucetEndpointConfig, HistoryConfig, NativeCurrency,
    NetworkConfig, ObservabilityConfig, RpcConfig, TokenConfig, TokenFaucetConfig,
    TransferConfig, WalletConfig, WalletProviderConfig,
};
