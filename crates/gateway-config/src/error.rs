/// Errors surfaced while loading deployment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The `config` crate failed to build or deserialize the layered sources.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
