use crate::error::DesidiaError;
use async_trait::async_trait;

/// Durable string storage for client state that must survive restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DesidiaError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DesidiaError>;

    /// Remove every listed key; missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), DesidiaError>;
}
