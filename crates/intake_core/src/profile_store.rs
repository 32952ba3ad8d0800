use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::ProfileId;
use storage::Storage;
use tokio::sync::RwLock;
use tracing::debug;

/// Durable key holding the most recently confirmed profile id. Independent of
/// the result handoff and never cleared by the intake flow.
pub const LAST_PROFILE_ID_KEY: &str = "last_profile_id";

#[async_trait]
pub trait ProfileIdStore: Send + Sync {
    async fn remember(&self, profile_id: &ProfileId) -> Result<()>;
    async fn last_profile_id(&self) -> Result<Option<ProfileId>>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileIdStore {
    last: RwLock<Option<ProfileId>>,
}

#[async_trait]
impl ProfileIdStore for InMemoryProfileIdStore {
    async fn remember(&self, profile_id: &ProfileId) -> Result<()> {
        *self.last.write().await = Some(profile_id.clone());
        Ok(())
    }

    async fn last_profile_id(&self) -> Result<Option<ProfileId>> {
        Ok(self.last.read().await.clone())
    }
}

/// `ProfileIdStore` backed by the sqlite session-value table.
#[derive(Clone)]
pub struct DurableProfileIdStore {
    storage: Storage,
}

impl DurableProfileIdStore {
    pub async fn open(database_url: &str) -> Result<Self> {
        let storage = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize intake storage at '{database_url}'"))?;
        Ok(Self { storage })
    }
}

#[async_trait]
impl ProfileIdStore for DurableProfileIdStore {
    async fn remember(&self, profile_id: &ProfileId) -> Result<()> {
        self.storage
            .put_session_value(LAST_PROFILE_ID_KEY, profile_id.as_str())
            .await?;
        debug!(profile_id = %profile_id, "intake: remembered last profile id");
        Ok(())
    }

    async fn last_profile_id(&self) -> Result<Option<ProfileId>> {
        Ok(self
            .storage
            .load_session_value(LAST_PROFILE_ID_KEY)
            .await?
            .map(|stored| ProfileId(stored.value)))
    }
}
