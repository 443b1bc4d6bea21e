use crate::db::schema::SQLITE_INIT;
use crate::db::traits::KeyValueStore;
use crate::error::DesidiaError;
use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub enum DbActorMessage {
    /// Read one key.
    Get(String, RpcReplyPort<Result<Option<String>, DesidiaError>>),

    /// Insert or overwrite one key.
    Set(String, String, RpcReplyPort<Result<(), DesidiaError>>),

    /// Delete several keys in one transaction.
    Remove(Vec<String>, RpcReplyPort<Result<(), DesidiaError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, DesidiaError> {
        ractor::call!(self.actor, DbActorMessage::Get, key.to_string())
            .map_err(|e| DesidiaError::RactorError(format!("DbActor Get RPC failed: {e}")))?
    }

    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), DesidiaError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Set,
            key.to_string(),
            value.to_string()
        )
        .map_err(|e| DesidiaError::RactorError(format!("DbActor Set RPC failed: {e}")))?
    }

    pub async fn remove_values(&self, keys: Vec<String>) -> Result<(), DesidiaError> {
        ractor::call!(self.actor, DbActorMessage::Remove, keys)
            .map_err(|e| DesidiaError::RactorError(format!("DbActor Remove RPC failed: {e}")))?
    }
}

#[async_trait]
impl KeyValueStore for DbActorHandle {
    async fn get(&self, key: &str) -> Result<Option<String>, DesidiaError> {
        self.get_value(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DesidiaError> {
        self.set_value(key, value).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), DesidiaError> {
        self.remove_values(keys.iter().map(|k| (*k).to_string()).collect())
            .await
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Get(key, reply) => {
                let res = self.get(&state.pool, &key).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Set(key, value, reply) => {
                let res = self.set(&state.pool, &key, &value).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Remove(keys, reply) => {
                let res = self.remove(&state.pool, &keys).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn get(&self, pool: &SqlitePool, key: &str) -> Result<Option<String>, DesidiaError> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
        SELECT value
        FROM kv_store
        WHERE key = ?
        "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, pool: &SqlitePool, key: &str, value: &str) -> Result<(), DesidiaError> {
        sqlx::query(
            r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        debug!(key, "DbActor stored key");
        Ok(())
    }

    async fn remove(&self, pool: &SqlitePool, keys: &[String]) -> Result<(), DesidiaError> {
        let mut tx = pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(count = keys.len(), "DbActor removed keys");
        Ok(())
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, DesidiaError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| DesidiaError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), DesidiaError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
