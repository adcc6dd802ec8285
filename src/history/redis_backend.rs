use super::{HistoryError, HistoryStore, SnapshotId, ZoneSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

/// Key layout under one prefix.
///
/// - `<prefix>:next_id` id counter
/// - `<prefix>:snapshot:<id>` snapshot as JSON
/// - `<prefix>:domain:<domain>` list of ids, newest at index 0
/// - `<prefix>:diff_written:<id>` present once the diff of `<id>` is claimed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_id(&self) -> String {
        format!("{}:next_id", self.prefix)
    }

    pub fn snapshot(&self, id: SnapshotId) -> String {
        format!("{}:snapshot:{}", self.prefix, id)
    }

    pub fn domain(&self, domain: &str) -> String {
        format!("{}:domain:{}", self.prefix, domain)
    }

    pub fn diff_written(&self, id: SnapshotId) -> String {
        format!("{}:diff_written:{}", self.prefix, id)
    }
}

/// Redis-backed history, keys laid out by [`RedisKeys`]
pub struct RedisHistory {
    client: ConnectionManager,
    keys: RedisKeys,
}

fn backend_error(context: &str) -> impl FnOnce(redis::RedisError) -> HistoryError + '_ {
    move |e| HistoryError::Backend(format!("{}: {}", context, e))
}

impl RedisHistory {
    /// Connect to Redis
    pub async fn new(redis_url: &str, key_prefix: String) -> Result<Self, HistoryError> {
        let client = redis::Client::open(redis_url)
            .map_err(backend_error("Failed to create Redis client"))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(backend_error("Failed to connect to Redis"))?;

        let history = Self {
            client: connection_manager,
            keys: RedisKeys::new(key_prefix),
        };
        history.ping().await?;

        info!("Connected to Redis history, key prefix {}", history.keys.prefix());
        Ok(history)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<(), HistoryError> {
        let mut conn = self.client.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error("Redis ping failed"))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for RedisHistory {
    async fn append(
        &self,
        domain: &str,
        canonical_text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<SnapshotId, HistoryError> {
        let mut conn = self.client.clone();

        let id: u64 = conn
            .incr(self.keys.next_id(), 1)
            .await
            .map_err(backend_error("Failed to allocate snapshot id"))?;
        let id = SnapshotId(id);

        let snapshot = ZoneSnapshot {
            id,
            domain: domain.to_string(),
            canonical_text: canonical_text.to_string(),
            created_at,
            diff: None,
        };
        let json = serde_json::to_string(&snapshot)?;

        // Snapshot body and index entry land together
        redis::pipe()
            .atomic()
            .set(self.keys.snapshot(id), json)
            .ignore()
            .lpush(self.keys.domain(domain), id.0)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend_error("Failed to store snapshot"))?;

        debug!("Stored snapshot {} for {} in Redis", id, domain);
        Ok(id)
    }

    async fn most_recent(&self, domain: &str, n: usize) -> Result<Vec<ZoneSnapshot>, HistoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.client.clone();
        let ids: Vec<u64> = conn
            .lrange(self.keys.domain(domain), 0, n as isize - 1)
            .await
            .map_err(backend_error("Failed to read snapshot index"))?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let body_keys: Vec<String> = ids
            .iter()
            .map(|id| self.keys.snapshot(SnapshotId(*id)))
            .collect();
        let bodies: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&body_keys)
            .query_async(&mut conn)
            .await
            .map_err(backend_error("Failed to read snapshots"))?;

        // An indexed id without a body means the log has a hole
        ids.iter()
            .zip(bodies)
            .map(|(id, body)| -> Result<ZoneSnapshot, HistoryError> {
                let json = body.ok_or(HistoryError::NotFound(SnapshotId(*id)))?;
                Ok(serde_json::from_str::<ZoneSnapshot>(&json)?)
            })
            .collect()
    }

    /// The diff is claimed with `SET NX` on a marker key before the body is
    /// rewritten, so of two concurrent writers exactly one proceeds and a
    /// `None` diff uses up the write as well.
    async fn update_diff(&self, id: SnapshotId, diff: Option<&str>) -> Result<(), HistoryError> {
        let mut conn = self.client.clone();
        let key = self.keys.snapshot(id);

        let json: Option<String> = conn
            .get(&key)
            .await
            .map_err(backend_error("Failed to read snapshot"))?;
        let json = json.ok_or(HistoryError::NotFound(id))?;

        let claimed: bool = conn
            .set_nx(self.keys.diff_written(id), 1)
            .await
            .map_err(backend_error("Failed to claim snapshot diff"))?;
        if !claimed {
            return Err(HistoryError::DiffAlreadySet(id));
        }

        let mut snapshot: ZoneSnapshot = serde_json::from_str(&json)?;
        snapshot.diff = diff.map(str::to_string);

        // Only the claiming writer reaches this point, so the body read above
        // is still current
        let _: () = conn
            .set(&key, serde_json::to_string(&snapshot)?)
            .await
            .map_err(backend_error("Failed to update snapshot"))?;

        debug!("Stored diff of snapshot {} in Redis", id);
        Ok(())
    }

    async fn count(&self, domain: &str) -> Result<usize, HistoryError> {
        let mut conn = self.client.clone();
        conn.llen(self.keys.domain(domain))
            .await
            .map_err(backend_error("Failed to count snapshots"))
    }
}
