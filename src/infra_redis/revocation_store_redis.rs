use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

const FIELD_HASH: &str = "hash";
const FIELD_IP: &str = "ip";
const FIELD_USER: &str = "user_id";

/// Each record is a Redis hash at `<prefix>:<record id>` carrying its own TTL.
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRevocationStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &RecordId) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode_record(mut fields: HashMap<String, String>) -> Result<RefreshRecord, StoreError> {
    let mut take = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| StoreError::Corrupt(format!("missing field {}", name)))
    };
    let verifier = take(FIELD_HASH)?;
    let client_ip = take(FIELD_IP)?
        .parse::<IpAddr>()
        .map_err(|e| StoreError::Corrupt(format!("ip: {}", e)))?;
    let subject = SubjectId(take(FIELD_USER)?);
    Ok(RefreshRecord {
        verifier,
        client_ip,
        subject,
    })
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn save(
        &self,
        id: &RecordId,
        record: &RefreshRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let ip = record.client_ip.to_string();
        let fields = [
            (FIELD_HASH, record.verifier.as_str()),
            (FIELD_IP, ip.as_str()),
            (FIELD_USER, record.subject.as_str()),
        ];
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .ignore()
            .expire(&key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<RefreshRecord>, StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(backend)?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_record(fields).map(Some)
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(&key).await.map_err(backend)?;
        Ok(removed > 0)
    }
}
