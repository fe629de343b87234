//! Redis record operations.
//!
//! Reads go through `MULTI/EXEC` pipelines. Every write reads the stored
//! status before touching a status set, so writes run as one Lua script and
//! no other client can interleave between the read and the moves.
//!
//! The scripts derive the old status-set key from `ARGV[1] .. status` at run
//! time instead of declaring it in `KEYS`. That only holds on a single Redis
//! node; the key family is not hash-tagged for cluster slots.

use std::collections::HashMap;

use bb8_redis::bb8::PooledConnection;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::pool;
use super::RedisBackend;
use crate::backend::error::BackendError;
use crate::backend::keys::Namespace;
use crate::backend::traits::*;

/// Create or overwrite a record, moving it out of any previous status set.
///
/// KEYS[1] main set, KEYS[2] record hash
/// ARGV[1] status key prefix, ARGV[2] uuid, ARGV[3] status, ARGV[4] score,
/// ARGV[5..] field/value pairs
const INSERT_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[2], 'status')
if current and current ~= ARGV[3] then
    redis.call('ZREM', ARGV[1] .. current, ARGV[2])
end
redis.call('ZADD', KEYS[1], ARGV[4], ARGV[2])
redis.call('ZADD', ARGV[1] .. ARGV[3], ARGV[4], ARGV[2])
if #ARGV > 4 then
    redis.call('HSET', KEYS[2], unpack(ARGV, 5))
end
return 1
"#;

/// Patch a record and optionally move it between status sets.
///
/// KEYS[1] record hash
/// ARGV[1] status key prefix, ARGV[2] uuid, ARGV[3] new status ('' = none),
/// ARGV[4] status score, ARGV[5] status_at, ARGV[6..] field/value pairs
const UPDATE_SCRIPT: &str = r#"
if redis.call('HEXISTS', KEYS[1], 'uuid') == 0 then
    return 0
end
if #ARGV > 5 then
    redis.call('HSET', KEYS[1], unpack(ARGV, 6))
end
if ARGV[3] ~= '' then
    local current = redis.call('HGET', KEYS[1], 'status')
    if current then
        redis.call('ZREM', ARGV[1] .. current, ARGV[2])
    end
    redis.call('ZADD', ARGV[1] .. ARGV[3], ARGV[4], ARGV[2])
    redis.call('HSET', KEYS[1], 'status', ARGV[3], 'status_at', ARGV[5])
end
return 1
"#;

/// Remove a record and every index entry pointing at it.
///
/// KEYS[1] main set, KEYS[2] record hash
/// ARGV[1] status key prefix, ARGV[2] uuid
/// Returns {found, rank (-1 when unranked), flat field list}.
const REMOVE_SCRIPT: &str = r#"
local fields = redis.call('HGETALL', KEYS[2])
local found = 0
local status = nil
for i = 1, #fields, 2 do
    if fields[i] == 'uuid' then found = 1 end
    if fields[i] == 'status' then status = fields[i + 1] end
end
if found == 0 then
    return {0, -1, {}}
end
local rank = redis.call('ZRANK', KEYS[1], ARGV[2])
if rank == false then rank = -1 end
redis.call('ZREM', KEYS[1], ARGV[2])
redis.call('DEL', KEYS[2])
if status then
    redis.call('ZREM', ARGV[1] .. status, ARGV[2])
end
return {1, rank, fields}
"#;

async fn get_conn(
    backend: &RedisBackend,
) -> Result<PooledConnection<'_, RedisConnectionManager>, BackendError> {
    pool::checkout(backend.pool()).await
}

fn pairs_to_record(flat: Vec<String>) -> Record {
    let mut record = HashMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        record.insert(field, value);
    }
    record
}

fn rank_from(raw: i64) -> Option<u64> {
    u64::try_from(raw).ok()
}

pub async fn insert(
    backend: &RedisBackend,
    ns: &Namespace,
    uuid: &str,
    record: Record,
    status: &str,
    score: f64,
) -> Result<(), BackendError> {
    let mut conn = get_conn(backend).await?;

    let mut cmd = redis::cmd("EVAL");
    cmd.arg(INSERT_SCRIPT)
        .arg(2)
        .arg(ns.key())
        .arg(ns.record_key(uuid))
        .arg(ns.status_prefix())
        .arg(uuid)
        .arg(status)
        .arg(score);
    for (field, value) in &record {
        cmd.arg(field).arg(value);
    }
    let _: i64 = cmd.query_async(&mut *conn).await?;

    debug!(key = %ns.record_key(uuid), status = %status, score = %score, "Record inserted");
    Ok(())
}

pub async fn load(
    backend: &RedisBackend,
    ns: &Namespace,
    uuid: &str,
) -> Result<Option<StoredRecord>, BackendError> {
    let mut conn = get_conn(backend).await?;

    let (fields, rank): (Record, Option<u64>) = redis::pipe()
        .atomic()
        .hgetall(ns.record_key(uuid))
        .zrank(ns.key(), uuid)
        .query_async(&mut *conn)
        .await?;

    if !fields.contains_key(UUID_FIELD) {
        return Ok(None);
    }
    Ok(Some(StoredRecord { fields, rank }))
}

pub async fn update(
    backend: &RedisBackend,
    ns: &Namespace,
    uuid: &str,
    patch: RecordPatch,
) -> Result<bool, BackendError> {
    let mut conn = get_conn(backend).await?;

    let mut cmd = redis::cmd("EVAL");
    cmd.arg(UPDATE_SCRIPT)
        .arg(1)
        .arg(ns.record_key(uuid))
        .arg(ns.status_prefix())
        .arg(uuid);
    match &patch.status {
        Some(change) => {
            cmd.arg(&change.status)
                .arg(change.score)
                .arg(&change.status_at);
        }
        None => {
            cmd.arg("").arg(0).arg("");
        }
    }
    for (field, value) in &patch.fields {
        cmd.arg(field).arg(value);
    }

    let applied: i64 = cmd.query_async(&mut *conn).await?;
    if applied == 0 {
        warn!(key = %ns.record_key(uuid), "update skipped: record does not exist");
    }
    Ok(applied == 1)
}

pub async fn remove(
    backend: &RedisBackend,
    ns: &Namespace,
    uuid: &str,
) -> Result<Option<StoredRecord>, BackendError> {
    let mut conn = get_conn(backend).await?;

    let (found, rank, flat): (i64, i64, Vec<String>) = redis::cmd("EVAL")
        .arg(REMOVE_SCRIPT)
        .arg(2)
        .arg(ns.key())
        .arg(ns.record_key(uuid))
        .arg(ns.status_prefix())
        .arg(uuid)
        .query_async(&mut *conn)
        .await?;

    if found == 0 {
        return Ok(None);
    }
    Ok(Some(StoredRecord {
        fields: pairs_to_record(flat),
        rank: rank_from(rank),
    }))
}

pub async fn range(
    backend: &RedisBackend,
    ns: &Namespace,
    status: Option<&str>,
    start: isize,
    stop: isize,
) -> Result<Vec<String>, BackendError> {
    let mut conn = get_conn(backend).await?;
    let key = match status {
        Some(status) => ns.status_key(status),
        None => ns.key(),
    };
    let members: Vec<String> = conn.zrange(&key, start, stop).await?;
    Ok(members)
}

pub async fn ping(backend: &RedisBackend) -> Result<(), BackendError> {
    let mut conn = get_conn(backend).await?;
    pool::ping(&mut conn).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_pairs_become_record() {
        let record = pairs_to_record(vec![
            "uuid".into(),
            "abc".into(),
            "status".into(),
            "2".into(),
        ]);
        assert_eq!(record.get("uuid").map(String::as_str), Some("abc"));
        assert_eq!(record.get("status").map(String::as_str), Some("2"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn negative_rank_means_unranked() {
        assert_eq!(rank_from(-1), None);
        assert_eq!(rank_from(4), Some(4));
    }
}
