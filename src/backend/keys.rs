//! Key layout for per-queue caller and member state.
//!
//! ```text
//! queue:<queue_id>:callers                  ZSET  uuid scored by created_at
//! queue:<queue_id>:callers:status:<code>    ZSET  uuid scored by status_at
//! queue:<queue_id>:callers:<uuid>           HASH  record fields
//! ```
//!
//! Members use the same layout under `members`.

use std::fmt;

use serde::{Deserialize, Serialize};

const QUEUE_NAMESPACE: &str = "queue";

/// The two kinds of entity tracked per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Caller,
    Member,
}

impl EntityKind {
    /// Collection segment used in keys (`callers` / `members`).
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Caller => "callers",
            EntityKind::Member => "members",
        }
    }

    /// Singular name used in event names (`caller` / `member`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Caller => "caller",
            EntityKind::Member => "member",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (queue, entity kind) pair that owns a main set, status sets and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    queue_id: String,
    kind: EntityKind,
}

impl Namespace {
    pub fn new(queue_id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            queue_id: queue_id.into(),
            kind,
        }
    }

    pub fn callers(queue_id: impl Into<String>) -> Self {
        Self::new(queue_id, EntityKind::Caller)
    }

    pub fn members(queue_id: impl Into<String>) -> Self {
        Self::new(queue_id, EntityKind::Member)
    }

    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Main ordered set: `queue:<queue_id>:<collection>`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            QUEUE_NAMESPACE,
            self.queue_id,
            self.kind.collection()
        )
    }

    /// Prefix shared by every status set; the status code is appended.
    pub fn status_prefix(&self) -> String {
        format!("{}:status:", self.key())
    }

    /// Status ordered set: `queue:<queue_id>:<collection>:status:<status>`.
    pub fn status_key(&self, status: &str) -> String {
        format!("{}{}", self.status_prefix(), status)
    }

    /// Record hash: `queue:<queue_id>:<collection>:<uuid>`.
    pub fn record_key(&self, uuid: &str) -> String {
        format!("{}:{}", self.key(), uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_keys() {
        let ns = Namespace::callers("q1");
        assert_eq!(ns.key(), "queue:q1:callers");
        assert_eq!(ns.status_key("1"), "queue:q1:callers:status:1");
        assert_eq!(ns.record_key("abc"), "queue:q1:callers:abc");
    }

    #[test]
    fn member_keys() {
        let ns = Namespace::members("support");
        assert_eq!(ns.key(), "queue:support:members");
        assert_eq!(ns.status_prefix(), "queue:support:members:status:");
        assert_eq!(ns.status_key("6"), "queue:support:members:status:6");
        assert_eq!(ns.record_key("m-1"), "queue:support:members:m-1");
    }

    #[test]
    fn kind_names() {
        assert_eq!(EntityKind::Caller.to_string(), "caller");
        assert_eq!(EntityKind::Member.collection(), "members");
    }
}
