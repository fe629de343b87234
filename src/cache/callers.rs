use tracing::{debug, info};

use super::{codec, QueueCache};
use crate::backend::{EntityKind, Namespace};
use crate::clock::score;
use crate::error::QueueError;
use crate::models::{CallerStatus, CallerUpdate, NewQueueCaller, QueueCaller};
use crate::notify::EventAction;

fn not_found(queue_id: &str, uuid: &str) -> QueueError {
    QueueError::CallerNotFound {
        queue_id: queue_id.to_string(),
        uuid: uuid.to_string(),
    }
}

impl QueueCache {
    /// Add a caller to the tail of the queue.
    ///
    /// The supplied uuid is kept; otherwise a v4 uuid is generated. The
    /// caller starts in the supplied status, WAITING by default.
    pub async fn create_queue_caller(
        &self,
        queue_id: &str,
        new: NewQueueCaller,
    ) -> Result<QueueCaller, QueueError> {
        let ns = Namespace::callers(queue_id);
        let uuid = Self::assign_uuid(new.uuid.as_deref());
        let status = new.status.unwrap_or_default();
        let now = self.clock.now();

        let record = codec::caller_record(&uuid, queue_id, &now, &new, status);
        self.backend
            .insert(&ns, &uuid, record, &status.code().to_string(), score(&now))
            .await?;

        let caller = self.get_queue_caller(queue_id, &uuid).await?;
        self.publish(
            EntityKind::Caller,
            EventAction::Create,
            queue_id,
            &uuid,
            &caller,
        )
        .await?;

        info!(queue_id = %queue_id, uuid = %uuid, status = status.name(), "Queue caller created");
        Ok(caller)
    }

    /// Fetch a caller with its current position.
    pub async fn get_queue_caller(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<QueueCaller, QueueError> {
        self.find_queue_caller(queue_id, uuid)
            .await?
            .ok_or_else(|| not_found(queue_id, uuid))
    }

    /// Like [`get_queue_caller`](Self::get_queue_caller), but a missing
    /// caller is `Ok(None)`.
    pub async fn find_queue_caller(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<Option<QueueCaller>, QueueError> {
        let ns = Namespace::callers(queue_id);
        let stored = self.backend.load(&ns, uuid).await?;
        debug!(queue_id = %queue_id, uuid = %uuid, found = stored.is_some(), "Queue caller loaded");
        stored.map(|s| codec::decode_caller(&s)).transpose()
    }

    /// List callers in queue order, or the leading callers of one status.
    pub async fn list_queue_callers(
        &self,
        queue_id: &str,
        status: Option<CallerStatus>,
    ) -> Result<Vec<QueueCaller>, QueueError> {
        let ns = Namespace::callers(queue_id);
        let uuids = self
            .list_uuids(&ns, status.map(|s| s.code().to_string()))
            .await?;

        let mut callers = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            match self.find_queue_caller(queue_id, &uuid).await? {
                Some(caller) => callers.push(caller),
                None => debug!(queue_id = %queue_id, uuid = %uuid, "Caller vanished while listing"),
            }
        }
        Ok(callers)
    }

    /// Apply a partial update. A status change moves the caller between
    /// status sets and stamps `status_at`.
    pub async fn update_queue_caller(
        &self,
        queue_id: &str,
        uuid: &str,
        update: CallerUpdate,
    ) -> Result<QueueCaller, QueueError> {
        let ns = Namespace::callers(queue_id);
        let now = self.clock.now();
        let patch = codec::caller_patch(&update, &now);

        if !self.backend.update(&ns, uuid, patch).await? {
            return Err(not_found(queue_id, uuid));
        }

        let caller = self.get_queue_caller(queue_id, uuid).await?;
        self.publish(
            EntityKind::Caller,
            EventAction::Update,
            queue_id,
            uuid,
            &caller,
        )
        .await?;

        info!(queue_id = %queue_id, uuid = %uuid, status = caller.status.name(), "Queue caller updated");
        Ok(caller)
    }

    /// Remove a caller and return it as it was before removal.
    pub async fn delete_queue_caller(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<QueueCaller, QueueError> {
        let ns = Namespace::callers(queue_id);
        let stored = self
            .backend
            .remove(&ns, uuid)
            .await?
            .ok_or_else(|| not_found(queue_id, uuid))?;
        let caller = codec::decode_caller(&stored)?;

        self.publish(
            EntityKind::Caller,
            EventAction::Delete,
            queue_id,
            uuid,
            &caller,
        )
        .await?;

        info!(queue_id = %queue_id, uuid = %uuid, "Queue caller deleted");
        Ok(caller)
    }
}
