use tracing::{debug, info};

use super::{codec, QueueCache};
use crate::backend::{EntityKind, Namespace};
use crate::clock::score;
use crate::error::QueueError;
use crate::models::{MemberStatus, MemberUpdate, NewQueueMember, QueueMember};
use crate::notify::EventAction;

fn not_found(queue_id: &str, uuid: &str) -> QueueError {
    QueueError::MemberNotFound {
        queue_id: queue_id.to_string(),
        uuid: uuid.to_string(),
    }
}

impl QueueCache {
    /// Attach a member to the queue. `paused_at` starts at the creation time.
    pub async fn create_queue_member(
        &self,
        queue_id: &str,
        new: NewQueueMember,
    ) -> Result<QueueMember, QueueError> {
        let ns = Namespace::members(queue_id);
        let uuid = Self::assign_uuid(new.uuid.as_deref());
        let status = new.status.unwrap_or_default();
        let now = self.clock.now();

        let record = codec::member_record(&uuid, queue_id, &now, &new, status);
        self.backend
            .insert(&ns, &uuid, record, &status.code().to_string(), score(&now))
            .await?;

        let member = self.get_queue_member(queue_id, &uuid).await?;
        self.publish(
            EntityKind::Member,
            EventAction::Create,
            queue_id,
            &uuid,
            &member,
        )
        .await?;

        info!(
            queue_id = %queue_id,
            uuid = %uuid,
            status = status.name(),
            paused = member.paused,
            "Queue member created"
        );
        Ok(member)
    }

    pub async fn get_queue_member(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<QueueMember, QueueError> {
        self.find_queue_member(queue_id, uuid)
            .await?
            .ok_or_else(|| not_found(queue_id, uuid))
    }

    pub async fn find_queue_member(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<Option<QueueMember>, QueueError> {
        let ns = Namespace::members(queue_id);
        let stored = self.backend.load(&ns, uuid).await?;
        debug!(queue_id = %queue_id, uuid = %uuid, found = stored.is_some(), "Queue member loaded");
        stored.map(|s| codec::decode_member(&s)).transpose()
    }

    pub async fn list_queue_members(
        &self,
        queue_id: &str,
        status: Option<MemberStatus>,
    ) -> Result<Vec<QueueMember>, QueueError> {
        let ns = Namespace::members(queue_id);
        let uuids = self
            .list_uuids(&ns, status.map(|s| s.code().to_string()))
            .await?;

        let mut members = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            match self.find_queue_member(queue_id, &uuid).await? {
                Some(member) => members.push(member),
                None => debug!(queue_id = %queue_id, uuid = %uuid, "Member vanished while listing"),
            }
        }
        Ok(members)
    }

    /// Apply a partial update. Supplying `paused` refreshes `paused_at`.
    pub async fn update_queue_member(
        &self,
        queue_id: &str,
        uuid: &str,
        update: MemberUpdate,
    ) -> Result<QueueMember, QueueError> {
        let ns = Namespace::members(queue_id);
        let now = self.clock.now();
        let patch = codec::member_patch(&update, &now);

        if !self.backend.update(&ns, uuid, patch).await? {
            return Err(not_found(queue_id, uuid));
        }

        let member = self.get_queue_member(queue_id, uuid).await?;
        self.publish(
            EntityKind::Member,
            EventAction::Update,
            queue_id,
            uuid,
            &member,
        )
        .await?;

        info!(
            queue_id = %queue_id,
            uuid = %uuid,
            status = member.status.name(),
            paused = member.paused,
            "Queue member updated"
        );
        Ok(member)
    }

    pub async fn delete_queue_member(
        &self,
        queue_id: &str,
        uuid: &str,
    ) -> Result<QueueMember, QueueError> {
        let ns = Namespace::members(queue_id);
        let stored = self
            .backend
            .remove(&ns, uuid)
            .await?
            .ok_or_else(|| not_found(queue_id, uuid))?;
        let member = codec::decode_member(&stored)?;

        self.publish(
            EntityKind::Member,
            EventAction::Delete,
            queue_id,
            uuid,
            &member,
        )
        .await?;

        info!(queue_id = %queue_id, uuid = %uuid, "Queue member deleted");
        Ok(member)
    }
}
