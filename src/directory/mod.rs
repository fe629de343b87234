//! Relational records for queues, agents and queue memberships.
//!
//! Live caller/member state lives in [`QueueCache`](crate::QueueCache);
//! this module keeps the durable definitions those queues are built from.
//!
//! # Usage
//!
//! Enable the `postgres` feature:
//!
//! ```toml
//! [dependencies]
//! payload = { version = "0.3", features = ["postgres"] }
//! ```
//!
//! ```rust,ignore
//! use payload::directory::{DirectoryStore, NewQueue};
//!
//! let store = DirectoryStore::new("postgres://localhost/payload").await?;
//! let queue = store
//!     .create_queue(NewQueue { name: "support".into(), ..Default::default() })
//!     .await?;
//! ```

mod error;
mod models;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

pub use error::DirectoryError;
pub use models::{
    Agent, NewAgent, NewQueue, Queue, QueueMembership, QueueUpdate, QUEUE_NAME_MAX_LEN,
};

const DEFAULT_POOL_SIZE: u32 = 10;

/// Postgres-backed store for queue, agent and membership records.
#[derive(Clone)]
pub struct DirectoryStore {
    pool: PgPool,
}

impl DirectoryStore {
    /// Connect and create the schema if needed.
    pub async fn new(database_url: &str) -> Result<Self, DirectoryError> {
        Self::with_pool_size(database_url, DEFAULT_POOL_SIZE).await
    }

    pub async fn with_pool_size(database_url: &str, pool_size: u32) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| {
                DirectoryError::Database(format!("Failed to connect to PostgreSQL: {}", e))
            })?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and create the schema if needed.
    pub async fn from_pool(pool: PgPool) -> Result<Self, DirectoryError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), DirectoryError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| DirectoryError::Database(format!("Failed to initialize schema: {}", e)))?;
        debug!("Directory schema ready");
        Ok(())
    }

    fn assign_uuid(supplied: Option<String>) -> String {
        supplied
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    fn validate_queue_name(name: &str) -> Result<(), DirectoryError> {
        if name.trim().is_empty() {
            return Err(DirectoryError::Invalid("queue name cannot be empty".into()));
        }
        if name.chars().count() > QUEUE_NAME_MAX_LEN {
            return Err(DirectoryError::Invalid(format!(
                "queue name is too long (max {} characters)",
                QUEUE_NAME_MAX_LEN
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Queues
    // ========================================================================

    pub async fn create_queue(&self, new: NewQueue) -> Result<Queue, DirectoryError> {
        Self::validate_queue_name(&new.name)?;
        let uuid = Self::assign_uuid(new.uuid);

        let queue: Queue = sqlx::query_as(
            r#"
            INSERT INTO queues (uuid, name, description, disabled, project_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&uuid)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.disabled)
        .bind(&new.project_id)
        .bind(&new.user_id)
        .fetch_one(&self.pool)
        .await?;

        info!(uuid = %queue.uuid, name = %queue.name, "Queue created");
        Ok(queue)
    }

    pub async fn get_queue(&self, uuid: &str) -> Result<Queue, DirectoryError> {
        sqlx::query_as(r#"SELECT * FROM queues WHERE uuid = $1"#)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DirectoryError::QueueNotFound(uuid.to_string()))
    }

    /// List queues in creation order, optionally restricted to one project.
    pub async fn list_queues(&self, project_id: Option<&str>) -> Result<Vec<Queue>, DirectoryError> {
        let queues = sqlx::query_as(
            r#"
            SELECT * FROM queues
            WHERE ($1::TEXT IS NULL OR project_id = $1)
            ORDER BY id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(queues)
    }

    pub async fn update_queue(
        &self,
        uuid: &str,
        update: QueueUpdate,
    ) -> Result<Queue, DirectoryError> {
        if let Some(name) = &update.name {
            Self::validate_queue_name(name)?;
        }

        let queue: Queue = sqlx::query_as(
            r#"
            UPDATE queues
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                disabled = COALESCE($4, disabled),
                updated_at = NOW()
            WHERE uuid = $1
            RETURNING *
            "#,
        )
        .bind(uuid)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.disabled)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DirectoryError::QueueNotFound(uuid.to_string()))?;

        info!(uuid = %queue.uuid, "Queue updated");
        Ok(queue)
    }

    /// Delete a queue and its memberships.
    pub async fn delete_queue(&self, uuid: &str) -> Result<Queue, DirectoryError> {
        let queue: Queue = sqlx::query_as(r#"DELETE FROM queues WHERE uuid = $1 RETURNING *"#)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DirectoryError::QueueNotFound(uuid.to_string()))?;

        info!(uuid = %queue.uuid, "Queue deleted");
        Ok(queue)
    }

    // ========================================================================
    // Agents
    // ========================================================================

    pub async fn create_agent(&self, new: NewAgent) -> Result<Agent, DirectoryError> {
        let uuid = Self::assign_uuid(new.uuid);

        let agent: Agent = sqlx::query_as(
            r#"
            INSERT INTO agents (uuid, project_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&uuid)
        .bind(&new.project_id)
        .bind(&new.user_id)
        .fetch_one(&self.pool)
        .await?;

        info!(uuid = %agent.uuid, "Agent created");
        Ok(agent)
    }

    pub async fn get_agent(&self, uuid: &str) -> Result<Agent, DirectoryError> {
        sqlx::query_as(r#"SELECT * FROM agents WHERE uuid = $1"#)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DirectoryError::AgentNotFound(uuid.to_string()))
    }

    pub async fn list_agents(&self, project_id: Option<&str>) -> Result<Vec<Agent>, DirectoryError> {
        let agents = sqlx::query_as(
            r#"
            SELECT * FROM agents
            WHERE ($1::TEXT IS NULL OR project_id = $1)
            ORDER BY id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(agents)
    }

    /// Delete an agent and its memberships.
    pub async fn delete_agent(&self, uuid: &str) -> Result<Agent, DirectoryError> {
        let agent: Agent = sqlx::query_as(r#"DELETE FROM agents WHERE uuid = $1 RETURNING *"#)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DirectoryError::AgentNotFound(uuid.to_string()))?;

        info!(uuid = %agent.uuid, "Agent deleted");
        Ok(agent)
    }

    // ========================================================================
    // Queue memberships
    // ========================================================================

    /// Attach an agent to a queue. Both must exist; a duplicate pair is a
    /// [`DirectoryError::Conflict`].
    pub async fn create_queue_member(
        &self,
        agent_uuid: &str,
        queue_uuid: &str,
    ) -> Result<QueueMembership, DirectoryError> {
        self.get_queue(queue_uuid).await?;
        self.get_agent(agent_uuid).await?;

        let membership: QueueMembership = sqlx::query_as(
            r#"
            INSERT INTO queue_members (agent_uuid, queue_uuid)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(agent_uuid)
        .bind(queue_uuid)
        .fetch_one(&self.pool)
        .await?;

        info!(agent_uuid = %agent_uuid, queue_uuid = %queue_uuid, "Queue member created");
        Ok(membership)
    }

    pub async fn get_queue_member(
        &self,
        agent_uuid: &str,
        queue_uuid: &str,
    ) -> Result<QueueMembership, DirectoryError> {
        sqlx::query_as(
            r#"SELECT * FROM queue_members WHERE agent_uuid = $1 AND queue_uuid = $2"#,
        )
        .bind(agent_uuid)
        .bind(queue_uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DirectoryError::QueueMemberNotFound {
            agent_uuid: agent_uuid.to_string(),
            queue_uuid: queue_uuid.to_string(),
        })
    }

    /// Memberships of one queue in creation order.
    pub async fn list_queue_members(
        &self,
        queue_uuid: &str,
    ) -> Result<Vec<QueueMembership>, DirectoryError> {
        self.get_queue(queue_uuid).await?;

        let members = sqlx::query_as(
            r#"SELECT * FROM queue_members WHERE queue_uuid = $1 ORDER BY id"#,
        )
        .bind(queue_uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn delete_queue_member(
        &self,
        agent_uuid: &str,
        queue_uuid: &str,
    ) -> Result<QueueMembership, DirectoryError> {
        let membership: QueueMembership = sqlx::query_as(
            r#"
            DELETE FROM queue_members
            WHERE agent_uuid = $1 AND queue_uuid = $2
            RETURNING *
            "#,
        )
        .bind(agent_uuid)
        .bind(queue_uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DirectoryError::QueueMemberNotFound {
            agent_uuid: agent_uuid.to_string(),
            queue_uuid: queue_uuid.to_string(),
        })?;

        info!(agent_uuid = %agent_uuid, queue_uuid = %queue_uuid, "Queue member deleted");
        Ok(membership)
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queues (
    id BIGSERIAL PRIMARY KEY,
    uuid TEXT NOT NULL UNIQUE,
    name VARCHAR(80) NOT NULL,
    description JSONB,
    disabled BOOLEAN NOT NULL DEFAULT FALSE,
    project_id TEXT,
    user_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_queues_project ON queues (project_id);

CREATE TABLE IF NOT EXISTS agents (
    id BIGSERIAL PRIMARY KEY,
    uuid TEXT NOT NULL UNIQUE,
    project_id TEXT,
    user_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_agents_project ON agents (project_id);

CREATE TABLE IF NOT EXISTS queue_members (
    id BIGSERIAL PRIMARY KEY,
    agent_uuid TEXT NOT NULL REFERENCES agents (uuid) ON DELETE CASCADE,
    queue_uuid TEXT NOT NULL REFERENCES queues (uuid) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (agent_uuid, queue_uuid)
);

CREATE INDEX IF NOT EXISTS idx_queue_members_queue ON queue_members (queue_uuid);
"#;
