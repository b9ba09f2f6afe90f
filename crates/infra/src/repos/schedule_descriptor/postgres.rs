use super::{IScheduleDescriptorRepo, UpdateError};
use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use nudge_domain::{ScheduleDescriptor, ScheduleKind, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use tracing::error;

pub struct PostgresScheduleDescriptorRepo {
    pool: PgPool,
}

impl PostgresScheduleDescriptorRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ScheduleDescriptorRaw {
    descriptor_uid: Uuid,
    owner_id: String,
    payload: String,
    kind: serde_json::Value,
    timezone: String,
    status: String,
    next_fire_at: Option<DateTime<Utc>>,
    last_fired_at: Option<DateTime<Utc>>,
    claimed_until: Option<DateTime<Utc>>,
    version: i64,
    created: DateTime<Utc>,
}

impl TryFrom<ScheduleDescriptorRaw> for ScheduleDescriptor {
    type Error = anyhow::Error;

    fn try_from(raw: ScheduleDescriptorRaw) -> anyhow::Result<Self> {
        let kind: ScheduleKind = serde_json::from_value(raw.kind)
            .with_context(|| format!("Malformed kind of descriptor {}", raw.descriptor_uid))?;
        let timezone = raw
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", raw.timezone, e))?;
        Ok(Self {
            id: raw.descriptor_uid.into(),
            owner_id: raw.owner_id,
            payload: raw.payload,
            kind,
            timezone,
            status: raw.status.parse()?,
            next_fire_at: raw.next_fire_at,
            last_fired_at: raw.last_fired_at,
            claimed_until: raw.claimed_until,
            version: raw.version,
            created: raw.created,
        })
    }
}

/// Converts rows, leaving out and logging the ones that cannot be read
fn into_descriptors(rows: Vec<ScheduleDescriptorRaw>) -> Vec<ScheduleDescriptor> {
    rows.into_iter()
        .filter_map(|raw| match ScheduleDescriptor::try_from(raw) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                error!("Skipping unreadable schedule descriptor: {:?}", e);
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl IScheduleDescriptorRepo for PostgresScheduleDescriptorRepo {
    async fn insert(&self, descriptor: &ScheduleDescriptor) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedule_descriptors(
                descriptor_uid, owner_id, payload, kind, timezone, status,
                next_fire_at, last_fired_at, claimed_until, version, created
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(descriptor.id.inner_ref())
        .bind(&descriptor.owner_id)
        .bind(&descriptor.payload)
        .bind(Json(&descriptor.kind))
        .bind(descriptor.timezone.name())
        .bind(descriptor.status.as_str())
        .bind(descriptor.next_fire_at)
        .bind(descriptor.last_fired_at)
        .bind(descriptor.claimed_until)
        .bind(descriptor.version)
        .bind(descriptor.created)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, descriptor_id: &ID) -> Option<ScheduleDescriptor> {
        let raw = sqlx::query_as::<_, ScheduleDescriptorRaw>(
            r#"
            SELECT * FROM schedule_descriptors
            WHERE descriptor_uid = $1
            "#,
        )
        .bind(descriptor_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| error!("Unable to find schedule descriptor: {:?}", e))
        .ok()??;
        into_descriptors(vec![raw]).pop()
    }

    async fn update(
        &self,
        descriptor: &ScheduleDescriptor,
        expected_version: i64,
    ) -> Result<ScheduleDescriptor, UpdateError> {
        let updated = sqlx::query_as::<_, ScheduleDescriptorRaw>(
            r#"
            UPDATE schedule_descriptors
            SET kind = $3,
            status = $4,
            next_fire_at = $5,
            last_fired_at = $6,
            claimed_until = $7,
            version = version + 1
            WHERE descriptor_uid = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(descriptor.id.inner_ref())
        .bind(expected_version)
        .bind(Json(&descriptor.kind))
        .bind(descriptor.status.as_str())
        .bind(descriptor.next_fire_at)
        .bind(descriptor.last_fired_at)
        .bind(descriptor.claimed_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(anyhow::Error::new)?;

        match updated {
            Some(raw) => Ok(ScheduleDescriptor::try_from(raw)?),
            None => {
                let exists: Option<(Uuid,)> = sqlx::query_as(
                    "SELECT descriptor_uid FROM schedule_descriptors WHERE descriptor_uid = $1",
                )
                .bind(descriptor.id.inner_ref())
                .fetch_optional(&self.pool)
                .await
                .map_err(anyhow::Error::new)?;
                if exists.is_some() {
                    Err(UpdateError::VersionConflict)
                } else {
                    Err(UpdateError::NotFound)
                }
            }
        }
    }

    async fn find_due(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<ScheduleDescriptor>> {
        let rows = sqlx::query_as::<_, ScheduleDescriptorRaw>(
            r#"
            SELECT * FROM schedule_descriptors
            WHERE status = 'active'
                AND next_fire_at <= $1
                AND (claimed_until IS NULL OR claimed_until <= $1)
            ORDER BY next_fire_at ASC, descriptor_uid ASC
            LIMIT $2
            "#,
        )
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_descriptors(rows))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Vec<ScheduleDescriptor> {
        let rows = sqlx::query_as::<_, ScheduleDescriptorRaw>(
            r#"
            SELECT * FROM schedule_descriptors
            WHERE owner_id = $1
            ORDER BY next_fire_at ASC NULLS LAST, descriptor_uid ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Unable to list schedule descriptors: {:?}", e);
            Vec::new()
        });

        into_descriptors(rows)
    }
}
