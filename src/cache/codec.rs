//! Conversion between typed entities and stored string records.

use chrono::{DateTime, Utc};

use crate::backend::{
    Record, RecordPatch, StatusChange, StoredRecord, STATUS_AT_FIELD, STATUS_FIELD, UUID_FIELD,
};
use crate::clock::{format_timestamp, parse_timestamp, score};
use crate::error::QueueError;
use crate::models::{
    CallerStatus, CallerUpdate, MemberStatus, MemberUpdate, NewQueueCaller, NewQueueMember,
    QueueCaller, QueueMember,
};

const CREATED_AT: &str = "created_at";
const MEMBER_UUID: &str = "member_uuid";
const NAME: &str = "name";
const NUMBER: &str = "number";
const PAUSED: &str = "paused";
const PAUSED_AT: &str = "paused_at";
const QUEUE_ID: &str = "queue_id";

fn field(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_string(), value.into())
}

fn encode_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn status_change(code: u8, now: &DateTime<Utc>) -> StatusChange {
    StatusChange {
        status: code.to_string(),
        score: score(now),
        status_at: format_timestamp(now),
    }
}

// ============================================================================
// Encoding
// ============================================================================

pub(crate) fn caller_record(
    uuid: &str,
    queue_id: &str,
    now: &DateTime<Utc>,
    new: &NewQueueCaller,
    status: CallerStatus,
) -> Record {
    let stamp = format_timestamp(now);
    Record::from([
        field(UUID_FIELD, uuid),
        field(CREATED_AT, stamp.clone()),
        field(MEMBER_UUID, new.member_uuid.clone().unwrap_or_default()),
        field(NAME, new.name.clone().unwrap_or_default()),
        field(NUMBER, new.number.clone().unwrap_or_default()),
        field(QUEUE_ID, queue_id),
        field(STATUS_FIELD, status.code().to_string()),
        field(STATUS_AT_FIELD, stamp),
    ])
}

pub(crate) fn member_record(
    uuid: &str,
    queue_id: &str,
    now: &DateTime<Utc>,
    new: &NewQueueMember,
    status: MemberStatus,
) -> Record {
    let stamp = format_timestamp(now);
    Record::from([
        field(UUID_FIELD, uuid),
        field(CREATED_AT, stamp.clone()),
        field(NUMBER, new.number.clone()),
        field(PAUSED, encode_bool(new.paused)),
        field(PAUSED_AT, stamp.clone()),
        field(QUEUE_ID, queue_id),
        field(STATUS_FIELD, status.code().to_string()),
        field(STATUS_AT_FIELD, stamp),
    ])
}

pub(crate) fn caller_patch(update: &CallerUpdate, now: &DateTime<Utc>) -> RecordPatch {
    let mut fields = Vec::new();
    if let Some(member_uuid) = &update.member_uuid {
        fields.push(field(MEMBER_UUID, member_uuid.clone()));
    }
    if let Some(name) = &update.name {
        fields.push(field(NAME, name.clone()));
    }
    if let Some(number) = &update.number {
        fields.push(field(NUMBER, number.clone()));
    }
    RecordPatch {
        fields,
        status: update.status.map(|s| status_change(s.code(), now)),
    }
}

pub(crate) fn member_patch(update: &MemberUpdate, now: &DateTime<Utc>) -> RecordPatch {
    let mut fields = Vec::new();
    if let Some(number) = &update.number {
        fields.push(field(NUMBER, number.clone()));
    }
    if let Some(paused) = update.paused {
        fields.push(field(PAUSED, encode_bool(paused)));
        fields.push(field(PAUSED_AT, format_timestamp(now)));
    }
    RecordPatch {
        fields,
        status: update.status.map(|s| status_change(s.code(), now)),
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn required<'a>(stored: &'a StoredRecord, name: &str) -> Result<&'a str, QueueError> {
    stored
        .get(name)
        .ok_or_else(|| QueueError::InvalidRecord(format!("missing field '{}'", name)))
}

fn optional(stored: &StoredRecord, name: &str) -> Option<String> {
    stored
        .get(name)
        .filter(|v| !v.is_empty() && *v != "None")
        .map(str::to_string)
}

fn timestamp(stored: &StoredRecord, name: &str) -> Result<DateTime<Utc>, QueueError> {
    let raw = required(stored, name)?;
    parse_timestamp(raw)
        .ok_or_else(|| QueueError::InvalidRecord(format!("bad timestamp in '{}': {}", name, raw)))
}

fn flag(stored: &StoredRecord, name: &str) -> Result<bool, QueueError> {
    match stored.get(name).unwrap_or("0") {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" | "" => Ok(false),
        other => Err(QueueError::InvalidRecord(format!(
            "bad flag in '{}': {}",
            name, other
        ))),
    }
}

pub(crate) fn decode_caller(stored: &StoredRecord) -> Result<QueueCaller, QueueError> {
    let status = required(stored, STATUS_FIELD)?
        .parse::<CallerStatus>()
        .map_err(|e| QueueError::InvalidRecord(e.to_string()))?;
    Ok(QueueCaller {
        uuid: required(stored, UUID_FIELD)?.to_string(),
        created_at: timestamp(stored, CREATED_AT)?,
        member_uuid: optional(stored, MEMBER_UUID),
        name: optional(stored, NAME),
        number: optional(stored, NUMBER),
        position: stored.rank,
        queue_id: required(stored, QUEUE_ID)?.to_string(),
        status,
        status_at: timestamp(stored, STATUS_AT_FIELD)?,
    })
}

pub(crate) fn decode_member(stored: &StoredRecord) -> Result<QueueMember, QueueError> {
    let status = required(stored, STATUS_FIELD)?
        .parse::<MemberStatus>()
        .map_err(|e| QueueError::InvalidRecord(e.to_string()))?;
    Ok(QueueMember {
        uuid: required(stored, UUID_FIELD)?.to_string(),
        created_at: timestamp(stored, CREATED_AT)?,
        number: stored.get(NUMBER).unwrap_or_default().to_string(),
        paused: flag(stored, PAUSED)?,
        paused_at: timestamp(stored, PAUSED_AT)?,
        queue_id: required(stored, QUEUE_ID)?.to_string(),
        status,
        status_at: timestamp(stored, STATUS_AT_FIELD)?,
    })
}
