//! Queue caller and member types.
//!
//! - [`QueueCaller`], [`QueueMember`]: hydrated entities
//! - [`CallerStatus`], [`MemberStatus`]: lifecycle states with their wire codes
//! - [`NewQueueCaller`], [`NewQueueMember`]: create inputs
//! - [`CallerUpdate`], [`MemberUpdate`]: partial updates

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::serde_micros;

/// A status string or code that matches no known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {entity} status '{value}'")]
pub struct UnknownStatus {
    pub entity: &'static str,
    pub value: String,
}

// ============================================================================
// Statuses
// ============================================================================

/// Lifecycle state of a caller.
///
/// Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CallerStatus {
    /// Waiting in the queue (code 1)
    Waiting,
    /// Being offered to a member (code 2)
    Ringing,
    /// Talking to a member (code 3)
    Connected,
}

impl CallerStatus {
    pub const ALL: [CallerStatus; 3] = [Self::Waiting, Self::Ringing, Self::Connected];

    pub const fn code(self) -> u8 {
        match self {
            Self::Waiting => 1,
            Self::Ringing => 2,
            Self::Connected => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Ringing => "ringing",
            Self::Connected => "connected",
        }
    }
}

impl Default for CallerStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

impl From<CallerStatus> for u8 {
    fn from(status: CallerStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for CallerStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| UnknownStatus {
            entity: "caller",
            value: code.to_string(),
        })
    }
}

impl FromStr for CallerStatus {
    type Err = UnknownStatus;

    /// Accepts the numeric code (`"1"`) or the name (`"waiting"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .or_else(|| Self::ALL.into_iter().find(|st| st.name().eq_ignore_ascii_case(s)))
            .ok_or_else(|| UnknownStatus {
                entity: "caller",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for CallerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Lifecycle state of a member.
///
/// The codes differ from [`CallerStatus`]: RINGING is 6, not 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MemberStatus {
    /// Available for a caller (code 1)
    Waiting,
    /// On a call (code 2)
    Connected,
    /// Being offered a caller (code 6)
    Ringing,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 3] = [Self::Waiting, Self::Connected, Self::Ringing];

    pub const fn code(self) -> u8 {
        match self {
            Self::Waiting => 1,
            Self::Connected => 2,
            Self::Ringing => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Connected => "connected",
            Self::Ringing => "ringing",
        }
    }
}

impl Default for MemberStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

impl From<MemberStatus> for u8 {
    fn from(status: MemberStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for MemberStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| UnknownStatus {
            entity: "member",
            value: code.to_string(),
        })
    }
}

impl FromStr for MemberStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .or_else(|| Self::ALL.into_iter().find(|st| st.name().eq_ignore_ascii_case(s)))
            .ok_or_else(|| UnknownStatus {
                entity: "member",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A caller waiting in, or being connected through, a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueCaller {
    pub uuid: String,
    #[serde(with = "serde_micros")]
    pub created_at: DateTime<Utc>,
    /// Member the caller is linked to, if any
    pub member_uuid: Option<String>,
    pub name: Option<String>,
    /// Phone number
    pub number: Option<String>,
    /// Zero-based rank in the queue, computed at read time
    pub position: Option<u64>,
    pub queue_id: String,
    pub status: CallerStatus,
    #[serde(with = "serde_micros")]
    pub status_at: DateTime<Utc>,
}

/// An agent attached to a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMember {
    pub uuid: String,
    #[serde(with = "serde_micros")]
    pub created_at: DateTime<Utc>,
    pub number: String,
    pub paused: bool,
    #[serde(with = "serde_micros")]
    pub paused_at: DateTime<Utc>,
    pub queue_id: String,
    pub status: MemberStatus,
    #[serde(with = "serde_micros")]
    pub status_at: DateTime<Utc>,
}

// ============================================================================
// Inputs
// ============================================================================

/// Fields accepted when creating a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewQueueCaller {
    /// Caller-supplied id; a v4 UUID is generated when absent
    pub uuid: Option<String>,
    pub member_uuid: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    /// Initial status, WAITING when absent
    pub status: Option<CallerStatus>,
}

impl NewQueueCaller {
    pub fn with_number(number: impl Into<String>) -> Self {
        Self {
            number: Some(number.into()),
            ..Self::default()
        }
    }
}

/// Fields accepted when creating a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewQueueMember {
    #[serde(default)]
    pub uuid: Option<String>,
    pub number: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub status: Option<MemberStatus>,
}

impl NewQueueMember {
    pub fn with_number(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a caller. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerUpdate {
    pub member_uuid: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub status: Option<CallerStatus>,
}

impl CallerUpdate {
    pub fn status(status: CallerStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.member_uuid.is_none()
            && self.name.is_none()
            && self.number.is_none()
            && self.status.is_none()
    }
}

/// Partial update of a member. Supplying `paused` refreshes `paused_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberUpdate {
    pub number: Option<String>,
    pub paused: Option<bool>,
    pub status: Option<MemberStatus>,
}

impl MemberUpdate {
    pub fn status(status: MemberStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.paused.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_codes() {
        assert_eq!(CallerStatus::Waiting.code(), 1);
        assert_eq!(CallerStatus::Ringing.code(), 2);
        assert_eq!(CallerStatus::Connected.code(), 3);
        assert_eq!(CallerStatus::from_code(4), None);
    }

    #[test]
    fn member_codes_differ_from_caller_codes() {
        assert_eq!(MemberStatus::Connected.code(), 2);
        assert_eq!(MemberStatus::Ringing.code(), 6);
        assert_eq!(MemberStatus::from_code(3), None);
        assert_eq!(MemberStatus::from_code(6), Some(MemberStatus::Ringing));
    }

    #[test]
    fn status_parses_code_or_name() {
        assert_eq!("3".parse::<CallerStatus>(), Ok(CallerStatus::Connected));
        assert_eq!("Ringing".parse::<MemberStatus>(), Ok(MemberStatus::Ringing));
        let err = "9".parse::<CallerStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown caller status '9'");
    }

    #[test]
    fn status_serializes_as_code() {
        assert_eq!(serde_json::to_string(&MemberStatus::Ringing).unwrap(), "6");
        let status: CallerStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, CallerStatus::Ringing);
        assert!(serde_json::from_str::<CallerStatus>("7").is_err());
    }

    #[test]
    fn new_caller_defaults_from_empty_json() {
        let new: NewQueueCaller = serde_json::from_str("{}").unwrap();
        assert_eq!(new, NewQueueCaller::default());
        assert!(serde_json::from_str::<NewQueueMember>("{}").is_err());
    }

    #[test]
    fn empty_updates() {
        assert!(CallerUpdate::default().is_empty());
        assert!(!CallerUpdate::status(CallerStatus::Ringing).is_empty());
        assert!(!MemberUpdate {
            paused: Some(true),
            ..MemberUpdate::default()
        }
        .is_empty());
    }
}
