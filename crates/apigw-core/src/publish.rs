//! Publish event ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::step::step_rank;

/// Free-form diagnostic payload attached to a report
pub type EventDetail = serde_json::Map<String, Value>;

/// Key a non-object detail payload is stored under
pub const DETAIL_VALUE_KEY: &str = "value";

/// Detail map for an arbitrary JSON payload
///
/// Objects are kept as they are and `null` becomes an empty map. Any other
/// value is stored unchanged under [`DETAIL_VALUE_KEY`].
pub fn event_detail(raw: Value) -> EventDetail {
    match raw {
        Value::Object(map) => map,
        Value::Null => EventDetail::new(),
        other => {
            let mut detail = EventDetail::new();
            detail.insert(DETAIL_VALUE_KEY.to_string(), other);
            detail
        }
    }
}

/// Status carried by a single report
///
/// The usual progression is `pending -> doing -> success | failure`, but
/// reports are independent facts and regressions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishEventStatus {
    /// Queued
    Pending,
    /// In progress
    Doing,
    /// Finished successfully
    Success,
    /// Finished with an error
    Failure,
}

impl PublishEventStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishEventStatus::Pending => "pending",
            PublishEventStatus::Doing => "doing",
            PublishEventStatus::Success => "success",
            PublishEventStatus::Failure => "failure",
        }
    }

}

impl std::fmt::Display for PublishEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}


/// One progress report as submitted by a pipeline system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEventReport {
    /// Publish run identifier
    pub publish_id: i64,

    /// Target gateway
    pub gateway_name: String,

    /// Target stage
    pub stage_name: String,

    /// Pipeline step; any string is accepted
    pub step_name: String,

    /// Reported status
    pub status: PublishEventStatus,

    /// Opaque diagnostics
    #[serde(default)]
    pub detail: EventDetail,
}

impl PublishEventReport {
    /// Check required fields. The step name may be any string.
    pub fn validate(&self) -> Result<()> {
        if self.gateway_name.is_empty() {
            return Err(ModelError::MissingField("gateway_name"));
        }
        if self.stage_name.is_empty() {
            return Err(ModelError::MissingField("stage_name"));
        }
        Ok(())
    }

    /// Stamp the report with its ingestion time
    pub fn into_event(self, reported_at: DateTime<Utc>) -> PublishEvent {
        PublishEvent {
            publish_id: self.publish_id,
            gateway_name: self.gateway_name,
            stage_name: self.stage_name,
            step_name: self.step_name,
            status: self.status,
            detail: self.detail,
            reported_at,
        }
    }
}

/// A ledger record. Appended once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    /// Publish run identifier
    pub publish_id: i64,

    /// Target gateway
    pub gateway_name: String,

    /// Target stage
    pub stage_name: String,

    /// Pipeline step
    pub step_name: String,

    /// Reported status
    pub status: PublishEventStatus,

    /// Opaque diagnostics
    pub detail: EventDetail,

    /// Ingestion time
    pub reported_at: DateTime<Utc>,
}

impl PublishEvent {
    /// Pipeline rank of the step, 0 when unknown
    pub fn step_rank(&self) -> u8 {
        step_rank(&self.step_name)
    }
}
