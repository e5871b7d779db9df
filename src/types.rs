use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::errors::{BigPandaError, Result};

/// OIM alert status values accepted by BigPanda
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OimAlertStatus {
    Ok,
    Critical,
    Warning,
    Acknowledged,
}

impl Display for OimAlertStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OimAlertStatus::Ok => write!(f, "ok"),
            OimAlertStatus::Critical => write!(f, "critical"),
            OimAlertStatus::Warning => write!(f, "warning"),
            OimAlertStatus::Acknowledged => write!(f, "acknowledged"),
        }
    }
}

/// Alert payload for a BigPanda Open Integration Manager integration
///
/// Every property key/value pair becomes a tag on the alert in BigPanda.
/// If no timestamp is set, BigPanda stamps the alert when it receives it.
///
/// # Example
///
/// ```rust
/// use bigpanda_api::{OimAlert, OimAlertStatus};
///
/// let alert = OimAlert::new("my-app-key")
///     .with_status(OimAlertStatus::Critical)
///     .with_property("host", "web-1")
///     .with_property("check", "disk-usage")
///     .with_property("description", "Disk usage above 95%");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OimAlert {
    /// App Key of the OIM integration receiving the alert
    pub app_key: String,

    /// Alert status
    pub status: OimAlertStatus,

    /// Alert time; serialized as fractional epoch seconds
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "epoch_seconds"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    /// Alert properties, flattened into the payload as tags
    #[serde(flatten)]
    pub properties: HashMap<String, String>,
}

impl OimAlert {
    /// Create a new alert for the given OIM app key
    ///
    /// The status defaults to [`OimAlertStatus::Warning`].
    pub fn new(app_key: &str) -> Self {
        Self {
            app_key: app_key.to_string(),
            status: OimAlertStatus::Warning,
            timestamp: None,
            properties: HashMap::new(),
        }
    }

    /// Set the alert status
    pub fn with_status(mut self, status: OimAlertStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a property to the alert
    ///
    /// Each property is parsed as a tag on the BigPanda side.
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    /// Set an explicit alert time
    pub fn with_timestamp(mut self, time: DateTime<Utc>) -> Self {
        self.timestamp = Some(time);
        self
    }
}

fn epoch_seconds<S>(
    timestamp: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match timestamp {
        Some(ts) => serializer.serialize_f64(ts.timestamp_micros() as f64 / 1_000_000.0),
        None => serializer.serialize_none(),
    }
}

/// A maintenance plan to be created
///
/// The schedule needs a start (defaults to now) and exactly one way of
/// ending: an absolute end time or a duration measured from the start.
///
/// # Example
///
/// ```rust
/// use bigpanda_api::NewMaintenancePlan;
/// use chrono::Duration;
/// use serde_json::json;
///
/// let plan = NewMaintenancePlan::new(
///     "db-upgrade",
///     json!({"=": {"tag": "host", "value": "db-1"}}),
/// )
/// .with_description("Quarterly database upgrade window")
/// .ending_after(Duration::hours(2));
/// ```
#[derive(Debug, Clone)]
pub struct NewMaintenancePlan {
    name: String,
    condition: Value,
    description: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    end_after: Option<Duration>,
}

impl NewMaintenancePlan {
    /// Create a plan with the given name and BPQL condition
    ///
    /// The condition selects which incidents the plan suppresses, in
    /// BPQL object syntax.
    pub fn new(name: &str, condition: Value) -> Self {
        Self {
            name: name.to_string(),
            condition,
            description: None,
            start: None,
            end: None,
            end_after: None,
        }
    }

    /// Add a description shown in the BigPanda UI
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the start time; without it the plan starts immediately
    pub fn starting_at(mut self, time: DateTime<Utc>) -> Self {
        self.start = Some(time);
        self
    }

    /// End the plan at an absolute time
    pub fn ending_at(mut self, time: DateTime<Utc>) -> Self {
        self.end = Some(time);
        self
    }

    /// End the plan a duration after its start
    pub fn ending_after(mut self, duration: Duration) -> Self {
        self.end_after = Some(duration);
        self
    }

    /// Resolve the schedule and produce the wire payload
    pub(crate) fn into_body(self) -> Result<MaintenancePlanBody> {
        let start = self.start.unwrap_or_else(Utc::now);
        let end = match (self.end, self.end_after) {
            (Some(_), Some(_)) => {
                return Err(BigPandaError::Validation(
                    "only one of an absolute end time and an end duration can be provided"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(BigPandaError::Validation(
                    "one of an absolute end time or an end duration must be provided".to_string(),
                ))
            }
            (Some(end), None) => end,
            (None, Some(duration)) => start + duration,
        };

        Ok(MaintenancePlanBody {
            name: self.name,
            condition: self.condition,
            start: start.timestamp(),
            end: end.timestamp(),
            description: self.description,
        })
    }
}

/// Wire payload for maintenance plan creation; schedule in epoch seconds
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MaintenancePlanBody {
    pub name: String,
    pub condition: Value,
    pub start: i64,
    pub end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A maintenance plan as reported by BigPanda
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenancePlan {
    /// Server-assigned plan identifier
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Schedule start, epoch seconds
    pub start: i64,
    /// Schedule end, epoch seconds
    pub end: i64,
    /// BPQL condition selecting suppressed incidents
    #[serde(default)]
    pub condition: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MaintenancePlansResponse {
    pub data: Vec<MaintenancePlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MaintenancePlanCreated {
    pub id: String,
}

/// Schema definition for a new mapping enrichment
///
/// A mapping enrichment looks up the value of the query tag in an
/// uploaded table and writes the matching value into the result tag.
/// The schema must exist before any table data can be uploaded.
#[derive(Debug, Clone, Serialize)]
pub struct MappingSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    active: bool,
    when: &'static str,
    config: MappingSchemaConfig,
}

#[derive(Debug, Clone, Serialize)]
struct MappingSchemaConfig {
    name: String,
    fields: Vec<MappingSchemaField>,
}

#[derive(Debug, Clone, Serialize)]
struct MappingSchemaField {
    title: String,
    #[serde(rename = "type")]
    field_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_existing: Option<bool>,
}

impl MappingSchema {
    /// Define a schema mapping `query_tag` values to `result_tag` values
    ///
    /// The enrichment name defaults to the result tag.
    pub fn new(query_tag: &str, result_tag: &str) -> Self {
        Self {
            kind: "mapping",
            active: true,
            when: "discard != true",
            config: MappingSchemaConfig {
                name: result_tag.to_string(),
                fields: vec![
                    MappingSchemaField {
                        title: query_tag.to_string(),
                        field_type: "query_tag",
                        override_existing: None,
                    },
                    MappingSchemaField {
                        title: result_tag.to_string(),
                        field_type: "result_tag",
                        override_existing: Some(true),
                    },
                ],
            },
        }
    }

    /// Override the enrichment name
    pub fn with_name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// The enrichment name this schema will be registered under
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// One mapping enrichment as listed by BigPanda
#[derive(Debug, Clone, Deserialize)]
pub struct MappingEnrichment {
    /// Internal identifier used by the upload endpoint
    pub id: String,
    pub config: MappingEnrichmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingEnrichmentConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MappingEnrichmentsResponse {
    pub data: Vec<MappingEnrichment>,
}

/// Upload acceptance response; the job id may be absent on a
/// misbehaving server, which the client reports as a protocol error.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MappingUploadResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobStatusResponse {
    pub status: JobState,
}

/// Status of a server-side enrichment job
///
/// Only `done` and `failed` are terminal; every other status string
/// means the job is still being processed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobState {
    Done,
    Failed,
    InProgress(String),
}

impl From<String> for JobState {
    fn from(status: String) -> Self {
        match status.as_str() {
            "done" => JobState::Done,
            "failed" => JobState::Failed,
            _ => JobState::InProgress(status),
        }
    }
}

impl JobState {
    /// Whether the job has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
            JobState::InProgress(status) => write!(f, "{status}"),
        }
    }
}
