use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Locally observed state of a tracked job
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Idle => "⏳",
            Self::Polling => "⚡",
            Self::Completed => "✅",
            Self::Failed => "❌",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "Waiting...",
            Self::Polling => "Processing...",
            Self::Completed => "Complete!",
            Self::Failed => "Failed",
        }
    }
}

/// Queue state reported by the job status endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteJobStatus {
    Active,
    Waiting,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub status: RemoteJobStatus,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusResponse {
    pub fn in_progress(status: RemoteJobStatus, progress: u32) -> Self {
        Self {
            status,
            progress: Some(progress),
            data: None,
            error: None,
        }
    }

    pub fn completed(data: Value) -> Self {
        Self {
            status: RemoteJobStatus::Completed,
            progress: Some(100),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RemoteJobStatus::Failed,
            progress: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// What a poller consumer sees: `{status, progress, data, error}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Percent as last reported by the server, 0..=100
    pub progress: u8,
    pub data: Option<Value>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_queue_payload() {
        let resp: JobStatusResponse = serde_json::from_value(json!({
            "jobId": "42",
            "status": "active",
            "progress": 40,
            "data": null,
            "error": null,
            "attempts": 1
        }))
        .unwrap();

        assert_eq!(resp.status, RemoteJobStatus::Active);
        assert_eq!(resp.progress, Some(40));
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        let resp: JobStatusResponse =
            serde_json::from_value(json!({ "status": "not_found" })).unwrap();
        assert_eq!(resp.status, RemoteJobStatus::Unknown);
        assert_eq!(resp.progress, None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Polling.is_terminal());
        assert!(!JobStatus::Idle.is_active());
    }
}
