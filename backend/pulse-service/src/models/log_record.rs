use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

/// Application log line streamed to connected dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Text frame written to each subscriber
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_record_deserialization() {
        let json = r#"{
            "level": "warning",
            "message": "slow query",
            "timestamp": "2024-05-01T10:15:00Z",
            "source": "checkout-api"
        }"#;

        let record: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.level, LogLevel::Warn);
        assert_eq!(record.message, "slow query");
        assert_eq!(record.source, "checkout-api");
    }

    #[test]
    fn test_shape_is_validated() {
        // missing source
        let json = r#"{"level": "info", "message": "m", "timestamp": "2024-05-01T10:15:00Z"}"#;
        assert!(serde_json::from_str::<LogRecord>(json).is_err());

        let json = r#"{"level": "loud", "message": "m", "timestamp": "2024-05-01T10:15:00Z", "source": "s"}"#;
        assert!(serde_json::from_str::<LogRecord>(json).is_err());
    }

    #[test]
    fn test_frame_is_json_of_record() {
        let record = LogRecord::new(LogLevel::Error, "payment declined", "payments");
        let frame = record.to_frame().unwrap();

        let decoded: LogRecord = serde_json::from_str(&frame).unwrap();
        assert_eq!(decoded, record);
        assert!(frame.contains(r#""level":"error""#));
    }
}
