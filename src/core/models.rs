use crate::core::error::RefreshError;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_INTERVAL_MINUTES: i64 = 5;
pub const NOTIFICATION_TITLE: &str = "New cat is ready!";
pub const NOTIFICATION_BODY: &str = "Open the app to see the latest cat picture.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatPayload {
    #[serde(default)]
    pub id: String,
    pub url: String,
    pub created_at: String,
    #[serde(default)]
    pub cached_path: String,
}

impl CatPayload {
    pub fn new(
        id: String,
        url: String,
        created_at: DateTime<FixedOffset>,
        cached_path: &Path,
    ) -> Self {
        Self {
            id,
            url,
            created_at: format_timestamp(created_at),
            cached_path: cached_path.to_string_lossy().to_string(),
        }
    }

    /// `None` when `created_at` is not a timestamp we understand, which
    /// callers treat as a stale cache.
    pub fn created_at_instant(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.created_at)
    }
}

pub fn format_timestamp(at: DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    // Offset-less values are taken as local wall-clock time.
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.fixed_offset())
}

/// Minutes between refreshes. Never below one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefreshInterval(u32);

impl RefreshInterval {
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.clamp(1, u32::MAX as i64) as u32)
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.0))
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_INTERVAL_MINUTES)
    }
}

impl std::fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshNotice {
    pub title: String,
    pub body: String,
}

impl Default for RefreshNotice {
    fn default() -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: NOTIFICATION_BODY.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Skipped,
    Refreshed {
        payload: CatPayload,
        notice: RefreshNotice,
    },
    Failed(RefreshError),
}

impl Outcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Outcome::Refreshed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped => "skipped",
            Outcome::Refreshed { .. } => "refreshed",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn fixed(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn test_payload_serialization_roundtrip() {
        let created = fixed("2026-10-16T09:41:07.250+02:00");
        let payload = CatPayload::new(
            "abc123".to_string(),
            "https://cataas.com/cat/abc123.png".to_string(),
            created,
            Path::new("/var/lib/meow/cats/cat_1791012067250.png"),
        );

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"cachedPath\""));

        let deserialized: CatPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, payload);
        assert_eq!(deserialized.created_at_instant(), Some(created));
    }

    #[test]
    fn test_payload_missing_id_defaults_to_empty() {
        let json = r#"{"url":"https://cataas.com/cat/1","createdAt":"2026-10-16T09:00:00Z","cachedPath":"/tmp/a.jpg"}"#;
        let payload: CatPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.id, "");
    }

    #[test]
    fn test_format_keeps_offset_and_millis() {
        let at = fixed("2026-10-16T09:41:07.250-05:00");
        assert_eq!(format_timestamp(at), "2026-10-16T09:41:07.250-05:00");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2026-10-16T09:41:07Z").is_some());
        assert!(parse_timestamp("2026-10-16T09:41:07.123456+01:00").is_some());

        let naive = parse_timestamp("2026-10-16T09:41:07.500").unwrap();
        assert_eq!(naive.hour(), 9);
        assert_eq!(naive.minute(), 41);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_interval_is_clamped_to_one_minute() {
        assert_eq!(RefreshInterval::from_minutes(0).minutes(), 1);
        assert_eq!(RefreshInterval::from_minutes(-12).minutes(), 1);
        assert_eq!(RefreshInterval::from_minutes(15).minutes(), 15);
        assert_eq!(RefreshInterval::default().minutes(), 5);
        assert_eq!(
            RefreshInterval::from_minutes(2).as_duration(),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Skipped.label(), "skipped");
        assert!(!Outcome::Skipped.is_refreshed());
        let failed = Outcome::Failed(RefreshError::DownloadFailed("404".to_string()));
        assert_eq!(failed.label(), "failed");
    }
}
