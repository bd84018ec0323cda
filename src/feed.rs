//! Vessel position feed client

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::FeedConfig,
    errors::{AisWatchError, FetchError},
    models::{FleetSnapshot, VesselRecord},
};

/// Field of the feed response holding the vessel records
const COLLECTION_FIELD: &str = "features";

/// Client for `GET {api_base}/ships`
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    ships_url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self, AisWatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.ships_url()?))
    }

    pub fn with_client(client: reqwest::Client, ships_url: String) -> Self {
        Self { client, ships_url }
    }

    /// Fetch one fleet snapshot. No retries are made.
    pub async fn fetch(&self) -> Result<FleetSnapshot, FetchError> {
        debug!("Fetching fleet from {}", self.ships_url);
        let resp = self.client.get(&self.ships_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = resp.bytes().await?;
        parse_feed(&body, Utc::now())
    }
}

/// Parse a feed response body into a snapshot
///
/// The body must be JSON. Anything other than an object with an array
/// under `features` is read as an empty fleet. Entries without a valid
/// `mmsi` are skipped; other malformed fields read as absent.
pub fn parse_feed(body: &[u8], captured_at: DateTime<Utc>) -> Result<FleetSnapshot, FetchError> {
    let value: Value = serde_json::from_slice(body)?;

    let entries: &[Value] = match value.get(COLLECTION_FIELD) {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            warn!("Unexpected type for '{}': {}", COLLECTION_FIELD, type_name(other));
            &[]
        }
    };

    let vessels = entries
        .iter()
        .filter_map(|entry| match VesselRecord::deserialize(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping invalid vessel record: {}", e);
                None
            }
        })
        .collect();

    Ok(FleetSnapshot::new(vessels, captured_at))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mmsi;

    fn parse(body: &str) -> Result<FleetSnapshot, FetchError> {
        parse_feed(body.as_bytes(), Utc::now())
    }

    #[test]
    fn parse_features() {
        let body = r#"{
            "count": 2,
            "area_km2": 41.2,
            "features": [
                {"mmsi": 257123450, "name": "RAUMA", "latitude": 62.57, "longitude": 7.69,
                 "msgtime": "2024-05-01T12:00:00+00:00", "shipType": 70},
                {"mmsi": 258000002, "name": null, "latitude": 62.6, "longitude": 7.7,
                 "msgtime": "2024-05-01T12:01:00+00:00", "shipType": 30}
            ]
        }"#;

        let snapshot = parse(body).unwrap();
        let ids: Vec<u32> = snapshot.vessels.iter().map(|v| v.mmsi.value()).collect();
        assert_eq!(ids, vec![257123450, 258000002]);
        assert_eq!(snapshot.vessels[0].name.as_deref(), Some("RAUMA"));
    }

    #[test]
    fn missing_collection_is_empty() {
        assert!(parse(r#"{"count": 0}"#).unwrap().is_empty());
        assert!(parse(r#"{"features": null}"#).unwrap().is_empty());
        assert!(parse(r#"{"features": "oops"}"#).unwrap().is_empty());
        assert!(parse(r#"[{"mmsi": 1}]"#).unwrap().is_empty());
        assert!(parse("42").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(matches!(parse("<html>"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn records_without_valid_mmsi_are_skipped() {
        let body = r#"{"features": [
            {"name": "NO MMSI"},
            {"mmsi": 1234567890},
            {"mmsi": "abc"},
            "not a record",
            {"mmsi": 257000001}
        ]}"#;

        let snapshot = parse(body).unwrap();
        assert_eq!(snapshot.vessels, vec![VesselRecord::new(Mmsi::try_from(257000001u32).unwrap())]);
    }

    #[test]
    fn odd_fields_keep_the_vessel() {
        let body = r#"{"features": [
            {"mmsi": 123456789, "name": "Test Ship", "latitude": 1.0, "longitude": 2.0,
             "msgtime": "2023-01-01T00:00:00Z", "shipType": "Cargo",
             "destination": "Somewhere", "lengthoverall": 150},
            {"mmsi": 123456, "msgtime": "yesterday", "latitude": "north"},
            {"mmsi": 234567, "msgtime": "2023-01-01T00:00:00"}
        ]}"#;

        let snapshot = parse(body).unwrap();
        assert_eq!(snapshot.len(), 3);

        let first = &snapshot.vessels[0];
        assert_eq!(first.name.as_deref(), Some("Test Ship"));
        assert_eq!(first.destination.as_deref(), Some("Somewhere"));
        assert_eq!(first.length, Some(150.0));
        assert_eq!(first.category, None);
        assert!(first.report_time.is_some());

        assert_eq!(snapshot.vessels[1].report_time, None);
        assert_eq!(snapshot.vessels[1].latitude, None);
        assert!(snapshot.vessels[2].report_time.is_some());
    }
}
