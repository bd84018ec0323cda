//! Data models.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DefaultOnError};

use crate::errors::AisWatchError;
use serde_helpers::*;

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = AisWatchError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 999_999_999 {
            return Err(AisWatchError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = AisWatchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| AisWatchError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Mmsi {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

// Feeds are not consistent about MMSI being a number or a string
impl<'de> Deserialize<'de> for Mmsi {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Mmsi::try_from(n),
            Raw::Text(s) => Mmsi::try_from(s.as_str()),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Latest reported state of one vessel, as served by the feed.
///
/// Only `mmsi` is required. Any other field with an unexpected type or
/// format reads as `None` instead of rejecting the record.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    pub mmsi: Mmsi,
    /// Name of the vessel, None if blank
    #[serde(default, deserialize_with = "deserialize_trimmed_string")]
    pub name: Option<String>,
    /// Latitude in WGS84 decimal degrees
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in WGS84 decimal degrees
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Time of the underlying position report
    #[serde(rename = "msgtime", default, deserialize_with = "deserialize_report_time")]
    pub report_time: Option<DateTime<Utc>>,
    /// Ship type code, None if undefined (0) or not a code
    #[serde(rename = "shipType", default, deserialize_with = "deserialize_ship_type")]
    pub category: Option<u16>,
    #[serde(default, deserialize_with = "deserialize_trimmed_string")]
    pub destination: Option<String>,
    /// Length overall in metres
    #[serde_as(as = "DefaultOnError")]
    #[serde(default, alias = "lengthoverall", alias = "lengthOverall")]
    pub length: Option<f64>,
}

impl VesselRecord {
    pub fn new(mmsi: Mmsi) -> Self {
        Self {
            mmsi,
            name: None,
            latitude: None,
            longitude: None,
            report_time: None,
            category: None,
            destination: None,
            length: None,
        }
    }
}

/// Vessels returned by one fetch, with the instant they were captured.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    pub vessels: Vec<VesselRecord>,
    pub captured_at: DateTime<Utc>,
}

impl FleetSnapshot {
    /// Build a snapshot, dropping repeated MMSIs after their first occurrence
    pub fn new(vessels: Vec<VesselRecord>, captured_at: DateTime<Utc>) -> Self {
        let mut ids = HashSet::with_capacity(vessels.len());
        let vessels = vessels
            .into_iter()
            .filter(|v| {
                let first = ids.insert(v.mmsi);
                if !first {
                    tracing::warn!("Duplicate MMSI {} in feed, keeping first entry", v.mmsi);
                }
                first
            })
            .collect();

        Self {
            vessels,
            captured_at,
        }
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Capture time formatted for display, e.g. `2024-05-01 12:00:00 UTC`
    pub fn last_updated(&self) -> String {
        self.captured_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

/// MMSIs observed so far. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet(HashSet<Mmsi>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, mmsi: &Mmsi) -> bool {
        self.0.contains(mmsi)
    }

    pub fn insert(&mut self, mmsi: Mmsi) -> bool {
        self.0.insert(mmsi)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_superset(&self, other: &SeenSet) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Raw values in ascending order, for storage
    pub fn to_sorted_values(&self) -> Vec<u32> {
        let mut values: Vec<u32> = self.0.iter().map(Mmsi::value).collect();
        values.sort_unstable();
        values
    }
}

impl FromIterator<Mmsi> for SeenSet {
    fn from_iter<I: IntoIterator<Item = Mmsi>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Human-readable label for an AIS ship type code
pub fn category_description(code: Option<u16>) -> &'static str {
    match code {
        Some(20..=29) => "Wing in ground",
        Some(30) => "Fishing",
        Some(31 | 32) => "Towing",
        Some(33) => "Dredging",
        Some(34) => "Diving ops",
        Some(35) => "Military ops",
        Some(36) => "Sailing",
        Some(37) => "Pleasure craft",
        Some(40..=49) => "High speed craft",
        Some(50) => "Pilot vessel",
        Some(51) => "Search and rescue",
        Some(52) => "Tug",
        Some(53) => "Port tender",
        Some(54) => "Anti-pollution",
        Some(55) => "Law enforcement",
        Some(58) => "Medical transport",
        Some(59) => "Noncombatant",
        Some(60..=69) => "Passenger",
        Some(70..=79) => "Cargo",
        Some(80..=89) => "Tanker",
        Some(90..=99) => "Other",
        _ => "Unknown",
    }
}

/// Custom deserializers
///
/// These never fail: a value of the wrong type reads as `None`.
mod serde_helpers {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, de::IgnoredAny, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Integer(u64),
        Text(String),
        Other(IgnoredAny),
    }

    pub fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
    }

    /// Numeric code, possibly sent as a string. Text labels such as
    /// `"Cargo"` carry no code and read as `None`, as does 0.
    pub fn deserialize_ship_type<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = match Loose::deserialize(deserializer)? {
            Loose::Integer(n) => u16::try_from(n).ok(),
            Loose::Text(s) => s.trim().parse::<u16>().ok(),
            Loose::Other(_) => None,
        };
        Ok(code.filter(|v| *v != 0))
    }

    pub fn deserialize_report_time<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Loose::deserialize(deserializer)? {
            Loose::Text(s) => parse_report_time(&s),
            _ => None,
        })
    }

    /// RFC 3339, or a timestamp without offset taken as UTC
    pub fn parse_report_time(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mmsi_bounds() {
        assert!(Mmsi::try_from(999_999_999u32).is_ok());
        assert!(Mmsi::try_from(1_000_000_000u32).is_err());
        assert_eq!(Mmsi::try_from(" 257123450 ").unwrap().value(), 257123450);
        assert!(Mmsi::try_from("abc").is_err());
    }

    #[test]
    fn parse_vessel_record() {
        let s = r#"{
            "mmsi": 257123450,
            "name": " SKANDI OLYMPIA ",
            "latitude": 62.57,
            "longitude": 7.69,
            "msgtime": "2024-05-01T12:00:00+00:00",
            "shipType": 70,
            "destination": "",
            "lengthOverall": 121.5
        }"#;
        let record: VesselRecord = serde_json::from_str(s).unwrap();
        let expected = VesselRecord {
            mmsi: Mmsi::try_from(257123450u32).unwrap(),
            name: Some("SKANDI OLYMPIA".to_string()),
            latitude: Some(62.57),
            longitude: Some(7.69),
            report_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            category: Some(70),
            destination: None,
            length: Some(121.5),
        };

        assert_eq!(record, expected);
    }

    #[test]
    fn parse_vessel_record_nulls() {
        let s = r#"{"mmsi": "259032810", "name": null, "shipType": 0}"#;
        let record: VesselRecord = serde_json::from_str(s).unwrap();

        assert_eq!(record, VesselRecord::new(Mmsi::try_from(259032810u32).unwrap()));
    }

    #[test]
    fn parse_vessel_record_loose_fields() {
        let value = serde_json::json!({
            "mmsi": 123456789,
            "name": 42,
            "latitude": "1.0",
            "longitude": 2.0,
            "msgtime": "2023-01-01T00:00:00",
            "shipType": "Cargo",
            "destination": ["Somewhere"],
            "lengthoverall": 150
        });
        let record = VesselRecord::deserialize(&value).unwrap();

        assert_eq!(record.mmsi.value(), 123456789);
        assert_eq!(record.name, None);
        assert_eq!(record.latitude, None);
        assert_eq!(record.longitude, Some(2.0));
        assert_eq!(
            record.report_time,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(record.category, None);
        assert_eq!(record.destination, None);
        assert_eq!(record.length, Some(150.0));
    }

    #[test]
    fn ship_type_as_numeric_string() {
        let value = serde_json::json!({"mmsi": 1, "shipType": " 30 "});
        assert_eq!(VesselRecord::deserialize(&value).unwrap().category, Some(30));

        let value = serde_json::json!({"mmsi": 1, "shipType": 70000});
        assert_eq!(VesselRecord::deserialize(&value).unwrap().category, None);
    }

    #[test]
    fn report_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_report_time("2024-05-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_report_time("2024-05-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_report_time("2024-05-01T12:00:00.000"), Some(expected));
        assert_eq!(parse_report_time("2024-05-01 12:00:00"), Some(expected));
        assert_eq!(parse_report_time("yesterday"), None);
    }

    #[test]
    fn serialize_uses_feed_field_names() {
        let mut record = VesselRecord::new(Mmsi::try_from(123u32).unwrap());
        record.category = Some(30);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["mmsi"], 123);
        assert_eq!(value["shipType"], 30);
        assert!(value.get("msgtime").is_some());
    }

    #[test]
    fn snapshot_drops_duplicate_ids() {
        let a = VesselRecord::new(Mmsi::try_from(1u32).unwrap());
        let mut b = VesselRecord::new(Mmsi::try_from(1u32).unwrap());
        b.name = Some("LATER".to_string());
        let c = VesselRecord::new(Mmsi::try_from(2u32).unwrap());

        let snapshot = FleetSnapshot::new(vec![a.clone(), b, c.clone()], Utc::now());
        assert_eq!(snapshot.vessels, vec![a, c]);
    }

    #[test]
    fn last_updated_format() {
        let captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 4).unwrap();
        let snapshot = FleetSnapshot::new(Vec::new(), captured_at);
        assert_eq!(snapshot.last_updated(), "2024-05-01 12:03:04 UTC");
    }

    #[test]
    fn category_descriptions() {
        assert_eq!(category_description(Some(30)), "Fishing");
        assert_eq!(category_description(Some(74)), "Cargo");
        assert_eq!(category_description(Some(999)), "Unknown");
        assert_eq!(category_description(None), "Unknown");
    }
}
