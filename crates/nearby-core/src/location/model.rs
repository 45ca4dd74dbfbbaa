//! Location domain models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A single position sample produced by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub point: GeoPoint,
    /// Horizontal accuracy radius in metres, when the platform reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    /// Device clock at capture time.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            point: GeoPoint::new(latitude, longitude),
            accuracy_m: None,
            timestamp,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Profile fields copied onto the location record when sharing is enabled.
///
/// The copy is not refreshed when the live profile changes later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub display_name: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// The shared, per-user location document. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub position: GeoPoint,
    /// Timestamp of the position sample, not of the write.
    pub last_updated: DateTime<Utc>,
    /// Absent or false removes the user from every proximity feed.
    #[serde(default)]
    pub is_sharing: bool,
}

impl LocationRecord {
    /// Builds the record written for one position sample. A write is itself
    /// evidence of active sharing, so `is_sharing` is always true here.
    pub fn from_sample(user_id: &str, profile: &ProfileSnapshot, position: &Position) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: profile.display_name.clone(),
            college: profile.college.clone(),
            skills: profile.skills.clone(),
            interests: profile.interests.clone(),
            verified: profile.verified,
            photo_url: profile.photo_url.clone(),
            position: position.point,
            last_updated: position.timestamp,
            is_sharing: true,
        }
    }

    /// The denormalized profile fields carried by this record.
    pub fn profile(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            display_name: self.display_name.clone(),
            college: self.college.clone(),
            skills: self.skills.clone(),
            interests: self.interests.clone(),
            verified: self.verified,
            photo_url: self.photo_url.clone(),
        }
    }
}

/// A feed entry: a record plus its distance from one particular viewer.
///
/// The distance is relative to the observer and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCreator {
    #[serde(flatten)]
    pub record: LocationRecord,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile() -> ProfileSnapshot {
        ProfileSnapshot {
            display_name: "Ana".to_string(),
            college: "Design School".to_string(),
            skills: ["video".to_string()].into_iter().collect(),
            interests: BTreeSet::new(),
            verified: true,
            photo_url: None,
        }
    }

    #[test]
    fn test_from_sample_sets_sharing_and_sample_time() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = LocationRecord::from_sample("u1", &profile(), &Position::new(37.0, -122.0, ts));

        assert!(record.is_sharing);
        assert_eq!(record.last_updated, ts);
        assert_eq!(record.position, GeoPoint::new(37.0, -122.0));
        assert_eq!(record.profile(), profile());
    }

    #[test]
    fn test_document_field_names() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = LocationRecord::from_sample("u1", &profile(), &Position::new(37.0, -122.0, ts));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["userId"], "u1");
        assert_eq!(value["isSharing"], true);
        assert_eq!(value["position"]["latitude"], 37.0);
        assert!(value.get("photoUrl").is_none());
    }

    #[test]
    fn test_missing_is_sharing_reads_as_false() {
        let value = serde_json::json!({
            "userId": "u2",
            "displayName": "Bo",
            "position": { "latitude": 1.0, "longitude": 2.0 },
            "lastUpdated": "2024-05-01T12:00:00Z"
        });
        let record: LocationRecord = serde_json::from_value(value).unwrap();
        assert!(!record.is_sharing);
    }

    #[test]
    fn test_missing_display_name_reads_as_empty() {
        let value = serde_json::json!({
            "userId": "u3",
            "position": { "latitude": 1.0, "longitude": 2.0 },
            "lastUpdated": "2024-05-01T12:00:00Z",
            "isSharing": true
        });
        let record: LocationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.display_name, "");
        assert!(record.is_sharing);
    }
}
