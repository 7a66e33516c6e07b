use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical geographic location value object.
///
/// Any store-native geographic representation is normalized into this at
/// the store boundary; core logic never sees anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are in range (lat ±90, lon ±180).
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
}

impl Default for Species {
    fn default() -> Self {
        Self::Dog
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dog => write!(f, "dog"),
            Self::Cat => write!(f, "cat"),
        }
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dog" => Ok(Self::Dog),
            "cat" => Ok(Self::Cat),
            other => Err(format!("unknown species: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Default for Sex {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Camera angle tag for a profile photo. `Face` designates the single
/// canonical/biometric photo the identity embedding derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoAngle {
    Face,
    LeftSide,
    RightSide,
    Front,
    Back,
}

impl fmt::Display for PhotoAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Face => write!(f, "face"),
            Self::LeftSide => write!(f, "left_side"),
            Self::RightSide => write!(f, "right_side"),
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

impl FromStr for PhotoAngle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" => Ok(Self::Face),
            "left_side" => Ok(Self::LeftSide),
            "right_side" => Ok(Self::RightSide),
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            other => Err(format!("unknown photo angle: {other}")),
        }
    }
}

/// Descriptive intake attributes for a profile. All optional in practice;
/// none of these participate in matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileAttrs {
    #[serde(default)]
    pub species: Species,

    #[serde(default)]
    pub sex: Sex,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub breed: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color_description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub distinguishing_features: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_age_months: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_found: Option<GeoPoint>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub microchip_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collar_tag_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clinic_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// The matching-relevant subset of a profile, kept separate from the
/// descriptive attributes because it is the only part the engine governs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Biometrics {
    /// Identity embedding derived from the canonical photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    /// True iff `embedding` is present. Mirrored into a query-layer index
    /// so candidate listing never scans unembedded profiles.
    #[serde(default)]
    pub has_embedding: bool,

    /// The single designated biometric photo, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_photo_id: Option<String>,
}

/// Lightweight log entry appended when a field worker confirms a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
}

/// Identity record for a registered animal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    /// Globally unique, monotonically increasing, human-facing number.
    pub number: u64,

    pub name: String,

    #[serde(default)]
    pub attrs: ProfileAttrs,

    /// Always equals the number of attached photo records.
    #[serde(default)]
    pub photo_count: u32,

    #[serde(default)]
    pub biometrics: Biometrics,

    /// Append-only confirmation log.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sightings: Vec<SightingEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_location: Option<GeoPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a profile.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    /// Display name; derived from the sequence number when absent.
    pub name: Option<String>,
    pub attrs: ProfileAttrs,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub species: Option<Species>,
    pub sex: Option<Sex>,
    pub breed: Option<String>,
    pub color_description: Option<String>,
    pub distinguishing_features: Option<String>,
    pub estimated_age_months: Option<u32>,
    pub location_found: Option<GeoPoint>,
    pub notes: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.species.is_none()
            && self.sex.is_none()
            && self.breed.is_none()
            && self.color_description.is_none()
            && self.distinguishing_features.is_none()
            && self.estimated_age_months.is_none()
            && self.location_found.is_none()
            && self.notes.is_none()
    }
}

/// Metadata record for one stored photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoMeta {
    pub id: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<PhotoAngle>,
}

impl PhotoMeta {
    /// Mint a metadata record for a freshly stored photo.
    pub fn new(storage_path: &str, angle: Option<PhotoAngle>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            storage_path: storage_path.to_string(),
            uploaded_at: Utc::now(),
            angle,
        }
    }
}

/// Matching status of a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SightingStatus {
    /// No embedding has been obtained yet.
    Pending,
    /// An embedding exists and matching is underway.
    Processing,
    /// Matching produced at least one candidate.
    Matched,
    /// Matching ran and produced zero qualifying candidates.
    NoMatch,
}

impl fmt::Display for SightingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Matched => write!(f, "matched"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

impl FromStr for SightingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "matched" => Ok(Self::Matched),
            "no_match" => Ok(Self::NoMatch),
            other => Err(format!("unknown sighting status: {other}")),
        }
    }
}

/// One matching attempt, possibly multi-photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
    pub id: String,

    pub photo_paths: Vec<String>,

    pub location: GeoPoint,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Aggregated embedding over the sighting's photos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    pub status: SightingStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a sighting.
#[derive(Debug, Clone, Default)]
pub struct NewSighting {
    pub location: GeoPoint,
    pub notes: String,
    pub tags: Vec<String>,
}

/// Human feedback status on a match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// One ranked candidate in a match result. Scores are rounded to four
/// decimal digits at this boundary; internal ranking keeps full precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub sighting_id: String,
    pub score: f32,
}

/// Match outcome for a sighting, keyed 1:1 by sighting id.
///
/// Only created when matching yields at least one candidate; for the
/// zero-candidate case, the absence of this record is the signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub sighting_id: String,

    /// Sorted by score descending.
    pub candidates: Vec<MatchCandidate>,

    pub status: MatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_profile_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque resume token; `None` when no records remain.
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_validation() {
        assert!(GeoPoint::new(12.97, 77.59).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.5, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn status_string_round_trip() {
        for s in [
            SightingStatus::Pending,
            SightingStatus::Processing,
            SightingStatus::Matched,
            SightingStatus::NoMatch,
        ] {
            assert_eq!(s.to_string().parse::<SightingStatus>().unwrap(), s);
        }
        assert_eq!(SightingStatus::NoMatch.to_string(), "no_match");
        assert!("bogus".parse::<SightingStatus>().is_err());
    }

    #[test]
    fn photo_angle_round_trip() {
        for a in [
            PhotoAngle::Face,
            PhotoAngle::LeftSide,
            PhotoAngle::RightSide,
            PhotoAngle::Front,
            PhotoAngle::Back,
        ] {
            assert_eq!(a.to_string().parse::<PhotoAngle>().unwrap(), a);
        }
    }

    #[test]
    fn profile_update_emptiness() {
        assert!(ProfileUpdate::default().is_empty());
        let upd = ProfileUpdate {
            breed: Some("indie".to_string()),
            ..Default::default()
        };
        assert!(!upd.is_empty());
    }
}
