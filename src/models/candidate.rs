use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Placeholder shown when a venue has no phone number
pub const MISSING_PHONE: &str = "전화번호 없음";

/// Category used when neither a category path nor a group name is known
pub const MISSING_CATEGORY: &str = "음식점";

/// A venue eligible for recommendation or display
///
/// `id` is only present for saved venues; search-derived candidates carry a
/// `source_url` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
    pub category: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

// ============================================================================
// Backend REST Types
// ============================================================================

/// Saved venue as returned by `GET /api/restaurants/`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedVenue {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub phone: String,
}

impl From<SavedVenue> for Candidate {
    fn from(venue: SavedVenue) -> Self {
        Candidate {
            id: Some(venue.id),
            name: venue.name,
            address: venue.address,
            coordinate: Coordinate::new(venue.latitude, venue.longitude),
            category: non_empty(venue.category).unwrap_or_else(|| MISSING_CATEGORY.to_string()),
            phone: non_empty(venue.phone).unwrap_or_else(|| MISSING_PHONE.to_string()),
            distance_meters: None,
            source_url: None,
        }
    }
}

// ============================================================================
// Place Search Types
// ============================================================================

/// A place search record before validation
///
/// Search backends disagree on naming and on whether coordinates are strings
/// or numbers; the aliases accept both the Kakao shape (`place_name`, `x`, `y`)
/// and the saved-venue shape (`Name`, `Longitude`, `Latitude`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlace {
    #[serde(alias = "Name")]
    pub place_name: String,
    #[serde(default, alias = "Address")]
    pub address_name: Option<String>,
    #[serde(default)]
    pub road_address_name: Option<String>,
    #[serde(alias = "Longitude")]
    pub x: LooseNumber,
    #[serde(alias = "Latitude")]
    pub y: LooseNumber,
    #[serde(default, alias = "Category")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub category_group_name: Option<String>,
    #[serde(default, alias = "Phone")]
    pub phone: Option<String>,
    #[serde(default)]
    pub place_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl RawPlace {
    /// Converts the record into a candidate, or `None` if its position is unusable
    pub fn into_candidate(self) -> Option<Candidate> {
        let coordinate = Coordinate::new(self.y.as_f64()?, self.x.as_f64()?);
        if !coordinate.is_valid() {
            return None;
        }

        let name = non_empty(self.place_name)?;
        let address = self
            .address_name
            .and_then(non_empty)
            .or_else(|| self.road_address_name.and_then(non_empty))
            .unwrap_or_default();
        let category = self
            .category_name
            .and_then(non_empty)
            .or_else(|| self.category_group_name.and_then(non_empty))
            .unwrap_or_else(|| MISSING_CATEGORY.to_string());
        let phone = self
            .phone
            .and_then(non_empty)
            .unwrap_or_else(|| MISSING_PHONE.to_string());

        Some(Candidate {
            id: None,
            name,
            address,
            coordinate,
            category,
            phone,
            distance_meters: None,
            source_url: self.place_url.and_then(non_empty),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kakao_document_normalization() {
        let json = r#"{
            "id": "26338954",
            "place_name": "을지면옥",
            "category_name": "음식점 > 한식 > 냉면",
            "category_group_code": "FD6",
            "category_group_name": "음식점",
            "phone": "02-2266-7052",
            "address_name": "서울 중구 입정동 177",
            "road_address_name": "서울 중구 충무로14길 2-1",
            "x": "126.99164",
            "y": "37.56629",
            "place_url": "http://place.map.kakao.com/26338954",
            "distance": "1146"
        }"#;

        let raw: RawPlace = serde_json::from_str(json).unwrap();
        let candidate = raw.into_candidate().unwrap();

        assert_eq!(candidate.id, None);
        assert_eq!(candidate.name, "을지면옥");
        assert_eq!(candidate.address, "서울 중구 입정동 177");
        assert_eq!(candidate.category, "음식점 > 한식 > 냉면");
        assert_eq!(candidate.phone, "02-2266-7052");
        assert_eq!(candidate.coordinate, Coordinate::new(37.56629, 126.99164));
        assert_eq!(
            candidate.source_url.as_deref(),
            Some("http://place.map.kakao.com/26338954")
        );
    }

    #[test]
    fn test_missing_fields_are_filled() {
        let json = r#"{
            "place_name": "골목식당",
            "address_name": "",
            "road_address_name": "서울 종로구 대학로 1",
            "category_group_name": "음식점",
            "phone": "",
            "x": 126.99,
            "y": 37.58
        }"#;

        let candidate = serde_json::from_str::<RawPlace>(json)
            .unwrap()
            .into_candidate()
            .unwrap();

        assert_eq!(candidate.address, "서울 종로구 대학로 1");
        assert_eq!(candidate.category, "음식점");
        assert_eq!(candidate.phone, MISSING_PHONE);
        assert_eq!(candidate.source_url, None);
    }

    #[test]
    fn test_saved_shape_is_accepted() {
        let json = r#"{
            "Name": "Blue Bottle",
            "Address": "Seoul",
            "Latitude": 37.5,
            "Longitude": 127.0,
            "Category": "cafe",
            "Phone": "010"
        }"#;

        let candidate = serde_json::from_str::<RawPlace>(json)
            .unwrap()
            .into_candidate()
            .unwrap();
        assert_eq!(candidate.coordinate, Coordinate::new(37.5, 127.0));
        assert_eq!(candidate.category, "cafe");
    }

    #[test]
    fn test_unparseable_coordinates_are_rejected() {
        let json = r#"{"place_name": "Nowhere", "x": "abc", "y": "37.5"}"#;
        let raw: RawPlace = serde_json::from_str(json).unwrap();
        assert!(raw.into_candidate().is_none());

        let json = r#"{"place_name": "Off the map", "x": "200.0", "y": "37.5"}"#;
        let raw: RawPlace = serde_json::from_str(json).unwrap();
        assert!(raw.into_candidate().is_none());
    }

    #[test]
    fn test_saved_venue_conversion() {
        let json = r#"{
            "ID": 7,
            "CreatedAt": "2024-05-01T12:00:00Z",
            "UpdatedAt": "2024-05-01T12:00:00Z",
            "DeletedAt": null,
            "Name": "Sundubu House",
            "Address": "Mapo-gu",
            "Latitude": 37.55,
            "Longitude": 126.92,
            "Category": "",
            "Phone": "",
            "Reviews": null,
            "Bookmarks": null
        }"#;

        let venue: SavedVenue = serde_json::from_str(json).unwrap();
        let candidate = Candidate::from(venue);
        assert_eq!(candidate.id, Some(7));
        assert_eq!(candidate.category, MISSING_CATEGORY);
        assert_eq!(candidate.phone, MISSING_PHONE);
        assert_eq!(candidate.distance_meters, None);
    }
}
