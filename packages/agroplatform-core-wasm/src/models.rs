// This is the models module containing shared data structures
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// A tapped map coordinate. Order matters: the sequence defines the winding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub latitude: f64,
    pub longitude: f64,
}

impl Vertex {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Vertex { latitude, longitude }
    }
}

// Initial map region handed to the host map surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// User-facing message the host shows as an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: &str, message: &str) -> Self {
        Notice {
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

/// Output of the geometry finalizer, consumed by the attribute form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelGeometryResult {
    pub geometry: String, // GeoJSON Polygon text
    pub area: f64,        // Hectares, 4 decimals
    pub location: String, // "lat,lon" of the center of mass
}

// Body of POST /parcels/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelCreate {
    pub name: String,
    pub location: String,
    pub area: f64,
    pub geometry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planting_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irrigation_type: Option<String>,
}

// Body of PUT /parcels/{id}; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planting_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irrigation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_issues: Option<String>,
}

// Parcel resource as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub area: f64,
    #[serde(default)]
    pub geometry: Option<String>,
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub development_stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub planting_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub soil_ph: Option<f64>,
    #[serde(default)]
    pub irrigation_type: Option<String>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub current_issues: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

// The backend emits naive timestamps for some columns; treat them as UTC.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

// Response of /auth/login and /auth/register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// Body of /auth/login
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// Body of /auth/register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The signed-in user, derived from the access token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_create_omits_unset_optionals() {
        let payload = ParcelCreate {
            name: "Lote 1".to_string(),
            location: "0.5,0.5".to_string(),
            area: 1.25,
            geometry: "{}".to_string(),
            crop_type: None,
            development_stage: None,
            planting_date: None,
            soil_type: Some("franco".to_string()),
            soil_ph: None,
            irrigation_type: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert_eq!(object["soil_type"], "franco");
        assert!(!object.contains_key("crop_type"));
    }

    #[test]
    fn parcel_accepts_naive_backend_timestamps() {
        let body = r#"{
            "id": 7, "owner_id": 2, "name": "Norte", "area": 3.5,
            "location": "4.6,-74.0", "geometry": null,
            "created_at": "2025-03-01T10:15:00.123456",
            "updated_at": "2025-03-02T08:00:00Z"
        }"#;

        let parcel: Parcel = serde_json::from_str(body).unwrap();
        assert_eq!(parcel.id, 7);
        assert!(parcel.created_at.is_some());
        assert!(parcel.updated_at.is_some());
        assert_eq!(parcel.crop_type, None);
    }

    #[test]
    fn viewport_uses_map_surface_field_names() {
        let viewport = Viewport {
            latitude: 1.0,
            longitude: 2.0,
            latitude_delta: 0.005,
            longitude_delta: 0.005,
        };
        let json = serde_json::to_value(viewport).unwrap();
        assert!(json.get("latitudeDelta").is_some());
        assert!(json.get("longitudeDelta").is_some());
    }
}
