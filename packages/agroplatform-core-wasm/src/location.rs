// Initial map viewport from the device location
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::error::ApiError;
use crate::host;
use crate::models::{Notice, Vertex, Viewport};

// Span used around the device position; tight enough to draw a field
const FIELD_SPAN: f64 = 0.005;

// Shown when the device location is unavailable (Bogotá, country-wide span)
pub const FALLBACK_VIEWPORT: Viewport = Viewport {
    latitude: 4.60971,
    longitude: -74.08175,
    latitude_delta: 5.0,
    longitude_delta: 5.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, ApiError>;
    async fn current_position(&self) -> Result<Vertex, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    pub viewport: Viewport,
    pub notice: Option<Notice>,
}

fn centered_on(position: Vertex) -> Viewport {
    Viewport {
        latitude: position.latitude,
        longitude: position.longitude,
        latitude_delta: FIELD_SPAN,
        longitude_delta: FIELD_SPAN,
    }
}

fn fallback(notice: Notice) -> Bootstrap {
    Bootstrap {
        viewport: FALLBACK_VIEWPORT,
        notice: Some(notice),
    }
}

/// Produce the initial viewport for the capture screen. Runs once per
/// activation and always yields a viewport; failures fall back to the
/// default region with a notice.
pub async fn bootstrap_viewport<P: LocationProvider>(provider: &P) -> Bootstrap {
    match provider.request_foreground_permission().await {
        Ok(PermissionStatus::Granted) => {}
        Ok(PermissionStatus::Denied) => {
            log::info!("Location permission denied, using fallback viewport");
            return fallback(Notice::new(
                "Permission denied",
                "Location permission is needed to center the map.",
            ));
        }
        Err(err) => {
            log::warn!("Location permission request failed: {}", err);
            return fallback(position_unavailable());
        }
    }

    match provider.current_position().await {
        Ok(position) => Bootstrap {
            viewport: centered_on(position),
            notice: None,
        },
        Err(err) => {
            log::warn!("Could not read device position: {}", err);
            fallback(position_unavailable())
        }
    }
}

fn position_unavailable() -> Notice {
    Notice::new(
        "Location unavailable",
        "Your position could not be read. Move the map to your parcel.",
    )
}

// Device location through the host helpers
#[derive(Debug, Clone, Copy, Default)]
pub struct JsLocationProvider;

fn location_error(err: JsValue) -> ApiError {
    ApiError::device(
        err.as_string()
            .unwrap_or_else(|| "Location services are unavailable".to_string()),
    )
}

impl LocationProvider for JsLocationProvider {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, ApiError> {
        let promise = host::request_foreground_permission().map_err(location_error)?;
        let status = JsFuture::from(promise).await.map_err(location_error)?;
        Ok(match status.as_string().as_deref() {
            Some("granted") => PermissionStatus::Granted,
            _ => PermissionStatus::Denied,
        })
    }

    async fn current_position(&self) -> Result<Vertex, ApiError> {
        let promise = host::get_current_position().map_err(location_error)?;
        let coords = JsFuture::from(promise).await.map_err(location_error)?;
        serde_wasm_bindgen::from_value(coords)
            .map_err(|e| ApiError::decode(format!("Invalid position: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    struct FakeLocation {
        permission: Result<PermissionStatus, ApiError>,
        position: Result<Vertex, ApiError>,
        position_reads: Cell<u32>,
    }

    impl FakeLocation {
        fn new(permission: Result<PermissionStatus, ApiError>, position: Result<Vertex, ApiError>) -> Self {
            FakeLocation {
                permission,
                position,
                position_reads: Cell::new(0),
            }
        }
    }

    impl LocationProvider for FakeLocation {
        async fn request_foreground_permission(&self) -> Result<PermissionStatus, ApiError> {
            self.permission.clone()
        }

        async fn current_position(&self) -> Result<Vertex, ApiError> {
            self.position_reads.set(self.position_reads.get() + 1);
            self.position.clone()
        }
    }

    #[test]
    fn granted_centers_on_device() {
        let provider = FakeLocation::new(Ok(PermissionStatus::Granted), Ok(Vertex::new(5.07, -75.52)));
        let result = block_on(bootstrap_viewport(&provider));

        assert_eq!(
            result.viewport,
            Viewport {
                latitude: 5.07,
                longitude: -75.52,
                latitude_delta: 0.005,
                longitude_delta: 0.005,
            }
        );
        assert_eq!(result.notice, None);
    }

    #[test]
    fn denied_uses_fallback_without_reading_position() {
        let provider = FakeLocation::new(Ok(PermissionStatus::Denied), Ok(Vertex::new(5.07, -75.52)));
        let result = block_on(bootstrap_viewport(&provider));

        assert_eq!(
            result.viewport,
            Viewport {
                latitude: 4.60971,
                longitude: -74.08175,
                latitude_delta: 5.0,
                longitude_delta: 5.0,
            }
        );
        assert_eq!(result.notice.map(|n| n.title), Some("Permission denied".to_string()));
        assert_eq!(provider.position_reads.get(), 0);
    }

    #[test]
    fn failed_position_read_falls_back() {
        let provider = FakeLocation::new(
            Ok(PermissionStatus::Granted),
            Err(ApiError::device("timeout")),
        );
        let result = block_on(bootstrap_viewport(&provider));

        assert_eq!(result.viewport, FALLBACK_VIEWPORT);
        assert!(result.notice.is_some());
        assert_eq!(provider.position_reads.get(), 1);
    }

    #[test]
    fn bootstrap_serializes_camel_case_viewport() {
        let provider = FakeLocation::new(Ok(PermissionStatus::Denied), Ok(Vertex::new(0.0, 0.0)));
        let json = serde_json::to_value(block_on(bootstrap_viewport(&provider))).unwrap();
        assert_eq!(json["viewport"]["latitudeDelta"], 5.0);
        assert_eq!(json["notice"]["title"], "Permission denied");
    }
}
