use log::LevelFilter;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

// Console logging backend for the `log` facade
pub mod console;
// Host effects (fetch, secure storage, location)
mod host;
// Shared data structures
pub mod models;
pub mod error;
pub mod config;
// Polygon drawing state machine
pub mod capture;
// Ring closing, area and centroid
pub mod polygon_geometry;
// Initial map viewport
pub mod location;
// Multi-step parcel attribute form
pub mod parcel_form;
pub mod http_client;
pub mod credentials;
pub mod session;
pub mod parcels;
// JS handles for the client, session and form
mod app_client;

pub use app_client::{AgroClient, ParcelWizard};
pub use capture::ParcelCapture;

use parcel_form::ChoiceOption;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console::init(LevelFilter::Info);
        log::info!("WASM module initialized successfully");
    });
}

// Accepts "error", "warn", "info", "debug" or "trace"
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter: LevelFilter = level
        .parse()
        .map_err(|_| JsValue::from_str(&format!("Unknown log level: {}", level)))?;
    console::init(filter);
    Ok(())
}

#[derive(Serialize)]
struct FormOptions {
    crops: &'static [ChoiceOption],
    stages: &'static [ChoiceOption],
    soils: &'static [ChoiceOption],
    irrigation: &'static [ChoiceOption],
}

// Picker options for the attribute form
#[wasm_bindgen(js_name = parcelFormOptions)]
pub fn parcel_form_options() -> Result<JsValue, JsValue> {
    let options = FormOptions {
        crops: parcel_form::CROP_OPTIONS,
        stages: parcel_form::STAGE_OPTIONS,
        soils: parcel_form::SOIL_OPTIONS,
        irrigation: parcel_form::IRRIGATION_OPTIONS,
    };
    Ok(to_value(&options)?)
}

// Live area for an arbitrary vertex list, e.g. when editing a stored parcel
#[wasm_bindgen(js_name = polygonAreaHectares)]
pub fn polygon_area_hectares(vertices: JsValue) -> Result<f64, JsValue> {
    let vertices: Vec<models::Vertex> = serde_wasm_bindgen::from_value(vertices)?;
    Ok(polygon_geometry::area_hectares(&vertices))
}
