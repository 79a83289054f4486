use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

use crate::error::CaptureError;
use crate::models::{Notice, ParcelGeometryResult, Vertex};
use crate::polygon_geometry::{self, MIN_POLYGON_VERTICES};

// Vertices needed before the host draws the polygon overlay
const MIN_OVERLAY_VERTICES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Idle,
    Drawing,
}

// Snapshot of the drawing session for the map surface and controls
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureView {
    pub mode: CaptureMode,
    pub vertices: Vec<Vertex>,
    pub area_hectares: f64,
    pub point_count: usize,
    pub can_undo: bool,
    pub can_save: bool,
    pub show_polygon: bool,
    pub status: String,
}

/// Interactive polygon drawing session.
///
/// Two modes: `Idle` and `Drawing`. Taps only land while drawing, undo works
/// in both modes, and the area is rederived after every change to the
/// vertex list. The vertex list is always kept open; the ring is closed only
/// when computing area or finalizing.
#[derive(Debug, Clone)]
pub struct CaptureController {
    mode: CaptureMode,
    vertices: Vec<Vertex>,
    area_hectares: f64,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureController {
    pub fn new() -> Self {
        CaptureController {
            mode: CaptureMode::Idle,
            vertices: Vec::new(),
            area_hectares: 0.0,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn area_hectares(&self) -> f64 {
        self.area_hectares
    }

    // Idle -> Drawing. Any previous drawing is discarded.
    pub fn start(&mut self) -> Notice {
        self.vertices.clear();
        self.mode = CaptureMode::Drawing;
        self.recompute_area();
        log::debug!("Polygon drawing started");
        Notice::new("Drawing mode", "Tap the map to add the vertices of your parcel.")
    }

    /// Append a tapped coordinate. Returns false when not drawing.
    pub fn tap(&mut self, vertex: Vertex) -> bool {
        if self.mode != CaptureMode::Drawing {
            return false;
        }
        self.vertices.push(vertex);
        self.recompute_area();
        true
    }

    // Drawing -> Idle, guarded by the vertex minimum
    pub fn finish(&mut self) -> Result<Notice, CaptureError> {
        if self.vertices.len() < MIN_POLYGON_VERTICES {
            return Err(CaptureError::NotEnoughVertices {
                count: self.vertices.len(),
            });
        }
        self.mode = CaptureMode::Idle;
        log::debug!(
            "Polygon drawing finished with {} vertices, {:.4} ha",
            self.vertices.len(),
            self.area_hectares
        );
        Ok(Notice::new(
            "Drawing finished",
            "Now you can name and save your parcel.",
        ))
    }

    pub fn undo(&mut self) -> Option<Vertex> {
        let removed = self.vertices.pop();
        if removed.is_some() {
            self.recompute_area();
        }
        removed
    }

    pub fn can_save(&self) -> bool {
        self.mode == CaptureMode::Idle && self.vertices.len() >= MIN_POLYGON_VERTICES
    }

    /// Finalize the drawn polygon for the attribute form.
    pub fn save(&self) -> Result<ParcelGeometryResult, CaptureError> {
        if self.mode == CaptureMode::Drawing {
            return Err(CaptureError::StillDrawing);
        }
        if self.vertices.len() < MIN_POLYGON_VERTICES {
            return Err(CaptureError::NotEnoughVertices {
                count: self.vertices.len(),
            });
        }
        Ok(polygon_geometry::finalize(&self.vertices, self.area_hectares)?)
    }

    pub fn view(&self) -> CaptureView {
        CaptureView {
            mode: self.mode,
            vertices: self.vertices.clone(),
            area_hectares: self.area_hectares,
            point_count: self.vertices.len(),
            can_undo: !self.vertices.is_empty(),
            can_save: self.can_save(),
            show_polygon: self.vertices.len() >= MIN_OVERLAY_VERTICES,
            status: format!(
                "Points: {} | Area: {:.4} ha",
                self.vertices.len(),
                self.area_hectares
            ),
        }
    }

    fn recompute_area(&mut self) {
        self.area_hectares = polygon_geometry::area_hectares(&self.vertices);
    }
}

// Drawing session handle owned by the capture screen.
// Dropping it on unmount discards the session.
#[wasm_bindgen]
pub struct ParcelCapture {
    controller: CaptureController,
}

#[wasm_bindgen]
impl ParcelCapture {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ParcelCapture {
        ParcelCapture {
            controller: CaptureController::new(),
        }
    }

    #[wasm_bindgen(js_name = startDrawing)]
    pub fn start_drawing(&mut self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.controller.start())?)
    }

    #[wasm_bindgen(js_name = handleMapPress)]
    pub fn handle_map_press(&mut self, latitude: f64, longitude: f64) -> bool {
        self.controller.tap(Vertex::new(latitude, longitude))
    }

    #[wasm_bindgen(js_name = finishDrawing)]
    pub fn finish_drawing(&mut self) -> Result<JsValue, JsValue> {
        let notice = self.controller.finish()?;
        Ok(to_value(&notice)?)
    }

    pub fn undo(&mut self) -> bool {
        self.controller.undo().is_some()
    }

    pub fn save(&self) -> Result<JsValue, JsValue> {
        let geometry = self.controller.save()?;
        Ok(to_value(&geometry)?)
    }

    pub fn view(&self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.controller.view())?)
    }
}

impl Default for ParcelCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vertex> {
        vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(0.0, 1.0),
            Vertex::new(1.0, 1.0),
            Vertex::new(1.0, 0.0),
        ]
    }

    fn drawn(vertices: &[Vertex]) -> CaptureController {
        let mut controller = CaptureController::new();
        controller.start();
        for v in vertices {
            assert!(controller.tap(*v));
        }
        controller
    }

    #[test]
    fn taps_are_ignored_while_idle() {
        let mut controller = CaptureController::new();
        assert!(!controller.tap(Vertex::new(1.0, 1.0)));
        assert!(controller.vertices().is_empty());
    }

    #[test]
    fn start_clears_previous_drawing() {
        let mut controller = drawn(&square());
        controller.finish().unwrap();
        let notice = controller.start();

        assert_eq!(notice.title, "Drawing mode");
        assert_eq!(controller.mode(), CaptureMode::Drawing);
        assert!(controller.vertices().is_empty());
        assert_eq!(controller.area_hectares(), 0.0);
    }

    #[test]
    fn every_tap_is_accepted() {
        let point = Vertex::new(4.6, -74.08);
        let controller = drawn(&[point, point, point]);
        assert_eq!(controller.vertices().len(), 3);
    }

    #[test]
    fn finish_requires_three_vertices() {
        let mut controller = drawn(&square()[..2]);
        let err = controller.finish().unwrap_err();

        assert_eq!(err, CaptureError::NotEnoughVertices { count: 2 });
        assert_eq!(controller.mode(), CaptureMode::Drawing);
        assert_eq!(controller.vertices(), &square()[..2]);

        controller.tap(square()[2]);
        assert!(controller.finish().is_ok());
        assert_eq!(controller.mode(), CaptureMode::Idle);
    }

    #[test]
    fn area_tracks_vertex_count() {
        let mut controller = drawn(&square()[..2]);
        assert_eq!(controller.area_hectares(), 0.0);

        controller.tap(square()[2]);
        assert!(controller.area_hectares() > 0.0);

        controller.tap(square()[3]);
        assert_eq!(
            controller.area_hectares(),
            polygon_geometry::area_hectares(&square())
        );

        controller.undo();
        controller.undo();
        assert_eq!(controller.area_hectares(), 0.0);
    }

    #[test]
    fn undo_then_redo_restores_sequence() {
        let original = square();
        let mut controller = drawn(&original);

        for _ in 0..3 {
            controller.undo();
        }
        for v in &original[1..] {
            controller.tap(*v);
        }
        assert_eq!(controller.vertices(), original.as_slice());
    }

    #[test]
    fn undo_works_when_idle_and_keeps_mode() {
        let mut controller = drawn(&square());
        controller.finish().unwrap();

        assert_eq!(controller.undo(), Some(square()[3]));
        assert_eq!(controller.mode(), CaptureMode::Idle);
        assert!(controller.can_save());

        assert_eq!(controller.undo(), Some(square()[2]));
        assert_eq!(controller.mode(), CaptureMode::Idle);
        assert!(!controller.can_save());
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut controller = CaptureController::new();
        assert_eq!(controller.undo(), None);
        assert_eq!(controller.mode(), CaptureMode::Idle);
    }

    #[test]
    fn save_requires_idle_and_three_vertices() {
        let mut controller = drawn(&square());
        assert_eq!(controller.save(), Err(CaptureError::StillDrawing));

        controller.finish().unwrap();
        let first = controller.save().unwrap();
        let second = controller.save().unwrap();
        assert_eq!(first.area, second.area);
        assert_eq!(first.location, second.location);
        // Live sequence stays open after finalizing
        assert_eq!(controller.vertices().len(), 4);
    }

    #[test]
    fn view_reports_controls() {
        let mut controller = drawn(&square()[..1]);
        let view = controller.view();
        assert!(view.can_undo);
        assert!(!view.show_polygon);
        assert_eq!(view.status, "Points: 1 | Area: 0.0000 ha");

        controller.tap(square()[1]);
        assert!(controller.view().show_polygon);
        assert!(!controller.view().can_save);
    }

    #[test]
    fn view_keys_are_camel_case() {
        let json = serde_json::to_value(drawn(&square()).view()).unwrap();
        for key in ["areaHectares", "pointCount", "canUndo", "canSave", "showPolygon"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("area_hectares").is_none());
        assert_eq!(json["mode"], "drawing");
    }
}
