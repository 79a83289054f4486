use std::cell::RefCell;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ApiError, FormError};
use crate::models::{Notice, Parcel, ParcelCreate, ParcelGeometryResult};
use crate::parcels::ParcelCreator;

// Valid soil pH range accepted by the backend
const SOIL_PH_MIN: f64 = 0.0;
const SOIL_PH_MAX: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

const fn choice(value: &'static str, label: &'static str) -> ChoiceOption {
    ChoiceOption { value, label }
}

// Values mirror the backend's crop and stage enums; anything else is rejected
pub const CROP_OPTIONS: &[ChoiceOption] = &[
    choice("maiz", "Maíz"),
    choice("trigo", "Trigo"),
    choice("soja", "Soja"),
    choice("cafe", "Café"),
    choice("arroz", "Arroz"),
    choice("papa", "Papa"),
    choice("tomate", "Tomate"),
    choice("hortalizas", "Hortalizas"),
    choice("platano", "Plátano"),
    choice("otros", "Otros"),
];

pub const STAGE_OPTIONS: &[ChoiceOption] = &[
    choice("preparacion", "Preparación del terreno"),
    choice("siembra", "Siembra"),
    choice("germinacion", "Germinación"),
    choice("crecimiento", "Crecimiento"),
    choice("floracion", "Floración"),
    choice("maduracion", "Maduración"),
    choice("cosecha", "Cosecha"),
];

pub const SOIL_OPTIONS: &[ChoiceOption] = &[
    choice("arcilloso", "Arcilloso"),
    choice("arenoso", "Arenoso"),
    choice("franco", "Franco"),
    choice("limoso", "Limoso"),
];

pub const IRRIGATION_OPTIONS: &[ChoiceOption] = &[
    choice("goteo", "Goteo"),
    choice("aspersion", "Aspersión"),
    choice("inundacion", "Inundación"),
    choice("secano", "Secano (sin riego)"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Basic,
    Crop,
    Soil,
}

impl FormStep {
    pub fn name(&self) -> &'static str {
        match self {
            FormStep::Basic => "basic",
            FormStep::Crop => "crop",
            FormStep::Soil => "soil",
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            FormStep::Basic => 1,
            FormStep::Crop => 2,
            FormStep::Soil => 3,
        }
    }
}

// Raw form input. Empty strings mean "not provided".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelAttributes {
    pub name: String,
    pub crop_type: String,
    pub development_stage: String,
    pub planting_date: DateTime<Utc>,
    pub soil_type: String,
    pub soil_ph: String,
    pub irrigation_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub step: FormStep,
    pub step_index: u8,
    pub next_label: &'static str,
    pub attributes: ParcelAttributes,
    pub area: f64,
    pub location: String,
    pub submitting: bool,
    pub last_error: Option<String>,
    pub created: bool,
}

/// Three-step wizard collecting parcel metadata around a finalized geometry.
///
/// Only the name is required. Entered values survive failed submissions so
/// the user can retry.
#[derive(Debug, Clone)]
pub struct ParcelForm {
    geometry: ParcelGeometryResult,
    step: FormStep,
    attributes: ParcelAttributes,
    submitting: bool,
    last_error: Option<String>,
    created: Option<Parcel>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl ParcelForm {
    pub fn new(geometry: ParcelGeometryResult) -> Self {
        Self::new_at(geometry, Utc::now())
    }

    // Planting date defaults to `now`
    pub fn new_at(geometry: ParcelGeometryResult, now: DateTime<Utc>) -> Self {
        ParcelForm {
            geometry,
            step: FormStep::Basic,
            attributes: ParcelAttributes {
                name: String::new(),
                crop_type: String::new(),
                development_stage: String::new(),
                planting_date: now,
                soil_type: String::new(),
                soil_ph: String::new(),
                irrigation_type: String::new(),
            },
            submitting: false,
            last_error: None,
            created: None,
        }
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn attributes(&self) -> &ParcelAttributes {
        &self.attributes
    }

    pub fn geometry(&self) -> &ParcelGeometryResult {
        &self.geometry
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn created(&self) -> Option<&Parcel> {
        self.created.as_ref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.attributes.name = name.to_string();
    }

    // Clearing the crop also clears its development stage
    pub fn set_crop_type(&mut self, crop_type: &str) {
        self.attributes.crop_type = crop_type.to_string();
        if crop_type.is_empty() {
            self.attributes.development_stage.clear();
        }
    }

    pub fn set_development_stage(&mut self, stage: &str) {
        self.attributes.development_stage = stage.to_string();
    }

    pub fn set_planting_date(&mut self, date: DateTime<Utc>) -> Result<(), FormError> {
        self.set_planting_date_at(date, Utc::now())
    }

    pub fn set_planting_date_at(&mut self, date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), FormError> {
        if date > now {
            return Err(FormError::PlantingDateInFuture);
        }
        self.attributes.planting_date = date;
        Ok(())
    }

    pub fn set_soil_type(&mut self, soil_type: &str) {
        self.attributes.soil_type = soil_type.to_string();
    }

    /// Keeps only digits and decimal points, like a decimal keypad would.
    pub fn set_soil_ph(&mut self, text: &str) {
        self.attributes.soil_ph = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
    }

    pub fn set_irrigation_type(&mut self, irrigation_type: &str) {
        self.attributes.irrigation_type = irrigation_type.to_string();
    }

    pub fn next(&mut self) -> Result<FormStep, FormError> {
        self.step = match self.step {
            FormStep::Basic => {
                if self.attributes.name.trim().is_empty() {
                    return Err(FormError::NameRequired);
                }
                FormStep::Crop
            }
            FormStep::Crop => FormStep::Soil,
            FormStep::Soil => return Err(FormError::NoFurtherStep(FormStep::Soil.name())),
        };
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<FormStep, FormError> {
        self.step = match self.step {
            FormStep::Basic => return Err(FormError::NoFurtherStep(FormStep::Basic.name())),
            FormStep::Crop => FormStep::Basic,
            FormStep::Soil => FormStep::Crop,
        };
        Ok(self.step)
    }

    // Label for the forward control on the current step
    pub fn next_label(&self) -> &'static str {
        match self.step {
            FormStep::Basic => "Next",
            FormStep::Crop if self.attributes.crop_type.is_empty() => "Omit",
            FormStep::Crop => "Next",
            FormStep::Soil if self.submitting => "Saving...",
            FormStep::Soil => "Create parcel",
        }
    }

    /// Merge the geometry with the provided attributes, leaving out
    /// everything still at its empty default.
    pub fn build_payload(&self) -> Result<ParcelCreate, FormError> {
        let name = non_empty(&self.attributes.name).ok_or(FormError::NameRequired)?;
        let crop_type = non_empty(&self.attributes.crop_type);

        let soil_ph = match non_empty(&self.attributes.soil_ph) {
            Some(text) => {
                let ph: f64 = text.parse().map_err(|_| FormError::InvalidSoilPh)?;
                if !(SOIL_PH_MIN..=SOIL_PH_MAX).contains(&ph) {
                    return Err(FormError::InvalidSoilPh);
                }
                Some(ph)
            }
            None => None,
        };

        Ok(ParcelCreate {
            name,
            location: self.geometry.location.clone(),
            area: self.geometry.area,
            geometry: self.geometry.geometry.clone(),
            planting_date: crop_type.as_ref().map(|_| self.attributes.planting_date),
            development_stage: crop_type
                .as_ref()
                .and_then(|_| non_empty(&self.attributes.development_stage)),
            crop_type,
            soil_type: non_empty(&self.attributes.soil_type),
            soil_ph,
            irrigation_type: non_empty(&self.attributes.irrigation_type),
        })
    }

    /// Validate and mark the form as in flight. Only one submission may be
    /// outstanding at a time.
    pub fn begin_submission(&mut self) -> Result<ParcelCreate, FormError> {
        if self.created.is_some() {
            return Err(FormError::AlreadySubmitted);
        }
        if self.submitting {
            return Err(FormError::SubmissionInFlight);
        }
        let payload = self.build_payload().map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.submitting = true;
        self.last_error = None;
        Ok(payload)
    }

    // Record the outcome. On failure all entered data is kept for a retry.
    pub fn finish_submission(&mut self, result: Result<Parcel, ApiError>) -> Result<Parcel, FormError> {
        self.submitting = false;
        match result {
            Ok(parcel) => {
                self.created = Some(parcel.clone());
                Ok(parcel)
            }
            Err(err) => {
                log::warn!("Parcel submission failed: {}", err.message);
                self.last_error = Some(err.message.clone());
                Err(FormError::Api(err))
            }
        }
    }

    pub fn view(&self) -> FormView {
        FormView {
            step: self.step,
            step_index: self.step.index(),
            next_label: self.next_label(),
            attributes: self.attributes.clone(),
            area: self.geometry.area,
            location: self.geometry.location.clone(),
            submitting: self.submitting,
            last_error: self.last_error.clone(),
            created: self.created.is_some(),
        }
    }
}

pub fn created_notice() -> Notice {
    Notice::new(
        "Success",
        "Parcel created. The assistant can now give you more precise recommendations.",
    )
}

/// Submit the form through `creator`.
///
/// The form is only borrowed around the awaited call, so the host may keep
/// rendering it while the request is outstanding.
pub async fn submit_form<C: ParcelCreator>(form: &RefCell<ParcelForm>, creator: &C) -> Result<Parcel, FormError> {
    let payload = form.borrow_mut().begin_submission()?;
    let result = creator.create_parcel(&payload).await;
    form.borrow_mut().finish_submission(result)
}
