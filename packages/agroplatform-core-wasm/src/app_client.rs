// JS-facing handles over the session, parcel service and attribute form
use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use js_sys::{Function, Promise};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::config::ClientConfig;
use crate::credentials::JsSecureStore;
use crate::http_client::{ApiClient, JsFetchTransport};
use crate::location::{bootstrap_viewport, JsLocationProvider};
use crate::models::{Notice, Parcel, ParcelGeometryResult, ParcelUpdate, SignUpRequest};
use crate::parcel_form::{created_notice, submit_form, ParcelForm};
use crate::parcels::ParcelService;
use crate::session::SessionStore;

type JsSession = SessionStore<JsFetchTransport, JsSecureStore>;
type JsParcels = ParcelService<JsFetchTransport, JsSecureStore>;

// What `ParcelWizard.submit()` resolves to
#[derive(Serialize)]
struct Created {
    parcel: Parcel,
    notice: Notice,
}

/// One per app, provided to screens through the host's context.
#[wasm_bindgen]
pub struct AgroClient {
    session: Rc<JsSession>,
    parcels: Rc<JsParcels>,
}

#[wasm_bindgen]
impl AgroClient {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<AgroClient, JsValue> {
        let config = ClientConfig::from_js(config)?;
        log::info!("Backend client configured for {}", config.base_url);
        let client = Rc::new(ApiClient::new(config, JsFetchTransport, JsSecureStore));
        Ok(AgroClient {
            session: Rc::new(SessionStore::new(Rc::clone(&client))),
            parcels: Rc::new(ParcelService::new(client)),
        })
    }

    #[wasm_bindgen(js_name = signIn)]
    pub fn sign_in(&self, email: String, password: String) -> Promise {
        future_to_promise(sign_in(Rc::clone(&self.session), email, password))
    }

    #[wasm_bindgen(js_name = signUp)]
    pub fn sign_up(&self, request: JsValue) -> Result<Promise, JsValue> {
        let request: SignUpRequest = from_value(request)?;
        Ok(future_to_promise(sign_up(Rc::clone(&self.session), request)))
    }

    #[wasm_bindgen(js_name = signOut)]
    pub fn sign_out(&self) -> Promise {
        future_to_promise(sign_out(Rc::clone(&self.session)))
    }

    // Restore the session at app launch
    pub fn refresh(&self) -> Promise {
        future_to_promise(refresh(Rc::clone(&self.session)))
    }

    #[wasm_bindgen(js_name = currentUser)]
    pub fn current_user(&self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.session.current_user())?)
    }

    #[wasm_bindgen(js_name = isSignedIn)]
    pub fn is_signed_in(&self) -> bool {
        self.session.current_token().is_some()
    }

    #[wasm_bindgen(js_name = listParcels)]
    pub fn list_parcels(&self) -> Promise {
        future_to_promise(list_parcels(Rc::clone(&self.parcels)))
    }

    #[wasm_bindgen(js_name = getParcel)]
    pub fn get_parcel(&self, id: u32) -> Promise {
        future_to_promise(get_parcel(Rc::clone(&self.parcels), id))
    }

    #[wasm_bindgen(js_name = updateParcel)]
    pub fn update_parcel(&self, id: u32, changes: JsValue) -> Result<Promise, JsValue> {
        let changes: ParcelUpdate = from_value(changes)?;
        Ok(future_to_promise(update_parcel(Rc::clone(&self.parcels), id, changes)))
    }

    #[wasm_bindgen(js_name = deleteParcel)]
    pub fn delete_parcel(&self, id: u32) -> Promise {
        future_to_promise(delete_parcel(Rc::clone(&self.parcels), id))
    }

    // Resolves to {viewport, notice}
    #[wasm_bindgen(js_name = bootstrapViewport)]
    pub fn bootstrap_viewport(&self) -> Promise {
        future_to_promise(bootstrap())
    }

    /// Start the attribute form for a geometry returned by `ParcelCapture.save()`.
    #[wasm_bindgen(js_name = createParcelForm)]
    pub fn create_parcel_form(&self, geometry: JsValue) -> Result<ParcelWizard, JsValue> {
        let geometry: ParcelGeometryResult = from_value(geometry)?;
        Ok(ParcelWizard {
            form: Rc::new(RefCell::new(ParcelForm::new(geometry))),
            parcels: Rc::clone(&self.parcels),
        })
    }
}

async fn sign_in(session: Rc<JsSession>, email: String, password: String) -> Result<JsValue, JsValue> {
    let user = session.sign_in(&email, &password).await?;
    Ok(to_value(&user)?)
}

async fn sign_up(session: Rc<JsSession>, request: SignUpRequest) -> Result<JsValue, JsValue> {
    let user = session.sign_up(&request).await?;
    Ok(to_value(&user)?)
}

async fn sign_out(session: Rc<JsSession>) -> Result<JsValue, JsValue> {
    session.sign_out().await?;
    Ok(JsValue::UNDEFINED)
}

async fn refresh(session: Rc<JsSession>) -> Result<JsValue, JsValue> {
    let user = session.refresh().await?;
    Ok(to_value(&user)?)
}

async fn list_parcels(parcels: Rc<JsParcels>) -> Result<JsValue, JsValue> {
    let list = parcels.list().await?;
    Ok(to_value(&list)?)
}

async fn get_parcel(parcels: Rc<JsParcels>, id: u32) -> Result<JsValue, JsValue> {
    let parcel = parcels.get(i64::from(id)).await?;
    Ok(to_value(&parcel)?)
}

async fn update_parcel(parcels: Rc<JsParcels>, id: u32, changes: ParcelUpdate) -> Result<JsValue, JsValue> {
    let parcel = parcels.update(i64::from(id), &changes).await?;
    Ok(to_value(&parcel)?)
}

async fn delete_parcel(parcels: Rc<JsParcels>, id: u32) -> Result<JsValue, JsValue> {
    parcels.delete(i64::from(id)).await?;
    Ok(JsValue::UNDEFINED)
}

async fn bootstrap() -> Result<JsValue, JsValue> {
    let result = bootstrap_viewport(&JsLocationProvider).await;
    Ok(to_value(&result)?)
}

// Attribute form handle owned by the form component
#[wasm_bindgen]
pub struct ParcelWizard {
    form: Rc<RefCell<ParcelForm>>,
    parcels: Rc<JsParcels>,
}

#[wasm_bindgen]
impl ParcelWizard {
    #[wasm_bindgen(js_name = setName)]
    pub fn set_name(&self, name: &str) {
        self.form.borrow_mut().set_name(name);
    }

    #[wasm_bindgen(js_name = setCropType)]
    pub fn set_crop_type(&self, crop_type: &str) {
        self.form.borrow_mut().set_crop_type(crop_type);
    }

    #[wasm_bindgen(js_name = setDevelopmentStage)]
    pub fn set_development_stage(&self, stage: &str) {
        self.form.borrow_mut().set_development_stage(stage);
    }

    // Takes an ISO-8601 timestamp (Date.toISOString())
    #[wasm_bindgen(js_name = setPlantingDate)]
    pub fn set_planting_date(&self, iso: &str) -> Result<(), JsValue> {
        let date = DateTime::parse_from_rfc3339(iso)
            .map_err(|e| JsValue::from_str(&format!("Invalid planting date: {}", e)))?
            .with_timezone(&Utc);
        self.form.borrow_mut().set_planting_date(date)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setSoilType)]
    pub fn set_soil_type(&self, soil_type: &str) {
        self.form.borrow_mut().set_soil_type(soil_type);
    }

    #[wasm_bindgen(js_name = setSoilPh)]
    pub fn set_soil_ph(&self, text: &str) {
        self.form.borrow_mut().set_soil_ph(text);
    }

    #[wasm_bindgen(js_name = setIrrigationType)]
    pub fn set_irrigation_type(&self, irrigation_type: &str) {
        self.form.borrow_mut().set_irrigation_type(irrigation_type);
    }

    // Returns the new step name
    pub fn next(&self) -> Result<String, JsValue> {
        let step = self.form.borrow_mut().next()?;
        Ok(step.name().to_string())
    }

    pub fn back(&self) -> Result<String, JsValue> {
        let step = self.form.borrow_mut().back()?;
        Ok(step.name().to_string())
    }

    pub fn view(&self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.form.borrow().view())?)
    }

    /// Submit the parcel. Resolves to {parcel, notice} and calls `on_created`
    /// with the new parcel; rejects with {kind, message} and keeps the input.
    pub fn submit(&self, on_created: Option<Function>) -> Promise {
        future_to_promise(submit(
            Rc::clone(&self.form),
            Rc::clone(&self.parcels),
            on_created,
        ))
    }
}

async fn submit(
    form: Rc<RefCell<ParcelForm>>,
    parcels: Rc<JsParcels>,
    on_created: Option<Function>,
) -> Result<JsValue, JsValue> {
    let parcel = submit_form(&form, parcels.as_ref()).await?;
    let parcel_js = to_value(&parcel)?;
    if let Some(callback) = on_created {
        callback.call1(&JsValue::NULL, &parcel_js)?;
    }
    Ok(to_value(&Created {
        parcel,
        notice: created_notice(),
    })?)
}
