// Parcel resource service over the shared API client
use std::rc::Rc;

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::http_client::{ApiClient, HttpTransport};
use crate::models::{Parcel, ParcelCreate, ParcelUpdate};

const PARCELS_PATH: &str = "/parcels/";

pub const CREATE_FAILED: &str = "Could not create the parcel";
const LIST_FAILED: &str = "Could not load your parcels";
const GET_FAILED: &str = "Could not load the parcel";
const UPDATE_FAILED: &str = "Could not update the parcel";
const DELETE_FAILED: &str = "Could not delete the parcel";

/// Anything that can create a parcel. The attribute form only needs this.
#[allow(async_fn_in_trait)]
pub trait ParcelCreator {
    async fn create_parcel(&self, payload: &ParcelCreate) -> Result<Parcel, ApiError>;
}

pub struct ParcelService<T, S> {
    client: Rc<ApiClient<T, S>>,
}

impl<T: HttpTransport, S: CredentialStore> ParcelService<T, S> {
    pub fn new(client: Rc<ApiClient<T, S>>) -> Self {
        ParcelService { client }
    }

    pub fn client(&self) -> &Rc<ApiClient<T, S>> {
        &self.client
    }

    pub async fn create(&self, payload: &ParcelCreate) -> Result<Parcel, ApiError> {
        let parcel: Parcel = self.client.post(PARCELS_PATH, payload, CREATE_FAILED).await?;
        log::info!("Created parcel {} ({:.4} ha)", parcel.id, parcel.area);
        Ok(parcel)
    }

    pub async fn list(&self) -> Result<Vec<Parcel>, ApiError> {
        self.client.get(PARCELS_PATH, LIST_FAILED).await
    }

    pub async fn get(&self, id: i64) -> Result<Parcel, ApiError> {
        self.client.get(&parcel_path(id), GET_FAILED).await
    }

    pub async fn update(&self, id: i64, changes: &ParcelUpdate) -> Result<Parcel, ApiError> {
        self.client.put(&parcel_path(id), changes, UPDATE_FAILED).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&parcel_path(id), DELETE_FAILED).await?;
        log::info!("Deleted parcel {}", id);
        Ok(())
    }
}

impl<T: HttpTransport, S: CredentialStore> ParcelCreator for ParcelService<T, S> {
    async fn create_parcel(&self, payload: &ParcelCreate) -> Result<Parcel, ApiError> {
        self.create(payload).await
    }
}

fn parcel_path(id: i64) -> String {
    format!("{}{}", PARCELS_PATH, id)
}
