//! Shipping address endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use common::VillageId;
use serde::Deserialize;
use store::Store;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::orders::{AckResponse, AppState, acting_user};

#[derive(Deserialize)]
pub struct ShippingAddressRequest {
    pub village_id: Uuid,
}

/// PUT /users/shipping-address — set the acting user's shipping village.
///
/// A standalone operation invoked before order placement; placing an
/// order never mutates the user record.
#[tracing::instrument(skip(state, headers, req))]
pub async fn set_shipping_address<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ShippingAddressRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let user_id = acting_user(&headers)?;
    state
        .coordinator
        .set_shipping_village(user_id, VillageId::from_uuid(req.village_id))
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: "shipping address updated".to_string(),
    }))
}
