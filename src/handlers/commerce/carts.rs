use crate::handlers::common::{map_json_rejection, map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::commerce::OrderType,
    errors::{ApiError, ServiceError},
    services::commerce::{CartItemRequest, CartLine, UpsertCartInput},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

const ORDER_TYPE_MESSAGE: &str = "orderType must be one of: Normal, Subscription";

/// Creates the router for cart endpoints. Callers attach authentication.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", post(upsert_cart))
        .route("/cart/:key", get(list_cart).delete(remove_cart_item))
}

/// Add or increase items in the caller's cart
#[instrument(skip_all, fields(owner_id = %user.user_id))]
async fn upsert_cart(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpsertCartRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(map_json_rejection)?;
    let input = payload.into_input()?;

    let lines = state
        .carts
        .upsert_items(user.user_id, input)
        .await
        .map_err(|e| match e {
            // Unknown catalog ids are a bad request from the cart's point of view.
            ServiceError::NotFound(msg) | ServiceError::ValidationError(msg) => {
                ApiError::BadRequest(msg)
            }
            other => map_service_error(other),
        })?;

    let data: Vec<CartLine> = lines.into_iter().map(CartLine::from).collect();
    Ok(success_response("Cart updated successfully", data))
}

/// List the caller's cart for one order type
#[instrument(skip_all, fields(owner_id = %user.user_id))]
async fn list_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order_type = OrderType::from_str(&order_type)
        .map_err(|_| ApiError::BadRequest(ORDER_TYPE_MESSAGE.to_string()))?;

    let items = state
        .carts
        .list_items(user.user_id, order_type)
        .await
        .map_err(map_service_error)?;

    let message = if items.is_empty() {
        "Cart is empty"
    } else {
        "Cart items fetched successfully"
    };
    Ok(success_response(message, items))
}

/// Remove one line from the caller's cart
#[instrument(skip_all, fields(owner_id = %user.user_id))]
async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let line_item_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest("id must be a valid UUID".to_string()))?;

    state
        .carts
        .remove_item(user.user_id, line_item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        "Cart item removed successfully",
        RemovedCartItem { id: line_item_id },
    ))
}

#[derive(Debug, Serialize)]
struct RemovedCartItem {
    id: Uuid,
}

/// Raw POST /cart body. Fields stay untyped so every problem can be reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct UpsertCartRequest {
    pub product_id: Option<Value>,
    #[serde(rename = "orderType")]
    pub order_type: Option<Value>,
    pub weights: Option<Value>,
}

impl UpsertCartRequest {
    pub fn into_input(self) -> Result<UpsertCartInput, ApiError> {
        let product_id = match self.product_id {
            None => return Err(bad_request("product_id is required")),
            Some(value) => {
                parse_uuid(&value).ok_or_else(|| bad_request("product_id must be a valid UUID"))?
            }
        };

        let order_type = match self.order_type {
            None => return Err(bad_request("orderType is required")),
            Some(value) => value
                .as_str()
                .and_then(|s| OrderType::from_str(s).ok())
                .ok_or_else(|| bad_request(ORDER_TYPE_MESSAGE))?,
        };

        let entries = match self.weights {
            Some(Value::Array(entries)) if !entries.is_empty() => entries,
            _ => return Err(bad_request("weights must be a non-empty list")),
        };

        let items = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_weight_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UpsertCartInput {
            product_id,
            order_type,
            items,
        })
    }
}

fn parse_weight_entry(index: usize, entry: &Value) -> Result<CartItemRequest, ApiError> {
    let entry = entry
        .as_object()
        .ok_or_else(|| bad_request(format!("weights[{}] must be an object", index)))?;

    let variant_id = match entry.get("weight_id") {
        None | Some(Value::Null) => {
            return Err(bad_request(format!("weights[{}].weight_id is required", index)))
        }
        Some(value) => parse_uuid(value).ok_or_else(|| {
            bad_request(format!("weights[{}].weight_id must be a valid UUID", index))
        })?,
    };

    let quantity = entry
        .get("quantity")
        .and_then(Value::as_i64)
        .filter(|q| *q > 0)
        .and_then(|q| i32::try_from(q).ok())
        .ok_or_else(|| {
            bad_request(format!(
                "weights[{}].quantity must be a positive integer",
                index
            ))
        })?;

    Ok(CartItemRequest {
        variant_id,
        quantity,
    })
}

fn parse_uuid(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::BadRequest(message.into())
}
