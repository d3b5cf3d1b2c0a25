//! Order API implementation.
//!
//! This module implements the order endpoints: creation, retrieval,
//! listing with filters and pagination, role-gated status updates, and
//! rider acceptance. Responses carry the role view's projection (label,
//! color tag, legal next states) alongside the raw record so UI clients
//! render straight from the payload.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use orderly_lifecycle::{
	color_tag_for, initial_state, label_for, legal_next_states, OrderStateError,
	OrderStateMachine, TransitionError,
};
use orderly_repository::{OrderFilter, Page};
use orderly_types::{elapsed_time, format_currency, LineItem, Order, OrderState, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the order API.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The requested order does not exist (404).
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The request is malformed (400).
	#[error("Bad request: {0}")]
	BadRequest(String),
	/// The request lost a concurrency race (409).
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The request is well-formed but not legal for the order (422).
	#[error("Unprocessable: {0}")]
	Unprocessable(String),
	/// Internal failure (500).
	#[error("Internal error: {0}")]
	Internal(String),
}

impl ApiError {
	/// Get the HTTP status code for this error.
	fn status_code(&self) -> StatusCode {
		match self {
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Conflict(_) => StatusCode::CONFLICT,
			ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
			ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<OrderStateError> for ApiError {
	fn from(e: OrderStateError) -> Self {
		match e {
			OrderStateError::NotFound(id) => ApiError::NotFound(id),
			OrderStateError::Transition(t) => match t {
				TransitionError::AlreadyAccepted => ApiError::Conflict(t.to_string()),
				TransitionError::Illegal { .. } => ApiError::Unprocessable(t.to_string()),
				TransitionError::InvalidStateForRole { .. } | TransitionError::UnknownState(_) => {
					ApiError::BadRequest(t.to_string())
				},
			},
			OrderStateError::Repository(message) => ApiError::Internal(message),
		}
	}
}

/// Error payload returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let error = match &self {
			ApiError::NotFound(_) => "ORDER_NOT_FOUND",
			ApiError::BadRequest(_) => "BAD_REQUEST",
			ApiError::Conflict(_) => "CONFLICT",
			ApiError::Unprocessable(_) => "ILLEGAL_TRANSITION",
			ApiError::Internal(_) => "INTERNAL_ERROR",
		};
		let body = ErrorResponse {
			error: error.to_string(),
			message: self.to_string(),
		};
		(self.status_code(), Json(body)).into_response()
	}
}

/// A line item as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
	pub name: String,
	pub quantity: u32,
	#[serde(rename = "unitPrice")]
	pub unit_price: f64,
}

/// Request body for POST /orders.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
	/// Role view creating the order; determines the initial state.
	#[serde(default)]
	pub role: Option<Role>,
	#[serde(rename = "customerId")]
	pub customer_id: String,
	#[serde(rename = "restaurantId")]
	pub restaurant_id: String,
	pub items: Vec<LineItemRequest>,
}

/// Request body for POST /orders/{id}/status.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
	pub role: Role,
	pub status: OrderState,
}

/// Request body for POST /orders/{id}/accept.
#[derive(Debug, Deserialize)]
pub struct AcceptOrderRequest {
	#[serde(rename = "riderId")]
	pub rider_id: String,
}

/// Query parameters for GET /orders.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
	/// Role view for the response projection (default: admin).
	pub role: Option<Role>,
	pub status: Option<OrderState>,
	#[serde(rename = "customerId")]
	pub customer_id: Option<String>,
	#[serde(rename = "restaurantId")]
	pub restaurant_id: Option<String>,
	#[serde(rename = "riderId")]
	pub rider_id: Option<String>,
	pub offset: Option<usize>,
	pub limit: Option<usize>,
}

/// Query parameters for GET /orders/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
	/// Role view for the response projection (default: admin).
	pub role: Option<Role>,
}

/// A line item in an API response.
#[derive(Debug, Serialize)]
pub struct LineItemResponse {
	pub name: String,
	pub quantity: u32,
	#[serde(rename = "unitPrice")]
	pub unit_price: f64,
}

impl From<&LineItem> for LineItemResponse {
	fn from(item: &LineItem) -> Self {
		Self {
			name: item.name.clone(),
			quantity: item.quantity,
			unit_price: item.unit_price,
		}
	}
}

/// Order response for API endpoints.
///
/// The `label`, `colorTag`, and `nextStates` fields carry the requesting
/// role's projection; they are omitted when the order's current state is
/// not part of that role's view.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
	pub id: String,
	pub status: OrderState,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(rename = "colorTag", skip_serializing_if = "Option::is_none")]
	pub color_tag: Option<String>,
	#[serde(rename = "nextStates", skip_serializing_if = "Option::is_none")]
	pub next_states: Option<Vec<OrderState>>,
	#[serde(rename = "customerId")]
	pub customer_id: String,
	#[serde(rename = "restaurantId")]
	pub restaurant_id: String,
	#[serde(rename = "riderId", skip_serializing_if = "Option::is_none")]
	pub rider_id: Option<String>,
	pub items: Vec<LineItemResponse>,
	pub total: f64,
	#[serde(rename = "totalDisplay")]
	pub total_display: String,
	pub age: String,
	#[serde(rename = "createdAt")]
	pub created_at: DateTime<Utc>,
	#[serde(rename = "updatedAt")]
	pub updated_at: DateTime<Utc>,
	#[serde(rename = "acceptedAt", skip_serializing_if = "Option::is_none")]
	pub accepted_at: Option<DateTime<Utc>>,
	#[serde(rename = "deliveredAt", skip_serializing_if = "Option::is_none")]
	pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderResponse {
	/// Builds a response from an order record under a role view.
	pub fn from_order(order: &Order, role: Role) -> Self {
		let label = label_for(role, order.status).ok().map(str::to_string);
		let color_tag = color_tag_for(role, order.status)
			.ok()
			.map(|c| c.as_str().to_string());
		let next_states = legal_next_states(role, order.status).ok().map(<[_]>::to_vec);

		Self {
			id: order.id.clone(),
			status: order.status,
			label,
			color_tag,
			next_states,
			customer_id: order.customer_id.clone(),
			restaurant_id: order.restaurant_id.clone(),
			rider_id: order.rider_id.clone(),
			items: order.items.iter().map(LineItemResponse::from).collect(),
			total: order.total,
			total_display: format_currency(order.total),
			age: elapsed_time(order.created_at),
			created_at: order.created_at,
			updated_at: order.updated_at,
			accepted_at: order.accepted_at,
			delivered_at: order.delivered_at,
		}
	}
}

/// Creates a new order in the initial state of the requesting role view.
pub async fn create_order(
	request: CreateOrderRequest,
	machine: &OrderStateMachine,
) -> Result<OrderResponse, ApiError> {
	if request.items.is_empty() {
		return Err(ApiError::BadRequest("Order must have at least one item".into()));
	}

	let role = request.role.unwrap_or(Role::Admin);
	let items = request
		.items
		.iter()
		.map(|i| LineItem::new(i.name.clone(), i.quantity, i.unit_price))
		.collect();

	let order = Order::new(
		Uuid::new_v4().to_string(),
		request.customer_id,
		request.restaurant_id,
		items,
		initial_state(role),
	);

	let created = machine.submit_order(order).await?;
	tracing::info!(order_id = %created.id, role = %role, "order created");
	Ok(OrderResponse::from_order(&created, role))
}

/// Retrieves one order, projected for the requesting role view.
pub async fn get_order(
	id: &str,
	query: ViewQuery,
	machine: &OrderStateMachine,
) -> Result<OrderResponse, ApiError> {
	let role = query.role.unwrap_or(Role::Admin);
	let order = machine.order(id).await?;
	Ok(OrderResponse::from_order(&order, role))
}

/// Lists orders matching the query filter.
pub async fn list_orders(
	query: ListOrdersQuery,
	machine: &OrderStateMachine,
) -> Result<Vec<OrderResponse>, ApiError> {
	let role = query.role.unwrap_or(Role::Admin);
	let filter = OrderFilter {
		status: query.status,
		customer_id: query.customer_id,
		restaurant_id: query.restaurant_id,
		rider_id: query.rider_id,
	};
	let mut page = Page::default();
	if let Some(offset) = query.offset {
		page.offset = offset;
	}
	if let Some(limit) = query.limit {
		page.limit = limit;
	}

	let orders = machine.orders(&filter, &page).await?;
	Ok(orders
		.iter()
		.map(|o| OrderResponse::from_order(o, role))
		.collect())
}

/// Applies a role-gated status transition to an order.
pub async fn update_status(
	id: &str,
	request: StatusUpdateRequest,
	machine: &OrderStateMachine,
) -> Result<OrderResponse, ApiError> {
	let updated = machine
		.transition_order(request.role, id, request.status)
		.await?;
	tracing::info!(order_id = %id, role = %request.role, status = %updated.status, "order status updated");
	Ok(OrderResponse::from_order(&updated, request.role))
}

/// Accepts a pending order on behalf of a rider.
pub async fn accept_order(
	id: &str,
	request: AcceptOrderRequest,
	machine: &OrderStateMachine,
) -> Result<OrderResponse, ApiError> {
	let accepted = machine.accept_order(id, &request.rider_id).await?;
	tracing::info!(order_id = %id, rider_id = %request.rider_id, "order accepted");
	Ok(OrderResponse::from_order(&accepted, Role::Rider))
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderly_repository::implementations::fixture::FixtureOrderRepository;
	use std::sync::Arc;

	fn machine() -> OrderStateMachine {
		OrderStateMachine::new(Arc::new(FixtureOrderRepository::seeded()))
	}

	#[tokio::test]
	async fn test_response_carries_role_projection() {
		let machine = machine();
		let response = get_order(
			"ord-1001",
			ViewQuery {
				role: Some(Role::Admin),
			},
			&machine,
		)
		.await
		.unwrap();

		assert_eq!(response.status, OrderState::Pending);
		assert_eq!(response.label.as_deref(), Some("Pending"));
		assert_eq!(response.color_tag.as_deref(), Some("gray"));
		assert!(response.next_states.unwrap().contains(&OrderState::Confirmed));
		assert_eq!(response.total_display, "$19.00");
	}

	#[tokio::test]
	async fn test_projection_is_omitted_for_foreign_state() {
		let machine = machine();
		// ord-1003 is preparing; valid for restaurant, but its projection
		// under the rider view has no entry
		let response = get_order(
			"ord-1003",
			ViewQuery {
				role: Some(Role::Rider),
			},
			&machine,
		)
		.await
		.unwrap();

		assert!(response.label.is_none());
		assert!(response.next_states.is_none());
	}

	#[tokio::test]
	async fn test_create_rejects_empty_items() {
		let machine = machine();
		let result = create_order(
			CreateOrderRequest {
				role: None,
				customer_id: "cust-1".into(),
				restaurant_id: "rest-1".into(),
				items: vec![],
			},
			&machine,
		)
		.await;
		assert!(matches!(result, Err(ApiError::BadRequest(_))));
	}

	#[tokio::test]
	async fn test_create_uses_role_initial_state() {
		let machine = machine();
		let response = create_order(
			CreateOrderRequest {
				role: Some(Role::Restaurant),
				customer_id: "cust-1".into(),
				restaurant_id: "rest-1".into(),
				items: vec![LineItemRequest {
					name: "Udon".into(),
					quantity: 1,
					unit_price: 11.0,
				}],
			},
			&machine,
		)
		.await
		.unwrap();
		assert_eq!(response.status, OrderState::New);
	}

	#[tokio::test]
	async fn test_error_mapping() {
		let machine = machine();

		let missing = get_order("ghost", ViewQuery::default(), &machine).await;
		assert!(matches!(missing, Err(ApiError::NotFound(_))));

		let illegal = update_status(
			"ord-1001",
			StatusUpdateRequest {
				role: Role::Rider,
				status: OrderState::Delivered,
			},
			&machine,
		)
		.await;
		assert!(matches!(illegal, Err(ApiError::Unprocessable(_))));

		accept_order(
			"ord-1001",
			AcceptOrderRequest {
				rider_id: "rider-a".into(),
			},
			&machine,
		)
		.await
		.unwrap();
		let lost = accept_order(
			"ord-1001",
			AcceptOrderRequest {
				rider_id: "rider-b".into(),
			},
			&machine,
		)
		.await;
		assert!(matches!(lost, Err(ApiError::Conflict(_))));
	}
}
