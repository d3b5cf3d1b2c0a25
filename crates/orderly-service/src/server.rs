//! HTTP server for the Orderly order API.
//!
//! This module provides a minimal HTTP server exposing the order
//! lifecycle operations. Every status mutation flows through the state
//! machine, so illegal transitions are rejected before any persistence
//! write.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use orderly_config::ApiConfig;
use orderly_lifecycle::OrderStateMachine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::apis::orders::{
	AcceptOrderRequest, ApiError, CreateOrderRequest, ListOrdersQuery, OrderResponse,
	StatusUpdateRequest, ViewQuery,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// State machine gating all order mutations.
	pub machine: Arc<OrderStateMachine>,
}

/// Starts the HTTP server for the order API.
pub async fn start_server(
	api_config: ApiConfig,
	machine: Arc<OrderStateMachine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { machine };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", get(handle_list_orders).post(handle_create_order))
				.route("/orders/{id}", get(handle_get_order))
				.route("/orders/{id}/status", post(handle_update_status))
				.route("/orders/{id}/accept", post(handle_accept_order)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Orderly API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/orders requests.
async fn handle_list_orders(
	State(state): State<AppState>,
	Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
	match crate::apis::orders::list_orders(query, &state.machine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order listing failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
	match crate::apis::orders::create_order(request, &state.machine).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Order creation failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order(
	Path(id): Path<String>,
	Query(query): Query<ViewQuery>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, ApiError> {
	match crate::apis::orders::get_order(&id, query, &state.machine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/orders/{id}/status requests.
async fn handle_update_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
	match crate::apis::orders::update_status(&id, request, &state.machine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Status update failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/orders/{id}/accept requests.
async fn handle_accept_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<AcceptOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
	match crate::apis::orders::accept_order(&id, request, &state.machine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order accept failed: {}", e);
			Err(e)
		},
	}
}
