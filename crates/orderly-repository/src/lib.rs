//! Data-access module for the Orderly platform.
//!
//! This module defines the order repository the lifecycle logic consumes as
//! its data-access collaborator: reading order records, listing them with
//! filters and pagination, and writing status changes under a conditional
//! single-writer-wins discipline.
//!
//! Two implementations are provided: one backed by the key-value storage
//! service, and a fixture repository seeded with canned rows for tests and
//! development configurations.

use async_trait::async_trait;
use orderly_types::{Order, OrderState};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod fixture;
	pub mod storage;
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
	/// Error that occurs when the requested order does not exist.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// Error that occurs when a conditional status write loses against a
	/// concurrent writer.
	#[error("Conflict on order {order_id}: status no longer {expected}")]
	Conflict {
		order_id: String,
		expected: OrderState,
	},
	/// Error that occurs when an order id is created twice.
	#[error("Order already exists: {0}")]
	AlreadyExists(String),
	/// Error that occurs in the underlying storage.
	#[error("Storage error: {0}")]
	Storage(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Filter criteria for listing orders.
///
/// All criteria are conjunctive; an empty filter matches every order. The
/// rider-visible pending pool is `status = pending` with no rider filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
	/// Match orders in this status.
	pub status: Option<OrderState>,
	/// Match orders placed by this customer.
	pub customer_id: Option<String>,
	/// Match orders placed with this restaurant.
	pub restaurant_id: Option<String>,
	/// Match orders carried by this rider.
	pub rider_id: Option<String>,
}

impl OrderFilter {
	/// Checks whether an order satisfies every set criterion.
	pub fn matches(&self, order: &Order) -> bool {
		if let Some(status) = self.status {
			if order.status != status {
				return false;
			}
		}
		if let Some(customer_id) = &self.customer_id {
			if &order.customer_id != customer_id {
				return false;
			}
		}
		if let Some(restaurant_id) = &self.restaurant_id {
			if &order.restaurant_id != restaurant_id {
				return false;
			}
		}
		if let Some(rider_id) = &self.rider_id {
			if order.rider_id.as_ref() != Some(rider_id) {
				return false;
			}
		}
		true
	}
}

/// Offset/limit pagination window for order listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
	/// Number of matching orders to skip.
	pub offset: usize,
	/// Maximum number of orders to return.
	pub limit: usize,
}

impl Default for Page {
	fn default() -> Self {
		Self {
			offset: 0,
			limit: 50,
		}
	}
}

/// Sorts and windows a list of matching orders.
///
/// Orders are sorted by creation time (newest first), with the id as a
/// tie-breaker so pagination is stable.
pub fn paginate(mut orders: Vec<Order>, page: &Page) -> Vec<Order> {
	orders.sort_by(|a, b| {
		b.created_at
			.cmp(&a.created_at)
			.then_with(|| a.id.cmp(&b.id))
	});
	orders.into_iter().skip(page.offset).take(page.limit).collect()
}

/// Trait defining the interface for order repositories.
///
/// Status writes are conditional: they carry the status the caller
/// observed, and the repository applies the write only if the stored
/// record still holds it. This is the compare-and-swap that makes rider
/// acceptance exclusive.
#[async_trait]
pub trait OrderRepository: Send + Sync {
	/// Persists a new order. Fails if the id already exists.
	async fn create_order(&self, order: &Order) -> Result<(), RepositoryError>;

	/// Retrieves an order by id.
	async fn get_order(&self, id: &str) -> Result<Order, RepositoryError>;

	/// Lists orders matching the filter, windowed by the page.
	async fn list_orders(
		&self,
		filter: &OrderFilter,
		page: &Page,
	) -> Result<Vec<Order>, RepositoryError>;

	/// Moves an order from `expected` to `requested` status.
	///
	/// The write is applied only if the stored status still equals
	/// `expected`; otherwise `RepositoryError::Conflict` is returned and
	/// nothing is persisted. On success `updated_at` is refreshed, and
	/// `delivered_at` is set once when `requested` is a delivery-success
	/// terminal state.
	async fn update_order_status(
		&self,
		id: &str,
		expected: OrderState,
		requested: OrderState,
	) -> Result<Order, RepositoryError>;

	/// Assigns an order to a rider, moving it from pending to accepted.
	///
	/// Applied only if the stored status is still pending; the first
	/// accept wins and later attempts receive `RepositoryError::Conflict`.
	/// On success the rider id and `accepted_at` are set once.
	async fn accept_order(&self, id: &str, rider_id: &str) -> Result<Order, RepositoryError>;
}

/// Applies a status change to an in-memory order record.
///
/// Shared by the repository implementations so both persist identical
/// write-once timestamp semantics.
pub fn apply_status(order: &mut Order, requested: OrderState) {
	order.status = requested;
	order.updated_at = chrono::Utc::now();

	if matches!(requested, OrderState::Delivered | OrderState::Completed)
		&& order.delivered_at.is_none()
	{
		order.delivered_at = Some(order.updated_at);
	}
}

/// Applies a rider acceptance to an in-memory order record.
pub fn apply_acceptance(order: &mut Order, rider_id: &str) {
	order.status = OrderState::Accepted;
	order.rider_id = Some(rider_id.to_string());
	order.updated_at = chrono::Utc::now();
	if order.accepted_at.is_none() {
		order.accepted_at = Some(order.updated_at);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderly_types::LineItem;

	fn order(id: &str, status: OrderState) -> Order {
		Order::new(
			id,
			"cust-1",
			"rest-1",
			vec![LineItem::new("Ramen", 1, 13.00)],
			status,
		)
	}

	#[test]
	fn test_filter_matches_conjunctively() {
		let mut o = order("ord-1", OrderState::Pending);
		o.rider_id = Some("rider-7".into());

		let filter = OrderFilter {
			status: Some(OrderState::Pending),
			rider_id: Some("rider-7".into()),
			..Default::default()
		};
		assert!(filter.matches(&o));

		let other_rider = OrderFilter {
			rider_id: Some("rider-8".into()),
			..Default::default()
		};
		assert!(!other_rider.matches(&o));

		assert!(OrderFilter::default().matches(&o));
	}

	#[test]
	fn test_paginate_is_stable() {
		let orders: Vec<Order> = (0..5)
			.map(|i| order(&format!("ord-{}", i), OrderState::Pending))
			.collect();

		let first = paginate(
			orders.clone(),
			&Page {
				offset: 0,
				limit: 2,
			},
		);
		let second = paginate(
			orders.clone(),
			&Page {
				offset: 2,
				limit: 2,
			},
		);
		assert_eq!(first.len(), 2);
		assert_eq!(second.len(), 2);
		for o in &second {
			assert!(!first.iter().any(|f| f.id == o.id));
		}
	}

	#[test]
	fn test_apply_status_sets_delivered_at_once() {
		let mut o = order("ord-1", OrderState::OnTheWay);
		apply_status(&mut o, OrderState::Delivered);
		let first = o.delivered_at.expect("delivered_at set");

		apply_status(&mut o, OrderState::Delivered);
		assert_eq!(o.delivered_at, Some(first));
	}

	#[test]
	fn test_apply_acceptance_sets_rider_and_timestamp() {
		let mut o = order("ord-1", OrderState::Pending);
		apply_acceptance(&mut o, "rider-3");
		assert_eq!(o.status, OrderState::Accepted);
		assert_eq!(o.rider_id.as_deref(), Some("rider-3"));
		assert!(o.accepted_at.is_some());
	}
}
