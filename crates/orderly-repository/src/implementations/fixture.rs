//! Fixture order repository.
//!
//! An in-memory repository seeded with canned order rows. This is the
//! test-fixture replacement for the mock-data fallback the data layer used
//! to carry: development configurations select it explicitly instead of
//! silently falling back when no real store is reachable.

use crate::{
	apply_acceptance, apply_status, paginate, OrderFilter, OrderRepository, Page, RepositoryError,
};
use async_trait::async_trait;
use orderly_types::{LineItem, Order, OrderState};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory repository with optional canned seed data.
///
/// Conditional writes hold the write lock across the compare and the
/// swap, so acceptance exclusivity behaves exactly as in the
/// storage-backed repository.
pub struct FixtureOrderRepository {
	orders: RwLock<HashMap<String, Order>>,
}

impl FixtureOrderRepository {
	/// Creates an empty fixture repository.
	pub fn empty() -> Self {
		Self {
			orders: RwLock::new(HashMap::new()),
		}
	}

	/// Creates a fixture repository seeded with canned rows.
	pub fn seeded() -> Self {
		let rows = [
			Order::new(
				"ord-1001",
				"cust-alice",
				"rest-noodle-house",
				vec![
					LineItem::new("Pad See Ew", 1, 12.00),
					LineItem::new("Thai Iced Tea", 2, 3.50),
				],
				OrderState::Pending,
			),
			Order::new(
				"ord-1002",
				"cust-bob",
				"rest-noodle-house",
				vec![LineItem::new("Green Curry", 1, 14.50)],
				OrderState::Pending,
			),
			Order::new(
				"ord-1003",
				"cust-carol",
				"rest-taqueria",
				vec![LineItem::new("Tacos al Pastor", 3, 4.25)],
				OrderState::Preparing,
			),
			Order::new(
				"ord-1004",
				"cust-alice",
				"rest-taqueria",
				vec![LineItem::new("Quesadilla", 1, 9.00)],
				OrderState::Delivered,
			),
		];

		let mut orders = HashMap::new();
		for row in rows {
			orders.insert(row.id.clone(), row);
		}
		Self {
			orders: RwLock::new(orders),
		}
	}
}

#[async_trait]
impl OrderRepository for FixtureOrderRepository {
	async fn create_order(&self, order: &Order) -> Result<(), RepositoryError> {
		let mut orders = self.orders.write().await;
		if orders.contains_key(&order.id) {
			return Err(RepositoryError::AlreadyExists(order.id.clone()));
		}
		orders.insert(order.id.clone(), order.clone());
		Ok(())
	}

	async fn get_order(&self, id: &str) -> Result<Order, RepositoryError> {
		let orders = self.orders.read().await;
		orders
			.get(id)
			.cloned()
			.ok_or_else(|| RepositoryError::NotFound(id.to_string()))
	}

	async fn list_orders(
		&self,
		filter: &OrderFilter,
		page: &Page,
	) -> Result<Vec<Order>, RepositoryError> {
		let orders = self.orders.read().await;
		let matching = orders
			.values()
			.filter(|o| filter.matches(o))
			.cloned()
			.collect();
		Ok(paginate(matching, page))
	}

	async fn update_order_status(
		&self,
		id: &str,
		expected: OrderState,
		requested: OrderState,
	) -> Result<Order, RepositoryError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(id)
			.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

		if order.status != expected {
			return Err(RepositoryError::Conflict {
				order_id: id.to_string(),
				expected,
			});
		}

		apply_status(order, requested);
		Ok(order.clone())
	}

	async fn accept_order(&self, id: &str, rider_id: &str) -> Result<Order, RepositoryError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(id)
			.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

		if order.status != OrderState::Pending {
			return Err(RepositoryError::Conflict {
				order_id: id.to_string(),
				expected: OrderState::Pending,
			});
		}

		apply_acceptance(order, rider_id);
		Ok(order.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_seeded_rows_are_present() {
		let repo = FixtureOrderRepository::seeded();
		let all = repo
			.list_orders(&OrderFilter::default(), &Page::default())
			.await
			.unwrap();
		assert_eq!(all.len(), 4);

		let pending = repo
			.list_orders(
				&OrderFilter {
					status: Some(OrderState::Pending),
					..Default::default()
				},
				&Page::default(),
			)
			.await
			.unwrap();
		assert_eq!(pending.len(), 2);
	}

	#[tokio::test]
	async fn test_accept_removes_order_from_pending_pool() {
		let repo = FixtureOrderRepository::seeded();
		repo.accept_order("ord-1001", "rider-1").await.unwrap();

		let pending = repo
			.list_orders(
				&OrderFilter {
					status: Some(OrderState::Pending),
					..Default::default()
				},
				&Page::default(),
			)
			.await
			.unwrap();
		assert!(!pending.iter().any(|o| o.id == "ord-1001"));
	}

	#[tokio::test]
	async fn test_conflicting_update_is_rejected() {
		let repo = FixtureOrderRepository::seeded();
		let result = repo
			.update_order_status("ord-1003", OrderState::Pending, OrderState::Cancelled)
			.await;
		assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
	}
}
