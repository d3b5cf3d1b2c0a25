//! Storage-backed order repository.
//!
//! Persists order records through the typed storage service under the
//! `orders` namespace. Conditional status writes are mapped onto the
//! storage layer's compare-and-swap, so exclusivity holds regardless of
//! which backend (memory or file) the service is configured with.

use crate::{
	apply_acceptance, apply_status, paginate, OrderFilter, OrderRepository, Page, RepositoryError,
};
use async_trait::async_trait;
use orderly_storage::{StorageError, StorageService};
use orderly_types::{Order, OrderState, StorageKey};
use std::sync::Arc;

/// Order repository backed by the key-value storage service.
pub struct StorageOrderRepository {
	storage: Arc<StorageService>,
}

impl StorageOrderRepository {
	/// Creates a new repository over the given storage service.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	fn namespace() -> &'static str {
		StorageKey::Orders.as_str()
	}

	fn map_not_found(id: &str, e: StorageError) -> RepositoryError {
		match e {
			StorageError::NotFound => RepositoryError::NotFound(id.to_string()),
			other => RepositoryError::Storage(other.to_string()),
		}
	}
}

#[async_trait]
impl OrderRepository for StorageOrderRepository {
	async fn create_order(&self, order: &Order) -> Result<(), RepositoryError> {
		self.storage
			.create(Self::namespace(), &order.id, order)
			.await
			.map_err(|e| match e {
				StorageError::Conflict => RepositoryError::AlreadyExists(order.id.clone()),
				other => RepositoryError::Storage(other.to_string()),
			})
	}

	async fn get_order(&self, id: &str) -> Result<Order, RepositoryError> {
		self.storage
			.retrieve(Self::namespace(), id)
			.await
			.map_err(|e| Self::map_not_found(id, e))
	}

	async fn list_orders(
		&self,
		filter: &OrderFilter,
		page: &Page,
	) -> Result<Vec<Order>, RepositoryError> {
		let orders: Vec<Order> = self
			.storage
			.retrieve_all(Self::namespace())
			.await
			.map_err(|e| RepositoryError::Storage(e.to_string()))?;

		let matching = orders.into_iter().filter(|o| filter.matches(o)).collect();
		Ok(paginate(matching, page))
	}

	async fn update_order_status(
		&self,
		id: &str,
		expected: OrderState,
		requested: OrderState,
	) -> Result<Order, RepositoryError> {
		let current = self.get_order(id).await?;
		if current.status != expected {
			return Err(RepositoryError::Conflict {
				order_id: id.to_string(),
				expected,
			});
		}

		let mut next = current.clone();
		apply_status(&mut next, requested);

		self.storage
			.update_if_matches(Self::namespace(), id, &current, &next)
			.await
			.map_err(|e| match e {
				StorageError::Conflict => RepositoryError::Conflict {
					order_id: id.to_string(),
					expected,
				},
				other => RepositoryError::Storage(other.to_string()),
			})?;

		Ok(next)
	}

	async fn accept_order(&self, id: &str, rider_id: &str) -> Result<Order, RepositoryError> {
		let current = self.get_order(id).await?;
		if current.status != OrderState::Pending {
			return Err(RepositoryError::Conflict {
				order_id: id.to_string(),
				expected: OrderState::Pending,
			});
		}

		let mut next = current.clone();
		apply_acceptance(&mut next, rider_id);

		self.storage
			.update_if_matches(Self::namespace(), id, &current, &next)
			.await
			.map_err(|e| match e {
				StorageError::Conflict => RepositoryError::Conflict {
					order_id: id.to_string(),
					expected: OrderState::Pending,
				},
				other => RepositoryError::Storage(other.to_string()),
			})?;

		tracing::debug!(order_id = %id, rider_id = %rider_id, "order accepted");
		Ok(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderly_storage::implementations::memory::MemoryStorage;
	use orderly_types::LineItem;

	fn repository() -> StorageOrderRepository {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		StorageOrderRepository::new(Arc::new(storage))
	}

	fn order(id: &str, status: OrderState) -> Order {
		Order::new(
			id,
			"cust-1",
			"rest-1",
			vec![LineItem::new("Gyoza", 2, 6.50)],
			status,
		)
	}

	#[tokio::test]
	async fn test_create_and_get() {
		let repo = repository();
		let o = order("ord-1", OrderState::Pending);
		repo.create_order(&o).await.unwrap();

		let back = repo.get_order("ord-1").await.unwrap();
		assert_eq!(back, o);

		assert!(matches!(
			repo.get_order("missing").await,
			Err(RepositoryError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_create_duplicate_id_fails() {
		let repo = repository();
		let o = order("ord-1", OrderState::Pending);
		repo.create_order(&o).await.unwrap();
		assert!(matches!(
			repo.create_order(&o).await,
			Err(RepositoryError::AlreadyExists(_))
		));
	}

	#[tokio::test]
	async fn test_list_with_filter_and_page() {
		let repo = repository();
		for i in 0..4 {
			repo.create_order(&order(&format!("ord-{}", i), OrderState::Pending))
				.await
				.unwrap();
		}
		repo.create_order(&order("ord-done", OrderState::Delivered))
			.await
			.unwrap();

		let filter = OrderFilter {
			status: Some(OrderState::Pending),
			..Default::default()
		};
		let all = repo.list_orders(&filter, &Page::default()).await.unwrap();
		assert_eq!(all.len(), 4);

		let window = repo
			.list_orders(
				&filter,
				&Page {
					offset: 2,
					limit: 10,
				},
			)
			.await
			.unwrap();
		assert_eq!(window.len(), 2);
	}

	#[tokio::test]
	async fn test_conditional_status_update() {
		let repo = repository();
		repo.create_order(&order("ord-1", OrderState::Pending))
			.await
			.unwrap();

		let updated = repo
			.update_order_status("ord-1", OrderState::Pending, OrderState::Confirmed)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderState::Confirmed);
		assert!(updated.updated_at >= updated.created_at);

		// A writer that still believes the order is pending must lose
		let stale = repo
			.update_order_status("ord-1", OrderState::Pending, OrderState::Cancelled)
			.await;
		assert!(matches!(stale, Err(RepositoryError::Conflict { .. })));
	}

	#[tokio::test]
	async fn test_accept_is_first_wins() {
		let repo = repository();
		repo.create_order(&order("ord-1", OrderState::Pending))
			.await
			.unwrap();

		let accepted = repo.accept_order("ord-1", "rider-1").await.unwrap();
		assert_eq!(accepted.status, OrderState::Accepted);
		assert_eq!(accepted.rider_id.as_deref(), Some("rider-1"));
		assert!(accepted.accepted_at.is_some());

		let lost = repo.accept_order("ord-1", "rider-2").await;
		assert!(matches!(lost, Err(RepositoryError::Conflict { .. })));

		// The stored record still belongs to the first rider
		let stored = repo.get_order("ord-1").await.unwrap();
		assert_eq!(stored.rider_id.as_deref(), Some("rider-1"));
	}
}
