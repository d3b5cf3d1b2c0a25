//! Storage-backed order state machine.
//!
//! Wires the pure transition validation to the order repository: every
//! status write is gated by `apply_transition`, and the write itself is
//! conditional on the status the caller observed, so concurrent writers
//! resolve to a single winner at the persistence boundary.

use crate::view::apply_transition;
use crate::TransitionError;
use orderly_repository::{OrderFilter, OrderRepository, Page, RepositoryError};
use orderly_types::{Order, OrderState, Role};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while driving an order through its lifecycle.
#[derive(Debug, Error)]
pub enum OrderStateError {
	/// The requested transition failed validation.
	#[error(transparent)]
	Transition(#[from] TransitionError),
	/// The order does not exist.
	#[error("order not found: {0}")]
	NotFound(String),
	/// The repository failed for a reason other than a lost race.
	#[error("repository error: {0}")]
	Repository(String),
}

impl From<RepositoryError> for OrderStateError {
	fn from(e: RepositoryError) -> Self {
		match e {
			RepositoryError::NotFound(id) => Self::NotFound(id),
			other => Self::Repository(other.to_string()),
		}
	}
}

/// Manages order state transitions and persistence.
///
/// The machine owns no data; the repository is injected and holds the
/// records. All methods are safe to retry: a request that has already
/// been applied reports success without a second write.
pub struct OrderStateMachine {
	repository: Arc<dyn OrderRepository>,
}

impl OrderStateMachine {
	pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
		Self { repository }
	}

	/// Persists a newly created order.
	pub async fn submit_order(&self, order: Order) -> Result<Order, OrderStateError> {
		self.repository.create_order(&order).await?;
		Ok(order)
	}

	/// Gets an order by id.
	pub async fn order(&self, id: &str) -> Result<Order, OrderStateError> {
		Ok(self.repository.get_order(id).await?)
	}

	/// Lists orders matching the filter, windowed by the page.
	pub async fn orders(
		&self,
		filter: &OrderFilter,
		page: &Page,
	) -> Result<Vec<Order>, OrderStateError> {
		Ok(self.repository.list_orders(filter, page).await?)
	}

	/// Transitions an order to a new status on behalf of a role.
	///
	/// The transition is validated against the role's table before any
	/// write. The write is conditional on the observed status; if a
	/// concurrent writer got there first, the request is re-validated
	/// against the new status rather than blindly retried.
	///
	/// Rider acceptance is not reachable through this path: it carries
	/// an owning rider id and goes through [`Self::accept_order`].
	pub async fn transition_order(
		&self,
		role: Role,
		order_id: &str,
		requested: OrderState,
	) -> Result<Order, OrderStateError> {
		let order = self.repository.get_order(order_id).await?;

		// The plain status path must not produce an accepted order with
		// no rider attached
		if role == Role::Rider && requested == OrderState::Accepted && order.status != requested {
			return Err(TransitionError::Illegal {
				from: order.status,
				to: requested,
			}
			.into());
		}

		apply_transition(role, order.status, requested)?;

		if order.status == requested {
			// Already applied; no further effect
			return Ok(order);
		}

		match self
			.repository
			.update_order_status(order_id, order.status, requested)
			.await
		{
			Ok(updated) => Ok(updated),
			Err(RepositoryError::Conflict { .. }) => {
				let current = self.repository.get_order(order_id).await?;
				if current.status == requested {
					// A concurrent retry of the same request won
					Ok(current)
				} else {
					Err(TransitionError::Illegal {
						from: current.status,
						to: requested,
					}
					.into())
				}
			},
			Err(e) => Err(e.into()),
		}
	}

	/// Accepts a pending order on behalf of a rider.
	///
	/// Acceptance is exclusive: the first rider to accept owns the order,
	/// and every other concurrent attempt fails with `AlreadyAccepted`.
	/// Re-accepting an order the same rider already owns is a no-op.
	pub async fn accept_order(
		&self,
		order_id: &str,
		rider_id: &str,
	) -> Result<Order, OrderStateError> {
		let order = self.repository.get_order(order_id).await?;

		if order.status == OrderState::Accepted {
			return if order.rider_id.as_deref() == Some(rider_id) {
				Ok(order)
			} else {
				Err(TransitionError::AlreadyAccepted.into())
			};
		}

		apply_transition(Role::Rider, order.status, OrderState::Accepted)?;

		match self.repository.accept_order(order_id, rider_id).await {
			Ok(accepted) => Ok(accepted),
			Err(RepositoryError::Conflict { .. }) => {
				let current = self.repository.get_order(order_id).await?;
				match current.status {
					OrderState::Accepted if current.rider_id.as_deref() == Some(rider_id) => {
						Ok(current)
					},
					OrderState::Accepted => Err(TransitionError::AlreadyAccepted.into()),
					other => Err(TransitionError::Illegal {
						from: other,
						to: OrderState::Accepted,
					}
					.into()),
				}
			},
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderly_repository::implementations::storage::StorageOrderRepository;
	use orderly_storage::implementations::memory::MemoryStorage;
	use orderly_storage::StorageService;
	use orderly_types::LineItem;

	fn machine() -> OrderStateMachine {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		let repository = StorageOrderRepository::new(Arc::new(storage));
		OrderStateMachine::new(Arc::new(repository))
	}

	fn order(id: &str, status: OrderState) -> Order {
		Order::new(
			id,
			"cust-1",
			"rest-1",
			vec![LineItem::new("Bibimbap", 1, 15.00)],
			status,
		)
	}

	#[tokio::test]
	async fn test_restaurant_path_end_to_end() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::New))
			.await
			.unwrap();

		for next in [
			OrderState::Accepted,
			OrderState::Preparing,
			OrderState::Ready,
			OrderState::Completed,
		] {
			let updated = machine
				.transition_order(Role::Restaurant, "ord-1", next)
				.await
				.unwrap();
			assert_eq!(updated.status, next);
		}

		let stored = machine.order("ord-1").await.unwrap();
		assert_eq!(stored.status, OrderState::Completed);
		assert!(stored.delivered_at.is_some());
	}

	#[tokio::test]
	async fn test_illegal_transition_persists_nothing() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::New))
			.await
			.unwrap();

		let result = machine
			.transition_order(Role::Restaurant, "ord-1", OrderState::Preparing)
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::Transition(TransitionError::Illegal { .. }))
		));

		let stored = machine.order("ord-1").await.unwrap();
		assert_eq!(stored.status, OrderState::New);
	}

	#[tokio::test]
	async fn test_reapplied_transition_is_a_no_op() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::New))
			.await
			.unwrap();

		let first = machine
			.transition_order(Role::Restaurant, "ord-1", OrderState::Accepted)
			.await
			.unwrap();
		let second = machine
			.transition_order(Role::Restaurant, "ord-1", OrderState::Accepted)
			.await
			.unwrap();

		assert_eq!(second.status, OrderState::Accepted);
		assert_eq!(second.updated_at, first.updated_at);
	}

	#[tokio::test]
	async fn test_concurrent_accept_has_exactly_one_winner() {
		let machine = Arc::new(machine());
		machine
			.submit_order(order("ord-1", OrderState::Pending))
			.await
			.unwrap();

		let m1 = Arc::clone(&machine);
		let m2 = Arc::clone(&machine);
		let a = tokio::spawn(async move { m1.accept_order("ord-1", "rider-a").await });
		let b = tokio::spawn(async move { m2.accept_order("ord-1", "rider-b").await });

		let results = [a.await.unwrap(), b.await.unwrap()];
		let winners = results.iter().filter(|r| r.is_ok()).count();
		assert_eq!(winners, 1, "exactly one rider must win the accept race");

		let loser = results.iter().find(|r| r.is_err()).unwrap();
		assert!(matches!(
			loser,
			Err(OrderStateError::Transition(TransitionError::AlreadyAccepted))
		));

		// The stored record belongs to the winning rider
		let stored = machine.order("ord-1").await.unwrap();
		assert_eq!(stored.status, OrderState::Accepted);
		let winner_rider = stored.rider_id.clone().unwrap();
		assert!(winner_rider == "rider-a" || winner_rider == "rider-b");
	}

	#[tokio::test]
	async fn test_re_accept_by_owner_is_idempotent() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::Pending))
			.await
			.unwrap();

		let first = machine.accept_order("ord-1", "rider-a").await.unwrap();
		let second = machine.accept_order("ord-1", "rider-a").await.unwrap();
		assert_eq!(first.accepted_at, second.accepted_at);

		let other = machine.accept_order("ord-1", "rider-b").await;
		assert!(matches!(
			other,
			Err(OrderStateError::Transition(TransitionError::AlreadyAccepted))
		));
	}

	#[tokio::test]
	async fn test_rider_acceptance_only_flows_through_accept() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::Pending))
			.await
			.unwrap();

		let result = machine
			.transition_order(Role::Rider, "ord-1", OrderState::Accepted)
			.await;
		assert!(matches!(
			result,
			Err(OrderStateError::Transition(TransitionError::Illegal { .. }))
		));

		let stored = machine.order("ord-1").await.unwrap();
		assert_eq!(stored.status, OrderState::Pending);
		assert!(stored.rider_id.is_none());

		// The accept path works, and re-requesting accepted as a status
		// afterwards stays an idempotent no-op
		machine.accept_order("ord-1", "rider-a").await.unwrap();
		let reapplied = machine
			.transition_order(Role::Rider, "ord-1", OrderState::Accepted)
			.await
			.unwrap();
		assert_eq!(reapplied.status, OrderState::Accepted);
		assert_eq!(reapplied.rider_id.as_deref(), Some("rider-a"));
	}

	#[tokio::test]
	async fn test_accept_requires_pending() {
		let machine = machine();
		machine
			.submit_order(order("ord-1", OrderState::Delivered))
			.await
			.unwrap();

		let result = machine.accept_order("ord-1", "rider-a").await;
		assert!(matches!(
			result,
			Err(OrderStateError::Transition(TransitionError::Illegal { .. }))
		));
	}

	#[tokio::test]
	async fn test_missing_order_is_reported() {
		let machine = machine();
		let result = machine
			.transition_order(Role::Admin, "ghost", OrderState::Confirmed)
			.await;
		assert!(matches!(result, Err(OrderStateError::NotFound(_))));
	}
}
