//! Order types for the Orderly platform.
//!
//! This module defines the order record and the closed order-state
//! enumeration used throughout the lifecycle. The enumeration is the union
//! of the states visible across all role views; each role view restricts
//! itself to a subset of these values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an order, across all role views.
///
/// This is the full state union. No single actor ever sees all of these;
/// the lifecycle module projects the legal subset per role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
	/// Order has been placed and awaits confirmation or acceptance.
	Pending,
	/// Freshly received order in the restaurant kitchen view.
	New,
	/// Order confirmed by the back office.
	Confirmed,
	/// Order accepted (by the kitchen or by a rider, depending on view).
	Accepted,
	/// Kitchen is preparing the order.
	Preparing,
	/// Rider has arrived at the restaurant.
	ReachedRestaurant,
	/// Order is ready for pickup.
	Ready,
	/// Rider has picked up the order.
	PickedUp,
	/// Order is being delivered (back-office wording).
	InTransit,
	/// Order is being delivered (rider wording).
	OnTheWay,
	/// Order has reached the customer.
	Delivered,
	/// Kitchen-side completion of an order.
	Completed,
	/// Order was cancelled.
	Cancelled,
	/// Kitchen rejected the order.
	Rejected,
	/// Payment was refunded after cancellation.
	Refunded,
}

impl OrderState {
	/// Returns the wire representation of the state.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderState::Pending => "pending",
			OrderState::New => "new",
			OrderState::Confirmed => "confirmed",
			OrderState::Accepted => "accepted",
			OrderState::Preparing => "preparing",
			OrderState::ReachedRestaurant => "reached_restaurant",
			OrderState::Ready => "ready",
			OrderState::PickedUp => "picked_up",
			OrderState::InTransit => "in_transit",
			OrderState::OnTheWay => "on_the_way",
			OrderState::Delivered => "delivered",
			OrderState::Completed => "completed",
			OrderState::Cancelled => "cancelled",
			OrderState::Rejected => "rejected",
			OrderState::Refunded => "refunded",
		}
	}
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for OrderState {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"new" => Ok(Self::New),
			"confirmed" => Ok(Self::Confirmed),
			"accepted" => Ok(Self::Accepted),
			"preparing" => Ok(Self::Preparing),
			"reached_restaurant" => Ok(Self::ReachedRestaurant),
			"ready" => Ok(Self::Ready),
			"picked_up" => Ok(Self::PickedUp),
			"in_transit" => Ok(Self::InTransit),
			"on_the_way" => Ok(Self::OnTheWay),
			"delivered" => Ok(Self::Delivered),
			"completed" => Ok(Self::Completed),
			"cancelled" => Ok(Self::Cancelled),
			"rejected" => Ok(Self::Rejected),
			"refunded" => Ok(Self::Refunded),
			other => Err(format!("unknown order state: {}", other)),
		}
	}
}

/// A single line item on an order.
///
/// Line items are inert data; no lifecycle invariant depends on them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
	/// Menu item name.
	pub name: String,
	/// Number of units ordered.
	pub quantity: u32,
	/// Price of a single unit.
	pub unit_price: f64,
}

impl LineItem {
	/// Creates a new line item.
	pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
		Self {
			name: name.into(),
			quantity,
			unit_price,
		}
	}

	/// Total price for this line.
	pub fn total(&self) -> f64 {
		self.unit_price * self.quantity as f64
	}
}

/// An order record as held by the persistence layer.
///
/// The record owns no lifecycle logic itself; it is mutated only through
/// the transition-validation contract in the lifecycle crate. The
/// `accepted_at` and `delivered_at` timestamps are set exactly once when
/// the corresponding transition fires and are immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
	/// Unique identifier, assigned at creation and never reused.
	pub id: String,
	/// Current status. Exactly one value at any instant.
	pub status: OrderState,
	/// Customer who placed the order.
	pub customer_id: String,
	/// Restaurant the order was placed with.
	pub restaurant_id: String,
	/// Rider carrying the order, set when a rider accepts it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rider_id: Option<String>,
	/// Ordered line items.
	pub items: Vec<LineItem>,
	/// Total order amount.
	pub total: f64,
	/// Timestamp when this order was created. Immutable.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
	/// Timestamp of the accept transition, set once.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accepted_at: Option<DateTime<Utc>>,
	/// Timestamp of the delivery-terminal transition, set once.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Creates a new order in the given initial state.
	///
	/// The total is derived from the line items; `created_at` and
	/// `updated_at` are both set to the current time.
	pub fn new(
		id: impl Into<String>,
		customer_id: impl Into<String>,
		restaurant_id: impl Into<String>,
		items: Vec<LineItem>,
		initial: OrderState,
	) -> Self {
		let now = Utc::now();
		let total = items.iter().map(LineItem::total).sum();
		Self {
			id: id.into(),
			status: initial,
			customer_id: customer_id.into(),
			restaurant_id: restaurant_id.into(),
			rider_id: None,
			items,
			total,
			created_at: now,
			updated_at: now,
			accepted_at: None,
			delivered_at: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_round_trip() {
		for state in [
			OrderState::Pending,
			OrderState::ReachedRestaurant,
			OrderState::OnTheWay,
			OrderState::Refunded,
		] {
			assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
		}
	}

	#[test]
	fn test_state_serde_uses_snake_case() {
		let json = serde_json::to_string(&OrderState::PickedUp).unwrap();
		assert_eq!(json, "\"picked_up\"");
		let back: OrderState = serde_json::from_str("\"in_transit\"").unwrap();
		assert_eq!(back, OrderState::InTransit);
	}

	#[test]
	fn test_unknown_state_is_rejected() {
		assert!("teleported".parse::<OrderState>().is_err());
	}

	#[test]
	fn test_order_total_from_items() {
		let order = Order::new(
			"ord-1",
			"cust-1",
			"rest-1",
			vec![
				LineItem::new("Pad Thai", 2, 11.50),
				LineItem::new("Spring Rolls", 1, 4.00),
			],
			OrderState::Pending,
		);
		assert_eq!(order.total, 27.00);
		assert_eq!(order.created_at, order.updated_at);
		assert!(order.rider_id.is_none());
		assert!(order.accepted_at.is_none());
	}
}
