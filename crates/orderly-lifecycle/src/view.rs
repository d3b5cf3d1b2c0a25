//! Role-view transition tables and projections.
//!
//! Each role view is a closed enumeration over the order-state union, a
//! transition table from current state to the ordered legal next states,
//! and total label/color projections for display. Everything here is a
//! pure lookup; persistence is the caller's concern.

use crate::TransitionError;
use once_cell::sync::Lazy;
use orderly_types::{OrderState, Role};
use std::collections::HashMap;
use std::fmt;

use OrderState::*;

/// The nine-state back-office view.
const ADMIN_STATES: &[OrderState] = &[
	Pending, Confirmed, Preparing, Ready, PickedUp, InTransit, Delivered, Cancelled, Refunded,
];

/// The six-state kitchen-facing view.
const RESTAURANT_STATES: &[OrderState] = &[New, Accepted, Preparing, Ready, Completed, Rejected];

/// The seven-state delivery-facing view.
const RIDER_STATES: &[OrderState] = &[
	Pending,
	Accepted,
	ReachedRestaurant,
	PickedUp,
	OnTheWay,
	Delivered,
	Cancelled,
];

const ADMIN_TERMINAL: &[OrderState] = &[Delivered, Cancelled, Refunded];
const RESTAURANT_TERMINAL: &[OrderState] = &[Completed, Rejected];
const RIDER_TERMINAL: &[OrderState] = &[Delivered, Cancelled];

/// Static transition table - each (role, state) maps to the ordered legal
/// next states. Terminal states are present with an empty list, so the
/// table's key set is exactly each role's enumeration.
static TRANSITIONS: Lazy<HashMap<(Role, OrderState), Vec<OrderState>>> = Lazy::new(|| {
	let mut m = HashMap::new();

	// Admin override is deliberately permissive: any non-terminal state
	// may move to any other state in the admin enumeration, which
	// includes cancellation from everywhere except the terminal states.
	for &state in ADMIN_STATES {
		let next = if ADMIN_TERMINAL.contains(&state) {
			Vec::new()
		} else {
			ADMIN_STATES
				.iter()
				.copied()
				.filter(|&s| s != state)
				.collect()
		};
		m.insert((Role::Admin, state), next);
	}

	// Restaurant kitchen: strict single path with an up-front reject.
	m.insert((Role::Restaurant, New), vec![Accepted, Rejected]);
	m.insert((Role::Restaurant, Accepted), vec![Preparing]);
	m.insert((Role::Restaurant, Preparing), vec![Ready]);
	m.insert((Role::Restaurant, Ready), vec![Completed]);
	m.insert((Role::Restaurant, Completed), Vec::new());
	m.insert((Role::Restaurant, Rejected), Vec::new());

	// Rider: strict single path with a cancel escape hatch after accept.
	m.insert((Role::Rider, Pending), vec![Accepted]);
	m.insert((Role::Rider, Accepted), vec![ReachedRestaurant, Cancelled]);
	m.insert((Role::Rider, ReachedRestaurant), vec![PickedUp, Cancelled]);
	m.insert((Role::Rider, PickedUp), vec![OnTheWay, Cancelled]);
	m.insert((Role::Rider, OnTheWay), vec![Delivered, Cancelled]);
	m.insert((Role::Rider, Delivered), Vec::new());
	m.insert((Role::Rider, Cancelled), Vec::new());

	m
});

/// Returns the closed state enumeration for a role view.
pub fn states_for(role: Role) -> &'static [OrderState] {
	match role {
		Role::Admin => ADMIN_STATES,
		Role::Restaurant => RESTAURANT_STATES,
		Role::Rider => RIDER_STATES,
	}
}

/// Returns the state a newly created order starts in for a role view.
pub fn initial_state(role: Role) -> OrderState {
	match role {
		Role::Admin | Role::Rider => Pending,
		Role::Restaurant => New,
	}
}

/// Returns the ordered legal next states for `current` under `role`.
///
/// Terminal states return an empty slice. Fails with
/// `InvalidStateForRole` when `current` is outside the role's enumeration.
pub fn legal_next_states(
	role: Role,
	current: OrderState,
) -> Result<&'static [OrderState], TransitionError> {
	TRANSITIONS
		.get(&(role, current))
		.map(Vec::as_slice)
		.ok_or(TransitionError::InvalidStateForRole {
			role,
			state: current,
		})
}

/// Validates a requested transition without performing it.
///
/// Returns the state the order should move to, or an error describing why
/// the request is not legal. Re-requesting the state the order is already
/// in succeeds as a no-op, so retrying clients observe at-most-once
/// semantics.
pub fn apply_transition(
	role: Role,
	current: OrderState,
	requested: OrderState,
) -> Result<OrderState, TransitionError> {
	let legal = legal_next_states(role, current)?;
	if !states_for(role).contains(&requested) {
		return Err(TransitionError::InvalidStateForRole {
			role,
			state: requested,
		});
	}

	if current == requested {
		// Idempotent re-apply: success with no further effect
		return Ok(current);
	}

	if legal.contains(&requested) {
		Ok(requested)
	} else {
		Err(TransitionError::Illegal {
			from: current,
			to: requested,
		})
	}
}

/// Symbolic color key for rendering a state.
///
/// The UI maps these to its own palette; the key itself is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTag {
	Gray,
	Blue,
	Amber,
	Purple,
	Indigo,
	Teal,
	Green,
	Red,
	Orange,
}

impl ColorTag {
	/// Returns the wire representation of the color tag.
	pub fn as_str(&self) -> &'static str {
		match self {
			ColorTag::Gray => "gray",
			ColorTag::Blue => "blue",
			ColorTag::Amber => "amber",
			ColorTag::Purple => "purple",
			ColorTag::Indigo => "indigo",
			ColorTag::Teal => "teal",
			ColorTag::Green => "green",
			ColorTag::Red => "red",
			ColorTag::Orange => "orange",
		}
	}
}

impl fmt::Display for ColorTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Returns the human-readable label for a state under a role view.
///
/// Total over the role's enumeration; fails with `UnknownState` for any
/// state outside it.
pub fn label_for(role: Role, state: OrderState) -> Result<&'static str, TransitionError> {
	if !states_for(role).contains(&state) {
		return Err(TransitionError::UnknownState(state));
	}
	Ok(match state {
		Pending => "Pending",
		New => "New order",
		Confirmed => "Confirmed",
		Accepted => "Accepted",
		Preparing => "Preparing",
		ReachedRestaurant => "At restaurant",
		Ready => "Ready for pickup",
		PickedUp => "Picked up",
		InTransit => "In transit",
		OnTheWay => "On the way",
		Delivered => "Delivered",
		Completed => "Completed",
		Cancelled => "Cancelled",
		Rejected => "Rejected",
		Refunded => "Refunded",
	})
}

/// Returns the symbolic color key for a state under a role view.
///
/// Total over the role's enumeration; fails with `UnknownState` for any
/// state outside it.
pub fn color_tag_for(role: Role, state: OrderState) -> Result<ColorTag, TransitionError> {
	if !states_for(role).contains(&state) {
		return Err(TransitionError::UnknownState(state));
	}
	Ok(match state {
		Pending | New => ColorTag::Gray,
		Confirmed | Accepted => ColorTag::Blue,
		Preparing | ReachedRestaurant => ColorTag::Amber,
		Ready => ColorTag::Purple,
		PickedUp => ColorTag::Indigo,
		InTransit | OnTheWay => ColorTag::Teal,
		Delivered | Completed => ColorTag::Green,
		Cancelled | Rejected => ColorTag::Red,
		Refunded => ColorTag::Orange,
	})
}
