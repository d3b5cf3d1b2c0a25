//! Order lifecycle module for the Orderly platform.
//!
//! This is the single source of truth for which order-state transitions
//! are legal. The same transition tables serve every surface: the admin
//! back office, the restaurant kitchen app, and the delivery rider app
//! each operate through a role view that restricts the visible state
//! subset, instead of maintaining their own hand-written switch
//! statements.
//!
//! The validation functions in [`view`] are pure: they perform no I/O and
//! never log. [`machine`] wires them to the order repository, gating every
//! persistence write behind the apply-if-legal contract.

use orderly_types::{OrderState, Role};
use thiserror::Error;

pub mod machine;
pub mod view;

pub use machine::{OrderStateError, OrderStateMachine};
pub use view::{
	apply_transition, color_tag_for, initial_state, label_for, legal_next_states, states_for,
	ColorTag,
};

/// Errors that can occur when validating a lifecycle operation.
///
/// All variants are value-level results returned to the caller; the
/// lifecycle never retries and never panics.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
	/// The caller passed a state outside the role's enumeration.
	#[error("state {state} is not part of the {role} view")]
	InvalidStateForRole { role: Role, state: OrderState },
	/// A label or color lookup was requested for a state the role does
	/// not register.
	#[error("no label or color registered for state {0}")]
	UnknownState(OrderState),
	/// The requested transition is not in the legal next-state set.
	#[error("illegal transition from {from} to {to}")]
	Illegal { from: OrderState, to: OrderState },
	/// A concurrent accept on the same order won first.
	#[error("order was already accepted by another rider")]
	AlreadyAccepted,
}
