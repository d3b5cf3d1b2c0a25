//! Actor role views.
//!
//! A role view identifies which application surface is driving a request:
//! the admin back office, the restaurant kitchen app, or the delivery
//! rider app. The lifecycle module uses the role to select the visible
//! state subset and transition table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The actor on whose behalf a lifecycle operation is requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Back-office operator with the full nine-state view.
	Admin,
	/// Restaurant kitchen with the six-state kitchen-facing view.
	Restaurant,
	/// Delivery rider with the seven-state delivery-facing view.
	Rider,
}

impl Role {
	/// Returns the wire representation of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Restaurant => "restaurant",
			Role::Rider => "rider",
		}
	}

	/// Returns an iterator over all role views.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Admin, Self::Restaurant, Self::Rider].into_iter()
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Self::Admin),
			"restaurant" => Ok(Self::Restaurant),
			"rider" => Ok(Self::Rider),
			other => Err(format!("unknown role: {}", other)),
		}
	}
}
