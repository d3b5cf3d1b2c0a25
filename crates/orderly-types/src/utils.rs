//! Display formatting helpers.
//!
//! Pure functions used by the UI-facing surfaces to render order age and
//! money amounts. Malformed input never fails; it clamps to a neutral
//! rendering ("just now" / "$0.00").

use chrono::{DateTime, Utc};

/// Formats the age of an order as a humanized string.
///
/// Returns "just now" for anything under a minute, then minute, hour and
/// day granularity. Timestamps in the future clamp to "just now".
pub fn elapsed_time(created_at: DateTime<Utc>) -> String {
	elapsed_time_at(created_at, Utc::now())
}

/// Formats the age of an order relative to an explicit reference time.
pub fn elapsed_time_at(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
	let elapsed = now.signed_duration_since(created_at);
	let seconds = elapsed.num_seconds();

	if seconds < 60 {
		// Covers future timestamps as well, since those go negative
		return "just now".to_string();
	}

	let minutes = seconds / 60;
	if minutes < 60 {
		return format!("{}m ago", minutes);
	}

	let hours = minutes / 60;
	if hours < 24 {
		return format!("{}h ago", hours);
	}

	format!("{}d ago", hours / 24)
}

/// Formats a money amount for display, e.g. "$12.50".
///
/// Negative or non-finite amounts clamp to "$0.00".
pub fn format_currency(amount: f64) -> String {
	if !amount.is_finite() || amount < 0.0 {
		return "$0.00".to_string();
	}
	format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	#[test]
	fn test_elapsed_time_buckets() {
		let now = Utc::now();
		assert_eq!(elapsed_time_at(now, now), "just now");
		assert_eq!(elapsed_time_at(now - Duration::seconds(59), now), "just now");
		assert_eq!(elapsed_time_at(now - Duration::seconds(60), now), "1m ago");
		assert_eq!(elapsed_time_at(now - Duration::minutes(45), now), "45m ago");
		assert_eq!(elapsed_time_at(now - Duration::hours(3), now), "3h ago");
		assert_eq!(elapsed_time_at(now - Duration::days(12), now), "12d ago");
	}

	#[test]
	fn test_elapsed_time_future_clamps() {
		let now = Utc::now();
		assert_eq!(elapsed_time_at(now + Duration::hours(2), now), "just now");
	}

	#[test]
	fn test_format_currency() {
		assert_eq!(format_currency(12.5), "$12.50");
		assert_eq!(format_currency(0.0), "$0.00");
		assert_eq!(format_currency(1999.999), "$2000.00");
	}

	#[test]
	fn test_format_currency_clamps_bad_input() {
		assert_eq!(format_currency(-4.20), "$0.00");
		assert_eq!(format_currency(f64::NAN), "$0.00");
		assert_eq!(format_currency(f64::INFINITY), "$0.00");
	}
}
