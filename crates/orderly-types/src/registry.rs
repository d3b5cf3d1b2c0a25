//! Registry trait for self-registering implementations.
//!
//! Pluggable components (storage backends, repositories) register
//! themselves under the name used in the configuration file together with
//! a factory function that builds them from their TOML section.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct that
/// implements this trait, declaring its configuration name and factory.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example
	/// "memory" for storage.implementations.memory.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
