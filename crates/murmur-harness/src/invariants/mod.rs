//! Invariant checking for store state.
//!
//! Invariants are properties that must hold after every store operation,
//! whatever sequence of stream events, REST completions and optimistic sends
//! led there. Tests run a registry after each step instead of asserting a
//! particular outcome.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&store, "after reconnect");
//! ```

mod checks;

pub use checks::{MessageBound, OrderedIndex, SentHasNoError, UniqueNonces};
use murmur_store::SyncStore;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of store state that must always hold.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the store.
    fn check(&self, store: &SyncStore) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with the store's structural invariants:
    ///
    /// - [`MessageBound`]: per-channel count within the configured bound
    /// - [`OrderedIndex`]: ordered ids sorted, unique and complete
    /// - [`UniqueNonces`]: no two records in a channel share a nonce
    /// - [`SentHasNoError`]: confirmed records carry no error text
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(MessageBound);
        registry.add(OrderedIndex);
        registry.add(UniqueNonces);
        registry.add(SentHasNoError);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants. Returns every violation found.
    pub fn check_all(&self, store: &SyncStore) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(store).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, store: &SyncStore, context: &str) {
        if let Err(violations) = self.check_all(store) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
