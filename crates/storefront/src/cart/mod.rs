//! Cart state management.
//!
//! A shopper's cart lives in exactly one of two places: a guest cart held in
//! a single session slot, or persisted per-user rows once they are signed
//! in. [`facade::CartService`] is the only surface presentation code may
//! call; it hides which store is active, merges the guest cart into the
//! persisted one exactly once at sign-in ([`reconcile`]), serializes
//! mutations per owner, and publishes change notifications ([`notify`]).

pub mod facade;
pub mod guest;
pub mod notify;
pub mod reconcile;
pub mod store;

pub use facade::{CartBackend, CartError, CartService, OwnerLocks};
pub use guest::{GuestCartStore, MemoryGuestStore, SessionGuestStore};
pub use notify::{CartChanged, CartEvents, CartOwner};
pub use reconcile::MergeReport;
pub use store::{MemoryCartStore, PersistedCartStore};
