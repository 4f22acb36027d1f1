//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod status;
pub mod variant;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::OrderNumber;
pub use price::{CurrencyCode, Price};
pub use status::OrderStatus;
pub use variant::VariantSelection;
