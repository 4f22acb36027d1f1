//! Domain types for the storefront.
//!
//! These are validated domain objects, kept separate from database row types
//! and from the JSON shapes the routes expose.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartLine, CartSnapshot};
pub use order::{Address, NewOrder, NewOrderItem, Order, OrderItem};
pub use product::ProductSummary;
pub use session::{CurrentShopper, session_keys};
pub use user::User;
