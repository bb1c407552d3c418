//! In-memory order service for the call-center agent.
//!
//! Orders live in an [`OrderBook`] owned by a single call. The first time a
//! caller asks about a `(user_id, order_id)` pair the book invents a
//! plausible order from the [`Catalog`]; afterwards every operation sees the
//! same order, so a caller can check an order, then cancel or edit it within
//! the same call.
//!
//! Every mutating operation is gated on [`OrderStatus`]: only orders that are
//! still being prepared can be cancelled or changed. Refusals are not errors;
//! they come back as outcomes carrying the Japanese message the agent reads
//! to the caller.
//!
//! [`OrderStatus`]: orderdesk_types::OrderStatus

mod book;
mod catalog;
mod order;

pub use book::{CancelOutcome, OrderBook, UpdateOutcome};
pub use catalog::{Catalog, Product};
pub use order::{Order, OrderItem};
