//! Level state store
//!
//! A keyed publish/subscribe registry shared by every event, action and
//! phase of a running level. Values are last-write-wins; listeners are
//! notified synchronously in subscription order.
//!
//! # Architecture
//!
//! - [`StateKey`]: Newtype key with the well-known game keys as constants
//! - [`Value`]: Closed set of value shapes a key can hold or carry
//! - [`StateStore`]: Value map plus listener fan-out
//! - [`StateListener`]: Capability implemented by anything that subscribes

pub mod key;
pub mod store;
pub mod value;

pub use key::StateKey;
pub use store::{StateListener, StateStore};
pub use value::{Bounds, EntitySnapshot, Point, Value};
