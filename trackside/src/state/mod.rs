//! Driver state store.
//!
//! The single source of truth for reconciled race state. [`RaceState`] is a
//! reducer: every feed message is folded in with [`RaceState::apply`] (or the
//! pure [`reduce`]), and everything downstream reads from the result.
//!
//! # Example
//!
//! ```ignore
//! use trackside::feed::decode_frame;
//! use trackside::state::RaceState;
//!
//! let mut state = RaceState::new();
//! if let Ok(msg) = decode_frame(raw) {
//!     state.apply(&msg);
//! }
//! for driver in state.drivers() {
//!     println!("{} {:.2} km", driver.code, driver.km);
//! }
//! ```

mod model;
mod store;

pub use model::DriverState;
pub use store::{reduce, RaceState, StateChange, DEFAULT_SERVER_ERROR};
