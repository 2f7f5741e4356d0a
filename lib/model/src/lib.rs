//! The data model shared by every layer of the engine.
//!
//! Atoms and variables are plain 64-bit identifiers. The textual form of an atom lives in the
//! atom dictionary and never reaches the query engine itself.

mod binding;
mod components;
mod error;
mod item;
mod payload;
mod triple;

pub use binding::*;
pub use components::*;
pub use error::*;
pub use item::*;
pub use payload::*;
pub use triple::*;
