//! Core data models for the dataset builder.

mod dataset;
mod game;
mod steam_api;
mod tally;
mod user;

pub use dataset::*;
pub use game::*;
pub use steam_api::*;
pub use tally::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
