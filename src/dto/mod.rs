use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod categories;
pub mod images;
pub mod pages;
pub mod products;
pub mod users;

/// Distinguishes "field absent" (leave as is) from an explicit JSON null
/// (clear the column). Pair with `#[serde(default)]` on the field.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
