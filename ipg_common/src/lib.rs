mod usd_cents;

pub mod helpers;
pub mod op;
mod secret;

pub use secret::Secret;
pub use usd_cents::{UsdCents, UsdCentsConversionError};
