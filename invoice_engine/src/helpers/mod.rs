mod token_units;

pub use token_units::{to_smallest_units, TokenDecimals, TokenUnitsError, DEFAULT_TOKEN_DECIMALS};
