pub mod api;
pub(crate) mod decode;
pub mod error;
pub mod types;
pub mod units;

#[cfg(test)]
mod test_util;

pub use api::{AddressQuery, BalanceKind, InsightClient, InsightClientBuilder, PageWindow};
pub use error::{ApiError, DecodeError, InsightError};
