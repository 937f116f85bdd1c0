pub mod caching;
pub mod coingecko;
pub mod cryptocompare;
pub mod currency_api;
pub mod symbols;

pub(crate) const USER_AGENT: &str = concat!("cryptocast/", env!("CARGO_PKG_VERSION"));
