//! Ticker symbol to CoinGecko id lookup.

use crate::core::error::CoreError;

const SYMBOL_IDS: &[(&str, &str)] = &[
    ("aave", "aave"),
    ("ada", "cardano"),
    ("algo", "algorand"),
    ("apt", "aptos"),
    ("arb", "arbitrum"),
    ("atom", "cosmos"),
    ("avax", "avalanche-2"),
    ("bch", "bitcoin-cash"),
    ("bnb", "binancecoin"),
    ("btc", "bitcoin"),
    ("dai", "dai"),
    ("doge", "dogecoin"),
    ("dot", "polkadot"),
    ("etc", "ethereum-classic"),
    ("eth", "ethereum"),
    ("fil", "filecoin"),
    ("hbar", "hedera-hashgraph"),
    ("icp", "internet-computer"),
    ("link", "chainlink"),
    ("ltc", "litecoin"),
    ("matic", "matic-network"),
    ("near", "near"),
    ("op", "optimism"),
    ("pepe", "pepe"),
    ("shib", "shiba-inu"),
    ("sol", "solana"),
    ("sui", "sui"),
    ("ton", "the-open-network"),
    ("trx", "tron"),
    ("uni", "uniswap"),
    ("usdc", "usd-coin"),
    ("usdt", "tether"),
    ("vet", "vechain"),
    ("xlm", "stellar"),
    ("xmr", "monero"),
    ("xrp", "ripple"),
    ("xtz", "tezos"),
];

/// Returns the provider id for a ticker symbol, ignoring case and
/// surrounding whitespace.
pub fn lookup(symbol: &str) -> Result<&'static str, CoreError> {
    let needle = symbol.trim().to_lowercase();
    SYMBOL_IDS
        .binary_search_by(|(s, _)| (*s).cmp(needle.as_str()))
        .map(|i| SYMBOL_IDS[i].1)
        .map_err(|_| CoreError::UnsupportedSymbol(symbol.trim().to_uppercase()))
}
