use serde::Deserialize;

use crate::ledger::SenderIdentity;

/// Default settlement token (AlphaUSD on the moderato testnet)
pub const ALPHA_USD: &str = "0x20c0000000000000000000000000000000000001";

/// Secondary stablecoin, accepted but not settled by default
pub const BETA_USD: &str = "0x20c0000000000000000000000000000000000002";

/// Fee-path token used by the sponsoring wallet
pub const PATH_USD: &str = "0x20c0000000000000000000000000000000000000";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub explorer_url: String,
    pub settlement_token: String,
    pub token_decimals: u32,
    pub sponsor_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            rpc_url: std::env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| "https://rpc.moderato.tempo.xyz".to_string()),
            explorer_url: std::env::var("LEDGER_EXPLORER_URL")
                .unwrap_or_else(|_| "https://explore.tempo.xyz".to_string()),
            settlement_token: std::env::var("SETTLEMENT_TOKEN")
                .unwrap_or_else(|_| ALPHA_USD.to_string()),
            token_decimals: std::env::var("SETTLEMENT_TOKEN_DECIMALS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
            sponsor_address: std::env::var("SPONSOR_ADDRESS").unwrap_or_default(),
        })
    }

    /// The fee-sponsoring identity all settlement submissions are signed as.
    pub fn sponsor_identity(&self) -> SenderIdentity {
        SenderIdentity::new(&self.sponsor_address)
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    pub fn explorer_address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }
}
