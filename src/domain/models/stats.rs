use crate::domain::models::status::TokenBatonStatus;

/// Balance a single address holds in one token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressBalance {
    /// Token quantity across live UTXOs, in base units
    pub token_balance: u128,
    /// Satoshis locked in those UTXOs
    pub satoshis_balance: u64,
}

/// Derived statistics of one token, recomputed wholesale by each
/// statistics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStats {
    /// Height of the block containing the genesis transaction
    pub block_created: Option<u64>,
    /// Height of the most recent block containing a valid SEND
    pub block_last_active_send: Option<u64>,
    /// Height of the most recent block containing a valid MINT
    pub block_last_active_mint: Option<u64>,
    /// Valid transactions graphed since genesis
    pub qty_valid_txns_since_genesis: u64,
    /// Live token UTXOs
    pub qty_valid_token_utxos: u64,
    /// Addresses holding live outputs
    pub qty_valid_token_addresses: u64,
    /// Total quantity created by the genesis and all valid MINTs
    pub qty_token_minted: u128,
    /// Minted quantity no longer circulating
    pub qty_token_burned: u128,
    /// Sum of all address balances
    pub qty_token_circulating_supply: u128,
    /// Satoshis locked in live token UTXOs
    pub qty_satoshis_locked_up: u64,
    /// Minting-baton lifecycle
    pub minting_baton_status: TokenBatonStatus,
}

impl Default for TokenStats {
    fn default() -> Self {
        Self {
            block_created: None,
            block_last_active_send: None,
            block_last_active_mint: None,
            qty_valid_txns_since_genesis: 0,
            qty_valid_token_utxos: 0,
            qty_valid_token_addresses: 0,
            qty_token_minted: 0,
            qty_token_burned: 0,
            qty_token_circulating_supply: 0,
            qty_satoshis_locked_up: 0,
            minting_baton_status: TokenBatonStatus::NeverCreated,
        }
    }
}
