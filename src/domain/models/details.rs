use std::fmt;

/// SLP transaction type carried in the OP_RETURN token script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlpTransactionType {
    Genesis,
    Mint,
    Send,
}

impl fmt::Display for SlpTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlpTransactionType::Genesis => "GENESIS",
            SlpTransactionType::Mint => "MINT",
            SlpTransactionType::Send => "SEND",
        };
        write!(f, "{}", s)
    }
}

impl SlpTransactionType {
    /// Parse the wire form used by persisted token details
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "GENESIS" => Some(SlpTransactionType::Genesis),
            "MINT" => Some(SlpTransactionType::Mint),
            "SEND" => Some(SlpTransactionType::Send),
            _ => None,
        }
    }
}

/// SLP token version/type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlpVersionType {
    /// Fungible token (type 0x01)
    TokenType1,
    /// NFT1 group/parent token (type 0x81)
    Nft1Group,
    /// NFT1 child token (type 0x41)
    Nft1Child,
}

impl SlpVersionType {
    /// Numeric protocol code
    pub fn code(&self) -> u16 {
        match self {
            SlpVersionType::TokenType1 => 0x01,
            SlpVersionType::Nft1Group => 0x81,
            SlpVersionType::Nft1Child => 0x41,
        }
    }

    /// Parse the numeric protocol code
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x01 => Some(SlpVersionType::TokenType1),
            0x81 => Some(SlpVersionType::Nft1Group),
            0x41 => Some(SlpVersionType::Nft1Child),
            _ => None,
        }
    }
}

/// Decoded token details of one SLP transaction, produced by the validity
/// oracle's protocol decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct SlpTokenDetails {
    /// Transaction type declared by the token script
    pub transaction_type: SlpTransactionType,
    /// Token id (hex) this transaction belongs to
    pub token_id: String,
    /// Token version/type code
    pub version_type: SlpVersionType,
    /// Block timestamp, `YYYY-MM-DD HH:MM:SS`, if confirmed
    pub timestamp: Option<String>,
    /// Ticker symbol from the genesis script
    pub symbol: String,
    /// Token name from the genesis script
    pub name: String,
    /// Document URI from the genesis script
    pub document_uri: String,
    /// Document hash (hex) from the genesis script
    pub document_sha256_hex: Option<String>,
    /// Number of decimal places of the token quantity
    pub decimals: u8,
    /// Whether the genesis created a minting baton
    pub contains_baton: bool,
    /// Output index of the baton declared by a GENESIS or MINT
    pub baton_vout: Option<u32>,
    /// Quantity created by a GENESIS or MINT, in base units
    pub genesis_or_mint_quantity: Option<u64>,
    /// Per-vout quantities of a SEND (index 0 is the OP_RETURN slot)
    pub send_outputs: Option<Vec<u64>>,
}

impl SlpTokenDetails {
    /// Quantity assigned to `vout` by this transaction, in base units
    pub fn quantity_at(&self, vout: u32) -> u64 {
        match self.transaction_type {
            SlpTransactionType::Send => self
                .send_outputs
                .as_ref()
                .and_then(|outs| outs.get(vout as usize))
                .copied()
                .unwrap_or(0),
            SlpTransactionType::Genesis | SlpTransactionType::Mint => {
                if vout == 1 {
                    self.genesis_or_mint_quantity.unwrap_or(0)
                } else {
                    0
                }
            }
        }
    }
}
