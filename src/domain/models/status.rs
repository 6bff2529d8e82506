use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a token-bearing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenUtxoStatus {
    /// Still spendable according to the node
    Unspent,
    /// Spent by a valid SEND of the same token
    SpentSameToken,
    /// Spent by a valid SLP transaction of a different token
    SpentWrongToken,
    /// Spent by a valid SLP transaction that is not a SEND
    SpentNotInSend,
    /// Spent by a transaction carrying no SLP data
    SpentNonSlp,
    /// Spent by an invalid SLP transaction
    SpentInvalidSlp,
    /// The token output has no corresponding BCH output
    MissingBchVout,
    /// Synthetic entry recording input quantity exceeding outputs
    ExcessInputBurned,
}

impl TokenUtxoStatus {
    /// True while the output remains part of the live UTXO set
    pub fn is_live(&self) -> bool {
        matches!(self, TokenUtxoStatus::Unspent)
    }
}

impl fmt::Display for TokenUtxoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenUtxoStatus::Unspent => "UNSPENT",
            TokenUtxoStatus::SpentSameToken => "SPENT_SAME_TOKEN",
            TokenUtxoStatus::SpentWrongToken => "SPENT_WRONG_TOKEN",
            TokenUtxoStatus::SpentNotInSend => "SPENT_NOT_IN_SEND",
            TokenUtxoStatus::SpentNonSlp => "SPENT_NON_SLP",
            TokenUtxoStatus::SpentInvalidSlp => "SPENT_INVALID_SLP",
            TokenUtxoStatus::MissingBchVout => "MISSING_BCH_VOUT",
            TokenUtxoStatus::ExcessInputBurned => "EXCESS_INPUT_BURNED",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a minting-baton output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatonUtxoStatus {
    /// Baton still spendable according to the node
    BatonUnspent,
    /// Baton consumed by a valid MINT of the same token
    BatonSpentInMint,
    /// Baton consumed by a valid SLP transaction that is not a MINT
    BatonSpentNotInMint,
    /// Baton consumed by a transaction carrying no SLP data
    BatonSpentNonSlp,
    /// Baton consumed by an invalid SLP transaction
    BatonSpentInvalidSlp,
    /// The baton output has no corresponding BCH output
    BatonMissingBchVout,
}

impl BatonUtxoStatus {
    /// True while the baton remains part of the live UTXO set
    pub fn is_live(&self) -> bool {
        matches!(self, BatonUtxoStatus::BatonUnspent)
    }
}

impl fmt::Display for BatonUtxoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatonUtxoStatus::BatonUnspent => "BATON_UNSPENT",
            BatonUtxoStatus::BatonSpentInMint => "BATON_SPENT_IN_MINT",
            BatonUtxoStatus::BatonSpentNotInMint => "BATON_SPENT_NOT_IN_MINT",
            BatonUtxoStatus::BatonSpentNonSlp => "BATON_SPENT_NON_SLP",
            BatonUtxoStatus::BatonSpentInvalidSlp => "BATON_SPENT_INVALID_SLP",
            BatonUtxoStatus::BatonMissingBchVout => "BATON_MISSING_BCH_VOUT",
        };
        write!(f, "{}", s)
    }
}

/// Status of any graph output, discriminated by output kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputStatus {
    Token(TokenUtxoStatus),
    Baton(BatonUtxoStatus),
}

impl OutputStatus {
    /// True while the output remains part of the live UTXO set
    pub fn is_live(&self) -> bool {
        match self {
            OutputStatus::Token(s) => s.is_live(),
            OutputStatus::Baton(s) => s.is_live(),
        }
    }

    /// True for minting-baton outputs
    pub fn is_baton(&self) -> bool {
        matches!(self, OutputStatus::Baton(_))
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStatus::Token(s) => write!(f, "{}", s),
            OutputStatus::Baton(s) => write!(f, "{}", s),
        }
    }
}

/// Lifecycle of a token's minting baton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenBatonStatus {
    /// The genesis never created a baton
    NeverCreated,
    /// A live baton output exists
    Alive,
    /// The baton was destroyed by a non-mint spend
    DeadBurned,
    /// The most recent valid MINT declared no successor baton
    DeadEnded,
}
