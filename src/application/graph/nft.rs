//! NFT1 child parent resolution.

use crate::domain::models::SlpTransactionType;
use crate::utils::logging::{log_info, log_warning};

use super::GraphCore;

/// Resolve the group token an NFT1 child belongs to. The child's genesis
/// burns one output of the group token in its first input, so the burned
/// transaction either names the group in its own details or is the group
/// genesis itself. Resolution failures are logged and non-fatal.
pub(super) async fn resolve_nft_parent(core: &GraphCore, token_id: &str) -> Option<String> {
    let genesis_hex = match core.oracle.raw_transactions(&[token_id.to_string()]).await {
        Ok(mut hexes) if !hexes.is_empty() => hexes.remove(0),
        Ok(_) => {
            log_warning(&format!(
                "No raw genesis transaction for NFT child {}",
                token_id
            ));
            return None;
        }
        Err(e) => {
            log_warning(&format!(
                "Raw genesis fetch failed for NFT child {}: {}",
                token_id, e
            ));
            return None;
        }
    };
    let genesis = match core.decoder.decode_transaction(&genesis_hex) {
        Ok(decoded) => decoded,
        Err(e) => {
            log_warning(&format!(
                "Genesis decode failed for NFT child {}: {}",
                token_id, e
            ));
            return None;
        }
    };
    let Some(burn_input) = genesis.inputs.first() else {
        log_warning(&format!("NFT child genesis {} has no inputs", token_id));
        return None;
    };
    let burn_txid = burn_input.prev_txid.clone();

    let mut validation = core.oracle.validation(&burn_txid).await;
    if validation.is_none() {
        if let Err(e) = core.oracle.is_valid(&burn_txid, token_id).await {
            log_warning(&format!(
                "Validity check failed for NFT burn transaction {}: {}",
                burn_txid, e
            ));
        }
        validation = core.oracle.validation(&burn_txid).await;
    }
    let Some(details) = validation.and_then(|v| v.details) else {
        log_warning(&format!(
            "No token details for NFT burn transaction {}",
            burn_txid
        ));
        return None;
    };

    let parent_id = if details.transaction_type == SlpTransactionType::Genesis {
        burn_txid
    } else {
        details.token_id
    };
    log_info(&format!(
        "Resolved NFT group {} for child token {}",
        parent_id, token_id
    ));
    Some(parent_id)
}
