mod common;

use common::{mint_details, send_details, txid, TokenWorld};
use slp_indexer::config::GraphConfig;
use slp_indexer::domain::models::{outpoint_key, BatonUtxoStatus, TokenUtxoStatus};
use slp_indexer::domain::services::SpendResolver;

fn resolver(world: &TokenWorld, token_id: &str) -> SpendResolver {
    resolver_with(world, token_id, &GraphConfig::default())
}

fn resolver_with(world: &TokenWorld, token_id: &str, config: &GraphConfig) -> SpendResolver {
    SpendResolver::new(
        token_id.to_string(),
        world.node.clone(),
        world.spend_index.clone(),
        world.oracle.clone(),
        world.sync.clone(),
        config,
    )
}

#[tokio::test]
async fn startup_preload_answers_before_the_node() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let spender = txid(0x02);
    let outpoint = outpoint_key(&token_id, 1);

    // The node still carries the UTXO; only the preload knows the spend
    world.node.add_utxo(&outpoint, 546, 1);
    world
        .spend_index
        .preload_send_spend(&outpoint, &spender, Some(50), Some("h50"));
    world
        .oracle
        .add_validation(&spender, true, Some(send_details(&token_id, &[600])), None);

    let mut resolver = resolver(&world, &token_id);
    let loaded = resolver.preload().await.expect("preload");
    assert_eq!(loaded, 1);

    let details = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(details.status, TokenUtxoStatus::SpentSameToken);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(details.invalid_reason, None);

    // Without the preload the node's UTXO set answers first
    resolver.drop_startup_cache();
    let after = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(after.status, TokenUtxoStatus::Unspent);
    assert_eq!(after.spend_txid, None);
}

#[tokio::test]
async fn mature_spends_survive_index_loss_through_the_live_cache() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let spender = txid(0x02);
    let outpoint = outpoint_key(&token_id, 1);

    // Eleven blocks behind tip 100, one past the maturity depth of ten
    world
        .spend_index
        .record_send_spend(&outpoint, &spender, Some(89), Some("h89"));
    world
        .oracle
        .add_validation(&spender, true, Some(send_details(&token_id, &[600])), None);

    let mut resolver = resolver(&world, &token_id);
    let first = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(first.status, TokenUtxoStatus::SpentSameToken);

    world.spend_index.remove_send_spend(&outpoint);
    let cached = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(cached.status, TokenUtxoStatus::SpentSameToken);
    assert_eq!(cached.spend_txid.as_deref(), Some(spender.as_str()));

    resolver.clear_live_cache();
    let cleared = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(cleared.status, TokenUtxoStatus::SpentNonSlp);
    assert_eq!(cleared.spend_txid, None);
}

#[tokio::test]
async fn immature_and_mempool_spends_are_not_cached() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let confirmed_spender = txid(0x02);
    let mempool_spender = txid(0x03);
    let confirmed = outpoint_key(&token_id, 1);
    let unconfirmed = outpoint_key(&token_id, 2);

    // Exactly at the maturity depth: ten blocks behind tip 100 is too young
    world
        .spend_index
        .record_send_spend(&confirmed, &confirmed_spender, Some(90), Some("h90"));
    world
        .spend_index
        .record_send_spend(&unconfirmed, &mempool_spender, None, None);
    world.oracle.add_validation(
        &confirmed_spender,
        true,
        Some(send_details(&token_id, &[600])),
        None,
    );
    world.oracle.add_validation(
        &mempool_spender,
        true,
        Some(send_details(&token_id, &[400])),
        None,
    );

    let mut resolver = resolver(&world, &token_id);
    let first = resolver.token_spend(&token_id, 1, 3, None).await;
    assert_eq!(first.status, TokenUtxoStatus::SpentSameToken);
    let second = resolver.token_spend(&token_id, 2, 3, None).await;
    assert_eq!(second.status, TokenUtxoStatus::SpentSameToken);

    // An index that forgets the spends exposes the missing cache entries
    world.spend_index.remove_send_spend(&confirmed);
    world.spend_index.remove_send_spend(&unconfirmed);
    let first = resolver.token_spend(&token_id, 1, 3, None).await;
    assert_eq!(first.status, TokenUtxoStatus::SpentNonSlp);
    let second = resolver.token_spend(&token_id, 2, 3, None).await;
    assert_eq!(second.status, TokenUtxoStatus::SpentNonSlp);
}

#[tokio::test]
async fn live_cache_evicts_the_oldest_entry_at_capacity() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let first_spender = txid(0x02);
    let second_spender = txid(0x03);
    let first = outpoint_key(&token_id, 1);
    let second = outpoint_key(&token_id, 2);

    world
        .spend_index
        .record_send_spend(&first, &first_spender, Some(80), Some("h80"));
    world
        .spend_index
        .record_send_spend(&second, &second_spender, Some(80), Some("h80"));
    world.oracle.add_validation(
        &first_spender,
        true,
        Some(send_details(&token_id, &[600])),
        None,
    );
    world.oracle.add_validation(
        &second_spender,
        true,
        Some(send_details(&token_id, &[400])),
        None,
    );

    let config = GraphConfig {
        spend_cache_capacity: 1,
        ..GraphConfig::default()
    };
    let mut resolver = resolver_with(&world, &token_id, &config);
    let warm = resolver.token_spend(&token_id, 1, 3, None).await;
    assert_eq!(warm.status, TokenUtxoStatus::SpentSameToken);
    let warm = resolver.token_spend(&token_id, 2, 3, None).await;
    assert_eq!(warm.status, TokenUtxoStatus::SpentSameToken);

    world.spend_index.remove_send_spend(&first);
    world.spend_index.remove_send_spend(&second);

    let evicted = resolver.token_spend(&token_id, 1, 3, None).await;
    assert_eq!(evicted.status, TokenUtxoStatus::SpentNonSlp);
    let kept = resolver.token_spend(&token_id, 2, 3, None).await;
    assert_eq!(kept.status, TokenUtxoStatus::SpentSameToken);
    assert_eq!(kept.spend_txid.as_deref(), Some(second_spender.as_str()));
}

#[tokio::test]
async fn committed_vout_without_a_bch_output_reads_missing_vout() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);

    // SLP commits to vout 5 but the raw transaction only has three outputs
    let mut resolver = resolver(&world, &token_id);
    let details = resolver.token_spend(&token_id, 5, 3, None).await;
    assert_eq!(details.status, TokenUtxoStatus::MissingBchVout);
    assert_eq!(details.spend_txid, None);
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("SLP output has no corresponding BCH output.")
    );
}

#[tokio::test]
async fn token_output_consumed_by_a_valid_mint_reads_not_in_send() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let minter = txid(0x02);
    let outpoint = outpoint_key(&token_id, 1);

    world
        .spend_index
        .record_send_spend(&outpoint, &minter, Some(50), Some("h50"));
    world.oracle.add_validation(
        &minter,
        true,
        Some(mint_details(&token_id, 500, Some(2))),
        None,
    );

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(details.status, TokenUtxoStatus::SpentNotInSend);
    assert_eq!(details.spend_txid.as_deref(), Some(minter.as_str()));
    assert_eq!(details.invalid_reason, None);
}

#[tokio::test]
async fn spender_valid_for_another_token_reads_wrong_token() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let other_token = txid(0x77);
    let spender = txid(0x02);
    let outpoint = outpoint_key(&token_id, 1);

    world
        .spend_index
        .record_send_spend(&outpoint, &spender, Some(50), Some("h50"));
    world.oracle.add_validation(
        &spender,
        true,
        Some(send_details(&other_token, &[600])),
        None,
    );

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(details.status, TokenUtxoStatus::SpentWrongToken);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(details.invalid_reason, None);
}

#[tokio::test]
async fn invalid_spender_carries_its_own_reason() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let spender = txid(0x02);
    let outpoint = outpoint_key(&token_id, 1);

    world
        .spend_index
        .record_send_spend(&outpoint, &spender, Some(50), Some("h50"));
    world.oracle.add_validation(
        &spender,
        false,
        None,
        Some("Token outputs exceed valid token inputs."),
    );

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.token_spend(&token_id, 1, 2, None).await;
    assert_eq!(details.status, TokenUtxoStatus::SpentInvalidSlp);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("Token outputs exceed valid token inputs.")
    );
}

#[tokio::test]
async fn missing_spender_verdict_falls_back_to_the_owners_reason() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let owner = txid(0x04);
    let spender = txid(0x02);
    let outpoint = outpoint_key(&owner, 1);

    // The spender was never judged; the owner's own verdict explains it
    world
        .spend_index
        .record_send_spend(&outpoint, &spender, Some(50), Some("h50"));
    world
        .oracle
        .add_validation(&owner, false, None, Some("Owner failed validation."));

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.token_spend(&owner, 1, 2, None).await;
    assert_eq!(details.status, TokenUtxoStatus::SpentInvalidSlp);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("Owner failed validation.")
    );
}

#[tokio::test]
async fn baton_resolution_maps_node_and_index_answers() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let minter = txid(0x02);

    // vout 2 still sits in the node's UTXO set
    world.node.add_utxo(&outpoint_key(&token_id, 2), 546, 1);
    // vout 3 vanished without any recorded mint
    // vout 4 was consumed by a valid mint
    world
        .spend_index
        .record_mint_spend(&outpoint_key(&token_id, 4), &minter, Some(50), Some("h50"));
    world.oracle.add_validation(
        &minter,
        true,
        Some(mint_details(&token_id, 500, Some(2))),
        None,
    );

    let mut resolver = resolver(&world, &token_id);

    let unspent = resolver.baton_spend(&token_id, 2, 5, None).await;
    assert_eq!(unspent.status, BatonUtxoStatus::BatonUnspent);
    assert_eq!(unspent.spend_txid, None);

    let non_slp = resolver.baton_spend(&token_id, 3, 5, None).await;
    assert_eq!(non_slp.status, BatonUtxoStatus::BatonSpentNonSlp);
    assert_eq!(non_slp.spend_txid, None);

    let minted = resolver.baton_spend(&token_id, 4, 5, None).await;
    assert_eq!(minted.status, BatonUtxoStatus::BatonSpentInMint);
    assert_eq!(minted.spend_txid.as_deref(), Some(minter.as_str()));
    assert_eq!(minted.invalid_reason, None);
}

#[tokio::test]
async fn committed_baton_vout_without_a_bch_output_reads_missing_vout() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);

    // SLP commits the baton to vout 5 but the raw transaction only has three outputs
    let mut resolver = resolver(&world, &token_id);
    let details = resolver.baton_spend(&token_id, 5, 3, None).await;
    assert_eq!(details.status, BatonUtxoStatus::BatonMissingBchVout);
    assert_eq!(details.spend_txid, None);
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("SLP output has no corresponding BCH output.")
    );
}

#[tokio::test]
async fn baton_spent_outside_a_mint_carries_the_reason() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let spender = txid(0x02);

    world
        .spend_index
        .record_mint_spend(&outpoint_key(&token_id, 2), &spender, Some(50), Some("h50"));
    world
        .oracle
        .add_validation(&spender, true, Some(send_details(&token_id, &[600])), None);

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.baton_spend(&token_id, 2, 3, None).await;
    assert_eq!(details.status, BatonUtxoStatus::BatonSpentNotInMint);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("Baton was spent in a non-mint SLP transaction.")
    );
}

#[tokio::test]
async fn invalid_baton_spender_carries_its_own_reason() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let spender = txid(0x02);

    world
        .spend_index
        .record_mint_spend(&outpoint_key(&token_id, 2), &spender, Some(50), Some("h50"));
    world
        .oracle
        .add_validation(&spender, false, None, Some("Mint baton input missing."));

    let mut resolver = resolver(&world, &token_id);
    let details = resolver.baton_spend(&token_id, 2, 3, None).await;
    assert_eq!(details.status, BatonUtxoStatus::BatonSpentInvalidSlp);
    assert_eq!(details.spend_txid.as_deref(), Some(spender.as_str()));
    assert_eq!(
        details.invalid_reason.as_deref(),
        Some("Mint baton input missing.")
    );
}

#[tokio::test]
async fn replay_ceiling_hides_token_and_baton_spends() {
    let world = TokenWorld::new();
    let token_id = txid(0x01);
    let sender = txid(0x02);
    let minter = txid(0x03);
    let mempool_spender = txid(0x05);

    world
        .spend_index
        .record_send_spend(&outpoint_key(&token_id, 1), &sender, Some(20), Some("h20"));
    world
        .spend_index
        .record_send_spend(&outpoint_key(&token_id, 3), &mempool_spender, None, None);
    world
        .spend_index
        .record_mint_spend(&outpoint_key(&token_id, 2), &minter, Some(20), Some("h20"));
    world
        .oracle
        .add_validation(&sender, true, Some(send_details(&token_id, &[600])), None);
    world.oracle.add_validation(
        &mempool_spender,
        true,
        Some(send_details(&token_id, &[400])),
        None,
    );
    world.oracle.add_validation(
        &minter,
        true,
        Some(mint_details(&token_id, 500, Some(2))),
        None,
    );

    let mut resolver = resolver(&world, &token_id);

    // Below the ceiling the block-20 spends have not happened yet
    let hidden = resolver.token_spend(&token_id, 1, 4, Some(15)).await;
    assert_eq!(hidden.status, TokenUtxoStatus::Unspent);
    let hidden_baton = resolver.baton_spend(&token_id, 2, 4, Some(15)).await;
    assert_eq!(hidden_baton.status, BatonUtxoStatus::BatonUnspent);

    // A mempool spend stays hidden under any ceiling
    let unconfirmed = resolver.token_spend(&token_id, 3, 4, Some(99)).await;
    assert_eq!(unconfirmed.status, TokenUtxoStatus::Unspent);

    // At the ceiling they count
    let seen = resolver.token_spend(&token_id, 1, 4, Some(20)).await;
    assert_eq!(seen.status, TokenUtxoStatus::SpentSameToken);
    let seen_baton = resolver.baton_spend(&token_id, 2, 4, Some(20)).await;
    assert_eq!(seen_baton.status, BatonUtxoStatus::BatonSpentInMint);

    // Unbounded resolution picks the mempool spend up
    let live = resolver.token_spend(&token_id, 3, 4, None).await;
    assert_eq!(live.status, TokenUtxoStatus::SpentSameToken);
    assert_eq!(live.spend_txid.as_deref(), Some(mempool_spender.as_str()));
}
