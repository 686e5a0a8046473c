mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;

use common::{addr, sponsor, MockLedger, TOKEN};
use settleflow::settlement::{
    ExecutionPath, NettingRetryOutcome, SettlementExecutor, SettlementPipeline,
};
use settleflow::split::SplitRule;
use settleflow::store::{
    InMemoryRepository, NettingRunStatus, Order, OrderStatus, SettlementRepository,
    TransactionStatus,
};

fn rules() -> Vec<SplitRule> {
    vec![
        SplitRule {
            address: addr(0xaaa),
            percent: 60.0,
            label: "Merchant".to_string(),
        },
        SplitRule {
            address: addr(0xbbb),
            percent: 25.0,
            label: "Platform Fee".to_string(),
        },
        SplitRule {
            address: addr(0xccc),
            percent: 15.0,
            label: "Creator".to_string(),
        },
    ]
}

#[tokio::test]
async fn atomic_path_settles_in_one_batch() {
    common::init_tracing();
    let client = Arc::new(MockLedger::new());
    let executor = SettlementExecutor::new(client.clone(), sponsor());

    let result = executor
        .execute("ord-11112222", 10_000, &rules(), TOKEN)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.path, Some(ExecutionPath::Atomic));
    assert_eq!(client.batch_calls(), 1);
    assert_eq!(client.transfer_calls(), 0);

    let amounts: Vec<u128> = result.splits.iter().map(|s| s.amount).collect();
    assert_eq!(amounts, vec![6_000, 2_500, 1_500]);

    // All legs land under the one batch hash
    let canonical = result.tx_hash.clone().unwrap();
    assert!(result.submitted.iter().all(|s| s.tx_hash == canonical));
}

#[tokio::test]
async fn batch_rejection_falls_back_to_sequential() {
    let client = Arc::new(MockLedger::new().reject_batches());
    let executor = SettlementExecutor::new(client.clone(), sponsor());

    let result = executor
        .execute("ord-33334444", 10_000, &rules(), TOKEN)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.path, Some(ExecutionPath::Sequential));
    assert_eq!(client.batch_calls(), 1);
    assert_eq!(client.transfer_calls(), 3);

    // Canonical reference is the first transfer's hash
    assert_eq!(
        result.tx_hash.as_deref(),
        Some(result.submitted[0].tx_hash.as_str())
    );
    assert_eq!(result.submitted.len(), 3);
}

#[tokio::test]
async fn partial_sequential_failure_carries_completed_prefix() {
    let client = Arc::new(
        MockLedger::new()
            .reject_batches()
            .fail_transfers_to(&addr(0xbbb)),
    );
    let executor = SettlementExecutor::new(client.clone(), sponsor());

    let result = executor
        .execute("ord-55556666", 10_000, &rules(), TOKEN)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.path, Some(ExecutionPath::Sequential));
    assert_eq!(result.tx_hash, None);
    // Only the leg before the failure reached the ledger
    assert_eq!(result.submitted.len(), 1);
    assert_eq!(result.submitted[0].to, addr(0xaaa));
    assert!(result.error.is_some());
    // Splits are preserved for the retry layer
    assert_eq!(result.splits.len(), 3);
}

#[tokio::test]
async fn invalid_split_config_submits_nothing() {
    let client = Arc::new(MockLedger::new());
    let executor = SettlementExecutor::new(client.clone(), sponsor());

    let bad_rules = vec![SplitRule {
        address: addr(0xaaa),
        percent: 85.0,
        label: "Merchant".to_string(),
    }];

    assert!(executor
        .execute("ord-77778888", 10_000, &bad_rules, TOKEN)
        .await
        .is_err());
    assert_eq!(client.batch_calls(), 0);
    assert_eq!(client.transfer_calls(), 0);
}

#[tokio::test]
async fn pipeline_settles_order_and_records_transactions() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.insert_order(Order::new("ord-aaaa1111", dec!(0.01), TOKEN));

    let client = Arc::new(MockLedger::new());
    let pipeline = SettlementPipeline::new(
        repo.clone(),
        SettlementExecutor::new(client, sponsor()),
    );

    let receipt = pipeline
        .settle_order("ord-aaaa1111", 10_000, &rules(), TOKEN)
        .await
        .unwrap();
    assert!(receipt.result.success);

    let order = repo.order("ord-aaaa1111").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Settled);

    let run = repo
        .latest_netting_run("ord-aaaa1111")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, NettingRunStatus::Completed);

    let txs = repo.run_transactions(run.id).await.unwrap();
    assert_eq!(txs.len(), 3);
    assert!(txs.iter().all(|t| t.status == TransactionStatus::Confirmed));
    assert_eq!(txs.iter().map(|t| t.amount).sum::<u128>(), 10_000);
}

#[tokio::test]
async fn pipeline_rejects_non_pending_orders() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut order = Order::new("ord-bbbb2222", dec!(0.01), TOKEN);
    order.status = OrderStatus::Settled;
    repo.insert_order(order);

    let pipeline = SettlementPipeline::new(
        repo,
        SettlementExecutor::new(Arc::new(MockLedger::new()), sponsor()),
    );

    assert!(pipeline
        .settle_order("ord-bbbb2222", 10_000, &rules(), TOKEN)
        .await
        .is_err());
}

#[tokio::test]
async fn failed_run_retries_only_the_failed_subset() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.insert_order(Order::new("ord-cccc3333", dec!(0.01), TOKEN));

    let client = Arc::new(
        MockLedger::new()
            .reject_batches()
            .fail_transfers_to(&addr(0xbbb)),
    );
    let pipeline = SettlementPipeline::new(
        repo.clone(),
        SettlementExecutor::new(client.clone(), sponsor()),
    );

    let receipt = pipeline
        .settle_order("ord-cccc3333", 10_000, &rules(), TOKEN)
        .await
        .unwrap();
    assert!(!receipt.result.success);

    let order = repo.order("ord-cccc3333").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    let txs = repo.run_transactions(receipt.run_id).await.unwrap();
    let failed_before: Vec<u128> = txs
        .iter()
        .filter(|t| t.status == TransactionStatus::Failed)
        .map(|t| t.amount)
        .collect();
    // 0xbbb failed outright, 0xccc was never reached
    assert_eq!(failed_before, vec![2_500, 1_500]);

    let paid_before = client.submissions().len();

    // The recipient's funding issue clears; operator triggers a rerun
    client.heal();
    let outcome = pipeline.retry_run(receipt.run_id).await.unwrap();
    match outcome {
        NettingRetryOutcome::Retried { retried_count, .. } => assert_eq!(retried_count, 2),
        other => panic!("expected retry to recover, got {:?}", other),
    }

    // Only the failed subset was resubmitted
    let resubmitted: Vec<u128> = client.submissions()[paid_before..]
        .iter()
        .map(|s| s.amount)
        .collect();
    assert_eq!(resubmitted, vec![2_500, 1_500]);

    let order = repo.order("ord-cccc3333").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Settled);

    let txs = repo.run_transactions(receipt.run_id).await.unwrap();
    assert!(txs.iter().all(|t| t.status == TransactionStatus::Confirmed));
}

#[tokio::test]
async fn completed_run_rejects_retry_as_noop() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.insert_order(Order::new("ord-dddd4444", dec!(0.01), TOKEN));

    let client = Arc::new(MockLedger::new());
    let pipeline = SettlementPipeline::new(
        repo.clone(),
        SettlementExecutor::new(client.clone(), sponsor()),
    );

    let receipt = pipeline
        .settle_order("ord-dddd4444", 10_000, &rules(), TOKEN)
        .await
        .unwrap();

    let calls_before = client.transfer_calls() + client.batch_calls();
    let outcome = pipeline.retry_run(receipt.run_id).await.unwrap();
    assert!(matches!(outcome, NettingRetryOutcome::AlreadyCompleted { .. }));
    assert_eq!(client.transfer_calls() + client.batch_calls(), calls_before);
}
