//! Deposits, transfers and history against the in-memory store.

mod common;

use chrono::Duration;

use common::{harness, harness_with, op, units};
use ledgerguard_core::{AccountId, Amount};
use ledgerguard_infra::EngineConfig;
use ledgerguard_ledger::{HistoryFilter, LedgerError, TransactionKind};

#[tokio::test]
async fn deposit_credits_balance_and_records_one_transaction() {
    let h = harness().await;
    let account = h.account(500);

    let tx = h.engines.ledger().deposit(account.id, units(100)).await.unwrap();

    assert_eq!(h.balance(&account).await, units(600));
    assert_eq!(tx.kind, TransactionKind::Deposit);
    assert_eq!(tx.amount, units(100));
    assert_eq!(tx.related_account_id, None);

    let history = h
        .engines
        .ledger()
        .history(account.id, &HistoryFilter::all())
        .await
        .unwrap();
    assert_eq!(history, vec![tx]);
}

#[tokio::test]
async fn transfer_moves_money_and_records_mirrored_pair() {
    let h = harness().await;
    let (a, b) = (h.account(500), h.account(300));

    let receipt = h
        .engines
        .ledger()
        .transfer(a.id, b.id, units(200), Some("rent".to_string()))
        .await
        .unwrap();

    assert_eq!(h.balance(&a).await, units(300));
    assert_eq!(h.balance(&b).await, units(500));
    assert_eq!(receipt.sent.kind, TransactionKind::TransferSent);
    assert_eq!(receipt.sent.account_id, a.id);
    assert_eq!(receipt.sent.related_account_id, Some(b.id));
    assert_eq!(receipt.received.kind, TransactionKind::TransferReceived);
    assert_eq!(receipt.received.account_id, b.id);
    assert_eq!(receipt.received.related_account_id, Some(a.id));
    assert_eq!(receipt.received.description.as_deref(), Some("rent"));

    let ledger = h.engines.ledger();
    assert_eq!(ledger.history(a.id, &HistoryFilter::all()).await.unwrap(), vec![receipt.sent]);
    assert_eq!(ledger.history(b.id, &HistoryFilter::all()).await.unwrap(), vec![receipt.received]);
}

#[tokio::test]
async fn self_transfer_is_invalid_and_touches_nothing() {
    let h = harness().await;
    let account = h.account(500);

    let err = h
        .engines
        .ledger()
        .transfer(account.id, account.id, units(50), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidOperation(_)));
    assert_eq!(h.balance(&account).await, units(500));
    assert_eq!(h.engines.store().transaction_count().unwrap(), 0);
    let state = h.engines.limits().limits_state(account.id, &op("TRANSFER")).await.unwrap();
    assert_eq!(state.daily_accumulated, Amount::ZERO);
    assert_eq!(state.failed_attempts, 0);
}

#[tokio::test]
async fn insufficient_funds_rolls_back_the_limit_accumulation_too() {
    let h = harness().await;
    let (a, b) = (h.account(100), h.account(0));

    let err = h
        .engines
        .ledger()
        .transfer(a.id, b.id, units(150), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientFunds {
            available: units(100),
            requested: units(150),
        }
    );
    assert_eq!(h.balance(&a).await, units(100));
    assert_eq!(h.balance(&b).await, Amount::ZERO);
    assert_eq!(h.engines.store().transaction_count().unwrap(), 0);
    let state = h.engines.limits().limits_state(a.id, &op("TRANSFER")).await.unwrap();
    assert_eq!(state.daily_accumulated, Amount::ZERO);
}

#[tokio::test]
async fn missing_recipient_leaves_sender_untouched() {
    let h = harness().await;
    let a = h.account(500);

    let err = h
        .engines
        .ledger()
        .transfer(a.id, AccountId::new(), units(10), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(h.balance(&a).await, units(500));
    assert_eq!(h.engines.store().transaction_count().unwrap(), 0);
}

#[tokio::test]
async fn unknown_account_and_bad_amounts_are_rejected() {
    let h = harness().await;
    let ledger = h.engines.ledger();

    assert!(matches!(
        ledger.deposit(AccountId::new(), units(1)).await,
        Err(LedgerError::NotFound(_))
    ));

    let account = h.account(10);
    assert!(matches!(
        ledger.deposit(account.id, Amount::ZERO).await,
        Err(LedgerError::InvalidOperation(_))
    ));
    assert!(matches!(
        ledger.history(AccountId::new(), &HistoryFilter::all()).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn deposit_over_the_limit_is_refused_but_the_failure_is_kept() {
    let h = harness().await;
    let account = h.account(0);
    let ledger = h.engines.ledger();

    ledger.deposit(account.id, units(800)).await.unwrap();
    let err = ledger.deposit(account.id, units(300)).await.unwrap_err();

    assert!(matches!(err, LedgerError::LimitExceeded { .. }));
    assert_eq!(h.balance(&account).await, units(800));
    assert_eq!(h.engines.store().transaction_count().unwrap(), 1);

    let state = h.engines.limits().limits_state(account.id, &op("DEPOSIT")).await.unwrap();
    assert_eq!(state.failed_attempts, 1);
    assert_eq!(state.daily_accumulated, units(800));
}

#[tokio::test]
async fn missing_policy_for_the_level_is_a_configuration_error() {
    let h = harness().await;
    let vip = h.engines.store().open_account(units(0), 4).unwrap();

    let err = h.engines.ledger().deposit(vip.id, units(1)).await.unwrap_err();

    assert!(matches!(err, LedgerError::Configuration(_)));
    assert_eq!(h.balance(&vip).await, Amount::ZERO);
}

#[tokio::test]
async fn history_is_newest_first_and_filterable() {
    let h = harness().await;
    let (a, b) = (h.account(1000), h.account(0));
    let ledger = h.engines.ledger();

    let first = ledger.deposit(a.id, units(10)).await.unwrap();
    h.clock.advance(Duration::hours(1));
    let sent = ledger.transfer(a.id, b.id, units(20), None).await.unwrap().sent;
    h.clock.advance(Duration::hours(1));
    let last = ledger.deposit(a.id, units(30)).await.unwrap();

    let all = ledger.history(a.id, &HistoryFilter::all()).await.unwrap();
    assert_eq!(all, vec![last.clone(), sent.clone(), first.clone()]);

    let deposits = ledger
        .history(a.id, &HistoryFilter::all().with_kind(TransactionKind::Deposit))
        .await
        .unwrap();
    assert_eq!(deposits, vec![last.clone(), first]);

    let window = HistoryFilter::all()
        .since(sent.created_at)
        .until(last.created_at);
    assert_eq!(ledger.history(a.id, &window).await.unwrap(), vec![last, sent]);
}

#[tokio::test]
async fn transfer_limits_follow_the_configured_operation_name() {
    let h = harness_with(EngineConfig::default().with_transfer_operation("TRANSFER_SENT"));
    h.register("DEPOSIT", 1, 1000, 5000).await;
    h.register("TRANSFER_SENT", 1, 50, 100).await;
    let (a, b) = (h.account(500), h.account(0));

    let err = h
        .engines
        .ledger()
        .transfer(a.id, b.id, units(60), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::LimitExceeded { .. }));
    let state = h
        .engines
        .limits()
        .limits_state(a.id, &op("TRANSFER_SENT"))
        .await
        .unwrap();
    assert_eq!(state.failed_attempts, 1);
}
