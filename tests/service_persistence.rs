//! Bridge service over SQLite: state written by one process is what the
//! next one starts from.

mod common;

use std::sync::Arc;

use common::*;
use zbridge::*;

const VALUE: u64 = 20_000;

fn genesis() -> Genesis {
    Genesis {
        checkpoint: checkpoint(1_000),
        admin: admin(),
        oracle: oracle(),
        exchange_rate: 1,
    }
}

fn capabilities(token: InMemoryToken) -> Capabilities {
    Capabilities {
        pow: Arc::new(AcceptAllPowOracle),
        verifier: FixedVerifier::new(true),
        token: Box::new(token),
    }
}

async fn open(path: &std::path::Path, token: InMemoryToken) -> BridgeService {
    let store = Arc::new(SqliteStateStore::new(path).unwrap());
    BridgeService::open(&BridgeSettings::default(), store, capabilities(token), genesis())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.db");

    let service = open(&path, InMemoryToken::new()).await;
    service
        .execute(|b| b.relay_mut().add_relayer(&admin(), relayer()))
        .await
        .unwrap();
    service
        .execute(|b| {
            b.vaults_mut()
                .register(&vault(), vault_address(), 500_000)
                .map(|_| ())
        })
        .await
        .unwrap();
    let nonce = service
        .execute(|b| b.request_lock(&requester(), &vault(), USER_KEY, 1_000, T0))
        .await
        .unwrap();
    service
        .execute(|b| {
            let transfer = pay_vault(b, nonce, VALUE);
            b.mint(&requester(), nonce, transfer, T0 + 10)
        })
        .await
        .unwrap();
    let stale = service
        .execute(|b| b.request_lock(&requester(), &vault(), USER_KEY, 1_000, T0))
        .await
        .unwrap();

    let before = service
        .query(|b| {
            (
                b.relay().get_chain_tip().clone(),
                b.relay().header_count(),
                b.vaults().get_vault(&vault()).cloned(),
                b.get_issue(nonce).cloned(),
                b.get_issue(stale).cloned(),
                b.counters(),
            )
        })
        .await;
    drop(service);

    let service = open(&path, InMemoryToken::new()).await;
    let after = service
        .query(|b| {
            (
                b.relay().get_chain_tip().clone(),
                b.relay().header_count(),
                b.vaults().get_vault(&vault()).cloned(),
                b.get_issue(nonce).cloned(),
                b.get_issue(stale).cloned(),
                b.counters(),
            )
        })
        .await;
    assert_eq!(before, after);
    assert!(service.query(|b| b.relay().is_relayer(&relayer())).await);

    // the restored issue can still be finished
    service
        .execute(|b| b.confirm_issue(&vault(), nonce, T0 + 20))
        .await
        .unwrap();
    let confirmed = service.store().get_issue(nonce).await.unwrap().unwrap();
    assert_eq!(confirmed.status, IssueStatus::Confirmed);
    assert_eq!(
        service.query(|b| b.token().balance_of(&requester())).await,
        VALUE - 20
    );
}

#[tokio::test]
async fn test_watcher_effects_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.db");

    let service = open(&path, InMemoryToken::new()).await;
    service
        .execute(|b| {
            b.vaults_mut()
                .register(&vault(), vault_address(), 500_000)
                .map(|_| ())
        })
        .await
        .unwrap();
    let nonce = service
        .execute(|b| b.request_lock(&requester(), &vault(), USER_KEY, 1_000, T0))
        .await
        .unwrap();

    let result = service.tick(T0 + 3_601).await.unwrap();
    assert_eq!(result.issues_expired, 1);
    drop(service);

    let service = open(&path, InMemoryToken::new()).await;
    assert_eq!(
        service.query(|b| b.get_issue_status(nonce)).await,
        IssueStatus::Expired
    );
    assert_eq!(
        service.query(|b| b.payout_balance(&vault())).await,
        1_000
    );
    assert!(!service.tick(T0 + 3_601).await.unwrap().has_activity());
}

#[tokio::test]
async fn test_rejected_transition_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.db");

    let service = open(&path, InMemoryToken::new()).await;
    let err = service
        .execute(|b| b.request_lock(&requester(), &vault(), USER_KEY, 1_000, T0))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PRECONDITION_VIOLATION");

    let snapshot = service.store().load().await.unwrap();
    assert!(snapshot.issues.is_empty());
    assert_eq!(snapshot.counters, None);
}
