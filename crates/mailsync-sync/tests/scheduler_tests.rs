//! Integration tests for the sync report scheduler and listener
//!
//! Drives the scheduler through the accounts-updated path end-to-end,
//! including the protocol override scenario and the rapid-fire
//! notification thrash.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{InMemoryRegistry, InMemoryStore};
use mailsync_core::domain::{AccountDraft, Email, Protocol, SyncInterval};
use mailsync_core::ports::account_registry::RegistryEvent;
use mailsync_core::ports::{IAccountRegistry, IProviderStore};
use mailsync_sync::{AccountsUpdatedListener, ReconcilePolicy, Reconciler, ReportScope, SyncReportScheduler};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TAG: &str = "com.enigmora.mailsync";

// ============================================================================
// Test helpers
// ============================================================================

struct Fixture {
    store: Arc<InMemoryStore>,
    registry: Arc<InMemoryRegistry>,
    scheduler: Arc<SyncReportScheduler>,
    listener: AccountsUpdatedListener,
}

fn setup() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let scheduler = Arc::new(SyncReportScheduler::new());
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store) as Arc<dyn IProviderStore>,
        Arc::clone(&registry) as Arc<dyn IAccountRegistry>,
        TAG,
    ));
    let listener = AccountsUpdatedListener::new(
        Arc::clone(&store) as Arc<dyn IProviderStore>,
        reconciler,
        Arc::clone(&scheduler),
    );
    Fixture {
        store,
        registry,
        scheduler,
        listener,
    }
}

async fn add_account(
    fixture: &Fixture,
    email: &str,
    protocol: Protocol,
    interval: SyncInterval,
) -> mailsync_core::domain::ProviderAccount {
    let draft = AccountDraft::new(
        Email::new(email.to_string()).unwrap(),
        email,
        protocol,
        interval,
    );
    let account = fixture.store.insert_account(&draft).await.unwrap();
    fixture.registry.add(email, TAG);
    account
}

// ============================================================================
// Report scenario
// ============================================================================

#[tokio::test]
async fn test_report_table_after_full_rebuild() {
    let fixture = setup();
    let eas = add_account(
        &fixture,
        "account1@example.com",
        Protocol::Eas,
        SyncInterval::Minutes(30),
    )
    .await;
    let imap = add_account(
        &fixture,
        "account2@example.com",
        Protocol::Imap,
        SyncInterval::Minutes(60),
    )
    .await;
    let pop3 = add_account(
        &fixture,
        "account3@example.com",
        Protocol::Pop3,
        SyncInterval::Minutes(90),
    )
    .await;

    fixture.listener.on_accounts_updated().await.unwrap();

    // EAS manages its own delivery: interval forced to never-poll
    assert_eq!(
        fixture.scheduler.get_report(eas.id()).unwrap().sync_interval(),
        SyncInterval::Never
    );
    assert_eq!(
        fixture.scheduler.get_report(imap.id()).unwrap().sync_interval(),
        SyncInterval::Minutes(60)
    );
    assert_eq!(
        fixture.scheduler.get_report(pop3.id()).unwrap().sync_interval(),
        SyncInterval::Minutes(90)
    );
}

#[tokio::test]
async fn test_single_account_refresh_keeps_eas_override() {
    let fixture = setup();
    let eas = add_account(
        &fixture,
        "account1@example.com",
        Protocol::Eas,
        SyncInterval::Minutes(30),
    )
    .await;
    let imap = add_account(
        &fixture,
        "account2@example.com",
        Protocol::Imap,
        SyncInterval::Minutes(60),
    )
    .await;

    fixture.listener.on_accounts_updated().await.unwrap();

    // Switch the EAS account to push storage-side and refresh only it
    fixture
        .store
        .update_sync_interval(eas.id(), SyncInterval::Push)
        .await
        .unwrap();
    let accounts = fixture.store.list_accounts().await.unwrap();
    fixture
        .scheduler
        .setup_reports(ReportScope::Account(eas.id()), &accounts);

    // Still never-poll, and the imap entry is untouched
    assert_eq!(
        fixture.scheduler.get_report(eas.id()).unwrap().sync_interval(),
        SyncInterval::Never
    );
    assert_eq!(
        fixture.scheduler.get_report(imap.id()).unwrap().sync_interval(),
        SyncInterval::Minutes(60)
    );
}

#[tokio::test]
async fn test_rebuild_drops_reports_for_deleted_accounts() {
    let fixture = setup();
    let account = add_account(
        &fixture,
        "gone@example.com",
        Protocol::Imap,
        SyncInterval::Minutes(10),
    )
    .await;
    fixture.listener.on_accounts_updated().await.unwrap();
    assert_eq!(fixture.scheduler.len(), 1);

    // Registry entry disappears: reconcile removes the provider account,
    // and the rebuilt table must not reference it
    fixture.registry.remove("gone@example.com");
    fixture.listener.on_accounts_updated().await.unwrap();

    assert!(fixture.scheduler.get_report(account.id()).is_none());
    assert!(fixture.scheduler.is_empty());
}

// ============================================================================
// Notification flooding
// ============================================================================

#[tokio::test]
async fn test_thrash_on_accounts_updated() {
    let fixture = setup();
    add_account(
        &fixture,
        "account1@example.com",
        Protocol::Eas,
        SyncInterval::Minutes(30),
    )
    .await;
    add_account(
        &fixture,
        "account2@example.com",
        Protocol::Imap,
        SyncInterval::Minutes(60),
    )
    .await;

    // Rapid-fire the handler from one task; it must never error
    for _ in 0..1000 {
        fixture.listener.on_accounts_updated().await.unwrap();
    }

    // The table is valid and fully keyed afterwards
    let snapshot = fixture.scheduler.snapshot();
    assert_eq!(snapshot.len(), 2);
    for account in fixture.store.list_accounts().await.unwrap() {
        assert!(snapshot.contains_key(&account.id()));
    }
}

#[tokio::test]
async fn test_listener_run_processes_events_and_stops_on_shutdown() {
    let fixture = setup();
    add_account(
        &fixture,
        "account1@example.com",
        Protocol::Imap,
        SyncInterval::Minutes(5),
    )
    .await;

    let (tx, rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let snapshot = fixture.registry.list_accounts(TAG).await.unwrap();
    tx.send(RegistryEvent::AccountsChanged(snapshot))
        .await
        .unwrap();

    let token = shutdown.clone();
    let run = fixture.listener.run(rx, shutdown);
    tokio::pin!(run);

    // Give the listener time to drain the event, then cancel
    tokio::select! {
        _ = &mut run => panic!("listener exited before shutdown"),
        _ = tokio::time::sleep(Duration::from_millis(100)) => token.cancel(),
    }
    tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("listener should stop on cancellation");

    assert_eq!(fixture.scheduler.len(), 1);
}

#[tokio::test]
async fn test_listener_run_exits_on_channel_close() {
    let fixture = setup();
    let (tx, rx) = mpsc::channel::<RegistryEvent>(16);
    drop(tx);

    tokio::time::timeout(
        Duration::from_secs(2),
        fixture.listener.run(rx, CancellationToken::new()),
    )
    .await
    .expect("listener should exit when the channel closes");
}

// ============================================================================
// Setup-flow wiring
// ============================================================================

#[tokio::test]
async fn test_setup_flow_then_notification_path() {
    // A freshly created provider account gets registered, then a
    // notification pass builds its report without deleting anything.
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let scheduler = Arc::new(SyncReportScheduler::new());

    let setup_reconciler = Reconciler::new(
        Arc::clone(&store) as Arc<dyn IProviderStore>,
        Arc::clone(&registry) as Arc<dyn IAccountRegistry>,
        TAG,
    )
    .with_policy(ReconcilePolicy::ProviderAuthoritative);

    let draft = AccountDraft::new(
        Email::new("new@example.com".to_string()).unwrap(),
        "New",
        Protocol::Pop3,
        SyncInterval::Minutes(45),
    );
    let account = store.insert_account(&draft).await.unwrap();
    setup_reconciler.reconcile().await.unwrap();

    let listener = AccountsUpdatedListener::new(
        Arc::clone(&store) as Arc<dyn IProviderStore>,
        Arc::new(Reconciler::new(
            Arc::clone(&store) as Arc<dyn IProviderStore>,
            Arc::clone(&registry) as Arc<dyn IAccountRegistry>,
            TAG,
        )),
        Arc::clone(&scheduler),
    );
    listener.on_accounts_updated().await.unwrap();

    assert_eq!(store.count(), 1);
    assert_eq!(
        scheduler.get_report(account.id()).unwrap().sync_interval(),
        SyncInterval::Minutes(45)
    );
}
