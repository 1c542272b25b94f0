mod common;

use common::{
    billing_rate, create_client, create_invoice, end_session, setup_in_memory, setup_with_pool,
    start_session,
};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use worklog_sync::application::ports::ReplayLease;
use worklog_sync::domain::entities::{
    ActionPayload, DeleteInvoicePayload, EntityRef, ReplayStatus, SkipReason, SyncNotice,
};
use worklog_sync::domain::value_objects::{ActionKind, ClientId, EntityKind, SessionId};
use worklog_sync::infrastructure::database::ConnectionPool;
use worklog_sync::infrastructure::offline::SqliteReplayLease;
use worklog_sync::shared::config::AppConfig;

fn client_ref(placeholder: Option<EntityRef>) -> ClientId {
    match placeholder {
        Some(EntityRef::Client(id)) => id,
        other => panic!("expected client placeholder, got {other:?}"),
    }
}

fn session_ref(placeholder: Option<EntityRef>) -> SessionId {
    match placeholder {
        Some(EntityRef::Session(id)) => id,
        other => panic!("expected session placeholder, got {other:?}"),
    }
}

#[tokio::test]
async fn offline_work_replays_with_server_ids_after_reconnect() {
    let ctx = setup_in_memory(AppConfig::default()).await;
    let queue = &ctx.state.queue;

    let client = client_ref(queue.queue_action(create_client("Acme")).await.unwrap().placeholder);
    queue.queue_action(billing_rate(&client)).await.unwrap();
    let session = session_ref(queue.queue_action(start_session(&client)).await.unwrap().placeholder);
    queue.queue_action(end_session(session)).await.unwrap();
    queue
        .queue_action(create_invoice(&client, vec![session]))
        .await
        .unwrap();
    assert_eq!(queue.state().pending_count, 5);

    // Offline: nothing leaves the device.
    let skipped = queue.sync_now().await.unwrap();
    assert_eq!(skipped.status, ReplayStatus::Skipped(SkipReason::Offline));
    assert!(ctx.dispatcher.calls().is_empty());

    ctx.state.connectivity.set_online(true);
    let report = queue.sync_now().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.replayed, 5);
    assert_eq!(report.resolutions.len(), 3);
    assert_eq!(
        ctx.dispatcher.kinds(),
        vec![
            ActionKind::CreateClient,
            ActionKind::CreateBillingRate,
            ActionKind::StartSession,
            ActionKind::EndSession,
            ActionKind::CreateInvoice,
        ]
    );

    let calls = ctx.dispatcher.calls();
    let real_client = ClientId::new("cl_1".into()).unwrap();
    assert_eq!(calls[1].payload, billing_rate(&real_client));
    match &calls[2].payload {
        ActionPayload::StartSession(p) => assert_eq!(p.client_id, real_client),
        other => panic!("unexpected payload {other:?}"),
    }
    let real_session = SessionId::new(1003);
    match &calls[3].payload {
        ActionPayload::EndSession(p) => assert_eq!(p.session_id, real_session),
        other => panic!("unexpected payload {other:?}"),
    }
    match &calls[4].payload {
        ActionPayload::CreateInvoice(p) => {
            assert_eq!(p.client_id, real_client);
            assert_eq!(p.session_ids, vec![real_session]);
        }
        other => panic!("unexpected payload {other:?}"),
    }

    let mirror = &ctx.state.mirror;
    assert!(mirror.get(EntityKind::Client, client.as_str()).await.unwrap().is_none());
    let stored_client = mirror.get(EntityKind::Client, "cl_1").await.unwrap().unwrap();
    assert!(!stored_client.is_temporary);
    assert_eq!(stored_client.field("billing_rates").unwrap().as_array().unwrap().len(), 1);

    let stored_session = mirror
        .get(EntityKind::Session, &real_session.as_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_session.field("client_id"), Some(&json!("cl_1")));
    assert_eq!(stored_session.field("status"), Some(&json!("completed")));

    let invoice = mirror.get(EntityKind::Invoice, "inv_5").await.unwrap().unwrap();
    assert_eq!(invoice.field("invoice_number"), Some(&json!("INV-0005")));
    assert_eq!(invoice.field("session_ids"), Some(&json!([1003])));

    assert_eq!(queue.state().pending_count, 0);
    assert_eq!(ctx.state.engine.metrics().actions_replayed, 5);
}

#[tokio::test]
async fn failed_action_blocks_queue_until_it_succeeds() {
    let ctx = setup_in_memory(AppConfig::default()).await;
    let queue = &ctx.state.queue;
    let mut notices = ctx.state.notices.subscribe();

    let client = client_ref(queue.queue_action(create_client("Acme")).await.unwrap().placeholder);
    queue.queue_action(billing_rate(&client)).await.unwrap();
    queue.queue_action(start_session(&client)).await.unwrap();

    ctx.dispatcher.fail_on(ActionKind::CreateBillingRate);
    ctx.state.connectivity.set_online(true);

    let report = queue.sync_now().await.unwrap();
    assert!(report.is_blocked());
    assert_eq!(report.replayed, 1);
    assert_eq!(report.remaining, 2);
    assert_eq!(ctx.dispatcher.kinds(), vec![ActionKind::CreateClient]);

    // The rewrite survived the failed pass.
    let pending = ctx.state.action_log.list_unsynced().await.unwrap();
    let rate = pending
        .iter()
        .find(|action| action.kind() == ActionKind::CreateBillingRate)
        .unwrap();
    assert_eq!(rate.payload, billing_rate(&ClientId::new("cl_1".into()).unwrap()));
    assert_eq!(rate.attempts, 1);

    ctx.dispatcher.recover(ActionKind::CreateBillingRate);
    let report = queue.sync_now().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        ctx.dispatcher.kinds(),
        vec![
            ActionKind::CreateClient,
            ActionKind::CreateBillingRate,
            ActionKind::StartSession,
        ]
    );

    let mut seen = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        seen.push(notice);
    }
    assert!(seen.iter().any(|n| matches!(n, SyncNotice::SyncFailed { remaining: 2, .. })));
    assert!(seen.contains(&SyncNotice::SyncComplete { replayed: 2 }));
}

#[tokio::test]
async fn quarantine_lets_independent_work_through() {
    let mut config = AppConfig::default();
    config.sync.quarantine_after = Some(1);
    let ctx = setup_in_memory(config).await;
    let queue = &ctx.state.queue;

    let client = client_ref(queue.queue_action(create_client("Broken")).await.unwrap().placeholder);
    queue.queue_action(billing_rate(&client)).await.unwrap();
    let existing = ClientId::new("cl_existing".into()).unwrap();
    queue.queue_action(start_session(&existing)).await.unwrap();

    ctx.dispatcher.fail_on(ActionKind::CreateClient);
    ctx.state.connectivity.set_online(true);

    let first = queue.sync_now().await.unwrap();
    assert!(first.is_blocked());
    assert_eq!(first.quarantined.len(), 2);

    let second = queue.sync_now().await.unwrap();
    assert!(second.is_complete());
    assert_eq!(ctx.dispatcher.kinds(), vec![ActionKind::StartSession]);

    ctx.dispatcher.recover(ActionKind::CreateClient);
    for action in queue.quarantined().await.unwrap() {
        assert!(queue.requeue(action.id.unwrap()).await.unwrap());
    }
    assert_eq!(queue.state().pending_count, 2);

    let third = queue.sync_now().await.unwrap();
    assert!(third.is_complete());
    assert_eq!(third.replayed, 2);
}

#[tokio::test]
async fn queued_actions_survive_restart() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("offline.db").display());

    {
        let pool = ConnectionPool::new(&url, 1).await.unwrap();
        pool.migrate().await.unwrap();
        let ctx = setup_with_pool(AppConfig::default(), pool.clone()).await;
        ctx.state.queue.queue_action(create_client("Acme")).await.unwrap();
        pool.close().await;
    }

    let pool = ConnectionPool::new(&url, 1).await.unwrap();
    pool.migrate().await.unwrap();
    let ctx = setup_with_pool(AppConfig::default(), pool).await;
    assert_eq!(ctx.state.queue.state().pending_count, 1);

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.queue.sync_now().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.replayed, 1);
}

#[tokio::test]
async fn lease_held_by_another_process_skips_pass() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("offline.db").display());
    let pool = ConnectionPool::new(&url, 2).await.unwrap();
    pool.migrate().await.unwrap();

    let other = SqliteReplayLease::new(pool.get_pool().clone());
    assert!(other
        .try_acquire("other-process", Duration::from_secs(60))
        .await
        .unwrap());

    let ctx = setup_with_pool(AppConfig::default(), pool).await;
    ctx.state.queue.queue_action(create_client("Acme")).await.unwrap();
    ctx.state.connectivity.set_online(true);

    let report = ctx.state.queue.sync_now().await.unwrap();
    assert_eq!(report.status, ReplayStatus::Skipped(SkipReason::LeaseHeld));
    assert!(ctx.dispatcher.calls().is_empty());

    other.release("other-process").await.unwrap();
    let report = ctx.state.queue.sync_now().await.unwrap();
    assert!(report.is_complete());
}

#[tokio::test]
async fn invoice_drafted_and_deleted_offline_stays_deleted_after_sync() {
    let ctx = setup_in_memory(AppConfig::default()).await;
    let queue = &ctx.state.queue;
    let client = ClientId::new("cl_existing".into()).unwrap();

    let invoice = match queue
        .queue_action(create_invoice(&client, Vec::new()))
        .await
        .unwrap()
        .placeholder
    {
        Some(EntityRef::Invoice(id)) => id,
        other => panic!("expected invoice placeholder, got {other:?}"),
    };
    queue
        .queue_action(ActionPayload::DeleteInvoice(DeleteInvoicePayload {
            invoice_id: invoice,
        }))
        .await
        .unwrap();
    assert!(ctx.state.mirror.list(EntityKind::Invoice).await.unwrap().is_empty());

    ctx.state.connectivity.set_online(true);
    let report = queue.sync_now().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.replayed, 2);
    assert_eq!(
        ctx.dispatcher.kinds(),
        vec![ActionKind::CreateInvoice, ActionKind::DeleteInvoice]
    );
    assert!(ctx.state.mirror.list(EntityKind::Invoice).await.unwrap().is_empty());
}
