//! End-to-end scenarios across the whole workspace.

#![forbid(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![forbid(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use keygate::keygate_core::{Error, KeygateConfig};
use keygate::keygate_directory::{
    AccessStatus, DeviceDirectory, DeviceId, InMemoryStore, SettingsPatch,
};
use keygate::keygate_period::{Category, ManualClock, OutcomeGenerator};
use keygate::keygate_reconciler::{AccessEvent, ChannelEventSink, Result};
use keygate::prelude::*;

/// # GIVEN
/// A fresh directory
///
/// # WHEN
/// DEV-000123 registers, requests access, is approved and logs in
///
/// # THEN
/// Each step lands in the documented state and a wrong code is refused
#[tokio::test]
async fn test_device_walks_the_whole_flow() -> Result<()> {
    let workflow = AuthorizationWorkflow::new(DeviceDirectory::new(InMemoryStore::new_arc()));
    let device = DeviceId::parse("DEV-000123")?;

    let record = workflow.register(&device).await?;
    assert_eq!(record.status(), AccessStatus::Locked);

    let record = workflow.request_access(&device).await?;
    assert_eq!(record.status(), AccessStatus::Pending);

    let code = workflow
        .approve(&device)
        .await?
        .expect("registered device");
    let record = workflow.status(&device).await?.expect("registered device");
    assert_eq!(record.status(), AccessStatus::Granted);
    assert_eq!(record.activation_code(), Some(&code));

    let session = workflow.login(&device, code.as_str()).await?;
    assert_eq!(session.grant, SessionGrant::ActivationCode);

    // "0000" can never be issued, so it is always wrong
    assert!(matches!(
        workflow.login(&device, "0000").await,
        Err(Error::CredentialMismatch)
    ));
    Ok(())
}

#[test]
fn test_period_outcome_is_stable_within_a_run() {
    let generator = OutcomeGenerator::default();
    let first = generator.generate("202406011234");
    for _ in 0..10 {
        let again = generator.generate("202406011234");
        assert_eq!(
            (again.value, again.category, again.confidence),
            (first.value, first.category, first.confidence)
        );
    }
    assert_eq!(first.value, 9);
    assert_eq!(first.category, Category::Big);
    assert_eq!(first.confidence, 97);
}

/// # GIVEN
/// A device and an admin sharing one on-disk store
///
/// # WHEN
/// The admin approves and later blocks the device while it watches
///
/// # THEN
/// The device sees exactly one authorized and one blocked alert
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_admin_decisions_reach_a_watching_device() -> Result<()> {
    let dir = tempfile::tempdir().map_err(keygate::keygate_core::Error::from)?;
    let mut config = KeygateConfig::default();
    config.storage.dir = dir.path().to_path_buf();
    config.poll.status_interval_ms = 10;

    let keygate = Keygate::open(config).await?;
    let client = keygate.client().await?;
    client.request_access().await?;

    let (sink, mut rx) = ChannelEventSink::new();
    let handle = keygate.watch_status(&client, Arc::new(sink));

    keygate.workflow().approve(client.device_id()).await?;
    let authorized = tokio::time::timeout(Duration::from_secs(2), next_alert(&mut rx)).await;
    assert!(matches!(
        authorized,
        Ok(Some(AccessEvent::Authorized { .. }))
    ));

    keygate.workflow().block(client.device_id()).await?;
    let blocked = tokio::time::timeout(Duration::from_secs(2), next_alert(&mut rx)).await;
    assert!(matches!(blocked, Ok(Some(AccessEvent::Blocked { .. }))));

    handle.stop().await?;
    // Nothing further was queued for the steady BLOCKED state
    while let Ok(event) = rx.try_recv() {
        assert!(!event.is_alert(), "unexpected alert {event:?}");
    }
    Ok(())
}

async fn next_alert(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<AccessEvent>,
) -> Option<AccessEvent> {
    while let Some(event) = rx.recv().await {
        if event.is_alert() {
            return Some(event);
        }
    }
    None
}

#[tokio::test]
async fn test_settings_and_admin_gate_share_the_store() -> Result<()> {
    let keygate = Keygate::with_store(KeygateConfig::default(), InMemoryStore::new_arc());
    let gate = keygate.admin_gate();
    gate.authenticate("ADMIN123").await?;

    keygate
        .settings()
        .set(SettingsPatch::default().admin_credential("rotated").display_name("NIGHT OPS"))
        .await?;

    assert!(gate.authenticate("ADMIN123").await.is_err());
    gate.authenticate("rotated").await?;
    assert_eq!(keygate.settings().get().await?.display_name, "NIGHT OPS");
    Ok(())
}

#[tokio::test]
async fn test_configured_bypass_is_honoured() -> Result<()> {
    let mut config = KeygateConfig::default();
    config.access.bypass_code = Some("1234".to_string());
    let keygate = Keygate::with_store(config, InMemoryStore::new_arc());

    let client = keygate.client().await?;
    let session = client.login("1234").await?;
    assert_eq!(session.grant, SessionGrant::Bypass);
    Ok(())
}

/// # GIVEN
/// A feed loop over a manual clock parked inside a revealed period
///
/// # WHEN
/// The loop ticks several times
///
/// # THEN
/// Only the first frame of the period is fresh
#[tokio::test]
async fn test_feed_loop_flags_one_fresh_frame() -> Result<()> {
    let mut config = KeygateConfig::default();
    config.poll.feed_interval_ms = 5;
    let keygate = Keygate::with_store(config, InMemoryStore::new_arc());

    let at = NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(12, 34, 10))
        .expect("valid time");
    let clock = Arc::new(ManualClock::new(at));
    let (sink, mut rx) = ChannelEventSink::new();
    let handle = keygate.watch_feed(clock, Arc::new(sink));

    let mut frames = Vec::new();
    while frames.len() < 4 {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(frame)) => frames.push(frame),
            _ => break,
        }
    }
    handle.stop().await?;

    assert_eq!(frames.len(), 4);
    let fresh: Vec<bool> = frames.iter().map(FeedFrame::is_fresh).collect();
    assert_eq!(fresh, [true, false, false, false]);
    assert!(frames
        .iter()
        .all(|f| f.period.as_key() == "202406011509"));
    Ok(())
}
