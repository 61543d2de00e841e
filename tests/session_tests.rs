// Tests for the voice session lifecycle
//
// The session under test uses a channel-fed capture backend and a scripted
// live endpoint, so the whole pipeline runs without any device or network.

mod support;

use anyhow::{bail, Result};
use sage_voice::live::ClientEvent;
use sage_voice::playback::NullSink;
use sage_voice::session::{SessionConfig, SessionManager, UsageCounts, VoiceSession};
use sage_voice::tools::StudyToolRouter;
use std::sync::Arc;
use std::time::Duration;
use support::{recv_sent, ScriptedEndpoint};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn test_config() -> SessionConfig {
    SessionConfig {
        session_id: "voice-test".to_string(),
        connect_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

fn test_session(endpoint: Arc<ScriptedEndpoint>) -> VoiceSession {
    let (nav_tx, nav_rx) = mpsc::channel(16);
    // Drain navigation intents so tool dispatch never stalls.
    tokio::spawn(async move {
        let mut nav_rx = nav_rx;
        while nav_rx.recv().await.is_some() {}
    });

    VoiceSession::new(
        test_config(),
        endpoint,
        Arc::new(StudyToolRouter::new(nav_tx)),
        Arc::new(NullSink),
    )
}

async fn wait_until(what: &str, mut check: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            bail!("timed out waiting until {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

#[tokio::test]
async fn test_silent_frames_are_transmitted_with_zero_activity() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let session = test_session(Arc::clone(&endpoint));

    session.start(&UsageCounts::default()).await?;
    let mut conn = endpoint.next_conn().await;

    let feed = session.capture_feed().await.expect("session is active");

    // Two frames of pure silence. Silence is not a reason to drop audio.
    feed.push(&vec![0.0; 8192]).await;

    for _ in 0..2 {
        let event = recv_sent(&mut conn).await;
        assert!(matches!(event, ClientEvent::RealtimeInput(_)));
    }

    assert_eq!(*session.watch_activity().borrow(), 0.0);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while session.stats().await?.frames_sent < 2 {
        if tokio::time::Instant::now() > deadline {
            bail!("frames were never counted");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_loud_frames_raise_the_activity_level() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let session = test_session(Arc::clone(&endpoint));

    session.start(&UsageCounts::default()).await?;
    let _conn = endpoint.next_conn().await;

    let feed = session.capture_feed().await.expect("session is active");
    feed.push(&vec![0.5; 4096]).await;

    let mut activity = session.watch_activity();
    let level = timeout(Duration::from_secs(2), async {
        loop {
            let level = *activity.borrow();
            if level > 0.0 {
                return level;
            }
            if activity.changed().await.is_err() {
                return *activity.borrow();
            }
        }
    })
    .await?;

    // RMS of a constant 0.5 signal is 0.5.
    assert!((level - 0.5).abs() < 1e-3);

    session.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_restart_keeps_capture_and_connection_singular() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let session = test_session(Arc::clone(&endpoint));

    session.start(&UsageCounts::default()).await?;
    let _first = endpoint.next_conn().await;
    let stale_feed = session.capture_feed().await.expect("session is active");

    // Starting again must fully replace the previous pipeline.
    session.start(&UsageCounts::default()).await?;
    let mut second = endpoint.next_conn().await;

    assert_eq!(endpoint.opened(), 2);
    wait_until("the first connection is closed", || {
        endpoint.open_channels() == 1
    })
    .await?;
    assert!(session.is_active());

    // The stale feed is disconnected; the fresh feed reaches the new
    // connection.
    stale_feed.push(&vec![0.1; 4096]).await;
    let fresh_feed = session.capture_feed().await.expect("session is active");
    fresh_feed.push(&vec![0.2; 4096]).await;

    let event = recv_sent(&mut second).await;
    assert!(matches!(event, ClientEvent::RealtimeInput(_)));
    assert!(timeout(Duration::from_millis(100), second.sent_rx.recv())
        .await
        .is_err());

    session.stop().await?;
    wait_until("all connections are closed", || {
        endpoint.open_channels() == 0
    })
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let session = test_session(Arc::clone(&endpoint));

    session.start(&UsageCounts::default()).await?;
    let _conn = endpoint.next_conn().await;

    session.stop().await?;
    assert!(!session.is_active());

    // A second stop reports stats without doing anything.
    let stats = session.stop().await?;
    assert!(!session.is_active());
    assert_eq!(stats.activity_level, 0.0);
    assert_eq!(endpoint.open_channels(), 0);

    Ok(())
}

#[tokio::test]
async fn test_remote_failure_releases_the_capture_stream() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let session = test_session(Arc::clone(&endpoint));

    session.start(&UsageCounts::default()).await?;
    let conn = endpoint.next_conn().await;
    assert!(session.is_active());

    // The remote hangs up; the supervisor must tear the pipeline down.
    drop(conn);
    wait_until("the session is inactive", || !session.is_active()).await?;
    assert!(session.capture_feed().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_refused_connection_ends_the_session() -> Result<()> {
    let endpoint = ScriptedEndpoint::refusing();
    let session = test_session(Arc::clone(&endpoint));

    // Start succeeds; the failure surfaces through the session going
    // inactive once the transport reports it.
    session.start(&UsageCounts::default()).await?;
    wait_until("the session is inactive", || !session.is_active()).await?;

    Ok(())
}

#[tokio::test]
async fn test_manager_keeps_one_session_at_a_time() -> Result<()> {
    let endpoint = ScriptedEndpoint::new();
    let (nav_tx, _nav_rx) = mpsc::channel(16);
    let manager = SessionManager::new(
        Arc::clone(&endpoint) as Arc<dyn sage_voice::live::LiveEndpoint>,
        Arc::new(StudyToolRouter::new(nav_tx)),
    );

    manager
        .activate(test_config(), UsageCounts::default(), Arc::new(NullSink))
        .await?;
    let _first = endpoint.next_conn().await;
    assert!(manager.current().await.is_some());

    // Activating a second session deactivates the first.
    let mut second_config = test_config();
    second_config.session_id = "voice-test-2".to_string();
    manager
        .activate(second_config, UsageCounts::default(), Arc::new(NullSink))
        .await?;
    let _second = endpoint.next_conn().await;

    wait_until("only one connection remains", || {
        endpoint.open_channels() == 1
    })
    .await?;

    let stats = manager.deactivate().await?;
    assert!(stats.is_some());
    assert!(manager.current().await.is_none());
    wait_until("all connections are closed", || {
        endpoint.open_channels() == 0
    })
    .await?;

    Ok(())
}
