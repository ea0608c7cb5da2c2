// Integration tests for the idle suggestion hint
//
// The hint window opens whenever the session is idle and surfaces one
// suggestion from the configured pool after the configured delay.

mod common;

use common::{test_session_config, tone_chunks, wait_for_status, FixedPicker, ScriptedMic};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use voicematch_capture::session::{SuggestionPicker, DEFAULT_SUGGESTIONS};
use voicematch_capture::{SessionRunner, SessionStatus};

/// Picker that records how often it was consulted
struct CountingPicker {
    index: usize,
    picks: Arc<AtomicUsize>,
}

impl SuggestionPicker for CountingPicker {
    fn pick_index(&mut self, len: usize) -> usize {
        self.picks.fetch_add(1, Ordering::SeqCst);
        self.index % len
    }
}

#[tokio::test(start_paused = true)]
async fn test_hint_appears_after_idle_delay() {
    let mic = ScriptedMic::new();
    let handle = SessionRunner::spawn(test_session_config(), Box::new(mic), Box::new(FixedPicker(2)));

    // Just short of the 5s delay: still no hint
    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(handle.snapshot().hint.is_none());

    // Crossing the delay surfaces a suggestion without leaving Idle
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.hint.as_deref(), Some(DEFAULT_SUGGESTIONS[2]));
}

#[tokio::test(start_paused = true)]
async fn test_hint_comes_from_configured_pool() {
    let mut config = test_session_config();
    config.suggestions = vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()];

    let mic = ScriptedMic::new();
    let handle = SessionRunner::spawn(config, Box::new(mic), Box::new(FixedPicker(1)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(handle.snapshot().hint.as_deref(), Some("Beta"));
}

#[tokio::test(start_paused = true)]
async fn test_starting_early_suppresses_the_hint() {
    let mut mic = ScriptedMic::new();
    mic.push_grant(tone_chunks(1));

    let handle = SessionRunner::spawn(test_session_config(), Box::new(mic), Box::new(FixedPicker(0)));
    let mut updates = handle.updates();

    // Start one second in, well before the hint delay elapses
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.start().await.unwrap();
    wait_for_status(&mut updates, SessionStatus::Recording).await;

    // Sail past the would-be hint moment: nothing surfaces
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(handle.snapshot().hint.is_none());

    let snapshot = wait_for_status(&mut updates, SessionStatus::Captured).await;
    assert!(snapshot.hint.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_hint_fires_at_most_once_per_idle_period() {
    let picks = Arc::new(AtomicUsize::new(0));
    let picker = CountingPicker {
        index: 0,
        picks: Arc::clone(&picks),
    };

    let mic = ScriptedMic::new();
    let handle = SessionRunner::spawn(test_session_config(), Box::new(mic), Box::new(picker));

    tokio::time::sleep(Duration::from_secs(6)).await;
    let hint = handle.snapshot().hint;
    assert!(hint.is_some());
    assert_eq!(picks.load(Ordering::SeqCst), 1);

    // Staying idle much longer never picks again or swaps the hint
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(picks.load(Ordering::SeqCst), 1);
    assert_eq!(handle.snapshot().hint, hint);
}

#[tokio::test(start_paused = true)]
async fn test_reset_reopens_the_hint_window() {
    let picks = Arc::new(AtomicUsize::new(0));
    let picker = CountingPicker {
        index: 3,
        picks: Arc::clone(&picks),
    };

    let mut mic = ScriptedMic::new();
    mic.push_grant(tone_chunks(1));

    let handle = SessionRunner::spawn(test_session_config(), Box::new(mic), Box::new(picker));
    let mut updates = handle.updates();

    // Capture immediately: the first hint window never plays out
    handle.start().await.unwrap();
    wait_for_status(&mut updates, SessionStatus::Captured).await;
    assert_eq!(picks.load(Ordering::SeqCst), 0);

    // Reset re-arms the window; the hint shows up after the delay
    handle.reset().await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.hint.as_deref(), Some(DEFAULT_SUGGESTIONS[3]));
    assert_eq!(picks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_suggestion_pool_never_hints() {
    let mut config = test_session_config();
    config.suggestions = Vec::new();

    let mic = ScriptedMic::new();
    let handle = SessionRunner::spawn(config, Box::new(mic), Box::new(FixedPicker(0)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(handle.snapshot().hint.is_none());
    assert_eq!(handle.snapshot().status, SessionStatus::Idle);
}
