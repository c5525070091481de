//! Ad-blocker detection popup
//!
//! `AdBlockPopup` is a pure state machine: it consumes events and returns the
//! effects (show, hide, timers, detection runs) the caller must perform.
//! `AdBlockWatcher` is the async driver that owns the timers and feeds
//! detection results from an injected `Detector` back into the machine.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};

/// Period of the detection recheck while the popup is shown
pub const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Delay after a dismissal before detection runs again
pub const DISMISS_GRACE: Duration = Duration::from_secs(5);

/// Script served at the bait URL. Blockers match on the `ads` path segment.
pub const BAIT_SCRIPT: &str = "window.__quillpostAdsLoaded = true;\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupState {
    #[default]
    Hidden,
    Shown,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupEvent {
    /// Result of an initial, periodic or manual detection run
    Detected { blocking: bool },
    /// The user closed the popup
    Dismiss,
    /// The user asked for a recheck
    ManualRecheck,
    /// The post-dismissal grace timer fired and detection ran
    GraceElapsed { blocking: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Show,
    Hide,
    StartRecheckTimer,
    StopRecheckTimer,
    StartGraceTimer,
    RunDetection,
}

/// Popup state machine
#[derive(Debug, Clone, Default)]
pub struct AdBlockPopup {
    state: PopupState,
}

impl AdBlockPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    /// Apply one event, returning the effects to perform in order
    pub fn handle(&mut self, event: PopupEvent) -> Vec<Effect> {
        use PopupEvent::*;
        use PopupState::*;

        let (next, effects) = match (self.state, event) {
            (Hidden, Detected { blocking: true }) => (Shown, vec![Effect::Show, Effect::StartRecheckTimer]),
            (Shown, Dismiss) | (Shown, Detected { blocking: false }) => (
                Dismissed,
                vec![Effect::Hide, Effect::StopRecheckTimer, Effect::StartGraceTimer],
            ),
            (Shown, ManualRecheck) => (Shown, vec![Effect::RunDetection]),
            (Dismissed, GraceElapsed { blocking: true }) => {
                (Shown, vec![Effect::Show, Effect::StartRecheckTimer])
            }
            (state, _) => (state, Vec::new()),
        };

        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "Ad-block popup transition");
        }
        self.state = next;
        effects
    }
}

/// Decides whether an ad blocker is active
#[async_trait]
pub trait Detector: Send + Sync {
    async fn is_blocking(&self) -> bool;
}

/// Detector that fetches the bait script; any failure counts as blocking
pub struct BaitDetector {
    client: reqwest::Client,
    bait_url: String,
}

impl BaitDetector {
    pub fn new(client: reqwest::Client, bait_url: impl Into<String>) -> Self {
        Self {
            client,
            bait_url: bait_url.into(),
        }
    }
}

#[async_trait]
impl Detector for BaitDetector {
    async fn is_blocking(&self) -> bool {
        match self.client.get(&self.bait_url).send().await {
            Ok(response) if response.status().is_success() => false,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Bait request rejected");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bait request failed");
                true
            }
        }
    }
}

enum Command {
    Dismiss,
    Recheck,
}

/// Runs the popup machine on a background task.
///
/// Detection runs once at start, then as the machine's timers require. The
/// task is aborted when the watcher is dropped.
pub struct AdBlockWatcher {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PopupState>,
    task: JoinHandle<()>,
}

impl AdBlockWatcher {
    pub fn spawn(detector: Arc<dyn Detector>) -> Self {
        Self::with_timing(detector, RECHECK_INTERVAL, DISMISS_GRACE)
    }

    pub fn with_timing(detector: Arc<dyn Detector>, recheck: Duration, grace: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(PopupState::Hidden);

        let driver = Driver {
            detector,
            popup: AdBlockPopup::new(),
            state_tx,
            recheck_period: recheck,
            grace_period: grace,
            recheck: None,
            grace_deadline: None,
        };
        let task = tokio::spawn(driver.run(rx));

        Self {
            commands,
            state,
            task,
        }
    }

    pub fn state(&self) -> PopupState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PopupState> {
        self.state.clone()
    }

    pub fn dismiss(&self) {
        let _ = self.commands.send(Command::Dismiss);
    }

    pub fn recheck(&self) {
        let _ = self.commands.send(Command::Recheck);
    }
}

impl Drop for AdBlockWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    detector: Arc<dyn Detector>,
    popup: AdBlockPopup,
    state_tx: watch::Sender<PopupState>,
    recheck_period: Duration,
    grace_period: Duration,
    recheck: Option<Interval>,
    grace_deadline: Option<Instant>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let blocking = self.detector.is_blocking().await;
        self.dispatch(PopupEvent::Detected { blocking }).await;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Dismiss) => self.dispatch(PopupEvent::Dismiss).await,
                    Some(Command::Recheck) => self.dispatch(PopupEvent::ManualRecheck).await,
                    None => break,
                },
                _ = next_tick(&mut self.recheck) => {
                    let blocking = self.detector.is_blocking().await;
                    self.dispatch(PopupEvent::Detected { blocking }).await;
                }
                _ = sleep_until(self.grace_deadline) => {
                    self.grace_deadline = None;
                    let blocking = self.detector.is_blocking().await;
                    self.dispatch(PopupEvent::GraceElapsed { blocking }).await;
                }
            }
        }
    }

    /// Feed an event and perform its effects, including follow-up detections
    async fn dispatch(&mut self, event: PopupEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            for effect in self.popup.handle(event) {
                match effect {
                    Effect::Show | Effect::Hide => {}
                    Effect::StartRecheckTimer => {
                        let start = Instant::now() + self.recheck_period;
                        self.recheck = Some(tokio::time::interval_at(start, self.recheck_period));
                    }
                    Effect::StopRecheckTimer => self.recheck = None,
                    Effect::StartGraceTimer => {
                        self.grace_deadline = Some(Instant::now() + self.grace_period);
                    }
                    Effect::RunDetection => {
                        let blocking = self.detector.is_blocking().await;
                        queue.push_back(PopupEvent::Detected { blocking });
                    }
                }
            }
        }

        self.state_tx.send_replace(self.popup.state());
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockDetector {
        blocking: AtomicBool,
        calls: AtomicUsize,
    }

    impl MockDetector {
        fn new(blocking: bool) -> Arc<Self> {
            Arc::new(Self {
                blocking: AtomicBool::new(blocking),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, blocking: bool) {
            self.blocking.store(blocking, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Detector for MockDetector {
        async fn is_blocking(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.blocking.load(Ordering::SeqCst)
        }
    }

    async fn wait_for_state(rx: &mut watch::Receiver<PopupState>, wanted: PopupState) {
        tokio::time::timeout(Duration::from_secs(30), rx.wait_for(|s| *s == wanted))
            .await
            .expect("timed out waiting for popup state")
            .expect("watcher stopped");
    }

    #[test]
    fn test_transition_table() {
        let mut popup = AdBlockPopup::new();

        assert!(popup.handle(PopupEvent::Detected { blocking: false }).is_empty());
        assert_eq!(popup.state(), PopupState::Hidden);

        assert_eq!(
            popup.handle(PopupEvent::Detected { blocking: true }),
            vec![Effect::Show, Effect::StartRecheckTimer]
        );
        assert_eq!(popup.state(), PopupState::Shown);

        assert!(popup.handle(PopupEvent::Detected { blocking: true }).is_empty());
        assert_eq!(popup.state(), PopupState::Shown);

        assert_eq!(
            popup.handle(PopupEvent::Dismiss),
            vec![Effect::Hide, Effect::StopRecheckTimer, Effect::StartGraceTimer]
        );
        assert_eq!(popup.state(), PopupState::Dismissed);

        assert!(popup.handle(PopupEvent::GraceElapsed { blocking: false }).is_empty());
        assert_eq!(popup.state(), PopupState::Dismissed);
    }

    #[test]
    fn test_clear_detection_hides_shown_popup() {
        let mut popup = AdBlockPopup::new();
        popup.handle(PopupEvent::Detected { blocking: true });

        let effects = popup.handle(PopupEvent::Detected { blocking: false });
        assert_eq!(popup.state(), PopupState::Dismissed);
        assert!(effects.contains(&Effect::Hide));
    }

    #[test]
    fn test_grace_with_blocking_reshows() {
        let mut popup = AdBlockPopup::new();
        popup.handle(PopupEvent::Detected { blocking: true });
        popup.handle(PopupEvent::Dismiss);

        let effects = popup.handle(PopupEvent::GraceElapsed { blocking: true });
        assert_eq!(popup.state(), PopupState::Shown);
        assert_eq!(effects, vec![Effect::Show, Effect::StartRecheckTimer]);
    }

    #[test]
    fn test_manual_recheck_only_while_shown() {
        let mut popup = AdBlockPopup::new();
        assert!(popup.handle(PopupEvent::ManualRecheck).is_empty());

        popup.handle(PopupEvent::Detected { blocking: true });
        assert_eq!(popup.handle(PopupEvent::ManualRecheck), vec![Effect::RunDetection]);
        assert_eq!(popup.handle(PopupEvent::ManualRecheck), vec![Effect::RunDetection]);
        assert_eq!(popup.state(), PopupState::Shown);
    }

    #[test]
    fn test_events_ignored_in_other_states() {
        let mut popup = AdBlockPopup::new();
        assert!(popup.handle(PopupEvent::Dismiss).is_empty());
        assert!(popup.handle(PopupEvent::GraceElapsed { blocking: true }).is_empty());
        assert_eq!(popup.state(), PopupState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_hides_when_blocker_disabled() {
        let detector = MockDetector::new(true);
        let watcher = AdBlockWatcher::spawn(detector.clone());
        let mut rx = watcher.subscribe();

        wait_for_state(&mut rx, PopupState::Shown).await;

        detector.set(false);
        wait_for_state(&mut rx, PopupState::Dismissed).await;
        assert!(detector.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_reshows_after_grace() {
        let detector = MockDetector::new(true);
        let watcher = AdBlockWatcher::spawn(detector.clone());
        let mut rx = watcher.subscribe();
        wait_for_state(&mut rx, PopupState::Shown).await;

        watcher.dismiss();
        wait_for_state(&mut rx, PopupState::Dismissed).await;

        wait_for_state(&mut rx, PopupState::Shown).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_stays_dismissed_when_clear_after_grace() {
        let detector = MockDetector::new(true);
        let watcher = AdBlockWatcher::spawn(detector.clone());
        let mut rx = watcher.subscribe();
        wait_for_state(&mut rx, PopupState::Shown).await;

        detector.set(false);
        watcher.dismiss();
        wait_for_state(&mut rx, PopupState::Dismissed).await;

        tokio::time::sleep(DISMISS_GRACE * 4).await;
        assert_eq!(watcher.state(), PopupState::Dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_manual_recheck_hides_when_clear() {
        let detector = MockDetector::new(true);
        let hour = Duration::from_secs(3600);
        let watcher = AdBlockWatcher::with_timing(detector.clone(), hour, hour);
        let mut rx = watcher.subscribe();
        wait_for_state(&mut rx, PopupState::Shown).await;

        detector.set(false);
        let started = Instant::now();
        watcher.recheck();

        tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == PopupState::Dismissed))
            .await
            .expect("recheck did not run detection")
            .expect("watcher stopped");
        assert!(started.elapsed() < hour);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_never_shows_without_blocker() {
        let detector = MockDetector::new(false);
        let watcher = AdBlockWatcher::spawn(detector.clone());

        tokio::time::sleep(RECHECK_INTERVAL * 3).await;
        assert_eq!(watcher.state(), PopupState::Hidden);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }
}
