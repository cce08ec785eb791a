use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::progress::{HoldProgress, HoldTick};
use super::release::{ReleaseSource, ReleaseSubscription};
use super::{HoldConfig, HoldEvent, HoldGesture, PressOutcome};
use crate::emergency::EmergencySessionManager;
use crate::runtime::{RakshaRuntime, RuntimeEvent};

/// One hold in flight. Dropping it stops the ticker and removes the release listener.
struct ActiveHold {
    id: u64,
    ticker: JoinHandle<()>,
    _release: ReleaseSubscription,
}

impl Drop for ActiveHold {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[derive(Default)]
struct HoldState {
    active: Option<ActiveHold>,
    next_id: u64,
}

#[derive(Debug, Clone, Copy)]
enum HoldEnd {
    Released,
    Completed,
    Aborted,
}

struct Inner {
    config: HoldConfig,
    manager: Arc<EmergencySessionManager>,
    releases: Arc<ReleaseSource>,
    state: Mutex<HoldState>,
    gesture_tx: watch::Sender<HoldGesture>,
    runtime: Option<Arc<dyn RakshaRuntime>>,
}

/// Turns press / release into SOS transitions.
///
/// At most one hold is in flight per controller; the `state` lock is held across
/// every start, tick and end, so a tick and a release can never both finish the
/// same hold, and the episode is triggered at most once per hold.
pub struct HoldController {
    inner: Arc<Inner>,
}

impl HoldController {
    pub fn new(
        config: HoldConfig,
        manager: Arc<EmergencySessionManager>,
        releases: Arc<ReleaseSource>,
    ) -> Self {
        let (gesture_tx, _) = watch::channel(HoldGesture::default());
        Self {
            inner: Arc::new(Inner {
                config,
                manager,
                releases,
                state: Mutex::new(HoldState::default()),
                gesture_tx,
                runtime: None,
            }),
        }
    }

    pub fn with_runtime(
        config: HoldConfig,
        manager: Arc<EmergencySessionManager>,
        releases: Arc<ReleaseSource>,
        runtime: Arc<dyn RakshaRuntime>,
    ) -> Self {
        let (gesture_tx, _) = watch::channel(HoldGesture::default());
        Self {
            inner: Arc::new(Inner {
                config,
                manager,
                releases,
                state: Mutex::new(HoldState::default()),
                gesture_tx,
                runtime: Some(runtime),
            }),
        }
    }

    pub fn config(&self) -> HoldConfig {
        self.inner.config
    }

    pub fn gesture(&self) -> HoldGesture {
        *self.inner.gesture_tx.borrow()
    }

    pub fn is_holding(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<HoldGesture> {
        self.inner.gesture_tx.subscribe()
    }

    /// Press on the SOS control.
    ///
    /// Cancels straight away if an episode is active. Otherwise starts the ramp and
    /// installs a release listener for the duration of the hold. A press while a
    /// hold is already in flight is ignored.
    pub fn press_start(&self) -> PressOutcome {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if inner.manager.is_active() {
            // A hold may still be ramping if the episode was raised elsewhere
            let stale = state.active.take();
            inner.manager.cancel();
            inner.gesture_tx.send_replace(HoldGesture::default());
            tracing::info!("[hold] Tap while active: episode cancelled");
            inner.emit(HoldEvent::EpisodeCancelled);
            drop(stale);
            return PressOutcome::CancelledEpisode;
        }

        if state.active.is_some() {
            tracing::debug!("[hold] press ignored: hold already in flight");
            return PressOutcome::Ignored;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("[hold] press ignored: no async runtime for the hold timer");
            return PressOutcome::Ignored;
        };

        let id = state.next_id;
        state.next_id += 1;

        let weak = Arc::downgrade(inner);
        let release = inner.releases.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.end_hold(id, HoldEnd::Released);
            }
        });
        let ticker = handle.spawn(run_ticker(Arc::downgrade(inner), id, inner.config));

        state.active = Some(ActiveHold {
            id,
            ticker,
            _release: release,
        });
        inner.gesture_tx.send_replace(HoldGesture {
            progress: 0,
            is_holding: true,
        });
        tracing::debug!("[hold] Hold {} started", id);
        inner.emit(HoldEvent::Started);
        PressOutcome::HoldStarted
    }

    /// Pointer released anywhere. Delivered through the shared release source, so
    /// it reaches the current hold's listener if there is one and is a no-op otherwise.
    pub fn press_end(&self) {
        self.inner.releases.release();
    }

    /// Tear down any hold in flight without triggering.
    pub fn abort(&self) {
        let id = self.inner.state.lock().active.as_ref().map(|h| h.id);
        if let Some(id) = id {
            self.inner.end_hold(id, HoldEnd::Aborted);
        }
    }
}

impl Inner {
    /// Record a tick. Returns `false` if hold `id` is no longer the active one.
    fn report_progress(&self, id: u64, progress: u8) -> bool {
        let state = self.state.lock();
        if state.active.as_ref().map(|h| h.id) != Some(id) {
            return false;
        }
        tracing::debug!("[hold] Hold {} at {}", id, progress);
        self.gesture_tx.send_replace(HoldGesture {
            progress,
            is_holding: true,
        });
        self.emit(HoldEvent::Progress { progress });
        true
    }

    /// Finish hold `id` exactly once, whichever path gets here first.
    fn end_hold(&self, id: u64, end: HoldEnd) {
        let mut state = self.state.lock();
        if state.active.as_ref().map(|h| h.id) != Some(id) {
            return;
        }

        let progress = self.gesture_tx.borrow().progress;
        let hold = state.active.take();

        let event = match end {
            HoldEnd::Released => HoldEvent::Released { progress },
            HoldEnd::Completed => {
                let triggered = self.manager.trigger();
                if !triggered {
                    tracing::info!("[hold] Hold {} completed; episode already active", id);
                }
                HoldEvent::Completed { triggered }
            }
            HoldEnd::Aborted => HoldEvent::Aborted,
        };
        self.gesture_tx.send_replace(HoldGesture::default());
        tracing::debug!("[hold] Hold {} ended: {:?}", id, end);
        self.emit(event);

        // Stops the ticker and removes the release listener
        drop(hold);
    }

    fn emit(&self, event: HoldEvent) {
        if let Some(runtime) = &self.runtime {
            if let Err(e) = runtime.emit(RuntimeEvent::Hold(event)) {
                tracing::debug!("[hold] event not delivered: {}", e);
            }
        }
    }
}

async fn run_ticker(inner: Weak<Inner>, id: u64, config: HoldConfig) {
    let mut interval = interval_at(Instant::now() + config.tick, config.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut progress = HoldProgress::new(&config);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };

        match progress.advance() {
            HoldTick::Advanced(value) => {
                if !inner.report_progress(id, value) {
                    return;
                }
            }
            HoldTick::Completed => {
                // Show the full bar before the reset
                if inner.report_progress(id, progress.value()) {
                    inner.end_hold(id, HoldEnd::Completed);
                }
                return;
            }
            HoldTick::Finished => return,
        }
    }
}
