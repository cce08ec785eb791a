use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use super::episode::{EmergencyEpisode, Recipient};
use super::events::{EmergencyEvent, EpisodeObserver};
use super::notifier::{AlertKind, EmergencyAlert, NotificationDispatcher};
use crate::contacts::ContactDirectory;
use crate::geolocation::{Coordinates, GeolocationAdapter};
use crate::runtime::{RakshaRuntime, RuntimeEvent};

/// Owns the session's `EmergencyEpisode` and every transition on it.
///
/// All transitions go through one mutex. Observers, the snapshot channel and the
/// runtime are notified while that mutex is held, so every consumer sees
/// transitions in exactly the order they were applied: a `cancel()` that lands
/// right after a `trigger()` always leaves the episode inactive.
pub struct EmergencySessionManager {
    episode: Mutex<EmergencyEpisode>,
    snapshot_tx: watch::Sender<EmergencyEpisode>,
    observers: RwLock<Vec<Arc<dyn EpisodeObserver>>>,
    runtime: Option<Arc<dyn RakshaRuntime>>,
    directory: Arc<ContactDirectory>,
    geolocation: GeolocationAdapter,
    dispatcher: Arc<dyn NotificationDispatcher>,
    sender: String,
}

impl EmergencySessionManager {
    pub fn new(
        directory: Arc<ContactDirectory>,
        geolocation: GeolocationAdapter,
        dispatcher: Arc<dyn NotificationDispatcher>,
        sender: impl Into<String>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(EmergencyEpisode::default());
        Self {
            episode: Mutex::new(EmergencyEpisode::default()),
            snapshot_tx,
            observers: RwLock::new(Vec::new()),
            runtime: None,
            directory,
            geolocation,
            dispatcher,
            sender: sender.into(),
        }
    }

    /// Forward every transition to the presentation runtime as well.
    pub fn with_runtime(mut self, runtime: Arc<dyn RakshaRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Register a synchronous observer. Observers run in registration order.
    pub fn add_observer(&self, observer: Arc<dyn EpisodeObserver>) {
        self.observers.write().push(observer);
    }

    /// Current episode state.
    pub fn episode(&self) -> EmergencyEpisode {
        self.episode.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.episode.lock().is_active
    }

    /// Subscribe to episode snapshots; the receiver always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<EmergencyEpisode> {
        self.snapshot_tx.subscribe()
    }

    /// Start an episode. No-op (returns `false`) if one is already active.
    ///
    /// The episode is active when this returns. The position lookup and the
    /// notifications to the snapshotted recipients run in the background; their
    /// failures are logged and never undo the activation.
    pub fn trigger(self: &Arc<Self>) -> bool {
        let (alert, recipients) = {
            let mut episode = self.episode.lock();
            if episode.is_active {
                tracing::debug!("[sos] trigger ignored: episode already active");
                return false;
            }

            let recipients: Vec<Recipient> = self
                .directory
                .emergency_contacts()
                .iter()
                .map(Recipient::from)
                .collect();
            let episode_id = Uuid::new_v4();
            let started_at = Utc::now();

            episode.episode_id = Some(episode_id);
            episode.is_active = true;
            episode.started_at = Some(started_at);
            episode.recipients = recipients.clone();

            tracing::info!(
                "[sos] Episode {} triggered, {} recipient(s)",
                episode_id,
                recipients.len()
            );
            self.publish(
                &episode,
                EmergencyEvent::Triggered {
                    episode_id,
                    sender: self.sender.clone(),
                    started_at,
                    recipients: recipients.clone(),
                },
            );

            let alert = EmergencyAlert {
                kind: AlertKind::Raised,
                episode_id,
                sender: self.sender.clone(),
                started_at,
                location: None,
            };
            (alert, recipients)
        };

        self.spawn_background(alert, recipients);
        true
    }

    /// Stand the active episode down. No-op (returns `false`) if inactive.
    ///
    /// The last location is kept as a cache; everything else is cleared.
    pub fn cancel(&self) -> bool {
        let mut episode = self.episode.lock();
        if !episode.is_active {
            tracing::debug!("[sos] cancel ignored: no active episode");
            return false;
        }

        let duration_ms = episode.elapsed_ms(Utc::now()).unwrap_or(0);
        let episode_id = episode.episode_id.take().unwrap_or_else(Uuid::nil);
        episode.is_active = false;
        episode.started_at = None;
        episode.recipients.clear();

        tracing::info!(
            "[sos] Episode {} cancelled after {}ms",
            episode_id,
            duration_ms
        );
        self.publish(
            &episode,
            EmergencyEvent::Cancelled {
                episode_id,
                duration_ms,
            },
        );
        true
    }

    /// Store the latest known position. Allowed whether or not an episode is active.
    pub fn update_location(&self, latitude: f64, longitude: f64) {
        let coords = Coordinates::new(latitude, longitude);
        if !coords.is_valid() {
            tracing::warn!("[sos] storing out-of-range position ({}, {})", latitude, longitude);
        }

        let mut episode = self.episode.lock();
        episode.location = Some(coords);
        tracing::debug!("[sos] Location updated to ({}, {})", latitude, longitude);
        self.publish(
            &episode,
            EmergencyEvent::LocationUpdated {
                latitude,
                longitude,
            },
        );
    }

    /// Attach a looked-up position, but only to the episode that asked for it.
    fn attach_location(&self, episode_id: Uuid, coords: Coordinates) -> Option<EmergencyAlert> {
        let mut episode = self.episode.lock();
        if !episode.is_active || episode.episode_id != Some(episode_id) {
            tracing::debug!(
                "[sos] Discarding position for episode {} (no longer active)",
                episode_id
            );
            return None;
        }

        episode.location = Some(coords);
        tracing::info!(
            "[sos] Episode {} located at ({}, {})",
            episode_id,
            coords.latitude,
            coords.longitude
        );
        self.publish(
            &episode,
            EmergencyEvent::LocationAttached {
                episode_id,
                latitude: coords.latitude,
                longitude: coords.longitude,
            },
        );

        Some(EmergencyAlert {
            kind: AlertKind::Location,
            episode_id,
            sender: self.sender.clone(),
            started_at: episode.started_at.unwrap_or_else(Utc::now),
            location: Some(coords),
        })
    }

    fn report_location_unavailable(&self, episode_id: Uuid, reason: String) {
        let episode = self.episode.lock();
        if episode.episode_id != Some(episode_id) {
            return;
        }
        tracing::warn!(
            "[sos] Episode {} continuing without location: {}",
            episode_id,
            reason
        );
        self.publish(
            &episode,
            EmergencyEvent::LocationUnavailable { episode_id, reason },
        );
    }

    fn spawn_background(self: &Arc<Self>, alert: EmergencyAlert, recipients: Vec<Recipient>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                "[sos] No async runtime; episode {} active without location or notifications",
                alert.episode_id
            );
            return;
        };

        let dispatcher = self.dispatcher.clone();
        let raised = alert.clone();
        let raised_recipients = recipients.clone();
        handle.spawn(async move {
            dispatch_all(dispatcher, raised_recipients, raised).await;
        });

        let manager = Arc::clone(self);
        handle.spawn(async move {
            let episode_id = alert.episode_id;
            match manager.geolocation.locate().await {
                Ok(coords) => {
                    if let Some(update) = manager.attach_location(episode_id, coords) {
                        dispatch_all(manager.dispatcher.clone(), recipients, update).await;
                    }
                }
                Err(e) => manager.report_location_unavailable(episode_id, e.to_string()),
            }
        });
    }

    fn publish(&self, episode: &EmergencyEpisode, event: EmergencyEvent) {
        self.snapshot_tx.send_replace(episode.clone());

        for observer in self.observers.read().iter() {
            observer.on_event(&event, episode);
        }

        if let Some(runtime) = &self.runtime {
            if let Err(e) = runtime.emit(RuntimeEvent::Emergency(event)) {
                tracing::debug!("[sos] event not delivered: {}", e);
            }
        }
    }
}

/// Notify every recipient concurrently. A failure for one does not affect the others.
async fn dispatch_all(
    dispatcher: Arc<dyn NotificationDispatcher>,
    recipients: Vec<Recipient>,
    alert: EmergencyAlert,
) {
    if recipients.is_empty() {
        tracing::info!(
            "[notify] Episode {} has no emergency contacts to notify",
            alert.episode_id
        );
        return;
    }

    let deliveries = recipients
        .iter()
        .map(|recipient| dispatcher.notify(recipient, &alert));
    let results = join_all(deliveries).await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    for err in results.into_iter().filter_map(Result::err) {
        tracing::warn!("[notify] {}", err);
    }
    tracing::info!(
        "[notify] Episode {} {:?} alert: {}/{} delivered",
        alert.episode_id,
        alert.kind,
        recipients.len() - failed,
        recipients.len()
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use super::*;
    use crate::emergency::notifier::{DispatchError, NullDispatcher};
    use crate::geolocation::{FixedLocationSource, LocationError, LocationSource};

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, AlertKind)>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn notify(
            &self,
            recipient: &Recipient,
            alert: &EmergencyAlert,
        ) -> Result<(), DispatchError> {
            if self.fail_for.as_deref() == Some(recipient.name.as_str()) {
                return Err(DispatchError::Delivery {
                    recipient: recipient.name.clone(),
                    reason: "gateway down".to_string(),
                });
            }
            self.sent.lock().push((recipient.name.clone(), alert.kind));
            Ok(())
        }
    }

    struct SlowSource {
        delay: Duration,
        coords: Coordinates,
    }

    #[async_trait]
    impl LocationSource for SlowSource {
        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.coords)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl EpisodeObserver for EventLog {
        fn on_event(&self, event: &EmergencyEvent, episode: &EmergencyEpisode) {
            let label = match event {
                EmergencyEvent::Triggered { .. } => "triggered",
                EmergencyEvent::Cancelled { .. } => "cancelled",
                EmergencyEvent::LocationAttached { .. } => "located",
                EmergencyEvent::LocationUnavailable { .. } => "unlocated",
                EmergencyEvent::LocationUpdated { .. } => "updated",
            };
            self.0
                .lock()
                .push(format!("{}:{}", label, episode.is_active));
        }
    }

    fn manager_with(
        directory: Arc<ContactDirectory>,
        geolocation: GeolocationAdapter,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Arc<EmergencySessionManager> {
        Arc::new(EmergencySessionManager::new(
            directory,
            geolocation,
            dispatcher,
            "Priya",
        ))
    }

    fn fixed(lat: f64, lng: f64) -> GeolocationAdapter {
        GeolocationAdapter::new(Arc::new(FixedLocationSource::new(Coordinates::new(lat, lng))))
    }

    fn plain_manager() -> Arc<EmergencySessionManager> {
        manager_with(
            Arc::new(ContactDirectory::new()),
            GeolocationAdapter::unavailable(),
            Arc::new(NullDispatcher),
        )
    }

    #[tokio::test]
    async fn test_trigger_and_cancel() {
        let manager = plain_manager();
        assert!(!manager.is_active());

        assert!(manager.trigger());
        let episode = manager.episode();
        assert!(episode.is_active);
        assert!(episode.started_at.is_some());
        assert!(episode.episode_id.is_some());

        assert!(manager.cancel());
        let episode = manager.episode();
        assert!(!episode.is_active);
        assert!(episode.started_at.is_none());
        assert!(episode.episode_id.is_none());
    }

    #[tokio::test]
    async fn test_double_trigger_is_single_episode() {
        let manager = plain_manager();
        assert!(manager.trigger());
        let first = manager.episode();
        assert!(!manager.trigger());
        assert_eq!(manager.episode().episode_id, first.episode_id);
        assert_eq!(manager.episode().started_at, first.started_at);
    }

    #[tokio::test]
    async fn test_cancel_while_inactive_is_noop() {
        let manager = plain_manager();
        let log = Arc::new(EventLog::default());
        manager.add_observer(log.clone());

        assert!(!manager.cancel());
        assert!(log.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_with_no_emergency_contacts() {
        let directory = Arc::new(ContactDirectory::new());
        directory.add_contact("Not flagged", "9876543210", "Friend").unwrap();
        let manager = plain_manager_with_directory(directory);

        assert!(manager.trigger());
        assert!(manager.is_active());
        assert!(manager.episode().recipients.is_empty());
    }

    fn plain_manager_with_directory(
        directory: Arc<ContactDirectory>,
    ) -> Arc<EmergencySessionManager> {
        manager_with(
            directory,
            GeolocationAdapter::unavailable(),
            Arc::new(NullDispatcher),
        )
    }

    #[tokio::test]
    async fn test_recipient_snapshot_survives_removal() {
        let directory = Arc::new(ContactDirectory::new());
        let mom = directory.add_contact("Mom", "9999999999", "Mother").unwrap();
        directory.toggle_emergency(mom.id());
        let manager = plain_manager_with_directory(directory.clone());

        assert!(manager.trigger());
        let episode = manager.episode();
        assert!(episode.is_active);
        assert!(episode.started_at.is_some());
        assert_eq!(episode.recipient_names(), vec!["Mom"]);

        directory.remove_contact(mom.id());
        assert!(directory.is_empty());
        assert_eq!(manager.episode().recipient_names(), vec!["Mom"]);
    }

    #[tokio::test]
    async fn test_location_attaches_after_trigger_returns() {
        let manager = manager_with(
            Arc::new(ContactDirectory::new()),
            fixed(28.6139, 77.209),
            Arc::new(NullDispatcher),
        );
        let mut rx = manager.subscribe();

        assert!(manager.trigger());
        // Nothing has been polled yet on this current-thread runtime
        assert!(manager.episode().location.is_none());

        let episode = rx.wait_for(|e| e.location.is_some()).await.unwrap().clone();
        assert!(episode.is_active);
        assert_eq!(episode.location, Some(Coordinates::new(28.6139, 77.209)));
    }

    #[tokio::test]
    async fn test_location_failure_degrades() {
        let manager = plain_manager();
        let log = Arc::new(EventLog::default());
        manager.add_observer(log.clone());

        assert!(manager.trigger());
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(manager.is_active());
        assert!(manager.episode().location.is_none());
        assert_eq!(
            *log.0.lock(),
            vec!["triggered:true".to_string(), "unlocated:true".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_position_not_attached_to_next_episode() {
        let manager = manager_with(
            Arc::new(ContactDirectory::new()),
            GeolocationAdapter::new(Arc::new(SlowSource {
                delay: Duration::from_millis(500),
                coords: Coordinates::new(10.0, 20.0),
            })),
            Arc::new(NullDispatcher),
        );

        assert!(manager.trigger());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(manager.cancel());
        assert!(manager.trigger());
        let second = manager.episode().episode_id;

        // First lookup resolves at 500ms, second at 600ms
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(manager.episode().episode_id, second);
        assert!(manager.episode().location.is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            manager.episode().location,
            Some(Coordinates::new(10.0, 20.0))
        );
    }

    #[tokio::test]
    async fn test_cancel_before_lookup_discards_position() {
        let manager = manager_with(
            Arc::new(ContactDirectory::new()),
            fixed(1.0, 2.0),
            Arc::new(NullDispatcher),
        );

        assert!(manager.trigger());
        assert!(manager.cancel());
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(!manager.is_active());
        assert!(manager.episode().location.is_none());
    }

    #[tokio::test]
    async fn test_update_location_in_either_state() {
        let manager = plain_manager();
        manager.update_location(12.0, 77.0);
        assert_eq!(manager.episode().location, Some(Coordinates::new(12.0, 77.0)));
        assert!(!manager.is_active());

        assert!(manager.trigger());
        manager.update_location(13.0, 78.0);
        assert!(manager.cancel());

        // Retained as a cache after cancel
        assert_eq!(manager.episode().location, Some(Coordinates::new(13.0, 78.0)));
    }

    #[tokio::test]
    async fn test_observers_see_transitions_in_order() {
        let manager = plain_manager();
        let log = Arc::new(EventLog::default());
        manager.add_observer(log.clone());

        manager.trigger();
        manager.cancel();
        manager.update_location(1.0, 1.0);

        let seen = log.0.lock().clone();
        assert_eq!(
            seen,
            vec![
                "triggered:true".to_string(),
                "cancelled:false".to_string(),
                "updated:false".to_string()
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_sent_to_each_recipient() {
        let directory = Arc::new(ContactDirectory::new());
        for name in ["Mom", "Dad", "Friend"] {
            let c = directory.add_contact(name, "9999999999", "Other").unwrap();
            if name != "Friend" {
                directory.toggle_emergency(c.id());
            }
        }
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_for: Some("Mom".to_string()),
            ..Default::default()
        });
        let manager = manager_with(directory, fixed(5.0, 5.0), dispatcher.clone());

        assert!(manager.trigger());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(manager.is_active());
        let sent = dispatcher.sent.lock().clone();
        assert_eq!(
            sent,
            vec![
                ("Dad".to_string(), AlertKind::Raised),
                ("Dad".to_string(), AlertKind::Location)
            ]
        );
    }

    #[test]
    fn test_trigger_without_async_runtime_still_activates() {
        let manager = manager_with(
            Arc::new(ContactDirectory::new()),
            fixed(1.0, 1.0),
            Arc::new(NullDispatcher),
        );
        assert!(manager.trigger());
        assert!(manager.is_active());
        assert!(manager.episode().location.is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// `is_active` equals "the last effective call was trigger".
        #[test]
        fn prop_active_tracks_last_call(ops in proptest::collection::vec(any::<bool>(), 0..40)) {
            let manager = plain_manager();
            let mut expected = false;
            for trigger in ops {
                if trigger {
                    let changed = manager.trigger();
                    prop_assert_eq!(changed, !expected);
                    expected = true;
                } else {
                    let changed = manager.cancel();
                    prop_assert_eq!(changed, expected);
                    expected = false;
                }
                prop_assert_eq!(manager.is_active(), expected);
                prop_assert_eq!(manager.episode().started_at.is_some(), expected);
            }
        }
    }
}
