use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{AlertConfig, AlertError, Notification, Notifier, Transition};
use crate::types::HealthState;

pub struct AlertDispatcher {
    config: RwLock<AlertConfig>,
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config: RwLock::new(config), notifier }
    }

    pub async fn config(&self) -> AlertConfig {
        self.config.read().await.clone()
    }

    pub async fn set_config(&self, config: AlertConfig) {
        *self.config.write().await = config;
    }

    /// Whether `transition` deserves a notification under `config`.
    pub fn should_notify(config: &AlertConfig, transition: &Transition) -> bool {
        if !config.enabled {
            return false;
        }

        match transition.to {
            HealthState::Down => config.alert_on_down,
            HealthState::Degraded => config.alert_on_degraded,
            HealthState::Up => config.alert_on_up && transition.is_recovery(),
            HealthState::Unknown => false,
        }
    }

    /// Send a notification for `transition` in the background.
    ///
    /// Returns the delivery task, or `None` when the transition is filtered out.
    /// Delivery errors are logged by the task and never reach the caller.
    pub async fn dispatch(&self, transition: &Transition, label: &str) -> Option<JoinHandle<()>> {
        let config = self.config().await;
        if !Self::should_notify(&config, transition) {
            return None;
        }

        let notification = Notification::for_transition(&config, label, transition, Utc::now());
        let notifier = Arc::clone(&self.notifier);
        let service_key = transition.service_key.clone();

        info!(service = %service_key, from = %transition.from, to = %transition.to, "sending alert");
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                error!(service = %service_key, error = %e, "alert delivery failed");
            }
        }))
    }

    /// Deliver a test notification and report the outcome to the caller.
    pub async fn send_test(&self) -> Result<String, AlertError> {
        let config = self.config().await;
        if !config.enabled {
            return Err(AlertError::Disabled);
        }

        let notification = Notification::test(&config, Utc::now());
        self.notifier.send(&notification).await?;
        Ok(config.alert_email)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Notifier that keeps every notification and can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) sent: Mutex<Vec<Notification>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::Rejected(502));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn transition(from: HealthState, to: HealthState) -> Transition {
        Transition { service_key: "web".into(), from, to }
    }

    fn enabled() -> AlertConfig {
        AlertConfig { enabled: true, ..AlertConfig::default() }
    }

    #[test]
    fn test_flags_gate_each_state() {
        let config = enabled();
        assert!(AlertDispatcher::should_notify(&config, &transition(HealthState::Up, HealthState::Down)));
        assert!(AlertDispatcher::should_notify(
            &config,
            &transition(HealthState::Up, HealthState::Degraded)
        ));
        assert!(!AlertDispatcher::should_notify(&config, &transition(HealthState::Down, HealthState::Up)));

        let quiet = AlertConfig { alert_on_down: false, alert_on_up: true, ..enabled() };
        assert!(!AlertDispatcher::should_notify(&quiet, &transition(HealthState::Up, HealthState::Down)));
        assert!(AlertDispatcher::should_notify(&quiet, &transition(HealthState::Down, HealthState::Up)));
    }

    #[test]
    fn test_first_up_is_not_a_recovery() {
        let config = AlertConfig { alert_on_up: true, ..enabled() };

        assert!(!AlertDispatcher::should_notify(
            &config,
            &transition(HealthState::Unknown, HealthState::Up)
        ));
        assert!(AlertDispatcher::should_notify(
            &config,
            &transition(HealthState::Unknown, HealthState::Down)
        ));
    }

    #[test]
    fn test_disabled_config_sends_nothing() {
        let config = AlertConfig::default();
        assert!(!AlertDispatcher::should_notify(&config, &transition(HealthState::Up, HealthState::Down)));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(enabled(), notifier.clone());

        let handle = dispatcher
            .dispatch(&transition(HealthState::Up, HealthState::Down), "Website")
            .await
            .unwrap();
        handle.await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "[Servicarr] Website is DOWN");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let dispatcher = AlertDispatcher::new(enabled(), notifier);

        let handle = dispatcher
            .dispatch(&transition(HealthState::Up, HealthState::Down), "Website")
            .await
            .unwrap();

        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_send_test_reports_errors() {
        let dispatcher = AlertDispatcher::new(
            AlertConfig::default(),
            Arc::new(RecordingNotifier::default()),
        );
        assert!(matches!(dispatcher.send_test().await, Err(AlertError::Disabled)));

        dispatcher
            .set_config(AlertConfig { alert_email: "ops@example.com".into(), ..enabled() })
            .await;
        assert_eq!(dispatcher.send_test().await.unwrap(), "ops@example.com");

        let failing = AlertDispatcher::new(
            enabled(),
            Arc::new(RecordingNotifier { fail: true, ..Default::default() }),
        );
        assert!(matches!(failing.send_test().await, Err(AlertError::Rejected(502))));
    }
}
