//! Best-effort push notification dispatch.
//!
//! The reservation coordinator emits a [`NotificationIntent`] only after a
//! successful commit; a dispatcher task consumes intents from a bounded
//! queue on its own detached context, fans out to the owner's opted-in
//! device tokens, and logs per-token outcomes. Nothing on this path blocks
//! a request, holds a lock, or propagates errors.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{BookingId, UserId};
use crate::db::{FullRepository, TransactionManager, UserRepository};

/// Push gateway seam; the production implementation lives with the other
/// messaging adapters outside this crate.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver one push message to one device token.
    async fn send_notification(&self, token: &str, title: &str, body: &str)
        -> Result<(), String>;
}

/// A notification to fan out to one user's devices.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationIntent {
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub title: String,
    pub body: String,
}

/// Producer side of the dispatch queue. Emission is non-blocking and
/// lossy: when the queue is full or the dispatcher is gone, the intent is
/// dropped with a log line.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: Option<mpsc::Sender<NotificationIntent>>,
}

impl NotificationQueue {
    /// A bounded queue plus the receiver to hand to the dispatcher.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<NotificationIntent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A queue that drops everything; for contexts without a dispatcher.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue an intent, best-effort.
    pub fn emit(&self, intent: NotificationIntent) {
        let Some(ref tx) = self.tx else {
            return;
        };
        match tx.try_send(intent) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(intent)) => {
                tracing::warn!(
                    user_id = intent.user_id.value(),
                    booking_id = intent.booking_id.value(),
                    "notification.queue_full"
                );
            }
            Err(mpsc::error::TrySendError::Closed(intent)) => {
                tracing::warn!(
                    user_id = intent.user_id.value(),
                    booking_id = intent.booking_id.value(),
                    "notification.dispatcher_gone"
                );
            }
        }
    }
}

/// Consumes intents and fans them out to device tokens.
pub struct NotificationDispatcher {
    repo: Arc<dyn FullRepository>,
    gateway: Arc<dyn NotificationGateway>,
    max_attempts: u32,
}

impl NotificationDispatcher {
    pub fn new(repo: Arc<dyn FullRepository>, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            repo,
            gateway,
            max_attempts: 3,
        }
    }

    /// Spawn the dispatch loop on a detached task. The task ends when every
    /// queue handle is dropped.
    pub fn spawn(self, mut rx: mpsc::Receiver<NotificationIntent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(intent) = rx.recv().await {
                self.dispatch(intent).await;
            }
            tracing::debug!("notification.dispatcher_stopped");
        })
    }

    /// Fan one intent out to the user's opted-in device tokens.
    pub async fn dispatch(&self, intent: NotificationIntent) {
        let tokens = match self.load_tokens(intent.user_id).await {
            Ok(tokens) => tokens,
            Err(message) => {
                tracing::warn!(
                    user_id = intent.user_id.value(),
                    error = %message,
                    "notification.token_lookup_failed"
                );
                return;
            }
        };

        if tokens.is_empty() {
            tracing::debug!(user_id = intent.user_id.value(), "notification.no_tokens");
            return;
        }

        for token in tokens {
            self.send_with_retry(&token, &intent).await;
        }
    }

    async fn load_tokens(&self, user_id: UserId) -> Result<Vec<String>, String> {
        let mut tx = self
            .repo
            .begin_read_only()
            .await
            .map_err(|e| e.to_string())?;
        let result = self
            .repo
            .list_device_tokens_by_user_if_opted_in(&mut tx, user_id)
            .await
            .map_err(|e| e.to_string());
        let _ = self.repo.rollback(tx).await;
        result
    }

    async fn send_with_retry(&self, token: &str, intent: &NotificationIntent) {
        let mut delay = std::time::Duration::from_millis(200);
        for attempt in 1..=self.max_attempts {
            match self
                .gateway
                .send_notification(token, &intent.title, &intent.body)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        user_id = intent.user_id.value(),
                        booking_id = intent.booking_id.value(),
                        "notification.sent"
                    );
                    return;
                }
                Err(message) if attempt < self.max_attempts => {
                    tracing::debug!(
                        attempt,
                        error = %message,
                        "notification.retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(message) => {
                    tracing::warn!(
                        user_id = intent.user_id.value(),
                        booking_id = intent.booking_id.value(),
                        error = %message,
                        "notification.send_failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingGateway {
        sent: Mutex<Vec<String>>,
        fail_first: Mutex<bool>,
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn send_notification(
            &self,
            token: &str,
            _title: &str,
            _body: &str,
        ) -> Result<(), String> {
            let mut fail = self.fail_first.lock();
            if *fail {
                *fail = false;
                return Err("transient".to_string());
            }
            self.sent.lock().push(token.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_fans_out_to_opted_in_tokens_with_retry() {
        use crate::db::repositories::LocalRepository;

        let repo = Arc::new(LocalRepository::new());
        repo.seed_user(crate::models::User {
            id: UserId(100),
            full_name: "Owner".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            timezone: None,
            photographer: false,
        })
        .await;
        repo.seed_device_token(UserId(100), "tok-a", true).await;
        repo.seed_device_token(UserId(100), "tok-b", false).await;

        let gateway = Arc::new(RecordingGateway {
            sent: Mutex::new(Vec::new()),
            fail_first: Mutex::new(true),
        });

        let dispatcher = NotificationDispatcher::new(repo, gateway.clone());
        dispatcher
            .dispatch(NotificationIntent {
                user_id: UserId(100),
                booking_id: BookingId(1),
                title: "Photo Session Confirmed".to_string(),
                body: "See you there".to_string(),
            })
            .await;

        // Opted-out token is never contacted; the transient failure on the
        // first attempt is retried.
        assert_eq!(gateway.sent.lock().clone(), vec!["tok-a".to_string()]);
    }

    #[test]
    fn disabled_queue_drops_silently() {
        let queue = NotificationQueue::disabled();
        queue.emit(NotificationIntent {
            user_id: UserId(1),
            booking_id: BookingId(1),
            title: String::new(),
            body: String::new(),
        });
    }
}
