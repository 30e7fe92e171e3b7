use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use tokio::sync::oneshot;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use crate::services::formatter;
use crate::services::registry_service::RegistryHandle;
use crate::state::{ConnectionHandle, SubscriptionId};

/// Outcome of one publish.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Register a new subscriber and return the body stream that holds its
/// response open until a publish, a disconnect or the hold limit.
pub fn subscribe(
    registry: &RegistryHandle,
    callback: Option<String>,
    max_hold: Option<Duration>,
) -> NotificationStream {
    let id = registry.next_id();
    let (handle, rx) = ConnectionHandle::new(id);

    info!(subscription_id = %id, callback = ?callback, "subscriber connected");
    registry.register(handle, callback);

    NotificationStream {
        id,
        rx: Some(rx),
        deadline: max_hold.map(|d| Box::pin(tokio::time::sleep(d))),
        observer: Some(DisconnectObserver {
            id,
            registry: Some(registry.clone()),
        }),
    }
}

/// Deliver `content` to every subscriber pending right now, oldest first.
///
/// Subscribers arriving after the drain wait for the next publish. A failed
/// delivery is logged and does not stop the remaining ones.
pub async fn publish(registry: &RegistryHandle, content: &str) -> PublishReport {
    let pending = registry.drain_all().await;
    let mut report = PublishReport::default();

    for sub in pending {
        let id = sub.id();
        let held_ms = (Utc::now() - sub.subscribed_at).num_milliseconds();
        let body = formatter::notification(sub.callback.as_deref(), content);

        match sub.handle.deliver(body) {
            Ok(()) => {
                report.delivered += 1;
                debug!(subscription_id = %id, held_ms, "notified");
            }
            Err(e) => {
                report.failed += 1;
                warn!(subscription_id = %id, "delivery failed: {e}");
            }
        }
    }

    info!(
        delivered = report.delivered,
        failed = report.failed,
        "publish complete"
    );

    report
}

/// Removes a subscription whose connection ends before it is notified.
///
/// Armed while the subscription is pending; dropping it armed sends the
/// removal. Removal of an entry a publish already drained is a no-op.
#[derive(Debug)]
pub struct DisconnectObserver {
    id: SubscriptionId,
    registry: Option<RegistryHandle>,
}

impl DisconnectObserver {
    fn disarm(mut self) {
        self.registry = None;
    }
}

impl Drop for DisconnectObserver {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            info!(subscription_id = %self.id, "subscriber disconnected");
            registry.remove(self.id);
        }
    }
}

/// Response body of a held subscriber: yields at most one chunk, then ends.
///
/// Hyper drops the body when the peer goes away, which drops the armed
/// [`DisconnectObserver`] with it.
pub struct NotificationStream {
    id: SubscriptionId,
    rx: Option<oneshot::Receiver<Bytes>>,
    deadline: Option<Pin<Box<Sleep>>>,
    observer: Option<DisconnectObserver>,
}

impl NotificationStream {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    fn finish(&mut self) {
        self.rx = None;
        self.deadline = None;
        if let Some(observer) = self.observer.take() {
            observer.disarm();
        }
    }
}

impl Stream for NotificationStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(body)) => {
                this.finish();
                return Poll::Ready(Some(Ok(body)));
            }
            Poll::Ready(Err(_)) => {
                // Sender dropped without a notification: server closing.
                debug!(subscription_id = %this.id, "closed without notification");
                this.finish();
                return Poll::Ready(None);
            }
            Poll::Pending => {}
        }

        if let Some(deadline) = this.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                info!(subscription_id = %this.id, "hold limit reached");
                this.rx = None;
                this.deadline = None;
                if let Some(observer) = this.observer.take() {
                    if let Some(registry) = observer.registry.as_ref() {
                        registry.remove(this.id);
                    }
                    observer.disarm();
                }
                return Poll::Ready(None);
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn drained_ids(registry: &RegistryHandle) -> Vec<SubscriptionId> {
        registry.drain_all().await.iter().map(|p| p.id()).collect()
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_once() {
        let (registry, _task) = RegistryHandle::spawn();

        let mut plain = subscribe(&registry, None, None);
        let mut jsonp = subscribe(&registry, Some("cb".to_string()), None);

        let report = publish(&registry, "X").await;
        assert_eq!(report, PublishReport { delivered: 2, failed: 0 });

        assert_eq!(plain.next().await.unwrap().unwrap(), "{content: \"X\"}\n");
        assert!(plain.next().await.is_none());
        assert_eq!(jsonp.next().await.unwrap().unwrap(), "cb({content: \"X\"})\n");
        assert!(jsonp.next().await.is_none());

        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn publish_with_nobody_waiting() {
        let (registry, _task) = RegistryHandle::spawn();
        assert_eq!(publish(&registry, "X").await, PublishReport::default());
    }

    #[tokio::test]
    async fn dropped_stream_unregisters() {
        let (registry, _task) = RegistryHandle::spawn();

        let gone = subscribe(&registry, None, None);
        let stays = subscribe(&registry, None, None);
        let stays_id = stays.id();
        drop(gone);

        assert_eq!(drained_ids(&registry).await, vec![stays_id]);
    }

    #[tokio::test]
    async fn dropping_after_delivery_does_not_touch_the_registry() {
        let (registry, _task) = RegistryHandle::spawn();

        let mut first = subscribe(&registry, None, None);
        publish(&registry, "X").await;
        let _ = first.next().await;

        let second = subscribe(&registry, None, None);
        let second_id = second.id();
        drop(first);

        assert_eq!(drained_ids(&registry).await, vec![second_id]);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_the_rest() {
        let (registry, _task) = RegistryHandle::spawn();

        // Receiver gone but removal not yet processed: publish sees a dead entry.
        let id = registry.next_id();
        let (dead, rx) = ConnectionHandle::new(id);
        drop(rx);
        registry.register(dead, None);
        let mut alive = subscribe(&registry, None, None);

        let report = publish(&registry, "X").await;
        assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
        assert_eq!(alive.next().await.unwrap().unwrap(), "{content: \"X\"}\n");
    }

    #[tokio::test]
    async fn late_subscriber_waits_for_next_publish() {
        let (registry, _task) = RegistryHandle::spawn();

        publish(&registry, "first").await;
        let mut late = subscribe(&registry, None, None);
        assert_eq!(registry.len().await, 1);

        publish(&registry, "second").await;
        assert_eq!(late.next().await.unwrap().unwrap(), "{content: \"second\"}\n");
    }

    #[tokio::test(start_paused = true)]
    async fn hold_limit_ends_empty_and_unregisters() {
        let (registry, _task) = RegistryHandle::spawn();

        let mut held = subscribe(&registry, None, Some(Duration::from_secs(30)));
        assert_eq!(registry.len().await, 1);

        assert!(held.next().await.is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn close_all_ends_streams_without_body() {
        let (registry, _task) = RegistryHandle::spawn();

        let mut held = subscribe(&registry, None, None);
        assert_eq!(registry.close_all().await, 1);
        assert!(held.next().await.is_none());
    }
}
