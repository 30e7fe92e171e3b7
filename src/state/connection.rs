use std::fmt;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::errors::DeliveryError;

/// Identity of one held subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write side of a held subscriber response.
///
/// The receiving half lives inside the subscriber's response body. Delivery
/// consumes the handle, so a connection can be written to at most once.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: SubscriptionId,
    tx: oneshot::Sender<Bytes>,
}

impl ConnectionHandle {
    pub fn new(id: SubscriptionId) -> (Self, oneshot::Receiver<Bytes>) {
        let (tx, rx) = oneshot::channel();
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Send the single notification chunk. The response is finalized by the
    /// body stream as soon as it has yielded this chunk.
    pub fn deliver(self, body: Bytes) -> Result<(), DeliveryError> {
        self.tx
            .send(body)
            .map_err(|_| DeliveryError::PeerGone(self.id.0))
    }
}
