use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::config::DeviceCredentials;
use crate::error::RpcError;
use crate::messages::{RpcRequestFrame, RpcResponseFrame};
use crate::mqtt::MqttClient;
use crate::rpc::{RpcClient, RpcReply};

/// Calls waiting for a gateway response, keyed by request id.
#[derive(Debug, Clone, Default)]
pub struct PendingCalls {
    waiting: Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponseFrame>>>>,
}

impl PendingCalls {
    fn register(&self, id: u64) -> oneshot::Receiver<RpcResponseFrame> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        rx
    }

    fn forget(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Hands a response to the call that sent it. Returns false for unknown ids.
    pub fn resolve(&self, frame: RpcResponseFrame) -> bool {
        let id = frame.id;
        let Some(tx) = self.lock().remove(&id) else {
            debug!("Dropping rpc response {} with no waiting call", id);
            return false;
        };
        tx.send(frame).is_ok()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<RpcResponseFrame>>> {
        // A panic while holding the map cannot leave it inconsistent.
        self.waiting.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Publishes a frame for one call; the relay waits for the matching response.
#[async_trait]
pub trait FramePublisher: Send + Sync {
    async fn publish(&self, frame: &RpcRequestFrame<'_>) -> Result<(), RpcError>;
}

#[async_trait]
impl FramePublisher for MqttClient {
    async fn publish(&self, frame: &RpcRequestFrame<'_>) -> Result<(), RpcError> {
        self.publish_rpc_request(frame)
            .await
            .map_err(|err| RpcError::Disconnected(err.to_string()))
    }
}

/// [`RpcClient`] that forwards calls to an external miio gateway over MQTT.
///
/// The gateway talks to the purifier; this side only correlates ids and
/// enforces the timeout. Calls are never retried.
pub struct MqttRpcClient<P = MqttClient> {
    publisher: P,
    device: DeviceCredentials,
    pending: PendingCalls,
    next_id: AtomicU64,
    timeout: Duration,
}

impl<P: FramePublisher> MqttRpcClient<P> {
    pub fn new(publisher: P, device: DeviceCredentials, timeout: Duration) -> Self {
        MqttRpcClient {
            publisher,
            device,
            pending: PendingCalls::default(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn pending(&self) -> PendingCalls {
        self.pending.clone()
    }
}

#[async_trait]
impl<P: FramePublisher> RpcClient for MqttRpcClient<P> {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcReply, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.pending.register(id);

        let frame = RpcRequestFrame {
            id,
            method,
            params: &params,
            address: &self.device.address,
            token: &self.device.token,
        };
        debug!("rpc {} -> {} {:?}", id, method, params);
        if let Err(err) = self.publisher.publish(&frame).await {
            self.pending.forget(id);
            return Err(err);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(frame)) => frame.into_reply(),
            Ok(Err(_)) => Err(RpcError::Disconnected(format!(
                "rpc {id} abandoned before a response arrived"
            ))),
            Err(_) => {
                self.pending.forget(id);
                Err(RpcError::Timeout)
            }
        }
    }
}
