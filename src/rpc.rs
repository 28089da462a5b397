use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

/// Values returned by one RPC call, in device order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RpcReply(pub Vec<Value>);

impl RpcReply {
    pub fn first(&self) -> Result<&Value, RpcError> {
        self.0
            .first()
            .ok_or_else(|| RpcError::MalformedReply("empty reply".to_string()))
    }

    pub fn text(&self) -> Result<&str, RpcError> {
        let value = self.first()?;
        value
            .as_str()
            .ok_or_else(|| RpcError::MalformedReply(format!("expected a string, got {value}")))
    }

    pub fn number(&self) -> Result<f64, RpcError> {
        let value = self.first()?;
        value
            .as_f64()
            .ok_or_else(|| RpcError::MalformedReply(format!("expected a number, got {value}")))
    }
}

impl From<Vec<Value>> for RpcReply {
    fn from(values: Vec<Value>) -> Self {
        RpcReply(values)
    }
}

/// Client for the purifier's property protocol.
///
/// Implementations own timeouts and transport; each call is one round trip.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcReply, RpcError>;

    async fn query(&self, property: &str) -> Result<RpcReply, RpcError> {
        self.call("get_prop", vec![Value::from(property)]).await
    }

    async fn command(&self, command: &str, args: Vec<Value>) -> Result<RpcReply, RpcError> {
        self.call(command, args).await
    }
}
