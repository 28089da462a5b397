use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::characteristics::Characteristic;
use crate::error::RpcError;
use crate::rpc::RpcReply;

#[derive(Clone, Debug, PartialEq)]
pub enum HostRequest {
    Get(Characteristic),
    Set(Characteristic, Value),
    Identify,
    Refresh,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Host(HostRequest),
    RpcResponse(RpcResponseFrame),
}

/// Call forwarded to the miio gateway.
#[derive(Debug, Serialize)]
pub struct RpcRequestFrame<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: &'a [Value],
    pub address: &'a str,
    pub token: &'a str,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeviceErrorFrame {
    pub code: i64,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RpcResponseFrame {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<DeviceErrorFrame>,
}

impl RpcResponseFrame {
    pub fn into_reply(self) -> Result<RpcReply, RpcError> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(RpcError::Device {
                code: err.code,
                message: err.message,
            }),
            (Some(values), None) => Ok(RpcReply(values)),
            (None, None) => Err(RpcError::MalformedReply(format!(
                "response {} has neither result nor error",
                self.id
            ))),
        }
    }
}
