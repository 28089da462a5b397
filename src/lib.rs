//! Presents a miio air purifier as a HomeKit air purifier accessory.
//!
//! [`bridge::AccessoryStateBridge`] holds the translation between the
//! purifier's property protocol and HomeKit characteristics. The remaining
//! modules host it on MQTT and relay its RPC calls to a miio gateway.

pub mod bridge;
pub mod characteristics;
pub mod config;
pub mod error;
pub mod manager;
pub mod messages;
pub mod modes;
pub mod mqtt;
pub mod relay;
pub mod rpc;
pub mod services;
pub mod thresholds;

pub use bridge::AccessoryStateBridge;
pub use error::{BridgeError, RpcError};
pub use modes::{DeviceMode, ModeSpeedMapper};
pub use rpc::{RpcClient, RpcReply};
