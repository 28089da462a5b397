use thiserror::Error;

use crate::characteristics::Characteristic;

/// Failure of a single RPC round trip, reported by an [`crate::rpc::RpcClient`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("device did not answer in time")]
    Timeout,

    #[error("rpc channel unavailable: {0}")]
    Disconnected(String),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("device error {code}: {message}")]
    Device { code: i64, message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] RpcError),

    /// The device answered a command with something other than `"ok"`.
    #[error("{0}")]
    CommandRejected(String),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("speed {0} is above every mode threshold")]
    SpeedOutOfRange(u8),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0} is read-only")]
    ReadOnly(Characteristic),

    #[error("{0} is not exposed by this accessory")]
    NotExposed(Characteristic),

    #[error("invalid value for {characteristic}: {value}")]
    InvalidValue {
        characteristic: Characteristic,
        value: String,
    },
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::CommandRejected("error_busy".to_string());
        assert_eq!(err.to_string(), "error_busy");

        let err: BridgeError = RpcError::Timeout.into();
        assert_eq!(err.to_string(), "device did not answer in time");

        let err = BridgeError::from(RpcError::Device {
            code: -5001,
            message: "invalid arg".to_string(),
        });
        assert_eq!(err.to_string(), "device error -5001: invalid arg");

        let err = BridgeError::ReadOnly(Characteristic::AirQuality);
        assert_eq!(err.to_string(), "AirQuality is read-only");

        let err = BridgeError::NotExposed(Characteristic::CurrentTemperature);
        assert_eq!(
            err.to_string(),
            "CurrentTemperature is not exposed by this accessory"
        );

        let err = BridgeError::InvalidValue {
            characteristic: Characteristic::RotationSpeed,
            value: "\"fast\"".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for RotationSpeed: \"fast\"");
    }
}
