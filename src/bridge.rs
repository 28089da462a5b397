use serde_json::Value;

use crate::characteristics::{
    self, Active, AirQuality, Characteristic, CurrentAirPurifierState, FilterChangeIndication,
    LockPhysicalControls, TargetAirPurifierState,
};
use crate::error::{BridgeError, Result, RpcError};
use crate::modes::{DeviceMode, ModeSpeedMapper};
use crate::rpc::{RpcClient, RpcReply};
use crate::thresholds::{self, ThresholdTable};

const PROP_MODE: &str = "mode";
const PROP_CHILD_LOCK: &str = "child_lock";
const PROP_LED: &str = "led";
const PROP_FILTER_LIFE: &str = "filter1_life";
const PROP_AQI: &str = "aqi";
const PROP_TEMPERATURE: &str = "temp_dec";
const PROP_HUMIDITY: &str = "humidity";

const CMD_POWER: &str = "set_power";
const CMD_MODE: &str = "set_mode";
const CMD_CHILD_LOCK: &str = "set_child_lock";
const CMD_LED: &str = "set_led";

const STATUS_OK: &str = "ok";

fn on_off(on: bool) -> Value {
    Value::from(if on { "on" } else { "off" })
}

/// Translates HomeKit characteristic reads and writes into purifier RPC calls.
///
/// Every operation performs exactly one round trip (identify performs none).
/// No device state is kept between calls.
pub struct AccessoryStateBridge<C> {
    client: C,
    modes: ModeSpeedMapper,
    air_quality: ThresholdTable<AirQuality>,
    filter_life: ThresholdTable<FilterChangeIndication>,
}

impl<C: RpcClient> AccessoryStateBridge<C> {
    pub fn new(client: C) -> Self {
        Self::with_modes(client, ModeSpeedMapper::default())
    }

    pub fn with_modes(client: C, modes: ModeSpeedMapper) -> Self {
        AccessoryStateBridge {
            client,
            modes,
            air_quality: thresholds::air_quality_levels(),
            filter_life: thresholds::filter_life_levels(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn query(&self, property: &str) -> Result<RpcReply> {
        Ok(self.client.query(property).await?)
    }

    async fn command(&self, command: &str, arg: Value) -> Result<()> {
        let reply = self.client.command(command, vec![arg]).await?;
        match reply.first()? {
            Value::String(status) if status == STATUS_OK => Ok(()),
            Value::String(status) => Err(BridgeError::CommandRejected(status.clone())),
            other => Err(BridgeError::CommandRejected(other.to_string())),
        }
    }

    async fn query_mode_is(&self, mode: DeviceMode) -> Result<bool> {
        let reply = self.query(PROP_MODE).await?;
        Ok(reply.first()?.as_str() == Some(mode.as_str()))
    }

    pub async fn get_active(&self) -> Result<Active> {
        Ok(if self.query_mode_is(DeviceMode::Idle).await? {
            Active::Inactive
        } else {
            Active::Active
        })
    }

    pub async fn set_active(&self, state: Active) -> Result<()> {
        self.command(CMD_POWER, on_off(state == Active::Active)).await
    }

    pub async fn get_current_state(&self) -> Result<CurrentAirPurifierState> {
        Ok(if self.query_mode_is(DeviceMode::Idle).await? {
            CurrentAirPurifierState::Inactive
        } else {
            CurrentAirPurifierState::PurifyingAir
        })
    }

    pub async fn get_target_state(&self) -> Result<TargetAirPurifierState> {
        Ok(if self.query_mode_is(DeviceMode::Favorite).await? {
            TargetAirPurifierState::Manual
        } else {
            TargetAirPurifierState::Auto
        })
    }

    pub async fn set_target_state(&self, state: TargetAirPurifierState) -> Result<()> {
        let mode = match state {
            TargetAirPurifierState::Auto => DeviceMode::Auto,
            TargetAirPurifierState::Manual => DeviceMode::Favorite,
        };
        self.command(CMD_MODE, Value::from(mode.as_str())).await
    }

    pub async fn get_lock_physical_controls(&self) -> Result<LockPhysicalControls> {
        let reply = self.query(PROP_CHILD_LOCK).await?;
        Ok(if reply.first()?.as_str() == Some("on") {
            LockPhysicalControls::Enabled
        } else {
            LockPhysicalControls::Disabled
        })
    }

    pub async fn set_lock_physical_controls(&self, state: LockPhysicalControls) -> Result<()> {
        self.command(CMD_CHILD_LOCK, on_off(state == LockPhysicalControls::Enabled))
            .await
    }

    pub async fn get_rotation_speed(&self) -> Result<u8> {
        let reply = self.query(PROP_MODE).await?;
        match reply.first()?.as_str() {
            Some(mode) => self.modes.speed_for_mode(mode),
            None => Err(BridgeError::UnknownMode(reply.first()?.to_string())),
        }
    }

    /// Resolves the mode before touching the device; out of range issues no call.
    pub async fn set_rotation_speed(&self, speed: u8) -> Result<()> {
        let mode = self.modes.mode_for_speed(speed)?;
        self.command(CMD_MODE, Value::from(mode.as_str())).await
    }

    pub async fn get_led(&self) -> Result<bool> {
        let reply = self.query(PROP_LED).await?;
        Ok(reply.first()?.as_str() == Some("on"))
    }

    pub async fn set_led(&self, on: bool) -> Result<()> {
        self.command(CMD_LED, on_off(on)).await
    }

    pub async fn get_filter_change(&self) -> Result<FilterChangeIndication> {
        let life = self.query(PROP_FILTER_LIFE).await?.number()?;
        self.filter_life.classify(life).ok_or_else(|| {
            RpcError::MalformedReply(format!("filter life {life} out of range")).into()
        })
    }

    pub async fn get_filter_life(&self) -> Result<f64> {
        Ok(self.query(PROP_FILTER_LIFE).await?.number()?)
    }

    pub async fn get_air_quality(&self) -> Result<AirQuality> {
        let aqi = self.query(PROP_AQI).await?.number()?;
        self.air_quality
            .classify(aqi)
            .ok_or_else(|| RpcError::MalformedReply(format!("aqi {aqi} out of range")).into())
    }

    pub async fn get_pm25(&self) -> Result<f64> {
        Ok(self.query(PROP_AQI).await?.number()?)
    }

    pub async fn get_current_temperature(&self) -> Result<f64> {
        Ok(self.query(PROP_TEMPERATURE).await?.number()? / 10.0)
    }

    pub async fn get_current_relative_humidity(&self) -> Result<f64> {
        Ok(self.query(PROP_HUMIDITY).await?.number()?)
    }

    pub async fn identify(&self) -> Result<()> {
        Ok(())
    }

    /// Reads a characteristic and encodes it the way HAP transports it.
    pub async fn read(&self, characteristic: Characteristic) -> Result<Value> {
        Ok(match characteristic {
            Characteristic::Active => self.get_active().await?.into(),
            Characteristic::CurrentAirPurifierState => self.get_current_state().await?.into(),
            Characteristic::TargetAirPurifierState => self.get_target_state().await?.into(),
            Characteristic::LockPhysicalControls => {
                self.get_lock_physical_controls().await?.into()
            }
            Characteristic::RotationSpeed => self.get_rotation_speed().await?.into(),
            Characteristic::On => self.get_led().await?.into(),
            Characteristic::FilterChangeIndication => self.get_filter_change().await?.into(),
            Characteristic::FilterLifeLevel => self.get_filter_life().await?.into(),
            Characteristic::AirQuality => self.get_air_quality().await?.into(),
            Characteristic::Pm25Density => self.get_pm25().await?.into(),
            Characteristic::CurrentTemperature => self.get_current_temperature().await?.into(),
            Characteristic::CurrentRelativeHumidity => {
                self.get_current_relative_humidity().await?.into()
            }
        })
    }

    /// Decodes a HAP payload and writes it; bad payloads never reach the device.
    pub async fn write(&self, characteristic: Characteristic, value: &Value) -> Result<()> {
        let invalid = || BridgeError::InvalidValue {
            characteristic,
            value: value.to_string(),
        };
        match characteristic {
            Characteristic::Active => {
                self.set_active(Active::from_value(value).ok_or_else(invalid)?)
                    .await
            }
            Characteristic::TargetAirPurifierState => {
                self.set_target_state(TargetAirPurifierState::from_value(value).ok_or_else(invalid)?)
                    .await
            }
            Characteristic::LockPhysicalControls => {
                self.set_lock_physical_controls(
                    LockPhysicalControls::from_value(value).ok_or_else(invalid)?,
                )
                .await
            }
            Characteristic::RotationSpeed => {
                self.set_rotation_speed(decode_speed(value).ok_or_else(invalid)?)
                    .await
            }
            Characteristic::On => {
                let on = match characteristics::decode_code(value) {
                    Some(1) => true,
                    Some(0) => false,
                    _ => return Err(invalid()),
                };
                self.set_led(on).await
            }
            read_only => Err(BridgeError::ReadOnly(read_only)),
        }
    }
}

/// HAP sends rotation speed as a float percentage in `0..=100`.
fn decode_speed(value: &Value) -> Option<u8> {
    let speed = value.as_f64()?;
    (0.0..=100.0)
        .contains(&speed)
        .then(|| speed.round() as u8)
}
