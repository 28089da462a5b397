use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reads a HAP code from a payload: a boolean, or a whole number in `0..=255`
/// (`1` and `1.0` are the same code).
pub fn decode_code(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(b) => Some(u8::from(*b)),
        Value::Number(n) => {
            let code = n.as_f64()?;
            (code.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&code))
                .then_some(code as u8)
        }
        _ => None,
    }
}

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/CharacteristicDefinitions.ts
macro_rules! hap_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// HAP numeric code.
            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Accepts a HAP code or a boolean (`true` = 1).
            pub fn from_value(value: &Value) -> Option<Self> {
                decode_code(value).and_then(Self::from_code)
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::from(value.code())
            }
        }
    };
}

hap_enum!(Active {
    Inactive = 0,
    Active = 1,
});

hap_enum!(CurrentAirPurifierState {
    Inactive = 0,
    Idle = 1,
    PurifyingAir = 2,
});

hap_enum!(TargetAirPurifierState {
    Manual = 0,
    Auto = 1,
});

hap_enum!(LockPhysicalControls {
    Disabled = 0,
    Enabled = 1,
});

hap_enum!(FilterChangeIndication {
    FilterOk = 0,
    ChangeFilter = 1,
});

hap_enum!(AirQuality {
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
});

/// Characteristics the accessory can serve, named as HAP names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    Active,
    CurrentAirPurifierState,
    TargetAirPurifierState,
    LockPhysicalControls,
    RotationSpeed,
    On,
    FilterChangeIndication,
    FilterLifeLevel,
    AirQuality,
    #[serde(rename = "PM2_5Density")]
    Pm25Density,
    CurrentTemperature,
    CurrentRelativeHumidity,
}

impl Characteristic {
    pub const ALL: [Characteristic; 12] = [
        Characteristic::Active,
        Characteristic::CurrentAirPurifierState,
        Characteristic::TargetAirPurifierState,
        Characteristic::LockPhysicalControls,
        Characteristic::RotationSpeed,
        Characteristic::On,
        Characteristic::FilterChangeIndication,
        Characteristic::FilterLifeLevel,
        Characteristic::AirQuality,
        Characteristic::Pm25Density,
        Characteristic::CurrentTemperature,
        Characteristic::CurrentRelativeHumidity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Characteristic::Active => "Active",
            Characteristic::CurrentAirPurifierState => "CurrentAirPurifierState",
            Characteristic::TargetAirPurifierState => "TargetAirPurifierState",
            Characteristic::LockPhysicalControls => "LockPhysicalControls",
            Characteristic::RotationSpeed => "RotationSpeed",
            Characteristic::On => "On",
            Characteristic::FilterChangeIndication => "FilterChangeIndication",
            Characteristic::FilterLifeLevel => "FilterLifeLevel",
            Characteristic::AirQuality => "AirQuality",
            Characteristic::Pm25Density => "PM2_5Density",
            Characteristic::CurrentTemperature => "CurrentTemperature",
            Characteristic::CurrentRelativeHumidity => "CurrentRelativeHumidity",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown characteristic: {0}")]
pub struct UnknownCharacteristic(pub String);

impl FromStr for Characteristic {
    type Err = UnknownCharacteristic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Characteristic::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCharacteristic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_round_trip() {
        for c in Characteristic::ALL {
            assert_eq!(c.name().parse::<Characteristic>(), Ok(c));
        }
        assert_eq!(
            "PM2_5Density".parse::<Characteristic>(),
            Ok(Characteristic::Pm25Density)
        );
        assert_eq!(
            "Brightness".parse::<Characteristic>().unwrap_err().to_string(),
            "unknown characteristic: Brightness"
        );
    }

    #[test]
    fn test_serde_name_matches_display() {
        let encoded = serde_json::to_value(Characteristic::Pm25Density).unwrap();
        assert_eq!(encoded, json!("PM2_5Density"));
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Active::from_value(&json!(1)), Some(Active::Active));
        assert_eq!(Active::from_value(&json!(false)), Some(Active::Inactive));
        assert_eq!(
            TargetAirPurifierState::from_value(&json!(true)),
            Some(TargetAirPurifierState::Auto)
        );
        assert_eq!(LockPhysicalControls::from_value(&json!(2)), None);
        assert_eq!(LockPhysicalControls::from_value(&json!(-1)), None);
        assert_eq!(Active::from_value(&json!("on")), None);
    }

    #[test]
    fn test_codes() {
        assert_eq!(Value::from(AirQuality::Poor), json!(5));
        assert_eq!(CurrentAirPurifierState::PurifyingAir.code(), 2);
        assert_eq!(
            FilterChangeIndication::from_code(1),
            Some(FilterChangeIndication::ChangeFilter)
        );
    }

    #[test]
    fn test_decode_code() {
        assert_eq!(decode_code(&json!(1)), Some(1));
        assert_eq!(decode_code(&json!(1.0)), Some(1));
        assert_eq!(decode_code(&json!(true)), Some(1));
        assert_eq!(decode_code(&json!(0.5)), None);
        assert_eq!(decode_code(&json!(256)), None);
        assert_eq!(decode_code(&json!(-1)), None);
        assert_eq!(decode_code(&json!("1")), None);
        assert_eq!(Active::from_value(&json!(0.0)), Some(Active::Inactive));
    }
}
