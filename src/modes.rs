use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Operating mode as reported and accepted by the purifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMode {
    Idle,
    Auto,
    Silent,
    Favorite,
}

impl DeviceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceMode::Idle => "idle",
            DeviceMode::Auto => "auto",
            DeviceMode::Silent => "silent",
            DeviceMode::Favorite => "favorite",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idle" => Ok(DeviceMode::Idle),
            "auto" => Ok(DeviceMode::Auto),
            "silent" => Ok(DeviceMode::Silent),
            "favorite" => Ok(DeviceMode::Favorite),
            other => Err(BridgeError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub threshold: u8,
    pub mode: DeviceMode,
}

impl Mode {
    pub const fn new(threshold: u8, mode: DeviceMode) -> Self {
        Mode { threshold, mode }
    }
}

/// Maps a rotation speed percentage onto the purifier's discrete modes and back.
///
/// Thresholds strictly increase and start at 0 (the idle mode).
#[derive(Debug, Clone)]
pub struct ModeSpeedMapper {
    modes: Vec<Mode>,
}

impl ModeSpeedMapper {
    pub fn new(modes: Vec<Mode>) -> Result<Self> {
        match modes.first() {
            None => {
                return Err(BridgeError::Configuration(
                    "mode table is empty".to_string(),
                ));
            }
            Some(first) if first.threshold != 0 || first.mode != DeviceMode::Idle => {
                return Err(BridgeError::Configuration(format!(
                    "first mode must be idle at 0, got {} at {}",
                    first.mode, first.threshold
                )));
            }
            Some(_) => {}
        }

        if let Some(pair) = modes
            .windows(2)
            .find(|pair| pair[0].threshold >= pair[1].threshold)
        {
            return Err(BridgeError::Configuration(format!(
                "mode thresholds must strictly increase ({} at {} then {} at {})",
                pair[0].mode, pair[0].threshold, pair[1].mode, pair[1].threshold
            )));
        }

        if let Some(last) = modes.last().filter(|m| m.threshold > 100) {
            return Err(BridgeError::Configuration(format!(
                "threshold {} for {} exceeds 100",
                last.threshold, last.mode
            )));
        }

        Ok(ModeSpeedMapper { modes })
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn speed_for_mode(&self, name: &str) -> Result<u8> {
        self.modes
            .iter()
            .find(|m| m.mode.as_str() == name)
            .map(|m| m.threshold)
            .ok_or_else(|| BridgeError::UnknownMode(name.to_string()))
    }

    /// Ceiling match: the first mode whose threshold is at least `speed`.
    pub fn mode_for_speed(&self, speed: u8) -> Result<DeviceMode> {
        self.modes
            .iter()
            .find(|m| speed <= m.threshold)
            .map(|m| m.mode)
            .ok_or(BridgeError::SpeedOutOfRange(speed))
    }
}

impl Default for ModeSpeedMapper {
    fn default() -> Self {
        ModeSpeedMapper {
            modes: vec![
                Mode::new(0, DeviceMode::Idle),
                Mode::new(60, DeviceMode::Auto),
                Mode::new(80, DeviceMode::Silent),
                Mode::new(100, DeviceMode::Favorite),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_mode() {
        let mapper = ModeSpeedMapper::default();
        for m in mapper.modes() {
            let speed = mapper.speed_for_mode(m.mode.as_str()).unwrap();
            assert_eq!(mapper.mode_for_speed(speed).unwrap(), m.mode);
        }
    }

    #[test]
    fn test_ceiling_selection() {
        let mapper = ModeSpeedMapper::default();
        assert_eq!(mapper.mode_for_speed(70).unwrap(), DeviceMode::Silent);
        assert_eq!(mapper.mode_for_speed(0).unwrap(), DeviceMode::Idle);
        assert_eq!(mapper.mode_for_speed(1).unwrap(), DeviceMode::Auto);
        assert_eq!(mapper.mode_for_speed(60).unwrap(), DeviceMode::Auto);
        assert_eq!(mapper.mode_for_speed(81).unwrap(), DeviceMode::Favorite);
        assert_eq!(mapper.mode_for_speed(100).unwrap(), DeviceMode::Favorite);
    }

    #[test]
    fn test_speed_above_table() {
        let mapper = ModeSpeedMapper::new(vec![
            Mode::new(0, DeviceMode::Idle),
            Mode::new(50, DeviceMode::Auto),
        ])
        .unwrap();
        assert_eq!(
            mapper.mode_for_speed(51),
            Err(BridgeError::SpeedOutOfRange(51))
        );
        assert_eq!(
            ModeSpeedMapper::default().mode_for_speed(101),
            Err(BridgeError::SpeedOutOfRange(101))
        );
    }

    #[test]
    fn test_unknown_mode() {
        let mapper = ModeSpeedMapper::default();
        assert_eq!(
            mapper.speed_for_mode("turbo"),
            Err(BridgeError::UnknownMode("turbo".to_string()))
        );
        assert_eq!(mapper.speed_for_mode("silent"), Ok(80));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(ModeSpeedMapper::new(vec![]).is_err());
        assert!(ModeSpeedMapper::new(vec![Mode::new(10, DeviceMode::Idle)]).is_err());
        assert!(ModeSpeedMapper::new(vec![Mode::new(0, DeviceMode::Auto)]).is_err());
        assert!(
            ModeSpeedMapper::new(vec![
                Mode::new(0, DeviceMode::Idle),
                Mode::new(60, DeviceMode::Auto),
                Mode::new(60, DeviceMode::Silent),
            ])
            .is_err()
        );
        assert!(
            ModeSpeedMapper::new(vec![
                Mode::new(0, DeviceMode::Idle),
                Mode::new(120, DeviceMode::Favorite),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_parse_device_mode() {
        assert_eq!("favorite".parse::<DeviceMode>().unwrap(), DeviceMode::Favorite);
        assert!("Favorite".parse::<DeviceMode>().is_err());
    }
}
