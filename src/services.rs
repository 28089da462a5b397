use serde_derive::Serialize;

use crate::characteristics::Characteristic;
use crate::config::AccessorySettings;

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/ServiceDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HomekitService {
    AirPurifier,
    AccessoryInformation,
    Lightbulb,
    FilterMaintenance,
    AirQualitySensor,
    TemperatureSensor,
    HumiditySensor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub service: HomekitService,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessoryInformation {
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: &'static str,
}

impl Default for AccessoryInformation {
    fn default() -> Self {
        AccessoryInformation {
            manufacturer: "Xiaomi",
            model: "Air Purifier",
            serial_number: "0799-E5C0-57A641308C0D",
        }
    }
}

/// Services the accessory publishes, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessoryLayout {
    pub name: String,
    pub information: AccessoryInformation,
    pub services: Vec<ServiceDescriptor>,
}

impl AccessoryLayout {
    pub fn from_settings(settings: &AccessorySettings) -> Self {
        let name = settings.name.clone();
        let mut services = vec![
            ServiceDescriptor {
                service: HomekitService::AirPurifier,
                name: name.clone(),
                characteristics: vec![
                    Characteristic::Active,
                    Characteristic::CurrentAirPurifierState,
                    Characteristic::TargetAirPurifierState,
                    Characteristic::LockPhysicalControls,
                    Characteristic::RotationSpeed,
                ],
            },
            ServiceDescriptor {
                service: HomekitService::AccessoryInformation,
                name: name.clone(),
                characteristics: vec![],
            },
            ServiceDescriptor {
                service: HomekitService::Lightbulb,
                name: format!("{name} Display"),
                characteristics: vec![Characteristic::On],
            },
            ServiceDescriptor {
                service: HomekitService::FilterMaintenance,
                name: format!("{name} Filter"),
                characteristics: vec![
                    Characteristic::FilterChangeIndication,
                    Characteristic::FilterLifeLevel,
                ],
            },
        ];

        let sensors = [
            (
                &settings.air_quality,
                HomekitService::AirQualitySensor,
                vec![Characteristic::AirQuality, Characteristic::Pm25Density],
            ),
            (
                &settings.temperature,
                HomekitService::TemperatureSensor,
                vec![Characteristic::CurrentTemperature],
            ),
            (
                &settings.humidity,
                HomekitService::HumiditySensor,
                vec![Characteristic::CurrentRelativeHumidity],
            ),
        ];
        for (sensor_name, service, characteristics) in sensors {
            if let Some(sensor_name) = sensor_name {
                services.push(ServiceDescriptor {
                    service,
                    name: sensor_name.clone(),
                    characteristics,
                });
            }
        }

        AccessoryLayout {
            name,
            information: AccessoryInformation::default(),
            services,
        }
    }

    pub fn exposes(&self, characteristic: Characteristic) -> bool {
        self.services
            .iter()
            .any(|s| s.characteristics.contains(&characteristic))
    }

    pub fn characteristics(&self) -> impl Iterator<Item = Characteristic> + '_ {
        self.services
            .iter()
            .flat_map(|s| s.characteristics.iter().copied())
    }
}
