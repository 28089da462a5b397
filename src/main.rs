use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use log::info;

use purifier_rs::config::{AccessorySettings, AppConfig};
use purifier_rs::manager::Manager;
use purifier_rs::mqtt::MqttClient;
use purifier_rs::relay::MqttRpcClient;
use purifier_rs::services::AccessoryLayout;
use purifier_rs::AccessoryStateBridge;

#[derive(Parser, Debug)]
#[command(version, about = "Exposes a miio air purifier as a HomeKit accessory over MQTT")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config_contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let config: AppConfig = toml::de::from_str(&config_contents)?;

    let settings = AccessorySettings::from_config(&config.accessory)?;
    let layout = AccessoryLayout::from_settings(&settings);
    info!(
        "Accessory {} at {} with {} services",
        settings.name,
        settings.device.address,
        layout.services.len()
    );

    let rpc = config.rpc.unwrap_or_default();
    let (mqtt_client, eventloop) = MqttClient::new(&config.mqtt, &settings.name, &rpc);

    let client = MqttRpcClient::new(mqtt_client.clone(), settings.device, rpc.timeout());
    let bridge = AccessoryStateBridge::new(client);

    let core = Manager::new(bridge, layout, mqtt_client, eventloop);
    core.run_loop()
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    Ok(())
}
