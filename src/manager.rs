use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::bridge::AccessoryStateBridge;
use crate::characteristics::Characteristic;
use crate::error::{BridgeError, Result};
use crate::messages::{HostRequest, Inbound};
use crate::mqtt::MqttClient;
use crate::relay::{MqttRpcClient, PendingCalls};
use crate::rpc::RpcClient;
use crate::services::AccessoryLayout;

/// Where the outcome of a host request is delivered.
pub trait Responder: Clone + Send + Sync + 'static {
    fn value(
        &self,
        characteristic: Characteristic,
        value: Value,
    ) -> impl Future<Output = ()> + Send;
    fn ack(&self, characteristic: Characteristic) -> impl Future<Output = ()> + Send;
    fn identified(&self) -> impl Future<Output = ()> + Send;
    fn error(
        &self,
        characteristic: Characteristic,
        err: BridgeError,
    ) -> impl Future<Output = ()> + Send;
}

impl Responder for MqttClient {
    async fn value(&self, characteristic: Characteristic, value: Value) {
        if let Err(err) = self.publish_value(characteristic, &value).await {
            error!("Error publishing {}: {:?}", characteristic, err);
        }
    }

    async fn ack(&self, characteristic: Characteristic) {
        if let Err(err) = self.publish_ack(characteristic).await {
            error!("Error acknowledging {}: {:?}", characteristic, err);
        }
    }

    async fn identified(&self) {
        if let Err(err) = self.publish_identified().await {
            error!("Error acknowledging identify: {:?}", err);
        }
    }

    async fn error(&self, characteristic: Characteristic, err: BridgeError) {
        if let Err(publish_err) = self.publish_error(characteristic, &err).await {
            error!("Error reporting failure of {}: {:?}", characteristic, publish_err);
        }
    }
}

/// Runs one host request against the bridge and reports exactly one outcome.
pub async fn handle_request<C, R>(
    bridge: &AccessoryStateBridge<C>,
    layout: &AccessoryLayout,
    responder: &R,
    request: HostRequest,
) where
    C: RpcClient,
    R: Responder,
{
    match request {
        HostRequest::Get(characteristic) | HostRequest::Set(characteristic, _)
            if !layout.exposes(characteristic) =>
        {
            warn!("Rejecting request for unexposed {}", characteristic);
            responder
                .error(characteristic, BridgeError::NotExposed(characteristic))
                .await;
        }
        HostRequest::Get(characteristic) => match bridge.read(characteristic).await {
            Ok(value) => responder.value(characteristic, value).await,
            Err(err) => responder.error(characteristic, err).await,
        },
        HostRequest::Set(characteristic, value) => {
            match bridge.write(characteristic, &value).await {
                Ok(()) => responder.ack(characteristic).await,
                Err(err) => responder.error(characteristic, err).await,
            }
        }
        HostRequest::Identify => {
            if bridge.identify().await.is_ok() {
                info!("Identify requested for {}", layout.name);
                responder.identified().await;
            }
        }
        HostRequest::Refresh => {
            let characteristics: Vec<_> = layout.characteristics().collect();
            let outcomes = join_all(characteristics.iter().map(|&c| bridge.read(c))).await;
            for (characteristic, outcome) in characteristics.into_iter().zip(outcomes) {
                match outcome {
                    Ok(value) => responder.value(characteristic, value).await,
                    Err(err) => responder.error(characteristic, err).await,
                }
            }
        }
    }
}

pub struct Manager {
    bridge: Arc<AccessoryStateBridge<MqttRpcClient>>,
    layout: Arc<AccessoryLayout>,
    pending: PendingCalls,
    mqtt_client: MqttClient,
    mqtt_event_loop: Option<rumqttc::EventLoop>,
}

impl Manager {
    pub fn new(
        bridge: AccessoryStateBridge<MqttRpcClient>,
        layout: AccessoryLayout,
        mqtt_client: MqttClient,
        mqtt_event_loop: rumqttc::EventLoop,
    ) -> Self {
        Manager {
            pending: bridge.client().pending(),
            bridge: Arc::new(bridge),
            layout: Arc::new(layout),
            mqtt_client,
            mqtt_event_loop: Some(mqtt_event_loop),
        }
    }

    fn dispatch(&self, message: Inbound) {
        match message {
            Inbound::RpcResponse(frame) => {
                self.pending.resolve(frame);
            }
            Inbound::Host(request) => {
                debug!("Host request: {:?}", request);
                let bridge = Arc::clone(&self.bridge);
                let layout = Arc::clone(&self.layout);
                let responder = self.mqtt_client.clone();
                // Each request awaits its own round trip; nothing is queued.
                tokio::task::spawn(async move {
                    handle_request(&bridge, &layout, &responder, request).await;
                });
            }
        }
    }

    pub async fn run_loop(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.mqtt_client.subscribe().await?;
        self.mqtt_client.publish_layout(&self.layout).await?;

        let (tx, mut rx) = mpsc::channel(32);

        let listener = self.mqtt_client.clone();
        let mut event_loop = self
            .mqtt_event_loop
            .take()
            .ok_or("manager event loop already ran")?;
        let mut mqtt_handle = tokio::task::spawn(async move {
            listener.event_loop(&mut event_loop, tx).await;
        });

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => break,
                },
                _ = &mut shutdown => {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
        }
        info!("Exiting manager event loop");

        // The event loop has to keep polling to flush the disconnect.
        self.mqtt_client.disconnect().await?;
        if tokio::time::timeout(Duration::from_secs(2), &mut mqtt_handle)
            .await
            .is_err()
        {
            warn!("MQTT event loop did not stop after disconnect");
            mqtt_handle.abort();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::config::{AccessorySettings, DeviceCredentials};
    use crate::rpc::testing::ScriptedClient;
    use crate::rpc::RpcReply;

    #[derive(Debug, Clone, PartialEq)]
    enum Outcome {
        Value(Characteristic, Value),
        Ack(Characteristic),
        Identified,
        Error(Characteristic, BridgeError),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Outcome>>>);

    impl Recorder {
        fn outcomes(&self) -> Vec<Outcome> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Responder for Recorder {
        async fn value(&self, characteristic: Characteristic, value: Value) {
            self.0.lock().unwrap().push(Outcome::Value(characteristic, value));
        }

        async fn ack(&self, characteristic: Characteristic) {
            self.0.lock().unwrap().push(Outcome::Ack(characteristic));
        }

        async fn identified(&self) {
            self.0.lock().unwrap().push(Outcome::Identified);
        }

        async fn error(&self, characteristic: Characteristic, err: BridgeError) {
            self.0.lock().unwrap().push(Outcome::Error(characteristic, err));
        }
    }

    fn layout(humidity: bool) -> AccessoryLayout {
        AccessoryLayout::from_settings(&AccessorySettings {
            device: DeviceCredentials {
                address: "10.0.0.2".to_string(),
                token: "abc".to_string(),
            },
            name: "Purifier".to_string(),
            air_quality: None,
            temperature: None,
            humidity: humidity.then(|| "Humidity".to_string()),
        })
    }

    #[tokio::test]
    async fn test_get_reports_value() {
        let bridge = AccessoryStateBridge::new(ScriptedClient::replying(vec![json!("silent")]));
        let recorder = Recorder::default();
        handle_request(
            &bridge,
            &layout(false),
            &recorder,
            HostRequest::Get(Characteristic::RotationSpeed),
        )
        .await;
        assert_eq!(
            recorder.outcomes(),
            vec![Outcome::Value(Characteristic::RotationSpeed, json!(80))]
        );
    }

    #[tokio::test]
    async fn test_set_reports_ack_or_error() {
        let bridge = AccessoryStateBridge::new(ScriptedClient::replying(vec![json!("ok")]));
        let recorder = Recorder::default();
        let layout = layout(false);
        handle_request(
            &bridge,
            &layout,
            &recorder,
            HostRequest::Set(Characteristic::On, json!(false)),
        )
        .await;
        bridge.client().push(Ok(RpcReply(vec![json!("error_busy")])));
        handle_request(
            &bridge,
            &layout,
            &recorder,
            HostRequest::Set(Characteristic::Active, json!(1)),
        )
        .await;

        assert_eq!(
            recorder.outcomes(),
            vec![
                Outcome::Ack(Characteristic::On),
                Outcome::Error(
                    Characteristic::Active,
                    BridgeError::CommandRejected("error_busy".to_string())
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_unexposed_characteristic_is_rejected() {
        let bridge = AccessoryStateBridge::new(ScriptedClient::new());
        let recorder = Recorder::default();
        let layout = layout(false);
        handle_request(
            &bridge,
            &layout,
            &recorder,
            HostRequest::Get(Characteristic::CurrentRelativeHumidity),
        )
        .await;
        handle_request(
            &bridge,
            &layout,
            &recorder,
            HostRequest::Set(Characteristic::AirQuality, json!(1)),
        )
        .await;
        assert_eq!(
            recorder.outcomes(),
            vec![
                Outcome::Error(
                    Characteristic::CurrentRelativeHumidity,
                    BridgeError::NotExposed(Characteristic::CurrentRelativeHumidity)
                ),
                Outcome::Error(
                    Characteristic::AirQuality,
                    BridgeError::NotExposed(Characteristic::AirQuality)
                ),
            ]
        );
        assert!(bridge.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_identify_is_acknowledged() {
        let bridge = AccessoryStateBridge::new(ScriptedClient::new());
        let recorder = Recorder::default();
        handle_request(&bridge, &layout(false), &recorder, HostRequest::Identify).await;
        assert_eq!(recorder.outcomes(), vec![Outcome::Identified]);
        assert!(bridge.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_payload_is_reported() {
        let bridge = AccessoryStateBridge::new(ScriptedClient::new());
        let recorder = Recorder::default();
        handle_request(
            &bridge,
            &layout(false),
            &recorder,
            HostRequest::Set(Characteristic::RotationSpeed, json!("fast")),
        )
        .await;
        assert_eq!(
            recorder.outcomes(),
            vec![Outcome::Error(
                Characteristic::RotationSpeed,
                BridgeError::InvalidValue {
                    characteristic: Characteristic::RotationSpeed,
                    value: "\"fast\"".to_string(),
                }
            )]
        );
        assert!(bridge.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_reads_every_exposed_characteristic() {
        let client = ScriptedClient::new();
        let layout = layout(true);
        let expected = layout.characteristics().count();
        for _ in 0..expected {
            client.push(Err(crate::error::RpcError::Timeout));
        }
        let bridge = AccessoryStateBridge::new(client);
        let recorder = Recorder::default();

        handle_request(&bridge, &layout, &recorder, HostRequest::Refresh).await;

        let outcomes = recorder.outcomes();
        assert_eq!(outcomes.len(), expected);
        assert_eq!(bridge.client().calls().len(), expected);
        assert!(outcomes.contains(&Outcome::Error(
            Characteristic::CurrentRelativeHumidity,
            BridgeError::Transport(crate::error::RpcError::Timeout)
        )));
    }
}
