use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{MqttOptions, QoS, SubscribeFilter};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::characteristics::Characteristic;
use crate::config;
use crate::error::BridgeError;
use crate::messages::{HostRequest, Inbound, RpcRequestFrame, RpcResponseFrame};
use crate::services::AccessoryLayout;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),

    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Broker connection shared by the accessory surface and the rpc relay.
#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    accessory_path: String,
    rpc_path: String,
}

impl MqttClient {
    pub fn new(
        config: &config::MqttConfig,
        accessory_name: &str,
        rpc: &config::RpcConfig,
    ) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .as_ref()
            .unwrap_or(&"purifier-rs".to_string())
            .to_string();

        let mut mqttoptions =
            MqttOptions::new(publisher_id, config.host.clone(), config.port.unwrap_or(1883));

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);

        let topic_path = config.topic_path.clone().unwrap_or("homebridge".to_string());
        (
            MqttClient {
                client,
                accessory_path: format!("{}/{}", topic_path, sanitize_name(accessory_name)),
                rpc_path: rpc.topic_path(),
            },
            eventloop,
        )
    }

    pub async fn subscribe(&self) -> Result<(), rumqttc::ClientError> {
        let root = &self.accessory_path;
        self.client
            .subscribe_many(vec![
                SubscribeFilter::new(format!("{root}/get/+"), QoS::AtLeastOnce),
                SubscribeFilter::new(format!("{root}/set/+"), QoS::AtLeastOnce),
                SubscribeFilter::new(format!("{root}/identify"), QoS::AtMostOnce),
                SubscribeFilter::new(format!("{root}/refresh"), QoS::AtMostOnce),
                SubscribeFilter::new(format!("{}/response", self.rpc_path), QoS::AtLeastOnce),
            ])
            .await?;

        Ok(())
    }

    pub async fn event_loop(&self, eventloop: &mut rumqttc::EventLoop, tx: mpsc::Sender<Inbound>) {
        loop {
            match eventloop.poll().await {
                Ok(notification) => match notification {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        debug!("Received MQTT message on topic {}: {:?}", p.topic, p.payload);

                        let Some(message) = self.parse_message(&p.topic, &p.payload) else {
                            continue;
                        };
                        if tx.send(message).await.is_err() {
                            debug!("Inbound receiver closed, leaving MQTT event loop");
                            return;
                        }
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::SubAck(_)) => {
                        debug!("Subscription acknowledged");
                    }
                    event if ends_session(&event) => {
                        debug!("Disconnect sent, leaving MQTT event loop");
                        return;
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                        debug!("Connection acknowledged");
                        if let Err(err) = self.subscribe().await {
                            error!("Error subscribing to MQTT topics: {:?}", err);
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Error polling MQTT event loop: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn parse_message(&self, topic: &str, payload: &[u8]) -> Option<Inbound> {
        if topic == format!("{}/response", self.rpc_path) {
            return match serde_json::from_slice::<RpcResponseFrame>(payload) {
                Ok(frame) => Some(Inbound::RpcResponse(frame)),
                Err(err) => {
                    warn!("Dropping unreadable rpc response: {}", err);
                    None
                }
            };
        }

        let rest = topic.strip_prefix(&self.accessory_path)?.strip_prefix('/')?;
        let request = match rest.split_once('/') {
            None if rest == "identify" => HostRequest::Identify,
            None if rest == "refresh" => HostRequest::Refresh,
            Some((action @ ("get" | "set"), name)) => {
                let characteristic = match name.parse::<Characteristic>() {
                    Ok(c) => c,
                    Err(err) => {
                        warn!("Ignoring request on {}: {}", topic, err);
                        return None;
                    }
                };
                if action == "get" {
                    HostRequest::Get(characteristic)
                } else {
                    // Unreadable payloads still reach the bridge, which rejects them.
                    let value = serde_json::from_slice::<Value>(payload).unwrap_or_else(|_| {
                        Value::String(String::from_utf8_lossy(payload).into_owned())
                    });
                    HostRequest::Set(characteristic, value)
                }
            }
            _ => return None,
        };
        Some(Inbound::Host(request))
    }

    async fn publish_json<T: Serialize + ?Sized>(
        &self,
        topic: String,
        retain: bool,
        payload: &T,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(payload)?;
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await?;
        Ok(())
    }

    pub async fn publish_value(
        &self,
        characteristic: Characteristic,
        value: &Value,
    ) -> Result<(), PublishError> {
        let topic = format!("{}/value/{}", self.accessory_path, characteristic);
        self.publish_json(topic, false, value).await
    }

    pub async fn publish_ack(&self, characteristic: Characteristic) -> Result<(), PublishError> {
        let topic = format!("{}/ack/{}", self.accessory_path, characteristic);
        self.publish_json(topic, false, &Value::Null).await
    }

    pub async fn publish_identified(&self) -> Result<(), PublishError> {
        let topic = format!("{}/identified", self.accessory_path);
        self.publish_json(topic, false, &Value::Null).await
    }

    pub async fn publish_error(
        &self,
        characteristic: Characteristic,
        err: &BridgeError,
    ) -> Result<(), PublishError> {
        let topic = format!("{}/error/{}", self.accessory_path, characteristic);
        self.publish_json(topic, false, &err.to_string()).await
    }

    pub async fn publish_layout(&self, layout: &AccessoryLayout) -> Result<(), PublishError> {
        info!(
            "Publishing {} services for {} on MQTT",
            layout.services.len(),
            layout.name
        );
        let topic = format!("{}/services", self.accessory_path);
        self.publish_json(topic, true, layout).await
    }

    pub async fn publish_rpc_request(
        &self,
        frame: &RpcRequestFrame<'_>,
    ) -> Result<(), PublishError> {
        let topic = format!("{}/request", self.rpc_path);
        self.publish_json(topic, false, frame).await
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

fn ends_session(event: &rumqttc::Event) -> bool {
    matches!(event, rumqttc::Event::Outgoing(rumqttc::Outgoing::Disconnect))
}

fn sanitize_name(name: &str) -> String {
    // Remove any non-alphanumeric characters and replace spaces with underscores
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
}
