//! MQTT feed of AIS messages

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};

use crate::{
    config::MqttConfig,
    errors::AisBridgeError,
    models::{AisMessage, AisMessageType, Mmsi, VesselLocation, VesselMetadata},
};

const TOPIC_ROOT: &str = "vessels-v2";

pub struct MqttClientBuilder {
    client: AsyncClient,
    event_loop: EventLoop,
    tx: mpsc::Sender<AisMessage>,
    rx: mpsc::Receiver<AisMessage>,
}

pub struct MqttClient {
    _client: AsyncClient,
    rx: mpsc::Receiver<AisMessage>,
    _handle: tokio::task::JoinHandle<Result<(), AisBridgeError>>,
}

impl MqttClientBuilder {
    pub fn new(config: &MqttConfig) -> Result<Self, AisBridgeError> {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.uri, 443);
        mqtt_options.set_transport(Transport::wss_with_default_config());
        mqtt_options.set_keep_alive(Duration::from_secs(5));

        let (client, event_loop) = AsyncClient::new(mqtt_options, 100);
        let (tx, rx) = mpsc::channel(256);

        Ok(Self {
            client,
            event_loop,
            tx,
            rx,
        })
    }

    /// Start the event loop; topics are (re)subscribed on every ConnAck
    pub fn connect(self, topics: &[String]) -> MqttClient {
        let handle = tokio::spawn(Self::process_events(
            self.tx,
            self.event_loop,
            self.client.clone(),
            topics.to_vec(),
        ));

        MqttClient {
            _client: self.client,
            rx: self.rx,
            _handle: handle,
        }
    }

    async fn subscribe(client: &AsyncClient, topics: &[String]) -> Result<(), AisBridgeError> {
        for topic in topics {
            info!("Subscribing to topic: {}", topic);
            client.subscribe(topic, QoS::AtMostOnce).await?;
        }
        Ok(())
    }

    /// Poll the broker until the receiving side goes away
    ///
    /// rumqttc reconnects on its own, so connection errors are only logged.
    async fn process_events(
        tx: mpsc::Sender<AisMessage>,
        mut event_loop: EventLoop,
        client: AsyncClient,
        topics: Vec<String>,
    ) -> Result<(), AisBridgeError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                    Self::subscribe(&client, &topics).await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match parse_message(&publish.topic, &publish.payload) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                debug!("Receiver dropped, stopping MQTT loop");
                                return Ok(());
                            }
                        }
                        Err(e) => warn!("Failed to parse message on {}: {}", publish.topic, e),
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("MQTT error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

impl MqttClient {
    /// Next message, None once the event loop has stopped
    pub async fn recv(&mut self) -> Option<AisMessage> {
        self.rx.recv().await
    }
}

/// Parse a message from its topic `vessels-v2/<mmsi>/<kind>` and JSON payload
pub fn parse_message(topic: &str, payload: &[u8]) -> Result<AisMessage, AisBridgeError> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() != 3 || parts[0] != TOPIC_ROOT {
        return Err(AisBridgeError::InvalidTopic(topic.to_string()));
    }

    let mmsi = Mmsi::try_from(parts[1])?;
    let message_type = match parts[2] {
        "location" => AisMessageType::Location(serde_json::from_slice::<VesselLocation>(payload)?),
        "metadata" => AisMessageType::Metadata(serde_json::from_slice::<VesselMetadata>(payload)?),
        other => return Err(AisBridgeError::UnknownMessageType(other.to_string())),
    };
    Ok(AisMessage::new(mmsi, message_type))
}
