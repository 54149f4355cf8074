//! AIS bridge watch

use ais_bridge::bridges::BridgeRegistry;
use ais_bridge::config::AppConfig;
use ais_bridge::errors::AisBridgeError;
use ais_bridge::ingest::ReportAssembler;
use ais_bridge::monitor::BridgeMonitor;
use ais_bridge::mqtt::{MqttClient, MqttClientBuilder};
use ais_bridge::text::BridgeText;
use ais_bridge::tracker::{TrackerEvent, VesselTracker};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AisBridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.tracker.validate()?;

    let tracker = VesselTracker::new(config.tracker.clone(), BridgeRegistry::default());
    let (monitor, outputs) = BridgeMonitor::new(tracker);
    tokio::spawn(log_text(outputs.text));

    let mqtt_client = MqttClientBuilder::new(&config.mqtt)?.connect(&config.mqtt.topics);

    tokio::select! {
        _ = run_bridge_watch(mqtt_client, &monitor, outputs.events) => {
            warn!("MQTT feed ended");
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    monitor.shutdown().await;
    Ok(())
}

async fn run_bridge_watch(
    mut mqtt_client: MqttClient,
    monitor: &BridgeMonitor,
    mut events: mpsc::Receiver<TrackerEvent>,
) {
    let mut assembler = ReportAssembler::new();
    loop {
        tokio::select! {
            // Drain events first so the monitor never blocks on a full channel
            biased;

            Some(event) = events.recv() => match event {
                TrackerEvent::Approaching { bridge, vessel, direction, .. } => {
                    let direction = direction.map(|d| d.to_string()).unwrap_or_default();
                    info!("{} approaching {} {}", vessel, bridge, direction);
                }
                TrackerEvent::Removed { mmsi, vessel, reason } => {
                    info!("{} no longer tracked ({:?})", vessel, reason);
                    assembler.forget(mmsi);
                }
                TrackerEvent::StatusChanged { .. } => {}
            },
            message = mqtt_client.recv() => match message {
                Some(message) => {
                    if let Some(report) = assembler.assemble(message) {
                        monitor.handle_report(&report).await;
                    }
                }
                None => break,
            },
        }
    }
}

async fn log_text(mut text: watch::Receiver<BridgeText>) {
    while text.changed().await.is_ok() {
        let current = text.borrow_and_update().clone();
        info!("Bridge text: {}", current.text);
    }
}
