//! MQTT client over the modem's `+SQNSMQTT*` commands

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::protocol::commands::{
    MqttConfig, MqttConnect, MqttDisconnect, MqttPublish, MqttReceive, MqttSubscribe, Qos,
};
use crate::protocol::payload::{parse_result_code, strip_ok};
use crate::protocol::{encode, ModemError, Outcome, TransactionEngine};

/// Event confirming a publish
pub const MQTT_ON_PUBLISH: &str = "+SQNSMQTTONPUBLISH";

/// Event announcing a message on a subscribed topic
pub const MQTT_ON_MESSAGE: &str = "+SQNSMQTTONMESSAGE";

/// MQTT client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Broker host
    pub broker: String,
    /// Broker port
    pub port: u16,
    /// Client identifier
    pub client_id: String,
    /// Topic to publish to and subscribe on
    pub topic: String,
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Quality of service for subscriptions
    pub qos: Qos,
    /// Default listen window for subscriptions, in seconds
    pub listen_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: "test.mosquitto.org".to_string(),
            port: 1883,
            client_id: "ryz_client".to_string(),
            topic: "renesas/lte_mqtt".to_string(),
            client_index: 0,
            qos: Qos::AtLeastOnce,
            listen_secs: 30,
        }
    }
}

/// Publishes to and listens on one topic
pub struct MqttDriver<'e> {
    engine: &'e mut TransactionEngine,
    settings: MqttSettings,
    timeout: Duration,
}

impl<'e> MqttDriver<'e> {
    /// Driver running on `engine`
    pub fn new(engine: &'e mut TransactionEngine, settings: MqttSettings) -> Self {
        let timeout = engine.default_timeout();
        Self {
            engine,
            settings,
            timeout,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    /// Disconnect from the broker. Not being connected is not an error; only
    /// a dead link is reported.
    pub async fn disconnect(&mut self) -> Result<(), ModemError> {
        let command = MqttDisconnect {
            client_index: self.settings.client_index,
        };
        match self.engine.transact(&command, self.timeout).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!("MqttDriver: disconnect ignored: {}", e);
                Ok(())
            }
        }
    }

    /// Start from a clean state, set the client identity and connect
    pub async fn connect(&mut self) -> Result<(), ModemError> {
        self.disconnect().await?;

        let config = MqttConfig {
            client_index: self.settings.client_index,
            client_id: self.settings.client_id.clone(),
            username: None,
            password: None,
        };
        self.engine.transact(&config, self.timeout).await?;

        let connect = MqttConnect {
            client_index: self.settings.client_index,
            host: self.settings.broker.clone(),
            port: self.settings.port,
        };
        let event = self.engine.transact(&connect, self.timeout).await?;
        let code = parse_result_code(&event)?;
        if code != 0 {
            return Err(ModemError::ProtocolError {
                command: encode(&connect),
                response: format!("connect result code {}", code),
            });
        }
        info!(
            "Connected to {}:{} as {}",
            self.settings.broker, self.settings.port, self.settings.client_id
        );
        Ok(())
    }

    /// Publish `message` on the configured topic
    pub async fn publish(&mut self, message: &str) -> Result<(), ModemError> {
        let command = MqttPublish {
            client_index: self.settings.client_index,
            topic: self.settings.topic.clone(),
            qos: None,
            length: message.len(),
        };
        self.engine.transact(&command, self.timeout).await?;
        self.engine
            .send_payload(message, MQTT_ON_PUBLISH, self.timeout)
            .await?;
        Ok(())
    }

    /// Subscribe to the configured topic
    pub async fn subscribe(&mut self) -> Result<(), ModemError> {
        let command = MqttSubscribe {
            client_index: self.settings.client_index,
            topic: self.settings.topic.clone(),
            qos: self.settings.qos,
        };
        self.engine.transact(&command, self.timeout).await?;
        Ok(())
    }

    /// Deliver messages to `on_message` until `duration` has passed, then
    /// disconnect. Returns how many messages arrived.
    ///
    /// The window is fixed when the call starts; fetching a message does not
    /// extend it.
    pub async fn listen<F>(&mut self, duration: Duration, mut on_message: F) -> Result<usize, ModemError>
    where
        F: FnMut(&str),
    {
        let deadline = Instant::now() + duration;
        let mut received = 0;

        loop {
            match self.engine.wait_until(MQTT_ON_MESSAGE, deadline).await? {
                Outcome::Matched(_) => {
                    let command = MqttReceive {
                        client_index: self.settings.client_index,
                        topic: self.settings.topic.clone(),
                        message_id: None,
                    };
                    let raw = self.engine.transact(&command, self.timeout).await?;
                    on_message(strip_ok(&raw)?);
                    received += 1;
                }
                Outcome::TimedOut => {
                    info!("Listen window of {:?} expired", duration);
                    break;
                }
                Outcome::ProtocolError(response) => {
                    return Err(ModemError::ProtocolError {
                        command: MQTT_ON_MESSAGE.to_string(),
                        response,
                    })
                }
            }
        }

        self.disconnect().await?;
        Ok(received)
    }
}
