//! Driver chains against a scripted modem

mod common;

use common::{scripted_engine, Step, OK, PROMPT};
use pretty_assertions::assert_eq;
use ryzlink_core::drivers::{
    HttpDriver, HttpSettings, MqttDriver, MqttSettings, SocketDriver, SocketSettings,
    WeatherDriver, WeatherSettings,
};
use ryzlink_core::protocol::ModemError;
use serde_json::json;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;

const HTTP_CFG: &str = "AT+SQNHTTPCFG=1,\"httpbin.org\",80,0,\"\",\"\",0,120,1";

#[tokio::test(start_paused = true)]
async fn test_http_get() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(HTTP_CFG, OK),
        Step::Command(
            "AT+SQNHTTPQRY=1,0,\"/get\"",
            "\r\nOK\r\n\r\n+CEREG: 5\r\n\r\n+SQNHTTPRING: 1,200,\"application/json\",24\r\n",
        ),
        Step::Command(
            "AT+SQNHTTPRCV=1",
            "\r\n<<<{\"url\":\"http://httpbin.org/get\"}\r\nOK\r\n",
        ),
    ]);

    let body = HttpDriver::new(&mut engine, HttpSettings::default())
        .get("/get")
        .await
        .unwrap();
    assert_eq!(body, json!({"url": "http://httpbin.org/get"}));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_http_get_non_200_is_not_fatal() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(HTTP_CFG, OK),
        Step::Command(
            "AT+SQNHTTPQRY=1,2,\"/delete\"",
            "\r\nOK\r\n\r\n+SQNHTTPRING: 1,404,\"application/json\",2\r\n",
        ),
        Step::Command("AT+SQNHTTPRCV=1", "\r\n<<<{}\r\nOK\r\n"),
    ]);

    let body = HttpDriver::new(&mut engine, HttpSettings::default())
        .delete("/delete")
        .await
        .unwrap();
    assert_eq!(body, json!({}));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_http_post_with_prompt() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(HTTP_CFG, OK),
        Step::Command("AT+SQNHTTPSND=1,0,\"/post\",5", PROMPT),
        Step::Payload(
            "hello",
            "\r\nOK\r\n\r\n+SQNHTTPRING: 1,200,\"application/json\",17\r\n",
        ),
        Step::Command("AT+SQNHTTPRCV=1", "\r\n<<<{\"data\":\"hello\"}\r\nOK\r\n"),
    ]);

    let body = HttpDriver::new(&mut engine, HttpSettings::default())
        .post("/post", "hello")
        .await
        .unwrap();
    assert_eq!(body["data"], "hello");

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_http_put_non_200_aborts() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(HTTP_CFG, OK),
        Step::Command("AT+SQNHTTPSND=1,1,\"/put\",3", PROMPT),
        Step::Payload("abc", "\r\nOK\r\n\r\n+SQNHTTPRING: 1,500,\"text/html\",0\r\n"),
    ]);

    let err = HttpDriver::new(&mut engine, HttpSettings::default())
        .put("/put", "abc")
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::HttpStatus(500)));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_error_mid_chain_aborts() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(HTTP_CFG, OK),
        Step::Command("AT+SQNHTTPQRY=1,0,\"/get\"", "\r\n+CME ERROR: 4\r\n"),
    ]);

    let err = HttpDriver::new(&mut engine, HttpSettings::default())
        .get("/get")
        .await
        .unwrap_err();
    match err {
        ModemError::ProtocolError { command, .. } => {
            assert_eq!(command, "AT+SQNHTTPQRY=1,0,\"/get\"")
        }
        other => panic!("unexpected error: {}", other),
    }

    // Nothing was sent after the failing step
    let mut modem = modem.await.unwrap();
    drop(engine);
    supervisor.shutdown().await.unwrap();
    let mut rest = Vec::new();
    modem.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_weather_fetch() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(
            "AT+SQNHTTPCFG=1,\"api.openweathermap.org/data/2.5/weather?appid=k3y&q=Austin\"",
            OK,
        ),
        Step::Command(
            "AT+SQNHTTPQRY=1,0,\"/get\"",
            "\r\nOK\r\n\r\n+SQNHTTPRING: 1,200,\"application/json\",90\r\n",
        ),
        Step::Command(
            "AT+SQNHTTPRCV=1",
            "\r\n<<<{\"weather\":[{\"description\":\"light rain\"}],\"main\":{\"temp\":290.5,\"humidity\":88}}\r\nOK\r\n",
        ),
    ]);

    let settings = WeatherSettings {
        api_key: "k3y".to_string(),
        ..WeatherSettings::default()
    };
    let report = WeatherDriver::new(&mut engine, settings)
        .fetch("Austin")
        .await
        .unwrap();
    assert_eq!(report.description, "light rain");
    assert_eq!(report.temperature, 290.5);
    assert_eq!(report.humidity, 88.0);

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_weather_unauthorized() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(
            "AT+SQNHTTPCFG=1,\"api.openweathermap.org/data/2.5/weather?appid=&q=Nowhere\"",
            OK,
        ),
        Step::Command(
            "AT+SQNHTTPQRY=1,0,\"/get\"",
            "\r\nOK\r\n\r\n+SQNHTTPRING: 1,401,\"application/json\",50\r\n",
        ),
    ]);

    let err = WeatherDriver::new(&mut engine, WeatherSettings::default())
        .fetch("Nowhere")
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::HttpStatus(401)));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

const MQTT_DISCONNECT: &str = "AT+SQNSMQTTDISCONNECT=0";
const MQTT_ON_DISCONNECT: &str = "\r\nOK\r\n\r\n+SQNSMQTTONDISCONNECT:0,0\r\n";

fn mqtt_connect_steps() -> Vec<Step> {
    vec![
        // Not connected yet: the modem refuses, which is fine
        Step::Command(MQTT_DISCONNECT, "\r\nERROR\r\n"),
        Step::Command("AT+SQNSMQTTCFG=0,\"ryz_client\"", OK),
        Step::Command(
            "AT+SQNSMQTTCONNECT=0,\"test.mosquitto.org\",1883",
            "\r\nOK\r\n\r\n+SQNSMQTTONCONNECT:0,0\r\n",
        ),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_mqtt_publish() {
    let mut script = mqtt_connect_steps();
    script.extend([
        Step::Command("AT+SQNSMQTTPUBLISH=0,\"renesas/lte_mqtt\",,5", PROMPT),
        Step::Payload("hello", "\r\nOK\r\n\r\n+SQNSMQTTONPUBLISH:0,\"renesas/lte_mqtt\",1,0\r\n"),
        Step::Command(MQTT_DISCONNECT, MQTT_ON_DISCONNECT),
    ]);
    let (mut engine, supervisor, modem) = scripted_engine(script);

    let mut mqtt = MqttDriver::new(&mut engine, MqttSettings::default());
    mqtt.connect().await.unwrap();
    mqtt.publish("hello").await.unwrap();
    mqtt.disconnect().await.unwrap();

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_mqtt_connect_rejected() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(MQTT_DISCONNECT, MQTT_ON_DISCONNECT),
        Step::Command("AT+SQNSMQTTCFG=0,\"ryz_client\"", OK),
        Step::Command(
            "AT+SQNSMQTTCONNECT=0,\"test.mosquitto.org\",1883",
            "\r\nOK\r\n\r\n+SQNSMQTTONCONNECT:0,-2\r\n",
        ),
    ]);

    let err = MqttDriver::new(&mut engine, MqttSettings::default())
        .connect()
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::ProtocolError { .. }));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_mqtt_listen_until_deadline() {
    let mut script = mqtt_connect_steps();
    script.extend([
        Step::Command(
            "AT+SQNSMQTTSUBSCRIBE=0,\"renesas/lte_mqtt\",1",
            "\r\nOK\r\n\r\n+SQNSMQTTONSUBSCRIBE:0,\"renesas/lte_mqtt\",0\r\n",
        ),
        Step::Unsolicited("\r\n+SQNSMQTTONMESSAGE:0,\"renesas/lte_mqtt\",5,1,1\r\n"),
        Step::Command(
            "AT+SQNSMQTTRCVMESSAGE=0,\"renesas/lte_mqtt\"",
            "\r\nhello\r\nOK\r\n",
        ),
        Step::Command(MQTT_DISCONNECT, MQTT_ON_DISCONNECT),
    ]);
    let (mut engine, supervisor, modem) = scripted_engine(script);

    let mut mqtt = MqttDriver::new(&mut engine, MqttSettings::default());
    mqtt.connect().await.unwrap();
    mqtt.subscribe().await.unwrap();

    let start = Instant::now();
    let mut messages = Vec::new();
    let count = mqtt
        .listen(Duration::from_secs(5), |m| messages.push(m.to_string()))
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(messages, vec!["hello".to_string()]);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(6));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_socket_echo() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![
        Step::Command(
            "AT+SQNSS",
            "\r\n+SQNSS: 1,2,\"10.0.0.2\",50000,\"203.0.113.7\",12345,1\r\n+SQNSS: 2,0\r\n\r\nOK\r\n",
        ),
        Step::Command("AT+SQNSH=1", OK),
        Step::Command("AT+SQNSCFG=1,1,0,0,600,50", OK),
        Step::Command("AT+SQNSD=1,0,12345,\"203.0.113.7\",0,0,1,0,0", OK),
        Step::Command("AT+SQNSSENDEXT=1,4", PROMPT),
        Step::Payload("ping", "\r\nOK\r\n\r\n+SQNSRING: 1,4\r\n"),
        Step::Command("AT+SQNSRECV=1,4", "\r\n+SQNSRECV: 1,4\r\nping\r\nOK\r\n"),
        Step::Command("AT+SQNSH=1", OK),
    ]);

    let mut socket = SocketDriver::new(&mut engine, SocketSettings::default(), "203.0.113.7", 12345);
    socket.open().await.unwrap();
    assert_eq!(socket.echo("ping").await.unwrap(), "ping");
    socket.close().await.unwrap();

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_socket_timeout_uses_socket_budget() {
    let (mut engine, supervisor, modem) = scripted_engine(vec![Step::Command("AT+SQNSS", "")]);

    let start = Instant::now();
    let err = SocketDriver::new(&mut engine, SocketSettings::default(), "203.0.113.7", 12345)
        .status()
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::Timeout { ref command } if command == "AT+SQNSS"));
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(11));

    let _modem = modem.await.unwrap();
    supervisor.shutdown().await.unwrap();
}
