//! ryzlink - LTE modem command line tools
//!
//! Opens a session with the modem and runs one of the front ends:
//!
//! - `terminal`: raw AT passthrough
//! - `http`: HTTP exerciser against httpbin.org
//! - `weather`: one-shot weather lookup
//! - `mqtt`: publish to / listen on a topic
//! - `socket`: TCP echo client
//! - `ports`: list serial ports

mod input;
mod shell;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use input::Input;
use ryzlink_core::prelude::*;
use ryzlink_core::protocol::{list_ports, TransactionEngine, LINE_READ_TIMEOUT};
use shell::{HttpCommand, MqttCommand};

#[derive(Parser)]
#[command(name = "ryzlink", version)]
#[command(about = "Drive an RYZ014 LTE modem over its AT command interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/ryzlink/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args)]
struct LinkArgs {
    /// Serial port of the modem, or tcp://host:port for a bridged port
    #[arg(short, long)]
    port: Option<String>,

    /// Enable RTS/CTS flow control
    #[arg(long)]
    flow_control: bool,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward typed lines to the modem and show what comes back
    Terminal {
        #[command(flatten)]
        link: LinkArgs,
    },
    /// HTTP_GET, HTTP_HEAD, HTTP_DELETE, HTTP_POST, HTTP_PUT, HTTP_STREAM
    Http {
        #[command(flatten)]
        link: LinkArgs,

        /// Server host
        #[arg(long)]
        host: Option<String>,
    },
    /// Current weather from openweathermap.org
    Weather {
        #[command(flatten)]
        link: LinkArgs,

        /// City name, e.g. "Austin" or "Austin,US"
        #[arg(required = true)]
        location: Vec<String>,

        /// openweathermap.org API key
        #[arg(long)]
        api_key: Option<String>,
    },
    /// MQTT_PUB and MQTT_SUB against a broker
    Mqtt {
        #[command(flatten)]
        link: LinkArgs,

        /// Broker host
        #[arg(long)]
        broker: Option<String>,

        /// Topic to publish to and subscribe on
        #[arg(long)]
        topic: Option<String>,
    },
    /// Echo typed lines through a TCP server
    Socket {
        #[command(flatten)]
        link: LinkArgs,

        /// Server address
        server_ip: String,

        /// Server port
        server_port: u16,
    },
    /// List serial ports
    Ports,
}

impl LinkArgs {
    fn apply(&self, transport: &mut TransportConfig) -> Result<()> {
        if let Some(port) = &self.port {
            transport.port = port.clone();
        }
        if let Some(baud) = self.baud {
            transport.baud_rate = baud;
        }
        if self.flow_control {
            transport.flow_control = true;
        }
        if transport.port.is_empty() {
            bail!("No modem port given; pass --port or set transport.port in the config file");
        }
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "ryzlink=debug" } else { "ryzlink=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<LinkConfig> {
    let path = match path {
        Some(path) => return LinkConfig::load(&path).context("Loading config"),
        None => LinkConfig::default_path(),
    };
    match path {
        Ok(path) => Ok(LinkConfig::load_or_default(&path)?),
        Err(e) => {
            debug!("{}, using defaults", e);
            Ok(LinkConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = load_config(cli.config)?;

    let (link, mode) = match cli.command {
        Commands::Ports => {
            for port in list_ports() {
                match (port.usb, port.description) {
                    (Some(usb), Some(product)) => {
                        println!("{}\t{:04x}:{:04x}\t{}", port.name, usb.vid, usb.pid, product)
                    }
                    (Some(usb), None) => println!("{}\t{:04x}:{:04x}", port.name, usb.vid, usb.pid),
                    _ => println!("{}", port.name),
                }
            }
            return Ok(());
        }
        Commands::Terminal { link } => (link, Mode::Terminal),
        Commands::Http { link, host } => {
            if let Some(host) = host {
                config.http.host = host;
            }
            (link, Mode::Http)
        }
        Commands::Weather {
            link,
            location,
            api_key,
        } => {
            if let Some(key) = api_key {
                config.weather.api_key = key;
            }
            if config.weather.api_key.is_empty() {
                bail!("An openweathermap.org API key is required; pass --api-key or set weather.api_key");
            }
            (link, Mode::Weather(location.join(" ")))
        }
        Commands::Mqtt {
            link,
            broker,
            topic,
        } => {
            if let Some(broker) = broker {
                config.mqtt.broker = broker;
            }
            if let Some(topic) = topic {
                config.mqtt.topic = topic;
            }
            (link, Mode::Mqtt)
        }
        Commands::Socket {
            link,
            server_ip,
            server_port,
        } => (link, Mode::Socket(server_ip, server_port)),
    };

    link.apply(&mut config.transport)?;
    let session = Session::open(&config.transport, config.engine.clone())
        .await
        .with_context(|| format!("Opening {}", config.transport.port))?;
    info!("Connected to modem on {}", config.transport.port);

    let input = Input::stdin();
    let result = match mode {
        Mode::Terminal => {
            let mut input = input;
            supervise(session, move |mut engine| async move {
                terminal(&mut engine, &mut input).await
            })
            .await
        }
        Mode::Http => {
            let settings = config.http.clone();
            supervise(session, |engine| http_shell(engine, input, settings)).await
        }
        Mode::Weather(location) => {
            let settings = config.weather.clone();
            supervise(session, |engine| weather(engine, settings, location)).await
        }
        Mode::Mqtt => {
            let settings = config.mqtt.clone();
            supervise(session, |engine| mqtt_shell(engine, input, settings)).await
        }
        Mode::Socket(ip, port) => {
            let settings = config.socket.clone();
            supervise(session, |engine| socket(engine, input, settings, ip, port)).await
        }
    };

    println!("Exiting...");
    result
}

enum Mode {
    Terminal,
    Http,
    Weather(String),
    Mqtt,
    Socket(String, u16),
}

/// Run `foreground` next to the collector; Ctrl-C ends both
async fn supervise<F, Fut>(session: Session, foreground: F) -> Result<()>
where
    F: FnOnce(TransactionEngine) -> Fut,
    Fut: Future<Output = Result<(), ModemError>>,
{
    let (engine, supervisor) = session.into_parts();
    let cancel = supervisor.cancel_token();
    tokio::select! {
        result = supervisor.run(foreground(engine)) => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            Ok(())
        }
    }
}

/// Print a failed step and carry on, unless the link itself is gone
fn report(result: Result<(), ModemError>) -> Result<(), ModemError> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            println!("Error: {}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// Forward typed lines to the modem. Nobody waits on replies in this mode
/// (the collector logs them), so the FIFO is swept once per read window.
async fn terminal(engine: &mut TransactionEngine, input: &mut Input) -> Result<(), ModemError> {
    let mut sweep = tokio::time::interval(LINE_READ_TIMEOUT);
    Input::show(">>> ");
    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line else { break };
                if !line.is_empty() {
                    engine.drain();
                    engine.send(&line, shell::needs_terminator(&line)).await?;
                }
                Input::show(">>> ");
            }
            _ = sweep.tick() => {
                engine.drain();
            }
        }
    }
    Ok(())
}

async fn http_shell(
    mut engine: TransactionEngine,
    mut input: Input,
    settings: HttpSettings,
) -> Result<(), ModemError> {
    while let Some(line) = input.prompt(">>> ").await {
        if line.trim().is_empty() {
            continue;
        }
        let command = match shell::parse_http(&line) {
            Ok(HttpCommand::Exit) => break,
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        println!("{}", command.announcement(&settings.host));
        let mut http = HttpDriver::new(&mut engine, settings.clone());
        let result = match command {
            HttpCommand::Get => http.get("/get").await.map(print_body),
            HttpCommand::Head => http
                .head("/get")
                .await
                .map(|status| println!("HTTP status: {}", status)),
            HttpCommand::Delete => http.delete("/delete").await.map(print_body),
            HttpCommand::Post(message) => http.post("/post", &message).await.map(print_body),
            HttpCommand::Put(message) => http.put("/put", &message).await.map(print_body),
            HttpCommand::Stream(chunks) => http.stream(chunks).await.map(|reply| {
                println!(
                    "Stream test successful: {} chunks, {} bytes",
                    chunks,
                    reply.body.len()
                )
            }),
            HttpCommand::Exit => break,
        };
        report(result)?;
    }
    Ok(())
}

fn print_body(body: serde_json::Value) {
    println!("\nReceived response:\n{}", body);
}

async fn weather(
    mut engine: TransactionEngine,
    settings: WeatherSettings,
    location: String,
) -> Result<(), ModemError> {
    println!("Requesting weather for {} from openweathermap.org...", location);
    let report = WeatherDriver::new(&mut engine, settings)
        .fetch(&location)
        .await?;
    println!("\nWeather for {}:", location);
    println!("\tForecast: {}", report.description);
    println!("\tTemperature (K): {:.1}", report.temperature);
    println!("\tHumidity (RH): {}", report.humidity);
    Ok(())
}

async fn mqtt_shell(
    mut engine: TransactionEngine,
    mut input: Input,
    settings: MqttSettings,
) -> Result<(), ModemError> {
    while let Some(line) = input.prompt(">>> ").await {
        if line.trim().is_empty() {
            continue;
        }
        let result = match shell::parse_mqtt(&line) {
            Ok(MqttCommand::Publish) => {
                mqtt_publish(&mut engine, &mut input, settings.clone()).await
            }
            Ok(MqttCommand::Subscribe(secs)) => {
                let secs = secs.unwrap_or(settings.listen_secs);
                mqtt_subscribe(&mut engine, settings.clone(), secs).await
            }
            Ok(MqttCommand::Exit) => break,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        report(result)?;
    }
    Ok(())
}

async fn mqtt_publish(
    engine: &mut TransactionEngine,
    input: &mut Input,
    settings: MqttSettings,
) -> Result<(), ModemError> {
    println!(
        "Publishing MQTT data to topic: {} on server: {}",
        settings.topic, settings.broker
    );
    let mut mqtt = MqttDriver::new(engine, settings);
    mqtt.connect().await?;

    while let Some(message) = input
        .prompt("Enter a message to publish, or exit to quit: ")
        .await
    {
        if message == "exit" {
            break;
        }
        mqtt.publish(&message).await?;
        println!(
            "Published \"{}\" to topic {} at {}",
            message,
            mqtt.settings().topic,
            mqtt.settings().broker
        );
    }

    mqtt.disconnect().await
}

async fn mqtt_subscribe(
    engine: &mut TransactionEngine,
    settings: MqttSettings,
    secs: u64,
) -> Result<(), ModemError> {
    let mut mqtt = MqttDriver::new(engine, settings);
    mqtt.connect().await?;
    mqtt.subscribe().await?;
    println!(
        "Subscribed to {} at {}. Listening for {} seconds...",
        mqtt.settings().topic,
        mqtt.settings().broker,
        secs
    );
    let count = mqtt
        .listen(Duration::from_secs(secs), |message| {
            println!("Received message: {}", message)
        })
        .await?;
    println!("{} seconds expired after {} messages, disconnected", secs, count);
    Ok(())
}

async fn socket(
    mut engine: TransactionEngine,
    mut input: Input,
    settings: SocketSettings,
    server_ip: String,
    server_port: u16,
) -> Result<(), ModemError> {
    let mut socket = SocketDriver::new(&mut engine, settings, server_ip, server_port);
    println!("Opening socket...");
    socket.open().await?;
    println!("Connected to server");

    while let Some(message) = input
        .prompt("Enter a message to send to the server, or exit to quit: ")
        .await
    {
        if message.is_empty() {
            continue;
        }
        if message == "exit" {
            break;
        }
        let reply = socket
            .echo(&message)
            .await
            .map(|reply| println!("Received from server: {}", reply));
        report(reply)?;
    }

    println!("Disconnecting socket...");
    socket.close().await
}
