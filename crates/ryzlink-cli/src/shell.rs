//! Shell command parsing
//!
//! Commands are case sensitive, as typed on the modem kits' own CLIs. The
//! first word picks the command; the rest of the line is its argument.

use thiserror::Error;

use ryzlink_core::protocol::ESCAPE_SEQUENCE;

/// Body sent by `HTTP_POST` without an argument
pub const DEFAULT_POST_MESSAGE: &str = "default POST message";
/// Body sent by `HTTP_PUT` without an argument
pub const DEFAULT_PUT_MESSAGE: &str = "default PUT message";
/// Chunk count for `HTTP_STREAM` without an argument
pub const DEFAULT_STREAM_CHUNKS: u32 = 10;

/// Rejected input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShellError {
    #[error("Invalid command")]
    InvalidCommand,
    #[error("Invalid argument '{0}'")]
    InvalidArgument(String),
}

/// HTTP exerciser commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpCommand {
    Get,
    Head,
    Delete,
    Post(String),
    Put(String),
    Stream(u32),
    Exit,
}

impl HttpCommand {
    /// Line printed before the request goes out
    pub fn announcement(&self, host: &str) -> String {
        let method = match self {
            HttpCommand::Stream(chunks) => {
                return format!("Sending HTTP STREAM test to {}, streaming {} chunks", host, chunks)
            }
            HttpCommand::Get => "GET",
            HttpCommand::Head => "HEAD",
            HttpCommand::Delete => "DELETE",
            HttpCommand::Post(_) => "POST",
            HttpCommand::Put(_) => "PUT",
            HttpCommand::Exit => "EXIT",
        };
        format!("Sending HTTP {} request to {}", method, host)
    }
}

/// MQTT commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttCommand {
    Publish,
    /// Listen window in seconds; `None` uses the configured default
    Subscribe(Option<u64>),
    Exit,
}

fn split(line: &str) -> (&str, Option<&str>) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => {
            let rest = rest.trim();
            (word, (!rest.is_empty()).then_some(rest))
        }
        None => (line, None),
    }
}

fn number<T: std::str::FromStr>(arg: &str) -> Result<T, ShellError> {
    arg.parse()
        .map_err(|_| ShellError::InvalidArgument(arg.to_string()))
}

/// Parse one line typed in HTTP mode
pub fn parse_http(line: &str) -> Result<HttpCommand, ShellError> {
    let (word, arg) = split(line);
    Ok(match word {
        "HTTP_GET" => HttpCommand::Get,
        "HTTP_HEAD" => HttpCommand::Head,
        "HTTP_DELETE" => HttpCommand::Delete,
        "HTTP_POST" => HttpCommand::Post(arg.unwrap_or(DEFAULT_POST_MESSAGE).to_string()),
        "HTTP_PUT" => HttpCommand::Put(arg.unwrap_or(DEFAULT_PUT_MESSAGE).to_string()),
        "HTTP_STREAM" => HttpCommand::Stream(match arg {
            Some(n) => number(n)?,
            None => DEFAULT_STREAM_CHUNKS,
        }),
        "EXIT" => HttpCommand::Exit,
        _ => return Err(ShellError::InvalidCommand),
    })
}

/// Parse one line typed in MQTT mode
pub fn parse_mqtt(line: &str) -> Result<MqttCommand, ShellError> {
    let (word, arg) = split(line);
    Ok(match word {
        "MQTT_PUB" => MqttCommand::Publish,
        "MQTT_SUB" => MqttCommand::Subscribe(arg.map(number::<u64>).transpose()?),
        "EXIT" => MqttCommand::Exit,
        _ => return Err(ShellError::InvalidCommand),
    })
}

/// Whether a line typed in terminal mode gets a carriage return.
/// The escape sequence must reach the modem bare.
pub fn needs_terminator(line: &str) -> bool {
    line != ESCAPE_SEQUENCE
}
