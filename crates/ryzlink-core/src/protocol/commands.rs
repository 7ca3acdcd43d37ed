//! Protocol commands
//!
//! Typed records for the Sequans AT command set used by the drivers (HTTP
//! client, MQTT client and socket commands). Field names follow the command
//! reference; optional fields left as `None` are omitted on the wire.

use serde::{Deserialize, Serialize};

use super::{AtCommand, CommandArgs, PAYLOAD_PROMPT};

/// Plain `AT` liveness check
#[derive(Debug, Clone, Copy, Default)]
pub struct Attention;

impl AtCommand for Attention {
    fn name(&self) -> &'static str {
        ""
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// HTTP request methods carried by `AT+SQNHTTPQRY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpQueryMethod {
    /// GET
    Get,
    /// HEAD
    Head,
    /// DELETE
    Delete,
}

impl HttpQueryMethod {
    fn code(self) -> u8 {
        match self {
            HttpQueryMethod::Get => 0,
            HttpQueryMethod::Head => 1,
            HttpQueryMethod::Delete => 2,
        }
    }
}

/// HTTP request methods carried by `AT+SQNHTTPSND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpSendMethod {
    /// POST
    Post,
    /// PUT
    Put,
}

impl HttpSendMethod {
    fn code(self) -> u8 {
        match self {
            HttpSendMethod::Post => 0,
            HttpSendMethod::Put => 1,
        }
    }
}

/// `AT+SQNHTTPCFG`: connection parameters for an HTTP profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Profile slot (1..=6)
    pub profile_id: u8,
    /// Server host name or address
    pub host: String,
    /// Server port (modem default 80)
    pub port: Option<u16>,
    /// 0 = none, 1 = basic
    pub auth_type: Option<u8>,
    /// User name for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Use TLS
    pub ssl_enabled: Option<bool>,
    /// Connection and transfer timeout in seconds
    pub timeout: Option<u32>,
    /// Server response timeout in seconds
    pub rcv_timeout: Option<u32>,
}

impl HttpConfig {
    /// Profile and host only; the modem keeps its defaults for everything else
    pub fn new(profile_id: u8, host: impl Into<String>) -> Self {
        Self {
            profile_id,
            host: host.into(),
            port: None,
            auth_type: None,
            username: None,
            password: None,
            ssl_enabled: None,
            timeout: None,
            rcv_timeout: None,
        }
    }

    /// Unauthenticated plain HTTP on `port`, 120 s transfer and 1 s receive timeout
    pub fn plain(profile_id: u8, host: impl Into<String>, port: u16) -> Self {
        Self {
            port: Some(port),
            auth_type: Some(0),
            username: Some(String::new()),
            password: Some(String::new()),
            ssl_enabled: Some(false),
            timeout: Some(120),
            rcv_timeout: Some(1),
            ..Self::new(profile_id, host)
        }
    }
}

impl AtCommand for HttpConfig {
    fn name(&self) -> &'static str {
        "+SQNHTTPCFG"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.profile_id)
            .quoted(&self.host)
            .opt_int(self.port)
            .opt_int(self.auth_type)
            .opt_quoted(self.username.as_deref())
            .opt_quoted(self.password.as_deref())
            .opt_flag(self.ssl_enabled)
            .opt_int(self.timeout)
            .opt_int(self.rcv_timeout);
    }
}

/// `AT+SQNHTTPQRY`: GET, HEAD or DELETE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpQuery {
    /// HTTP profile slot
    pub profile_id: u8,
    /// Request method
    pub method: HttpQueryMethod,
    /// Path on the server, e.g. "/get"
    pub resource: String,
}

impl AtCommand for HttpQuery {
    fn name(&self) -> &'static str {
        "+SQNHTTPQRY"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.profile_id)
            .int(self.method.code())
            .quoted(&self.resource);
    }

    fn completion(&self) -> &'static str {
        "+SQNHTTPRING"
    }
}

/// `AT+SQNHTTPSND`: POST or PUT; the body follows the `>` prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSend {
    /// HTTP profile slot
    pub profile_id: u8,
    /// Request method
    pub method: HttpSendMethod,
    /// Path on the server, e.g. "/get"
    pub resource: String,
    /// Body length in bytes
    pub data_len: usize,
}

impl AtCommand for HttpSend {
    fn name(&self) -> &'static str {
        "+SQNHTTPSND"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.profile_id)
            .int(self.method.code())
            .quoted(&self.resource)
            .int(self.data_len);
    }

    fn completion(&self) -> &'static str {
        PAYLOAD_PROMPT
    }
}

/// `AT+SQNHTTPRCV`: read the body announced by `+SQNHTTPRING`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpReceive {
    /// HTTP profile slot
    pub profile_id: u8,
}

impl AtCommand for HttpReceive {
    fn name(&self) -> &'static str {
        "+SQNHTTPRCV"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.profile_id);
    }
}

// ---------------------------------------------------------------------------
// MQTT client
// ---------------------------------------------------------------------------

/// MQTT quality of service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Qos {
    /// QoS 0
    AtMostOnce,
    /// QoS 1
    #[default]
    AtLeastOnce,
    /// QoS 2
    ExactlyOnce,
}

impl Qos {
    fn code(self) -> u8 {
        match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

/// `AT+SQNSMQTTCFG`: client identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// User name for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
}

impl AtCommand for MqttConfig {
    fn name(&self) -> &'static str {
        "+SQNSMQTTCFG"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index)
            .quoted(&self.client_id)
            .opt_quoted(self.username.as_deref())
            .opt_quoted(self.password.as_deref());
    }
}

/// `AT+SQNSMQTTCONNECT`: connect to a broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConnect {
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
}

impl AtCommand for MqttConnect {
    fn name(&self) -> &'static str {
        "+SQNSMQTTCONNECT"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index).quoted(&self.host).int(self.port);
    }

    fn completion(&self) -> &'static str {
        "+SQNSMQTTONCONNECT"
    }
}

/// `AT+SQNSMQTTSUBSCRIBE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSubscribe {
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Topic name
    pub topic: String,
    /// Quality of service
    pub qos: Qos,
}

impl AtCommand for MqttSubscribe {
    fn name(&self) -> &'static str {
        "+SQNSMQTTSUBSCRIBE"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index)
            .quoted(&self.topic)
            .int(self.qos.code());
    }

    fn completion(&self) -> &'static str {
        "+SQNSMQTTONSUBSCRIBE"
    }
}

/// `AT+SQNSMQTTPUBLISH`: the payload follows the `>` prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPublish {
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Topic name
    pub topic: String,
    /// Quality of service; empty on the wire when `None`
    pub qos: Option<Qos>,
    /// Payload length in bytes
    pub length: usize,
}

impl AtCommand for MqttPublish {
    fn name(&self) -> &'static str {
        "+SQNSMQTTPUBLISH"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index)
            .quoted(&self.topic)
            .opt_int(self.qos.map(Qos::code))
            .int(self.length);
    }

    fn completion(&self) -> &'static str {
        PAYLOAD_PROMPT
    }
}

/// `AT+SQNSMQTTRCVMESSAGE`: fetch a message announced by `+SQNSMQTTONMESSAGE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttReceive {
    /// Modem MQTT client slot
    pub client_index: u8,
    /// Topic name
    pub topic: String,
    /// Message to fetch; the latest one when `None`
    pub message_id: Option<u32>,
}

impl AtCommand for MqttReceive {
    fn name(&self) -> &'static str {
        "+SQNSMQTTRCVMESSAGE"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index)
            .quoted(&self.topic)
            .opt_int(self.message_id);
    }
}

/// `AT+SQNSMQTTDISCONNECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttDisconnect {
    /// Modem MQTT client slot
    pub client_index: u8,
}

impl AtCommand for MqttDisconnect {
    fn name(&self) -> &'static str {
        "+SQNSMQTTDISCONNECT"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.client_index);
    }

    fn completion(&self) -> &'static str {
        "+SQNSMQTTONDISCONNECT"
    }
}

// ---------------------------------------------------------------------------
// Sockets
// ---------------------------------------------------------------------------

/// Transport protocol for `AT+SQNSD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionProtocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
}

/// When a TCP socket hangs up (`AT+SQNSD` closure type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpClosure {
    /// When the remote side closes
    AfterRemote,
    /// After the local `+++` escape
    AfterEscape,
}

/// Whether the socket is driven in online (data) mode or command mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Data flows directly over the UART
    Online,
    /// Data moves through send/receive commands
    Command,
}

/// Which remote peers a listening/UDP socket accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptAnyRemote {
    /// Only the dialled peer
    Disabled,
    /// Accept from any peer
    AcceptsAny,
    /// Receive from and send to any peer
    ReceiveSendAny,
}

/// Whether `AT+SQNSD` returns before the connection is established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSetup {
    /// Return once connected
    Synchronous,
    /// Return immediately
    Asynchronous,
}

/// `AT+SQNSCFG`: socket parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// Socket connection ID (1..=6)
    pub conn_id: u8,
    /// PDP context
    pub cid: u8,
    /// 0 selects the modem default
    pub packet_size: u16,
    /// Inactivity timeout in seconds, 0 = none
    pub max_timeout: u16,
    /// Connection timeout in tenths of a second
    pub connection_timeout: u16,
    /// Data sending timeout in tenths of a second
    pub tx_timeout: u16,
}

impl SocketConfig {
    /// Defaults used by the echo client
    pub fn new(conn_id: u8) -> Self {
        Self {
            conn_id,
            cid: 1,
            packet_size: 0,
            max_timeout: 0,
            connection_timeout: 600,
            tx_timeout: 50,
        }
    }
}

impl AtCommand for SocketConfig {
    fn name(&self) -> &'static str {
        "+SQNSCFG"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.conn_id)
            .int(self.cid)
            .int(self.packet_size)
            .int(self.max_timeout)
            .int(self.connection_timeout)
            .int(self.tx_timeout);
    }
}

/// `AT+SQNSD`: dial a remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketDial {
    /// Socket connection ID (1..=6)
    pub conn_id: u8,
    /// TCP or UDP
    pub protocol: TransmissionProtocol,
    /// Server port
    pub remote_port: u16,
    /// Server address
    pub remote_ip: String,
    /// Hang-up behaviour
    pub closure: TcpClosure,
    /// Local port for UDP, 0 otherwise
    pub udp_local_port: u16,
    /// Online or command mode
    pub mode: ConnectionMode,
    /// Peer filtering
    pub accept_any_remote: AcceptAnyRemote,
    /// Synchronous or asynchronous dial
    pub setup: ConnectionSetup,
}

impl SocketDial {
    /// Synchronous command-mode TCP connection
    pub fn tcp(conn_id: u8, remote_ip: impl Into<String>, remote_port: u16) -> Self {
        Self {
            conn_id,
            protocol: TransmissionProtocol::Tcp,
            remote_port,
            remote_ip: remote_ip.into(),
            closure: TcpClosure::AfterRemote,
            udp_local_port: 0,
            mode: ConnectionMode::Command,
            accept_any_remote: AcceptAnyRemote::Disabled,
            setup: ConnectionSetup::Synchronous,
        }
    }
}

impl AtCommand for SocketDial {
    fn name(&self) -> &'static str {
        "+SQNSD"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        let protocol = match self.protocol {
            TransmissionProtocol::Tcp => 0,
            TransmissionProtocol::Udp => 1,
        };
        let closure = match self.closure {
            TcpClosure::AfterRemote => 0,
            TcpClosure::AfterEscape => 255,
        };
        let mode = match self.mode {
            ConnectionMode::Online => 0,
            ConnectionMode::Command => 1,
        };
        let accept = match self.accept_any_remote {
            AcceptAnyRemote::Disabled => 0,
            AcceptAnyRemote::AcceptsAny => 1,
            AcceptAnyRemote::ReceiveSendAny => 2,
        };
        let setup = match self.setup {
            ConnectionSetup::Synchronous => 0,
            ConnectionSetup::Asynchronous => 1,
        };
        args.int(self.conn_id)
            .int(protocol)
            .int(self.remote_port)
            .quoted(&self.remote_ip)
            .int(closure)
            .int(self.udp_local_port)
            .int(mode)
            .int(accept)
            .int(setup);
    }
}

/// `AT+SQNSSENDEXT`: send bytes in command mode; the data follows `>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketSendExt {
    /// Socket connection ID (1..=6)
    pub conn_id: u8,
    /// Payload length in bytes
    pub length: usize,
}

impl AtCommand for SocketSendExt {
    fn name(&self) -> &'static str {
        "+SQNSSENDEXT"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.conn_id).int(self.length);
    }

    fn completion(&self) -> &'static str {
        PAYLOAD_PROMPT
    }
}

/// `AT+SQNSRECV`: dump received data in command mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketReceive {
    /// Socket connection ID (1..=6)
    pub conn_id: u8,
    /// Most bytes to read
    pub max_bytes: usize,
}

impl AtCommand for SocketReceive {
    fn name(&self) -> &'static str {
        "+SQNSRECV"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.conn_id).int(self.max_bytes);
    }

    fn completion(&self) -> &'static str {
        "+SQNSRECV"
    }
}

/// `AT+SQNSH`: close a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketShutdown {
    /// Socket connection ID (1..=6)
    pub conn_id: u8,
}

impl AtCommand for SocketShutdown {
    fn name(&self) -> &'static str {
        "+SQNSH"
    }

    fn write_args(&self, args: &mut CommandArgs) {
        args.int(self.conn_id);
    }
}

/// `AT+SQNSS`: status of every socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketStatus;

impl AtCommand for SocketStatus {
    fn name(&self) -> &'static str {
        "+SQNSS"
    }
}
