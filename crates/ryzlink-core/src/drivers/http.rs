//! HTTP client over the modem's `+SQNHTTP*` commands
//!
//! Every request configures the profile, issues the query (or the send
//! followed by the body after the `>` prompt), waits for `+SQNHTTPRING`
//! carrying the status, then reads the body with `AT+SQNHTTPRCV`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::protocol::commands::{
    HttpConfig, HttpQuery, HttpQueryMethod, HttpReceive, HttpSend, HttpSendMethod,
};
use crate::protocol::payload::{decode_json, parse_ring_status, strip_framing, HTTP_STATUS_OK};
use crate::protocol::{ModemError, TransactionEngine};

/// Event announcing the response to a query or send
pub const HTTP_RING: &str = "+SQNHTTPRING";

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Modem HTTP profile slot
    pub profile_id: u8,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: "httpbin.org".to_string(),
            port: 80,
            profile_id: 1,
        }
    }
}

/// Status and raw body of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// Status code from the ring
    pub status: u16,
    /// Body with the `<<<`/`OK` framing removed
    pub body: String,
}

impl HttpReply {
    /// Decode the body as JSON
    pub fn json(&self) -> Result<Value, ModemError> {
        decode_json(&self.body)
    }
}

/// Runs HTTP requests against one host
pub struct HttpDriver<'e> {
    engine: &'e mut TransactionEngine,
    settings: HttpSettings,
    timeout: Duration,
}

impl<'e> HttpDriver<'e> {
    /// Driver running on `engine`
    pub fn new(engine: &'e mut TransactionEngine, settings: HttpSettings) -> Self {
        let timeout = engine.default_timeout();
        Self {
            engine,
            settings,
            timeout,
        }
    }

    /// GET `path`, returning the decoded JSON body
    pub async fn get(&mut self, path: &str) -> Result<Value, ModemError> {
        self.query(HttpQueryMethod::Get, path).await?.json()
    }

    /// HEAD `path`; the reply carries no body so only the status is returned
    pub async fn head(&mut self, path: &str) -> Result<u16, ModemError> {
        self.configure().await?;
        self.ring_status(HttpQueryMethod::Head, path).await
    }

    /// DELETE `path`, returning the decoded JSON body
    pub async fn delete(&mut self, path: &str) -> Result<Value, ModemError> {
        self.query(HttpQueryMethod::Delete, path).await?.json()
    }

    /// POST `body` to `path`, returning the decoded JSON reply
    pub async fn post(&mut self, path: &str, body: &str) -> Result<Value, ModemError> {
        self.send(HttpSendMethod::Post, path, body).await?.json()
    }

    /// PUT `body` to `path`, returning the decoded JSON reply
    pub async fn put(&mut self, path: &str, body: &str) -> Result<Value, ModemError> {
        self.send(HttpSendMethod::Put, path, body).await?.json()
    }

    /// GET `/stream/{chunks}`; the body is a run of JSON documents and is
    /// returned undecoded
    pub async fn stream(&mut self, chunks: u32) -> Result<HttpReply, ModemError> {
        self.query(HttpQueryMethod::Get, &format!("/stream/{}", chunks))
            .await
    }

    /// Configure, query and read the body. A non-200 status is logged, not fatal.
    pub async fn query(
        &mut self,
        method: HttpQueryMethod,
        path: &str,
    ) -> Result<HttpReply, ModemError> {
        self.configure().await?;
        let status = self.ring_status(method, path).await?;
        let body = self.receive().await?;
        Ok(HttpReply { status, body })
    }

    /// Configure, send `body` after the prompt and read the reply.
    /// A non-200 status aborts with [`ModemError::HttpStatus`].
    pub async fn send(
        &mut self,
        method: HttpSendMethod,
        path: &str,
        body: &str,
    ) -> Result<HttpReply, ModemError> {
        self.configure().await?;

        let command = HttpSend {
            profile_id: self.settings.profile_id,
            method,
            resource: path.to_string(),
            data_len: body.len(),
        };
        self.engine.transact(&command, self.timeout).await?;
        let ring = self
            .engine
            .send_payload(body, HTTP_RING, self.timeout)
            .await?;

        let status = parse_ring_status(&ring)?;
        if status != HTTP_STATUS_OK {
            return Err(ModemError::HttpStatus(status));
        }

        let body = self.receive().await?;
        Ok(HttpReply { status, body })
    }

    async fn configure(&mut self) -> Result<(), ModemError> {
        let command = HttpConfig::plain(
            self.settings.profile_id,
            self.settings.host.as_str(),
            self.settings.port,
        );
        self.engine.transact(&command, self.timeout).await?;
        Ok(())
    }

    async fn ring_status(&mut self, method: HttpQueryMethod, path: &str) -> Result<u16, ModemError> {
        let command = HttpQuery {
            profile_id: self.settings.profile_id,
            method,
            resource: path.to_string(),
        };
        let ring = self.engine.transact(&command, self.timeout).await?;
        let status = parse_ring_status(&ring)?;
        if status != HTTP_STATUS_OK {
            warn!("HTTP error: {} for {:?} {}", status, method, path);
        }
        Ok(status)
    }

    async fn receive(&mut self) -> Result<String, ModemError> {
        let command = HttpReceive {
            profile_id: self.settings.profile_id,
        };
        let raw = self.engine.transact(&command, self.timeout).await?;
        let body = strip_framing(&raw)?;
        debug!("HttpDriver: received {} byte body", body.len());
        Ok(body.to_string())
    }
}
