//! # ryzlink Core Library
//!
//! Drives an LTE modem (Renesas RYZ014 / Sequans Monarch) over its serial AT
//! command interface.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A serial (or TCP-bridged) transport with line framing
//! - A receive collector and a transaction engine pairing each command with
//!   its completion marker while filtering unsolicited notifications
//! - Typed AT command records for the HTTP, MQTT and socket command sets
//! - Drivers chaining those commands into HTTP requests, weather lookups,
//!   MQTT publish/subscribe and a TCP echo client
//!
//! ## Example
//!
//! ```rust,ignore
//! use ryzlink_core::prelude::*;
//!
//! let transport = TransportConfig::new("/dev/ttyACM0", false);
//! let session = Session::open(&transport, EngineSettings::default()).await?;
//!
//! let body = session
//!     .run(|mut engine| async move {
//!         HttpDriver::new(&mut engine, HttpSettings::default())
//!             .get("/get")
//!             .await
//!     })
//!     .await?;
//! println!("{}", body);
//! ```

pub mod config;
pub mod drivers;
pub mod protocol;
pub mod session;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, LinkConfig};
    pub use crate::drivers::{
        HttpDriver, HttpReply, HttpSettings, MqttDriver, MqttSettings, SocketDriver,
        SocketSettings, WeatherDriver, WeatherReport, WeatherSettings,
    };
    pub use crate::protocol::{
        AtCommand, EngineSettings, ModemError, Outcome, TransactionEngine, TransportConfig,
    };
    pub use crate::session::{Session, Supervisor};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
