//! Protocol drivers
//!
//! Each driver borrows the session's [`TransactionEngine`] and runs a fixed
//! chain of transactions. The first step that does not complete aborts the
//! chain with the error naming that step.
//!
//! [`TransactionEngine`]: crate::protocol::TransactionEngine

pub mod http;
pub mod mqtt;
pub mod socket;
pub mod weather;

pub use http::{HttpDriver, HttpReply, HttpSettings};
pub use mqtt::{MqttDriver, MqttSettings};
pub use socket::{SocketDriver, SocketSettings};
pub use weather::{WeatherDriver, WeatherReport, WeatherSettings};
