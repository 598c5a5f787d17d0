//! Infrastructure layer
//!
//! Host connectivity, the readiness gate and per-language transports.

pub mod client;
pub mod gate;
pub mod host;
pub mod protocol;
pub mod socket;

pub use client::{ClientLoader, LanguageClient};
pub use gate::ReadinessGate;
pub use host::{HostApi, HostEvent, RpcHost, StaticHost};
pub use socket::{LspSocket, SocketFactory, SocketState, WebSocketFactory};
