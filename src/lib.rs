//! # LoRaWAN Handler
//!
//! The handler is the application-facing end of a LoRaWAN network stack.
//! It sits between a downstream broker, which routes frames to and from
//! gateways, and upstream applications, which own the end devices. The
//! handler terminates application-layer crypto, collates the duplicate
//! copies of each uplink that arrive through different gateways, picks the
//! gateway best placed to carry the reply, and pairs a queued downlink
//! with the device's reply window.
//!
//! ## Uplink Flow
//!
//! ```text
//! gateway ──► handle_up ──► decode ──► device lookup ──► decrypt
//!                                                           │
//!                         ┌─────────────────────────────────┘
//!                         ▼
//!                      Bundler ── collection window (per frame) ──┐
//!                         ▲                                       │
//! gateway ──► handle_up ──┘ (duplicate copies join the bundle)    │
//!                                                                 ▼
//!                  best-gateway selection ──► application delivery
//!                  ──► downlink drain ──► one verdict per caller
//! ```
//!
//! ## Downlink Flow
//!
//! ```text
//! application ──► handle_down ──► decode ──► queue ──► ack
//! ```
//!
//! The queued packet leaves the process later, encrypted and MIC'd, as
//! the reply carried by the best gateway of the next uplink bundle.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lorawan_handler::{Handler, HandlerConfig, MemoryDeviceStore, MemoryDownlinkQueue, Recipient};
//! use std::sync::Arc;
//!
//! let handler = Handler::new(
//!     Arc::new(MemoryDeviceStore::new()),
//!     Arc::new(MemoryDownlinkQueue::new()),
//!     Recipient::new(broker_endpoint),
//!     HandlerConfig::default(),
//! );
//!
//! // One call per gateway connection; duplicates of the same frame are
//! // collated and answered together.
//! handler.handle_up(&frame, &mut ack_nacker, adapter)?;
//! ```
//!
//! ## Modules
//!
//! - [`packet`]: frame shapes and wire codec
//! - [`metadata`]: radio metadata and gateway selection strategies
//! - [`crypto`]: session payload cipher and MIC
//! - [`bundler`]: windowed uplink collation (the core)
//! - [`handler`]: the public façade
//! - [`traits`]: collaborator contracts
//! - [`storage`]: in-memory collaborator implementations

pub mod bundler;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod packet;
pub mod storage;
pub mod traits;

// Re-export the working surface
pub use bundler::{Bundler, BundlerStats, Fingerprint, Submission, Verdict};
pub use config::HandlerConfig;
pub use crypto::{Direction, SessionCrypto};
pub use error::{Error, ErrorKind, Result};
pub use handler::Handler;
pub use metadata::{DutyRssiScorer, GatewayScorer, Metadata};
pub use packet::{
    AppEui, AppPacket, DevAddr, DevEui, DownlinkPacket, JoinPacket, Packet, UplinkPacket,
};
pub use storage::{MemoryDeviceStore, MemoryDownlinkQueue};
pub use traits::{
    AckNacker, BrokerRegistration, DeviceEntry, DeviceStore, DownlinkQueue, GatewayAdapter,
    Recipient, Registration, Subscriber,
};
