//! Collaborator contracts
//!
//! The handler core owns collation, selection and crypto; everything else
//! is reached through the traits below. Storage and queue implementations
//! are expected to be thread-safe; adapters resolve opaque recipient blobs
//! into live endpoints and carry packets to them.

use crate::error::Result;
use crate::packet::{AppEui, AppPacket, DevAddr, DevEui, DownlinkPacket};
use serde::{Deserialize, Serialize};

/// An adapter-specific endpoint, opaque to the handler
///
/// Device entries persist recipients in marshalled form; an adapter turns
/// the blob back into something it can send to via
/// [`GatewayAdapter::get_recipient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient(Vec<u8>);

impl Recipient {
    /// Wrap a marshalled endpoint
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Recipient(raw.into())
    }

    /// Get the marshalled form
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Personalized session state stored per device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Marshalled reply endpoint of the application side
    pub recipient: Vec<u8>,
    pub dev_addr: DevAddr,
    pub app_s_key: [u8; 16],
    pub nwk_s_key: [u8; 16],
}

/// Registration submitted by an application for one of its devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    pub nwk_s_key: [u8; 16],
    pub app_s_key: [u8; 16],
    /// Marshalled application endpoint
    pub recipient: Vec<u8>,
}

impl Registration {
    /// Reject registrations that cannot possibly be acted on
    pub fn validate(&self) -> Result<()> {
        if self.recipient.is_empty() {
            return Err(crate::error::Error::Structural(
                "registration carries no recipient".to_string(),
            ));
        }
        if self.app_s_key == [0; 16] && self.nwk_s_key == [0; 16] {
            return Err(crate::error::Error::Structural(
                "registration carries no session keys".to_string(),
            ));
        }
        Ok(())
    }
}

/// Broker-side registration derived during [`register`]
///
/// Same identity and network key as the application registration, but the
/// recipient is the handler's broker endpoint.
///
/// [`register`]: crate::handler::Handler::register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRegistration {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    pub nwk_s_key: [u8; 16],
    pub recipient: Vec<u8>,
}

/// Persistent device session store
pub trait DeviceStore: Send + Sync {
    /// Look up the session for a device; unknown devices are a
    /// behavioural miss
    fn lookup(&self, app_eui: AppEui, dev_eui: DevEui) -> Result<DeviceEntry>;

    /// Persist a personalized session
    fn store_personalized(&self, registration: &Registration) -> Result<()>;
}

/// Queue of application-supplied downlinks, one slot per device
pub trait DownlinkQueue: Send + Sync {
    /// Queue a downlink for the device
    fn push(&self, app_eui: AppEui, dev_eui: DevEui, packet: AppPacket) -> Result<()>;

    /// Take the pending downlink, if any; an empty slot is a behavioural
    /// miss
    fn pull(&self, app_eui: AppEui, dev_eui: DevEui) -> Result<AppPacket>;
}

/// Transport used to reach the application side
pub trait GatewayAdapter: Send + Sync {
    /// Resolve a stored recipient blob into a live endpoint
    fn get_recipient(&self, raw: &[u8]) -> Result<Recipient>;

    /// Send a packet to the given endpoints
    fn send(&self, packet: &AppPacket, recipients: &[Recipient]) -> Result<()>;
}

/// Per-call acknowledgement handle
///
/// `ack` is invoked at most once per call, either plain (`None`) or with
/// the paired downlink frame. A call that returns an error without acking
/// is understood as a nack by the transport.
pub trait AckNacker: Send {
    /// Acknowledge, optionally carrying the downlink reply
    fn ack(&mut self, reply: Option<DownlinkPacket>) -> Result<()>;

    /// Refuse explicitly
    fn nack(&mut self) -> Result<()>;
}

/// Receiver of derived broker-side registrations
pub trait Subscriber: Send {
    /// Forward one broker registration per successful device registration
    fn subscribe(&mut self, registration: &BrokerRegistration) -> Result<()>;
}
