//! Handler façade
//!
//! The handler sits between the broker below and applications above. It
//! exposes the three operations of the component: [`register`] a device
//! session, [`handle_up`] an uplink frame (decode, look up the session,
//! decrypt, collate with its duplicates, answer the gateway), and
//! [`handle_down`] an application packet (queue it for the device's next
//! reply window).
//!
//! [`register`]: Handler::register
//! [`handle_up`]: Handler::handle_up
//! [`handle_down`]: Handler::handle_down

use std::sync::Arc;
use tracing::debug;

use crate::bundler::{Bundler, BundlerStats, Submission, Verdict};
use crate::config::HandlerConfig;
use crate::crypto::SessionCrypto;
use crate::error::{Error, Result};
use crate::metadata::{DutyRssiScorer, GatewayScorer};
use crate::packet::Packet;
use crate::traits::{
    AckNacker, BrokerRegistration, DeviceStore, DownlinkQueue, GatewayAdapter, Recipient,
    Registration, Subscriber,
};

/// The handler component
///
/// Thread-safe; one instance serves every concurrent gateway connection.
pub struct Handler {
    devices: Arc<dyn DeviceStore>,
    queue: Arc<dyn DownlinkQueue>,
    bundler: Bundler,
    broker: Recipient,
}

impl Handler {
    /// Create a handler with the default gateway selection rule
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        queue: Arc<dyn DownlinkQueue>,
        broker: Recipient,
        config: HandlerConfig,
    ) -> Self {
        Self::with_scorer(devices, queue, broker, config, Box::new(DutyRssiScorer))
    }

    /// Create a handler with a custom gateway selection rule
    pub fn with_scorer(
        devices: Arc<dyn DeviceStore>,
        queue: Arc<dyn DownlinkQueue>,
        broker: Recipient,
        config: HandlerConfig,
        scorer: Box<dyn GatewayScorer>,
    ) -> Self {
        let bundler = Bundler::new(Arc::clone(&queue), scorer, config);
        Self {
            devices,
            queue,
            bundler,
            broker,
        }
    }

    /// Register a personalized device session
    ///
    /// Persists the session and forwards a broker-side registration (same
    /// identity and network key, the broker as recipient) to the
    /// subscriber. The ack-nacker is part of the transport calling
    /// convention; registration outcome travels in the return value.
    pub fn register(
        &self,
        registration: &Registration,
        _ack_nacker: &mut dyn AckNacker,
        subscriber: &mut dyn Subscriber,
    ) -> Result<()> {
        registration.validate()?;
        debug!(
            app_eui = %registration.app_eui,
            dev_eui = %registration.dev_eui,
            "registering personalized device"
        );
        self.devices.store_personalized(registration)?;

        let derived = BrokerRegistration {
            app_eui: registration.app_eui,
            dev_eui: registration.dev_eui,
            nwk_s_key: registration.nwk_s_key,
            recipient: self.broker.as_bytes().to_vec(),
        };
        subscriber.subscribe(&derived)?;
        Ok(())
    }

    /// Handle an uplink frame forwarded by a gateway
    ///
    /// Blocks the caller until its bundle's collection window closes and
    /// the verdict arrives: a plain acknowledgement, an acknowledgement
    /// carrying the paired downlink frame, or an error (in which case no
    /// acknowledgement is issued).
    pub fn handle_up(
        &self,
        data: &[u8],
        ack_nacker: &mut dyn AckNacker,
        adapter: Arc<dyn GatewayAdapter>,
    ) -> Result<()> {
        let packet = match Packet::from_bytes(data)? {
            Packet::Uplink(packet) => packet,
            other => {
                return Err(Error::Implementation(format!(
                    "expected an uplink frame, got {}",
                    other.type_name()
                )))
            }
        };
        debug!(
            app_eui = %packet.app_eui,
            dev_eui = %packet.dev_eui,
            fcnt = packet.fcnt,
            "uplink received"
        );

        let entry = self.devices.lookup(packet.app_eui, packet.dev_eui)?;
        let payload = SessionCrypto::from_entry(&entry).decrypt_uplink(packet.fcnt, &packet.payload);

        let verdict = self.bundler.submit(
            Submission {
                app_eui: packet.app_eui,
                dev_eui: packet.dev_eui,
                fcnt: packet.fcnt,
                payload,
                metadata: packet.metadata,
            },
            entry,
            adapter,
        );

        match verdict.recv() {
            Ok(Verdict::Ack(reply)) => {
                ack_nacker.ack(reply)?;
                Ok(())
            }
            Ok(Verdict::Refuse(err)) => Err(err),
            Err(_) => Err(Error::Operational(
                "bundle dispatched without a verdict".to_string(),
            )),
        }
    }

    /// Handle a downlink packet submitted by an application
    ///
    /// Queues the packet for delivery in the device's next reply window
    /// and acknowledges the application. The adapter is part of the
    /// transport calling convention; this path never sends.
    pub fn handle_down(
        &self,
        data: &[u8],
        ack_nacker: &mut dyn AckNacker,
        _adapter: Arc<dyn GatewayAdapter>,
    ) -> Result<()> {
        let packet = match Packet::from_bytes(data)? {
            Packet::App(packet) => packet,
            other => {
                return Err(Error::Implementation(format!(
                    "expected an application packet, got {}",
                    other.type_name()
                )))
            }
        };
        debug!(
            app_eui = %packet.app_eui,
            dev_eui = %packet.dev_eui,
            "downlink queued by application"
        );

        let (app_eui, dev_eui) = (packet.app_eui, packet.dev_eui);
        self.queue.push(app_eui, dev_eui, packet)?;
        ack_nacker.ack(None)?;
        Ok(())
    }

    /// Snapshot of the collation counters
    pub fn stats(&self) -> BundlerStats {
        self.bundler.stats()
    }
}
