//! In-memory collaborator implementations
//!
//! Hash-map-backed device store and downlink queue, good enough for
//! tests, demos and single-process deployments. Production setups plug a
//! persistent store behind the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::packet::{AppEui, AppPacket, DevAddr, DevEui};
use crate::traits::{DeviceEntry, DeviceStore, DownlinkQueue, Registration};

/// Device session store backed by a hash map
#[derive(Default)]
pub struct MemoryDeviceStore {
    entries: Mutex<HashMap<(AppEui, DevEui), DeviceEntry>>,
}

impl MemoryDeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing registration
    pub fn insert(&self, app_eui: AppEui, dev_eui: DevEui, entry: DeviceEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert((app_eui, dev_eui), entry);
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn lookup(&self, app_eui: AppEui, dev_eui: DevEui) -> Result<DeviceEntry> {
        self.entries
            .lock()
            .unwrap()
            .get(&(app_eui, dev_eui))
            .cloned()
            .ok_or_else(|| Error::Behavioural(format!("device {dev_eui} not registered")))
    }

    fn store_personalized(&self, registration: &Registration) -> Result<()> {
        // Personalized sessions address the device by the low half of its
        // EUI.
        let eui = registration.dev_eui.as_bytes();
        let dev_addr = DevAddr::from_bytes([eui[4], eui[5], eui[6], eui[7]]);
        let entry = DeviceEntry {
            recipient: registration.recipient.clone(),
            dev_addr,
            app_s_key: registration.app_s_key,
            nwk_s_key: registration.nwk_s_key,
        };
        self.entries
            .lock()
            .unwrap()
            .insert((registration.app_eui, registration.dev_eui), entry);
        Ok(())
    }
}

/// Downlink queue holding at most one pending packet per device
///
/// A second push for the same device replaces the pending packet; the
/// freshest application intent wins.
#[derive(Default)]
pub struct MemoryDownlinkQueue {
    slots: Mutex<HashMap<(AppEui, DevEui), AppPacket>>,
}

impl MemoryDownlinkQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }
}

impl DownlinkQueue for MemoryDownlinkQueue {
    fn push(&self, app_eui: AppEui, dev_eui: DevEui, packet: AppPacket) -> Result<()> {
        self.slots
            .lock()
            .unwrap()
            .insert((app_eui, dev_eui), packet);
        Ok(())
    }

    fn pull(&self, app_eui: AppEui, dev_eui: DevEui) -> Result<AppPacket> {
        self.slots
            .lock()
            .unwrap()
            .remove(&(app_eui, dev_eui))
            .ok_or_else(|| Error::Behavioural(format!("no downlink pending for {dev_eui}")))
    }
}
