//! Windowed collation of duplicate uplinks
//!
//! One frame sent by a device is heard by several gateways, so the
//! handler sees several copies of the same uplink. The bundler gathers
//! the copies that arrive within a short collection window, then acts on
//! the group exactly once:
//!
//! ```text
//!            copy 1    copy 2          copy 3 (late)
//!              │         │                │
//!              ▼         ▼                ▼
//!  window ├───────────────────┤········rejected
//!          open     append    close
//!                               │
//!                               ▼
//!              select best gateway → deliver to application
//!              → drain queued downlink → answer every caller
//! ```
//!
//! Copies are keyed by a fingerprint `(AppEUI, DevEUI, FCnt)`. The first
//! copy opens the window and arms its timer; every caller blocks on a
//! single-slot reply channel until the dispatch thread hands down a
//! [`Verdict`]. The bundle table mutex only guards table bookkeeping;
//! selection, crypto, queue and network I/O all run outside the lock so a
//! slow adapter cannot stall unrelated bundles.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::HandlerConfig;
use crate::crypto::{Direction, SessionCrypto};
use crate::error::{Error, ErrorKind, Result};
use crate::metadata::{GatewayScorer, Metadata};
use crate::packet::{AppEui, AppPacket, DevEui, DownlinkPacket};
use crate::traits::{DeviceEntry, DownlinkQueue, GatewayAdapter};

/// Identity of a bundle: all copies of one frame share it
pub type Fingerprint = (AppEui, DevEui, u32);

/// One decrypted uplink copy submitted for collation
#[derive(Debug, Clone)]
pub struct Submission {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    pub fcnt: u32,
    /// Plaintext payload; identical across copies of the same frame
    pub payload: Vec<u8>,
    /// Radio conditions seen by this copy's gateway
    pub metadata: Metadata,
}

impl Submission {
    /// The bundle this copy belongs to
    pub fn fingerprint(&self) -> Fingerprint {
        (self.app_eui, self.dev_eui, self.fcnt)
    }
}

/// Outcome delivered to each caller blocked on a bundle
#[derive(Debug)]
pub enum Verdict {
    /// Acknowledge the gateway, optionally carrying the paired downlink
    Ack(Option<DownlinkPacket>),
    /// The caller absorbs this failure; no acknowledgement is sent
    Refuse(Error),
}

/// Counters over the bundler's lifetime
#[derive(Debug, Clone, Copy, Default)]
pub struct BundlerStats {
    /// Copies accepted into a window
    pub uplinks_submitted: u64,
    /// Windows closed and dispatched
    pub bundles_dispatched: u64,
    /// Copies beyond the first in their bundle
    pub duplicates_collated: u64,
    /// Copies refused for arriving after their window closed
    pub late_rejections: u64,
    /// Dispatches that paired a queued downlink
    pub downlinks_paired: u64,
}

struct Waiter {
    metadata: Metadata,
    reply: SyncSender<Verdict>,
    adapter: Arc<dyn GatewayAdapter>,
}

struct Bundle {
    opened: Instant,
    entry: DeviceEntry,
    payload: Vec<u8>,
    // One waiter per collected copy, in arrival order.
    waiters: Vec<Waiter>,
}

// A closed fingerprint stays in the table as a tombstone so late copies
// are rejected instead of opening a second window for the same frame.
enum Slot {
    Open(Bundle),
    Closed,
}

// Outcome of the table transaction for one submission.
enum Admitted {
    Opened,
    Joined,
    Late(Waiter),
}

/// The collation engine
///
/// Cheap to clone; clones share the bundle table.
#[derive(Clone)]
pub struct Bundler {
    inner: Arc<Inner>,
}

struct Inner {
    table: Mutex<HashMap<Fingerprint, Slot>>,
    queue: Arc<dyn DownlinkQueue>,
    scorer: Box<dyn GatewayScorer>,
    config: HandlerConfig,
    stats: Mutex<BundlerStats>,
}

impl Bundler {
    /// Create a bundler draining `queue`, selecting gateways with `scorer`
    pub fn new(
        queue: Arc<dyn DownlinkQueue>,
        scorer: Box<dyn GatewayScorer>,
        config: HandlerConfig,
    ) -> Self {
        Bundler {
            inner: Arc::new(Inner {
                table: Mutex::new(HashMap::new()),
                queue,
                scorer,
                config,
                stats: Mutex::new(BundlerStats::default()),
            }),
        }
    }

    /// Submit one uplink copy for collation
    ///
    /// Returns the reply slot the caller must block on. The first copy of
    /// a fingerprint opens its collection window; copies inside the window
    /// join the bundle; copies after the window close receive an
    /// operational refusal immediately. Exactly one verdict is written per
    /// submission.
    pub fn submit(
        &self,
        submission: Submission,
        entry: DeviceEntry,
        adapter: Arc<dyn GatewayAdapter>,
    ) -> Receiver<Verdict> {
        let (reply, verdict) = sync_channel(1);
        let fingerprint = submission.fingerprint();
        let (app_eui, dev_eui, fcnt) = fingerprint;
        let waiter = Waiter {
            metadata: submission.metadata,
            reply,
            adapter,
        };

        // Only table bookkeeping happens under the lock.
        let admitted = {
            let mut table = self.inner.table.lock().unwrap();
            match table.entry(fingerprint) {
                Entry::Occupied(mut slot) => match slot.get_mut() {
                    Slot::Open(bundle) => {
                        bundle.waiters.push(waiter);
                        Admitted::Joined
                    }
                    Slot::Closed => Admitted::Late(waiter),
                },
                Entry::Vacant(slot) => {
                    slot.insert(Slot::Open(Bundle {
                        opened: Instant::now(),
                        entry,
                        payload: submission.payload,
                        waiters: vec![waiter],
                    }));
                    Admitted::Opened
                }
            }
        };

        match admitted {
            Admitted::Opened => {
                self.inner.stats.lock().unwrap().uplinks_submitted += 1;
                debug!(%app_eui, %dev_eui, fcnt, "collection window opened");
                let inner = Arc::clone(&self.inner);
                thread::spawn(move || inner.close_after_window(fingerprint));
            }
            Admitted::Joined => {
                let mut stats = self.inner.stats.lock().unwrap();
                stats.uplinks_submitted += 1;
                stats.duplicates_collated += 1;
            }
            Admitted::Late(waiter) => {
                warn!(
                    %app_eui,
                    %dev_eui,
                    fcnt,
                    "uplink copy arrived after its collection window closed"
                );
                let _ = waiter.reply.send(Verdict::Refuse(Error::Operational(
                    "uplink arrived after its collection window closed".to_string(),
                )));
                self.inner.stats.lock().unwrap().late_rejections += 1;
            }
        }

        verdict
    }

    /// Snapshot of the lifetime counters
    pub fn stats(&self) -> BundlerStats {
        *self.inner.stats.lock().unwrap()
    }
}

impl Inner {
    // Dedicated thread per bundle: wait out the window, close, dispatch,
    // then let the tombstone expire.
    fn close_after_window(&self, fingerprint: Fingerprint) {
        thread::sleep(self.config.buffer_delay);

        let bundle = {
            let mut table = self.table.lock().unwrap();
            match table.insert(fingerprint, Slot::Closed) {
                Some(Slot::Open(bundle)) => bundle,
                _ => return,
            }
        };
        debug!(
            copies = bundle.waiters.len(),
            waited_ms = bundle.opened.elapsed().as_millis() as u64,
            "collection window closed"
        );
        self.dispatch(fingerprint, bundle);

        thread::sleep(self.config.closed_retention);
        self.table.lock().unwrap().remove(&fingerprint);
    }

    // Runs outside the table lock.
    fn dispatch(&self, fingerprint: Fingerprint, bundle: Bundle) {
        let (app_eui, dev_eui, fcnt) = fingerprint;
        let metadata: Vec<Metadata> = bundle.waiters.iter().map(|w| w.metadata.clone()).collect();
        let best = self.scorer.best(&metadata).min(bundle.waiters.len() - 1);
        let delivery = AppPacket {
            app_eui,
            dev_eui,
            payload: bundle.payload.clone(),
            metadata,
        };

        let best_verdict = self.resolve_best(&bundle, best, fcnt, &delivery);

        {
            let mut stats = self.stats.lock().unwrap();
            stats.bundles_dispatched += 1;
            if matches!(best_verdict, Verdict::Ack(Some(_))) {
                stats.downlinks_paired += 1;
            }
        }

        // Every reply slot is written exactly once. The slots are buffered,
        // so a vanished caller cannot wedge the fan-out.
        let mut best_verdict = Some(best_verdict);
        for (i, waiter) in bundle.waiters.into_iter().enumerate() {
            let verdict = if i == best {
                best_verdict.take().unwrap_or(Verdict::Ack(None))
            } else {
                Verdict::Ack(None)
            };
            let _ = waiter.reply.send(verdict);
        }
    }

    // The winning caller's adapter carries the application delivery and,
    // if a downlink is queued, its caller takes the reply frame home.
    fn resolve_best(
        &self,
        bundle: &Bundle,
        best: usize,
        fcnt: u32,
        delivery: &AppPacket,
    ) -> Verdict {
        let adapter = &bundle.waiters[best].adapter;

        let recipient = match adapter.get_recipient(&bundle.entry.recipient) {
            Ok(recipient) => recipient,
            Err(e) => {
                warn!(error = %e, "failed to resolve the application recipient");
                return Verdict::Refuse(e);
            }
        };
        if let Err(e) = adapter.send(delivery, &[recipient]) {
            warn!(error = %e, "failed to deliver the uplink to the application");
            return Verdict::Refuse(e);
        }

        match self.queue.pull(delivery.app_eui, delivery.dev_eui) {
            Err(e) if e.kind() == ErrorKind::Behavioural => Verdict::Ack(None),
            Err(e) => {
                warn!(error = %e, "failed to drain the downlink queue");
                Verdict::Refuse(e)
            }
            Ok(down) => match self.pair_downlink(&bundle.entry, fcnt, &down) {
                Ok(packet) => Verdict::Ack(Some(packet)),
                Err(e) => Verdict::Refuse(e),
            },
        }
    }

    fn pair_downlink(
        &self,
        entry: &DeviceEntry,
        uplink_fcnt: u32,
        down: &AppPacket,
    ) -> Result<DownlinkPacket> {
        // The reply answers on the next frame counter.
        let fcnt = uplink_fcnt.wrapping_add(1);
        let crypto = SessionCrypto::from_entry(entry);
        let payload = crypto.encrypt_downlink(fcnt, &down.payload);
        let mic = crypto.compute_mic(Direction::Down, fcnt, &payload)?;
        Ok(DownlinkPacket {
            dev_addr: entry.dev_addr,
            payload,
            metadata: Metadata::default(),
            fcnt,
            mic,
        })
    }
}
