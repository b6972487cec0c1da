//! Radio metadata and gateway selection
//!
//! Every uplink copy carries the radio conditions observed by the gateway
//! that forwarded it. The handler treats most fields as opaque baggage for
//! the application; only the duty cycle and the RSSI feed the choice of
//! which gateway carries the reply.
//!
//! Selection is a strategy: [`GatewayScorer`] picks a winner among the
//! metadata of all collected copies, and [`DutyRssiScorer`] is the default
//! rule (lowest set duty, then strongest RSSI, then earliest arrival).

use serde::{Deserialize, Serialize};

/// Radio metadata attached to a packet by the receiving gateway
///
/// All fields are optional; gateways report what they know. Field names
/// follow the gateway JSON vocabulary (`datr`, `codr`, `lsnr`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Concentrator channel the packet was received on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chan: Option<u32>,
    /// Coding rate, e.g. "4/5"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codr: Option<String>,
    /// Data rate, e.g. "SF7BW125"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datr: Option<String>,
    /// Remaining duty-cycle budget of the gateway, percent used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duty: Option<u32>,
    /// Center frequency in MHz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    /// Signal-to-noise ratio in dB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsnr: Option<f64>,
    /// Received signal strength in dBm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    /// Gateway internal timestamp of reception
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmst: Option<u32>,
}

/// Strategy for choosing which collected copy carries the reply
///
/// `best` receives the metadata of every copy in arrival order and returns
/// the index of the winner. Implementations must return a valid index for
/// any non-empty slice; ties are expected to resolve to the earliest
/// arrival.
pub trait GatewayScorer: Send + Sync {
    /// Index of the winning entry among `candidates` (non-empty)
    fn best(&self, candidates: &[Metadata]) -> usize;
}

/// Default scoring rule
///
/// A candidate beats the incumbent when:
/// 1. its duty cycle is set and strictly lower (an unset duty always
///    loses to a set one), or
/// 2. duties are equal (or both unset) and its RSSI is strictly greater
///    (-25 beats -120; an unset RSSI counts as weakest).
///
/// Anything else keeps the incumbent, so ties go to the earliest arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct DutyRssiScorer;

impl DutyRssiScorer {
    // Set duty sorts before unset, then lower first.
    fn duty_key(m: &Metadata) -> u64 {
        m.duty.map(|d| d as u64).unwrap_or(u64::MAX)
    }

    // Higher is better, unset weakest.
    fn rssi_key(m: &Metadata) -> i64 {
        m.rssi.map(|r| r as i64).unwrap_or(i64::MIN)
    }
}

impl GatewayScorer for DutyRssiScorer {
    fn best(&self, candidates: &[Metadata]) -> usize {
        let mut best = 0;
        for (i, m) in candidates.iter().enumerate().skip(1) {
            let (duty, rssi) = (Self::duty_key(m), Self::rssi_key(m));
            let (best_duty, best_rssi) = (
                Self::duty_key(&candidates[best]),
                Self::rssi_key(&candidates[best]),
            );
            if duty < best_duty || (duty == best_duty && rssi > best_rssi) {
                best = i;
            }
        }
        best
    }
}
