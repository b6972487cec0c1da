//! Packet types and wire framing
//!
//! Four frame shapes travel through the handler. Every frame starts with a
//! one-byte tag so receivers can dispatch before parsing the body, and
//! radio metadata rides as a length-prefixed JSON segment, which is what
//! gateways speak natively.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌─────┬──────────────────────────────────────────────────────────────┐
//! │ Tag │  Body                                                        │
//! ├─────┼──────────────────────────────────────────────────────────────┤
//! │0x01 │ AppEUI(8) DevEUI(8) FCnt(4) MIC(4) MLen(2) Meta Payload      │ uplink
//! │0x02 │ AppEUI(8) DevEUI(8) Count(1) [MLen(2) Meta]* Payload         │ application
//! │0x03 │ DevAddr(4) FCnt(4) MIC(4) MLen(2) Meta Payload               │ downlink
//! │0x04 │ AppEUI(8) DevEUI(8) DevNonce(2) MLen(2) Meta                 │ join
//! └─────┴──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-byte integers are big-endian on the wire. Uplink and downlink
//! payloads are ciphertext; application payloads are plaintext.

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit application identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppEui([u8; 8]);

/// 64-bit device identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DevEui([u8; 8]);

/// 32-bit on-air device address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DevAddr([u8; 4]);

macro_rules! eui_impl {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Create from raw bytes
            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            /// Get the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "("))?;
                for b in &self.0 {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, ")")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in &self.0 {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    };
}

eui_impl!(AppEui, 8);
eui_impl!(DevEui, 8);
eui_impl!(DevAddr, 4);

const TAG_UPLINK: u8 = 0x01;
const TAG_APP: u8 = 0x02;
const TAG_DOWNLINK: u8 = 0x03;
const TAG_JOIN: u8 = 0x04;

/// Uplink frame as forwarded by the broker: encrypted payload plus the
/// radio metadata of the gateway that saw it
#[derive(Debug, Clone, PartialEq)]
pub struct UplinkPacket {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    /// Ciphertext under the application session key
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    pub fcnt: u32,
    pub mic: [u8; 4],
}

/// Application-side packet: plaintext payload and, on uplink deliveries,
/// one metadata entry per collected duplicate in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct AppPacket {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    pub payload: Vec<u8>,
    pub metadata: Vec<Metadata>,
}

/// Downlink frame handed to the broker for forwarding to the device
#[derive(Debug, Clone, PartialEq)]
pub struct DownlinkPacket {
    pub dev_addr: DevAddr,
    /// Ciphertext under the application session key
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    pub fcnt: u32,
    pub mic: [u8; 4],
}

/// Join request frame; decodes but is refused by the handler
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPacket {
    pub app_eui: AppEui,
    pub dev_eui: DevEui,
    pub dev_nonce: [u8; 2],
    pub metadata: Metadata,
}

/// Any frame the handler can decode
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Uplink(UplinkPacket),
    App(AppPacket),
    Downlink(DownlinkPacket),
    Join(JoinPacket),
}

impl Packet {
    /// Decode a tagged frame
    pub fn from_bytes(bytes: &[u8]) -> Result<Packet> {
        let mut r = Reader::new(bytes);
        match r.u8()? {
            TAG_UPLINK => Ok(Packet::Uplink(UplinkPacket::read(&mut r)?)),
            TAG_APP => Ok(Packet::App(AppPacket::read(&mut r)?)),
            TAG_DOWNLINK => Ok(Packet::Downlink(DownlinkPacket::read(&mut r)?)),
            TAG_JOIN => Ok(Packet::Join(JoinPacket::read(&mut r)?)),
            tag => Err(Error::Structural(format!("unknown frame tag 0x{tag:02x}"))),
        }
    }

    /// Human name of the frame type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Packet::Uplink(_) => "uplink",
            Packet::App(_) => "application",
            Packet::Downlink(_) => "downlink",
            Packet::Join(_) => "join",
        }
    }
}

impl UplinkPacket {
    /// Serialize to a tagged frame
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta = encode_metadata(&self.metadata)?;
        let mut bytes = Vec::with_capacity(27 + meta.len() + self.payload.len());
        bytes.push(TAG_UPLINK);
        bytes.extend_from_slice(self.app_eui.as_bytes());
        bytes.extend_from_slice(self.dev_eui.as_bytes());
        bytes.extend_from_slice(&self.fcnt.to_be_bytes());
        bytes.extend_from_slice(&self.mic);
        bytes.extend_from_slice(&(meta.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&meta);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let app_eui = AppEui::from_bytes(r.array()?);
        let dev_eui = DevEui::from_bytes(r.array()?);
        let fcnt = r.u32_be()?;
        let mic = r.array()?;
        let metadata = read_metadata(r)?;
        Ok(Self {
            app_eui,
            dev_eui,
            payload: r.rest().to_vec(),
            metadata,
            fcnt,
            mic,
        })
    }
}

impl AppPacket {
    /// Serialize to a tagged frame
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.metadata.len() > u8::MAX as usize {
            return Err(Error::Structural(format!(
                "too many metadata entries: {}",
                self.metadata.len()
            )));
        }
        let mut bytes = Vec::with_capacity(18 + self.payload.len());
        bytes.push(TAG_APP);
        bytes.extend_from_slice(self.app_eui.as_bytes());
        bytes.extend_from_slice(self.dev_eui.as_bytes());
        bytes.push(self.metadata.len() as u8);
        for m in &self.metadata {
            let meta = encode_metadata(m)?;
            bytes.extend_from_slice(&(meta.len() as u16).to_be_bytes());
            bytes.extend_from_slice(&meta);
        }
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let app_eui = AppEui::from_bytes(r.array()?);
        let dev_eui = DevEui::from_bytes(r.array()?);
        let count = r.u8()? as usize;
        let mut metadata = Vec::with_capacity(count);
        for _ in 0..count {
            metadata.push(read_metadata(r)?);
        }
        Ok(Self {
            app_eui,
            dev_eui,
            payload: r.rest().to_vec(),
            metadata,
        })
    }
}

impl DownlinkPacket {
    /// Serialize to a tagged frame
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta = encode_metadata(&self.metadata)?;
        let mut bytes = Vec::with_capacity(15 + meta.len() + self.payload.len());
        bytes.push(TAG_DOWNLINK);
        bytes.extend_from_slice(self.dev_addr.as_bytes());
        bytes.extend_from_slice(&self.fcnt.to_be_bytes());
        bytes.extend_from_slice(&self.mic);
        bytes.extend_from_slice(&(meta.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&meta);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let dev_addr = DevAddr::from_bytes(r.array()?);
        let fcnt = r.u32_be()?;
        let mic = r.array()?;
        let metadata = read_metadata(r)?;
        Ok(Self {
            dev_addr,
            payload: r.rest().to_vec(),
            metadata,
            fcnt,
            mic,
        })
    }
}

impl JoinPacket {
    /// Serialize to a tagged frame
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta = encode_metadata(&self.metadata)?;
        let mut bytes = Vec::with_capacity(21 + meta.len());
        bytes.push(TAG_JOIN);
        bytes.extend_from_slice(self.app_eui.as_bytes());
        bytes.extend_from_slice(self.dev_eui.as_bytes());
        bytes.extend_from_slice(&self.dev_nonce);
        bytes.extend_from_slice(&(meta.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&meta);
        Ok(bytes)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let app_eui = AppEui::from_bytes(r.array()?);
        let dev_eui = DevEui::from_bytes(r.array()?);
        let dev_nonce = r.array()?;
        let metadata = read_metadata(r)?;
        Ok(Self {
            app_eui,
            dev_eui,
            dev_nonce,
            metadata,
        })
    }
}

fn encode_metadata(metadata: &Metadata) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(metadata)
        .map_err(|e| Error::Structural(format!("metadata encode: {e}")))?;
    if bytes.len() > u16::MAX as usize {
        return Err(Error::Structural(format!(
            "metadata segment too large: {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn read_metadata(r: &mut Reader<'_>) -> Result<Metadata> {
    let len = r.u16_be()? as usize;
    let bytes = r.bytes(len)?;
    serde_json::from_slice(bytes).map_err(|e| Error::Structural(format!("metadata decode: {e}")))
}

/// Bounds-checked cursor over a frame body
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(Error::Structural(format!(
                "frame too short: need {} more bytes, have {}",
                n,
                self.buf.len() - self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}
