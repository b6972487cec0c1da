//! Session payload crypto
//!
//! Implements the two cryptographic operations the handler owns:
//!
//! - AES-128-CTR payload encryption under the application session key
//! - 4-byte AES-CMAC message integrity code under the network session key
//!
//! ## Block Construction
//!
//! The CTR keystream and the MIC pseudo-header share one 16-byte layout,
//! differing only in the leading byte:
//!
//! ```text
//! ┌──────┬─────────────┬─────┬────────────┬────────────┬──────┬──────┐
//! │ 0x01 │ 0x00 ×4     │ Dir │ DevAddr(4) │ FCnt(4 LE) │ 0x00 │  i   │  A_i (keystream)
//! │ 0x49 │ 0x00 ×4     │ Dir │ DevAddr(4) │ FCnt(4 LE) │ 0x00 │ len  │  B_0 (MIC)
//! └──────┴─────────────┴─────┴────────────┴────────────┴──────┴──────┘
//! ```
//!
//! `Dir` is 0 for uplink, 1 for downlink. Encryption and decryption are
//! the same XOR keystream, so applying the cipher twice restores the
//! plaintext. The MIC is the first 4 bytes of `CMAC(B_0 || ciphertext)`.

use crate::error::{Error, Result};
use crate::packet::DevAddr;
use crate::traits::DeviceEntry;
use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use cmac::{Cmac, Mac};

type AesCtr = ctr::Ctr128BE<Aes128>;
type AesCmac = Cmac<Aes128>;

/// Transfer direction, part of the keystream and MIC derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to network
    Up,
    /// Network to device
    Down,
}

impl Direction {
    fn as_byte(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
        }
    }
}

/// Per-device crypto context holding both session keys
#[derive(Clone)]
pub struct SessionCrypto {
    app_s_key: [u8; 16],
    nwk_s_key: [u8; 16],
    dev_addr: DevAddr,
}

impl SessionCrypto {
    /// Create a context from raw session keys
    pub fn new(app_s_key: [u8; 16], nwk_s_key: [u8; 16], dev_addr: DevAddr) -> Self {
        Self {
            app_s_key,
            nwk_s_key,
            dev_addr,
        }
    }

    /// Create a context from a stored device entry
    pub fn from_entry(entry: &DeviceEntry) -> Self {
        Self::new(entry.app_s_key, entry.nwk_s_key, entry.dev_addr)
    }

    /// Construct the 16-byte block shared by keystream and MIC derivation
    fn block(&self, prefix: u8, direction: Direction, fcnt: u32, last: u8) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[0] = prefix;
        block[5] = direction.as_byte();
        block[6..10].copy_from_slice(self.dev_addr.as_bytes());
        block[10..14].copy_from_slice(&fcnt.to_le_bytes());
        block[15] = last;
        block
    }

    /// Apply the payload keystream; encrypts plaintext and decrypts
    /// ciphertext alike
    pub fn cipher_payload(&self, direction: Direction, fcnt: u32, payload: &[u8]) -> Vec<u8> {
        // Counter starts at A_1; the CTR mode increments it per block.
        let iv = self.block(0x01, direction, fcnt, 1);
        let mut out = payload.to_vec();
        let mut cipher = AesCtr::new(&self.app_s_key.into(), &iv.into());
        cipher.apply_keystream(&mut out);
        out
    }

    /// Decrypt an uplink payload
    pub fn decrypt_uplink(&self, fcnt: u32, ciphertext: &[u8]) -> Vec<u8> {
        self.cipher_payload(Direction::Up, fcnt, ciphertext)
    }

    /// Encrypt a downlink payload
    pub fn encrypt_downlink(&self, fcnt: u32, plaintext: &[u8]) -> Vec<u8> {
        self.cipher_payload(Direction::Down, fcnt, plaintext)
    }

    /// Compute the 4-byte MIC over the ciphertext
    pub fn compute_mic(
        &self,
        direction: Direction,
        fcnt: u32,
        ciphertext: &[u8],
    ) -> Result<[u8; 4]> {
        if ciphertext.len() > u8::MAX as usize {
            return Err(Error::Structural(format!(
                "payload too large for MIC framing: {} bytes",
                ciphertext.len()
            )));
        }
        let b0 = self.block(0x49, direction, fcnt, ciphertext.len() as u8);
        let mut mac = AesCmac::new(&self.nwk_s_key.into());
        mac.update(&b0);
        mac.update(ciphertext);
        let full = mac.finalize().into_bytes();
        let mut mic = [0u8; 4];
        mic.copy_from_slice(&full[..4]);
        Ok(mic)
    }

    /// Verify a received MIC; accepts exactly the computed value
    pub fn verify_mic(
        &self,
        direction: Direction,
        fcnt: u32,
        ciphertext: &[u8],
        mic: &[u8; 4],
    ) -> Result<()> {
        let expected = self.compute_mic(direction, fcnt, ciphertext)?;
        if &expected != mic {
            return Err(Error::Structural("MIC mismatch".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCrypto")
            .field("dev_addr", &self.dev_addr)
            .field("app_s_key", &"[REDACTED]")
            .field("nwk_s_key", &"[REDACTED]")
            .finish()
    }
}
