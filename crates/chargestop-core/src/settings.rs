//! Persistent user settings
//!
//! Settings are stored as one small record:
//!
//! ```text
//! [magic u16 LE][version u8][payload len u8][postcard payload][crc16 LE]
//! ```
//!
//! The CRC covers every byte before it. Anything that does not validate is
//! reported as "no settings", which makes the controller fall back to (and
//! persist) the defaults.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::display::DisplayMode;
use crate::limits::{LimitKind, LimitTable};

pub const SETTINGS_MAGIC: u16 = 0xC5A1;
pub const SETTINGS_VERSION: u8 = 1;

/// Upper bound of an encoded record in bytes.
pub const RECORD_CAPACITY: usize = 32;

const HEADER_LEN: usize = 4;
const CRC_LEN: usize = 2;
const MAX_PAYLOAD_LEN: usize = RECORD_CAPACITY - HEADER_LEN - CRC_LEN;

const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_SDLC);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Limit values indexed by [`LimitKind::index`]
    pub limit_values: [u16; 4],
    pub selected: LimitKind,
    pub display_mode: DisplayMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit_values: LimitTable::default().values(),
            selected: LimitKind::default(),
            display_mode: DisplayMode::default(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    #[error("flash access failed: {0:?}")]
    Flash(NorFlashErrorKind),
    #[error("settings record of {0} bytes does not fit")]
    RecordTooLarge(usize),
    #[error("settings could not be encoded")]
    Encode,
    #[error("settings storage unavailable")]
    Unavailable,
}

/// Non-volatile home of [`Settings`].
pub trait SettingsStore {
    /// `Ok(None)` when nothing valid is stored.
    fn load(&mut self) -> Result<Option<Settings>, SettingsError>;

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Serialize `settings` into `buf`, returning the record length.
pub fn encode_record(
    settings: &Settings,
    buf: &mut [u8; RECORD_CAPACITY],
) -> Result<usize, SettingsError> {
    let payload = &mut buf[HEADER_LEN..HEADER_LEN + MAX_PAYLOAD_LEN];
    let payload_len = postcard::to_slice(settings, payload)
        .map_err(|_| SettingsError::Encode)?
        .len();

    buf[0..2].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
    buf[2] = SETTINGS_VERSION;
    buf[3] = payload_len as u8;

    let crc_at = HEADER_LEN + payload_len;
    let crc = CRC16.checksum(&buf[..crc_at]);
    buf[crc_at..crc_at + CRC_LEN].copy_from_slice(&crc.to_le_bytes());

    Ok(crc_at + CRC_LEN)
}

/// Parse a record. Returns `None` for erased, foreign or corrupt data.
pub fn decode_record(bytes: &[u8]) -> Option<Settings> {
    if bytes.len() < HEADER_LEN + CRC_LEN {
        return None;
    }

    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != SETTINGS_MAGIC {
        debug!("No settings record (magic 0x{:04x})", magic);
        return None;
    }
    if bytes[2] != SETTINGS_VERSION {
        warn!("Settings record version {} not supported", bytes[2]);
        return None;
    }

    let payload_len = bytes[3] as usize;
    let crc_at = HEADER_LEN + payload_len;
    if payload_len > MAX_PAYLOAD_LEN || bytes.len() < crc_at + CRC_LEN {
        warn!("Settings record length {} out of range", payload_len);
        return None;
    }

    let stored = u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]);
    let computed = CRC16.checksum(&bytes[..crc_at]);
    if stored != computed {
        warn!(
            "Settings record CRC mismatch: stored 0x{:04x}, computed 0x{:04x}",
            stored, computed
        );
        return None;
    }

    postcard::from_bytes(&bytes[HEADER_LEN..crc_at])
        .inspect_err(|e| warn!("Settings payload undecodable: {:?}", e))
        .ok()
}

/// Settings kept in one erase sector of NOR flash.
pub struct FlashSettingsStore<F> {
    flash: F,
    offset: u32,
}

impl<F: NorFlash> FlashSettingsStore<F> {
    /// `offset` must be aligned to `F::ERASE_SIZE`.
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    pub fn release(self) -> F {
        self.flash
    }
}

impl<F: NorFlash> SettingsStore for FlashSettingsStore<F> {
    fn load(&mut self) -> Result<Option<Settings>, SettingsError> {
        let mut buf = [0u8; RECORD_CAPACITY];
        self.flash
            .read(self.offset, &mut buf)
            .map_err(|e| SettingsError::Flash(e.kind()))?;
        Ok(decode_record(&buf))
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let mut buf = [0xFFu8; RECORD_CAPACITY];
        let len = encode_record(settings, &mut buf)?;
        let padded = len.next_multiple_of(F::WRITE_SIZE);
        if padded > RECORD_CAPACITY {
            return Err(SettingsError::RecordTooLarge(padded));
        }

        self.flash
            .erase(self.offset, self.offset + F::ERASE_SIZE as u32)
            .map_err(|e| SettingsError::Flash(e.kind()))?;
        self.flash
            .write(self.offset, &buf[..padded])
            .map_err(|e| SettingsError::Flash(e.kind()))?;

        debug!("Settings record written ({} bytes)", len);
        Ok(())
    }
}
