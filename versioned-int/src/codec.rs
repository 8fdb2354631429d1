//! Binary layout of a store for host storage.
//!
//! ```text
//! [u32 total_len][u32 count][count x (i64 value, i64 time)]
//! ```
//!
//! Everything is little-endian and `total_len` includes the header. Only live entries are
//! written, so decoded stores are right-sized.
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::{
    config::StoreConfig,
    error::{Result, VersionedIntError},
    history::{byte_size_for, HistoryEntry, HistoryStore, ENTRY_SIZE, HEADER_SIZE},
    timestamp::Timestamp,
};

pub fn encode(store: &HistoryStore) -> Result<Vec<u8>> {
    let count = store.len();
    let total = byte_size_for(count).unwrap_or(usize::MAX);
    let too_large = || VersionedIntError::CapacityExceeded {
        requested: total,
        max: u32::MAX as usize,
    };
    let total_len = u32::try_from(total).map_err(|_| too_large())?;
    let count_field = u32::try_from(count).map_err(|_| too_large())?;

    let mut buf = vec![0u8; total];
    LittleEndian::write_u32(&mut buf[0..4], total_len);
    LittleEndian::write_u32(&mut buf[4..8], count_field);
    for (entry, slot) in store.entries().iter().zip(buf[HEADER_SIZE..].chunks_exact_mut(ENTRY_SIZE)) {
        LittleEndian::write_i64(&mut slot[0..8], entry.value);
        LittleEndian::write_i64(&mut slot[8..16], entry.time.0);
    }
    Ok(buf)
}

/// Rebuilds a store, checking the header against the buffer and the time ordering.
pub fn decode(bytes: &[u8], config: StoreConfig) -> Result<HistoryStore> {
    if bytes.len() < HEADER_SIZE {
        return Err(VersionedIntError::Decode(format!(
            "buffer of {} bytes is shorter than the {HEADER_SIZE}-byte header",
            bytes.len()
        )));
    }
    let total_len = LittleEndian::read_u32(&bytes[0..4]) as usize;
    let count = LittleEndian::read_u32(&bytes[4..8]) as usize;
    if total_len != bytes.len() {
        return Err(VersionedIntError::Decode(format!(
            "header declares {total_len} bytes but the buffer holds {}",
            bytes.len()
        )));
    }
    if byte_size_for(count) != Some(total_len) {
        return Err(VersionedIntError::Decode(format!(
            "{count} entries do not fit in {total_len} bytes"
        )));
    }
    if total_len > config.max_bytes {
        return Err(VersionedIntError::CapacityExceeded {
            requested: total_len,
            max: config.max_bytes,
        });
    }

    let mut entries = Vec::with_capacity(count);
    for slot in bytes[HEADER_SIZE..].chunks_exact(ENTRY_SIZE) {
        let entry = HistoryEntry::new(
            LittleEndian::read_i64(&slot[0..8]),
            Timestamp(LittleEndian::read_i64(&slot[8..16])),
        );
        if let Some(prev) = entries.last().map(|e: &HistoryEntry| e.time) {
            if entry.time < prev {
                return Err(VersionedIntError::Decode(format!(
                    "entry {} at {} precedes {prev}",
                    entries.len(),
                    entry.time
                )));
            }
        }
        entries.push(entry);
    }
    debug!(count, bytes = total_len, "Decoded history");
    Ok(HistoryStore::from_sorted(config, entries))
}
