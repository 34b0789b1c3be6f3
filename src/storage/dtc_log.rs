//! Fault history: a bounded log of diagnostic trouble codes.
//!
//! Keyed by the (spn, fmi, source address) triple. When the table is full
//! the entry seen longest ago makes room. Entries persist until explicitly
//! cleared.

use heapless::Vec;

use super::NamespaceHandle;

/// Stored entries cap.
pub const MAX_ENTRIES: usize = 20;

/// Packed on-flash size of one entry.
const ENTRY_BYTES: usize = 16;

/// Blob key inside the DTC-history namespace.
const LOG_KEY: &str = "log";

/// One remembered fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredDtc {
    pub spn: u32,
    pub fmi: u8,
    pub source_address: u8,
    /// Epoch seconds of the first report.
    pub first_seen: u32,
    /// Epoch seconds of the latest report.
    pub last_seen: u32,
    pub occurrence_count: u8,
    pub active: bool,
}

impl StoredDtc {
    fn pack(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.spn.to_le_bytes());
        out[4] = self.fmi;
        out[5] = self.source_address;
        out[6] = self.occurrence_count;
        out[7] = self.active as u8;
        out[8..12].copy_from_slice(&self.first_seen.to_le_bytes());
        out[12..16].copy_from_slice(&self.last_seen.to_le_bytes());
    }

    fn unpack(bytes: &[u8]) -> Self {
        Self {
            spn: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fmi: bytes[4],
            source_address: bytes[5],
            occurrence_count: bytes[6],
            active: bytes[7] != 0,
            first_seen: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            last_seen: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }
}

/// The in-memory fault table.
#[derive(Debug, Default)]
pub struct DtcLog {
    entries: Vec<StoredDtc, MAX_ENTRIES>,
}

impl DtcLog {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredDtc> {
        self.entries.iter()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    /// Record a fault report.
    ///
    /// A known (spn, fmi, sa) triple refreshes `last_seen` and bumps the
    /// occurrence count; a new one appends, evicting the stalest entry if
    /// the table is full.
    pub fn store(&mut self, spn: u32, fmi: u8, source_address: u8, now_epoch: u32, active: bool) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.spn == spn && e.fmi == fmi && e.source_address == source_address)
        {
            entry.last_seen = now_epoch;
            entry.occurrence_count = entry.occurrence_count.saturating_add(1);
            entry.active = active;
            return;
        }

        let entry = StoredDtc {
            spn,
            fmi,
            source_address,
            first_seen: now_epoch,
            last_seen: now_epoch,
            occurrence_count: 1,
            active,
        };

        if self.entries.push(entry).is_err() {
            if let Some(stalest) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(i, _)| i)
            {
                self.entries[stalest] = entry;
            }
        }
    }

    /// Mark every entry inactive (the bus reports no active faults).
    pub fn clear_active(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.active = false;
        }
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Serialize as an 8-bit count followed by packed entries.
    pub fn save<H: NamespaceHandle>(&self, h: &mut H) -> Result<(), H::Error> {
        let mut blob = [0u8; 1 + MAX_ENTRIES * ENTRY_BYTES];
        blob[0] = self.entries.len() as u8;
        for (i, entry) in self.entries.iter().enumerate() {
            entry.pack(&mut blob[1 + i * ENTRY_BYTES..1 + (i + 1) * ENTRY_BYTES]);
        }
        h.set_blob(LOG_KEY, &blob[..1 + self.entries.len() * ENTRY_BYTES])?;
        h.commit()
    }

    pub fn load<H: NamespaceHandle>(&mut self, h: &mut H) -> Result<(), H::Error> {
        self.entries.clear();
        let mut blob = [0u8; 1 + MAX_ENTRIES * ENTRY_BYTES];
        let Some(len) = h.get_blob(LOG_KEY, &mut blob)? else {
            return Ok(());
        };
        if len == 0 {
            return Ok(());
        }
        let count = (blob[0] as usize).min(MAX_ENTRIES);
        for i in 0..count {
            let start = 1 + i * ENTRY_BYTES;
            if start + ENTRY_BYTES > len {
                break;
            }
            let _ = self
                .entries
                .push(StoredDtc::unpack(&blob[start..start + ENTRY_BYTES]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemStorage, Namespace, Storage};

    #[test]
    fn repeat_fault_updates_in_place() {
        let mut log = DtcLog::new();
        log.store(110, 0, 0x00, 100, true);
        log.store(110, 0, 0x00, 200, true);
        assert_eq!(log.len(), 1);
        let entry = log.iter().next().unwrap();
        assert_eq!(entry.first_seen, 100);
        assert_eq!(entry.last_seen, 200);
        assert_eq!(entry.occurrence_count, 2);
    }

    #[test]
    fn distinct_triples_get_their_own_entries() {
        let mut log = DtcLog::new();
        log.store(110, 0, 0x00, 100, true);
        log.store(110, 1, 0x00, 100, true);
        log.store(110, 0, 0x21, 100, true);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn full_table_evicts_stalest() {
        let mut log = DtcLog::new();
        for i in 0..MAX_ENTRIES as u32 {
            log.store(1000 + i, 3, 0x00, 100 + i, true);
        }
        assert_eq!(log.len(), MAX_ENTRIES);

        // entry with last_seen == 100 (spn 1000) is the stalest
        log.store(9999, 5, 0x00, 500, true);
        assert_eq!(log.len(), MAX_ENTRIES);
        assert!(log.iter().all(|e| e.spn != 1000));
        assert!(log.iter().any(|e| e.spn == 9999));
    }

    #[test]
    fn clear_active_keeps_history() {
        let mut log = DtcLog::new();
        log.store(110, 0, 0x00, 100, true);
        log.store(190, 3, 0x00, 100, true);
        assert_eq!(log.active_count(), 2);
        log.clear_active();
        assert_eq!(log.active_count(), 0);
        assert_eq!(log.len(), 2);
        log.clear_all();
        assert!(log.is_empty());
    }

    #[test]
    fn log_round_trips_through_storage() {
        let mut storage = MemStorage::new();
        let mut log = DtcLog::new();
        log.store(110, 0, 0x00, 100, true);
        log.store(520_192, 12, 0x03, 150, false);
        log.save(&mut storage.open(Namespace::DtcHistory).unwrap())
            .unwrap();

        let mut loaded = DtcLog::new();
        loaded
            .load(&mut storage.open(Namespace::DtcHistory).unwrap())
            .unwrap();
        assert_eq!(loaded.len(), 2);
        let entry = loaded.iter().find(|e| e.spn == 520_192).unwrap();
        assert_eq!(entry.fmi, 12);
        assert_eq!(entry.source_address, 0x03);
        assert_eq!(entry.last_seen, 150);
        assert!(!entry.active);
    }

    #[test]
    fn empty_log_loads_empty() {
        let mut storage = MemStorage::new();
        let mut log = DtcLog::new();
        log.load(&mut storage.open(Namespace::DtcHistory).unwrap())
            .unwrap();
        assert!(log.is_empty());
    }
}
