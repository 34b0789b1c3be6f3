//! Bus receivers: the glue between raw bus input and the parameter store.
//!
//! [`CanRx`] takes raw 29-bit frames from the CAN driver, [`SerialRx`]
//! takes timestamped bytes from the UART driver. Both deposit decoded
//! values into a [`ParamStore`] handed in per call (the store is owned by
//! the pipeline owner, not by the receivers) and surface diagnostics as
//! return values for the owner to route.

use embassy_time::Instant;
use heapless::Vec;

use crate::j1708::framer::{Framer, Push};
use crate::j1708::{pids, Message as J1708Message};
use crate::j1939::{dm1, pgn, signals, transport, Dtc, LampStatus, Message};
use crate::param::{ParamStore, Source};
use crate::storage::{DataManager, Storage};

/// Raw-frame callbacks a receiver can carry.
pub const MAX_TAPS: usize = 2;

/// DTC records reported per DM1.
pub const MAX_DM1_DTCS: usize = 32;

/// Fault entries reported per J1708 message.
pub const MAX_J1708_FAULTS: usize = 8;

/// Raw CAN frame callback: (29-bit id, payload).
pub type CanTap = fn(u32, &[u8]);

/// Raw J1708 message callback: (mid, frame bytes).
pub type SerialTap = fn(u8, &[u8]);

/// One decoded DM1, single-frame or reassembled.
#[derive(Debug, Clone)]
pub struct Dm1Report {
    pub source_address: u8,
    pub lamps: LampStatus,
    pub dtcs: Vec<Dtc, MAX_DM1_DTCS>,
}

/// Fault entries carried by a J1708 diagnostic parameter.
#[derive(Debug, Clone)]
pub struct FaultReport {
    pub mid: u8,
    pub faults: Vec<pids::Fault, MAX_J1708_FAULTS>,
}

impl FaultReport {
    /// Fold these faults into the persistent DTC history, so the history
    /// spans both buses.
    ///
    /// The MID stands in as the source address. Subsystem entries keep the
    /// high identifier bit, so SID n and PID n stay distinct triples.
    pub fn record_into<S: Storage>(&self, manager: &mut DataManager<S>, now_epoch: u32) {
        for fault in &self.faults {
            let id = if fault.subsystem {
                fault.id | 0x80
            } else {
                fault.id
            };
            manager.record_dtc(id as u32, fault.fmi, self.mid, now_epoch, true);
        }
    }
}

/// CAN-side receiver statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanRxStats {
    pub frames: u32,
    pub malformed: u32,
}

/// J1939 receive pipeline: id decode, transport reassembly, DM1, signals.
pub struct CanRx {
    transport: transport::Assembler,
    taps: Vec<CanTap, MAX_TAPS>,
    stats: CanRxStats,
    scratch: [u8; transport::MAX_TRANSFER],
}

impl Default for CanRx {
    fn default() -> Self {
        Self::new()
    }
}

impl CanRx {
    pub fn new() -> Self {
        Self {
            transport: transport::Assembler::new(),
            taps: Vec::new(),
            stats: CanRxStats::default(),
            scratch: [0xFF; transport::MAX_TRANSFER],
        }
    }

    pub fn stats(&self) -> CanRxStats {
        self.stats
    }

    pub fn transport_stats(&self) -> transport::TransportStats {
        self.transport.stats()
    }

    /// Register a raw-frame observer (scenario harness, logger).
    pub fn add_tap(&mut self, tap: CanTap) -> bool {
        self.taps.push(tap).is_ok()
    }

    /// Expire quiet transport sessions; call from the receiver's idle loop.
    pub fn poll(&mut self, now: Instant) {
        self.transport.poll(now);
    }

    /// Feed one received frame.
    ///
    /// Decoded signals go straight into `store`; a DM1 (direct or arriving
    /// via the transport protocol) additionally comes back as a report so
    /// the owner can feed lamps and fault history.
    pub fn handle_frame(
        &mut self,
        raw_id: u32,
        payload: &[u8],
        now: Instant,
        store: &mut ParamStore,
    ) -> Option<Dm1Report> {
        for tap in &self.taps {
            tap(raw_id, payload);
        }

        let Some(msg) = Message::decode(raw_id, payload, now) else {
            self.stats.malformed += 1;
            return None;
        };
        self.stats.frames += 1;

        match msg.pgn {
            pgn::TP_CM | pgn::TP_DT => {
                let sa = self.transport.handle(&msg)?;
                let (target, len) = self.transport.take(sa, &mut self.scratch)?;
                if target != pgn::DM1 {
                    trace!("tp: ignoring reassembled pgn {}", target);
                    return None;
                }
                Self::parse_dm1(&self.scratch[..len], sa, now, store)
            }
            pgn::DM1 => Self::parse_dm1(&msg.data, msg.source_address, now, store),
            _ => {
                for def in signals::defs_for_pgn(msg.pgn) {
                    if let Some(value) = signals::decode(def, &msg.data) {
                        store.update(def.param, value, Source::J1939, now);
                    }
                }
                None
            }
        }
    }

    fn parse_dm1(
        data: &[u8],
        source_address: u8,
        now: Instant,
        store: &mut ParamStore,
    ) -> Option<Dm1Report> {
        let mut dtcs: Vec<Dtc, MAX_DM1_DTCS> = Vec::new();
        let lamps = dm1::parse(data, source_address, &mut dtcs)?;
        store.update(
            crate::param::ParamId::ActiveDtcCount,
            dtcs.len() as f32,
            Source::J1939,
            now,
        );
        Some(Dm1Report {
            source_address,
            lamps,
            dtcs,
        })
    }
}

/// J1708-side receiver statistics, on top of the framer's own counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialRxStats {
    pub messages: u32,
}

/// J1708/J1587 receive pipeline: framing, parameter decode, faults.
pub struct SerialRx {
    framer: Framer,
    taps: Vec<SerialTap, MAX_TAPS>,
    stats: SerialRxStats,
}

impl Default for SerialRx {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialRx {
    pub fn new() -> Self {
        Self {
            framer: Framer::new(),
            taps: Vec::new(),
            stats: SerialRxStats::default(),
        }
    }

    pub fn stats(&self) -> SerialRxStats {
        self.stats
    }

    pub fn framer_stats(&self) -> crate::j1708::framer::FramerStats {
        self.framer.stats()
    }

    pub fn add_tap(&mut self, tap: SerialTap) -> bool {
        self.taps.push(tap).is_ok()
    }

    /// Feed one received byte with its arrival time.
    pub fn on_byte(
        &mut self,
        byte: u8,
        now: Instant,
        store: &mut ParamStore,
    ) -> Option<FaultReport> {
        let mut report = None;
        loop {
            match self.framer.push(byte, now) {
                Push::Consumed => break,
                Push::MessageReady | Push::Blocked => {
                    if let Some(msg) = self.framer.take() {
                        report = self.dispatch(&msg, store).or(report);
                    }
                }
            }
        }
        report
    }

    /// Close out a frame on bus silence; call from the receiver's idle
    /// loop when no byte is pending.
    pub fn poll(&mut self, now: Instant, store: &mut ParamStore) -> Option<FaultReport> {
        if self.framer.poll_gap(now) {
            let msg = self.framer.take()?;
            return self.dispatch(&msg, store);
        }
        None
    }

    /// Updates are stamped with the message's own reception time (its last
    /// byte), not the time the gap was noticed.
    fn dispatch(&mut self, msg: &J1708Message, store: &mut ParamStore) -> Option<FaultReport> {
        self.stats.messages += 1;
        for tap in &self.taps {
            tap(msg.mid, &msg.raw);
        }

        let mut faults: Vec<pids::Fault, MAX_J1708_FAULTS> = Vec::new();
        for param in &msg.params {
            match param.pid {
                pids::PID_DIAGNOSTICS_1 | pids::PID_DIAGNOSTICS_2 => {
                    let entries: Vec<pids::Fault, MAX_J1708_FAULTS> =
                        pids::parse_faults(&param.data);
                    for fault in entries {
                        if faults.push(fault).is_err() {
                            break;
                        }
                    }
                }
                _ => {
                    if let Some((id, value)) = pids::decode(param.pid, &param.data) {
                        store.update(id, value, Source::J1708, msg.timestamp);
                    }
                }
            }
        }

        (!faults.is_empty()).then_some(FaultReport {
            mid: msg.mid,
            faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::j1708::checksum;
    use crate::j1939::CanId;
    use crate::param::ParamId;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn signal_frame_updates_store() {
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        let id = CanId::build(pgn::ET1, 0x00, 6);
        let _ = rx.handle_frame(
            id,
            &[0x8C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
            Instant::from_millis(1),
            &mut store,
        );
        assert_eq!(store.get(ParamId::CoolantTemp), Some(100.0));
        assert_eq!(rx.stats().frames, 1);
    }

    #[test]
    fn sentinel_leaves_store_untouched() {
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        let id = CanId::build(pgn::ET1, 0x00, 6);
        let _ = rx.handle_frame(id, &[0xFE; 8], Instant::from_millis(1), &mut store);
        assert!(store.get(ParamId::CoolantTemp).is_none());
    }

    #[test]
    fn malformed_frame_is_counted() {
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        let _ = rx.handle_frame(0x18FEEE00, &[], Instant::from_millis(0), &mut store);
        assert_eq!(rx.stats().malformed, 1);
    }

    #[test]
    fn direct_dm1_reports() {
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        let id = CanId::build(pgn::DM1, 0x00, 6);
        let report = rx
            .handle_frame(
                id,
                &[0x00, 0x10, 0x6E, 0x00, 0x00, 0x01, 0xFF, 0xFF],
                Instant::from_millis(1),
                &mut store,
            )
            .unwrap();
        assert!(report.lamps.malfunction);
        assert_eq!(report.dtcs.len(), 1);
        assert_eq!(report.dtcs[0].spn, 110);
        assert_eq!(store.get(ParamId::ActiveDtcCount), Some(1.0));
    }

    #[test]
    fn reassembled_dm1_reports() {
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        let cm = CanId::build(pgn::TP_CM, 0x00, 7);
        let dt = CanId::build(pgn::TP_DT, 0x00, 7);

        // lamps + 3 DTCs = 14 bytes in two packets
        let mut body = [0u8; 14];
        body[0] = 0x04; // protect lamp
        for (i, spn) in [110u32, 190, 100].iter().enumerate() {
            let dtc = Dtc {
                spn: *spn,
                fmi: 1,
                occurrence_count: 1,
                conversion_method: false,
                source_address: 0,
            };
            body[2 + i * 4..6 + i * 4].copy_from_slice(&dtc.to_bytes());
        }

        assert!(rx
            .handle_frame(
                cm,
                &[0x20, 14, 0, 2, 0xFF, 0xCA, 0xFE, 0x00],
                Instant::from_millis(0),
                &mut store
            )
            .is_none());
        let mut dt1 = [0u8; 8];
        dt1[0] = 1;
        dt1[1..8].copy_from_slice(&body[0..7]);
        assert!(rx
            .handle_frame(dt, &dt1, Instant::from_millis(10), &mut store)
            .is_none());
        let mut dt2 = [0u8; 8];
        dt2[0] = 2;
        dt2[1..8].copy_from_slice(&body[7..14]);
        let report = rx
            .handle_frame(dt, &dt2, Instant::from_millis(20), &mut store)
            .unwrap();

        assert!(report.lamps.protect);
        assert_eq!(report.dtcs.len(), 3);
        assert_eq!(store.get(ParamId::ActiveDtcCount), Some(3.0));
    }

    static TAPPED: AtomicU32 = AtomicU32::new(0);

    fn tap(_id: u32, _data: &[u8]) {
        TAPPED.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn taps_see_every_frame() {
        TAPPED.store(0, Ordering::Relaxed);
        let mut rx = CanRx::new();
        let mut store = ParamStore::new();
        assert!(rx.add_tap(tap));
        let _ = rx.handle_frame(
            CanId::build(pgn::ET1, 0, 6),
            &[0x8C; 8],
            Instant::from_millis(0),
            &mut store,
        );
        // malformed frames still reach the tap
        let _ = rx.handle_frame(CanId::build(pgn::ET1, 0, 6), &[], Instant::from_millis(1), &mut store);
        assert_eq!(TAPPED.load(Ordering::Relaxed), 2);
    }

    fn j1708_frame(mid: u8, body: &[u8]) -> Vec<u8, 21> {
        let mut f: Vec<u8, 21> = Vec::new();
        f.push(mid).unwrap();
        f.extend_from_slice(body).unwrap();
        f.push(checksum::calculate(&f)).unwrap();
        f
    }

    #[test]
    fn serial_bytes_flow_into_store() {
        let mut rx = SerialRx::new();
        let mut store = ParamStore::new();
        let frame = j1708_frame(128, &[84, 120]);

        let mut t = 0u64;
        for &b in &frame {
            assert!(rx.on_byte(b, Instant::from_millis(t), &mut store).is_none());
            t += 1;
        }
        assert!(rx.poll(Instant::from_millis(t + 20), &mut store).is_none());

        let speed = store.get(ParamId::VehicleSpeed).unwrap();
        assert!((speed - 96.56).abs() < 0.1);
        assert_eq!(store.source(ParamId::VehicleSpeed), Some(Source::J1708));
        assert_eq!(rx.stats().messages, 1);
    }

    #[test]
    fn j1708_faults_are_reported() {
        let mut rx = SerialRx::new();
        let mut store = ParamStore::new();
        // PID 194 with explicit length 2: one fault entry {pid 100, fmi 3}
        let frame = j1708_frame(128, &[194, 2, 100, 0x03]);

        let mut t = 0u64;
        let mut report = None;
        for &b in &frame {
            report = rx.on_byte(b, Instant::from_millis(t), &mut store).or(report);
            t += 1;
        }
        report = rx.poll(Instant::from_millis(t + 20), &mut store).or(report);

        let report = report.unwrap();
        assert_eq!(report.mid, 128);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].id, 100);
        assert_eq!(report.faults[0].fmi, 3);
        assert!(!report.faults[0].subsystem);
    }
}
