use log::trace;

use crate::interconnect::{BusPort, BusReqType, CoherenceComponent, CoherenceState, StateTrees};

// raw encodings kept in the state trees
pub const INVALID: u64 = 0;
pub const MODIFIED: u64 = 1;
pub const SHARED: u64 = 2;

#[derive(Clone, Copy, Debug)]
struct Miss {
    addr: u64,
    write: bool,
}

/// Snooping MSI caches of all processors, keeping their line states in a
/// `StateTrees` the interconnect reads for its directory lookups.
pub struct SnoopingCoherence {
    states: StateTrees,
    waiting: Vec<Option<Miss>>,
    hits: Vec<u64>,
    misses: Vec<u64>,
    cache_transfers: Vec<u64>,
}

impl SnoopingCoherence {
    pub fn new(states: StateTrees, num_procs: usize) -> Self {
        SnoopingCoherence {
            states,
            waiting: vec![None; num_procs],
            hits: vec![0; num_procs],
            misses: vec![0; num_procs],
            cache_transfers: vec![0; num_procs],
        }
    }

    /// A processor accesses `addr`. Returns the bus request to issue on a miss.
    pub fn access(&mut self, proc: usize, addr: u64, write: bool) -> Option<BusReqType> {
        match (self.states.state(proc, addr), write) {
            (CoherenceState::Modified, _) | (CoherenceState::Shared, false) => {
                self.hits[proc] += 1;
                None
            }
            _ => {
                self.misses[proc] += 1;
                self.waiting[proc] = Some(Miss { addr, write });
                Some(if write { BusReqType::ReadExclusive } else { BusReqType::ReadShared })
            }
        }
    }

    pub fn is_waiting(&self, proc: usize) -> bool {
        self.waiting[proc].is_some()
    }

    pub fn state(&self, proc: usize, addr: u64) -> CoherenceState {
        self.states.state(proc, addr)
    }

    pub fn hits(&self, proc: usize) -> u64 { self.hits[proc] }
    pub fn misses(&self, proc: usize) -> u64 { self.misses[proc] }
    pub fn cache_transfers(&self, proc: usize) -> u64 { self.cache_transfers[proc] }

    // another processor's read is on the bus
    fn snoop(&mut self, kind: BusReqType, addr: u64, proc: usize, port: &mut BusPort) {
        match (kind, self.states.state(proc, addr)) {
            (BusReqType::ReadShared, CoherenceState::Modified) => {
                port.bus_req(BusReqType::Shared, addr, proc);
                port.bus_req(BusReqType::Data, addr, proc);
                self.states.set(proc, addr, SHARED);
            }
            (BusReqType::ReadShared, CoherenceState::Shared) => {
                port.bus_req(BusReqType::Shared, addr, proc);
            }
            (BusReqType::ReadExclusive, CoherenceState::Modified) => {
                port.bus_req(BusReqType::Data, addr, proc);
                self.states.set(proc, addr, INVALID);
            }
            (BusReqType::ReadExclusive, CoherenceState::Shared) => {
                self.states.set(proc, addr, INVALID);
            }
            _ => (),
        }
    }

    // our own miss is answered
    fn fill(&mut self, addr: u64, proc: usize, port: &BusPort) {
        let Some(miss) = self.waiting[proc].filter(|m| m.addr == addr) else { return };
        if matches!(port.cache_transfer(addr, proc), Ok(true)) {
            self.cache_transfers[proc] += 1;
        }
        self.states.set(proc, addr, if miss.write { MODIFIED } else { SHARED });
        self.waiting[proc] = None;
    }
}

impl CoherenceComponent for SnoopingCoherence {
    fn bus_req(&mut self, kind: BusReqType, addr: u64, proc: usize, port: &mut BusPort) {
        trace!("coherence: {} {:#x} for {}", kind, addr, proc);
        match kind {
            BusReqType::ReadShared | BusReqType::ReadExclusive => self.snoop(kind, addr, proc, port),
            BusReqType::Data | BusReqType::Shared => self.fill(addr, proc, port),
            BusReqType::None | BusReqType::Memory => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_and_misses() {
        let trees = StateTrees::new(2);
        let mut coh = SnoopingCoherence::new(trees.clone(), 2);
        assert_eq!(coh.access(0, 0x40, false), Some(BusReqType::ReadShared));
        assert!(coh.is_waiting(0));
        trees.set(1, 0x40, SHARED);
        assert_eq!(coh.access(1, 0x40, false), None);
        assert_eq!(coh.access(1, 0x40, true), Some(BusReqType::ReadExclusive));
        assert_eq!(coh.hits(1), 1);
        assert_eq!(coh.misses(1), 1);
    }

    #[test]
    fn modified_holder_supplies_data_on_shared_read() {
        let trees = StateTrees::new(2);
        trees.set(1, 0x80, MODIFIED);
        let mut coh = SnoopingCoherence::new(trees.clone(), 2);
        let mut port = BusPort::detached();
        coh.bus_req(BusReqType::ReadShared, 0x80, 1, &mut port);
        assert_eq!(
            port.submissions(),
            &[(BusReqType::Shared, 0x80, 1), (BusReqType::Data, 0x80, 1)]
        );
        assert_eq!(trees.state(1, 0x80), CoherenceState::Shared);
    }

    #[test]
    fn exclusive_read_invalidates_sharers() {
        let trees = StateTrees::new(3);
        trees.set(1, 0x80, SHARED);
        trees.set(2, 0x80, MODIFIED);
        let mut coh = SnoopingCoherence::new(trees.clone(), 3);
        let mut port = BusPort::detached();
        coh.bus_req(BusReqType::ReadExclusive, 0x80, 1, &mut port);
        coh.bus_req(BusReqType::ReadExclusive, 0x80, 2, &mut port);
        assert_eq!(port.submissions(), &[(BusReqType::Data, 0x80, 2)]);
        assert_eq!(trees.state(1, 0x80), CoherenceState::Invalid);
        assert_eq!(trees.state(2, 0x80), CoherenceState::Invalid);
    }

    #[test]
    fn fill_completes_matching_miss() {
        let trees = StateTrees::new(1);
        let mut coh = SnoopingCoherence::new(trees.clone(), 1);
        coh.access(0, 0xc0, true);
        let mut port = BusPort::detached();
        coh.bus_req(BusReqType::Data, 0x100, 0, &mut port);
        assert!(coh.is_waiting(0));
        coh.bus_req(BusReqType::Data, 0xc0, 0, &mut port);
        assert!(!coh.is_waiting(0));
        assert_eq!(trees.state(0, 0xc0), CoherenceState::Modified);
        assert_eq!(coh.cache_transfers(0), 0);
    }
}
