// Interfaces of the components the interconnect talks to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::BusError;
use super::common::*;

/// Per-processor address -> raw coherence state, owned by the coherence component.
/// Addresses without an entry read as 0.
pub trait StateTable {
    fn raw_state(&self, proc: usize, addr: u64) -> u64;
}

/// The coherence side of the bus. Snoops and final responses arrive through
/// `bus_req`; anything the component wants to put on the bus in reaction goes
/// into `port` and is applied before the interconnect continues.
pub trait CoherenceComponent {
    fn bus_req(&mut self, kind: BusReqType, addr: u64, proc: usize, port: &mut BusPort);
}

/// A memory completion: the data for `addr` requested by `proc` is ready.
/// `id` is the one the interconnect passed to `MemoryComponent::bus_req`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemCompletion {
    pub id: u64,
    pub proc: usize,
    pub addr: u64,
}

pub trait MemoryComponent {
    /// Advance one tick, appending the requests that completed on it to `done`.
    fn tick(&mut self, done: &mut Vec<MemCompletion>);
    /// Start fetching `addr` for `proc`, returns the delay in ticks.
    fn bus_req(&mut self, id: u64, addr: u64, proc: usize) -> u64;
    fn finish(&mut self) {}
    fn destroy(&mut self) {}
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingSnapshot {
    addr: u64,
    proc: usize,
    state: ReqState,
}

impl From<&BusRequest> for PendingSnapshot {
    fn from(req: &BusRequest) -> Self {
        PendingSnapshot { addr: req.addr, proc: req.proc, state: req.state }
    }
}

/// Outbox handed to the coherence component during a call-back.
pub struct BusPort {
    pending: Option<PendingSnapshot>,
    submissions: Vec<(BusReqType, u64, usize)>,
}

impl BusPort {
    pub(crate) fn new(pending: Option<PendingSnapshot>) -> Self {
        BusPort { pending, submissions: Vec::new() }
    }

    /// A port that sees an idle bus, for driving a component directly.
    pub fn detached() -> Self {
        BusPort::new(None)
    }

    pub fn bus_req(&mut self, kind: BusReqType, addr: u64, proc: usize) {
        self.submissions.push((kind, addr, proc));
    }

    /// Was the pending request of `proc` for `addr` satisfied by a cache-to-cache transfer?
    pub fn cache_transfer(&self, addr: u64, proc: usize) -> Result<bool, BusError> {
        let pending = self.pending.ok_or(BusError::NoPendingRequest)?;
        Ok(pending.addr == addr && pending.proc == proc && pending.state == ReqState::TransferingCache)
    }

    pub fn submissions(&self) -> &[(BusReqType, u64, usize)] {
        &self.submissions
    }

    pub(crate) fn into_submissions(self) -> Vec<(BusReqType, u64, usize)> {
        self.submissions
    }
}

// shared handles, so a driver can keep hold of a component it registered

impl<T: CoherenceComponent> CoherenceComponent for Rc<RefCell<T>> {
    fn bus_req(&mut self, kind: BusReqType, addr: u64, proc: usize, port: &mut BusPort) {
        self.borrow_mut().bus_req(kind, addr, proc, port);
    }
}

impl<T: StateTable> StateTable for Rc<RefCell<T>> {
    fn raw_state(&self, proc: usize, addr: u64) -> u64 {
        self.borrow().raw_state(proc, addr)
    }
}

/// Cloneable per-processor state maps. Every clone sees the same tables.
#[derive(Clone, Default)]
pub struct StateTrees {
    trees: Rc<RefCell<Vec<BTreeMap<u64, u64>>>>,
}

impl StateTrees {
    pub fn new(num_procs: usize) -> Self {
        StateTrees {
            trees: Rc::new(RefCell::new(vec![BTreeMap::new(); num_procs])),
        }
    }

    pub fn get(&self, proc: usize, addr: u64) -> u64 {
        self.trees
            .borrow()
            .get(proc)
            .and_then(|t| t.get(&addr).copied())
            .unwrap_or(0)
    }

    pub fn set(&self, proc: usize, addr: u64, raw: u64) {
        if let Some(tree) = self.trees.borrow_mut().get_mut(proc) {
            if raw == 0 {
                tree.remove(&addr);
            } else {
                tree.insert(addr, raw);
            }
        }
    }

    pub fn state(&self, proc: usize, addr: u64) -> CoherenceState {
        CoherenceState::decode(self.get(proc, addr))
    }
}

impl StateTable for StateTrees {
    fn raw_state(&self, proc: usize, addr: u64) -> u64 {
        self.get(proc, addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_tables() {
        let a = StateTrees::new(2);
        let b = a.clone();
        a.set(1, 0x40, 2);
        assert_eq!(b.raw_state(1, 0x40), 2);
        assert_eq!(b.state(1, 0x40), CoherenceState::Shared);
        assert_eq!(b.raw_state(0, 0x40), 0);
        b.set(1, 0x40, 0);
        assert_eq!(a.get(1, 0x40), 0);
    }

    #[test]
    fn unknown_processor_reads_invalid() {
        let t = StateTrees::new(1);
        t.set(5, 0x0, 1);
        assert_eq!(t.state(5, 0x0), CoherenceState::Invalid);
    }

    #[test]
    fn detached_port_has_no_pending_request() {
        let mut port = BusPort::detached();
        assert!(matches!(port.cache_transfer(0x0, 0), Err(BusError::NoPendingRequest)));
        port.bus_req(BusReqType::Data, 0x80, 1);
        assert_eq!(port.submissions(), &[(BusReqType::Data, 0x80, 1)]);
    }

    #[test]
    fn cache_transfer_matches_address_and_processor() {
        let mut req = BusRequest::new(BusReqType::ReadShared, 0x100, 2, ReqState::TransferingCache, 0);
        let port = BusPort::new(Some(PendingSnapshot::from(&req)));
        assert!(port.cache_transfer(0x100, 2).unwrap());
        assert!(!port.cache_transfer(0x100, 1).unwrap());
        assert!(!port.cache_transfer(0x140, 2).unwrap());
        req.state = ReqState::TransferingMemory;
        let port = BusPort::new(Some(PendingSnapshot::from(&req)));
        assert!(!port.cache_transfer(0x100, 2).unwrap());
    }
}
