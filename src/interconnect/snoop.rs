use super::common::*;
use super::port::StateTable;

/// Read-only view of the coherence component's state tables, decoded.
pub struct CoherenceView<'a> {
    table: &'a dyn StateTable,
    num_procs: usize,
}

impl<'a> CoherenceView<'a> {
    pub fn new(table: &'a dyn StateTable, num_procs: usize) -> Self {
        CoherenceView { table, num_procs }
    }

    pub fn state(&self, proc: usize, addr: u64) -> CoherenceState {
        CoherenceState::decode(self.table.raw_state(proc, addr))
    }

    /// state of `addr` in every processor, indexed by processor id
    pub fn sharers(&self, addr: u64) -> Vec<CoherenceState> {
        (0..self.num_procs).map(|p| self.state(p, addr)).collect()
    }
}

/// Processors that have to be snooped for a request of `kind` from `requester`.
/// A shared read needs a single source, so it stops at the first holder.
pub fn snoop_targets(states: &[CoherenceState], requester: usize, kind: BusReqType) -> Vec<usize> {
    let holders = states
        .iter()
        .enumerate()
        .filter(|&(p, s)| p != requester && s.is_sharer())
        .map(|(p, _)| p);
    match kind {
        BusReqType::ReadShared => holders.take(1).collect(),
        _ => holders.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::port::StateTrees;
    use CoherenceState::*;

    #[test]
    fn shared_read_snoops_one_holder() {
        let states = [Invalid, Shared, Modified, Shared];
        assert_eq!(snoop_targets(&states, 0, BusReqType::ReadShared), vec![1]);
    }

    #[test]
    fn exclusive_read_snoops_every_holder() {
        let states = [Invalid, Shared, Modified, Shared];
        assert_eq!(snoop_targets(&states, 0, BusReqType::ReadExclusive), vec![1, 2, 3]);
        assert_eq!(snoop_targets(&states, 0, BusReqType::Data), vec![1, 2, 3]);
    }

    #[test]
    fn requester_and_non_sharers_are_skipped() {
        let states = [Modified, SharedModified, InvalidShared, Undefined, Shared];
        assert_eq!(snoop_targets(&states, 0, BusReqType::ReadExclusive), vec![4]);
        assert_eq!(snoop_targets(&states, 4, BusReqType::ReadShared), vec![0]);
        assert!(snoop_targets(&[Invalid, Invalid], 1, BusReqType::ReadShared).is_empty());
    }

    #[test]
    fn view_decodes_raw_states() {
        let trees = StateTrees::new(3);
        trees.set(0, 0x200, 3);
        trees.set(1, 0x200, 1);
        trees.set(2, 0x200, 9);
        let view = CoherenceView::new(&trees, 3);
        assert_eq!(view.sharers(0x200), vec![Invalid, Modified, Undefined]);
        assert_eq!(view.sharers(0x240), vec![Invalid; 3]);
    }
}
