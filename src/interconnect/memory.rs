use std::collections::VecDeque;
use log::info;

use super::port::{MemCompletion, MemoryComponent};

/// Main memory that answers every request after the same number of ticks.
pub struct FixedLatencyMemory {
    latency: u64,
    now: u64,
    inflight: VecDeque<(u64, MemCompletion)>,   // (due tick, request), sorted by due tick
    requests: u64,
}

impl FixedLatencyMemory {
    pub fn new(latency: u64) -> Self {
        FixedLatencyMemory {
            latency,
            now: 0,
            inflight: VecDeque::new(),
            requests: 0,
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}

impl MemoryComponent for FixedLatencyMemory {
    fn tick(&mut self, done: &mut Vec<MemCompletion>) {
        self.now += 1;
        while let Some(&(due, req)) = self.inflight.front() {
            if due > self.now { break; }
            self.inflight.pop_front();
            done.push(req);
        }
    }

    fn bus_req(&mut self, id: u64, addr: u64, proc: usize) -> u64 {
        self.requests += 1;
        // constant latency keeps the queue ordered by due tick
        self.inflight.push_back((self.now + self.latency, MemCompletion { id, proc, addr }));
        self.latency
    }

    fn finish(&mut self) {
        info!("memory served {} requests", self.requests);
    }

    fn destroy(&mut self) {
        self.inflight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(mem: &mut FixedLatencyMemory) -> Vec<MemCompletion> {
        let mut done = Vec::new();
        mem.tick(&mut done);
        done
    }

    #[test]
    fn completes_after_latency() {
        let mut mem = FixedLatencyMemory::new(3);
        assert_eq!(mem.bus_req(7, 0x40, 1), 3);
        assert!(step(&mut mem).is_empty());
        assert!(step(&mut mem).is_empty());
        assert_eq!(step(&mut mem), vec![MemCompletion { id: 7, proc: 1, addr: 0x40 }]);
        assert!(step(&mut mem).is_empty());
        assert_eq!(mem.requests(), 1);
        assert_eq!(mem.in_flight(), 0);
    }

    #[test]
    fn overlapping_requests_complete_in_order() {
        let mut mem = FixedLatencyMemory::new(2);
        mem.bus_req(0, 0x0, 0);
        step(&mut mem);
        mem.bus_req(1, 0x40, 1);
        assert_eq!(step(&mut mem), vec![MemCompletion { id: 0, proc: 0, addr: 0x0 }]);
        assert_eq!(step(&mut mem), vec![MemCompletion { id: 1, proc: 1, addr: 0x40 }]);
    }

    #[test]
    fn appends_to_sink() {
        let mut mem = FixedLatencyMemory::new(0);
        assert_eq!(mem.bus_req(3, 0x80, 0), 0);
        let mut done = vec![MemCompletion { id: 9, proc: 1, addr: 0x0 }];
        mem.tick(&mut done);
        assert_eq!(done.len(), 2);
        assert_eq!(done[1].id, 3);
    }
}
