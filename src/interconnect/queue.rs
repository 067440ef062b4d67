use std::collections::VecDeque;
use super::common::*;

/// Per-processor FIFOs of requests waiting for the bus, plus the
/// round-robin cursor used to pick the next one.
pub struct RequestQueues {
    queues: Vec<VecDeque<BusRequest>>,
    dequeued: Vec<u64>,
    last_proc: usize,   // scanning resumes here
}

impl RequestQueues {
    pub fn new(num_procs: usize) -> Self {
        RequestQueues {
            queues: (0..num_procs).map(|_| VecDeque::new()).collect(),
            dequeued: vec![0; num_procs],
            last_proc: 0,
        }
    }

    pub fn push(&mut self, req: BusRequest) {
        let proc = req.proc;
        self.queues[proc].push_back(req);
    }

    pub fn len(&self, proc: usize) -> usize {
        self.queues[proc].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    pub fn total(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    pub fn last_proc(&self) -> usize {
        self.last_proc
    }

    /// how many requests of this processor have been granted the bus by arbitration
    pub fn dequeued(&self, proc: usize) -> u64 {
        self.dequeued[proc]
    }

    /// Round robin: the first non-empty queue at or after `last_proc` wins,
    /// and the next scan starts one past the winner.
    pub fn arbitrate(&mut self) -> Option<BusRequest> {
        let n = self.queues.len();
        let pos = (0..n)
            .map(|i| (i + self.last_proc) % n)
            .find(|&p| !self.queues[p].is_empty())?;
        let req = self.queues[pos].pop_front()?;
        self.dequeued[pos] += 1;
        self.last_proc = (pos + 1) % n;
        Some(req)
    }
}
