use std::io::{self, Write};
use log::{debug, error, info, trace};

use crate::config::InterconnectConfig;
use crate::error::BusError;
use super::common::*;
use super::debug::{DebugEnv, StateDump};
use super::port::*;
use super::queue::RequestQueues;
use super::snoop::{snoop_targets, CoherenceView};
use super::stats::Stats;

/// The shared bus. Owns the one request currently on the bus, the queues of
/// requests waiting for it and the timing of every phase in between.
pub struct Interconnect {
    num_procs: usize,
    delays: Delays,
    pending: Option<BusRequest>,
    queues: RequestQueues,
    countdown: u64,         // ticks left in the current phase
    snoop_countdown: u64,   // ticks left until the directory lookup
    snoop_sent: bool,
    tick_count: u64,
    stats: Stats,
    memory: Box<dyn MemoryComponent>,
    next_mem_id: u64,
    completions: Vec<MemCompletion>,    // reused every tick
    coherence: Option<Box<dyn CoherenceComponent>>,
    states: Option<Box<dyn StateTable>>,
    pub dbg: DebugEnv,
    break_requested: bool,
}

impl Interconnect {
    pub fn new(config: &InterconnectConfig, memory: Box<dyn MemoryComponent>) -> Self {
        let num_procs = config.processors;
        Interconnect {
            num_procs,
            delays: config.delays(),
            pending: None,
            queues: RequestQueues::new(num_procs),
            countdown: 0,
            snoop_countdown: 0,
            snoop_sent: true,
            tick_count: 0,
            stats: Stats::new(num_procs),
            memory,
            next_mem_id: 0,
            completions: Vec::new(),
            coherence: None,
            states: None,
            dbg: DebugEnv::default(),
            break_requested: false,
        }
    }

    pub fn register_coherence(&mut self, coherence: Box<dyn CoherenceComponent>, states: Box<dyn StateTable>) {
        self.coherence = Some(coherence);
        self.states = Some(states);
    }

    // accessors

    pub fn num_procs(&self) -> usize { self.num_procs }
    pub fn now(&self) -> u64 { self.tick_count }
    pub fn pending(&self) -> Option<&BusRequest> { self.pending.as_ref() }
    pub fn countdown(&self) -> u64 { self.countdown }
    pub fn queue_len(&self, proc: usize) -> usize { self.queues.len(proc) }
    pub fn queues(&self) -> &RequestQueues { &self.queues }
    pub fn stats(&self) -> &Stats { &self.stats }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.queues.is_empty()
    }

    /// Returns true once after a completion hit an armed `extern_break`.
    pub fn take_break(&mut self) -> bool {
        std::mem::take(&mut self.break_requested)
    }

    pub fn dump(&self) -> Option<StateDump<'_>> {
        let pending = self.pending.as_ref()?;
        Some(StateDump {
            num_procs: self.num_procs,
            pending,
            countdown: self.countdown,
            queues: &self.queues,
        })
    }

    // inputs

    /// A processor puts `kind` for `addr` on the bus. Either it takes the idle
    /// bus, answers the pending request, or waits in its queue.
    pub fn bus_req(&mut self, kind: BusReqType, addr: u64, proc: usize) -> Result<(), BusError> {
        self.check_proc(proc)?;
        let now = self.tick_count;
        match self.pending.as_mut() {
            None => {
                if kind == BusReqType::Shared {
                    return Err(BusError::SharedWithoutPending { addr, proc });
                }
                trace!("{}: {} {:#x} from {} takes the bus", now, kind, addr, proc);
                self.activate(BusRequest::new(kind, addr, proc, ReqState::Queued, now));
            }
            Some(req) if kind == BusReqType::Shared && req.addr == addr => {
                req.shared = true;
            }
            Some(req) if kind == BusReqType::Data && req.addr == addr => match req.state {
                ReqState::WaitingMemory => {
                    trace!("{}: {:#x} served by cache of {}", now, addr, proc);
                    req.data = true;
                    req.state = ReqState::TransferingCache;
                    self.countdown = self.delays.cache_transfer;
                }
                ReqState::TransferingCache | ReqState::TransferingMemory => {
                    debug!("duplicate data for {:#x} from {}, ignoring", addr, proc);
                }
                state => return Err(BusError::DataBeforeMemory { addr, proc, state }),
            },
            Some(req) => {
                if kind == BusReqType::Shared {
                    return Err(BusError::SharedMismatch { addr, proc, pending: req.addr });
                }
                self.queues.push(BusRequest::new(kind, addr, proc, ReqState::Queued, now));
            }
        }
        Ok(())
    }

    /// Was the pending request of `proc` for `addr` satisfied by a cache-to-cache transfer?
    pub fn bus_req_cache_transfer(&self, addr: u64, proc: usize) -> Result<bool, BusError> {
        let req = self.pending.as_ref().ok_or(BusError::NoPendingRequest)?;
        Ok(req.addr == addr && req.proc == proc && req.state == ReqState::TransferingCache)
    }

    pub fn tick(&mut self) -> Result<(), BusError> {
        let mut completions = std::mem::take(&mut self.completions);
        self.memory.tick(&mut completions);
        for done in completions.drain(..) {
            self.mem_req_callback(done);
        }
        self.completions = completions;
        self.tick_count += 1;
        if self.dbg.watched && !self.dbg.notify_state {
            self.print_state();
        }

        if self.snoop_countdown > 0 { self.snoop_countdown -= 1; }

        if self.pending.is_none() {
            self.arbitrate();
            return Ok(());
        }
        self.countdown = self.countdown.saturating_sub(1);

        // memory answered, nothing left to wait for
        if let Some(req) = self.pending.as_mut().filter(|r| r.data_avail) {
            req.state = ReqState::TransferingMemory;
            self.countdown = 0;
        }

        if !self.snoop_sent && self.snoop_countdown == 0 {
            self.snoop_sent = true;
            self.broadcast_snoop()?;
        }

        if self.countdown == 0 {
            self.advance()?;
        }
        Ok(())
    }

    /// Finish the memory side, then write the statistics to the sink `open` returns.
    /// A sink that cannot be opened or written is reported and skipped.
    pub fn finish<W, F>(&mut self, open: F)
    where
        W: Write,
        F: FnOnce() -> io::Result<W>,
    {
        self.memory.finish();
        let result = open().and_then(|mut w| {
            self.stats.write_report(&mut w)?;
            w.flush()
        });
        if let Err(e) = result {
            error!("unable to write interconnect stats: {}", e);
        }
    }

    pub fn destroy(&mut self) {
        self.memory.destroy();
    }

    // helper functions

    fn check_proc(&self, proc: usize) -> Result<(), BusError> {
        if proc >= self.num_procs {
            return Err(BusError::UnknownProcessor { proc, num_procs: self.num_procs });
        }
        Ok(())
    }

    fn activate(&mut self, mut req: BusRequest) {
        req.state = ReqState::WaitingCache;
        req.enq_tick = self.tick_count;
        self.countdown = self.delays.cache_delay;
        // the directory lookup is armed when memory is asked
        self.snoop_sent = true;
        self.pending = Some(req);
    }

    fn arbitrate(&mut self) {
        if let Some(req) = self.queues.arbitrate() {
            trace!("{}: granted bus to {} for {:#x}", self.tick_count, req.proc, req.addr);
            self.activate(req);
        }
    }

    /// Only the fetch issued for the pending request counts. Answers to fetches
    /// of requests that already finished are dropped, even for the same line.
    fn mem_req_callback(&mut self, done: MemCompletion) {
        match self.pending.as_mut() {
            Some(req) if req.mem_id == Some(done.id) => req.data_avail = true,
            _ => debug!("stale memory completion #{} for {:#x} from {}", done.id, done.addr, done.proc),
        }
    }

    /// the current phase ran out
    fn advance(&mut self) -> Result<(), BusError> {
        let Some(req) = self.pending.as_mut() else { return Ok(()) };
        let state = req.state;
        match state {
            ReqState::WaitingCache => {
                let id = self.next_mem_id;
                self.next_mem_id += 1;
                req.mem_id = Some(id);
                self.countdown = self.memory.bus_req(id, req.addr, req.proc);
                req.state = ReqState::WaitingMemory;
                self.snoop_sent = false;
                self.snoop_countdown = self.delays.directory_delay;
                if req.data {
                    req.kind = BusReqType::Data;
                }
                trace!("{}: {:#x} waiting for memory, {} ticks", self.tick_count, req.addr, self.countdown);
            }
            ReqState::TransferingMemory => {
                let kind = if req.shared { BusReqType::Shared } else { BusReqType::Data };
                self.complete(kind)?;
            }
            ReqState::TransferingCache => {
                let kind = if req.shared { BusReqType::Shared } else { req.kind };
                self.complete(kind)?;
            }
            // memory is late, keep the bus until it answers
            ReqState::WaitingMemory | ReqState::Queued => (),
        }
        Ok(())
    }

    fn complete(&mut self, kind: BusReqType) -> Result<(), BusError> {
        let Some((addr, proc)) = self.pending.as_ref().map(|r| (r.addr, r.proc)) else {
            return Ok(());
        };
        trace!("{}: delivering {} {:#x} to {}", self.tick_count, kind, addr, proc);
        self.deliver(kind, addr, proc)?;
        self.notify_state();
        if let Some(req) = self.pending.take() {
            self.stats.record_access(req.proc, req.latency(self.tick_count));
        }
        Ok(())
    }

    /// Hand a transaction to the coherence component and apply whatever it answers.
    fn deliver(&mut self, kind: BusReqType, addr: u64, proc: usize) -> Result<(), BusError> {
        let mut port = BusPort::new(self.pending.as_ref().map(PendingSnapshot::from));
        self.coherence
            .as_mut()
            .ok_or(BusError::CoherenceNotRegistered)?
            .bus_req(kind, addr, proc, &mut port);
        for (kind, addr, proc) in port.into_submissions() {
            self.bus_req(kind, addr, proc)?;
        }
        Ok(())
    }

    fn broadcast_snoop(&mut self) -> Result<(), BusError> {
        let Some((kind, addr, requester)) = self.pending.as_ref().map(|r| (r.kind, r.addr, r.proc)) else {
            return Ok(());
        };
        let sharers = self.check_sharers(addr)?;
        for target in snoop_targets(&sharers, requester, kind) {
            debug!("{}: snooping {} for {} {:#x}", self.tick_count, target, kind, addr);
            self.stats.record_snoop(target);
            self.deliver(kind, addr, target)?;
        }
        if let Some(req) = self.pending.as_mut() {
            if req.data {
                req.kind = BusReqType::Data;
            }
        }
        Ok(())
    }

    /// directory lookup on the critical path
    fn check_sharers(&mut self, addr: u64) -> Result<Vec<CoherenceState>, BusError> {
        let table = self.states.as_deref().ok_or(BusError::CoherenceNotRegistered)?;
        self.stats.record_dir_access();
        Ok(CoherenceView::new(table, self.num_procs).sharers(addr))
    }

    fn print_state(&self) {
        if let Some(dump) = self.dump() {
            info!("{}", dump);
        }
    }

    fn notify_state(&mut self) {
        if self.pending.is_none() {
            return;
        }
        if self.dbg.extern_break {
            self.print_state();
            self.break_requested = true;
            return;
        }
        if self.dbg.watched && self.dbg.notify_state {
            self.dbg.notify_state = false;
            self.print_state();
        }
    }
}
