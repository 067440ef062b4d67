//! Trace-driven harness around the interconnect: processors replay their
//! traces against `SnoopingCoherence` caches, which share one bus.

pub mod coherence;
pub mod trace;

use std::cell::RefCell;
use std::rc::Rc;
use log::info;

use crate::config::InterconnectConfig;
use crate::error::{BusError, ConfigError, SimError};
use crate::interconnect::{FixedLatencyMemory, Interconnect, StateTrees};
use coherence::SnoopingCoherence;
use trace::{Instr, Instructions};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProcState {
    Ready,
    ExecutingOther(u64),    // cycles remaining
    WaitingForCache,
    Done,
}

pub struct Processor {
    pub id: usize,
    pub state: ProcState,
    insts: Instructions,
    pub loads: u64,
    pub stores: u64,
    pub idle_cycles: u64,
}

impl Processor {
    pub fn new(id: usize, insts: Instructions) -> Self {
        Processor {
            id,
            state: ProcState::Ready,
            insts,
            loads: 0,
            stores: 0,
            idle_cycles: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.insts.len()
    }
}

pub struct Simulation {
    bus: Interconnect,
    coherence: Rc<RefCell<SnoopingCoherence>>,
    procs: Vec<Processor>,
    max_ticks: u64,
}

impl Simulation {
    /// One processor per trace; the processor count of `config` is overridden.
    pub fn new(config: &InterconnectConfig, traces: Vec<Instructions>) -> Result<Self, ConfigError> {
        let config = InterconnectConfig { processors: traces.len(), ..config.clone() };
        config.validate()?;

        let states = StateTrees::new(config.processors);
        let coherence = Rc::new(RefCell::new(SnoopingCoherence::new(states.clone(), config.processors)));
        let mut bus = Interconnect::new(&config, Box::new(FixedLatencyMemory::new(config.memory_latency)));
        bus.register_coherence(Box::new(coherence.clone()), Box::new(states));

        let procs = traces.into_iter().enumerate().map(|(i, t)| Processor::new(i, t)).collect();
        Ok(Simulation { bus, coherence, procs, max_ticks: config.max_ticks })
    }

    pub fn bus(&self) -> &Interconnect { &self.bus }
    pub fn bus_mut(&mut self) -> &mut Interconnect { &mut self.bus }
    pub fn processors(&self) -> &[Processor] { &self.procs }
    pub fn coherence(&self) -> std::cell::Ref<'_, SnoopingCoherence> { self.coherence.borrow() }

    pub fn is_done(&self) -> bool {
        self.procs.iter().all(|p| p.state == ProcState::Done) && self.bus.is_idle()
    }

    /// processors first, then the bus
    pub fn step(&mut self) -> Result<(), BusError> {
        for p in self.procs.iter_mut() {
            p.state = match p.state {
                ProcState::Ready => match p.insts.pop_front() {
                    None => ProcState::Done,
                    Some(Instr::Other(t)) if t > 1 => ProcState::ExecutingOther(t - 1),
                    Some(Instr::Other(_)) => ProcState::Ready,
                    Some(Instr::Read(addr)) => {
                        p.loads += 1;
                        issue(&mut self.bus, &self.coherence, p.id, addr, false)?
                    }
                    Some(Instr::Write(addr)) => {
                        p.stores += 1;
                        issue(&mut self.bus, &self.coherence, p.id, addr, true)?
                    }
                },
                ProcState::ExecutingOther(t) if t > 1 => ProcState::ExecutingOther(t - 1),
                ProcState::ExecutingOther(_) => ProcState::Ready,
                ProcState::WaitingForCache => {
                    if self.coherence.borrow().is_waiting(p.id) {
                        p.idle_cycles += 1;
                        ProcState::WaitingForCache
                    } else {
                        ProcState::Ready
                    }
                }
                ProcState::Done => ProcState::Done,
            };
        }
        self.bus.tick()
    }

    /// Run until every trace retired and the bus drained. Returns the tick count.
    pub fn run(&mut self) -> Result<u64, SimError> {
        info!("simulating {} processors", self.procs.len());
        while !self.is_done() {
            if self.bus.now() >= self.max_ticks {
                return Err(SimError::TickLimit(self.max_ticks));
            }
            self.step()?;
            if self.bus.take_break() {
                info!("break requested at tick {}", self.bus.now());
            }
        }
        info!("finished simulation in {} cycles", self.bus.now());
        Ok(self.bus.now())
    }
}

// a hit finishes this cycle, a miss goes on the bus
fn issue(
    bus: &mut Interconnect,
    coherence: &RefCell<SnoopingCoherence>,
    proc: usize,
    addr: u64,
    write: bool,
) -> Result<ProcState, BusError> {
    let miss = coherence.borrow_mut().access(proc, addr, write);
    match miss {
        Some(kind) => {
            bus.bus_req(kind, addr, proc)?;
            Ok(ProcState::WaitingForCache)
        }
        None => Ok(ProcState::Ready),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace::parse_trace;

    #[test]
    fn hits_need_no_bus() {
        let config = InterconnectConfig::default();
        let trace = parse_trace("1 0x100\n0 0x100\n1 0x100\n").unwrap();
        let mut sim = Simulation::new(&config, vec![trace]).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.coherence().misses(0), 1);
        assert_eq!(sim.coherence().hits(0), 2);
        assert_eq!(sim.bus().stats().accesses(0), 1);
        let p = &sim.processors()[0];
        assert_eq!((p.loads, p.stores, p.remaining()), (1, 2, 0));
    }

    #[test]
    fn other_instructions_take_their_cycles() {
        let config = InterconnectConfig::default();
        let trace = parse_trace("2 0x5\n").unwrap();
        let mut sim = Simulation::new(&config, vec![trace]).unwrap();
        // 5 cycles of work, one more to notice the trace ended
        assert_eq!(sim.run().unwrap(), 6);
    }

    #[test]
    fn tick_limit() {
        let config = InterconnectConfig { max_ticks: 20, ..Default::default() };
        let trace = parse_trace("0 0x100\n").unwrap();
        let mut sim = Simulation::new(&config, vec![trace]).unwrap();
        assert!(matches!(sim.run(), Err(SimError::TickLimit(20))));
    }

    #[test]
    fn needs_a_trace() {
        let config = InterconnectConfig::default();
        assert!(matches!(Simulation::new(&config, vec![]), Err(ConfigError::NoProcessors)));
    }
}
