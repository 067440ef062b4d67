use std::fmt;

use super::common::BusRequest;
use super::queue::RequestQueues;

/// Debugger hooks the host can arm on the interconnect.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugEnv {
    pub watched: bool,          // dump state every tick unless `notify_state` is set
    pub notify_state: bool,     // dump once, on the next completed request
    pub extern_break: bool,     // dump and request a break on every completed request
}

/// Printable snapshot of the bus.
pub struct StateDump<'a> {
    pub(crate) num_procs: usize,
    pub(crate) pending: &'a BusRequest,
    pub(crate) countdown: u64,
    pub(crate) queues: &'a RequestQueues,
}

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let req = self.pending;
        writeln!(f, "--- Interconnect Debug State (Processors: {}) ---", self.num_procs)?;
        writeln!(f, "       Current Request: ")?;
        writeln!(f, "             Processor: {}", req.proc)?;
        writeln!(f, "               Address: 0x{:016x}", req.addr)?;
        writeln!(f, "                  Type: {}", req.kind)?;
        writeln!(f, "                 State: {}", req.state)?;
        writeln!(f, "         Shared / Data: {}", if req.shared { "Shared" } else { "Data" })?;
        writeln!(f, "             Countdown: {}", self.countdown)?;
        write!(f, "    Request Queue Size: ")?;
        for p in 0..self.num_procs {
            write!(f, "\n       - Processor[{:02}]: {}", p, self.queues.len(p))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::common::*;

    #[test]
    fn dump_lists_request_and_queues() {
        let req = BusRequest::new(BusReqType::ReadExclusive, 0x200, 1, ReqState::WaitingMemory, 3);
        let mut queues = RequestQueues::new(2);
        queues.push(BusRequest::new(BusReqType::ReadShared, 0x40, 0, ReqState::Queued, 4));
        let dump = StateDump { num_procs: 2, pending: &req, countdown: 42, queues: &queues };
        let text = dump.to_string();
        assert!(text.starts_with("--- Interconnect Debug State (Processors: 2) ---"));
        assert!(text.contains("Address: 0x0000000000000200"));
        assert!(text.contains("Type: BusRdX"));
        assert!(text.contains("State: Waiting for Memory"));
        assert!(text.contains("Countdown: 42"));
        assert!(text.contains("Processor[00]: 1"));
        assert!(text.contains("Processor[01]: 0"));
    }
}
