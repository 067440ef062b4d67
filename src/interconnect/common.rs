use std::fmt;

// timing

pub const CACHE_DELAY: u64 = 10;
pub const CACHE_TRANSFER: u64 = 10;
pub const DIRECTORY_DELAY: u64 = 6;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Delays {             // unit         default
    pub cache_delay: u64,       // ticks        10
    pub cache_transfer: u64,    // ticks        10
    pub directory_delay: u64,   // ticks        6
}

impl Default for Delays {
    fn default() -> Self {
        Delays {
            cache_delay: CACHE_DELAY,
            cache_transfer: CACHE_TRANSFER,
            directory_delay: DIRECTORY_DELAY,
        }
    }
}

// bus transactions

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BusReqType {
    None,
    ReadShared,
    ReadExclusive,
    Data,
    Shared,
    Memory,
}

impl BusReqType {
    /// true for the transactions that ask other caches for a line
    pub fn is_read(self) -> bool {
        matches!(self, BusReqType::ReadShared | BusReqType::ReadExclusive)
    }
}

impl fmt::Display for BusReqType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BusReqType::None => "None",
            BusReqType::ReadShared => "BusRd",
            BusReqType::ReadExclusive => "BusRdX",
            BusReqType::Data => "Data",
            BusReqType::Shared => "Shared",
            BusReqType::Memory => "Memory",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReqState {
    Queued,
    WaitingCache,
    WaitingMemory,
    TransferingCache,
    TransferingMemory,
}

impl fmt::Display for ReqState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ReqState::Queued => "Queued",
            ReqState::WaitingCache => "Waiting for Cache",
            ReqState::WaitingMemory => "Waiting for Memory",
            ReqState::TransferingCache => "Cache-to-Cache Transfer",
            ReqState::TransferingMemory => "Memory Transfer",
        };
        f.write_str(s)
    }
}

// coherence states as stored by the coherence component

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CoherenceState {
    Invalid,
    Modified,
    Shared,
    SharedModified,
    InvalidModified,
    InvalidShared,
    Undefined,
}

impl CoherenceState {
    /// Decode the raw value kept in a processor's state table.
    /// Both 0 and 3 mean invalid.
    pub fn decode(raw: u64) -> Self {
        match raw {
            0 | 3 => CoherenceState::Invalid,
            1 => CoherenceState::Modified,
            2 => CoherenceState::Shared,
            4 => CoherenceState::SharedModified,
            5 => CoherenceState::InvalidModified,
            6 => CoherenceState::InvalidShared,
            _ => CoherenceState::Undefined,
        }
    }

    /// a holder in this state has to be snooped
    pub fn is_sharer(self) -> bool {
        matches!(self, CoherenceState::Shared | CoherenceState::Modified)
    }
}

impl From<u64> for CoherenceState {
    fn from(raw: u64) -> Self {
        CoherenceState::decode(raw)
    }
}

// requests

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BusRequest {
    pub kind: BusReqType,
    pub state: ReqState,
    pub addr: u64,
    pub proc: usize,
    pub shared: bool,       // some sharer answered Shared
    pub data: bool,         // some sharer supplied the data
    pub data_avail: bool,   // memory answered
    pub mem_id: Option<u64>,   // memory fetch issued for this request
    pub enq_tick: u64,
}

impl BusRequest {
    pub fn new(kind: BusReqType, addr: u64, proc: usize, state: ReqState, enq_tick: u64) -> Self {
        BusRequest {
            kind,
            state,
            addr,
            proc,
            shared: false,
            data: false,
            data_avail: false,
            mem_id: None,
            enq_tick,
        }
    }

    pub fn latency(&self, now: u64) -> u64 {
        now.saturating_sub(self.enq_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_table() {
        assert_eq!(CoherenceState::decode(0), CoherenceState::Invalid);
        assert_eq!(CoherenceState::decode(3), CoherenceState::Invalid);
        assert_eq!(CoherenceState::decode(1), CoherenceState::Modified);
        assert_eq!(CoherenceState::decode(2), CoherenceState::Shared);
        assert_eq!(CoherenceState::decode(4), CoherenceState::SharedModified);
        assert_eq!(CoherenceState::decode(5), CoherenceState::InvalidModified);
        assert_eq!(CoherenceState::decode(6), CoherenceState::InvalidShared);
        for raw in [7, 8, 42, u64::MAX] {
            assert_eq!(CoherenceState::from(raw), CoherenceState::Undefined);
        }
    }

    #[test]
    fn only_shared_and_modified_are_sharers() {
        let sharers: Vec<u64> = (0..8).filter(|&r| CoherenceState::decode(r).is_sharer()).collect();
        assert_eq!(sharers, vec![1, 2]);
    }

    #[test]
    fn latency_counts_from_enqueue() {
        let req = BusRequest::new(BusReqType::ReadShared, 0x100, 0, ReqState::WaitingCache, 5);
        assert_eq!(req.latency(17), 12);
        assert_eq!(req.latency(5), 0);
    }

    #[test]
    fn display_names() {
        assert_eq!(BusReqType::ReadShared.to_string(), "BusRd");
        assert_eq!(BusReqType::ReadExclusive.to_string(), "BusRdX");
        assert_eq!(ReqState::TransferingCache.to_string(), "Cache-to-Cache Transfer");
    }
}
