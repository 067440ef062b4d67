use std::io;

use thiserror::Error;

use crate::interconnect::ReqState;

/// Errors raised by the interconnect.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("shared response for {addr:#x} from processor {proc} while the bus is idle")]
    SharedWithoutPending { addr: u64, proc: usize },
    #[error("shared response for {addr:#x} from processor {proc} does not match pending request for {pending:#x}")]
    SharedMismatch { addr: u64, proc: usize, pending: u64 },
    #[error("data for {addr:#x} from processor {proc} before memory was asked (pending request is {state})")]
    DataBeforeMemory { addr: u64, proc: usize, state: ReqState },
    #[error("cache transfer query while no request is pending")]
    NoPendingRequest,
    #[error("processor {proc} out of range, bus has {num_procs} processors")]
    UnknownProcessor { proc: usize, num_procs: usize },
    #[error("no coherence component registered")]
    CoherenceNotRegistered,
}

impl BusError {
    /// The driving protocol broke one of the bus rules.
    /// Anything else is a setup problem of the host.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BusError::SharedWithoutPending { .. }
                | BusError::SharedMismatch { .. }
                | BusError::DataBeforeMemory { .. }
                | BusError::NoPendingRequest
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("at least one processor is required")]
    NoProcessors,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot read trace: {0}")]
    Io(#[from] io::Error),
    #[error("malformed trace line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("simulation did not finish within {0} ticks")]
    TickLimit(u64),
}
