mod bus;
mod common;
mod debug;
mod memory;
mod port;
mod queue;
mod snoop;
mod stats;

pub use bus::Interconnect;
pub use common::*;
pub use debug::{DebugEnv, StateDump};
pub use memory::FixedLatencyMemory;
pub use port::{BusPort, CoherenceComponent, MemCompletion, MemoryComponent, StateTable, StateTrees};
pub use queue::RequestQueues;
pub use snoop::{snoop_targets, CoherenceView};
pub use stats::Stats;
