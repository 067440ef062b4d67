//! Bus model of a cycle-level multiprocessor cache coherence simulator.
//!
//! The [`interconnect::Interconnect`] arbitrates one shared bus among the
//! processors' caches, times cache lookups, directory lookups, memory fetches
//! and cache-to-cache transfers, and forwards snoops and responses to the
//! coherence component.

pub mod config;
pub mod driver;
pub mod error;
pub mod interconnect;
