//! Probes the host's hardware topology (CPU, cache, memory, NUMA) and
//! generates the architecture macro header consumed by the native build.

pub mod core;
pub mod emit;
pub mod probe;
