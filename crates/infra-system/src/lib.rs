// Launchpad Infrastructure - System Adapters
// Implements: SystemProbe

pub mod system_probe_impl;

pub use system_probe_impl::SystemProbeImpl;
