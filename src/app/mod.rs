// GcodeGate - app/mod.rs
//
// Application layer: rule set loading and job admission.
// Dependencies: core layer, platform::fs for reads.

pub mod admission;
pub mod ruleset_mgr;
