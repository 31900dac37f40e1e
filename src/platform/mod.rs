// GcodeGate - platform/mod.rs
//
// Platform abstraction layer.
// Dependencies: standard library, directories crate, memmap2.
// Must NOT depend on: core, app.

pub mod config;
pub mod fs;
