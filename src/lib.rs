// GcodeGate - lib.rs
//
// Library entry point, exposing the check engine and the admission layer
// for integration testing and programmatic use. The `gcodegate` binary in
// `main.rs` is a thin CLI over this surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
