//! Transport layer: wire codec and push channel plumbing.

pub mod push_channel;
pub mod wire;
