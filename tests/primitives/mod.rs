//! Primitive behavior as seen through the public API

mod cancel;
mod rendezvous;
