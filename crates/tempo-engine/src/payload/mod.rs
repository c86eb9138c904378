//! Structural edits on captured request bodies.
//!
//! Captured bodies are treated as opaque templates; only the fields a service
//! needs to change are touched and everything else is written back as found.

pub mod fluency;
pub mod markup;
