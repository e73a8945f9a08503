//! Session and recording storage adapters

mod blob;
mod memory;

pub use blob::FsBlobStore;
pub use memory::MemorySessionStore;
