//! Encoding worker adapters

mod buffering;

pub use buffering::BufferingWorker;
