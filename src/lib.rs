//! screen-session - recording session orchestration
//!
//! A coordinator that owns the tab registry and the on-demand capture host,
//! and a capture engine that acquires media, mixes audio and drives an
//! encoding worker through record, pause, resume, stop and discard.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the capture state machine, the message protocol and errors
//! - **Application**: The coordinator and engine use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (headless browser, cpal devices, worker, storage)
//! - **CLI**: Argument parsing, the control socket and the serve runner

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
