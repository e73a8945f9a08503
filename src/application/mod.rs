//! Application layer - Use cases and port interfaces
//!
//! Contains the session coordinator, the capture engine and the trait
//! definitions for external system interactions.

pub mod capture_engine;
pub mod capture_host;
pub mod coordinator;
pub mod ports;
pub mod ready_gate;
pub mod single_flight;

// Re-export use cases
pub use capture_engine::{CaptureEngine, EngineError, TICK_INTERVAL};
pub use capture_host::{serve_capture_host, CommandHandler};
pub use coordinator::{
    CoordinatorError, CoordinatorUrls, GestureOutcome, HostError, SessionCoordinator, TabRegistry,
    DEFAULT_AUTHENTICATION_URL, DEFAULT_EDITOR_URL,
};
pub use ready_gate::{GateError, PendingGate, ReadyGates};
pub use single_flight::{FlightAbandoned, SingleFlight};
