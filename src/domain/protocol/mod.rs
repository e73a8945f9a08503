//! Cross-context message protocol

mod ids;
mod message;

pub use ids::{BlobId, CorrelationId};
pub use message::{
    Completion, EngineCommand, EngineCommandKind, EngineEvent, Message, MessageSender,
    Operation, Reply, TabMessage,
};
