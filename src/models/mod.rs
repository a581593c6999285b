pub mod actor;
pub mod inference;
pub mod order;

pub use actor::{Actor, ActorRole};
pub use inference::{
    InferenceJob, InferenceModel, JobError, JobErrorKind, ModelRegistry, ModelSource,
};
pub use order::{Order, OrderHistoryEntry, OrderPriority};
