//! Active (non-block) objects: kinds, messages, and the id-keyed registry
//! with ray selection and an advisory per-block index.
#![forbid(unsafe_code)]

mod object;
mod registry;

pub use object::{ActiveObject, ObjectId, ObjectKind, ObjectMessage, SelectionView, block_of};
pub use registry::{ActiveObjectRegistry, BlockChange};
