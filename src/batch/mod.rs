//! Batches record every category change a rule application made, so that the
//! application can be undone exactly.

mod list_endpoint;
mod models;
mod undo_endpoint;

pub use list_endpoint::{BatchListQuery, get_batch_endpoint, list_batches_endpoint};
pub use models::{Batch, BatchChange, BatchQuery, BatchSummary, NewBatch};
pub use undo_endpoint::undo_batch_endpoint;
