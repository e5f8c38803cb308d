//! The synchronization pipeline.
//!
//! - `traits`: collaborator seams (source, content, workspace, refiner,
//!   notifier) implemented in `stardocs_integrations` or test code.
//! - `pipeline`: the five-stage executor for one repository.
//! - `scheduler`: reconciliation of failed items, discovery of new ones,
//!   optional backfill, and the infinite poll loop.

pub mod pipeline;
pub mod scheduler;
pub mod traits;
