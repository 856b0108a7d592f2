//! Following a submitted job until it settles.

pub mod poller;
mod tracker;

pub use poller::{JobSource, PollEvent, PollHandle, PollStep, next_step};
pub use tracker::{JobTracker, JobView};
