//! Execution Adapters - Multicall Encoding and Dry-run Submission

pub mod dry_run;
pub mod multicall;

pub use dry_run::DryRunExecutor;
pub use multicall::{EncodedBatch, encode_plan};
