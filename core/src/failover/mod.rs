//! State inspection and the interface-swap transition.

pub mod executor;
pub mod poller;
pub mod state;

pub use executor::{FailoverExecutor, FailoverOutcome, SwapStage};
pub use poller::{OperationOutcome, OperationPoller, OperationStatus, PollPolicy};
pub use state::{FailoverState, Inspection, StateInspector, classify};
