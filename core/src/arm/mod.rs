//! Azure Resource Manager access: settings, the control-plane seam and the
//! network resource views used by the state inspector and the failover
//! executor.

pub mod client;
pub mod context;
pub mod errors;
pub mod resources;

pub use client::{ArmClient, ControlPlane, WriteAccepted};
pub use context::{ArmSettings, DEFAULT_API_VERSION, DEFAULT_MANAGEMENT_URL, ResourceScope};
pub use errors::ArmError;
pub use resources::{BackendPools, InterfaceIdentity, Slot};
