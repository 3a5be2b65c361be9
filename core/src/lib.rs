//! # Azure HA Core
//!
//! Failover logic for a two-node active/standby pair behind an Azure load
//! balancer. When the local node's peer fails its health probe, the agent
//! acquires an ARM bearer token, works out whether this node is Active,
//! Standby or Unknown from the load balancer's backend pool, and, when it
//! is Standby, moves the backend pool membership to its own interface.
//!
//! ## Modules
//!
//! - [`auth`] - Client-credential token acquisition, reuse and persistence
//! - [`credentials`] - Credentials file, field encodings and secret stores
//! - [`arm`] - Azure Resource Manager client and network resource views
//! - [`failover`] - State inspection, interface swap and operation polling
//! - [`agent`] - One end-to-end failover cycle
//! - [`encryption`] - AES-GCM cipher for credentials-file fields
//! - [`utils`] - Environment variable helpers

pub mod agent;
pub mod arm;
pub mod auth;
pub mod credentials;
pub mod encryption;
pub mod failover;
pub mod utils;

pub use agent::{AgentOutcome, ArmConnector, Connector, FailoverAgent};
