//! Health-monitor front end for the Azure HA failover agent.
//!
//! Invoked by the load balancer as `azure-ha <peer-addr> <peer-port>`: prints
//! `UP` when the peer answers its HTTPS probe, otherwise runs one failover
//! cycle and exits non-zero.

pub mod app;
pub mod args;
pub mod config;
pub mod exit;
pub mod lock;
pub mod logger;
pub mod net;
pub mod probe;

pub use app::run;
