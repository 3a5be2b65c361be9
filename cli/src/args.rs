use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::path::PathBuf;

/// Health monitor for an Azure load-balanced active/standby pair.
///
/// Probes the peer over HTTPS and, when it is down, moves the load balancer
/// backend pool to this node.
#[derive(Debug, Parser)]
#[command(name = "azure-ha", version, disable_version_flag = true)]
pub struct Args {
    /// Peer address as passed by the monitor (IPv4-mapped IPv6 is accepted)
    pub peer_addr: Option<String>,

    /// Peer port
    pub peer_port: Option<String>,

    /// Extra monitor arguments, ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,

    /// Test Azure RM authentication and exit
    #[arg(short = 'a')]
    pub auth: bool,

    /// Log level (0-3)
    #[arg(short = 'l', value_parser = clap::value_parser!(u8).range(0..=3))]
    pub level: Option<u8>,

    /// Log to stdout instead of the log file
    #[arg(short = 's')]
    pub stdout: bool,

    /// Configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

impl Args {
    /// Peer address and port, if both were given.
    pub fn peer(&self) -> Option<(&str, &str)> {
        Some((self.peer_addr.as_deref()?, self.peer_port.as_deref()?))
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.level.unwrap_or(0) {
            0 => LevelFilter::Off,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// `-a` always reports on stdout.
    pub fn log_to_stdout(&self) -> bool {
        self.stdout || self.auth
    }
}
