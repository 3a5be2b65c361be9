use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Reduces the monitor's peer address to the form used for the probe URL,
/// the PID file name and the state comparison.
///
/// The load balancer passes IPv4 peers as IPv4-mapped IPv6
/// (`::ffff:10.0.0.5`).
pub fn normalize_peer_address(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Err(_) => raw.trim_matches(|c| c == ':' || c == 'f').to_string(),
    }
}

/// Local address the kernel would use to reach `peer`. No packet is sent.
pub async fn local_address_towards(peer: IpAddr) -> io::Result<IpAddr> {
    let bind: SocketAddr = match peer {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect((peer, 443)).await?;
    Ok(socket.local_addr()?.ip())
}
