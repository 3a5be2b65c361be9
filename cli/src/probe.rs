use std::net::IpAddr;
use std::time::Duration;

pub fn probe_url(peer_addr: &str, peer_port: &str) -> String {
    match peer_addr.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("https://[{v6}]:{peer_port}"),
        _ => format!("https://{peer_addr}:{peer_port}"),
    }
}

/// HTTPS `HEAD` against the peer. Only a `200` counts as up; the peer's
/// certificate is not verified.
pub async fn peer_is_up(peer_addr: &str, peer_port: &str, timeout: Duration) -> bool {
    let url = probe_url(peer_addr, peer_port);

    let client = match reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create probe client: {e}");
            return false;
        }
    };

    match client.head(&url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            log::debug!("Peer: {peer_addr} is up.");
            true
        }
        Ok(response) => {
            log::debug!("Peer probe {url} answered {}", response.status());
            false
        }
        Err(e) => {
            log::debug!("Peer probe {url} failed: {e}");
            false
        }
    }
}
