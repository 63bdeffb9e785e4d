// src/server/open.rs

//! Opening the start page in a browser.

use std::net::{IpAddr, UdpSocket};

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::types::OpenMode;

/// URL of the start page for `mode`, or `None` when nothing should be opened.
pub fn start_url(mode: OpenMode, port: u16, start_path: &str) -> Option<String> {
    let host = match mode {
        OpenMode::None => return None,
        OpenMode::Local => "localhost".to_string(),
        OpenMode::External => lan_address()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "localhost".to_string()),
    };
    Some(format!(
        "http://{host}:{port}/{}",
        start_path.trim_start_matches("./").trim_start_matches('/')
    ))
}

/// This machine's address on the local network.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outbound interface.
pub fn lan_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Launch the platform's default browser at `url`.
pub async fn open_browser(url: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    let status = command
        .status()
        .await
        .with_context(|| format!("launching browser for {url}"))?;
    if !status.success() {
        anyhow::bail!("browser launcher exited with {status}");
    }
    Ok(())
}
