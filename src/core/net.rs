// src/core/net.rs

// HTTP/1.0 POST over TCP (std-only), used to reach the browser-side bridge.

use std::{io::{Read, Write}, net::TcpStream, time::Duration};

use crate::surface::SurfaceError;

pub fn http_post_json(
    host: &str,
    port: u16,
    path: &str,
    body: &str,
    timeout: Duration,
) -> Result<String, SurfaceError> {
    let transport = |e: std::io::Error| SurfaceError::Transport(format!("{host}:{port}: {e}"));

    let mut s = TcpStream::connect((host, port)).map_err(transport)?;
    s.set_read_timeout(Some(timeout)).map_err(transport)?;
    s.set_write_timeout(Some(timeout)).map_err(transport)?;

    let req = format!(
        "POST {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: shift_scrape/{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path, host, env!("CARGO_PKG_VERSION"), body.len(), body
    );
    s.write_all(req.as_bytes()).map_err(transport)?;
    s.flush().map_err(transport)?;

    let mut buf = Vec::new();
    s.read_to_end(&mut buf).map_err(transport)?;
    let resp = String::from_utf8_lossy(&buf);

    let status = resp.split("\r\n").next().unwrap_or("");
    if !status.contains(" 200") {
        return Err(SurfaceError::Transport(format!("HTTP error: {} {}:{}{}", status, host, port, path)));
    }
    let body_idx = resp
        .find("\r\n\r\n")
        .ok_or_else(|| SurfaceError::Protocol(s!("Malformed HTTP response")))?
        + 4;
    Ok(resp[body_idx..].to_string())
}
