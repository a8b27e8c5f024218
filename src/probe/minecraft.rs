// src/probe/minecraft.rs
//! Status-ping adapter for the Minecraft Server List Ping protocol (TCP).
//!
//! Handshake, status request, length-framed JSON response, then an optional
//! ping/pong exchange for protocol-reported latency.

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;
use serde::Deserialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::models::server::ServerStatus;
use crate::probe::ProbeError;

/// Protocol version -1 asks the server to answer with whatever it speaks.
const HANDSHAKE_PROTOCOL_VERSION: i32 = -1;
const NEXT_STATE_STATUS: i32 = 1;
const PACKET_STATUS: i32 = 0x00;
const PACKET_PING: i32 = 0x01;
/// Status payloads carry an embedded favicon at worst; anything beyond
/// this is a framing error.
const MAX_STATUS_LEN: usize = 1 << 20;

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    version: Option<VersionInfo>,
    #[serde(default)]
    players: Option<PlayersInfo>,
}

#[derive(Deserialize)]
struct VersionInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct PlayersInfo {
    #[serde(default)]
    online: Option<u32>,
    #[serde(default)]
    max: Option<u32>,
}

/// Probes a Minecraft server, bounded by `timeout` overall.
pub async fn probe(
    address: &str,
    port: u16,
    timeout: Duration,
) -> Result<ServerStatus, ProbeError> {
    match tokio::time::timeout(timeout, probe_inner(address, port)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout),
    }
}

async fn probe_inner(address: &str, port: u16) -> Result<ServerStatus, ProbeError> {
    let started = Instant::now();
    let mut stream = TcpStream::connect((address, port)).await?;

    let mut handshake = Vec::new();
    write_var_int(&mut handshake, PACKET_STATUS);
    write_var_int(&mut handshake, HANDSHAKE_PROTOCOL_VERSION);
    write_var_int(&mut handshake, address.len() as i32);
    handshake.extend_from_slice(address.as_bytes());
    WriteBytesExt::write_u16::<BigEndian>(&mut handshake, port)?;
    write_var_int(&mut handshake, NEXT_STATE_STATUS);
    send_packet(&mut stream, &handshake).await?;

    send_packet(&mut stream, &[PACKET_STATUS as u8]).await?;

    let _frame_len = read_var_int(&mut stream).await?;
    let packet_id = read_var_int(&mut stream).await?;
    if packet_id != PACKET_STATUS {
        return Err(ProbeError::Protocol(format!(
            "unexpected status packet id 0x{:02x}",
            packet_id
        )));
    }

    let json_len = read_var_int(&mut stream).await?;
    if json_len <= 0 || json_len as usize > MAX_STATUS_LEN {
        return Err(ProbeError::Protocol(format!(
            "implausible status payload length {}",
            json_len
        )));
    }
    let mut raw = vec![0u8; json_len as usize];
    stream.read_exact(&mut raw).await?;

    let response: StatusResponse = serde_json::from_slice(&raw)
        .map_err(|e| ProbeError::Protocol(format!("malformed status JSON: {}", e)))?;
    let wall_ms = started.elapsed().as_millis() as u64;

    // Prefer the latency measured by the protocol's own ping exchange;
    // servers that drop the connection after the status response fall back
    // to the wall clock of the status round trip.
    let ping_ms = match ping_pong(&mut stream).await {
        Ok(ms) => ms,
        Err(e) => {
            debug!("Ping exchange with {}:{} failed ({}), using wall clock", address, port, e);
            wall_ms
        }
    };

    Ok(ServerStatus {
        online: true,
        players: response
            .players
            .as_ref()
            .and_then(|p| p.online)
            .unwrap_or(0),
        max_players: response.players.as_ref().and_then(|p| p.max).unwrap_or(0),
        version: response
            .version
            .and_then(|v| v.name)
            .unwrap_or_else(|| "Unknown".to_string()),
        ping_ms,
        last_updated: SystemTime::now(),
    })
}

async fn ping_pong(stream: &mut TcpStream) -> Result<u64, ProbeError> {
    let payload = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;

    let mut body = Vec::new();
    write_var_int(&mut body, PACKET_PING);
    WriteBytesExt::write_i64::<BigEndian>(&mut body, payload)?;

    let sent = Instant::now();
    send_packet(stream, &body).await?;

    let _frame_len = read_var_int(stream).await?;
    let packet_id = read_var_int(stream).await?;
    if packet_id != PACKET_PING {
        return Err(ProbeError::Protocol(format!(
            "unexpected pong packet id 0x{:02x}",
            packet_id
        )));
    }
    let echoed = stream.read_i64().await?;
    if echoed != payload {
        return Err(ProbeError::Protocol("pong payload mismatch".to_string()));
    }

    Ok(sent.elapsed().as_millis() as u64)
}

/// Frames a packet body with its VarInt length prefix and writes it out.
async fn send_packet(stream: &mut TcpStream, body: &[u8]) -> Result<(), ProbeError> {
    let mut framed = Vec::with_capacity(body.len() + 5);
    write_var_int(&mut framed, body.len() as i32);
    framed.extend_from_slice(body);
    stream.write_all(&framed).await?;
    Ok(())
}

fn write_var_int(buf: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7F == 0 {
            buf.push(v as u8);
            return;
        }
        buf.push(((v & 0x7F) | 0x80) as u8);
        v >>= 7;
    }
}

async fn read_var_int<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<i32, ProbeError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProbeError::Protocol("VarInt longer than 5 bytes".to_string()))
}
