// src/probe/a2s.rs
//! Info-query adapter for the Source engine A2S_INFO protocol (UDP),
//! used by CS2 and other Source-family servers. Handles the optional
//! challenge round internally; callers only see the parsed info.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::Cursor;
use std::time::{Duration, Instant, SystemTime};
use tokio::net::UdpSocket;

use crate::models::server::ServerStatus;
use crate::probe::ProbeError;

const PACKET_HEADER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const INFO_REQUEST: u8 = 0x54;
const INFO_RESPONSE: u8 = 0x49;
const CHALLENGE_RESPONSE: u8 = 0x41;
const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Probes a Source-family server, bounded by `timeout` overall.
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
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((address, port)).await?;

    let mut query = Vec::with_capacity(PACKET_HEADER.len() + 1 + INFO_PAYLOAD.len());
    query.extend_from_slice(&PACKET_HEADER);
    query.push(INFO_REQUEST);
    query.extend_from_slice(INFO_PAYLOAD);

    let started = Instant::now();
    socket.send(&query).await?;

    let mut buf = [0u8; 1400];
    let mut len = socket.recv(&mut buf).await?;

    // Modern servers answer the bare query with a challenge we must echo.
    if response_type(&buf[..len])? == CHALLENGE_RESPONSE {
        if len < 9 {
            return Err(ProbeError::Protocol("truncated challenge response".to_string()));
        }
        debug!("A2S challenge round for {}:{}", address, port);
        let mut challenged = query.clone();
        challenged.extend_from_slice(&buf[5..9]);
        socket.send(&challenged).await?;
        len = socket.recv(&mut buf).await?;
    }

    if response_type(&buf[..len])? != INFO_RESPONSE {
        return Err(ProbeError::Protocol(format!(
            "unexpected response type 0x{:02x}",
            buf[4]
        )));
    }

    let ping_ms = started.elapsed().as_millis() as u64;
    parse_info(&buf[5..len], ping_ms)
}

fn response_type(packet: &[u8]) -> Result<u8, ProbeError> {
    if packet.len() < 5 || packet[..4] != PACKET_HEADER {
        return Err(ProbeError::Protocol("malformed A2S packet header".to_string()));
    }
    Ok(packet[4])
}

/// Parses the fixed-layout A2S_INFO body (everything after the type byte).
fn parse_info(body: &[u8], ping_ms: u64) -> Result<ServerStatus, ProbeError> {
    let mut cursor = Cursor::new(body);

    read_u8(&mut cursor)?; // protocol version
    read_cstring(&mut cursor)?; // server name
    read_cstring(&mut cursor)?; // map
    read_cstring(&mut cursor)?; // game folder
    read_cstring(&mut cursor)?; // game description
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| truncated())?; // app id

    let players = read_u8(&mut cursor)?;
    let max_players = read_u8(&mut cursor)?;
    read_u8(&mut cursor)?; // bots
    read_u8(&mut cursor)?; // server type
    read_u8(&mut cursor)?; // environment
    read_u8(&mut cursor)?; // visibility
    read_u8(&mut cursor)?; // VAC
    let version = read_cstring(&mut cursor)?;

    Ok(ServerStatus {
        online: true,
        players: u32::from(players),
        max_players: u32::from(max_players),
        version,
        ping_ms,
        last_updated: SystemTime::now(),
    })
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, ProbeError> {
    ReadBytesExt::read_u8(cursor).map_err(|_| truncated())
}

fn read_cstring(cursor: &mut Cursor<&[u8]>) -> Result<String, ProbeError> {
    let mut bytes = Vec::new();
    loop {
        match read_u8(cursor)? {
            0 => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            b => bytes.push(b),
        }
    }
}

fn truncated() -> ProbeError {
    ProbeError::Protocol("truncated A2S_INFO response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_response(players: u8, max_players: u8, version: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&PACKET_HEADER);
        buf.push(INFO_RESPONSE);
        buf.push(17); // protocol version
        for s in ["Test Server", "de_dust2", "csgo", "Counter-Strike 2"] {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
        buf.extend_from_slice(&730u16.to_le_bytes()); // app id
        buf.push(players);
        buf.push(max_players);
        buf.push(0); // bots
        buf.push(b'd'); // dedicated
        buf.push(b'l'); // linux
        buf.push(0); // public
        buf.push(1); // VAC
        buf.extend_from_slice(version.as_bytes());
        buf.push(0);
        buf
    }

    /// Fake Source server answering one query, optionally demanding a
    /// challenge round first.
    async fn serve_one_info(socket: UdpSocket, response: Vec<u8>, with_challenge: bool) {
        let mut buf = [0u8; 1400];
        let (_len, peer) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(buf[4], INFO_REQUEST);

        if with_challenge {
            let challenge = [0xDE, 0xAD, 0xBE, 0xEF];
            let mut packet = Vec::new();
            packet.extend_from_slice(&PACKET_HEADER);
            packet.push(CHALLENGE_RESPONSE);
            packet.extend_from_slice(&challenge);
            socket.send_to(&packet, peer).await.unwrap();

            let (len, peer2) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(peer2, peer);
            assert_eq!(&buf[len - 4..len], &challenge);
        }

        socket.send_to(&response, peer).await.unwrap();
    }

    #[tokio::test]
    async fn parses_info_response() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(serve_one_info(socket, info_response(9, 16, "1.40.2.3"), false));

        let status = probe("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(status.online);
        assert_eq!(status.players, 9);
        assert_eq!(status.max_players, 16);
        assert_eq!(status.version, "1.40.2.3");
    }

    #[tokio::test]
    async fn handles_challenge_round() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(serve_one_info(socket, info_response(2, 10, "1.40.2.3"), true));

        let status = probe("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(status.online);
        assert_eq!(status.players, 2);
        assert_eq!(status.max_players, 10);
    }

    #[tokio::test]
    async fn truncated_response_is_a_protocol_error() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let mut short = info_response(1, 2, "x");
        short.truncate(12); // cut mid-name
        tokio::spawn(serve_one_info(socket, short, false));

        let result = probe("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Protocol(_))));
    }

    #[test]
    fn parse_rejects_garbage_type() {
        assert!(response_type(&[0xFF, 0xFF, 0xFF, 0x00, 0x49]).is_err());
        assert!(response_type(&[0xFF, 0xFF]).is_err());
    }
}
