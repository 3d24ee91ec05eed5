//! Wire codecs for the two Minecraft status protocols.
//!
//! The status ping is the standard TCP server-list exchange: a
//! varint-framed handshake, a status request, and a JSON payload back.
//! The legacy query is the optional UDP protocol (GameSpy4 full stat)
//! that richer servers expose: a challenge handshake followed by a
//! null-delimited key/value payload plus the online player names.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

/// Frames larger than this are treated as garbage, not read into memory.
const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// MOTD servers fall back to when they send nothing usable.
const DEFAULT_MOTD: &str = "A Minecraft Server";

#[derive(Debug, Error)]
pub enum PingError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Protocol(&'static str),

    #[error("invalid status payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalized result of one status-ping exchange.
#[derive(Debug, Clone)]
pub struct RawStatus {
    pub motd: String,
    pub version_name: String,
    pub max_players: u32,
    pub online_players: u32,
    /// Sampled online players; providers may cap or omit this entirely.
    pub sample: Vec<SampledPlayer>,
    /// Base64 PNG payload, already stripped of its data-URI prefix.
    pub icon: Option<String>,
    pub latency_ms: f64,
}

/// One entry of the status response's player sample, unvalidated.
#[derive(Debug, Clone)]
pub struct SampledPlayer {
    pub uuid: String,
    pub name: String,
}

/// Normalized result of one legacy query exchange.
#[derive(Debug, Clone)]
pub struct RawQuery {
    pub motd: String,
    pub version: String,
    /// Server software brand; `vanilla` when the server reports no plugins.
    pub software_brand: String,
    pub plugins: Vec<String>,
    pub map_name: String,
    pub max_players: u32,
    pub online_players: u32,
    /// Full online player name list (not capped like the status sample).
    pub players: Vec<String>,
}

// ============================================================================
// Status ping (TCP)
// ============================================================================

/// Perform one server-list status exchange.
pub async fn status_ping(
    host: &str,
    port: u16,
    deadline: Duration,
) -> Result<RawStatus, PingError> {
    match timeout(deadline, status_ping_inner(host, port)).await {
        Ok(result) => result,
        Err(_) => Err(PingError::Timeout),
    }
}

async fn status_ping_inner(host: &str, port: u16) -> Result<RawStatus, PingError> {
    let mut stream = TcpStream::connect((host, port)).await?;

    // Handshake with next-state = 1 (status). Protocol version -1 marks a
    // client that does not care about version negotiation.
    let mut handshake = Vec::with_capacity(host.len() + 16);
    write_varint(&mut handshake, 0x00);
    write_varint(&mut handshake, -1);
    write_varint(&mut handshake, host.len() as i32);
    handshake.extend_from_slice(host.as_bytes());
    handshake.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut handshake, 1);
    write_frame(&mut stream, &handshake).await?;

    // Latency is the status request/response round trip.
    let started = Instant::now();
    write_frame(&mut stream, &[0x00]).await?;
    let frame = read_frame(&mut stream).await?;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut body = frame.as_slice();
    let packet_id = read_varint_slice(&mut body)?;
    if packet_id != 0x00 {
        return Err(PingError::Protocol("unexpected status packet id"));
    }
    let json_len = read_varint_slice(&mut body)?;
    if json_len < 0 || body.len() < json_len as usize {
        return Err(PingError::Protocol("status payload length mismatch"));
    }

    let payload: StatusPayload = serde_json::from_slice(&body[..json_len as usize])?;

    Ok(RawStatus {
        motd: flatten_motd(&payload.description),
        version_name: payload.version.name,
        max_players: payload.players.max,
        online_players: payload.players.online,
        sample: payload
            .players
            .sample
            .unwrap_or_default()
            .into_iter()
            .map(|entry| SampledPlayer {
                uuid: entry.id,
                name: entry.name,
            })
            .collect(),
        icon: payload.favicon.as_deref().and_then(icon_payload),
        latency_ms,
    })
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    version: StatusVersion,
    players: StatusPlayers,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    favicon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusVersion {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatusPlayers {
    max: u32,
    online: u32,
    #[serde(default)]
    sample: Option<Vec<StatusSample>>,
}

#[derive(Debug, Deserialize)]
struct StatusSample {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

/// Flatten a status `description` into plain text. The field is either a
/// bare string or a chat-component tree (`text` plus nested `extra`).
fn flatten_motd(value: &Value) -> String {
    let mut out = String::new();
    collect_text(value, &mut out);
    if out.is_empty() {
        DEFAULT_MOTD.to_string()
    } else {
        out
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("text") {
                out.push_str(s);
            }
            if let Some(Value::Array(extra)) = map.get("extra") {
                for part in extra {
                    collect_text(part, out);
                }
            }
        }
        Value::Array(parts) => {
            for part in parts {
                collect_text(part, out);
            }
        }
        _ => {}
    }
}

/// Strip the favicon data URI down to its base64 payload. Payloads that do
/// not decode are dropped rather than stored.
fn icon_payload(favicon: &str) -> Option<String> {
    let payload = favicon.strip_prefix("data:image/png;base64,")?;
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(cleaned.as_bytes()).ok()?;
    Some(cleaned)
}

async fn write_frame(stream: &mut TcpStream, body: &[u8]) -> Result<(), PingError> {
    let mut frame = Vec::with_capacity(body.len() + 5);
    write_varint(&mut frame, body.len() as i32);
    frame.extend_from_slice(body);
    stream.write_all(&frame).await?;
    Ok(())
}

async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, PingError> {
    let len = read_varint(stream).await?;
    if len <= 0 || len as usize > MAX_FRAME_LEN {
        return Err(PingError::Protocol("unreasonable frame length"));
    }
    let mut frame = vec![0u8; len as usize];
    stream.read_exact(&mut frame).await?;
    Ok(frame)
}

async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, PingError> {
    let mut value = 0u32;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::Protocol("varint too long"))
}

fn read_varint_slice(buf: &mut &[u8]) -> Result<i32, PingError> {
    let mut value = 0u32;
    for i in 0..5 {
        let (&byte, rest) = buf
            .split_first()
            .ok_or(PingError::Protocol("truncated varint"))?;
        *buf = rest;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::Protocol("varint too long"))
}

fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut raw = value as u32;
    loop {
        let byte = (raw & 0x7F) as u8;
        raw >>= 7;
        if raw == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

// ============================================================================
// Legacy query (UDP)
// ============================================================================

// Session id bytes must keep their high nibbles clear on the wire.
const SESSION_ID: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Perform one full-stat query exchange.
pub async fn full_query(host: &str, port: u16, deadline: Duration) -> Result<RawQuery, PingError> {
    match timeout(deadline, full_query_inner(host, port)).await {
        Ok(result) => result,
        Err(_) => Err(PingError::Timeout),
    }
}

async fn full_query_inner(host: &str, port: u16) -> Result<RawQuery, PingError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((host, port)).await?;

    // Challenge handshake
    let mut packet = vec![0xFE, 0xFD, 0x09];
    packet.extend_from_slice(&SESSION_ID);
    socket.send(&packet).await?;

    let mut buf = [0u8; 64];
    let n = socket.recv(&mut buf).await?;
    let challenge = parse_challenge(&buf[..n])?;

    // Full stat request: challenge token plus four padding bytes
    let mut packet = vec![0xFE, 0xFD, 0x00];
    packet.extend_from_slice(&SESSION_ID);
    packet.extend_from_slice(&challenge.to_be_bytes());
    packet.extend_from_slice(&[0x00; 4]);
    socket.send(&packet).await?;

    let mut buf = vec![0u8; 8192];
    let n = socket.recv(&mut buf).await?;
    parse_full_stat(&buf[..n])
}

fn parse_challenge(buf: &[u8]) -> Result<i32, PingError> {
    if buf.len() < 6 || buf[0] != 0x09 {
        return Err(PingError::Protocol("bad challenge header"));
    }
    let token = &buf[5..];
    let end = token.iter().position(|&b| b == 0).unwrap_or(token.len());
    let text = std::str::from_utf8(&token[..end])
        .map_err(|_| PingError::Protocol("challenge is not utf-8"))?;
    text.trim()
        .parse()
        .map_err(|_| PingError::Protocol("challenge is not a number"))
}

fn parse_full_stat(buf: &[u8]) -> Result<RawQuery, PingError> {
    // Type byte, session id, then the constant 11-byte "splitnum" block
    if buf.len() < 16 || buf[0] != 0x00 {
        return Err(PingError::Protocol("bad full stat header"));
    }
    let mut rest = &buf[16..];

    let mut pairs: HashMap<String, String> = HashMap::new();
    loop {
        let key = take_cstring(&mut rest)?;
        if key.is_empty() {
            break;
        }
        let value = take_cstring(&mut rest)?;
        pairs.insert(key, value);
    }

    // Player section starts after the constant 10-byte "\x01player_\0\0" block
    if rest.len() >= 10 {
        rest = &rest[10..];
    }
    let mut players = Vec::new();
    while !rest.is_empty() {
        let name = take_cstring(&mut rest)?;
        if name.is_empty() {
            break;
        }
        players.push(name);
    }

    let (software_brand, plugins) = parse_plugins(pairs.get("plugins").map_or("", String::as_str));

    Ok(RawQuery {
        motd: pairs.remove("hostname").unwrap_or_default(),
        version: pairs.remove("version").unwrap_or_default(),
        software_brand,
        plugins,
        map_name: pairs.remove("map").unwrap_or_default(),
        max_players: parse_count(pairs.get("maxplayers"))?,
        online_players: parse_count(pairs.get("numplayers"))?,
        players,
    })
}

fn parse_count(value: Option<&String>) -> Result<u32, PingError> {
    match value {
        Some(text) => text
            .parse()
            .map_err(|_| PingError::Protocol("player count is not a number")),
        None => Ok(0),
    }
}

/// The `plugins` value looks like `"Brand 1.2.3: PluginA 1.0; PluginB"`.
/// Servers without plugins send an empty string and count as vanilla.
fn parse_plugins(raw: &str) -> (String, Vec<String>) {
    match raw.split_once(':') {
        Some((brand, list)) => (
            brand.trim().to_string(),
            list.split(';')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        ),
        None if raw.trim().is_empty() => ("vanilla".to_string(), Vec::new()),
        None => (raw.trim().to_string(), Vec::new()),
    }
}

fn take_cstring(rest: &mut &[u8]) -> Result<String, PingError> {
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(PingError::Protocol("unterminated string"))?;
    let text = String::from_utf8_lossy(&rest[..end]).into_owned();
    *rest = &rest[end + 1..];
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_varint_round_trip() {
        for value in [0, 1, 127, 128, 255, 25565, i32::MAX, -1] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            let mut slice = buf.as_slice();
            assert_eq!(read_varint_slice(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn test_varint_negative_is_five_bytes() {
        let mut buf = Vec::new();
        write_varint(&mut buf, -1);
        assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_truncated_varint_rejected() {
        let mut slice: &[u8] = &[0x80, 0x80];
        assert!(matches!(
            read_varint_slice(&mut slice),
            Err(PingError::Protocol(_))
        ));
    }

    #[test]
    fn test_flatten_motd_plain_string() {
        assert_eq!(flatten_motd(&json!("Hello world")), "Hello world");
    }

    #[test]
    fn test_flatten_motd_chat_components() {
        let description = json!({
            "text": "Welcome to ",
            "extra": [
                { "text": "Spyglass", "color": "gold" },
                { "text": "!" }
            ]
        });
        assert_eq!(flatten_motd(&description), "Welcome to Spyglass!");
    }

    #[test]
    fn test_flatten_motd_missing_falls_back() {
        assert_eq!(flatten_motd(&Value::Null), "A Minecraft Server");
    }

    #[test]
    fn test_icon_payload_strips_data_uri() {
        // Shortest valid PNG magic, base64-encoded
        assert_eq!(
            icon_payload("data:image/png;base64,iVBORw0KGgo=").as_deref(),
            Some("iVBORw0KGgo=")
        );
    }

    #[test]
    fn test_icon_payload_rejects_garbage() {
        assert!(icon_payload("iVBORw0KGgo=").is_none()); // no data-URI prefix
        assert!(icon_payload("data:image/png;base64,???").is_none()); // not base64
    }

    #[test]
    fn test_parse_plugins_brand_and_list() {
        let (brand, plugins) = parse_plugins("Paper on Spigot 1.20.4: WorldEdit 7.2; Essentials");
        assert_eq!(brand, "Paper on Spigot 1.20.4");
        assert_eq!(plugins, vec!["WorldEdit 7.2", "Essentials"]);
    }

    #[test]
    fn test_parse_plugins_empty_is_vanilla() {
        let (brand, plugins) = parse_plugins("");
        assert_eq!(brand, "vanilla");
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_parse_plugins_brand_only() {
        let (brand, plugins) = parse_plugins("CraftBukkit on Bukkit 1.2.5-R4.0");
        assert_eq!(brand, "CraftBukkit on Bukkit 1.2.5-R4.0");
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_parse_challenge() {
        let mut packet = vec![0x09, 0x00, 0x00, 0x00, 0x01];
        packet.extend_from_slice(b"9513307\0");
        assert_eq!(parse_challenge(&packet).unwrap(), 9513307);
    }

    #[test]
    fn test_parse_challenge_rejects_wrong_type() {
        assert!(parse_challenge(&[0x00, 0, 0, 0, 1, b'1', 0]).is_err());
    }

    #[test]
    fn test_parse_full_stat() {
        let mut packet = vec![0x00, 0x00, 0x00, 0x00, 0x01];
        packet.extend_from_slice(b"splitnum\x00\x80\x00");
        for (key, value) in [
            ("hostname", "A Query MOTD"),
            ("gametype", "SMP"),
            ("version", "1.20.4"),
            ("plugins", "Paper 1.20.4: WorldEdit 7.2"),
            ("map", "world"),
            ("numplayers", "2"),
            ("maxplayers", "20"),
        ] {
            packet.extend_from_slice(key.as_bytes());
            packet.push(0);
            packet.extend_from_slice(value.as_bytes());
            packet.push(0);
        }
        packet.push(0);
        packet.extend_from_slice(b"\x01player_\x00\x00");
        packet.extend_from_slice(b"Steve\x00jeb_\x00\x00");

        let query = parse_full_stat(&packet).unwrap();
        assert_eq!(query.motd, "A Query MOTD");
        assert_eq!(query.version, "1.20.4");
        assert_eq!(query.software_brand, "Paper 1.20.4");
        assert_eq!(query.plugins, vec!["WorldEdit 7.2"]);
        assert_eq!(query.map_name, "world");
        assert_eq!(query.online_players, 2);
        assert_eq!(query.max_players, 20);
        assert_eq!(query.players, vec!["Steve", "jeb_"]);
    }

    #[test]
    fn test_parse_full_stat_rejects_short_packet() {
        assert!(parse_full_stat(&[0x00, 0x00]).is_err());
    }
}
