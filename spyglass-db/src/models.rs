use serde::Serialize;

/// Protocol family a tracked server speaks.
///
/// `servers.kind` is stored as text so rows scraped with a kind this build
/// does not know about survive in the database; `parse` is the boundary
/// where callers decide what to do with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
  Java,
  Bedrock,
}

impl ServerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ServerKind::Java => "java",
      ServerKind::Bedrock => "bedrock",
    }
  }

  /// Parse the stored kind. `None` for anything that is neither
  /// `java` nor `bedrock`.
  pub fn parse(s: &str) -> Option<ServerKind> {
    match s {
      "java" => Some(ServerKind::Java),
      "bedrock" => Some(ServerKind::Bedrock),
      _ => None,
    }
  }
}

/// A known, trackable server address.
#[derive(Debug, Clone, Serialize)]
pub struct Server {
  /// `host:port`, the unique identifier
  pub address: String,
  /// Unix timestamp of the first time this address was scraped
  pub discovered_at: i64,
  /// Display name as shown on the listing site
  pub name: Option<String>,
  /// `java` or `bedrock` (raw column text, see [`ServerKind::parse`])
  pub kind: String,
  /// Provenance URL the address was scraped from
  pub source: String,
}

/// Input shape for [`crate::Database::upsert_server`].
#[derive(Debug, Clone)]
pub struct NewServer {
  pub address: String,
  pub name: Option<String>,
  pub kind: String,
  pub source: String,
}

/// One point-in-time observation of a server.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
  /// Surrogate id; timestamps are not guaranteed unique
  pub id: i64,
  pub server_address: String,
  /// Unix timestamp of the observation
  pub timestamp: i64,
  /// Whether the legacy query protocol supplemented the status ping
  pub used_query: bool,
  pub max_players: u32,
  pub online_players: u32,
  /// Server MOTD (as shown in the server list)
  pub motd: String,
  pub latency_ms: f64,
  /// Version string as shown in the server list
  pub version_name: String,
  /// Server software brand, query responses only
  pub version_brand: Option<String>,
  /// World name (Java: via query only)
  pub map_name: Option<String>,
  /// Gamemode name (Bedrock only)
  pub gamemode: Option<String>,
  /// Server icon, base64-encoded PNG payload
  pub icon: Option<String>,
  /// JSON array of plugin names, query responses only
  pub plugins: Option<String>,
}

/// A not-yet-persisted observation, as produced by the ingestion pipeline.
///
/// `id` is normally `None` (the row id is assigned on insert); a caller
/// replaying a draft with an explicit id gets merge-on-conflict semantics
/// instead of a duplicate row.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub id: Option<i64>,
  pub server_address: String,
  pub used_query: bool,
  pub max_players: u32,
  pub online_players: u32,
  pub motd: String,
  pub latency_ms: f64,
  pub version_name: String,
  pub version_brand: Option<String>,
  pub map_name: Option<String>,
  pub gamemode: Option<String>,
  pub icon: Option<String>,
  pub plugins: Option<Vec<String>>,
  /// Sampled online players to attach to this record
  pub players: Vec<NewPlayer>,
}

/// A Minecraft account identity.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
  /// 36-char canonical UUID. Offline accounts carry a v3 UUID derived
  /// from the username, Mojang accounts a v4 one.
  pub uuid: String,
  pub username: String,
  /// Provider-issued account vs. offline/self-generated
  pub premium: bool,
  /// Unix timestamp of the first record that sampled this account
  pub first_seen_at: i64,
}

/// Player reference carried by a [`NewRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
  pub uuid: String,
  pub username: String,
  pub premium: bool,
}

/// Optional LIKE filters for the server listing.
#[derive(Debug, Clone, Default)]
pub struct ServerFilter {
  /// Substring match against address, name, or source
  pub q: Option<String>,
  /// Exact kind match
  pub kind: Option<String>,
}
