//! Merging protocol responses into one persistable record shape.

use spyglass_db::{NewPlayer, NewRecord, Server};
use uuid::Uuid;

use crate::protocol::{RawQuery, RawStatus};
use crate::validation::parse_username;

/// Merge one status response and an optional query response into a record
/// draft for `server`.
///
/// When a query response is present it is authoritative for the fields it
/// carries; the status response fills in everything else. Latency and icon
/// only exist on the status side. Gamemode is a Bedrock-only field and
/// stays empty on this path.
pub fn merge(server: &Server, status: RawStatus, query: Option<RawQuery>) -> NewRecord {
    let players = sample_players(&status);

    match query {
        Some(query) => NewRecord {
            id: None,
            server_address: server.address.clone(),
            used_query: true,
            max_players: query.max_players,
            online_players: query.online_players,
            motd: query.motd,
            latency_ms: status.latency_ms,
            version_name: query.version,
            version_brand: Some(query.software_brand),
            map_name: Some(query.map_name),
            gamemode: None,
            icon: status.icon,
            plugins: Some(query.plugins),
            players,
        },
        None => NewRecord {
            id: None,
            server_address: server.address.clone(),
            used_query: false,
            max_players: status.max_players,
            online_players: status.online_players,
            motd: status.motd,
            latency_ms: status.latency_ms,
            version_name: status.version_name,
            version_brand: None,
            map_name: None,
            gamemode: None,
            icon: status.icon,
            plugins: None,
            players,
        },
    }
}

/// The player sample always comes from the status response. Entries whose
/// username fails validation are dropped without comment.
fn sample_players(status: &RawStatus) -> Vec<NewPlayer> {
    status
        .sample
        .iter()
        .filter_map(|entry| {
            let name = parse_username(&entry.name)?;
            Some(NewPlayer {
                uuid: entry.uuid.clone(),
                username: name.as_str().to_string(),
                premium: is_premium(&entry.uuid),
            })
        })
        .collect()
}

/// Offline accounts carry a v3 UUID derived from the username; anything
/// else, including ids that do not parse at all, counts as provider-issued.
/// Provenance only, never validated against the identity provider.
fn is_premium(uuid: &str) -> bool {
    match Uuid::parse_str(uuid) {
        Ok(parsed) => parsed.get_version_num() != 3,
        Err(_) => true,
    }
}
