mod error;
mod models;

pub use error::{DbError, Result};
pub use models::{
  NewPlayer, NewRecord, NewServer, Player, Record, Server, ServerFilter, ServerKind,
};

use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

/// Rows per page for the browse listings.
pub const PAGE_SIZE: u32 = 100;

/// Database wrapper for all Spyglass operations.
#[derive(Clone)]
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create a database at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await.map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Initialize the database schema.
  async fn initialize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        // WAL for concurrent reads while a sweep is committing
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Foreign keys drive the cascade deletes (must be set per-connection)
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute_batch(
          r#"
          -- Known, trackable server addresses
          CREATE TABLE IF NOT EXISTS servers (
              address TEXT PRIMARY KEY,
              discovered_at INTEGER NOT NULL,
              name TEXT,
              kind TEXT NOT NULL DEFAULT 'java',
              source TEXT NOT NULL DEFAULT 'unknown'
          );

          -- Point-in-time observations, one row per poll
          CREATE TABLE IF NOT EXISTS records (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              server_address TEXT NOT NULL REFERENCES servers(address) ON DELETE CASCADE,
              timestamp INTEGER NOT NULL,
              used_query INTEGER NOT NULL DEFAULT 0,
              max_players INTEGER NOT NULL,
              online_players INTEGER NOT NULL,
              motd TEXT NOT NULL DEFAULT 'A Minecraft Server',
              latency_ms REAL NOT NULL,
              version_name TEXT NOT NULL,
              version_brand TEXT,
              map_name TEXT,
              gamemode TEXT,
              icon TEXT,
              plugins TEXT
          );

          -- Sampled account identities, shared across records
          CREATE TABLE IF NOT EXISTS players (
              uuid TEXT PRIMARY KEY,
              username TEXT NOT NULL,
              premium INTEGER NOT NULL DEFAULT 1,
              first_seen_at INTEGER NOT NULL
          );

          -- Which players were sampled in which record
          CREATE TABLE IF NOT EXISTS record_players (
              player_uuid TEXT NOT NULL REFERENCES players(uuid) ON DELETE CASCADE,
              record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
              PRIMARY KEY (player_uuid, record_id)
          );

          CREATE INDEX IF NOT EXISTS idx_records_server ON records(server_address);
          CREATE INDEX IF NOT EXISTS idx_records_timestamp ON records(timestamp);
          CREATE INDEX IF NOT EXISTS idx_record_players_record ON record_players(record_id);
          "#,
        )?;
        Ok(())
      })
      .await?;

    info!("database initialized");
    Ok(())
  }

  // ========================================================================
  // Servers
  // ========================================================================

  /// Insert-or-update a server keyed by address.
  ///
  /// An existing row keeps its `discovered_at`; name, kind and source are
  /// refreshed from the new sighting.
  pub async fn upsert_server(&self, server: NewServer, now: i64) -> Result<()> {
    let address_log = server.address.clone();

    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "INSERT INTO servers (address, discovered_at, name, kind, source) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(address) DO UPDATE SET \
               name = excluded.name, kind = excluded.kind, source = excluded.source",
          )?
          .execute(params![
            &server.address,
            now,
            &server.name,
            &server.kind,
            &server.source
          ])?;
        Ok(())
      })
      .await?;

    debug!(address = %address_log, "upserted server");
    Ok(())
  }

  /// Upsert one page of scraped servers in a single transaction.
  pub async fn upsert_servers(&self, servers: Vec<NewServer>, now: i64) -> Result<usize> {
    let count = servers.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO servers (address, discovered_at, name, kind, source) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(address) DO UPDATE SET \
               name = excluded.name, kind = excluded.kind, source = excluded.source",
          )?;
          for server in &servers {
            stmt.execute(params![
              &server.address,
              now,
              &server.name,
              &server.kind,
              &server.source
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(count, "upserted server batch");
    Ok(count)
  }

  /// Load every known server. Seeds a sweep.
  pub async fn all_servers(&self) -> Result<Vec<Server>> {
    let servers = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT address, discovered_at, name, kind, source FROM servers ORDER BY address",
        )?;

        let servers = stmt
          .query_map([], read_server)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(servers)
      })
      .await?;

    Ok(servers)
  }

  /// Get one server by address.
  pub async fn get_server(&self, address: String) -> Result<Option<Server>> {
    let server = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "SELECT address, discovered_at, name, kind, source FROM servers WHERE address = ?1",
          )?
          .query_row(params![&address], read_server)
          .optional()
      })
      .await?;

    Ok(server)
  }

  /// Page through servers, newest discoveries first.
  pub async fn list_servers(&self, filter: ServerFilter, page: u32) -> Result<Vec<Server>> {
    let offset = page_offset(page);

    let servers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT address, discovered_at, name, kind, source FROM servers \
           WHERE (?1 IS NULL \
                  OR address LIKE '%' || ?1 || '%' \
                  OR name LIKE '%' || ?1 || '%' \
                  OR source LIKE '%' || ?1 || '%') \
             AND (?2 IS NULL OR kind = ?2) \
           ORDER BY discovered_at DESC, address \
           LIMIT ?3 OFFSET ?4",
        )?;

        let servers = stmt
          .query_map(params![&filter.q, &filter.kind, PAGE_SIZE, offset], read_server)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(servers)
      })
      .await?;

    Ok(servers)
  }

  /// Delete a server; its records and association rows cascade away.
  pub async fn delete_server(&self, address: String) -> Result<()> {
    let result = self
      .conn
      .call(move |conn| {
        let deleted = conn
          .prepare_cached("DELETE FROM servers WHERE address = ?1")?
          .execute(params![&address])?;

        if deleted == 0 {
          return Ok(Err(DbError::ServerNotFound));
        }

        Ok(Ok(()))
      })
      .await??;

    debug!("deleted server");
    Ok(result)
  }

  // ========================================================================
  // Records
  // ========================================================================

  /// Persist one observation. See [`Database::save_records`].
  pub async fn save_record(&self, draft: NewRecord, now: i64) -> Result<i64> {
    let mut ids = self.save_records(vec![draft], now).await?;
    Ok(ids.pop().unwrap_or_default())
  }

  /// Persist a batch of observations in one transaction.
  ///
  /// The transaction commit is the durability boundary: either the whole
  /// batch lands or none of it does. Drafts carrying an explicit id are
  /// merged on conflict instead of inserted, so replaying a batch with the
  /// same id set produces no duplicate rows. Player upserts are keyed by
  /// uuid and preserve `first_seen_at` and `premium` from the first
  /// sighting.
  pub async fn save_records(&self, drafts: Vec<NewRecord>, now: i64) -> Result<Vec<i64>> {
    let count = drafts.len();

    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(drafts.len());
        for draft in &drafts {
          ids.push(insert_record(&tx, draft, now)?);
        }

        tx.commit()?;
        Ok(ids)
      })
      .await?;

    debug!(count, "saved record batch");
    Ok(ids)
  }

  /// Page through records, newest first, optionally for one server.
  pub async fn list_records(&self, server: Option<String>, page: u32) -> Result<Vec<Record>> {
    let offset = page_offset(page);

    let records = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT id, server_address, timestamp, used_query, max_players, online_players, \
                  motd, latency_ms, version_name, version_brand, map_name, gamemode, icon, plugins \
           FROM records \
           WHERE (?1 IS NULL OR server_address = ?1) \
           ORDER BY timestamp DESC, id DESC \
           LIMIT ?2 OFFSET ?3",
        )?;

        let records = stmt
          .query_map(params![&server, PAGE_SIZE, offset], read_record)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
      })
      .await?;

    Ok(records)
  }

  /// Most recent records for one server.
  pub async fn records_for_server(&self, address: String, limit: u32) -> Result<Vec<Record>> {
    let records = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT id, server_address, timestamp, used_query, max_players, online_players, \
                  motd, latency_ms, version_name, version_brand, map_name, gamemode, icon, plugins \
           FROM records WHERE server_address = ?1 \
           ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;

        let records = stmt
          .query_map(params![&address, limit], read_record)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
      })
      .await?;

    Ok(records)
  }

  /// Players sampled by one record.
  pub async fn players_for_record(&self, record_id: i64) -> Result<Vec<Player>> {
    let players = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT p.uuid, p.username, p.premium, p.first_seen_at \
           FROM players p \
           JOIN record_players rp ON rp.player_uuid = p.uuid \
           WHERE rp.record_id = ?1 \
           ORDER BY p.username, p.uuid",
        )?;

        let players = stmt
          .query_map(params![record_id], read_player)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(players)
      })
      .await?;

    Ok(players)
  }

  // ========================================================================
  // Players
  // ========================================================================

  /// Get one player by uuid.
  pub async fn get_player(&self, uuid: String) -> Result<Option<Player>> {
    let player = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "SELECT uuid, username, premium, first_seen_at FROM players WHERE uuid = ?1",
          )?
          .query_row(params![&uuid], read_player)
          .optional()
      })
      .await?;

    Ok(player)
  }

  /// Page through players ordered by username.
  pub async fn list_players(&self, q: Option<String>, page: u32) -> Result<Vec<Player>> {
    let offset = page_offset(page);

    let players = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT uuid, username, premium, first_seen_at FROM players \
           WHERE (?1 IS NULL \
                  OR username LIKE '%' || ?1 || '%' \
                  OR uuid LIKE '%' || ?1 || '%') \
           ORDER BY username, uuid \
           LIMIT ?2 OFFSET ?3",
        )?;

        let players = stmt
          .query_map(params![&q, PAGE_SIZE, offset], read_player)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(players)
      })
      .await?;

    Ok(players)
  }
}

fn page_offset(page: u32) -> i64 {
  i64::from(page.saturating_sub(1)) * i64::from(PAGE_SIZE)
}

fn read_server(row: &rusqlite::Row<'_>) -> rusqlite::Result<Server> {
  Ok(Server {
    address: row.get(0)?,
    discovered_at: row.get(1)?,
    name: row.get(2)?,
    kind: row.get(3)?,
    source: row.get(4)?,
  })
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
  Ok(Record {
    id: row.get(0)?,
    server_address: row.get(1)?,
    timestamp: row.get(2)?,
    used_query: row.get(3)?,
    max_players: row.get(4)?,
    online_players: row.get(5)?,
    motd: row.get(6)?,
    latency_ms: row.get(7)?,
    version_name: row.get(8)?,
    version_brand: row.get(9)?,
    map_name: row.get(10)?,
    gamemode: row.get(11)?,
    icon: row.get(12)?,
    plugins: row.get(13)?,
  })
}

fn read_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
  Ok(Player {
    uuid: row.get(0)?,
    username: row.get(1)?,
    premium: row.get(2)?,
    first_seen_at: row.get(3)?,
  })
}

/// Write one record plus its player sample inside the caller's transaction.
fn insert_record(
  conn: &rusqlite::Connection,
  draft: &NewRecord,
  now: i64,
) -> rusqlite::Result<i64> {
  let plugins_json = match &draft.plugins {
    Some(list) => Some(
      serde_json::to_string(list)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
    ),
    None => None,
  };

  let record_id = match draft.id {
    Some(id) => {
      conn
        .prepare_cached(
          "INSERT INTO records (id, server_address, timestamp, used_query, max_players, \
             online_players, motd, latency_ms, version_name, version_brand, map_name, \
             gamemode, icon, plugins) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
           ON CONFLICT(id) DO UPDATE SET \
             server_address = excluded.server_address, timestamp = excluded.timestamp, \
             used_query = excluded.used_query, max_players = excluded.max_players, \
             online_players = excluded.online_players, motd = excluded.motd, \
             latency_ms = excluded.latency_ms, version_name = excluded.version_name, \
             version_brand = excluded.version_brand, map_name = excluded.map_name, \
             gamemode = excluded.gamemode, icon = excluded.icon, plugins = excluded.plugins",
        )?
        .execute(params![
          id,
          &draft.server_address,
          now,
          draft.used_query,
          draft.max_players,
          draft.online_players,
          &draft.motd,
          draft.latency_ms,
          &draft.version_name,
          &draft.version_brand,
          &draft.map_name,
          &draft.gamemode,
          &draft.icon,
          &plugins_json
        ])?;
      id
    }
    None => {
      conn
        .prepare_cached(
          "INSERT INTO records (server_address, timestamp, used_query, max_players, \
             online_players, motd, latency_ms, version_name, version_brand, map_name, \
             gamemode, icon, plugins) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?
        .execute(params![
          &draft.server_address,
          now,
          draft.used_query,
          draft.max_players,
          draft.online_players,
          &draft.motd,
          draft.latency_ms,
          &draft.version_name,
          &draft.version_brand,
          &draft.map_name,
          &draft.gamemode,
          &draft.icon,
          &plugins_json
        ])?;
      conn.last_insert_rowid()
    }
  };

  for player in &draft.players {
    conn
      .prepare_cached(
        "INSERT INTO players (uuid, username, premium, first_seen_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(uuid) DO UPDATE SET username = excluded.username",
      )?
      .execute(params![&player.uuid, &player.username, player.premium, now])?;

    conn
      .prepare_cached(
        "INSERT OR IGNORE INTO record_players (player_uuid, record_id) VALUES (?1, ?2)",
      )?
      .execute(params![&player.uuid, record_id])?;
  }

  Ok(record_id)
}
