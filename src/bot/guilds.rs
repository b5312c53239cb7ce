//! Guild bookkeeping on top of the data store.
//!
//! Every guild the bot sits in gets a row in the `guilds` table when the bot
//! becomes ready. The row's `prefix` column overrides the default prefix and
//! is mirrored in a [`PrefixCache`].

use crate::entities::TableName;
use crate::errors::{Error, Result};
use crate::store::{Connector, DataStore, Params, SelectOptions};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Longest prefix a guild may configure.
pub const MAX_PREFIX_LEN: usize = 16;

fn to_db_id(guild_id: u64) -> Result<i64> {
    i64::try_from(guild_id).map_err(|_| Error::Command {
        message: format!("Guild ID {guild_id} is out of range"),
    })
}

/// IDs of every guild already recorded in the database.
pub async fn registered_guild_ids<C: Connector>(store: &DataStore<C>) -> Result<HashSet<i64>> {
    let rows = store
        .select(TableName::Guilds, &SelectOptions::new().columns(["guild_id"]))
        .await?;
    Ok(rows.iter().filter_map(|row| row.get_i64("guild_id")).collect())
}

/// Records the guilds that are not in the database yet.
///
/// Returns how many rows were inserted.
#[instrument(skip(store, guild_ids))]
pub async fn register_new_guilds<C, I>(store: &DataStore<C>, guild_ids: I) -> Result<usize>
where
    C: Connector,
    I: IntoIterator<Item = u64>,
{
    let mut known = registered_guild_ids(store).await?;
    let mut added = 0;
    for guild_id in guild_ids {
        let id = to_db_id(guild_id)?;
        if !known.insert(id) {
            continue;
        }
        store
            .insert(TableName::Guilds, &Params::from([("guild_id", id)]))
            .await?;
        debug!("Registered guild {}", guild_id);
        added += 1;
    }
    Ok(added)
}

/// Every prefix override stored in the database, keyed by guild ID.
pub async fn load_guild_prefixes<C: Connector>(
    store: &DataStore<C>,
) -> Result<HashMap<u64, String>> {
    let rows = store.select(TableName::Guilds, &SelectOptions::new()).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let guild_id = u64::try_from(row.get_i64("guild_id")?).ok()?;
            Some((guild_id, row.get_str("prefix")?.to_string()))
        })
        .collect())
}

/// Sets or clears a guild's prefix, registering the guild if needed.
#[instrument(skip(store))]
pub async fn set_guild_prefix<C: Connector>(
    store: &DataStore<C>,
    guild_id: u64,
    prefix: Option<&str>,
) -> Result<()> {
    let id = to_db_id(guild_id)?;
    let filter = Params::from([("guild_id", id)]);
    let data = Params::from([("prefix", prefix.map(str::to_string))]);

    // MySQL counts unchanged rows as unaffected.
    if store.update(TableName::Guilds, &data, &filter).await? == 0 {
        let row = Params::new()
            .with("guild_id", id)
            .with("prefix", prefix.map(str::to_string));
        match store.insert(TableName::Guilds, &row).await {
            Ok(_) => {}
            Err(Error::Database(e)) => {
                debug!("Guild {} already registered: {}", guild_id, e);
                store.update(TableName::Guilds, &data, &filter).await?;
            }
            Err(e) => return Err(e),
        }
    }
    info!("Guild {} prefix set to {:?}", guild_id, prefix);
    Ok(())
}

/// In-memory copy of the per-guild prefixes.
///
/// Prefix resolution runs for every message, so it reads only this cache and
/// never waits on the database.
#[derive(Clone, Debug, Default)]
pub struct PrefixCache {
    prefixes: Arc<RwLock<HashMap<u64, String>>>,
}

impl PrefixCache {
    /// Replaces the cache content with the prefixes stored in the database.
    pub async fn refresh<C: Connector>(&self, store: &DataStore<C>) -> Result<usize> {
        info!("Refreshing guild prefix cache...");
        let prefixes = load_guild_prefixes(store).await?;
        let mut cache_writer = self.prefixes.write().await;
        *cache_writer = prefixes;
        info!("Guild prefix cache refreshed with {} items.", cache_writer.len());
        Ok(cache_writer.len())
    }

    /// Cached override for `guild_id`.
    pub async fn get(&self, guild_id: u64) -> Option<String> {
        self.prefixes.read().await.get(&guild_id).cloned()
    }

    /// Records a new override, `None` clears it.
    pub async fn set(&self, guild_id: u64, prefix: Option<String>) {
        let mut cache_writer = self.prefixes.write().await;
        match prefix {
            Some(prefix) => cache_writer.insert(guild_id, prefix),
            None => cache_writer.remove(&guild_id),
        };
    }

    /// Prefix to use for a message: the guild's override, else `default`.
    pub async fn resolve(&self, guild_id: Option<u64>, default: &str) -> String {
        match guild_id {
            Some(id) => self.get(id).await.unwrap_or_else(|| default.to_string()),
            None => default.to_string(),
        }
    }
}

/// Trims a user-supplied prefix; blank means "reset to default".
///
/// # Errors
/// `Error::Command` if the prefix is longer than [`MAX_PREFIX_LEN`] or
/// contains whitespace.
pub fn normalize_prefix(raw: Option<&str>) -> Result<Option<String>> {
    let Some(prefix) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(Error::Command {
            message: format!("Prefix must be at most {MAX_PREFIX_LEN} characters"),
        });
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(Error::Command {
            message: "Prefix cannot contain spaces".to_string(),
        });
    }
    Ok(Some(prefix.to_string()))
}
