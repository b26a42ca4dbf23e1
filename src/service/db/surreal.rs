//! SurrealDB implementation of the conversation history store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{info, instrument, warn};

use crate::base::{
    config::{Config, ConfigInner},
    types::{Res, Void},
};

use super::{DbClient, GenericDbClient, Turn, truncate_chars};

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Connects to the SurrealDB instance named by the config.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates a client backed by a fresh in-memory database.
    pub async fn surreal_memory() -> Res<Self> {
        let config = Config::from(ConfigInner::local());
        Self::surreal(&config).await
    }
}

// Records.

/// An exchange as written to the `exchange` table.
///
/// `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, Serialize)]
struct NewExchange {
    prompt: String,
    completion: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

// Specific implementations.

/// SurrealDB client implementation.
///
/// The underlying `Surreal` handle multiplexes requests, so clones share one connection
/// and every operation is a single independent statement.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
    max_field_chars: usize,
}

impl SurrealDbClient {
    /// Connect, sign in, select the namespace, and define the schema.
    #[instrument(name = "SurrealDbClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let db = any::connect(config.db_endpoint.as_str()).await?;

        // Authenticate with the database, when credentials are provided.
        if !config.db_username.is_empty() {
            db.signin(Root {
                username: &config.db_username,
                password: &config.db_password,
            })
            .await?;
        }

        db.use_ns(config.db_namespace.as_str()).use_db(config.db_database.as_str()).await?;

        // Define schemas.

        db.query(
            "
            DEFINE TABLE IF NOT EXISTS exchange SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS prompt ON exchange TYPE string;
            DEFINE FIELD IF NOT EXISTS completion ON exchange TYPE string;
            DEFINE FIELD IF NOT EXISTS channel_id ON exchange TYPE string;
            DEFINE FIELD IF NOT EXISTS created_at ON exchange TYPE datetime DEFAULT time::now() READONLY;
            DEFINE INDEX IF NOT EXISTS exchange_channel ON exchange FIELDS channel_id;
            ",
        )
        .await?
        .check()?;

        info!("Database initialized successfully.");

        Ok(Self {
            db,
            max_field_chars: config.max_field_chars,
        })
    }

    fn bounded(&self, field: &str, text: &str) -> String {
        let bounded = truncate_chars(text, self.max_field_chars);

        if bounded.len() < text.len() {
            warn!("Truncating `{}` to {} characters before storage.", field, self.max_field_chars);
        }

        bounded.to_string()
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self, prompt, completion))]
    async fn append(&self, prompt: &str, completion: &str, channel_id: &str) -> Void {
        let record = NewExchange {
            prompt: self.bounded("prompt", prompt),
            completion: self.bounded("completion", completion),
            channel_id: channel_id.to_string(),
        };

        // ULID record IDs sort by creation time.
        self.db.query("CREATE exchange:ulid() CONTENT $record").bind(("record", record)).await?.check()?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_ordered(&self, channel_id: &str) -> Res<Vec<Turn>> {
        let mut response = self
            .db
            .query("SELECT id, prompt, completion, created_at FROM exchange WHERE channel_id = $channel_id ORDER BY created_at ASC, id ASC")
            .bind(("channel_id", channel_id.to_string()))
            .await?
            .check()?;

        let turns: Vec<Turn> = response.take(0)?;

        info!("Found {} turns for channel `{}`.", turns.len(), channel_id);

        Ok(turns)
    }

    #[instrument(skip(self))]
    async fn count(&self, channel_id: &str) -> Res<u64> {
        let mut response = self
            .db
            .query("SELECT count() FROM exchange WHERE channel_id = $channel_id GROUP ALL")
            .bind(("channel_id", channel_id.to_string()))
            .await?
            .check()?;

        let row: Option<CountRow> = response.take(0)?;

        Ok(row.map(|r| r.count).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn clear(&self, channel_id: &str) -> Void {
        self.db
            .query("DELETE exchange WHERE channel_id = $channel_id")
            .bind(("channel_id", channel_id.to_string()))
            .await?
            .check()?;

        info!("Cleared history for channel `{}`.", channel_id);

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_are_listed_in_order() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.append("hi", "hello", "C1").await.unwrap();
        db.append("how are you", "fine", "C1").await.unwrap();

        let turns = db.list_ordered("C1").await.unwrap();

        assert_eq!(turns, vec![Turn::new("hi", "hello"), Turn::new("how are you", "fine")]);
        assert_eq!(db.count("C1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_channel_has_no_turns() {
        let db = DbClient::surreal_memory().await.unwrap();

        assert!(db.list_ordered("C-EMPTY").await.unwrap().is_empty());
        assert_eq!(db.count("C-EMPTY").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn count_tracks_list_length() {
        let db = DbClient::surreal_memory().await.unwrap();

        for i in 0..7 {
            db.append(&format!("question {i}"), &format!("answer {i}"), "C2").await.unwrap();

            let listed = db.list_ordered("C2").await.unwrap();
            assert_eq!(db.count("C2").await.unwrap(), listed.len() as u64);
            assert_eq!(listed.last().unwrap(), &Turn::new(format!("question {i}"), format!("answer {i}")));
        }
    }

    #[tokio::test]
    async fn clear_is_scoped_to_one_channel() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.append("a1", "b1", "CA").await.unwrap();
        db.append("a2", "b2", "CA").await.unwrap();
        db.append("x1", "y1", "CB").await.unwrap();

        db.clear("CA").await.unwrap();

        assert!(db.list_ordered("CA").await.unwrap().is_empty());
        assert_eq!(db.count("CA").await.unwrap(), 0);
        assert_eq!(db.list_ordered("CB").await.unwrap(), vec![Turn::new("x1", "y1")]);
    }

    #[tokio::test]
    async fn clear_on_empty_channel_succeeds() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.clear("C-NOTHING").await.unwrap();

        assert_eq!(db.count("C-NOTHING").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn long_fields_are_truncated() {
        let db = DbClient::surreal_memory().await.unwrap();
        let long = "x".repeat(600);

        db.append(&long, &long, "C3").await.unwrap();

        let turns = db.list_ordered("C3").await.unwrap();
        assert_eq!(turns[0].prompt.chars().count(), 500);
        assert_eq!(turns[0].completion.chars().count(), 500);
    }

    #[tokio::test]
    async fn channel_ids_are_bound_not_interpolated() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.append("p", "c", "C4").await.unwrap();
        db.clear("C4' OR true OR '").await.unwrap();

        assert_eq!(db.count("C4").await.unwrap(), 1);
    }
}
