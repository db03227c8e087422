// Database access layer (SQLite via sqlx).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct League {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: String,
    pub league_id: String,
    pub player1: String,
    pub player2: String,
    pub player1_score: i64,
    pub player2_score: i64,
    pub winner: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: String,
    pub league_id: String,
    pub name: String,
    pub created_at: String,
}

const LEAGUE_COLUMNS: &str = "id, name, description, created_at, updated_at";
const MATCH_COLUMNS: &str =
    "id, league_id, player1, player2, player1_score, player2_score, winner, created_at, updated_at";
const PLAYER_COLUMNS: &str = "id, league_id, name, created_at";

/// Millisecond-precision UTC timestamp. SQLite's `datetime('now')` only has
/// second resolution, too coarse to order matches recorded back-to-back.
fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leagues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                player1 TEXT NOT NULL,
                player2 TEXT NOT NULL,
                player1_score INTEGER NOT NULL,
                player2_score INTEGER NOT NULL,
                winner TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                league_id TEXT NOT NULL REFERENCES leagues(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(league_id, name)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── League CRUD ───────────────────────────────────────────────────

    pub async fn create_league(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<League, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now();
        let row = sqlx::query_as::<_, League>(&format!(
            "INSERT INTO leagues (id, name, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {LEAGUE_COLUMNS}",
        ))
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// List all leagues, newest first.
    pub async fn list_leagues(&self) -> Result<Vec<League>, sqlx::Error> {
        let rows = sqlx::query_as::<_, League>(&format!(
            "SELECT {LEAGUE_COLUMNS} FROM leagues ORDER BY created_at DESC, rowid DESC",
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_league(&self, id: &str) -> Result<Option<League>, sqlx::Error> {
        let row = sqlx::query_as::<_, League>(&format!(
            "SELECT {LEAGUE_COLUMNS} FROM leagues WHERE id = ?",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update a league's name, and its description only when one is given;
    /// a `None` description leaves the stored value untouched.
    pub async fn update_league(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<League>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE leagues SET name = ?, description = COALESCE(?, description), \
             updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_league(id).await
    }

    /// Delete a league together with its matches and players, in one transaction.
    pub async fn delete_league(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM matches WHERE league_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM players WHERE league_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM leagues WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Match CRUD ────────────────────────────────────────────────────

    pub async fn create_match(
        &self,
        league_id: &str,
        player1: &str,
        player2: &str,
        player1_score: i64,
        player2_score: i64,
        winner: &str,
    ) -> Result<Match, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now();
        let row = sqlx::query_as::<_, Match>(&format!(
            "INSERT INTO matches (id, league_id, player1, player2, player1_score, player2_score, winner, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {MATCH_COLUMNS}",
        ))
        .bind(&id)
        .bind(league_id)
        .bind(player1)
        .bind(player2)
        .bind(player1_score)
        .bind(player2_score)
        .bind(winner)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_match(&self, id: &str) -> Result<Option<Match>, sqlx::Error> {
        let row = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// List matches for a league, most recent first.
    pub async fn list_matches(
        &self,
        league_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Match>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        ))
        .bind(league_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List all matches for a league in the order they were recorded.
    /// Streak computation relies on this ordering.
    pub async fn list_matches_chronological(
        &self,
        league_id: &str,
    ) -> Result<Vec<Match>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? \
             ORDER BY created_at ASC, rowid ASC",
        ))
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List matches a player took part in, in recorded order.
    pub async fn list_matches_for_player(
        &self,
        league_id: &str,
        player_name: &str,
    ) -> Result<Vec<Match>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? AND (player1 = ? OR player2 = ?) \
             ORDER BY created_at ASC, rowid ASC",
        ))
        .bind(league_id)
        .bind(player_name)
        .bind(player_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List matches where the two named players faced each other, in recorded order.
    pub async fn list_matches_between(
        &self,
        league_id: &str,
        player_a: &str,
        player_b: &str,
    ) -> Result<Vec<Match>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE league_id = ? \
             AND ((player1 = ? AND player2 = ?) OR (player1 = ? AND player2 = ?)) \
             ORDER BY created_at ASC, rowid ASC",
        ))
        .bind(league_id)
        .bind(player_a)
        .bind(player_b)
        .bind(player_b)
        .bind(player_a)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_match(
        &self,
        id: &str,
        player1: &str,
        player2: &str,
        player1_score: i64,
        player2_score: i64,
        winner: &str,
    ) -> Result<Option<Match>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE matches SET player1 = ?, player2 = ?, player1_score = ?, player2_score = ?, \
             winner = ?, updated_at = ? WHERE id = ?",
        )
        .bind(player1)
        .bind(player2)
        .bind(player1_score)
        .bind(player2_score)
        .bind(winner)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_match(id).await
    }

    pub async fn delete_match(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM matches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Players ───────────────────────────────────────────────────────

    pub async fn create_player(&self, league_id: &str, name: &str) -> Result<Player, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let row = sqlx::query_as::<_, Player>(&format!(
            "INSERT INTO players (id, league_id, name, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {PLAYER_COLUMNS}",
        ))
        .bind(&id)
        .bind(league_id)
        .bind(name)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_players(&self, league_id: &str) -> Result<Vec<Player>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE league_id = ? ORDER BY name",
        ))
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_player(
        &self,
        league_id: &str,
        name: &str,
    ) -> Result<Option<Player>, sqlx::Error> {
        let row = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE league_id = ? AND name = ?",
        ))
        .bind(league_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Whether the named player appears in any match of the league.
    pub async fn player_has_matches(
        &self,
        league_id: &str,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches WHERE league_id = ? AND (player1 = ? OR player2 = ?)",
        )
        .bind(league_id)
        .bind(name)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn delete_player(&self, league_id: &str, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM players WHERE league_id = ? AND name = ?")
            .bind(league_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
