use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

/// Run idempotent schema migrations: tables first, then indexes.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    info!("Running schema migrations...");

    let tables = [
        r#"
        CREATE TABLE IF NOT EXISTS identities (
            id BIGSERIAL PRIMARY KEY,
            api_id BIGINT NOT NULL UNIQUE,
            screen_name TEXT,
            leaders_synced_at TIMESTAMPTZ,
            followers_synced_at TIMESTAMPTZ
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id BIGSERIAL PRIMARY KEY,
            screen_name TEXT NOT NULL UNIQUE,
            identity_id BIGINT NOT NULL REFERENCES identities(id),
            access_token TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS mentors (
            account_id BIGINT NOT NULL REFERENCES accounts(id),
            identity_id BIGINT NOT NULL REFERENCES identities(id),
            PRIMARY KEY (account_id, identity_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS leader_edges (
            owner_id BIGINT NOT NULL REFERENCES identities(id),
            leader_id BIGINT NOT NULL REFERENCES identities(id),
            last_seen TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (owner_id, leader_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS follower_edges (
            owner_id BIGINT NOT NULL REFERENCES identities(id),
            follower_id BIGINT NOT NULL REFERENCES identities(id),
            last_seen TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (owner_id, follower_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            account_id BIGINT NOT NULL REFERENCES accounts(id),
            leader_id BIGINT NOT NULL REFERENCES identities(id),
            time TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (account_id, leader_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS unfollows (
            account_id BIGINT NOT NULL REFERENCES accounts(id),
            leader_id BIGINT NOT NULL REFERENCES identities(id),
            time TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (account_id, leader_id)
        )
        "#,
    ];

    for t in &tables {
        sqlx::query(t).execute(pool).await?;
    }
    info!("Tables ensured");

    let indexes = [
        "CREATE INDEX IF NOT EXISTS leader_edges_owner_seen ON leader_edges (owner_id, last_seen)",
        "CREATE INDEX IF NOT EXISTS follower_edges_owner_seen ON follower_edges (owner_id, last_seen)",
        "CREATE INDEX IF NOT EXISTS follows_account_time ON follows (account_id, time)",
    ];

    for idx in &indexes {
        sqlx::query(idx).execute(pool).await?;
    }
    info!("Indexes ensured");

    info!("Schema migration complete");
    Ok(())
}
