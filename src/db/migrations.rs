use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Transaction};

/// Which set of tables a [`super::Database`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Authoritative collections behind the remote functions.
    Remote,
    /// Per-device cache: favorites, snapshots, drafts.
    LocalCache,
}

impl Schema {
    pub fn label(&self) -> &'static str {
        match self {
            Schema::Remote => "remote",
            Schema::LocalCache => "cache",
        }
    }

    fn current_version(&self) -> i32 {
        match self {
            Schema::Remote => 2,
            Schema::LocalCache => 1,
        }
    }
}

pub fn run_migrations(conn: &mut Connection, schema: Schema) -> Result<()> {
    let target = schema.current_version();
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > target {
        bail!(
            "{} database version ({}) is newer than supported schema ({})",
            schema.label(),
            version,
            target
        );
    }

    if version == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < target {
        let next_version = version + 1;
        apply_migration(&tx, schema, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", target)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, schema: Schema, version: i32) -> Result<()> {
    match (schema, version) {
        (Schema::Remote, 1) => {
            tx.execute_batch(include_str!("schemas/remote_v1.sql"))
                .context("failed to execute remote_v1.sql")?;
            Ok(())
        }
        (Schema::Remote, 2) => {
            tx.execute_batch(include_str!("schemas/remote_v2.sql"))
                .context("failed to execute remote_v2.sql")?;
            Ok(())
        }
        (Schema::LocalCache, 1) => {
            tx.execute_batch(include_str!("schemas/cache_v1.sql"))
                .context("failed to execute cache_v1.sql")?;
            Ok(())
        }
        _ => bail!(
            "unknown {} migration target version: {version}",
            schema.label()
        ),
    }
}
