//! On-device cache: favorites, drafts and the last-known booking and work
//! snapshots. Owned by one device; nothing here is ever sent to the remote
//! store as-is.

mod drafts;
mod favorites;
mod snapshots;

use std::path::PathBuf;

use anyhow::Result;

use crate::db::{Database, Schema};

#[derive(Clone)]
pub struct LocalCache {
    db: Database,
}

impl LocalCache {
    pub fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            db: Database::new(path, Schema::LocalCache)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::in_memory(Schema::LocalCache)?,
        })
    }
}
