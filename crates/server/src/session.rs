//! Per-connection state

use std::sync::Arc;
use store::{Db, Result, Store};

/// State carried across one client connection: the selected database.
pub struct Session {
    store: Arc<Store>,
    db: Arc<Db>,
}

impl Session {
    /// New sessions start on database 0.
    pub fn new(store: Arc<Store>) -> Result<Self> {
        let db = store.select(0)?;
        Ok(Self { store, db })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Switch the one-byte db prefix; indices 0..=15 are valid.
    pub fn select(&mut self, index: u8) -> Result<()> {
        self.db = self.store.select(index)?;
        Ok(())
    }
}
