//! Database persistence layer using Sled
//!
//! Holds the committed engine state and the event log so a node can
//! restart where it stopped.

use std::path::Path;
use sled::{Db, Tree};
use crate::error::NodeError;
use crate::events::EventRecord;
use crate::node::EngineState;

const STATE_KEY: &str = "engine_state";

#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    metadata_tree: Tree,
    events_tree: Tree,
}

impl LedgerDb {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let db = sled::open(path)?;
        let metadata_tree = db.open_tree("metadata")?;
        let events_tree = db.open_tree("events")?;

        Ok(Self {
            db,
            metadata_tree,
            events_tree,
        })
    }

    /// Persist a committed state together with the events it produced
    pub fn commit(&self, state: &EngineState, events: &[EventRecord]) -> Result<(), NodeError> {
        for record in events {
            let value = bincode::serialize(record)?;
            self.events_tree.insert(record.sequence.to_be_bytes(), value)?;
        }
        let value = bincode::serialize(state)?;
        self.metadata_tree.insert(STATE_KEY, value)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_state(&self) -> Result<Option<EngineState>, NodeError> {
        match self.metadata_tree.get(STATE_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every stored event, in sequence order
    pub fn load_events(&self) -> Result<Vec<EventRecord>, NodeError> {
        let mut events = Vec::new();
        for item in self.events_tree.iter() {
            let (_, value) = item?;
            events.push(bincode::deserialize(&value)?);
        }
        Ok(events)
    }
}
