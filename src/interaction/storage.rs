//! In-flight stateful processors awaiting a follow-up message.
//!
//! The lock is only ever held for synchronous relevance checks and list edits; processors are taken out before
//! they do any I/O and put back afterwards.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::base::types::{Message, Res, Void};

use super::processor::BoxedProcessor;

struct Pending {
    stored_at: Instant,
    processor: BoxedProcessor,
}

/// Shared storage for pending processors.
///
/// Holds at most one processor per conversation chat; storing a new one replaces the old. Entries older than
/// the configured lifetime are dropped on every access. Trivially cloneable.
#[derive(Clone)]
pub struct ProcessorStorage {
    pending: Arc<Mutex<Vec<Pending>>>,
    ttl: Option<Duration>,
}

impl ProcessorStorage {
    /// Creates an empty storage; `ttl` of `None` keeps conversations until they are answered.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            ttl,
        }
    }

    /// Removes and returns the first pending processor the message is relevant to.
    pub fn take_relevant(&self, message: &Message) -> Res<Option<BoxedProcessor>> {
        let mut pending = self.lock()?;

        let mut found = None;
        for (index, entry) in pending.iter().enumerate() {
            if entry.processor.is_relevant(message)? {
                found = Some(index);
                break;
            }
        }

        Ok(found.map(|index| pending.remove(index).processor))
    }

    /// Whether any pending processor is relevant to the message. Leaves the storage unchanged.
    pub fn is_relevant_to_any(&self, message: &Message) -> Res<bool> {
        let pending = self.lock()?;

        for entry in pending.iter() {
            if entry.processor.is_relevant(message)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Stores a processor that expects more messages.
    pub fn store(&self, processor: BoxedProcessor) -> Void {
        let mut pending = self.lock()?;

        if let Some(chat_id) = processor.conversation_chat() {
            let before = pending.len();
            pending.retain(|entry| entry.processor.conversation_chat() != Some(chat_id));

            if pending.len() < before {
                info!("Replaced the pending conversation in chat `{}`.", chat_id);
            }
        }

        debug!("Storing pending `{}` processor.", processor.name());

        pending.push(Pending { stored_at: Instant::now(), processor });

        Ok(())
    }

    /// Number of pending processors.
    pub fn len(&self) -> Res<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Res<bool> {
        Ok(self.len()? == 0)
    }

    /// Locks the list and drops expired entries.
    fn lock(&self) -> Res<MutexGuard<'_, Vec<Pending>>> {
        let mut pending = self.pending.lock().map_err(|_| anyhow::anyhow!("The processor storage lock is poisoned."))?;

        if let Some(ttl) = self.ttl {
            let before = pending.len();
            pending.retain(|entry| entry.stored_at.elapsed() < ttl);

            let expired = before - pending.len();
            if expired > 0 {
                info!("Dropped {} expired conversation(s).", expired);
            }
        }

        Ok(pending)
    }
}

// Tests.
