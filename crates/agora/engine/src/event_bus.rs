//! Event bus for the governance engine.
//!
//! Events are published only after the operation that produced them has
//! committed, so subscribers never observe an event for a rolled-back change.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use agora_types::{EventRecord, GovernanceEvent, Timestamp};
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const CHANNEL_CAPACITY: usize = 1024;

/// Publishes committed governance events and keeps a bounded history.
pub struct EventBus {
    /// Broadcast channel for real-time delivery
    sender: broadcast::Sender<EventRecord>,
    log: Mutex<EventLog>,
}

struct EventLog {
    next_seq: u64,
    history: VecDeque<EventRecord>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus retaining at most `history` past events.
    pub fn new(history: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            log: Mutex::new(EventLog {
                next_seq: 1,
                history: VecDeque::with_capacity(history.min(CHANNEL_CAPACITY)),
                capacity: history,
            }),
        }
    }

    /// Sequence, record, and broadcast a batch of events in order.
    pub fn publish(&self, at: Timestamp, events: Vec<GovernanceEvent>) -> Vec<EventRecord> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let mut published = Vec::with_capacity(events.len());
        for event in events {
            let record = EventRecord {
                seq: log.next_seq,
                at,
                event,
            };
            log.next_seq += 1;
            if log.capacity > 0 {
                if log.history.len() == log.capacity {
                    log.history.pop_front();
                }
                log.history.push_back(record.clone());
            }
            // No receivers is not an error
            let _ = self.sender.send(record.clone());
            published.push(record);
        }
        published
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> Vec<EventRecord> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.history.iter().cloned().collect()
    }

    /// Total number of events ever published.
    pub fn published(&self) -> u64 {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.next_seq - 1
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}
