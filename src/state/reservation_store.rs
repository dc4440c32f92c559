//! Versioned reservation state, one slot per browser session.
//!
//! Every snapshot replaces the previous one wholesale and is broadcast on a
//! `watch` channel. Asynchronous customizations take an [`UpdateTicket`] before
//! they start; only the most recently issued ticket, still matching the current
//! version, may commit. Slower responses for superseded choices are rejected
//! as stale.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use actix_web::rt::time::timeout;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;

use crate::models::{pricing::PriceSource, reservation::ReservationData};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSnapshot {
    pub version: u64,
    pub data: ReservationData,
    pub price_source: PriceSource,
    pub updated_at: DateTime<Utc>,
}

impl ReservationSnapshot {
    pub fn is_estimated(&self) -> bool {
        !self.price_source.is_authoritative()
    }
}

/// Permission to commit a change computed from `data` at `version`.
#[derive(Debug, Clone)]
pub struct UpdateTicket {
    pub session_id: String,
    pub seq: u64,
    pub version: u64,
    pub data: ReservationData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    UnknownSession(String),
    Stale {
        session_id: String,
        ticket_version: u64,
        current_version: u64,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownSession(id) => write!(f, "No reservation loaded for session {}", id),
            StoreError::Stale {
                session_id,
                ticket_version,
                current_version,
            } => write!(
                f,
                "Update for session {} based on version {} was superseded (current version {})",
                session_id, ticket_version, current_version
            ),
        }
    }
}

impl std::error::Error for StoreError {}

struct SessionSlot {
    latest_ticket: u64,
    sender: watch::Sender<Option<ReservationSnapshot>>,
}

impl SessionSlot {
    fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            latest_ticket: 0,
            sender,
        }
    }

    fn current(&self) -> Option<ReservationSnapshot> {
        self.sender.borrow().clone()
    }

    fn current_version(&self) -> u64 {
        self.sender.borrow().as_ref().map_or(0, |s| s.version)
    }

    fn publish(&mut self, data: ReservationData, price_source: PriceSource) -> ReservationSnapshot {
        let snapshot = ReservationSnapshot {
            version: self.current_version() + 1,
            data,
            price_source,
            updated_at: Utc::now(),
        };
        self.sender.send_replace(Some(snapshot.clone()));
        snapshot
    }
}

#[derive(Default)]
pub struct ReservationStore {
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self, session_id: &str) -> Option<ReservationSnapshot> {
        self.lock().get(session_id).and_then(SessionSlot::current)
    }

    /// Receiver that observes every snapshot committed for a loaded session from now on.
    pub fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<watch::Receiver<Option<ReservationSnapshot>>, StoreError> {
        self.lock()
            .get(session_id)
            .map(|slot| slot.sender.subscribe())
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))
    }

    /// Waits up to `wait` for a snapshot newer than `since`; `Ok(None)` when none arrived.
    pub async fn wait_for_change(
        &self,
        session_id: &str,
        since: u64,
        wait: Duration,
    ) -> Result<Option<ReservationSnapshot>, StoreError> {
        let mut rx = self.subscribe(session_id)?;
        let newer = async {
            loop {
                let current = rx.borrow_and_update().clone();
                if let Some(snapshot) = current.filter(|s| s.version > since) {
                    return Ok(snapshot);
                }
                // Sender dropped: the session was removed or evicted
                if rx.changed().await.is_err() {
                    return Err(StoreError::UnknownSession(session_id.to_string()));
                }
            }
        };

        match timeout(wait, newer).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Replaces the session's reservation outright. Outstanding tickets become stale.
    pub fn initialize(
        &self,
        session_id: &str,
        data: ReservationData,
        price_source: PriceSource,
    ) -> ReservationSnapshot {
        let mut sessions = self.lock();
        let slot = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionSlot::new);
        slot.latest_ticket += 1;
        let snapshot = slot.publish(data, price_source);
        info!(
            "Loaded package {} for session {} (version {})",
            snapshot.data.travel_package.id, session_id, snapshot.version
        );
        snapshot
    }

    pub fn ticket(&self, session_id: &str) -> Result<UpdateTicket, StoreError> {
        let mut sessions = self.lock();
        let slot = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;
        let snapshot = slot
            .current()
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;

        slot.latest_ticket += 1;
        Ok(UpdateTicket {
            session_id: session_id.to_string(),
            seq: slot.latest_ticket,
            version: snapshot.version,
            data: snapshot.data,
        })
    }

    pub fn commit(
        &self,
        ticket: UpdateTicket,
        data: ReservationData,
        price_source: PriceSource,
    ) -> Result<ReservationSnapshot, StoreError> {
        let mut sessions = self.lock();
        let slot = sessions
            .get_mut(&ticket.session_id)
            .ok_or_else(|| StoreError::UnknownSession(ticket.session_id.clone()))?;

        let current_version = slot.current_version();
        if ticket.seq != slot.latest_ticket || ticket.version != current_version {
            debug!(
                "Rejecting ticket {} for session {} (latest {})",
                ticket.seq, ticket.session_id, slot.latest_ticket
            );
            return Err(StoreError::Stale {
                session_id: ticket.session_id,
                ticket_version: ticket.version,
                current_version,
            });
        }

        Ok(slot.publish(data, price_source))
    }

    /// Synchronous change that keeps the current price source.
    pub fn update<F>(&self, session_id: &str, change: F) -> Result<ReservationSnapshot, StoreError>
    where
        F: FnOnce(&mut ReservationData),
    {
        let mut sessions = self.lock();
        let slot = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;
        let current = slot
            .current()
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;

        let mut data = current.data;
        change(&mut data);
        slot.latest_ticket += 1;
        Ok(slot.publish(data, current.price_source))
    }

    /// Drops sessions whose latest snapshot is older than `cutoff`.
    pub fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.sender
                .borrow()
                .as_ref()
                .map_or(false, |snapshot| snapshot.updated_at >= cutoff)
        });
        before - sessions.len()
    }

    pub fn remove(&self, session_id: &str) -> Option<ReservationSnapshot> {
        self.lock()
            .remove(session_id)
            .and_then(|slot| slot.current())
    }
}
