//! Room broker.
//!
//! One broadcast channel per appointment, created lazily on first join or
//! post and dropped again once the last receiver is gone. The store is the
//! source of truth: a message is persisted first, then fanned out, and a
//! failed persist is never broadcast. Fan-out itself is best-effort; a
//! slow receiver that overflows the channel misses messages (`Lagged`)
//! rather than stalling the room.

use crate::domain::access::{require_participant, Principal};
use crate::domain::entities::{Appointment, ChatMessageView};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids::EntityId;
use crate::ports::outbound::ClinicStore;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered messages per room channel before slow receivers start lagging.
pub const DEFAULT_ROOM_CAPACITY: usize = 256;

/// A live membership in a room: the persisted history as of join time plus
/// a receiver for everything after it.
#[derive(Debug)]
pub struct RoomSubscription {
    pub history: Vec<ChatMessageView>,
    pub receiver: broadcast::Receiver<ChatMessageView>,
}

/// Broker over all consultation rooms.
pub struct RoomBroker {
    store: Arc<dyn ClinicStore>,
    rooms: DashMap<EntityId, broadcast::Sender<ChatMessageView>>,
    capacity: usize,
}

impl RoomBroker {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self::with_capacity(store, DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn ClinicStore>, capacity: usize) -> Self {
        Self {
            store,
            rooms: DashMap::new(),
            // A broadcast channel cannot have capacity zero.
            capacity: capacity.max(1),
        }
    }

    /// Load the room's appointment and check the caller is a participant.
    /// Re-evaluated on every call; membership is never cached across calls.
    async fn authorize(
        &self,
        principal: &Principal,
        appointment_id: EntityId,
    ) -> CoreResult<Appointment> {
        let appointment = self.store.appointment(appointment_id).await?;
        require_participant(principal, &appointment)?;
        Ok(appointment)
    }

    fn sender(&self, appointment_id: EntityId) -> broadcast::Sender<ChatMessageView> {
        self.rooms
            .entry(appointment_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Join a room: persisted history plus a live receiver. Messages posted
    /// after the history read arrive on the receiver.
    pub async fn join(
        &self,
        principal: &Principal,
        appointment_id: EntityId,
    ) -> CoreResult<RoomSubscription> {
        self.authorize(principal, appointment_id).await?;
        let receiver = self.sender(appointment_id).subscribe();
        let history = self.store.list_messages(appointment_id).await?;
        debug!(
            room = %appointment_id,
            participant = %principal.id,
            history_len = history.len(),
            "joined consultation room"
        );
        Ok(RoomSubscription { history, receiver })
    }

    /// Post a message: validate, persist, then fan out to live receivers.
    pub async fn post(
        &self,
        principal: &Principal,
        appointment_id: EntityId,
        text: &str,
    ) -> CoreResult<ChatMessageView> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::validation("message must not be empty"));
        }
        self.authorize(principal, appointment_id).await?;

        let view = self
            .store
            .append_message(appointment_id, principal.id, text)
            .await?;

        if let Some(tx) = self.rooms.get(&appointment_id) {
            if tx.receiver_count() > 0 {
                let _ = tx.send(view.clone());
            }
        }
        Ok(view)
    }

    /// Persisted history of a room, without joining it.
    pub async fn history(
        &self,
        principal: &Principal,
        appointment_id: EntityId,
    ) -> CoreResult<Vec<ChatMessageView>> {
        self.authorize(principal, appointment_id).await?;
        Ok(self.store.list_messages(appointment_id).await?)
    }

    /// Drop the room's channel if nobody is listening. Called when a
    /// receiver disconnects; a concurrent join keeps the channel alive.
    pub fn release(&self, appointment_id: EntityId) {
        self.rooms
            .remove_if(&appointment_id, |_, tx| tx.receiver_count() == 0);
    }

    /// Number of rooms with a live channel.
    pub fn open_rooms(&self) -> usize {
        self.rooms.len()
    }
}
