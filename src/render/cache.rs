//! Content-addressed decode cache.
//!
//! Every distinct payload is decoded at most once. A render pass only
//! composites once [`DecodeCache::is_resolved`] holds for the scene, so a
//! slow decode can never leave a frame half drawn.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::decode::{decode_async, DecodedImage};
use crate::state::{Payload, PayloadKey, Scene};

/// Result of one decode, as delivered back to the cache
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub key: PayloadKey,
    /// `None` when the payload could not be decoded
    pub image: Option<Arc<DecodedImage>>,
}

#[derive(Debug)]
enum Slot {
    /// Decode dispatched, result not back yet
    Pending,
    Ready(Arc<DecodedImage>),
    /// Undecodable; never retried
    Failed,
}

#[derive(Debug, Default)]
pub struct DecodeCache {
    slots: HashMap<PayloadKey, Slot>,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every payload of the scene that has never been dispatched.
    ///
    /// The returned payloads are marked pending and must be decoded by
    /// the caller; each key is returned once.
    pub fn request(&mut self, scene: &Scene) -> Vec<Payload> {
        let mut missing = Vec::new();
        for payload in scene.payloads() {
            if !self.slots.contains_key(&payload.key()) {
                self.slots.insert(payload.key(), Slot::Pending);
                missing.push(payload.clone());
            }
        }
        missing
    }

    /// Claim a single payload. Returns false when it is already known.
    pub fn claim(&mut self, payload: &Payload) -> bool {
        if self.slots.contains_key(&payload.key()) {
            return false;
        }
        self.slots.insert(payload.key(), Slot::Pending);
        true
    }

    /// Store decode results
    pub fn resolve(&mut self, outcomes: impl IntoIterator<Item = DecodeOutcome>) {
        for outcome in outcomes {
            let slot = match outcome.image {
                Some(image) => Slot::Ready(image),
                None => Slot::Failed,
            };
            self.slots.insert(outcome.key, slot);
        }
    }

    pub fn get(&self, key: PayloadKey) -> Option<&Arc<DecodedImage>> {
        match self.slots.get(&key) {
            Some(Slot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    pub fn is_failed(&self, key: PayloadKey) -> bool {
        matches!(self.slots.get(&key), Some(Slot::Failed))
    }

    pub fn is_pending(&self, key: PayloadKey) -> bool {
        matches!(self.slots.get(&key), Some(Slot::Pending))
    }

    /// True once every payload of the scene has a final result
    pub fn is_resolved(&self, scene: &Scene) -> bool {
        scene.payloads().all(|payload| {
            matches!(
                self.slots.get(&payload.key()),
                Some(Slot::Ready(_)) | Some(Slot::Failed)
            )
        })
    }

    /// Number of payloads seen so far, in any state
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Decode a batch concurrently and resolve once with every result.
///
/// A panicking decode still yields an outcome (a failed one) so the
/// render barrier always clears.
pub async fn decode_batch(payloads: Vec<Payload>) -> Vec<DecodeOutcome> {
    let keys: Vec<PayloadKey> = payloads.iter().map(Payload::key).collect();
    let mut tasks = JoinSet::new();

    for payload in payloads {
        tasks.spawn(async move {
            let key = payload.key();
            let image = match decode_async(payload).await {
                Ok(image) => Some(Arc::new(image)),
                Err(e) => {
                    log::warn!("⚠️  Could not decode image {}: {}", key, e);
                    None
                }
            };
            DecodeOutcome { key, image }
        });
    }

    let mut outcomes = Vec::with_capacity(keys.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => log::error!("❌ Decode task failed: {}", e),
        }
    }

    for key in keys {
        if !outcomes.iter().any(|outcome| outcome.key == key) {
            outcomes.push(DecodeOutcome { key, image: None });
        }
    }

    outcomes
}
