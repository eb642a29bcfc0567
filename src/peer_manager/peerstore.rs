// Copyright 2024, The rust-ipfs-core Authors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use super::{Peer, PeerId, ReplicationPeer};

#[derive(Default)]
struct Inner {
    peers: BTreeMap<PeerId, Peer>,
    replication_peers: BTreeMap<PeerId, ReplicationPeer>,
    /// Bumped on every structural mutation (insert/remove). Lets `PeerstoreCursor` detect that
    /// the ordering it was iterating over may have shifted and restart at head, instead of
    /// indexing into a position that no longer means what it used to.
    generation: u64,
}

/// The node's in-memory catalog of known peers, their addresses, and connection state.
///
/// Readers may proceed concurrently; mutators take exclusive access, matching the
/// shared-resource policy in §5.
#[derive(Clone, Default)]
pub struct Peerstore {
    inner: Arc<RwLock<Inner>>,
}

impl Peerstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, peer: Peer) {
        let mut inner = self.inner.write().unwrap();
        inner.peers.insert(peer.id().clone(), peer);
        inner.generation += 1;
    }

    pub fn remove(&self, id: &PeerId) -> Option<Peer> {
        let mut inner = self.inner.write().unwrap();
        let removed = inner.peers.remove(id);
        if removed.is_some() {
            inner.generation += 1;
        }
        removed
    }

    pub fn get(&self, id: &PeerId) -> Option<Peer> {
        self.inner.read().unwrap().peers.get(id).cloned()
    }

    pub fn mutate<F, R>(&self, id: &PeerId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Peer) -> R,
    {
        let mut inner = self.inner.write().unwrap();
        inner.peers.get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_replication_peer(&self, replication_peer: ReplicationPeer) {
        let mut inner = self.inner.write().unwrap();
        inner
            .replication_peers
            .insert(replication_peer.peer_id.clone(), replication_peer);
    }

    pub fn replication_peer(&self, id: &PeerId) -> Option<ReplicationPeer> {
        self.inner.read().unwrap().replication_peers.get(id).cloned()
    }

    pub fn set_replication_last_connect(&self, id: &PeerId, epoch: u64) {
        let mut inner = self.inner.write().unwrap();
        if let Some(rp) = inner.replication_peers.get_mut(id) {
            rp.last_connect_epoch = epoch;
        }
    }

    fn generation(&self) -> u64 {
        self.inner.read().unwrap().generation
    }

    fn nth_id(&self, index: usize) -> Option<PeerId> {
        self.inner.read().unwrap().peers.keys().nth(index).cloned()
    }

    /// A round-robin cursor into the peerstore, advanced by one peer per maintenance tick.
    pub fn cursor(&self) -> PeerstoreCursor {
        PeerstoreCursor {
            store: self.clone(),
            index: 0,
            generation: self.generation(),
        }
    }
}

/// Round-robin iterator over a [`Peerstore`] that survives concurrent structural mutation by
/// restarting at head whenever the store's generation has moved since the last step, rather
/// than dereferencing a position the mutation may have invalidated.
pub struct PeerstoreCursor {
    store: Peerstore,
    index: usize,
    generation: u64,
}

impl PeerstoreCursor {
    /// Returns the next peer in round-robin order, or `None` if the peerstore is empty.
    pub fn next(&mut self) -> Option<Peer> {
        if self.store.is_empty() {
            return None;
        }
        let current_generation = self.store.generation();
        if current_generation != self.generation {
            self.generation = current_generation;
            self.index = 0;
        }
        let len = self.store.len();
        if self.index >= len {
            self.index = 0;
        }
        let id = self.store.nth_id(self.index)?;
        self.index = (self.index + 1) % len.max(1);
        self.store.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(byte: u8) -> Peer {
        Peer::new(PeerId::new(vec![byte]), Vec::new())
    }

    #[test]
    fn cursor_wraps_and_visits_every_peer() {
        let store = Peerstore::new();
        store.upsert(peer(1));
        store.upsert(peer(2));
        store.upsert(peer(3));

        let mut cursor = store.cursor();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(cursor.next().unwrap().id().clone());
        }
        assert_eq!(seen[0..3], seen[3..6]);
        let mut unique = seen[0..3].to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn cursor_restarts_at_head_after_mutation() {
        let store = Peerstore::new();
        store.upsert(peer(1));
        store.upsert(peer(2));
        let mut cursor = store.cursor();
        cursor.next();
        store.upsert(peer(3));
        // generation moved; cursor must not panic or skip, it restarts at head
        let next = cursor.next();
        assert!(next.is_some());
    }

    #[test]
    fn empty_store_cursor_returns_none() {
        let store = Peerstore::new();
        let mut cursor = store.cursor();
        assert!(cursor.next().is_none());
    }
}
