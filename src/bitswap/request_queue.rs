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

//! Per-peer in-flight wantlist bookkeeping (§3, §4.7 step 4).
//!
//! Every wantlist entry is added to the peer's CID set regardless of `priority`/`cancel`,
//! matching `exchange/bitswap/network.c`'s unconditional append; see the cancel-semantics
//! decision recorded alongside this module.

use std::collections::{BTreeSet, HashMap};

use crate::{bitswap::cid::Cid, peer_manager::PeerId};

/// The in-flight CID set for one peer.
#[derive(Debug, Default)]
pub struct PeerRequestEntry {
    cids: BTreeSet<Cid>,
}

impl PeerRequestEntry {
    /// Applies one wantlist entry by adding its CID, idempotently. `priority` and `cancel` are
    /// part of the wire format but not inspected here, matching the original source.
    pub fn apply(&mut self, cid: Cid, _priority: i32, _cancel: bool) {
        self.cids.insert(cid);
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.cids.contains(cid)
    }

    pub fn len(&self) -> usize {
        self.cids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cids.is_empty()
    }
}

/// Maps each peer to its [`PeerRequestEntry`], at most one entry per peer.
#[derive(Debug, Default)]
pub struct PeerRequestQueue {
    entries: HashMap<PeerId, PeerRequestEntry>,
}

impl PeerRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, peer_id: PeerId) -> &mut PeerRequestEntry {
        self.entries.entry(peer_id).or_default()
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerRequestEntry> {
        self.entries.get(peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(byte: u8) -> Cid {
        let mut bytes = vec![0x12, 0x20];
        bytes.extend_from_slice(&[byte; 32]);
        Cid::decode(&bytes).unwrap()
    }

    #[test]
    fn positive_priority_adds_cid() {
        let mut entry = PeerRequestEntry::default();
        entry.apply(cid(1), 5, false);
        assert!(entry.contains(&cid(1)));
    }

    #[test]
    fn cancel_flag_does_not_remove_cid() {
        let mut entry = PeerRequestEntry::default();
        entry.apply(cid(1), 5, false);
        entry.apply(cid(1), 5, true);
        assert!(entry.contains(&cid(1)));
    }

    #[test]
    fn nonpositive_priority_still_adds_cid() {
        let mut entry = PeerRequestEntry::default();
        entry.apply(cid(1), 0, false);
        assert!(entry.contains(&cid(1)));
    }

    #[test]
    fn adding_same_cid_twice_is_idempotent() {
        let mut entry = PeerRequestEntry::default();
        entry.apply(cid(1), 1, false);
        entry.apply(cid(1), 1, false);
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn queue_has_at_most_one_entry_per_peer() {
        let mut queue = PeerRequestQueue::new();
        let peer = PeerId::new(vec![9]);
        queue.entry(peer.clone()).apply(cid(1), 1, false);
        queue.entry(peer.clone()).apply(cid(2), 1, false);
        assert_eq!(queue.get(&peer).unwrap().len(), 2);
    }
}
