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

//! Round-robin peerstore walk invoked on every idle acceptor tick (§4.6).
//!
//! The branch order below — replication check strictly before the liveness-ping check, never
//! both in the same tick — mirrors `ipfs_null_do_maintenance`'s own branch ordering.

use std::sync::Arc;

use crate::{
    config::{NodeConfig, ReplicationConfig},
    journal::JournalSync,
    peer_manager::{now_epoch, ConnectionType, PeerId, Peerstore},
    routing::Routing,
};

pub const TARGET: &str = "maintenance";

pub struct MaintenanceTicker {
    peerstore: Peerstore,
    routing: Arc<dyn Routing>,
    journal: Arc<dyn JournalSync>,
    replication: ReplicationConfig,
    connect_retries: u32,
    ping_idle_s: u64,
    cursor: crate::peer_manager::PeerstoreCursor,
}

impl MaintenanceTicker {
    pub fn new(peerstore: Peerstore, routing: Arc<dyn Routing>, journal: Arc<dyn JournalSync>, config: &NodeConfig) -> Self {
        let cursor = peerstore.cursor();
        Self {
            peerstore,
            routing,
            journal,
            replication: config.replication.clone(),
            connect_retries: config.maintenance_connect_retries,
            ping_idle_s: config.ping_idle_s,
            cursor,
        }
    }

    /// Advances the cursor by one peer and applies the replication-or-ping check to it.
    pub async fn tick_one(&mut self) {
        let Some(peer) = self.cursor.next() else {
            return;
        };
        if peer.is_local {
            return;
        }
        self.visit(peer.id().clone()).await;
    }

    async fn visit(&mut self, peer_id: PeerId) {
        let replication_peer = self.peerstore.replication_peer(&peer_id);

        if let Some(replication_peer) = replication_peer {
            if !self.replication.enabled {
                return;
            }
            let due = now_epoch().saturating_sub(replication_peer.last_connect_epoch) >= self.replication.announce_minutes * 60;
            if !due {
                return;
            }

            let is_connected = self
                .peerstore
                .get(&peer_id)
                .map(|p| p.connection_type == ConnectionType::Connected)
                .unwrap_or(false);
            if !is_connected {
                if let Err(_err) = self.routing.connect(&peer_id, self.connect_retries).await {
                    log::debug!(target: TARGET, "replication connect to {peer_id} failed, skipping this cycle");
                    return;
                }
            }

            if self.journal.sync(&replication_peer).await.is_ok() {
                self.peerstore.set_replication_last_connect(&peer_id, now_epoch());
            }
            return;
        }

        let Some(peer) = self.peerstore.get(&peer_id) else {
            return;
        };
        if peer.connection_type != ConnectionType::Connected {
            return;
        }
        let Some(session) = peer.session else {
            return;
        };
        if now_epoch().saturating_sub(session.last_comm_epoch) <= self.ping_idle_s {
            return;
        }

        if self.routing.ping(&peer_id).await.is_err() {
            log::debug!(target: TARGET, "liveness ping to {peer_id} failed, marking NotConnected");
            self.peerstore.mutate(&peer_id, |p| p.connection_type = ConnectionType::NotConnected);
        }
    }
}
