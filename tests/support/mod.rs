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

//! Shared builders for the end-to-end tests, analogous to the crate's own `test_utils` pattern.

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use ipfs_core::{
    bitswap::message::Block,
    exchange::ExchangeEngine,
    journal::{JournalSync, JournalSyncError},
    peer_manager::{PeerId, ReplicationPeer},
    routing::{Routing, RoutingError},
};

static LOG_INIT: Once = Once::new();

pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A routing fake that always succeeds, for scenarios that don't exercise ping/connect failure.
#[derive(Default)]
pub struct AlwaysOkRouting;

#[async_trait]
impl Routing for AlwaysOkRouting {
    async fn ping(&self, _peer: &PeerId) -> Result<(), RoutingError> {
        Ok(())
    }

    async fn connect(&self, _peer: &PeerId, _retries: u32) -> Result<(), RoutingError> {
        Ok(())
    }
}

/// A journal fake recording every peer it was asked to sync, for assertions in S5.
#[derive(Default)]
pub struct RecordingJournal {
    pub synced: Mutex<Vec<PeerId>>,
}

#[async_trait]
impl JournalSync for RecordingJournal {
    async fn sync(&self, replication_peer: &ReplicationPeer) -> Result<(), JournalSyncError> {
        self.synced.lock().unwrap().push(replication_peer.peer_id.clone());
        Ok(())
    }
}

/// An exchange fake recording every block handed to it, for assertions in S1.
#[derive(Default)]
pub struct RecordingExchange {
    pub blocks: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl ExchangeEngine for RecordingExchange {
    async fn has_block(&self, block: &Block) {
        self.blocks.lock().unwrap().push(block.data.clone());
    }
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
