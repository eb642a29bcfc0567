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

use multiaddr::Multiaddr;

use super::PeerId;

/// Connection lifecycle state of a [`Peer`], mirroring the source's `CONNECTION_TYPE_*` enum.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionType {
    NotConnected,
    Connecting,
    Connected,
    CannotConnect,
}

impl Default for ConnectionType {
    fn default() -> Self {
        ConnectionType::NotConnected
    }
}

/// A snapshot of a peer's active session, readable by components that don't own the session.
///
/// Per the Peer↔SessionContext design note, this is a plain copy taken under the peerstore
/// lock, never a reference into the owning `ConnectionWorker`'s state.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub last_comm_epoch: u64,
}

#[derive(Debug, Clone)]
pub struct Peer {
    id: PeerId,
    addresses: Vec<Multiaddr>,
    pub connection_type: ConnectionType,
    pub is_local: bool,
    pub last_connect_epoch: u64,
    pub session: Option<SessionSnapshot>,
}

impl Peer {
    pub fn new(id: PeerId, addresses: Vec<Multiaddr>) -> Self {
        Self {
            id,
            addresses,
            connection_type: ConnectionType::NotConnected,
            is_local: false,
            last_connect_epoch: 0,
            session: None,
        }
    }

    pub fn local(id: PeerId) -> Self {
        let mut peer = Self::new(id, Vec::new());
        peer.is_local = true;
        peer
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn addresses(&self) -> &[Multiaddr] {
        &self.addresses
    }

    pub fn is_connected(&self) -> bool {
        self.connection_type == ConnectionType::Connected
    }
}

/// A peer configured as a replication partner, to which the node periodically announces its
/// journal/state. Config-driven: exists only for peers the operator has named as partners.
#[derive(Debug, Clone)]
pub struct ReplicationPeer {
    pub peer_id: PeerId,
    pub last_connect_epoch: u64,
}

impl ReplicationPeer {
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            last_connect_epoch: 0,
        }
    }
}

/// Current wall-clock time as whole seconds since the epoch, matching the C source's
/// `os_utils_gmtime()` resolution.
pub fn now_epoch() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
