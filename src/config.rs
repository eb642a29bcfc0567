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

//! Tunables for the acceptor, worker pool, and maintenance loop (§6).
//!
//! Built programmatically by the embedder; this crate does not parse files or environment
//! variables for it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Top-level configuration for an [`crate::node::IpfsNode`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the acceptor binds its listener to.
    pub listen_addr: SocketAddr,
    /// Maximum concurrent inbound connections.
    pub connection_cap: usize,
    /// Worker-pool capacity.
    pub pool_size: usize,
    /// Per-read timeout, in seconds.
    pub read_timeout_s: u64,
    /// Consecutive empty peeks before closing an idle connection.
    pub idle_max_ticks: u32,
    /// Acceptor readiness-wait timeout, in seconds.
    pub accept_poll_s: u64,
    /// Idle seconds before a liveness ping is issued to a peer.
    pub ping_idle_s: u64,
    /// Additional connect attempts `MaintenanceTicker` makes before giving up on a peer this
    /// cycle.
    pub maintenance_connect_retries: u32,
    /// Additional send attempts `BitswapNetwork::send_message` makes on a transient write
    /// failure.
    pub bitswap_send_retries: u32,
    pub replication: ReplicationConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 4001),
            connection_cap: 300,
            pool_size: 25,
            read_timeout_s: 5,
            idle_max_ticks: 30,
            accept_poll_s: 2,
            ping_idle_s: 180,
            maintenance_connect_retries: 2,
            bitswap_send_retries: 10,
            replication: ReplicationConfig::default(),
        }
    }
}

/// Replication-announce behavior of `MaintenanceTicker`.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Whether the announce loop is active at all.
    pub enabled: bool,
    /// Minimum interval between replication announcements to the same peer.
    pub announce_minutes: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            announce_minutes: 10,
        }
    }
}
