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

//! Connection-acceptance and session-dispatch core for a content-addressed peer-to-peer node,
//! plus its block-exchange (bitswap) network layer.
//!
//! The block/Merkle-DAG store, cryptographic identity, DHT routing, repository/config loader,
//! CLI, journal/replication algorithm, and on-disk datastore all live outside this crate; see
//! [`datastore`], [`routing`], [`journal`], and [`exchange`] for the narrow interfaces this core
//! calls into them through.

pub mod bitswap;
pub mod config;
pub mod connection;
pub mod datastore;
pub mod exchange;
pub mod journal;
pub mod maintenance;
pub mod multistream;
pub mod node;
pub mod peer_manager;
pub mod protocol;
pub mod routing;
pub mod session;
pub mod stream;
pub mod worker_pool;

pub use node::{IpfsNode, NodeDeps};
pub use tari_shutdown::{Shutdown, ShutdownSignal};
