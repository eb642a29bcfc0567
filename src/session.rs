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

//! Per-connection state (§3, §4.2).

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::{datastore::Datastore, peer_manager::PeerId, stream::PeerStream};

/// Per-connection state: the insecure stream, the currently-selected stream (after an optional
/// secure upgrade), handles to the datastore/filestore, and the remote peer id once known.
///
/// `default_stream` starts out pointing at the same stream as `insecure_stream`; a secure
/// channel upgrade (out of scope here, see §1) would swap it for a wrapped stream without
/// touching `insecure_stream`. Since this core does not implement that upgrade, the two are
/// always the same `Arc` today — the field split exists so a future upgrade hook has somewhere
/// to plug in without reshaping `SessionContext`.
pub struct SessionContext {
    pub insecure_stream: Arc<PeerStream<TcpStream>>,
    pub default_stream: Arc<PeerStream<TcpStream>>,
    pub datastore: Arc<dyn Datastore>,
    pub filestore: Arc<dyn Datastore>,
    pub remote_peer_id: Option<PeerId>,
}

impl SessionContext {
    pub fn new(stream: Arc<PeerStream<TcpStream>>, datastore: Arc<dyn Datastore>, filestore: Arc<dyn Datastore>) -> Self {
        Self {
            insecure_stream: stream.clone(),
            default_stream: stream,
            datastore,
            filestore,
            remote_peer_id: None,
        }
    }

    pub fn last_comm_epoch(&self) -> u64 {
        self.default_stream.last_comm_epoch()
    }
}
