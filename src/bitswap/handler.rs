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

//! Registers bitswap as a [`crate::protocol::Handler`] with `ProtocolRouter`.

use std::sync::Arc;

use async_trait::async_trait;

use super::network::BitswapNetwork;
use crate::{
    protocol::{Handler, HandlerVerdict},
    session::SessionContext,
};

pub const BITSWAP_1_1_0: &str = "/ipfs/bitswap/1.1.0";

pub struct BitswapHandler {
    network: Arc<BitswapNetwork>,
}

impl BitswapHandler {
    pub fn new(network: Arc<BitswapNetwork>) -> Self {
        Self { network }
    }
}

#[async_trait]
impl Handler for BitswapHandler {
    fn protocol_prefix(&self) -> &str {
        BITSWAP_1_1_0
    }

    async fn handle(&self, session: Arc<SessionContext>, body: &[u8]) -> HandlerVerdict {
        if self.network.handle_raw_frame(session.remote_peer_id.as_ref(), body).await {
            HandlerVerdict::Keep
        } else {
            HandlerVerdict::Error
        }
    }
}
