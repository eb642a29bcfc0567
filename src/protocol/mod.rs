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

//! Prefix-match dispatch from a negotiated protocol id to a registered handler (§4.3).

use std::sync::Arc;

use async_trait::async_trait;

use crate::session::SessionContext;

pub const TARGET: &str = "protocol_router";

/// A protocol identifier, e.g. `/ipfs/bitswap/1.1.0`.
pub type ProtocolId = String;

/// The outcome of a [`Handler`] invocation, controlling what `ConnectionWorker` does next.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HandlerVerdict {
    /// Keep serving: the worker should loop for more messages on this connection.
    Keep,
    /// The handler has taken ownership of the `SessionContext`; the worker must exit without
    /// closing the stream itself.
    Release,
    /// Fatal: the worker closes the stream and exits.
    Error,
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// The protocol-id prefix this handler answers for (e.g. `/ipfs/bitswap/1.1.0`).
    fn protocol_prefix(&self) -> &str;

    /// Handle one inbound framed message body already stripped of its protocol header.
    async fn handle(&self, session: Arc<SessionContext>, body: &[u8]) -> HandlerVerdict;
}

/// Holds the set of registered handlers and dispatches inbound buffers to the first one whose
/// prefix matches.
#[derive(Default)]
pub struct ProtocolRouter {
    handlers: Vec<Arc<dyn Handler>>,
}

impl ProtocolRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        log::debug!(target: TARGET, "registered handler for {:?}", handler.protocol_prefix());
        self.handlers.push(handler);
    }

    fn find(&self, protocol_id: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.iter().find(|h| protocol_id.starts_with(h.protocol_prefix()))
    }

    /// Dispatches `body` to the handler registered for `protocol_id`. Unknown protocols yield
    /// [`HandlerVerdict::Error`].
    pub async fn dispatch(&self, protocol_id: &str, session: Arc<SessionContext>, body: &[u8]) -> HandlerVerdict {
        match self.find(protocol_id) {
            Some(handler) => handler.handle(session, body).await,
            None => {
                log::debug!(target: TARGET, "no handler for protocol {protocol_id:?}");
                HandlerVerdict::Error
            },
        }
    }
}
