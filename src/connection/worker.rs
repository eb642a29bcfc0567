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

//! The per-connection state machine: negotiate, then serve until released, closed, or shutdown
//! (§4.4).

use std::{sync::Arc, time::Duration};

use tari_shutdown::ShutdownSignal;
use tokio::{net::TcpStream, time};

use super::slot::ConnectionSlot;
use crate::{
    datastore::Datastore,
    multistream::MultistreamNegotiator,
    protocol::{HandlerVerdict, ProtocolRouter},
    session::SessionContext,
    stream::{PeekStatus, PeerStream},
};

pub const TARGET: &str = "connection_manager";

const IDLE_SLEEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Outcome {
    Released,
    Closed,
}

/// Drives one accepted TCP connection from negotiation through serving to completion.
pub struct ConnectionWorker {
    _slot: ConnectionSlot,
    router: Arc<ProtocolRouter>,
    negotiator: Arc<MultistreamNegotiator>,
    shutdown: ShutdownSignal,
    read_timeout: Duration,
    idle_max_ticks: u32,
}

impl ConnectionWorker {
    pub fn new(
        slot: ConnectionSlot,
        router: Arc<ProtocolRouter>,
        negotiator: Arc<MultistreamNegotiator>,
        shutdown: ShutdownSignal,
        read_timeout: Duration,
        idle_max_ticks: u32,
    ) -> Self {
        Self {
            _slot: slot,
            router,
            negotiator,
            shutdown,
            read_timeout,
            idle_max_ticks,
        }
    }

    /// Runs the connection to completion. The connection-slot guard is released on every exit
    /// path by virtue of being dropped at the end of this call (or, for a `Release` verdict,
    /// handed off inside `run_serving` — see that method's doc comment).
    pub async fn run(
        mut self,
        tcp: TcpStream,
        peer_addr: std::net::SocketAddr,
        datastore: Arc<dyn Datastore>,
        filestore: Arc<dyn Datastore>,
    ) {
        let stream = Arc::new(PeerStream::new(tcp, Some(peer_addr)));
        let selected_protocol = match self.negotiator.negotiate(&stream).await {
            Ok(protocol) => protocol,
            Err(err) => {
                log::debug!(target: TARGET, "negotiation with {peer_addr} failed: {err}");
                stream.close().await;
                return;
            },
        };
        log::debug!(target: TARGET, "negotiated {selected_protocol:?} with {peer_addr}");

        let session = Arc::new(SessionContext::new(stream, datastore, filestore));
        match self.run_serving(&selected_protocol, session.clone()).await {
            Outcome::Released => {
                log::debug!(target: TARGET, "connection with {peer_addr} released to handler");
            },
            Outcome::Closed => {
                session.default_stream.close().await;
                log::debug!(target: TARGET, "connection with {peer_addr} closed");
            },
        }
    }

    async fn run_serving(&mut self, protocol: &str, session: Arc<SessionContext>) -> Outcome {
        let mut idle_ticks: u32 = 0;
        loop {
            if self.shutdown.is_triggered() {
                return Outcome::Closed;
            }

            match session.default_stream.peek().await {
                Ok(PeekStatus::Ready(0)) => return Outcome::Closed,
                Ok(PeekStatus::Ready(_)) => {},
                Ok(PeekStatus::Empty) => {
                    idle_ticks += 1;
                    if idle_ticks >= self.idle_max_ticks {
                        log::debug!(
                            target: TARGET,
                            "tried {} times in the daemon loop. Exiting.",
                            self.idle_max_ticks
                        );
                        return Outcome::Closed;
                    }
                    time::sleep(IDLE_SLEEP).await;
                    continue;
                },
                Err(err) => {
                    log::debug!(target: TARGET, "peek error: {err}");
                    return Outcome::Closed;
                },
            }

            let body = match session.default_stream.read(self.read_timeout).await {
                Ok(body) => body,
                Err(err) => {
                    log::debug!(target: TARGET, "read error: {err}");
                    return Outcome::Closed;
                },
            };
            if self.shutdown.is_triggered() {
                return Outcome::Closed;
            }
            idle_ticks = 0;

            match self.router.dispatch(protocol, session.clone(), &body).await {
                HandlerVerdict::Keep => continue,
                HandlerVerdict::Release => return Outcome::Released,
                HandlerVerdict::Error => return Outcome::Closed,
            }
        }
    }
}
