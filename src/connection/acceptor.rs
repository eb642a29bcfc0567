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

//! Binds the listening socket and hands off accepted connections to the worker pool, invoking
//! `MaintenanceTicker` on every idle readiness-wait timeout (§4.5).

use std::{sync::Arc, time::Duration};

use tari_shutdown::ShutdownSignal;
use tokio::net::TcpListener;

use super::{slot::ConnectionCounter, worker::ConnectionWorker};
use crate::{
    config::NodeConfig,
    datastore::Datastore,
    maintenance::MaintenanceTicker,
    multistream::MultistreamNegotiator,
    protocol::ProtocolRouter,
    worker_pool::WorkerPool,
};

pub const TARGET: &str = "connection_manager";

#[derive(Debug, thiserror::Error)]
pub enum AcceptorError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, source: std::io::Error },
}

pub struct Acceptor {
    listener: TcpListener,
    counter: ConnectionCounter,
    cap: usize,
    pool: WorkerPool,
    router: Arc<ProtocolRouter>,
    negotiator: Arc<MultistreamNegotiator>,
    shutdown: ShutdownSignal,
    datastore: Arc<dyn Datastore>,
    filestore: Arc<dyn Datastore>,
    read_timeout: Duration,
    idle_max_ticks: u32,
    accept_poll: Duration,
}

impl Acceptor {
    pub async fn bind(
        config: &NodeConfig,
        router: Arc<ProtocolRouter>,
        negotiator: Arc<MultistreamNegotiator>,
        shutdown: ShutdownSignal,
        datastore: Arc<dyn Datastore>,
        filestore: Arc<dyn Datastore>,
    ) -> Result<Self, AcceptorError> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| AcceptorError::Bind { addr: config.listen_addr, source })?;
        log::info!(target: TARGET, "listening on {}", config.listen_addr);

        Ok(Self {
            listener,
            counter: ConnectionCounter::new(),
            cap: config.connection_cap,
            pool: WorkerPool::new(config.pool_size, config.pool_size),
            router,
            negotiator,
            shutdown,
            datastore,
            filestore,
            read_timeout: Duration::from_secs(config.read_timeout_s),
            idle_max_ticks: config.idle_max_ticks,
            accept_poll: Duration::from_secs(config.accept_poll_s),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until shutdown is signaled, then drains the worker pool.
    pub async fn run(self, mut maintenance: MaintenanceTicker) {
        let Acceptor {
            listener,
            counter,
            cap,
            pool,
            router,
            negotiator,
            mut shutdown,
            datastore,
            filestore,
            read_timeout,
            idle_max_ticks,
            accept_poll,
        } = self;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            match tokio::time::timeout(accept_poll, listener.accept()).await {
                Ok(Ok((tcp, peer_addr))) => {
                    let Some(slot) = counter.try_acquire(cap) else {
                        log::debug!(target: TARGET, "connection cap reached, closing {peer_addr}");
                        drop(tcp);
                        continue;
                    };
                    let worker =
                        ConnectionWorker::new(slot, router.clone(), negotiator.clone(), shutdown.clone(), read_timeout, idle_max_ticks);
                    let datastore = datastore.clone();
                    let filestore = filestore.clone();
                    if pool.try_submit(move || worker.run(tcp, peer_addr, datastore, filestore)).is_err() {
                        log::debug!(target: TARGET, "worker pool saturated, closing {peer_addr}");
                    }
                },
                Ok(Err(err)) => {
                    log::warn!(target: TARGET, "accept failed: {err}");
                },
                Err(_elapsed) => {
                    maintenance.tick_one().await;
                },
            }
        }

        log::info!(target: TARGET, "shutdown signaled, draining worker pool");
        pool.shutdown().await;
    }
}
