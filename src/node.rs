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

//! Composition root: wires configuration, peer manager, protocol router, and bitswap into a
//! runnable node.

use std::sync::Arc;

use tari_shutdown::ShutdownSignal;

use crate::{
    bitswap::{BitswapHandler, BitswapNetwork},
    config::NodeConfig,
    connection::Acceptor,
    datastore::Datastore,
    exchange::ExchangeEngine,
    journal::JournalSync,
    maintenance::MaintenanceTicker,
    multistream::MultistreamNegotiator,
    peer_manager::Peerstore,
    protocol::ProtocolRouter,
    routing::Routing,
};

/// Collaborators the embedder supplies; see §1 for why each is out of scope for this core.
pub struct NodeDeps {
    pub datastore: Arc<dyn Datastore>,
    pub filestore: Arc<dyn Datastore>,
    pub routing: Arc<dyn Routing>,
    pub journal: Arc<dyn JournalSync>,
    pub exchange: Arc<dyn ExchangeEngine>,
}

pub struct IpfsNode {
    config: NodeConfig,
    peerstore: Peerstore,
    deps: NodeDeps,
    shutdown: ShutdownSignal,
}

impl IpfsNode {
    pub fn new(config: NodeConfig, peerstore: Peerstore, deps: NodeDeps, shutdown: ShutdownSignal) -> Self {
        Self { config, peerstore, deps, shutdown }
    }

    /// Binds the listener, wires the protocol router (bitswap today; additional handlers may be
    /// registered by embedders before this is called via [`IpfsNode::router_mut`] in a future
    /// revision), and runs the accept loop to completion. Returns once the shutdown signal has
    /// propagated through every worker.
    pub async fn run(self) -> anyhow::Result<()> {
        let bitswap_network = Arc::new(BitswapNetwork::new(
            self.peerstore.clone(),
            self.deps.routing.clone(),
            self.deps.exchange.clone(),
            self.config.bitswap_send_retries,
        ));

        let mut router = ProtocolRouter::new();
        router.register(Arc::new(BitswapHandler::new(bitswap_network)));
        let router = Arc::new(router);

        let negotiator = Arc::new(MultistreamNegotiator::new(vec!["/ipfs/bitswap/1.1.0".to_string()]));

        let acceptor = Acceptor::bind(
            &self.config,
            router,
            negotiator,
            self.shutdown.clone(),
            self.deps.datastore.clone(),
            self.deps.filestore.clone(),
        )
        .await?;

        let maintenance = MaintenanceTicker::new(self.peerstore.clone(), self.deps.routing.clone(), self.deps.journal.clone(), &self.config);

        acceptor.run(maintenance).await;
        Ok(())
    }
}
