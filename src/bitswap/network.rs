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

//! Frames, sends, and decodes bitswap 1.1.0 messages over a peer session (§4.7).

use std::sync::Arc;

use tokio::{io::AsyncRead, io::AsyncWrite, sync::Mutex};

use super::{
    cid::Cid,
    message::{BitswapCodecError, BitswapMessage},
    request_queue::PeerRequestQueue,
};
use crate::{
    exchange::ExchangeEngine,
    peer_manager::{ConnectionType, PeerId, Peerstore},
    routing::Routing,
    stream::PeerStream,
};

pub const TARGET: &str = "bitswap";
pub const PROTOCOL_HEADER: &[u8] = b"/ipfs/bitswap/1.1.0\n";

#[derive(Debug, thiserror::Error)]
pub enum BitswapError {
    #[error("peer unreachable, could not establish connection to send")]
    PeerUnreachable,
    #[error("stream write failed: {0}")]
    Stream(#[from] crate::stream::StreamError),
    #[error("inbound frame has no protocol header")]
    MissingHeader,
    #[error("inbound frame failed to decode: {0}")]
    Codec(#[from] BitswapCodecError),
    #[error("wantlist entry does not decode to a valid cid: {0}")]
    InvalidCid(#[from] super::cid::CidError),
    #[error("remote peer id is not yet known for this session")]
    UnknownRemotePeer,
}

pub struct BitswapNetwork {
    peerstore: Peerstore,
    routing: Arc<dyn Routing>,
    exchange: Arc<dyn ExchangeEngine>,
    request_queue: Mutex<PeerRequestQueue>,
    send_retries: u32,
}

impl BitswapNetwork {
    pub fn new(peerstore: Peerstore, routing: Arc<dyn Routing>, exchange: Arc<dyn ExchangeEngine>, send_retries: u32) -> Self {
        Self {
            peerstore,
            routing,
            exchange,
            request_queue: Mutex::new(PeerRequestQueue::new()),
            send_retries,
        }
    }

    /// Scans `frame` for the first `\n` and splits it into `(header, body)`, matching
    /// `exchange/bitswap/network.c`'s header scan. `ProtocolRouter` only prefix-matches the
    /// connection-level protocol id string and never touches the buffer, so every inbound frame
    /// still carries its header at this point; `handle_raw_frame` is the production entry point.
    pub fn split_header(frame: &[u8]) -> Option<(&[u8], &[u8])> {
        let pos = frame.iter().position(|&b| b == b'\n')?;
        Some(frame.split_at(pos + 1))
    }

    /// Encodes and sends `msg` to `peer_id` over `stream`. Connects first (with the configured
    /// retry budget) if the peer isn't already marked `Connected`. Returns `true` on success,
    /// `false` on any failure, matching the source's `0`/`1` return convention (§8 property 3).
    pub async fn send_message<T>(&self, stream: &PeerStream<T>, peer_id: &PeerId, msg: &BitswapMessage) -> bool
    where T: AsyncRead + AsyncWrite + Unpin + Send {
        match self.try_send_message(stream, peer_id, msg).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!(target: TARGET, "send_message to {peer_id} failed: {err}");
                false
            },
        }
    }

    async fn try_send_message<T>(&self, stream: &PeerStream<T>, peer_id: &PeerId, msg: &BitswapMessage) -> Result<(), BitswapError>
    where T: AsyncRead + AsyncWrite + Unpin + Send {
        let is_connected = self
            .peerstore
            .get(peer_id)
            .map(|p| p.connection_type == ConnectionType::Connected)
            .unwrap_or(false);
        if !is_connected {
            self.routing.connect(peer_id, self.send_retries).await.map_err(|_| BitswapError::PeerUnreachable)?;
        }

        let body = msg.encode_to_vec();
        let mut frame = Vec::with_capacity(PROTOCOL_HEADER.len() + body.len());
        frame.extend_from_slice(PROTOCOL_HEADER);
        frame.extend_from_slice(&body);

        stream.write_framed(&frame).await?;
        Ok(())
    }

    /// Decodes an inbound bitswap body, feeds received blocks to the exchange engine, and
    /// applies wantlist entries to the sender's request-queue entry (§4.7 inbound path).
    pub async fn handle_message(&self, remote_peer_id: Option<&PeerId>, body: &[u8]) -> bool {
        match self.try_handle_message(remote_peer_id, body).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!(target: TARGET, "handle_message failed: {err}");
                false
            },
        }
    }

    async fn try_handle_message(&self, remote_peer_id: Option<&PeerId>, body: &[u8]) -> Result<(), BitswapError> {
        let msg = BitswapMessage::decode_from_slice(body)?;

        for block in &msg.payload {
            self.exchange.has_block(block).await;
        }

        if let Some(wantlist) = &msg.wantlist {
            if !wantlist.entries.is_empty() {
                let peer_id = remote_peer_id.ok_or(BitswapError::UnknownRemotePeer)?;
                let mut queue = self.request_queue.lock().await;
                let entry = queue.entry(peer_id.clone());
                for want in &wantlist.entries {
                    let cid = Cid::decode(&want.block)?;
                    entry.apply(cid, want.priority, want.cancel);
                }
            }
        }
        Ok(())
    }

    /// Strips the protocol header from an inbound frame via [`Self::split_header`] and decodes
    /// the remaining body with [`Self::handle_message`]. This is the entry point
    /// `BitswapHandler` calls for every inbound bitswap frame.
    pub async fn handle_raw_frame(&self, remote_peer_id: Option<&PeerId>, frame: &[u8]) -> bool {
        match self.try_handle_raw_frame(remote_peer_id, frame).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!(target: TARGET, "handle_raw_frame failed: {err}");
                false
            },
        }
    }

    async fn try_handle_raw_frame(&self, remote_peer_id: Option<&PeerId>, frame: &[u8]) -> Result<(), BitswapError> {
        let (_, body) = Self::split_header(frame).ok_or(BitswapError::MissingHeader)?;
        self.try_handle_message(remote_peer_id, body).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        bitswap::message::{Block, Wantlist, WantlistEntry},
        peer_manager::Peer,
        routing::RoutingError,
    };

    struct AlwaysConnect;
    #[async_trait]
    impl Routing for AlwaysConnect {
        async fn ping(&self, _peer: &PeerId) -> Result<(), RoutingError> {
            Ok(())
        }

        async fn connect(&self, _peer: &PeerId, _retries: u32) -> Result<(), RoutingError> {
            Ok(())
        }
    }

    struct RecordingExchange {
        seen: Mutex<Vec<Vec<u8>>>,
    }
    #[async_trait]
    impl ExchangeEngine for RecordingExchange {
        async fn has_block(&self, block: &Block) {
            self.seen.lock().await.push(block.data.clone());
        }
    }

    fn cid_bytes(byte: u8) -> Vec<u8> {
        let mut bytes = vec![0x12, 0x20];
        bytes.extend_from_slice(&[byte; 32]);
        bytes
    }

    #[test]
    fn split_header_finds_first_newline() {
        let frame = b"/ipfs/bitswap/1.1.0\nbody-bytes";
        let (header, body) = BitswapNetwork::split_header(frame).unwrap();
        assert_eq!(header, PROTOCOL_HEADER);
        assert_eq!(body, b"body-bytes");
    }

    #[test]
    fn split_header_none_without_newline() {
        assert!(BitswapNetwork::split_header(b"no newline here").is_none());
    }

    #[tokio::test]
    async fn send_message_writes_header_then_body() {
        use tokio::io::AsyncReadExt;

        let (a, mut b) = tokio::io::duplex(4096);
        let a = PeerStream::new(a, None);

        let peerstore = Peerstore::new();
        let peer_id = PeerId::new(vec![7]);
        let mut peer = Peer::new(peer_id.clone(), Vec::new());
        peer.connection_type = ConnectionType::Connected;
        peerstore.upsert(peer);

        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) }), 10);
        let msg = BitswapMessage { wantlist: None, blocks: Vec::new(), payload: vec![Block { prefix: vec![], data: b"abc".to_vec() }] };

        let ok = network.send_message(&a, &peer_id, &msg).await;
        assert!(ok);

        let mut len_buf = [0u8; 4];
        b.read_exact(&mut len_buf).await.unwrap();
        let mut header_buf = [0u8; 20];
        b.read_exact(&mut header_buf).await.unwrap();
        assert_eq!(&header_buf, PROTOCOL_HEADER);
    }

    #[tokio::test]
    async fn handle_raw_frame_strips_header_before_decoding() {
        let peerstore = Peerstore::new();
        let exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), exchange.clone(), 10);

        let msg = BitswapMessage { wantlist: None, blocks: Vec::new(), payload: vec![Block { prefix: vec![], data: b"abc".to_vec() }] };
        let mut frame = Vec::new();
        frame.extend_from_slice(PROTOCOL_HEADER);
        frame.extend_from_slice(&msg.encode_to_vec());

        let ok = network.handle_raw_frame(None, &frame).await;
        assert!(ok);
        assert_eq!(exchange.seen.lock().await.as_slice(), &[b"abc".to_vec()]);
    }

    #[tokio::test]
    async fn handle_raw_frame_fails_without_header() {
        let peerstore = Peerstore::new();
        let exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), exchange, 10);

        let ok = network.handle_raw_frame(None, b"no header here").await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn send_message_output_round_trips_through_handle_raw_frame() {
        let (a, b) = tokio::io::duplex(4096);
        let a = PeerStream::new(a, None);
        let b = PeerStream::new(b, None);

        let peerstore = Peerstore::new();
        let peer_id = PeerId::new(vec![7]);
        let mut peer = Peer::new(peer_id.clone(), Vec::new());
        peer.connection_type = ConnectionType::Connected;
        peerstore.upsert(peer);

        let sender_network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) }), 10);
        let msg = BitswapMessage { wantlist: None, blocks: Vec::new(), payload: vec![Block { prefix: vec![], data: b"abc".to_vec() }] };
        assert!(sender_network.send_message(&a, &peer_id, &msg).await);

        let receiver_exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let receiver_network = BitswapNetwork::new(Peerstore::new(), Arc::new(AlwaysConnect), receiver_exchange.clone(), 10);
        let frame = b.read(std::time::Duration::from_secs(1)).await.unwrap();
        assert!(receiver_network.handle_raw_frame(None, &frame).await);
        assert_eq!(receiver_exchange.seen.lock().await.as_slice(), &[b"abc".to_vec()]);
    }

    #[tokio::test]
    async fn handle_message_calls_has_block_for_each_payload_entry() {
        let peerstore = Peerstore::new();
        let exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), exchange.clone(), 10);

        let msg = BitswapMessage {
            wantlist: None,
            blocks: Vec::new(),
            payload: vec![Block { prefix: vec![], data: b"abc".to_vec() }, Block { prefix: vec![], data: b"def".to_vec() }],
        };
        let ok = network.handle_message(None, &msg.encode_to_vec()).await;
        assert!(ok);
        assert_eq!(exchange.seen.lock().await.as_slice(), &[b"abc".to_vec(), b"def".to_vec()]);
    }

    #[tokio::test]
    async fn handle_message_applies_wantlist_to_sender_entry() {
        let peerstore = Peerstore::new();
        let exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), exchange, 10);
        let sender = PeerId::new(vec![3]);

        let msg = BitswapMessage {
            wantlist: Some(Wantlist { entries: vec![WantlistEntry { block: cid_bytes(1), priority: 1, cancel: false }], full: false }),
            blocks: Vec::new(),
            payload: Vec::new(),
        };
        let ok = network.handle_message(Some(&sender), &msg.encode_to_vec()).await;
        assert!(ok);

        let queue = network.request_queue.lock().await;
        assert_eq!(queue.get(&sender).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn handle_message_without_known_sender_fails_when_wantlist_present() {
        let peerstore = Peerstore::new();
        let exchange = Arc::new(RecordingExchange { seen: Mutex::new(Vec::new()) });
        let network = BitswapNetwork::new(peerstore, Arc::new(AlwaysConnect), exchange, 10);

        let msg = BitswapMessage {
            wantlist: Some(Wantlist { entries: vec![WantlistEntry { block: cid_bytes(1), priority: 1, cancel: false }], full: false }),
            blocks: Vec::new(),
            payload: Vec::new(),
        };
        let ok = network.handle_message(None, &msg.encode_to_vec()).await;
        assert!(!ok);
    }
}
