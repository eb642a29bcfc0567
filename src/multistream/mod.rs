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

//! Initial capability handshake over a freshly-accepted [`crate::stream::PeerStream`] (§4.2).

use std::{sync::Arc, time::Duration};

use nom::{
    bytes::complete::{tag, take_till1},
    combinator::eof,
    sequence::terminated,
    IResult,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::stream::{PeerStream, StreamError};

pub const MULTISTREAM_PROTOCOL_ID: &str = "/multistream/1.0.0";
pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("negotiation stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("malformed announce line")]
    Malformed,
    #[error("peer does not support multistream")]
    UnsupportedMultistream,
    #[error("no common protocol with peer")]
    NoCommonProtocol,
}

/// Parses a `\n`-terminated announce line into its bare protocol id, stripping the delimiter and
/// rejecting anything that doesn't start with `/`.
fn parse_announce_line(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (rest, id) = terminated(take_till1(|b| b == b'\n'), tag(b"\n".as_slice()))(input)?;
    let (rest, _) = eof(rest)?;
    Ok((rest, id))
}

fn protocol_id_of(line: &[u8]) -> Result<&str, NegotiationError> {
    let (_, id) = parse_announce_line(line).map_err(|_| NegotiationError::Malformed)?;
    if !id.starts_with(b"/") {
        return Err(NegotiationError::Malformed);
    }
    std::str::from_utf8(id).map_err(|_| NegotiationError::Malformed)
}

fn announce_line(protocol_id: &str) -> Vec<u8> {
    let mut line = Vec::with_capacity(protocol_id.len() + 1);
    line.extend_from_slice(protocol_id.as_bytes());
    line.push(b'\n');
    line
}

/// Performs the server side of the multistream handshake: exchange the `/multistream/1.0.0`
/// preamble, then read the peer's proposed sub-protocols one at a time, replying `na` to any we
/// don't support and confirming (echoing the line back) the first one we do. Bounded by
/// [`NEGOTIATION_TIMEOUT`] overall.
pub struct MultistreamNegotiator {
    supported: Vec<String>,
}

impl MultistreamNegotiator {
    pub fn new(supported: Vec<String>) -> Self {
        Self { supported }
    }

    pub async fn negotiate<T>(&self, stream: &Arc<PeerStream<T>>) -> Result<String, NegotiationError>
    where T: AsyncRead + AsyncWrite + Unpin + Send {
        tokio::time::timeout(NEGOTIATION_TIMEOUT, self.negotiate_inner(stream))
            .await
            .unwrap_or(Err(NegotiationError::NoCommonProtocol))
    }

    async fn negotiate_inner<T>(&self, stream: &Arc<PeerStream<T>>) -> Result<String, NegotiationError>
    where T: AsyncRead + AsyncWrite + Unpin + Send {
        stream.write_raw(&announce_line(MULTISTREAM_PROTOCOL_ID)).await?;
        let peer_preamble = stream.read_line(NEGOTIATION_TIMEOUT).await?;
        if protocol_id_of(&peer_preamble)? != MULTISTREAM_PROTOCOL_ID {
            return Err(NegotiationError::UnsupportedMultistream);
        }

        loop {
            let line = stream.read_line(NEGOTIATION_TIMEOUT).await?;
            let proposed = protocol_id_of(&line)?;
            if self.supported.iter().any(|p| p == proposed) {
                stream.write_raw(&announce_line(proposed)).await?;
                return Ok(proposed.to_string());
            }
            stream.write_raw(b"na\n").await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_protocol_id() {
        assert_eq!(protocol_id_of(b"/ipfs/bitswap/1.1.0\n").unwrap(), "/ipfs/bitswap/1.1.0");
    }

    #[test]
    fn rejects_line_without_leading_slash() {
        assert!(protocol_id_of(b"bogus\n").is_err());
    }

    #[tokio::test]
    async fn negotiates_common_protocol() {
        let (a, b) = tokio::io::duplex(1024);
        let a = Arc::new(PeerStream::new(a, None));
        let b = Arc::new(PeerStream::new(b, None));

        let negotiator = MultistreamNegotiator::new(vec!["/ipfs/bitswap/1.1.0".to_string()]);
        let server = tokio::spawn({
            let a = a.clone();
            async move { negotiator.negotiate(&a).await }
        });

        // client side
        let preamble = b.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(preamble, announce_line(MULTISTREAM_PROTOCOL_ID));
        b.write_raw(&announce_line(MULTISTREAM_PROTOCOL_ID)).await.unwrap();
        b.write_raw(&announce_line("/ipfs/unknown/1.0.0")).await.unwrap();
        let na = b.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(na, b"na\n");
        b.write_raw(&announce_line("/ipfs/bitswap/1.1.0")).await.unwrap();
        let confirm = b.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(confirm, announce_line("/ipfs/bitswap/1.1.0"));

        let selected = server.await.unwrap().unwrap();
        assert_eq!(selected, "/ipfs/bitswap/1.1.0");
    }

    #[tokio::test]
    async fn no_common_protocol_times_out() {
        let (a, b) = tokio::io::duplex(1024);
        let a = Arc::new(PeerStream::new(a, None));
        let b = Arc::new(PeerStream::new(b, None));

        let negotiator = MultistreamNegotiator::new(vec!["/ipfs/bitswap/1.1.0".to_string()]);
        let server = tokio::spawn(async move { negotiator.negotiate(&a).await });

        let _preamble = b.read_line(Duration::from_secs(1)).await.unwrap();
        b.write_raw(&announce_line(MULTISTREAM_PROTOCOL_ID)).await.unwrap();
        drop(b);

        let err = server.await.unwrap().unwrap_err();
        assert!(matches!(err, NegotiationError::Stream(_)));
    }
}
