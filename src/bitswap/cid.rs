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

//! Minimal CID validation (§3: "content id decodes to a valid CID").
//!
//! Full multihash/multicodec interpretation belongs to the block/Merkle-DAG store, which is out
//! of scope here; this type only validates the shape well enough to reject garbage before it
//! reaches the wantlist.

use data_encoding::HEXLOWER;

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("cid is empty")]
    Empty,
    #[error("cidv1 multihash digest length does not match its declared size")]
    TruncatedMultihash,
}

/// A validated content identifier, stored as its raw encoded bytes.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Cid(Vec<u8>);

impl Cid {
    /// Validates `bytes` as a CID. CIDv0 is a bare 34-byte sha2-256 multihash (`0x12 0x20 <32
    /// bytes>`); CIDv1 is `<version><codec><multihash>` where the multihash's declared digest
    /// length must match the bytes actually present. Anything else is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, CidError> {
        if bytes.is_empty() {
            return Err(CidError::Empty);
        }
        if bytes.len() == 34 && bytes[0] == 0x12 && bytes[1] == 0x20 {
            return Ok(Self(bytes.to_vec()));
        }
        // CIDv1: varint version (always 1 for our purposes, single byte), varint codec (single
        // byte), then a multihash: varint hash function, varint digest length, digest bytes.
        if bytes.len() >= 4 {
            let declared_len = bytes[3] as usize;
            if bytes.len() == 4 + declared_len {
                return Ok(Self(bytes.to_vec()));
            }
        }
        Err(CidError::TruncatedMultihash)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}
