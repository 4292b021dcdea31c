//! # Domain Services
//!
//! Pure functions used by the coordinator: address derivation, checksums,
//! port naming and bytecode decompression.
//!
//! All functions are deterministic and free of I/O beyond in-memory buffers.

use crate::domain::value_objects::{Address, Checksum, CodeId};
use crate::errors::ContractError;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::io::Read;

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Derives a contract address from its code id and global instance sequence.
///
/// Address = sha256("C" ++ uvarint(code_id << 32 | instance_id) zero-padded
/// to 20 bytes)\[..20\]
#[must_use]
pub fn contract_address(code_id: CodeId, instance_id: u64) -> Address {
    let contract_id = (code_id << 32).wrapping_add(instance_id);

    let mut buf = [0u8; 20];
    buf[0] = b'C';
    put_uvarint(&mut buf[1..], contract_id);

    let hash = Sha256::digest(buf);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[..20]);
    Address::new(addr)
}

/// LEB128 unsigned varint. `out` must hold at least 10 bytes.
fn put_uvarint(out: &mut [u8], mut value: u64) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        out[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    out[i] = value as u8;
    i + 1
}

// =============================================================================
// CODE HELPERS
// =============================================================================

/// SHA-256 checksum of uncompressed bytecode.
#[must_use]
pub fn checksum(code: &[u8]) -> Checksum {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(code));
    Checksum::new(out)
}

/// Port identifier bound to a contract exposing cross-chain entry points.
#[must_use]
pub fn port_id_for_contract(address: &Address) -> String {
    format!("wasm.{address}")
}

/// Gas charged for compiling `code_len` bytes.
#[must_use]
pub fn compile_cost(code_len: usize, cost_per_byte: u64) -> u64 {
    (code_len as u64).saturating_mul(cost_per_byte)
}

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Returns true if `code` starts with the gzip header.
#[must_use]
pub fn is_gzip(code: &[u8]) -> bool {
    code.starts_with(&GZIP_MAGIC)
}

/// Inflates gzip-compressed bytecode and enforces `max_size` on the result.
///
/// Uncompressed input is only size-checked.
///
/// # Errors
///
/// `CreateFailed` for empty input, a corrupt gzip stream or oversized code.
pub fn uncompress(code: &[u8], max_size: usize) -> Result<Vec<u8>, ContractError> {
    if code.is_empty() {
        return Err(ContractError::CreateFailed("empty wasm code".into()));
    }
    if !is_gzip(code) {
        if code.len() > max_size {
            return Err(ContractError::CreateFailed(format!(
                "code size {} exceeds limit {max_size}",
                code.len()
            )));
        }
        return Ok(code.to_vec());
    }

    let mut out = Vec::new();
    GzDecoder::new(code)
        .take(max_size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| ContractError::CreateFailed(format!("gzip: {e}")))?;
    if out.len() > max_size {
        return Err(ContractError::CreateFailed(format!(
            "uncompressed code exceeds limit {max_size}"
        )));
    }
    if out.is_empty() {
        return Err(ContractError::CreateFailed("empty wasm code".into()));
    }
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================
