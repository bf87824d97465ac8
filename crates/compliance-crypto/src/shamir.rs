//! Shamir k-of-n secret sharing over GF(2^8), backed by the `sharks` crate.
//! Each share serializes as `[x, data...]` — one index byte followed by the
//! secret-length data bytes — so `Split(s, n, k)` shares are each exactly
//! `len(s) + 1` bytes, matching the wire format callers persist.

use compliance_types::error::{ComplianceError, MasterKeyBackupErrorCode, Result};
use sharks::{Share, Sharks};
use std::convert::TryFrom;

/// Splits `secret` into `total` shares, any `threshold` of which
/// reconstruct it. Requires `2 <= threshold <= total <= 255`.
pub fn split(secret: &[u8], total: u8, threshold: u8) -> Result<Vec<Vec<u8>>> {
    if threshold < 2 {
        return Err(ComplianceError::configuration("threshold must be at least 2"));
    }
    if threshold > total {
        return Err(ComplianceError::configuration("threshold must not exceed total shares"));
    }
    let sharks = Sharks(threshold);
    let dealer = sharks.dealer(secret);
    Ok(dealer.take(total as usize).map(|share| Vec::from(&share)).collect())
}

/// Reconstructs the secret from `shares`. Requires at least the
/// configured `threshold` distinct shares; `sharks` itself enforces that
/// shares agree on secret length.
pub fn reconstruct(shares: &[Vec<u8>], threshold: u8) -> Result<Vec<u8>> {
    if shares.len() < threshold as usize {
        return Err(ComplianceError::backup(
            MasterKeyBackupErrorCode::InsufficientShares,
            format!("need at least {} shares, got {}", threshold, shares.len()),
        ));
    }
    let parsed: Result<Vec<Share>> = shares
        .iter()
        .map(|bytes| {
            Share::try_from(bytes.as_slice())
                .map_err(|e| ComplianceError::backup(MasterKeyBackupErrorCode::InvalidShare, e.to_string()))
        })
        .collect();
    let parsed = parsed?;
    let sharks = Sharks(threshold);
    sharks
        .recover(parsed.as_slice())
        .map_err(|e| ComplianceError::backup(MasterKeyBackupErrorCode::InvalidShare, e.to_string()))
}

/// The share index (first byte) `sharks` assigns, `1..=255`.
pub fn share_index(share: &[u8]) -> Option<u8> {
    share.first().copied()
}
