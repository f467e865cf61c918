//! Mine disarm PINs: a PIN is valid for a serial when `sha256(serial + pin)`, as
//! lowercase hex, starts with [`PIN_HASH_PREFIX`].

use std::sync::atomic::{AtomicBool, Ordering};

use sha2::{Digest, Sha256};

pub const PIN_HASH_PREFIX: &str = "000000";

pub fn pin_digest(serial: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serial.as_bytes());
    hasher.update(pin.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn pin_is_valid(serial: &str, pin: &str) -> bool {
    pin_matches(serial, pin, PIN_HASH_PREFIX)
}

fn pin_matches(serial: &str, pin: &str, prefix: &str) -> bool {
    pin_digest(serial, pin).starts_with(prefix)
}

/// Smallest decimal PIN whose digest starts with `prefix`. CPU bound; run it on a
/// blocking thread. Returns `None` once `cancel` is set.
pub fn find_pin(serial: &str, prefix: &str, cancel: &AtomicBool) -> Option<String> {
    (0u64..)
        .take_while(|_| !cancel.load(Ordering::Relaxed))
        .map(|candidate| candidate.to_string())
        .find(|candidate| pin_matches(serial, candidate, prefix))
}
