//! Structural hashing
//!
//! FNV-1a 64-bit. Fast and stable across runs, **not** collision free:
//! two different trees may share a hash, in which case the reconciler
//! skips an update it should have made. Accepted in exchange for speed.

use std::rc::Rc;

use crate::Value;

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Mix bytes into an existing FNV-1a 64-bit hash state.
#[inline]
pub const fn fnv1a64_mix(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    fnv1a64_mix(FNV1A_OFFSET_BASIS_64, bytes)
}

/// Structural digest of a value, used to memoize render snapshots.
/// Functions hash by pointer identity.
pub fn hash_value(value: &Value) -> u64 {
    mix_value(FNV1A_OFFSET_BASIS_64, value)
}

fn mix_value(hash: u64, value: &Value) -> u64 {
    match value {
        Value::Null => fnv1a64_mix(hash, b"n"),
        Value::Bool(b) => fnv1a64_mix(hash, if *b { b"t" } else { b"f" }),
        Value::Number(n) => fnv1a64_mix(fnv1a64_mix(hash, b"#"), &n.to_bits().to_le_bytes()),
        Value::String(s) => {
            let hash = fnv1a64_mix(hash, b"s");
            let hash = fnv1a64_mix(hash, &(s.len() as u64).to_le_bytes());
            fnv1a64_mix(hash, s.as_bytes())
        }
        Value::Array(items) => {
            let hash = fnv1a64_mix(hash, b"[");
            let hash = items.iter().fold(hash, mix_value);
            fnv1a64_mix(hash, b"]")
        }
        Value::Object(map) => {
            let hash = fnv1a64_mix(hash, b"{");
            let hash = map.iter().fold(hash, |h, (key, v)| {
                let h = fnv1a64_mix(h, &(key.len() as u64).to_le_bytes());
                let h = fnv1a64_mix(h, key.as_bytes());
                mix_value(h, v)
            });
            fnv1a64_mix(hash, b"}")
        }
        Value::Function(f) => {
            let ptr = Rc::as_ptr(f) as *const () as usize;
            fnv1a64_mix(fnv1a64_mix(hash, b"f"), &ptr.to_le_bytes())
        }
    }
}
