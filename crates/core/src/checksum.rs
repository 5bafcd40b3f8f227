//! Fingerprint primitives for content addressing.
//!
//! Fingerprints are 32-bit Adler-32 checksums. They are adequate for change
//! detection but not for adversarial settings; the mapping below is kept
//! stable so existing caches remain valid across releases.
//!
//! The composite fold is order-sensitive: `join_checksums` concatenates the
//! big-endian bytes of its operands and checksums the concatenation.

use adler2::Adler32;

/// A 32-bit content-derived identifier of a frozen input or target.
pub type Fingerprint = u32;

/// Checksum a byte slice.
pub fn checksum_bytes(bytes: &[u8]) -> Fingerprint {
  let mut hasher = Adler32::new();
  hasher.write_slice(bytes);
  hasher.checksum()
}

/// Checksum the UTF-8 bytes of a string.
pub fn checksum_string(s: &str) -> Fingerprint {
  checksum_bytes(s.as_bytes())
}

/// Fold checksums into one, order-sensitively.
///
/// `join_checksums(&[])` is the checksum of the empty byte string, `1`;
/// empty objects and arrays hash to this value.
pub fn join_checksums(checksums: &[Fingerprint]) -> Fingerprint {
  let mut buf = Vec::with_capacity(checksums.len() * 4);
  for checksum in checksums {
    buf.extend_from_slice(&checksum.to_be_bytes());
  }
  checksum_bytes(&buf)
}

/// Checksum an integer input.
///
/// The integer is zigzag varint-encoded into a fixed 8-byte buffer and the
/// whole buffer (zero padding included) is checksummed, byte-for-byte the
/// encoding the original cache format used.
pub fn checksum_int(i: i64) -> Fingerprint {
  let mut buf = [0u8; 8];
  let mut ux = (i as u64) << 1;
  if i < 0 {
    ux = !ux;
  }
  let mut n = 0;
  while ux >= 0x80 && n < buf.len() - 1 {
    buf[n] = (ux as u8) | 0x80;
    ux >>= 7;
    n += 1;
  }
  buf[n] = ux as u8;
  checksum_bytes(&buf)
}

/// Checksum a boolean input.
///
/// The mapping is inverted from intuition (`true` is byte `0x00`, `false`
/// is byte `0x01`). Preserved as-is: changing it would invalidate every
/// artifact already in a cache.
pub fn checksum_bool(b: bool) -> Fingerprint {
  if b { checksum_bytes(&[0]) } else { checksum_bytes(&[1]) }
}
