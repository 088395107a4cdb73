//! Device fingerprinting for license binding.
//!
//! The fingerprint packs three small hardware-derived hashes into a single
//! 32-bit composite, laid out `[cpu:8 | volume:8 | mac:16]`. The licensing
//! service binds the composite (as `id_b64`) into issued tokens; at check
//! time the engine recomputes its own fingerprint and compares tolerantly:
//! a token still matches if at least two of the three components agree, so
//! a single hardware change (new network card, renamed machine) does not
//! invalidate the license.
//!
//! Platform probes live in the per-OS submodules; everything arithmetic is
//! in this file and is a pure function of the probe values.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Composite identifier for the machine the engine is running on.
///
/// Computed once at engine construction and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    /// Host-provided machine name, shown to the user in the license portal.
    pub device_name: String,
    pub cpu_hash: u8,
    pub volume_hash: u8,
    pub mac_hash: u16,
    /// `(cpu_hash << 24) | (volume_hash << 16) | mac_hash`
    pub composite: u32,
    /// Base64 of the decimal-ASCII rendering of `composite`. This is the
    /// value sent to the server as the device signature.
    pub id_b64: String,
}

impl DeviceFingerprint {
    /// Probe the current machine.
    ///
    /// Infallible: a probe that cannot be read contributes a zero
    /// component rather than failing the whole fingerprint.
    pub fn collect() -> Self {
        let device_name = machine_name();
        let cpu_hash = cpu_probe();
        let volume_hash = volume_probe(&device_name);
        let digests: Vec<u8> = mac_addresses().iter().map(|mac| fold_bytes(mac)).collect();
        if digests.is_empty() {
            tracing::warn!("no ethernet interfaces found, mac component is zero");
        }
        let mac_hash = pair_mac_digests(&digests);
        Self::from_parts(device_name, cpu_hash, volume_hash, mac_hash)
    }

    /// Assemble a fingerprint from already-computed component hashes.
    pub fn from_parts(device_name: String, cpu_hash: u8, volume_hash: u8, mac_hash: u16) -> Self {
        let composite =
            (u32::from(cpu_hash) << 24) | (u32::from(volume_hash) << 16) | u32::from(mac_hash);
        let id_b64 = BASE64.encode(composite.to_string());
        Self {
            device_name,
            cpu_hash,
            volume_hash,
            mac_hash,
            composite,
            id_b64,
        }
    }

    /// Tolerant comparison against a device signature bound into a token.
    ///
    /// Decodes `presented_b64` back to a composite, splits it into its
    /// three fields, and declares a match if at least two of them equal
    /// ours. Any decode or parse failure is a mismatch.
    pub fn matches(&self, presented_b64: &str) -> bool {
        let Some((cpu, volume, mac)) = decode_components(presented_b64) else {
            return false;
        };
        let mut n = 0;
        if cpu == self.cpu_hash {
            n += 1;
        }
        if volume == self.volume_hash {
            n += 1;
        }
        if mac == self.mac_hash {
            n += 1;
        }
        n >= 2
    }
}

/// Decode a device signature back into `(cpu, volume, mac)`.
fn decode_components(presented_b64: &str) -> Option<(u8, u8, u16)> {
    let decoded = BASE64.decode(presented_b64).ok()?;
    let composite: u32 = std::str::from_utf8(&decoded).ok()?.parse().ok()?;
    Some((
        (composite >> 24) as u8,
        (composite >> 16) as u8,
        composite as u16,
    ))
}

/// Fold a byte string into an 8-bit digest.
///
/// Accumulates `byte << ((i & 1) * 8)` with the running hash held in eight
/// bits, matching the value the licensing service derives server-side.
fn fold_bytes(bytes: &[u8]) -> u8 {
    let mut hash: u8 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let shifted = u32::from(b) << ((i & 1) * 8);
        hash = (u32::from(hash).wrapping_add(shifted)) as u8;
    }
    hash
}

/// Combine per-interface MAC digests into the 16-bit field.
///
/// Takes the first two digests (missing slots are zero), orders the pair
/// ascending, and packs `(low << 8) | high`.
fn pair_mac_digests(digests: &[u8]) -> u16 {
    let first = digests.first().copied().unwrap_or(0);
    let second = digests.get(1).copied().unwrap_or(0);
    let (low, high) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };
    (u16::from(low) << 8) | u16::from(high)
}

/// Parse a textual MAC address (`aa:bb:cc:dd:ee:ff` or dash-separated).
fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut count = 0;
    for part in text.trim().split(|c| c == ':' || c == '-') {
        if count == 6 {
            return None;
        }
        out[count] = u8::from_str_radix(part, 16).ok()?;
        count += 1;
    }
    (count == 6).then_some(out)
}

fn machine_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn cpu_probe() -> u8 {
    #[cfg(target_os = "windows")]
    {
        windows::cpu_probe()
    }
    #[cfg(target_os = "macos")]
    {
        macos::cpu_probe()
    }
    #[cfg(target_os = "linux")]
    {
        linux::cpu_probe()
    }
}

fn volume_probe(machine_name: &str) -> u8 {
    #[cfg(target_os = "windows")]
    {
        let _ = machine_name;
        windows::volume_probe()
    }
    #[cfg(target_os = "macos")]
    {
        macos::volume_probe(machine_name)
    }
    #[cfg(target_os = "linux")]
    {
        linux::volume_probe(machine_name)
    }
}

fn mac_addresses() -> Vec<[u8; 6]> {
    #[cfg(target_os = "windows")]
    {
        windows::mac_addresses()
    }
    #[cfg(target_os = "macos")]
    {
        macos::mac_addresses()
    }
    #[cfg(target_os = "linux")]
    {
        linux::mac_addresses()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(cpu: u8, volume: u8, mac: u16) -> DeviceFingerprint {
        DeviceFingerprint::from_parts("studio-mac".to_string(), cpu, volume, mac)
    }

    #[test]
    fn composite_layout() {
        let f = fp(0xAB, 0xCD, 0x1234);
        assert_eq!(f.composite, 0xABCD_1234);
        assert_eq!(f.composite >> 24, u32::from(f.cpu_hash));
        assert_eq!((f.composite >> 16) & 0xFF, u32::from(f.volume_hash));
        assert_eq!(f.composite & 0xFFFF, u32::from(f.mac_hash));
    }

    #[test]
    fn id_is_base64_of_decimal() {
        let f = fp(0, 0, 42);
        assert_eq!(BASE64.decode(&f.id_b64).unwrap(), b"42");
    }

    #[test]
    fn identical_parts_give_identical_fingerprints() {
        let a = fp(7, 9, 300);
        let b = fp(7, 9, 300);
        assert_eq!(a.composite, b.composite);
        assert_eq!(a.id_b64, b.id_b64);
    }

    #[test]
    fn exact_match_passes() {
        let f = fp(1, 2, 3);
        assert!(f.matches(&f.id_b64));
    }

    #[test]
    fn single_component_drift_still_matches() {
        let cached = fp(1, 2, 3);
        assert!(cached.matches(&fp(99, 2, 3).id_b64));
        assert!(cached.matches(&fp(1, 99, 3).id_b64));
        assert!(cached.matches(&fp(1, 2, 999).id_b64));
    }

    #[test]
    fn two_component_drift_fails() {
        let cached = fp(1, 2, 3);
        assert!(!cached.matches(&fp(99, 98, 3).id_b64));
        assert!(!cached.matches(&fp(99, 2, 999).id_b64));
        assert!(!cached.matches(&fp(1, 98, 999).id_b64));
        assert!(!cached.matches(&fp(99, 98, 999).id_b64));
    }

    #[test]
    fn garbage_signature_fails() {
        let f = fp(1, 2, 3);
        assert!(!f.matches("not base64 at all!"));
        // valid base64, but not a decimal composite
        assert!(!f.matches(&BASE64.encode("hello")));
        assert!(!f.matches(""));
    }

    #[test]
    fn fold_ignores_high_byte_contributions() {
        // odd-indexed bytes are shifted past the 8-bit accumulator
        assert_eq!(fold_bytes(b"ab"), 97);
        assert_eq!(fold_bytes(b"abc"), 196);
        assert_eq!(fold_bytes(&[]), 0);
    }

    #[test]
    fn mac_pairing_orders_ascending() {
        assert_eq!(pair_mac_digests(&[9, 4]), 0x0409);
        assert_eq!(pair_mac_digests(&[4, 9]), 0x0409);
        assert_eq!(pair_mac_digests(&[5]), 0x0005);
        assert_eq!(pair_mac_digests(&[]), 0);
        // extra interfaces beyond the first two are ignored
        assert_eq!(pair_mac_digests(&[4, 9, 200]), 0x0409);
    }

    #[test]
    fn parse_mac_formats() {
        assert_eq!(
            parse_mac("aa:bb:cc:dd:ee:ff"),
            Some([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
        );
        assert_eq!(
            parse_mac("AA-BB-CC-DD-EE-FF"),
            Some([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
        );
        assert_eq!(parse_mac("aa:bb:cc"), None);
        assert_eq!(parse_mac("aa:bb:cc:dd:ee:ff:00"), None);
        assert_eq!(parse_mac("zz:bb:cc:dd:ee:ff"), None);
    }

    #[test]
    fn collect_is_deterministic() {
        let a = DeviceFingerprint::collect();
        let b = DeviceFingerprint::collect();
        assert_eq!(a.composite, b.composite);
        assert_eq!(a.id_b64, b.id_b64);
        assert!(a.matches(&b.id_b64));
    }
}
