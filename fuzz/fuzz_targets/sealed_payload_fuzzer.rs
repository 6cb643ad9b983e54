//! Fuzz target for sealed payloads and the parsers behind them
//!
//! # Strategy
//!
//! - Garbage: arbitrary bytes presented as ciphertext
//! - Bit flips: one bit of a valid payload changed anywhere
//! - Plaintext: arbitrary bytes fed to the map index and panorama parsers
//!
//! # Invariants
//!
//! - Decryption NEVER panics, whatever the input length
//! - A payload round-trips under its own key
//! - Any single bit flip fails authentication
//! - Parsers of decrypted content NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use secretblog_core::{scan_markers, PanoramaCrop, TileIndex};
use secretblog_crypto::{decrypt, encrypt, ContentKey, NONCE_SIZE};

#[derive(Debug, Clone, Arbitrary)]
struct Payload {
    key: [u8; 16],
    nonce: [u8; NONCE_SIZE],
    plaintext: Vec<u8>,
    flip: Option<(u16, u8)>,
    garbage: Vec<u8>,
}

fuzz_target!(|payload: Payload| {
    let key = ContentKey::import(&payload.key).unwrap();
    let _ = decrypt(&key, &payload.garbage);

    let mut sealed = encrypt(&key, payload.nonce, &payload.plaintext);
    assert_eq!(decrypt(&key, &sealed).unwrap(), payload.plaintext);

    if let Some((at, bit)) = payload.flip {
        let at = usize::from(at) % sealed.len();
        sealed[at] ^= 1 << (bit % 8);
        assert!(decrypt(&key, &sealed).is_err(), "tampered payload authenticated");
    }

    let _ = PanoramaCrop::from_image(&payload.plaintext);
    if let Ok(text) = std::str::from_utf8(&payload.plaintext) {
        let _ = TileIndex::parse(text);
        let _ = scan_markers(text);
    }
});
