//! Channel join codes.
//!
//! A code is a fixed-length string drawn uniformly from
//! [`CHANNEL_CODE_ALPHABET`]. Uniqueness is checked by the caller against the
//! channel collection; this module only produces and recognises candidates.

use rand::Rng;

use crate::constants::{CHANNEL_CODE_ALPHABET, CHANNEL_CODE_LEN};

/// Draw a fresh candidate code.
pub fn generate_channel_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CHANNEL_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHANNEL_CODE_ALPHABET.len());
            CHANNEL_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Whether `code` has the shape of a join code.
pub fn is_valid_channel_code(code: &str) -> bool {
    code.len() == CHANNEL_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_have_expected_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let code = generate_channel_code(&mut rng);
            assert!(is_valid_channel_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn seeded_draws_differ() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = generate_channel_code(&mut rng);
        let b = generate_channel_code(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_valid_channel_code("short"));
        assert!(!is_valid_channel_code("abcdefghi!"));
        assert!(!is_valid_channel_code("abcdefghijk"));
        assert!(is_valid_channel_code("Ab3dEf7hIj"));
    }
}
