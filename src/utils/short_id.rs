// src/utils/short_id.rs

use uuid::Uuid;

use crate::error::AppError;

/// Base62 alphabet used for public quiz codes.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encodes a quiz's public UUID as a short base62 code.
///
/// The transform is bijective: `decode(encode(id)) == id` for every UUID.
/// The nil UUID encodes as "0".
pub fn encode(id: Uuid) -> String {
    let mut n = id.as_u128();
    if n == 0 {
        return "0".to_string();
    }

    let base = ALPHABET.len() as u128;
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % base) as usize]);
        n /= base;
    }
    out.reverse();

    // ALPHABET is ASCII, so the bytes are valid UTF-8
    String::from_utf8(out).unwrap_or_default()
}

/// Decodes a base62 code back into the quiz UUID.
///
/// Rejects empty codes, characters outside the alphabet, and codes whose
/// value overflows 128 bits.
pub fn decode(code: &str) -> Result<Uuid, AppError> {
    if code.is_empty() {
        return Err(AppError::Validation("Quiz code must not be empty".to_string()));
    }

    let base = ALPHABET.len() as u128;
    let mut n: u128 = 0;
    for byte in code.bytes() {
        let digit = ALPHABET
            .iter()
            .position(|&c| c == byte)
            .ok_or_else(|| AppError::Validation(format!("Invalid quiz code: {}", code)))?
            as u128;
        n = n
            .checked_mul(base)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| AppError::Validation(format!("Invalid quiz code: {}", code)))?;
    }

    Ok(Uuid::from_u128(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_random_uuids() {
        for _ in 0..100 {
            let id = Uuid::new_v4();
            let code = encode(id);
            assert_eq!(decode(&code).unwrap(), id);
        }
    }

    #[test]
    fn round_trip_edge_values() {
        for id in [Uuid::nil(), Uuid::from_u128(1), Uuid::from_u128(u128::MAX)] {
            assert_eq!(decode(&encode(id)).unwrap(), id);
        }
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(decode("").is_err());
        assert!(decode("not-a-code!").is_err());
        // 23 'z's overflow u128
        assert!(decode(&"z".repeat(23)).is_err());
    }

    #[test]
    fn codes_are_url_safe() {
        let code = encode(Uuid::new_v4());
        assert!(code.bytes().all(|b| b.is_ascii_alphanumeric()));
    }
}
