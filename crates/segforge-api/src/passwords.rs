//! Password hashing for the Password+Invite auth variant.
//!
//! Grounded on `original_source/.../server/passwords.py`: PBKDF2-HMAC-SHA256,
//! stored as `pbkdf2_sha256$<iters>$<salt_b64>$<dk_b64>`, verified with a
//! constant-time digest comparison.

use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ALG: &str = "pbkdf2_sha256";
const DEFAULT_ITERATIONS: u32 = 200_000;
const SALT_BYTES: usize = 16;
const DK_LEN: usize = 32;

fn b64e(raw: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw)
}

fn b64d(raw: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(raw).ok()
}

pub fn hash_password(password: &str) -> String {
    hash_password_with_iterations(password, DEFAULT_ITERATIONS)
}

fn hash_password_with_iterations(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut dk = [0u8; DK_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut dk);
    format!("{ALG}${iterations}${}${}", b64e(&salt), b64e(&dk))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.splitn(4, '$').collect();
    let [alg, iters_s, salt_b64, dk_b64] = parts.as_slice() else {
        return false;
    };
    if *alg != ALG {
        return false;
    }
    let Ok(iterations) = iters_s.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let Some(salt) = b64d(salt_b64) else {
        return false;
    };
    let Some(want) = b64d(dk_b64) else {
        return false;
    };

    let mut got = vec![0u8; want.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut got);
    got.ct_eq(&want).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_with_correct_password() {
        let stored = hash_password_with_iterations("correct horse battery staple", 1_000);
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("wrong password", &stored));
    }

    #[test]
    fn stored_hash_has_expected_shape() {
        let stored = hash_password_with_iterations("hunter2", 1_000);
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2_sha256");
        assert_eq!(parts[1], "1000");
    }

    #[test]
    fn rejects_malformed_stored_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", "pbkdf2_sha256$0$salt$dk"));
    }
}
