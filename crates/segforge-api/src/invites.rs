//! Invite-code format helpers.
//!
//! Grounded verbatim on `original_source/.../server/invites.py`: a
//! crockford-ish alphabet (no `0/O/1/I` confusables), normalized to
//! uppercase on input, generated as `<PREFIX>-XXXX-XXXX-XXXX`.

use rand::seq::SliceRandom;

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn normalize_invite_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn new_invite_code(prefix: &str) -> String {
    let mut pref = prefix.trim().to_uppercase();
    if pref.is_empty() {
        pref = "SF-".to_string();
    } else if !pref.ends_with('-') {
        pref.push('-');
    }

    let mut rng = rand::thread_rng();
    let body: String = (0..12)
        .map(|_| *INVITE_ALPHABET.choose(&mut rng).expect("alphabet is non-empty") as char)
        .collect();

    format!("{pref}{}-{}-{}", &body[0..4], &body[4..8], &body[8..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_uppercase_trimmed() {
        assert_eq!(normalize_invite_code("  ab-cd12-ef34-gh56  "), "AB-CD12-EF34-GH56");
    }

    #[test]
    fn generated_code_matches_shape() {
        let code = new_invite_code("sf");
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "SF");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 4);
        assert_eq!(parts[3].len(), 4);
    }
}
