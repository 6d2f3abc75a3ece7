//! Stored-name generation
//!
//! Uploads are persisted under a name derived from the original filename and
//! the clock: `{base}_{token}{extension}`. The token renders the upload
//! instant as hex with decimal digits substituted by the letters A-J, which
//! keeps names compact and roughly sortable by age.
//!
//! A seconds-only token collides whenever two same-named files arrive within
//! the same second, so the token also carries the millisecond component and
//! four random hex characters. Collisions would silently overwrite the
//! earlier blob, which the store must never do.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Map a hex string's decimal digits to A-J, passing a-f through.
fn substitute(hex: &str) -> String {
    hex.chars()
        .map(|c| match c {
            '0'..='9' => (b'A' + (c as u8 - b'0')) as char,
            other => other,
        })
        .collect()
}

/// Build the uniqueness token from explicit inputs.
fn token(secs: u64, millis: u32, entropy: &str) -> String {
    let mut out = substitute(&format!("{:x}", secs));
    out.push_str(&substitute(&format!("{:03x}", millis)));
    out.push_str(&substitute(entropy));
    out
}

/// Derive a stored name from `original_name` and explicit clock/entropy
/// inputs. The extension is everything from the last `.` inclusive.
fn generate_at(original_name: &str, secs: u64, millis: u32, entropy: &str) -> String {
    let (base, ext) = match original_name.rfind('.') {
        Some(idx) if idx > 0 => original_name.split_at(idx),
        _ => (original_name, ""),
    };
    format!("{}_{}{}", base, token(secs, millis, entropy), ext)
}

/// Derive a collision-resistant stored name for an upload.
pub fn generate(original_name: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let entropy = Uuid::new_v4().simple().to_string();
    generate_at(
        original_name,
        now.as_secs(),
        now.subsec_millis(),
        &entropy[..4],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_decimal_digits_only() {
        assert_eq!(substitute("0123456789"), "ABCDEFGHIJ");
        assert_eq!(substitute("abcdef"), "abcdef");
        assert_eq!(substitute("68b1f2a0"), "GIbBfCaA");
    }

    #[test]
    fn splits_extension_at_last_dot() {
        let name = generate_at("archive.tar.gz", 0x68b1f2a0, 0, "");
        assert!(name.starts_with("archive.tar_"));
        assert!(name.ends_with(".gz"));
    }

    #[test]
    fn handles_names_without_extension() {
        // seconds "GIbBfCaA" + millis "AAA" + no entropy
        let name = generate_at("README", 0x68b1f2a0, 0, "");
        assert_eq!(name, "README_GIbBfCaAAAA");
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        let name = generate_at(".bashrc", 0x1, 0, "");
        assert!(name.starts_with(".bashrc_"));
    }

    #[test]
    fn same_second_different_millis_differ() {
        let a = generate_at("photo.jpg", 1_700_000_000, 1, "aa11");
        let b = generate_at("photo.jpg", 1_700_000_000, 2, "aa11");
        assert_ne!(a, b);
    }

    #[test]
    fn same_instant_different_entropy_differ() {
        let a = generate_at("photo.jpg", 1_700_000_000, 5, "aa11");
        let b = generate_at("photo.jpg", 1_700_000_000, 5, "bb22");
        assert_ne!(a, b);
    }

    #[test]
    fn different_seconds_differ() {
        let a = generate_at("photo.jpg", 1_700_000_000, 0, "");
        let b = generate_at("photo.jpg", 1_700_000_001, 0, "");
        assert_ne!(a, b);
    }

    #[test]
    fn token_alphabet_is_letters_and_hex() {
        let name = generate("clip.mp4");
        let token = name
            .strip_prefix("clip_")
            .and_then(|rest| rest.strip_suffix(".mp4"))
            .unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
