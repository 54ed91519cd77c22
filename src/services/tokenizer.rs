use ring::digest;

/// Length of a token in hex characters (SHA-256)
pub const TOKEN_LEN: usize = 64;

/// Turns separator-stripped card digits into the value that gets stored.
///
/// SHA-256, hex encoded. Deterministic and one-way: there is no way back to
/// the card number.
pub fn tokenize(digits: &str) -> String {
    let hash = digest::digest(&digest::SHA256, digits.as_bytes());
    hex::encode(hash.as_ref())
}

/// True for strings shaped like a token (64 lowercase hex characters)
pub fn is_token(value: &str) -> bool {
    value.len() == TOKEN_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
