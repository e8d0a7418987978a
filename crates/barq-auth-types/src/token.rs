//! Opaque bearer tokens used for session ids and OTP challenge ids.

/// Token entropy in bytes (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random 256-bit token, hex encoded (64 chars).
pub fn generate_opaque_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}
