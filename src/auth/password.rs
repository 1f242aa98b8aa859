/// Hash a plaintext password with bcrypt at the given cost.
pub fn hash(plain: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, cost)
}

/// Check a plaintext password against a stored hash. Malformed hashes never match.
pub fn verify(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}
