//! Password hashing. bcrypt embeds a random salt and its cost in the hash string.

/// Hash a raw password at the given bcrypt cost.
pub fn hash_password(raw: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(raw, cost)
}

/// Verify a raw password against a stored hash. A malformed hash never verifies.
pub fn verify_password(raw: &str, hash: &str) -> bool {
    bcrypt::verify(raw, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("correct horse", COST).unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn hashing_is_salted() {
        let h1 = hash_password("same", COST).unwrap();
        let h2 = hash_password("same", COST).unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("same", &h1));
        assert!(verify_password("same", &h2));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn cost_out_of_range_is_an_error() {
        assert!(hash_password("pw", 2).is_err());
    }
}
