use crate::error::{AppError, AppResult};

/// Hash a password with a random per-password salt baked into the hash.
/// The plaintext is never stored or compared directly.
pub fn hash(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Compare a candidate password against a stored hash.
pub fn verify(password: &str, password_hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash("password123").unwrap();
        assert_ne!(hashed, "password123");
        assert!(verify("password123", &hashed).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hashed = hash("password123").unwrap();
        assert!(!verify("password124", &hashed).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        // Random salt means two hashes of the same input differ
        let h1 = hash("password123").unwrap();
        let h2 = hash("password123").unwrap();
        assert_ne!(h1, h2);
    }
}
