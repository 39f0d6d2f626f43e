use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};

pub mod error;

/// Hashes a plaintext password from a create or update payload with Argon2id and a
/// fresh random salt. The result is a PHC string that carries its own parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
  Ok(hash.to_string())
}

/// Checks a plaintext password against a stored PHC hash. A malformed hash never matches.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
  match PasswordHash::new(hashed_password) {
    Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
    Err(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hash_password_produces_argon2id_phc_string() {
    let hash = hash_password("password").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(!hash.contains("password"));
  }

  #[test]
  fn test_hash_password_is_salted() {
    let first = hash_password("abc123def").unwrap();
    let second = hash_password("abc123def").unwrap();
    assert_ne!(first, second);
    assert!(verify_password("abc123def", &first));
    assert!(verify_password("abc123def", &second));
  }

  #[test]
  fn test_verify_password_rejects_wrong_password_and_bad_hash() {
    let hash = hash_password("abc123def").unwrap();
    assert!(!verify_password("abc123deF", &hash));
    assert!(!verify_password("abc123def", "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"));
  }
}
