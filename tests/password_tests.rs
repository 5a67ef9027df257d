use fact_forum::password::{hash_password, verify_password};

#[test]
fn test_hash_is_never_the_plaintext() {
    let password = "secret123";
    let hash = hash_password(password).unwrap();

    // PHC-formatted Argon2id output, not the input.
    assert!(hash.starts_with("$argon2"));
    assert!(!hash.contains(password));
}

#[test]
fn test_hashes_use_fresh_salts() {
    let password = "secret123";
    let first = hash_password(password).unwrap();
    let second = hash_password(password).unwrap();

    assert_ne!(first, second);
}

#[test]
fn test_verify_accepts_correct_password() {
    let hash = hash_password("secret123").unwrap();

    assert!(verify_password("secret123", &hash).unwrap());
}

#[test]
fn test_verify_rejects_wrong_password() {
    let hash = hash_password("secret123").unwrap();

    assert!(!verify_password("secret124", &hash).unwrap());
}

#[test]
fn test_verify_errors_on_malformed_hash() {
    // The store only ever holds PHC strings; anything else is an internal
    // failure, not a mismatch.
    assert!(verify_password("secret123", "not-a-phc-string").is_err());
}
