use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;

/// Argon2id hashing for local accounts, including accounts created by
/// bulk user imports.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    /// Hash of a random value, verified against when an email is unknown so
    /// both login paths cost the same.
    decoy_hash: String,
}

impl PasswordService {
    pub fn new() -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(19 * 1024); // 19 MiB
        builder.t_cost(2);
        builder.p_cost(1);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut decoy = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut decoy);
        let decoy_hash = hash_with(&argon2, &decoy)?;

        Ok(Self { argon2, decoy_hash })
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        hash_with(&self.argon2, password.as_bytes())
    }

    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::from(err)),
        }
    }

    /// Spend a verification on the decoy hash and report failure.
    pub fn reject_unknown(&self, password: &str) -> AuthResult<bool> {
        self.verify_password(password, &self.decoy_hash)?;
        Ok(false)
    }
}

fn hash_with(argon2: &Argon2<'static>, secret: &[u8]) -> AuthResult<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
    let hash = argon2
        .hash_password(secret, &salt)
        .map_err(AuthError::from)?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = PasswordService::new().expect("password service");
        let hash = service
            .hash_password("CambiarEsto123")
            .expect("hash generation");
        assert!(
            service
                .verify_password("CambiarEsto123", &hash)
                .expect("verify succeeds")
        );
        assert!(
            !service
                .verify_password("wrong-password", &hash)
                .expect("verify runs")
        );
    }

    #[test]
    fn hashes_are_salted_and_never_contain_the_password() {
        let service = PasswordService::new().expect("password service");
        let first = service.hash_password("CambiarEsto123").expect("hash");
        let second = service.hash_password("CambiarEsto123").expect("hash");
        assert_ne!(first, second);
        assert!(!first.contains("CambiarEsto123"));
        assert!(!service.reject_unknown("CambiarEsto123").expect("decoy verify"));
    }
}
