//! Password hashing and bearer tokens.

use anyhow::Result;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

mod wavenote_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    #[cfg(not(any(test, feature = "test-fast-hasher")))]
    fn argon2() -> Result<Argon2<'static>> {
        Ok(Argon2::default())
    }

    // Minimum cost, only for test builds.
    #[cfg(any(test, feature = "test-fast-hasher"))]
    fn argon2() -> Result<Argon2<'static>> {
        let params = argon2::Params::new(8, 1, 1, None).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    pub fn hash(plain: &[u8]) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash_string = argon2()?
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2()?.verify_password(plain_pw, &password_hash).is_ok())
    }
}

/// The hash is a PHC string, the salt and cost parameters travel inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavenoteHasher {
    Argon2,
}

impl WavenoteHasher {
    pub fn hash<T: AsRef<str>>(&self, plain: T) -> Result<String> {
        match self {
            WavenoteHasher::Argon2 => wavenote_argon2::hash(plain.as_ref().as_bytes()),
        }
    }

    pub fn verify<T: AsRef<str>, H: AsRef<str>>(&self, plain_pw: T, target_hash: H) -> Result<bool> {
        match self {
            WavenoteHasher::Argon2 => {
                wavenote_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token. Not checked anywhere yet, a revocation list would key on it.
    pub jti: String,
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new<T: AsRef<[u8]>>(secret: T) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            ttl: TOKEN_TTL,
        }
    }

    pub fn issue(&self, user_id: &str, username: &str) -> Result<String> {
        self.issue_at(user_id, username, chrono::Utc::now().timestamp())
    }

    /// Issues a token as if it had been created at `iat` (unix seconds).
    pub fn issue_at(&self, user_id: &str, username: &str, iat: i64) -> Result<String> {
        let claims = Claims {
            id: user_id.to_string(),
            username: username.to_string(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Checks signature and expiry, returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish()
    }
}
