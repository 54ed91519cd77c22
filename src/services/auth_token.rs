use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum AuthTokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Could not validate credentials: {0}")]
    Invalid(String),

    #[error("Token has no subject")]
    MissingSubject,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token generation failed: {0}")]
    Encoding(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and verifies the bearer tokens guarding the API.
///
/// The rest of the service only ever sees the username in `sub`.
#[derive(Clone)]
pub struct JwtAuth {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: Duration,
}

impl JwtAuth {
    pub fn new(secret: &str, algorithm: &str, expires_in_minutes: i64) -> Result<Self, AuthTokenError> {
        let algorithm: Algorithm = algorithm
            .parse()
            .map_err(|_| AuthTokenError::UnsupportedAlgorithm(algorithm.to_string()))?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthTokenError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in: Duration::minutes(expires_in_minutes),
        })
    }

    /// Signs a token for `username`
    pub fn issue(&self, username: &str) -> Result<String, AuthTokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expires_in).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthTokenError::Encoding(e.to_string()))
    }

    /// Verifies a token and returns the username it was issued for
    pub fn verify(&self, token: &str) -> Result<String, AuthTokenError> {
        let validation = Validation::new(self.algorithm);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthTokenError::Expired,
                _ => AuthTokenError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthTokenError::MissingSubject);
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new("test-secret", "HS256", 5).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = auth();
        let token = auth.issue("test").unwrap();

        assert_eq!(auth.verify(&token).unwrap(), "test");
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(
            auth().verify("invalid.token.here"),
            Err(AuthTokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = JwtAuth::new("another-secret", "HS256", 5).unwrap();
        let token = other.issue("test").unwrap();

        assert!(auth().verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s leeway
        let expired = JwtAuth::new("test-secret", "HS256", -10).unwrap();
        let token = expired.issue("test").unwrap();

        assert!(matches!(auth().verify(&token), Err(AuthTokenError::Expired)));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let auth = auth();
        let token = auth.issue("").unwrap();

        assert!(matches!(auth.verify(&token), Err(AuthTokenError::MissingSubject)));
    }

    #[test]
    fn test_asymmetric_algorithms_refused() {
        assert!(matches!(
            JwtAuth::new("secret", "RS256", 5),
            Err(AuthTokenError::UnsupportedAlgorithm(_))
        ));
        assert!(JwtAuth::new("secret", "nope", 5).is_err());
    }
}
