//! HS256 access and refresh tokens

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    pub fn issue(&self, user_id: &str, token_type: TokenType) -> TrackerResult<String> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + ttl,
            iat: now,
            jti: clickup_core::generate_id(),
            token_type,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn issue_pair(&self, user_id: &str) -> TrackerResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Decode a token and check it is of the expected type
    pub fn verify(&self, token: &str, expected: TokenType) -> TrackerResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.token_type != expected {
            return Err(TrackerError::Unauthorized(
                "Token has wrong type".to_string(),
            ));
        }
        Ok(data.claims)
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> TrackerResult<String> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.issue(&claims.sub, TokenType::Access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::default())
    }

    #[test]
    fn access_token_round_trips() {
        let tokens = service();
        let token = tokens.issue("user-1", TokenType::Access).unwrap();
        let claims = tokens.verify(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair("user-1").unwrap();
        assert!(tokens.verify(&pair.refresh, TokenType::Access).is_err());
        assert!(tokens.refresh(&pair.access).is_err());

        let access = tokens.refresh(&pair.refresh).unwrap();
        assert_eq!(tokens.verify(&access, TokenType::Access).unwrap().sub, "user-1");
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let other = TokenService::new(&AuthConfig {
            jwt_secret: "another-secret-of-enough-length".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue("user-1", TokenType::Access).unwrap();
        let err = service().verify(&token, TokenType::Access).unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized(_)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let tokens = TokenService {
            access_ttl_secs: -10,
            ..service()
        };
        let token = tokens.issue("user-1", TokenType::Access).unwrap();
        assert!(tokens.verify(&token, TokenType::Access).is_err());
    }
}
