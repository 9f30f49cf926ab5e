//! JWT service for token generation and validation
//!
//! Signs access and refresh tokens with a shared HS256 secret. Refresh
//! tokens can only be exchanged for new token pairs, never used to
//! authenticate a request directly.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 1 hour)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HS256 signing secret (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 3600)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Access/refresh token pair returned on login and refresh
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate an access/refresh token pair for a user
    pub fn generate_token_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair> {
        let access_token = self.generate_token(user_id, email, TokenType::Access)?;
        let refresh_token = self.generate_token(user_id, email, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_expiry,
        })
    }

    fn generate_token(&self, user_id: Uuid, email: &str, token_type: TokenType) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let expiry = match token_type {
            TokenType::Access => self.config.access_token_expiry,
            TokenType::Refresh => self.config.refresh_token_expiry,
        };

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now + expiry,
            token_type,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate an access token, rejecting refresh tokens
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(anyhow::anyhow!("Token is not an access token"));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new token pair
    pub fn refresh_token_pair(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validate_token(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Token is not a refresh token"));
        }
        self.generate_token_pair(claims.sub, &claims.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        })
    }

    #[test]
    fn test_token_pair_round_trip() {
        let service = service();
        let user_id = Uuid::new_v4();
        let pair = service.generate_token_pair(user_id, "alice@example.com").unwrap();

        let claims = service.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(pair.expires_in, 3600);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = service();
        let pair = service
            .generate_token_pair(Uuid::new_v4(), "bob@example.com")
            .unwrap();

        assert!(service.validate_access_token(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_refresh_exchange_requires_refresh_token() {
        let service = service();
        let user_id = Uuid::new_v4();
        let pair = service.generate_token_pair(user_id, "carol@example.com").unwrap();

        let new_pair = service.refresh_token_pair(&pair.refresh_token).unwrap();
        let claims = service.validate_access_token(&new_pair.access_token).unwrap();
        assert_eq!(claims.sub, user_id);

        assert!(service.refresh_token_pair(&pair.access_token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = service();
        let pair = service
            .generate_token_pair(Uuid::new_v4(), "dave@example.com")
            .unwrap();

        let mut tampered = pair.access_token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());

        let other = JwtService::new(JwtConfig {
            secret: "different-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        });
        assert!(other.validate_token(&pair.access_token).is_err());
    }
}
