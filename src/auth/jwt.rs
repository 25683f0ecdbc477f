use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error as JwtError,
};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn build_claims(
    user_id: u64,
    email: String,
    role: u8,
    ttl: usize,
    token_type: TokenType,
) -> Claims {
    Claims {
        user_id,
        sub: email,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(
    user_id: u64,
    email: String,
    role: u8,
    secret: &str,
    ttl: usize,
) -> Result<String, JwtError> {
    let claims = build_claims(user_id, email, role, ttl, TokenType::Access);
    sign(&claims, secret)
}

pub fn generate_refresh_token(
    user_id: u64,
    email: String,
    role: u8,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), JwtError> {
    let claims = build_claims(user_id, email, role, ttl, TokenType::Refresh);
    let token = sign(&claims, secret)?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
