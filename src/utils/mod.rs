use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    #[serde(default = "default_tier")]
    pub tier: String, // 限流等级
    pub exp: i64, // 过期时间
    #[serde(default)]
    pub iat: i64, // 签发时间
}

fn default_tier() -> String {
    "free".to_string()
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_token_with_tier() {
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(&serde_json::json!({ "sub": "42", "tier": "premium", "exp": exp }), "s3cret");

        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.tier, "premium");
    }

    #[test]
    fn missing_tier_defaults_to_free() {
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(&serde_json::json!({ "sub": "7", "exp": exp }), "s3cret");
        assert_eq!(verify_token(&token, "s3cret").unwrap().tier, "free");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(&serde_json::json!({ "sub": "1", "tier": "free", "exp": exp }), "one");
        assert!(verify_token(&token, "two").is_err());

        let expired = sign(
            &serde_json::json!({ "sub": "1", "tier": "free", "exp": Utc::now().timestamp() - 3600 }),
            "one",
        );
        assert!(verify_token(&expired, "one").is_err());
    }
}
