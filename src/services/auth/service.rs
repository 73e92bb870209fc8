use super::{AuthError, Identity, TokenValidator};

/// Bearer token → `Identity`.
///
/// This is the entry-point for middleware; handlers only ever see the resulting `Identity`.
#[derive(Debug)]
pub struct AuthService {
    validator: TokenValidator,
}

impl AuthService {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }

    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.validator.validate(token).await?;
        Ok(Identity::from_claims(
            claims,
            &self.validator.policy().subject_claim,
        ))
    }

    pub fn issuer(&self) -> &str {
        &self.validator.policy().issuer
    }
}
