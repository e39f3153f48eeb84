use std::sync::Arc;

use driverqueue_auth::{AuthenticatorTrait, JwtAuthenticator, TokenIssuer};

/// Metadata about the authentication key for logging purposes.
pub struct AuthKeyInfo {
    pub mode: String,
    pub bits: usize,
}

/// Verifier and matching issuer, sharing one secret.
pub struct AuthSetup {
    pub authenticator: Arc<dyn AuthenticatorTrait>,
    pub issuer: TokenIssuer,
    pub info: AuthKeyInfo,
}

/// Build authenticator from config.
///
/// Without `auth.jwt_secret` the error message becomes the maintenance reason.
pub fn build_authenticator_from_config(
    cfg: &driverqueue_config::Config,
) -> Result<AuthSetup, String> {
    let secret = cfg
        .auth
        .jwt_secret
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            "no JWT configuration found: set auth.jwt_secret or DRIVERQUEUE_JWT_SECRET".to_string()
        })?;

    let ttl = chrono::Duration::hours(cfg.auth.session_ttl_hours as i64);
    Ok(AuthSetup {
        authenticator: Arc::new(JwtAuthenticator::new_hs256(secret)),
        issuer: TokenIssuer::new(secret, ttl),
        info: AuthKeyInfo {
            mode: "HS256(secret)".into(),
            bits: secret.len() * 8,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_is_a_maintenance_reason() {
        let cfg = driverqueue_config::Config::default();
        let err = build_authenticator_from_config(&cfg).err().unwrap();
        assert!(err.contains("jwt_secret"));
    }

    #[tokio::test]
    async fn issued_tokens_verify_with_built_authenticator() {
        let mut cfg = driverqueue_config::Config::default();
        cfg.auth.jwt_secret = Some("a-very-secret-value".into());
        let setup = build_authenticator_from_config(&cfg).unwrap();
        assert_eq!(setup.info.bits, 19 * 8);

        let issued = setup
            .issuer
            .issue("admin", &[driverqueue_auth::ADMIN_SCOPE])
            .unwrap();
        let ctx = setup
            .authenticator
            .authenticate(Some(&format!("Bearer {}", issued.token)))
            .await
            .unwrap();
        assert!(ctx.is_admin());
    }
}
