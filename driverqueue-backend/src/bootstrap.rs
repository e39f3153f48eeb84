use driverqueue_backend::state::AdminAccount;

/// Resolve the admin account from configuration.
///
/// A configured `password_hash` wins over a plaintext `password`, which is
/// hashed here and never kept. Returns `None` (login disabled) when neither is set.
pub fn resolve_admin_account(
    cfg: &driverqueue_config::AdminConfig,
) -> anyhow::Result<Option<AdminAccount>> {
    if let Some(hash) = cfg.password_hash.as_deref().filter(|h| !h.is_empty()) {
        if !driverqueue_auth::is_phc_hash(hash) {
            anyhow::bail!("admin.password_hash is not an Argon2 PHC string");
        }
        tracing::info!(username = %cfg.username, "admin account loaded from password hash");
        return Ok(Some(AdminAccount::new(&cfg.username, hash)));
    }

    match cfg.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            let hash = driverqueue_auth::hash_password(password)
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            tracing::info!(username = %cfg.username, "admin account provisioned from plaintext password");
            Ok(Some(AdminAccount::new(&cfg.username, hash)))
        }
        None => {
            tracing::warn!("no admin password configured; admin login is disabled");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_config() -> driverqueue_config::AdminConfig {
        driverqueue_config::Config::default().admin
    }

    #[test]
    fn plaintext_password_is_hashed() {
        let mut cfg = admin_config();
        cfg.password = Some("s3cret-pass".into());
        let account = resolve_admin_account(&cfg).unwrap().unwrap();
        assert_eq!(account.username, "admin");
        assert!(account.verify("admin", "s3cret-pass"));
        assert!(!account.verify("admin", "wrong"));
        assert!(!account.verify("someone", "s3cret-pass"));
    }

    #[test]
    fn bogus_hash_is_rejected() {
        let mut cfg = admin_config();
        cfg.password_hash = Some("not-a-hash".into());
        assert!(resolve_admin_account(&cfg).is_err());
    }

    #[test]
    fn no_password_disables_login() {
        assert!(resolve_admin_account(&admin_config()).unwrap().is_none());
    }
}
