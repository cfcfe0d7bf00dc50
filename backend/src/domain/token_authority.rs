//! Issues and resolves short-lived session tokens.
//!
//! Expiry is enforced by the store's TTL; there is no revocation list and no
//! sliding expiry. A user may hold any number of live tokens at once.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::ConquestStore;
use crate::domain::{Error, SessionToken, TOKEN_TTL, Username, keys};

/// Token issuance and resolution over the shared store.
pub struct TokenAuthority<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> TokenAuthority<S> {
    /// Create an authority issuing tokens with the standard 15 minute TTL.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ttl: TOKEN_TTL,
        }
    }

    /// Override the token TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// TTL applied to newly issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<S> TokenAuthority<S>
where
    S: ConquestStore,
{
    /// Issue a fresh token for `username`. Earlier tokens stay valid until
    /// their own expiry.
    pub async fn create_token(&self, username: &Username) -> Result<SessionToken, Error> {
        let token = SessionToken::generate();
        self.store
            .set_with_ttl(&keys::token(token.as_str()), username.as_ref(), self.ttl)
            .await?;
        Ok(token)
    }

    /// Resolve a token to its username.
    ///
    /// Fails with [`crate::domain::ErrorCode::NotFound`] when the token was
    /// never issued or has expired.
    pub async fn resolve_token(&self, token: &SessionToken) -> Result<Username, Error> {
        let Some(raw) = self.store.get(&keys::token(token.as_str())).await? else {
            return Err(Error::not_found("session token not found or expired"));
        };
        Ok(Username::from_stored(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockConquestStore, StoreError};
    use mockall::predicate::{always, eq};
    use rstest::rstest;

    fn alice() -> Username {
        Username::new("alice").expect("valid username")
    }

    #[rstest]
    #[tokio::test]
    async fn create_token_stores_mapping_with_ttl() {
        let mut store = MockConquestStore::new();
        store
            .expect_set_with_ttl()
            .withf(|key, value, ttl| {
                key.starts_with("token:")
                    && key.len() == "token:".len() + 40
                    && value == "alice"
                    && *ttl == TOKEN_TTL
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let authority = TokenAuthority::new(Arc::new(store));
        let token = authority.create_token(&alice()).await.expect("token issued");
        assert_eq!(token.as_str().len(), 40);
    }

    #[rstest]
    #[tokio::test]
    async fn resolve_token_returns_username() {
        let mut store = MockConquestStore::new();
        store
            .expect_get()
            .with(eq("token:abc"))
            .times(1)
            .returning(|_| Ok(Some("alice".to_owned())));

        let authority = TokenAuthority::new(Arc::new(store));
        let username = authority
            .resolve_token(&SessionToken::from_presented("abc"))
            .await
            .expect("resolves");
        assert_eq!(username, alice());
    }

    #[rstest]
    #[tokio::test]
    async fn missing_token_is_not_found() {
        let mut store = MockConquestStore::new();
        store.expect_get().with(always()).returning(|_| Ok(None));

        let authority = TokenAuthority::new(Arc::new(store));
        let err = authority
            .resolve_token(&SessionToken::from_presented("expired"))
            .await
            .expect_err("absent token");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn store_errors_surface_as_store_failures() {
        let mut store = MockConquestStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::connection("refused")));

        let authority = TokenAuthority::new(Arc::new(store));
        let err = authority
            .resolve_token(&SessionToken::from_presented("abc"))
            .await
            .expect_err("store down");
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }
}
