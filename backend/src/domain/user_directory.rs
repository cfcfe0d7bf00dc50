//! Registration, login and user enumeration.
//!
//! A user record is a hash holding the stored credential and the numeric id.
//! Ids come from an atomic counter. The record is created whole in one
//! create-if-absent store step, so two concurrent registrations of the same
//! name cannot both succeed and a failed write never leaves a half-built
//! record behind. The losing attempt has already drawn an id from the counter
//! and that id is simply never used.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ports::ConquestStore;
use crate::domain::{
    Error, LoginCredentials, OwnershipIndex, PasswordCredential, ScoreBoard, SessionToken,
    TokenAuthority, User, UserId, Username, keys,
};

/// A stored user with its credential.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Public identity.
    pub user: User,
    /// Stored credential, hashed or legacy plaintext.
    pub credential: PasswordCredential,
}

/// User lifecycle over the shared store.
pub struct UserDirectory<S> {
    store: Arc<S>,
    tokens: TokenAuthority<S>,
    index: OwnershipIndex<S>,
    scores: ScoreBoard<S>,
}

impl<S> UserDirectory<S> {
    /// Create a directory issuing tokens through `tokens`.
    pub fn new(store: Arc<S>, tokens: TokenAuthority<S>) -> Self {
        Self {
            index: OwnershipIndex::new(Arc::clone(&store)),
            scores: ScoreBoard::new(Arc::clone(&store)),
            store,
            tokens,
        }
    }

    /// Token authority used for logins.
    pub fn tokens(&self) -> &TokenAuthority<S> {
        &self.tokens
    }
}

impl<S> UserDirectory<S>
where
    S: ConquestStore,
{
    /// Look up a user record. Records missing either the credential or the id
    /// are treated as absent.
    pub async fn find(&self, username: &Username) -> Result<Option<UserRecord>, Error> {
        let slots = self
            .store
            .hash_get(
                &keys::user(username),
                &[
                    keys::USER_PASSWORD_FIELD.to_owned(),
                    keys::USER_ID_FIELD.to_owned(),
                ],
            )
            .await?;
        let [password, id] = <[Option<String>; 2]>::try_from(slots).map_err(|slots| {
            Error::store_failure(format!(
                "user lookup returned {} slots for two fields",
                slots.len()
            ))
        })?;
        let (Some(password), Some(id)) = (password, id) else {
            return Ok(None);
        };
        let id = parse_id(&id)?;
        Ok(Some(UserRecord {
            user: User::new(id, username.clone()),
            credential: PasswordCredential::from_stored(password),
        }))
    }

    /// Create a user with zeroed scores and empty ownership bitmaps.
    pub async fn register(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let username = credentials.username();
        if self.find(username).await?.is_some() {
            return Err(already_registered(username));
        }

        let credential = PasswordCredential::hash(credentials.password())
            .map_err(|err| Error::internal(err.to_string()))?;
        let id = UserId::new(self.store.increment(keys::USER_COUNT).await?);

        let record = [
            (
                keys::USER_PASSWORD_FIELD.to_owned(),
                credential.as_stored().to_owned(),
            ),
            (keys::USER_ID_FIELD.to_owned(), id.to_string()),
        ];
        let created = self
            .store
            .hash_create(&keys::user(username), &record)
            .await?;
        if !created {
            warn!(%username, id = id.get(), "lost registration race; id discarded");
            return Err(already_registered(username));
        }

        self.scores.seed_user(username).await?;
        self.index.seed_user(username).await?;
        self.store
            .ranked_add(keys::USERS, username.as_ref(), id.get())
            .await?;

        info!(%username, id = id.get(), "user registered");
        Ok(User::new(id, username.clone()))
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionToken, Error> {
        let username = credentials.username();
        let verified = self
            .find(username)
            .await?
            .is_some_and(|record| record.credential.verify(credentials.password()));
        if !verified {
            return Err(Error::invalid_credentials("invalid username or password"));
        }
        let token = self.tokens.create_token(username).await?;
        info!(%username, "user logged in");
        Ok(token)
    }

    /// Every registered user, ordered by id.
    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        Ok(self
            .store
            .ranked_members(keys::USERS)
            .await?
            .into_iter()
            .map(|member| {
                User::new(
                    UserId::new(member.score),
                    Username::from_stored(member.member),
                )
            })
            .collect())
    }
}

fn parse_id(raw: &str) -> Result<UserId, Error> {
    raw.parse::<u64>().map(UserId::new).map_err(|err| {
        Error::store_failure(format!("user record holds an invalid id {raw:?}: {err}"))
    })
}

fn already_registered(username: &Username) -> Error {
    Error::already_exists(format!("user {username} already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockConquestStore, RankedMember};
    use rstest::{fixture, rstest};

    #[fixture]
    fn credentials() -> LoginCredentials {
        LoginCredentials::try_from_parts("alice", "s3cret").expect("credentials shape")
    }

    fn directory(store: MockConquestStore) -> UserDirectory<MockConquestStore> {
        let store = Arc::new(store);
        UserDirectory::new(Arc::clone(&store), TokenAuthority::new(store))
    }

    fn stored_record(password: &str) -> Vec<Option<String>> {
        vec![Some(password.to_owned()), Some("7".to_owned())]
    }

    #[rstest]
    #[tokio::test]
    async fn register_seeds_every_projection(credentials: LoginCredentials) {
        let mut store = MockConquestStore::new();
        store
            .expect_hash_get()
            .withf(|key, _| key == "user:alice")
            .times(1)
            .returning(|_, _| Ok(vec![None, None]));
        store
            .expect_increment()
            .withf(|key| key == "usercount")
            .times(1)
            .returning(|_| Ok(7));
        store
            .expect_hash_create()
            .withf(|key, entries| {
                key == "user:alice"
                    && matches!(
                        entries,
                        [(password, hash), (id, seven)]
                            if password == "password"
                                && hash.starts_with("$argon2id$")
                                && id == "id"
                                && seven == "7"
                    )
            })
            .times(1)
            .returning(|_, _| Ok(true));
        store
            .expect_ranked_add()
            .withf(|key, member, score| {
                key.starts_with("score:") && member == "alice" && *score == 0
            })
            .times(5)
            .returning(|_, _, _| Ok(()));
        store
            .expect_ranked_add()
            .withf(|key, member, score| key == "users" && member == "alice" && *score == 7)
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_set_bit()
            .withf(|key, offset, value| {
                key.starts_with("user:alice:conquerField:") && *offset == 0 && !*value
            })
            .times(4)
            .returning(|_, _, _| Ok(false));

        let user = directory(store)
            .register(&credentials)
            .await
            .expect("registered");
        assert_eq!(user.id().get(), 7);
        assert_eq!(user.username().as_ref(), "alice");
    }

    #[rstest]
    #[tokio::test]
    async fn register_rejects_existing_user(credentials: LoginCredentials) {
        let mut store = MockConquestStore::new();
        store
            .expect_hash_get()
            .returning(|_, _| Ok(stored_record("whatever")));
        store.expect_increment().never();

        let err = directory(store)
            .register(&credentials)
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[rstest]
    #[tokio::test]
    async fn losing_registration_race_burns_the_id(credentials: LoginCredentials) {
        let mut store = MockConquestStore::new();
        store
            .expect_hash_get()
            .returning(|_, _| Ok(vec![None, None]));
        store.expect_increment().times(1).returning(|_| Ok(8));
        store
            .expect_hash_create()
            .times(1)
            .returning(|_, _| Ok(false));
        store.expect_ranked_add().never();
        store.expect_set_bit().never();

        let err = directory(store)
            .register(&credentials)
            .await
            .expect_err("race lost");
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[rstest]
    #[case(Some("s3cret"), true)]
    #[case(Some("other"), false)]
    #[case(None, false)]
    #[tokio::test]
    async fn login_checks_stored_credential(
        credentials: LoginCredentials,
        #[case] stored: Option<&'static str>,
        #[case] succeeds: bool,
    ) {
        let mut store = MockConquestStore::new();
        store.expect_hash_get().returning(move |_, _| {
            Ok(stored.map_or_else(|| vec![None, None], stored_record))
        });
        store
            .expect_set_with_ttl()
            .times(usize::from(succeeds))
            .returning(|_, _, _| Ok(()));

        let result = directory(store).login(&credentials).await;
        match (succeeds, result) {
            (true, Ok(token)) => assert_eq!(token.as_str().len(), 40),
            (false, Err(err)) => assert_eq!(err.code(), ErrorCode::InvalidCredentials),
            (true, Err(err)) => panic!("expected success, got error: {err:?}"),
            (false, Ok(token)) => panic!("expected failure, got token {token:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn record_missing_id_is_absent() {
        let mut store = MockConquestStore::new();
        store
            .expect_hash_get()
            .returning(|_, _| Ok(vec![Some("pw".to_owned()), None]));

        let found = directory(store)
            .find(&Username::new("alice").expect("valid"))
            .await
            .expect("lookup");
        assert!(found.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn list_users_maps_scores_to_ids() {
        let mut store = MockConquestStore::new();
        store
            .expect_ranked_members()
            .withf(|key| key == "users")
            .returning(|_| Ok(vec![RankedMember::new("alice", 1), RankedMember::new("bob", 2)]));

        let users = directory(store).list_users().await.expect("users");
        let pairs: Vec<(u64, &str)> = users
            .iter()
            .map(|u| (u.id().get(), u.username().as_ref()))
            .collect();
        assert_eq!(pairs, vec![(1, "alice"), (2, "bob")]);
    }
}
