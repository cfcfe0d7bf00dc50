//! Game service implementing the conquest driving ports.
//!
//! Composes the token authority, user directory, field ledger, ownership
//! index and scoreboard over one shared store. A claim touches three
//! projections with three independent writes (ledger, then index, then
//! scores); there is no transaction, so a store failure part-way through
//! leaves the earlier writes in place.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{ConquestCommand, ConquestQuery, ConquestStore};
use crate::domain::{
    Channel, ChannelOwner, Error, ErrorCode, FieldId, FieldLedger, FieldOwners, FieldRange,
    LoginCredentials, OwnershipIndex, ScoreBoard, ScoreEntry, SessionToken, TokenAuthority, User,
    UserDirectory, Username,
};

/// Conquest game service over a [`ConquestStore`].
pub struct ConquestService<S> {
    store: Arc<S>,
    directory: UserDirectory<S>,
    ledger: FieldLedger<S>,
    index: OwnershipIndex<S>,
    scores: ScoreBoard<S>,
}

impl<S> ConquestService<S> {
    /// Create a service issuing tokens with the standard TTL.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_token_ttl(store, crate::domain::TOKEN_TTL)
    }

    /// Create a service issuing tokens that expire after `ttl`.
    pub fn with_token_ttl(store: Arc<S>, ttl: Duration) -> Self {
        let tokens = TokenAuthority::new(Arc::clone(&store)).with_ttl(ttl);
        Self {
            directory: UserDirectory::new(Arc::clone(&store), tokens),
            ledger: FieldLedger::new(Arc::clone(&store)),
            index: OwnershipIndex::new(Arc::clone(&store)),
            scores: ScoreBoard::new(Arc::clone(&store)),
            store,
        }
    }
}

impl<S> ConquestService<S>
where
    S: ConquestStore,
{
    async fn authenticate(&self, token: &SessionToken) -> Result<Username, Error> {
        self.directory
            .tokens()
            .resolve_token(token)
            .await
            .map_err(|err| match err.code() {
                ErrorCode::NotFound => Error::unauthorized("session token is invalid or expired"),
                _ => err,
            })
    }

    async fn record_claim(
        &self,
        username: &Username,
        field: FieldId,
        channel: Channel,
    ) -> Result<(), Error> {
        self.ledger.set_owner(field, channel, username).await?;

        let newly_set = match self.index.set_bit(username, channel, field).await {
            Ok(newly_set) => newly_set,
            Err(err) => {
                warn!(
                    %username,
                    %channel,
                    field = field.get(),
                    step = "ownership_index",
                    error = %err,
                    "claim recorded in ledger only"
                );
                return Err(err);
            }
        };

        if let Err(err) = self.scores.increment(username, channel).await {
            warn!(
                %username,
                %channel,
                field = field.get(),
                step = "score_board",
                error = %err,
                "claim recorded without score"
            );
            return Err(err);
        }

        debug!(%username, %channel, field = field.get(), newly_set, "field conquered");
        Ok(())
    }
}

#[async_trait]
impl<S> ConquestCommand for ConquestService<S>
where
    S: ConquestStore,
{
    async fn register(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        self.directory.register(credentials).await
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionToken, Error> {
        self.directory.login(credentials).await
    }

    async fn conquer(
        &self,
        token: &SessionToken,
        field_id: i64,
        channel: Channel,
    ) -> Result<(), Error> {
        let username = self.authenticate(token).await?;
        let field = FieldId::new(field_id).map_err(|err| {
            Error::invalid_argument(err.to_string()).with_details(json!({
                "field": "fieldId",
                "value": field_id,
            }))
        })?;
        self.record_claim(&username, field, channel).await
    }
}

#[async_trait]
impl<S> ConquestQuery for ConquestService<S>
where
    S: ConquestStore,
{
    async fn ping(&self) -> Result<(), Error> {
        self.store.ping().await.map_err(Error::from)
    }

    async fn user_claims(
        &self,
        token: &SessionToken,
        channel: Channel,
    ) -> Result<Vec<FieldId>, Error> {
        let username = self.authenticate(token).await?;
        self.index.enumerate(&username, channel).await
    }

    async fn map(&self, start: i64, end: i64) -> Result<Vec<FieldOwners>, Error> {
        let range = FieldRange::new(start, end).map_err(|err| {
            Error::invalid_argument(err.to_string()).with_details(json!({
                "start": start,
                "end": end,
            }))
        })?;

        let mut rows: Vec<FieldOwners> = range
            .ids()
            .map(|field_id| FieldOwners {
                field_id,
                owners: Vec::with_capacity(Channel::ALL.len()),
            })
            .collect();
        for channel in Channel::ALL {
            let owners = self.ledger.range(channel, range).await?;
            for (row, (field_id, owner)) in rows.iter_mut().zip(owners) {
                debug_assert_eq!(row.field_id, field_id);
                row.owners.push(ChannelOwner { channel, owner });
            }
        }
        Ok(rows)
    }

    async fn scoreboard(&self) -> Result<Vec<ScoreEntry>, Error> {
        self.scores.all().await
    }

    async fn user_list(&self, token: &SessionToken) -> Result<Vec<User>, Error> {
        self.authenticate(token).await?;
        self.directory.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockConquestStore, StoreError};
    use mockall::predicate::eq;
    use rstest::rstest;

    fn token() -> SessionToken {
        SessionToken::from_presented("feedface")
    }

    fn store_with_session() -> MockConquestStore {
        let mut store = MockConquestStore::new();
        store
            .expect_get()
            .with(eq("token:feedface"))
            .returning(|_| Ok(Some("alice".to_owned())));
        store
    }

    #[rstest]
    #[case(-1)]
    #[case(1_000_000)]
    #[tokio::test]
    async fn invalid_field_is_rejected_without_mutation(#[case] field_id: i64) {
        let mut store = store_with_session();
        store.expect_hash_set().never();
        store.expect_set_bit().never();
        store.expect_ranked_increment().never();

        let service = ConquestService::new(Arc::new(store));
        let err = service
            .conquer(&token(), field_id, Channel::Restful)
            .await
            .expect_err("invalid field");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(
            err.details().and_then(|d| d.get("value")),
            Some(&json!(field_id))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn ping_reports_store_outage() {
        let mut store = MockConquestStore::new();
        store
            .expect_ping()
            .returning(|| Err(StoreError::connection("refused")));

        let err = ConquestService::new(Arc::new(store))
            .ping()
            .await
            .expect_err("store down");
        assert!(err.code().is_retry_safe());
    }

    #[rstest]
    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let mut store = MockConquestStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_hash_set().never();

        let service = ConquestService::new(Arc::new(store));
        let err = service
            .conquer(&token(), 42, Channel::Grpc)
            .await
            .expect_err("no session");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn token_store_outage_is_not_masked_as_unauthorized() {
        let mut store = MockConquestStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::connection("refused")));

        let service = ConquestService::new(Arc::new(store));
        let err = service
            .user_list(&token())
            .await
            .expect_err("store down");
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }

    #[rstest]
    #[tokio::test]
    async fn conquer_writes_ledger_index_and_scores() {
        let mut store = store_with_session();
        store
            .expect_hash_set()
            .withf(|key, entries| {
                key == "fields:graphql:conquerer"
                    && entries == [("42".to_owned(), "alice".to_owned())]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_bit()
            .withf(|key, offset, value| {
                key == "user:alice:conquerField:graphql" && *offset == 42 && *value
            })
            .times(1)
            .returning(|_, _, _| Ok(false));
        store
            .expect_ranked_increment()
            .times(2)
            .returning(|_, _, _| Ok(1));

        let service = ConquestService::new(Arc::new(store));
        service
            .conquer(&token(), 42, Channel::Graphql)
            .await
            .expect("conquered");
    }

    #[rstest]
    #[tokio::test]
    async fn index_failure_leaves_ledger_write_and_skips_scores() {
        let mut store = store_with_session();
        store.expect_hash_set().times(1).returning(|_, _| Ok(()));
        store
            .expect_set_bit()
            .returning(|_, _, _| Err(StoreError::command("READONLY")));
        store.expect_ranked_increment().never();

        let service = ConquestService::new(Arc::new(store));
        let err = service
            .conquer(&token(), 5, Channel::Webservice)
            .await
            .expect_err("partial failure");
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }

    #[rstest]
    #[case(10, 5)]
    #[case(-1, 5)]
    #[case(0, 1_000_000)]
    #[tokio::test]
    async fn map_rejects_bad_ranges(#[case] start: i64, #[case] end: i64) {
        let mut store = MockConquestStore::new();
        store.expect_hash_get().never();

        let service = ConquestService::new(Arc::new(store));
        let err = service.map(start, end).await.expect_err("bad range");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[rstest]
    #[tokio::test]
    async fn map_assembles_one_owner_per_channel() {
        let mut store = MockConquestStore::new();
        store.expect_hash_get().times(4).returning(|key, fields| {
            Ok(fields
                .iter()
                .map(|f| (key == "fields:grpc:conquerer" && f == "3").then(|| "bob".to_owned()))
                .collect())
        });

        let service = ConquestService::new(Arc::new(store));
        let rows = service.map(2, 4).await.expect("map");

        let ids: Vec<u32> = rows.iter().map(|r| r.field_id.get()).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        for row in &rows {
            let channels: Vec<Channel> = row.owners.iter().map(|o| o.channel).collect();
            assert_eq!(channels, Channel::ALL.to_vec());
        }
        assert_eq!(
            rows[1].owner(Channel::Grpc).map(AsRef::as_ref),
            Some("bob")
        );
        assert_eq!(rows[1].owner(Channel::Restful), None);
    }
}
