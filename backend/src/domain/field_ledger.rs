//! Current owner of each field on each channel.
//!
//! One hash per channel maps field id → username. Writes overwrite
//! unconditionally: the last claim to land wins and no history is kept here
//! (see [`crate::domain::OwnershipIndex`] for that).

use std::sync::Arc;

use crate::domain::ports::ConquestStore;
use crate::domain::{BATCH_SIZE, Channel, Error, FieldId, FieldRange, Username, keys};

/// Mutable "who owns it now" projection.
pub struct FieldLedger<S> {
    store: Arc<S>,
}

impl<S> FieldLedger<S> {
    /// Create a ledger over the shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> FieldLedger<S>
where
    S: ConquestStore,
{
    /// Current owner of `field` on `channel`, `None` if unclaimed.
    pub async fn owner(&self, field: FieldId, channel: Channel) -> Result<Option<Username>, Error> {
        let slots = self
            .store
            .hash_get(&keys::ledger(channel), &[field.hash_field()])
            .await?;
        let [slot] = <[Option<String>; 1]>::try_from(slots).map_err(|slots| {
            Error::store_failure(format!(
                "ledger lookup returned {} slots for one field",
                slots.len()
            ))
        })?;
        Ok(slot.map(Username::from_stored))
    }

    /// Record `username` as the owner of `field` on `channel`, replacing any
    /// previous owner. No compare-and-swap: concurrent writers race and the
    /// store's last write wins.
    pub async fn set_owner(
        &self,
        field: FieldId,
        channel: Channel,
        username: &Username,
    ) -> Result<(), Error> {
        self.store
            .hash_set(
                &keys::ledger(channel),
                &[(field.hash_field(), username.as_ref().to_owned())],
            )
            .await?;
        Ok(())
    }

    /// Owners of every field in `range` on `channel`, ascending by id.
    ///
    /// The range is read in requests of at most [`BATCH_SIZE`] fields so no
    /// single store request grows with the range. The result always holds
    /// exactly `range.len()` entries.
    pub async fn range(
        &self,
        channel: Channel,
        range: FieldRange,
    ) -> Result<Vec<(FieldId, Option<Username>)>, Error> {
        let key = keys::ledger(channel);
        let mut owners = Vec::with_capacity(range.len());
        for batch in range.batches(BATCH_SIZE) {
            let fields: Vec<String> = batch.ids().map(FieldId::hash_field).collect();
            let slots = self.store.hash_get(&key, &fields).await?;
            if slots.len() != batch.len() {
                return Err(Error::store_failure(format!(
                    "ledger batch for fields {}..={} returned {} slots, expected {}",
                    batch.start(),
                    batch.end(),
                    slots.len(),
                    batch.len()
                )));
            }
            for (field, slot) in batch.ids().zip(slots) {
                owners.push((field, slot.map(Username::from_stored)));
            }
        }
        Ok(owners)
    }
}
