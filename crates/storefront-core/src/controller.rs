//! Synchronization controller
//!
//! Owns the mirror for one entity type and is the only thing that edits it.
//! The mirror changes only after the remote store confirms a mutation.
//!
//! ## States
//!
//! - `Loading`: initial, and while a refresh is in flight
//! - `Ready`: mirror populated (possibly empty)
//!
//! Reads fail soft: a failed `list` leaves an empty `Ready` mirror and is
//! logged. Writes fail loud: a failed mutation leaves the mirror untouched
//! and the error goes back to the caller.
//!
//! ## Usage
//!
//! ```ignore
//! let mut catalog = SyncController::open(store).await;
//! let mut updates = catalog.subscribe();
//!
//! catalog.insert(&ProductDraft::new("Face Cream", price)).await?;
//! updates.changed().await?;
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::mirror::Mirror;
use crate::models::Entity;
use crate::remote::SharedStore;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// A list call is in flight
    Loading,
    /// The mirror reflects the last confirmed server state
    Ready,
}

/// What subscribers see
#[derive(Debug, Clone)]
pub struct Snapshot<E> {
    pub state: SyncState,
    pub items: Arc<Vec<E>>,
}

/// Remote store + mirror for one entity type
pub struct SyncController<E: Entity> {
    store: SharedStore<E>,
    mirror: Mirror<E>,
    state: SyncState,
    last_load_error: Option<SyncError>,
    updates: watch::Sender<Snapshot<E>>,
}

impl<E: Entity> SyncController<E> {
    /// Create a controller in `Loading` without contacting the store
    pub fn new(store: SharedStore<E>) -> Self {
        let mirror = Mirror::new();
        let (updates, _) = watch::channel(Snapshot {
            state: SyncState::Loading,
            items: mirror.snapshot(),
        });

        Self {
            store,
            mirror,
            state: SyncState::Loading,
            last_load_error: None,
            updates,
        }
    }

    /// Create a controller and load the initial list
    pub async fn open(store: SharedStore<E>) -> Self {
        let mut controller = Self::new(store);
        controller.refresh().await;
        controller
    }

    /// Re-list from the store
    ///
    /// Always ends in `Ready`. On failure the mirror is emptied, the error is
    /// logged and kept in `last_load_error`.
    pub async fn refresh(&mut self) {
        self.set_state(SyncState::Loading);

        match self.store.list().await {
            Ok(items) => {
                info!("{}: loaded {} rows", E::TABLE, items.len());
                self.mirror.replace_all(items);
                self.last_load_error = None;
            }
            Err(e) => {
                warn!("{}: load failed, showing empty list: {}", E::TABLE, e);
                self.mirror.replace_all(Vec::new());
                self.last_load_error = Some(e);
            }
        }

        self.set_state(SyncState::Ready);
    }

    /// Insert through the store, then put the server's entity first
    pub async fn insert(&mut self, draft: &E::Draft) -> SyncResult<E> {
        let created = self.store.insert(draft).await.inspect_err(|e| {
            warn!("{}: insert failed: {}", E::TABLE, e);
        })?;

        self.mirror.prepend(created.clone());
        self.publish();
        info!("{}: inserted {}", E::TABLE, created.id());
        Ok(created)
    }

    /// Update through the store, then replace the cached copy wholesale
    pub async fn update(&mut self, id: &str, patch: &E::Patch) -> SyncResult<E> {
        let updated = self.store.update(id, patch).await.inspect_err(|e| {
            warn!("{}: update of {} failed: {}", E::TABLE, id, e);
        })?;

        if !self.mirror.replace(updated.clone()) {
            debug!("{}: updated {} was not in the mirror", E::TABLE, id);
        }
        self.publish();
        info!("{}: updated {}", E::TABLE, id);
        Ok(updated)
    }

    /// Delete through the store, then drop the cached copy
    pub async fn remove(&mut self, id: &str) -> SyncResult<()> {
        self.store.remove(id).await.inspect_err(|e| {
            warn!("{}: remove of {} failed: {}", E::TABLE, id, e);
        })?;

        self.mirror.remove(id);
        self.publish();
        info!("{}: removed {}", E::TABLE, id);
        Ok(())
    }

    /// Subscribe to state and mirror changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<E>> {
        self.updates.subscribe()
    }

    /// Current state and mirror
    pub fn snapshot(&self) -> Snapshot<E> {
        Snapshot {
            state: self.state,
            items: self.mirror.snapshot(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Mirror contents, newest first
    pub fn items(&self) -> Arc<Vec<E>> {
        self.mirror.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.mirror.get(id)
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Why the last refresh came back empty, if it failed
    pub fn last_load_error(&self) -> Option<&SyncError> {
        self.last_load_error.as_ref()
    }

    fn set_state(&mut self, state: SyncState) {
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::tests::product;
    use crate::models::{Product, ProductDraft, ProductPatch};
    use crate::price::Price;
    use crate::remote::{MemoryTable, RemoteStore};

    fn seeded(rows: Vec<Product>) -> (Arc<MemoryTable<Product>>, SharedStore<Product>) {
        let table = Arc::new(MemoryTable::with_rows(rows));
        let store: SharedStore<Product> = table.clone();
        (table, store)
    }

    fn ids(controller: &SyncController<Product>) -> Vec<String> {
        controller.items().iter().map(|p| p.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_empty_list_reaches_ready() {
        let (_, store) = seeded(vec![]);
        let controller = SyncController::open(store).await;

        assert_eq!(controller.state(), SyncState::Ready);
        assert!(controller.is_empty());
        assert!(controller.last_load_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_load_is_soft() {
        let (table, store) = seeded(vec![product("1", "Serum", 1)]);
        table
            .fail_next(SyncError::RemoteUnavailable("connection reset".into()))
            .await;

        let controller = SyncController::open(store).await;
        assert_eq!(controller.state(), SyncState::Ready);
        assert!(controller.is_empty());
        assert!(matches!(
            controller.last_load_error(),
            Some(SyncError::RemoteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let (_, store) = seeded(vec![product("1", "Serum", 1), product("2", "Toner", 2)]);
        let mut controller = SyncController::open(store).await;
        let first = controller.items();

        controller.refresh().await;
        assert_eq!(*first, *controller.items());
        assert_eq!(ids(&controller), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_inserts_grow_by_one_newest_first() {
        let (_, store) = seeded(vec![product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;

        for (n, name) in ["Face Cream", "Lip Balm", "Toner"].iter().enumerate() {
            let before = controller.len();
            let created = controller
                .insert(&ProductDraft::new(*name, Price::from_major(500)))
                .await
                .unwrap();

            assert_eq!(controller.len(), before + 1);
            assert_eq!(controller.items()[0], created);
            assert_eq!(controller.len(), n + 2);
        }
    }

    #[tokio::test]
    async fn test_insert_prepends_server_entity() {
        let (_, store) = seeded(vec![product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;

        let draft: ProductDraft =
            serde_json::from_value(serde_json::json!({
                "name": "Face Cream",
                "category": "",
                "price": "500",
                "image": ""
            }))
            .unwrap();
        let created = controller.insert(&draft).await.unwrap();

        assert_eq!(created.price, Price::from_major(500));
        assert_eq!(ids(&controller), vec![created.id.clone(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_replaces_only_target() {
        let (_, store) = seeded(vec![product("7", "Face Cream", 2), product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;
        let untouched = controller.get("1").cloned();

        let updated = controller
            .update("7", &ProductPatch::price(Price::from_major(450)))
            .await
            .unwrap();

        assert_eq!(controller.get("7"), Some(&updated));
        assert_eq!(updated.price, Price::from_major(450));
        assert_eq!(controller.get("1").cloned(), untouched);
        assert_eq!(ids(&controller), vec!["7", "1"]);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_mirror() {
        let (table, store) = seeded(vec![product("7", "Face Cream", 1)]);
        let mut controller = SyncController::open(store).await;
        let before = controller.items();

        table
            .fail_next(SyncError::RemoteUnavailable("timeout".into()))
            .await;
        let err = controller
            .update("7", &ProductPatch::price(Price::from_major(450)))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
        assert!(Arc::ptr_eq(&before, &controller.items()));
        assert_eq!(controller.get("7").unwrap().price, Price::from_major(100));
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_mirror() {
        let (table, store) = seeded(vec![product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;
        let before = controller.items();

        table
            .fail_next(SyncError::ValidationRejected("name is required".into()))
            .await;
        let err = controller
            .insert(&ProductDraft::new("", Price::from_major(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ValidationRejected(_)));
        assert!(Arc::ptr_eq(&before, &controller.items()));
        assert_eq!(ids(&controller), vec!["1"]);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_mirror() {
        let (table, store) = seeded(vec![product("2", "Toner", 2), product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;
        let before = controller.items();

        table
            .fail_next(SyncError::Unauthorized("row level security".into()))
            .await;
        let err = controller.remove("2").await.unwrap_err();

        assert!(matches!(err, SyncError::Unauthorized(_)));
        assert!(Arc::ptr_eq(&before, &controller.items()));
        assert_eq!(ids(&controller), vec!["2", "1"]);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_remove_existing_and_missing() {
        let (_, store) = seeded(vec![product("2", "Toner", 2), product("1", "Serum", 1)]);
        let mut controller = SyncController::open(store).await;

        controller.remove("2").await.unwrap();
        assert_eq!(ids(&controller), vec!["1"]);

        let before = controller.items();
        let err = controller.remove("2").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert!(Arc::ptr_eq(&before, &controller.items()));
    }

    #[tokio::test]
    async fn test_remove_surfaces_adapter_success_for_unmirrored_id() {
        let (table, store) = seeded(vec![]);
        let mut controller = SyncController::open(store).await;

        // Created behind the controller's back
        let created = table
            .insert(&ProductDraft::new("Serum", Price::from_major(1)))
            .await
            .unwrap();

        controller.remove(&created.id).await.unwrap();
        assert!(controller.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (_, store) = seeded(vec![product("1", "Serum", 1)]);
        let mut controller = SyncController::new(store);
        let mut rx = controller.subscribe();
        assert_eq!(rx.borrow().state, SyncState::Loading);

        controller.refresh().await;
        assert!(rx.has_changed().unwrap());
        {
            let snapshot = rx.borrow_and_update();
            assert_eq!(snapshot.state, SyncState::Ready);
            assert_eq!(snapshot.items.len(), 1);
        }

        controller
            .insert(&ProductDraft::new("Toner", Price::from_major(2)))
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().items.len(), 2);
    }
}
