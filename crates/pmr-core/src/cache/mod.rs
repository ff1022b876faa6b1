//! Owner-scoped, sorted, in-memory list of one entity kind.
//!
//! A [`ListCache`] is the state behind one list screen: the current user's
//! items in sorted order, a loading flag, the last error message and a free-text
//! query. Every state change is published as a [`ListEvent`] to subscribers.
//!
//! Adds insert the persisted entity at its sorted position. Updates merge
//! remotely and then reload. Deletes remove locally first, then remotely; what
//! happens after a failed remote delete is governed by [`ReconcilePolicy`].

mod records;

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::document::{Document, Timestamp};
use crate::models::Entity;
use crate::repository::Repository;
use crate::store::DocumentStore;

/// Message shown when a write is attempted with nobody signed in.
pub const NOT_SIGNED_IN: &str = "Not signed in";

/// Outcome of a side effect run after a successful write.
pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Side effects that follow successful remote writes.
pub trait ListHooks<E>: Send {
    fn created(&self, _entity: &E) -> HookResult {
        Ok(())
    }

    /// Called with the entity as reloaded after the merge.
    fn updated(&self, _entity: &E) -> HookResult {
        Ok(())
    }

    fn deleted(&self, _id: &str) {}
}

/// What to do with the local list after a remote delete fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Reload from the store so the list matches server state again.
    #[default]
    ReloadOnFailure,
    /// Keep the optimistic removal until the next load.
    KeepLocal,
}

/// Change published by a [`ListCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loading(bool),
    /// Items were replaced wholesale by a load.
    Replaced { count: usize },
    Inserted { index: usize, id: String },
    Removed { ids: Vec<String> },
    Failed(String),
}

/// Position that keeps `items` sorted when `entity` is inserted.
///
/// Binary search for the first element that sorts strictly after `entity`, so
/// the new entity lands after existing equal keys.
pub fn insertion_index<E: Entity>(items: &[E], entity: &E) -> usize {
    items.partition_point(|existing| existing.sort_cmp(entity).is_le())
}

/// Sorted list state for the signed-in user.
pub struct ListCache<E: Entity> {
    repo: Repository<E>,
    auth: Arc<dyn AuthProvider>,
    hooks: Option<Box<dyn ListHooks<E>>>,
    policy: ReconcilePolicy,
    items: Vec<E>,
    loading: bool,
    error: Option<String>,
    query: String,
    listeners: Vec<Sender<ListEvent>>,
}

impl<E: Entity> ListCache<E> {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            repo: Repository::new(store),
            auth,
            hooks: None,
            policy: ReconcilePolicy::default(),
            items: Vec::new(),
            loading: false,
            error: None,
            query: String::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hooks(mut self, hooks: impl ListHooks<E> + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    pub fn repository(&self) -> &Repository<E> {
        &self.repo
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Receive every change published from now on.
    pub fn subscribe(&mut self) -> Receiver<ListEvent> {
        let (tx, rx) = channel();
        self.listeners.push(tx);
        rx
    }

    /// Items matching the current query, in list order.
    ///
    /// A blank query matches everything.
    pub fn filtered(&self) -> Vec<E> {
        if self.query.trim().is_empty() {
            return self.items.clone();
        }
        self.items
            .iter()
            .filter(|item| item.matches_query(&self.query))
            .cloned()
            .collect()
    }

    /// Replace the items with the signed-in user's entities.
    ///
    /// Does nothing when nobody is signed in. On failure the previous items stay.
    pub fn load(&mut self) {
        let Some(owner) = self.auth.current_user_id() else {
            debug!(collection = E::COLLECTION, "load skipped, nobody signed in");
            return;
        };

        self.loading = true;
        self.error = None;
        self.emit(ListEvent::Loading(true));

        match self.repo.list(&owner) {
            Ok(items) => {
                debug!(collection = E::COLLECTION, owner = %owner, count = items.len(), "list loaded");
                self.items = items;
                let count = self.items.len();
                self.emit(ListEvent::Replaced { count });
            }
            Err(e) => self.fail("load", e),
        }

        self.loading = false;
        self.emit(ListEvent::Loading(false));
    }

    /// Persist a new entity and insert it at its sorted position.
    ///
    /// Returns the saved entity, or `None` with `error` set.
    pub fn add(&mut self, mut entity: E) -> Option<E> {
        let owner = self.require_owner()?;
        entity.stamp_created(Timestamp::now());

        let saved = match self.repo.create(&owner, &entity) {
            Ok(saved) => saved,
            Err(e) => {
                self.fail("add", e);
                return None;
            }
        };

        self.insert_sorted(saved.clone());
        if let Some(hooks) = &self.hooks {
            if let Err(e) = hooks.created(&saved) {
                warn!(collection = E::COLLECTION, error = %e, "post-create hook failed");
            }
        }
        Some(saved)
    }

    /// Merge `patch` into the entity remotely, then reload.
    ///
    /// Returns whether the merge succeeded.
    pub fn update(&mut self, id: &str, mut patch: Document) -> bool {
        let Some(owner) = self.require_owner() else {
            return false;
        };
        patch.insert("updatedAt".to_string(), Timestamp::now().into());

        if let Err(e) = self.repo.merge(&owner, id, patch) {
            self.fail("update", e);
            return false;
        }

        self.load();
        if let (Some(hooks), Some(entity)) = (&self.hooks, self.find(id)) {
            if let Err(e) = hooks.updated(entity) {
                warn!(collection = E::COLLECTION, id = %id, error = %e, "post-update hook failed");
            }
        }
        true
    }

    /// Remove the ids locally, then delete each one remotely.
    ///
    /// Local removal is published before the first remote call. Every id is
    /// attempted; the last failure is left in `error`. Returns whether every
    /// remote delete succeeded.
    pub fn delete(&mut self, ids: &[String]) -> bool {
        let Some(owner) = self.require_owner() else {
            return false;
        };

        let mut removed = Vec::new();
        self.items.retain(|item| match item.id() {
            Some(id) if ids.iter().any(|d| d == id) => {
                removed.push(id.to_string());
                false
            }
            _ => true,
        });
        if !removed.is_empty() {
            self.emit(ListEvent::Removed { ids: removed });
        }

        let mut failed = false;
        for id in ids {
            match self.repo.delete(&owner, id) {
                Ok(()) => {
                    if let Some(hooks) = &self.hooks {
                        hooks.deleted(id);
                    }
                }
                Err(e) => {
                    failed = true;
                    self.fail("delete", e);
                }
            }
        }

        if failed && self.policy == ReconcilePolicy::ReloadOnFailure {
            info!(collection = E::COLLECTION, "reloading after failed delete");
            let failure = self.error.take();
            self.load();
            if failure.is_some() {
                self.error = failure;
            }
        }
        !failed
    }

    /// Drop all items, e.g. after sign-out.
    pub fn clear(&mut self) {
        self.items.clear();
        self.error = None;
        self.query.clear();
        self.emit(ListEvent::Replaced { count: 0 });
    }

    /// The loaded item with this id.
    pub fn find(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    fn insert_sorted(&mut self, entity: E) {
        let index = insertion_index(&self.items, &entity);
        let id = entity.id().unwrap_or_default().to_string();
        self.items.insert(index, entity);
        self.emit(ListEvent::Inserted { index, id });
    }

    fn require_owner(&mut self) -> Option<String> {
        let owner = self.auth.current_user_id();
        if owner.is_none() {
            self.error = Some(NOT_SIGNED_IN.to_string());
            self.emit(ListEvent::Failed(NOT_SIGNED_IN.to_string()));
        }
        owner
    }

    fn fail(&mut self, op: &str, err: impl std::fmt::Display) {
        let message = err.to_string();
        warn!(collection = E::COLLECTION, op, error = %message, "remote call failed");
        self.error = Some(message.clone());
        self.emit(ListEvent::Failed(message));
    }

    fn emit(&mut self, event: ListEvent) {
        self.listeners
            .retain(|listener| listener.send(event.clone()).is_ok());
    }
}
