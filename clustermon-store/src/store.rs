//! The object store: type-indexed registries with per-object locking
//! (spec §4.1, §5).
//!
//! Locking order is always object-then-registry, never the reverse: code
//! that needs both a `Checkable`'s mutex and a registry-wide operation
//! must release the object lock before taking any registry-wide lock.
//! The registries themselves ([`dashmap::DashMap`]) are reader-preferred
//! sharded maps, so most lookups never block a concurrent insert
//! elsewhere in the map.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use clustermon_types::{Checkable, CheckableId, Endpoint, Notification, NotificationId, User, UserGroup};

use crate::events::EventBus;

/// A handle to a single stored object plus its dedicated mutex. Cloning
/// a handle is cheap (it's an `Arc`); it does not clone the object.
pub type Handle<T> = Arc<Mutex<T>>;

#[derive(Default)]
pub struct Store {
    checkables: DashMap<CheckableId, Handle<Checkable>>,
    notifications: DashMap<NotificationId, Handle<Notification>>,
    users: DashMap<String, User>,
    groups: DashMap<String, UserGroup>,
    endpoints: DashMap<String, Handle<Endpoint>>,
    pub bus: EventBus,
}

impl Store {
    pub fn new() -> Self {
        Store {
            checkables: DashMap::new(),
            notifications: DashMap::new(),
            users: DashMap::new(),
            groups: DashMap::new(),
            endpoints: DashMap::new(),
            bus: EventBus::new(),
        }
    }

    // --- Checkables ---

    pub fn insert_checkable(&self, c: Checkable) -> Handle<Checkable> {
        let handle = Arc::new(Mutex::new(c));
        let id = handle.lock().id.clone();
        self.checkables.insert(id, handle.clone());
        handle
    }

    pub fn get_checkable(&self, id: &CheckableId) -> Option<Handle<Checkable>> {
        self.checkables.get(id).map(|e| e.value().clone())
    }

    pub fn remove_checkable(&self, id: &CheckableId) -> Option<Handle<Checkable>> {
        self.checkables.remove(id).map(|(_, v)| v)
    }

    pub fn all_checkables(&self) -> Vec<Handle<Checkable>> {
        self.checkables.iter().map(|e| e.value().clone()).collect()
    }

    pub fn checkable_count(&self) -> usize {
        self.checkables.len()
    }

    // --- Notifications ---

    pub fn insert_notification(&self, id: NotificationId, n: Notification) -> Handle<Notification> {
        let handle = Arc::new(Mutex::new(n));
        self.notifications.insert(id, handle.clone());
        handle
    }

    pub fn get_notification(&self, id: &NotificationId) -> Option<Handle<Notification>> {
        self.notifications.get(id).map(|e| e.value().clone())
    }

    pub fn notifications_for(&self, checkable: &CheckableId) -> Vec<(NotificationId, Handle<Notification>)> {
        self.notifications
            .iter()
            .filter(|e| &e.key().checkable == checkable)
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn all_notifications(&self) -> Vec<(NotificationId, Handle<Notification>)> {
        self.notifications
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    // --- Users / groups ---

    pub fn insert_user(&self, u: User) {
        self.users.insert(u.name.clone(), u);
    }

    pub fn get_user(&self, name: &str) -> Option<User> {
        self.users.get(name).map(|e| e.value().clone())
    }

    pub fn insert_group(&self, g: UserGroup) {
        self.groups.insert(g.name.clone(), g);
    }

    pub fn get_group(&self, name: &str) -> Option<UserGroup> {
        self.groups.get(name).map(|e| e.value().clone())
    }

    /// Materialise a notification's user set: explicit users ∪ ⋃ group
    /// members (spec §4.5 step 7).
    pub fn resolve_users(&self, users: &[String], groups: &[String]) -> Vec<User> {
        let mut names: std::collections::BTreeSet<String> = users.iter().cloned().collect();
        for g in groups {
            if let Some(group) = self.get_group(g) {
                names.extend(group.members);
            }
        }
        names.into_iter().filter_map(|n| self.get_user(&n)).collect()
    }

    // --- Endpoints ---

    pub fn insert_endpoint(&self, e: Endpoint) -> Handle<Endpoint> {
        let handle = Arc::new(Mutex::new(e));
        let name = handle.lock().name.clone();
        self.endpoints.insert(name, handle.clone());
        handle
    }

    pub fn get_endpoint(&self, name: &str) -> Option<Handle<Endpoint>> {
        self.endpoints.get(name).map(|e| e.value().clone())
    }

    pub fn all_endpoints(&self) -> Vec<Handle<Endpoint>> {
        self.endpoints.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::checkable::CommandLine;

    #[test]
    fn insert_and_lookup_checkable() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["check_ping".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);

        assert_eq!(store.checkable_count(), 1);
        let handle = store.get_checkable(&id).expect("checkable present");
        assert_eq!(handle.lock().id, id);
    }

    #[test]
    fn remove_checkable_drops_it() {
        let store = Store::new();
        let host = Checkable::new_host("web1", CommandLine::Argv(vec!["check_ping".into()]));
        let id = host.id.clone();
        store.insert_checkable(host);
        assert!(store.remove_checkable(&id).is_some());
        assert!(store.get_checkable(&id).is_none());
    }

    #[test]
    fn resolve_users_unions_explicit_and_group_members() {
        let store = Store::new();
        store.insert_user(User {
            name: "alice".into(),
            period: None,
            state_filter: clustermon_types::StateFilter::ALL,
            type_filter: clustermon_types::TypeFilter::ALL,
            enable_notifications: true,
            channels: vec!["mail".into()],
        });
        store.insert_user(User {
            name: "bob".into(),
            period: None,
            state_filter: clustermon_types::StateFilter::ALL,
            type_filter: clustermon_types::TypeFilter::ALL,
            enable_notifications: true,
            channels: vec!["mail".into()],
        });
        store.insert_group(UserGroup {
            name: "oncall".into(),
            members: vec!["bob".into()],
        });

        let resolved = store.resolve_users(&["alice".to_string()], &["oncall".to_string()]);
        let names: std::collections::BTreeSet<_> = resolved.iter().map(|u| u.name.clone()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains("alice"));
        assert!(names.contains("bob"));
    }

    #[test]
    fn event_bus_delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();
        bus.publish(StoreEvent::Started);
        assert!(matches!(rx1.try_recv().unwrap(), StoreEvent::Started));
        assert!(matches!(rx2.try_recv().unwrap(), StoreEvent::Started));
    }
}
