//! In-memory object store
//!
//! Objects must be registered before use. `set` honours the object's access
//! mode and notifies watchers with `Updated`; local owners write through
//! `update_manual`, which bypasses access control. Callbacks run after every
//! map guard is released, so a callback may call back into the store.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use uavrelay_core::{
    AccessMode, ChangeCallback, ChangeKind, ChangeNotification, InstanceId, ObjectMetadata,
    ObjectRef, ObjectStore, ObjectValue, StoreError,
};

use tracing::trace;

type SharedCallback = Arc<dyn Fn(ChangeNotification) + Send + Sync>;

#[derive(Default)]
struct ObjectEntry {
    metadata: ObjectMetadata,
    values: HashMap<InstanceId, ObjectValue>,
}

/// Object store backed by concurrent maps
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<ObjectRef, ObjectEntry>,
    callbacks: DashMap<ObjectRef, Vec<SharedCallback>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an object with its metadata
    pub fn register(&self, object: ObjectRef, metadata: ObjectMetadata) {
        self.objects
            .entry(object)
            .or_default()
            .metadata = metadata;
    }

    /// Owner-side write: ignores access mode, notifies `UpdatedManual`
    pub fn update_manual(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        value: ObjectValue,
    ) -> Result<(), StoreError> {
        self.objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject { object })?
            .values
            .insert(instance, value);
        self.notify(ChangeNotification {
            object,
            instance,
            kind: ChangeKind::UpdatedManual,
        });
        Ok(())
    }

    /// Ask watchers to fetch a fresh copy from the remote side
    pub fn request_update(&self, object: ObjectRef, instance: InstanceId) -> Result<(), StoreError> {
        if !self.objects.contains_key(&object) {
            return Err(StoreError::UnknownObject { object });
        }
        self.notify(ChangeNotification {
            object,
            instance,
            kind: ChangeKind::UpdateRequested,
        });
        Ok(())
    }

    /// Fire every callback registered for the notification's object
    pub fn notify(&self, notification: ChangeNotification) {
        let callbacks: Vec<SharedCallback> = self
            .callbacks
            .get(&notification.object)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        trace!(object = %notification.object, watchers = callbacks.len(), "notify");
        for callback in callbacks {
            callback(notification);
        }
    }

    pub fn watcher_count(&self, object: ObjectRef) -> usize {
        self.callbacks.get(&object).map_or(0, |entry| entry.len())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn on_change(&self, object: ObjectRef, callback: ChangeCallback) -> Result<(), StoreError> {
        if !self.objects.contains_key(&object) {
            return Err(StoreError::UnknownObject { object });
        }
        self.callbacks
            .entry(object)
            .or_default()
            .push(Arc::from(callback));
        Ok(())
    }

    fn get_metadata(&self, object: ObjectRef) -> Result<ObjectMetadata, StoreError> {
        self.objects
            .get(&object)
            .map(|entry| entry.metadata)
            .ok_or(StoreError::UnknownObject { object })
    }

    fn set_metadata(&self, object: ObjectRef, metadata: ObjectMetadata) -> Result<(), StoreError> {
        self.objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject { object })?
            .metadata = metadata;
        Ok(())
    }

    fn set(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        value: ObjectValue,
    ) -> Result<(), StoreError> {
        {
            let mut entry = self
                .objects
                .get_mut(&object)
                .ok_or(StoreError::UnknownObject { object })?;
            if entry.metadata.access != AccessMode::ReadWrite {
                return Err(StoreError::AccessDenied { object });
            }
            entry.values.insert(instance, value);
        }
        self.notify(ChangeNotification {
            object,
            instance,
            kind: ChangeKind::Updated,
        });
        Ok(())
    }

    fn get(&self, object: ObjectRef, instance: InstanceId) -> Result<ObjectValue, StoreError> {
        self.objects
            .get(&object)
            .ok_or(StoreError::UnknownObject { object })?
            .values
            .get(&instance)
            .cloned()
            .ok_or(StoreError::UnknownObject { object })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const OBJECT: ObjectRef = ObjectRef::new(0x42);

    #[test]
    fn test_read_only_rejects_set() {
        let store = MemoryObjectStore::new();
        store.register(
            OBJECT,
            ObjectMetadata {
                ack_required: false,
                access: AccessMode::ReadOnly,
            },
        );
        assert!(matches!(
            store.set(OBJECT, InstanceId::FIRST, ObjectValue::new(vec![1])),
            Err(StoreError::AccessDenied { .. })
        ));
        store
            .update_manual(OBJECT, InstanceId::FIRST, ObjectValue::new(vec![2]))
            .unwrap();
        assert_eq!(
            store.get(OBJECT, InstanceId::FIRST).unwrap(),
            ObjectValue::new(vec![2])
        );
    }

    #[test]
    fn test_callbacks_see_every_kind() {
        let store = Arc::new(MemoryObjectStore::new());
        store.register(OBJECT, ObjectMetadata::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .on_change(OBJECT, Box::new(move |n| sink.lock().push(n.kind)))
            .unwrap();

        store
            .set(OBJECT, InstanceId::FIRST, ObjectValue::new(vec![1]))
            .unwrap();
        store
            .update_manual(OBJECT, InstanceId::FIRST, ObjectValue::new(vec![2]))
            .unwrap();
        store.request_update(OBJECT, InstanceId::FIRST).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ChangeKind::Updated,
                ChangeKind::UpdatedManual,
                ChangeKind::UpdateRequested
            ]
        );
    }

    #[test]
    fn test_callback_may_reenter_store() {
        let store = Arc::new(MemoryObjectStore::new());
        store.register(OBJECT, ObjectMetadata::default());
        let weak = Arc::downgrade(&store);
        let observed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&observed);
        store
            .on_change(
                OBJECT,
                Box::new(move |n| {
                    if let Some(store) = weak.upgrade() {
                        *slot.lock() = store.get_metadata(n.object).ok();
                    }
                }),
            )
            .unwrap();
        store
            .set(OBJECT, InstanceId::FIRST, ObjectValue::default())
            .unwrap();
        assert_eq!(*observed.lock(), Some(ObjectMetadata::default()));
    }

    #[test]
    fn test_unknown_object() {
        let store = MemoryObjectStore::new();
        assert!(store.get_metadata(OBJECT).is_err());
        assert!(store.on_change(OBJECT, Box::new(|_| {})).is_err());
    }
}
