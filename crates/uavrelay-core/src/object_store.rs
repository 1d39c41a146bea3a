//! Object store contract
//!
//! The shared-object registry is an external collaborator. The router needs
//! change notifications, per-object metadata, and (for the poller) the ability
//! to commit a sampled value.

use alloc::boxed::Box;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::event::ChangeNotification;
use crate::types::{InstanceId, ObjectRef, ObjectValue};

/// Who may write an object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Per-object metadata relevant to routing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Whether updates must be acknowledged by the remote side
    pub ack_required: bool,
    pub access: AccessMode,
}

/// Callback fired by the store whenever a watched object changes.
///
/// Invoked from arbitrary task contexts; implementations must not block.
pub type ChangeCallback = Box<dyn Fn(ChangeNotification) + Send + Sync>;

/// Shared-object registry
pub trait ObjectStore: Send + Sync {
    /// Register a change callback for one object
    fn on_change(&self, object: ObjectRef, callback: ChangeCallback) -> Result<(), StoreError>;

    fn get_metadata(&self, object: ObjectRef) -> Result<ObjectMetadata, StoreError>;

    fn set_metadata(&self, object: ObjectRef, metadata: ObjectMetadata) -> Result<(), StoreError>;

    fn set(
        &self,
        object: ObjectRef,
        instance: InstanceId,
        value: ObjectValue,
    ) -> Result<(), StoreError>;

    fn get(&self, object: ObjectRef, instance: InstanceId) -> Result<ObjectValue, StoreError>;
}
