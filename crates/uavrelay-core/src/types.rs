//! Core types for the uavrelay router
//!
//! Identifiers handed to the router by the object store are kept as opaque
//! newtypes: the router passes them through and never looks inside.

use core::fmt;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::RelayError;

// ----------------------------------------------------------------------------
// Link Identifier
// ----------------------------------------------------------------------------

/// Identifier of one router-managed link (stable for the process lifetime)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LinkId(u8);

impl LinkId {
    /// Link attached to the ground-station telemetry port
    pub const GROUND: Self = Self(0);
    /// Link attached to the secondary radio/output port
    pub const OUTPUT: Self = Self(1);

    /// Both links in construction order
    pub const ALL: [Self; 2] = [Self::GROUND, Self::OUTPUT];

    /// Build a link id from a raw index, rejecting anything but 0 and 1
    pub fn from_index(index: usize) -> Result<Self, RelayError> {
        match index {
            0 => Ok(Self::GROUND),
            1 => Ok(Self::OUTPUT),
            other => Err(RelayError::config_error(format!(
                "link index {} out of range (router has two links)",
                other
            ))),
        }
    }

    /// Index into the router's link table
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The relay peer of this link
    pub fn peer(self) -> Self {
        Self(1 - self.0)
    }
}

impl TryFrom<u8> for LinkId {
    type Error = RelayError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_index(raw as usize)
    }
}

impl From<LinkId> for u8 {
    fn from(link: LinkId) -> Self {
        link.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Object Identifiers
// ----------------------------------------------------------------------------

/// Opaque reference to a shared object, as issued by the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef(u32);

impl ObjectRef {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Instance of a multi-instance object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u16);

impl InstanceId {
    /// First (and for single-instance objects, only) instance
    pub const FIRST: Self = Self(0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Packet
// ----------------------------------------------------------------------------

/// A fully framed packet as produced by a session's decoder.
///
/// The router owns the bytes while a forward is in flight and never looks
/// inside them.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet(Vec<u8>);

impl Packet {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Packet {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Packet {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({} bytes: {})", self.0.len(), hex::encode(&self.0))
    }
}

// ----------------------------------------------------------------------------
// Samples and Object Values
// ----------------------------------------------------------------------------

/// Encoded value of an object instance, opaque to the router
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectValue(Vec<u8>);

impl ObjectValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One reading of an external input source (e.g. receiver channel values)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub channels: SmallVec<[u32; 16]>,
}

impl Sample {
    pub fn new(channels: &[u32]) -> Self {
        Self {
            channels: SmallVec::from_slice(channels),
        }
    }

    /// Encode this sample as the value committed to the object store
    pub fn to_value(&self) -> Result<ObjectValue, RelayError> {
        Ok(ObjectValue(bincode::serialize(&self.channels)?))
    }

    /// Decode a sample previously written with [`Sample::to_value`]
    pub fn from_value(value: &ObjectValue) -> Result<Self, RelayError> {
        Ok(Self {
            channels: bincode::deserialize(value.as_bytes())?,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
