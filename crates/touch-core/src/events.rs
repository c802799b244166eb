//! Contact lifecycle events
//!
//! A fresh `TouchEvent` is built for every notification; raw and calibrated
//! variants of the same transition are separate values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ContactSnapshot, CoordinateSpace, CoreResult, TrackId};

/// Event envelope for contact lifecycle transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: TouchEventKind,
    pub space: CoordinateSpace,
    pub contact: ContactSnapshot,
}

impl TouchEvent {
    pub fn new(kind: TouchEventKind, contact: ContactSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: contact.timestamp,
            kind,
            space: contact.space,
            contact,
        }
    }

    pub fn arrived(contact: ContactSnapshot) -> Self {
        Self::new(TouchEventKind::Arrived, contact)
    }

    pub fn moved(contact: ContactSnapshot) -> Self {
        Self::new(TouchEventKind::Moved, contact)
    }

    pub fn held(contact: ContactSnapshot) -> Self {
        Self::new(TouchEventKind::Held, contact)
    }

    pub fn departed(contact: ContactSnapshot) -> Self {
        Self::new(TouchEventKind::Departed, contact)
    }

    pub fn track_id(&self) -> TrackId {
        self.contact.id
    }

    pub fn is_raw(&self) -> bool {
        self.space == CoordinateSpace::Raw
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Lifecycle transition carried by a `TouchEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TouchEventKind {
    /// A new contact appeared
    Arrived,
    /// A live contact was updated
    Moved,
    /// A contact stayed still past the held threshold
    Held,
    /// A contact disappeared or lost a conflict
    Departed,
}

impl TouchEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TouchEventKind::Arrived => "arrived",
            TouchEventKind::Moved => "moved",
            TouchEventKind::Held => "held",
            TouchEventKind::Departed => "departed",
        }
    }
}

impl fmt::Display for TouchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
