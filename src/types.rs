// Location records supplied by the host, read-only to the map view
use bevy::prelude::*;

pub type LocationId = i64;

/// Identity metadata resolved by the host's identity collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerProfile {
    pub display_name: Option<String>,
    /// Opaque image reference (URL or asset path). Never fetched by the core.
    pub avatar_ref: Option<String>,
}

impl OwnerProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_ref.is_none()
    }
}

/// A user-submitted location. `id` is unique and stable across refreshes.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub created_at: String,
    pub updated_at: String,
    pub owner: Option<OwnerProfile>,
}

impl Location {
    pub fn new(id: LocationId, owner_id: impl Into<String>, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            x: position.x,
            y: position.y,
            z: position.z,
            created_at: String::new(),
            updated_at: String::new(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: OwnerProfile) -> Self {
        self.owner = (!owner.is_empty()).then_some(owner);
        self
    }

    /// World position, or `None` when any coordinate is NaN or infinite.
    pub fn position(&self) -> Option<Vec3> {
        let position = Vec3::new(self.x, self.y, self.z);
        position.is_finite().then_some(position)
    }

    pub fn owner_display_name(&self) -> Option<&str> {
        self.owner.as_ref()?.display_name.as_deref()
    }

    pub fn owner_avatar_ref(&self) -> Option<&str> {
        self.owner.as_ref()?.avatar_ref.as_deref()
    }

    /// Timestamp used for recency ordering: `updated_at`, else `created_at`.
    pub fn recency_key(&self) -> &str {
        if self.updated_at.is_empty() {
            &self.created_at
        } else {
            &self.updated_at
        }
    }
}
