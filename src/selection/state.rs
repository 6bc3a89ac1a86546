// Selection state and events
use bevy::prelude::*;

use crate::types::Location;

/// Current selection of a view: at most one location and the marker showing it.
#[derive(Component, Debug, Default, Clone)]
pub struct ViewSelection {
    location: Option<Location>,
    marker: Option<Entity>,
}

impl ViewSelection {
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn marker(&self) -> Option<Entity> {
        self.marker
    }

    pub fn select(&mut self, location: Location, marker: Entity) {
        self.location = Some(location);
        self.marker = Some(marker);
    }

    pub fn clear(&mut self) {
        self.location = None;
        self.marker = None;
    }
}

/// The one marker the outline pass draws around, if any.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    marker: Option<Entity>,
}

impl Highlight {
    pub fn set(&mut self, marker: Option<Entity>) {
        self.marker = marker;
    }

    pub fn selected(&self) -> Option<Entity> {
        self.marker
    }
}

/// Sent on every pick, miss, host clear, and when a rebuild drops the
/// selected location. `None` means nothing is selected.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct LocationSelected {
    pub view: Entity,
    pub location: Option<Location>,
}

/// Host request to drop the current selection of a view.
#[derive(Event, Clone, Copy, Debug)]
pub struct ClearSelection {
    pub view: Entity,
}
