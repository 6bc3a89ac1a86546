// Location feed: the backend's JSON rows converted into Location records
use std::path::Path;

use serde::Deserialize;

use crate::error::MapError;
use crate::types::{Location, LocationId, OwnerProfile};

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";

/// One row as served by the locations endpoint.
#[derive(Debug, Deserialize)]
struct LocationRow {
    id: LocationId,
    user_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    // null or absent coordinates are kept as NaN so the rebuild skips them
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    #[serde(default)]
    z: Option<f32>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    discord_username: Option<String>,
    #[serde(default)]
    discord_avatar: Option<String>,
    #[serde(default)]
    discord_id: Option<String>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        let avatar_ref = match (&row.discord_id, &row.discord_avatar) {
            (Some(user), Some(avatar)) if !user.is_empty() && !avatar.is_empty() => {
                Some(format!("{AVATAR_CDN}/{user}/{avatar}.png"))
            }
            _ => None,
        };
        let owner = OwnerProfile {
            display_name: row.discord_username.filter(|name| !name.is_empty()),
            avatar_ref,
        };

        Location {
            id: row.id,
            owner_id: row.user_id,
            name: row.name,
            description: row.description,
            x: row.x.unwrap_or(f32::NAN),
            y: row.y.unwrap_or(f32::NAN),
            z: row.z.unwrap_or(f32::NAN),
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
            owner: (!owner.is_empty()).then_some(owner),
        }
    }
}

pub fn parse_locations(json: &str) -> Result<Vec<Location>, MapError> {
    let rows: Vec<LocationRow> = serde_json::from_str(json)?;
    Ok(rows.into_iter().map(Location::from).collect())
}

pub fn load_locations(path: &Path) -> Result<Vec<Location>, MapError> {
    let json = std::fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
    parse_locations(&json)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Orders by `updated_at` (falling back to `created_at`). Timestamps are
/// ISO-8601 strings, so lexical order is chronological.
pub fn sort_by_recency(locations: &mut [Location], order: SortOrder) {
    locations.sort_by(|a, b| {
        let ord = a.recency_key().cmp(b.recency_key());
        match order {
            SortOrder::OldestFirst => ord,
            SortOrder::NewestFirst => ord.reverse(),
        }
        .then_with(|| a.id.cmp(&b.id))
    });
}

/// Case-insensitive name search; an empty query matches everything.
pub fn search<'a>(locations: &'a [Location], query: &str) -> Vec<&'a Location> {
    let needle = query.trim().to_lowercase();
    locations
        .iter()
        .filter(|loc| needle.is_empty() || loc.name.to_lowercase().contains(&needle))
        .collect()
}
