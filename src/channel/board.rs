use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::motion::{AxisLimits, Bearing, Waypoint};
use crate::tracker::{Track, TrackId};

/// The strongest track heard on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChannelEntry {
    pub channel: String,
    pub track_id: TrackId,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
    pub position: Waypoint,
    pub bearing: Bearing,
}

/// Per channel summary built from exactly classified tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ChannelBoard {
    pub entries: Vec<ChannelEntry>,
}

impl ChannelBoard {
    pub fn from_tracks(tracks: &[Track], limits: &AxisLimits) -> Self {
        let mut best: BTreeMap<&str, &Track> = BTreeMap::new();
        for track in tracks {
            let Some(name) = track.channel.as_ref().and_then(|c| c.exact_name()) else {
                continue;
            };
            let stronger = best
                .get(name)
                .map_or(true, |current| track.peak_power_db > current.peak_power_db);
            if stronger {
                best.insert(name, track);
            }
        }

        let entries = best
            .into_iter()
            .map(|(name, track)| ChannelEntry {
                channel: name.to_string(),
                track_id: track.id,
                peak_mhz: track.peak_mhz,
                peak_power_db: track.peak_power_db,
                position: track.best_position,
                bearing: limits.bearing(track.best_position),
            })
            .collect();
        Self { entries }
    }
}
