//! Key-location selection.
//!
//! Only stations where trains can conflict need scheduling: termini, where
//! patterns start and end, and junctions, where lines meet or diverge. A
//! station whose distinct neighbours across every pattern number at most two
//! is plain track and is dropped.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::StationName;

/// Select the key stations from resolved pattern station lists.
///
/// A station is kept if it is the first or last stop of some pattern, or if
/// it has more than two distinct neighbours.
pub fn key_stations(station_lists: &[Vec<StationName>]) -> BTreeSet<StationName> {
    let mut neighbours: HashMap<&StationName, HashSet<&StationName>> = HashMap::new();
    let mut keys = BTreeSet::new();

    for stations in station_lists {
        if let (Some(first), Some(last)) = (stations.first(), stations.last()) {
            keys.insert(first.clone());
            keys.insert(last.clone());
        }
        for pair in stations.windows(2) {
            neighbours.entry(&pair[0]).or_default().insert(&pair[1]);
            neighbours.entry(&pair[1]).or_default().insert(&pair[0]);
        }
    }

    keys.extend(
        neighbours
            .into_iter()
            .filter(|(_, adjacent)| adjacent.len() > 2)
            .map(|(station, _)| station.clone()),
    );
    keys
}
