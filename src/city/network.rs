//! Road connectivity, computed on demand from the road collection
//!
//! Two roads are linked when an endpoint of one lies within the connection
//! radius of an endpoint of the other. A position is on a road when either
//! endpoint of that road is within the radius.

use std::collections::VecDeque;

use slotmap::SlotMap;

use crate::city::road::Road;
use crate::core::types::{RoadId, Vec2};

/// Whether a chain of roads links `a` to `b`
///
/// With `usable_only` only completed roads count; otherwise partially built
/// roads count too (used to avoid planning a second road for the same pair).
pub fn is_connected(
    roads: &SlotMap<RoadId, Road>,
    a: Vec2,
    b: Vec2,
    radius: f32,
    usable_only: bool,
) -> bool {
    let candidates: Vec<&Road> = roads
        .values()
        .filter(|r| !usable_only || r.is_usable())
        .collect();
    if candidates.is_empty() {
        return false;
    }

    let mut visited = vec![false; candidates.len()];
    let mut frontier = VecDeque::new();
    for (i, road) in candidates.iter().enumerate() {
        if road.has_endpoint_near(a, radius) {
            visited[i] = true;
            frontier.push_back(i);
        }
    }

    while let Some(i) = frontier.pop_front() {
        let road = candidates[i];
        if road.has_endpoint_near(b, radius) {
            return true;
        }
        for (j, other) in candidates.iter().enumerate() {
            if visited[j] {
                continue;
            }
            if other.has_endpoint_near(road.start, radius) || other.has_endpoint_near(road.end, radius)
            {
                visited[j] = true;
                frontier.push_back(j);
            }
        }
    }

    false
}
