//! Density-based hotspot clustering.
//!
//! DBSCAN over `(lat, lng)` pairs. Neighbourhood queries go through an
//! R-tree so each point's eps-neighbourhood is found without scanning the
//! whole subset.

use std::collections::{BTreeMap, VecDeque};

use fixmypothole_analytics_models::Hotspot;
use fixmypothole_report_models::Report;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::KM_PER_DEGREE;

/// Default neighbourhood radius.
pub const DEFAULT_EPS_KM: f64 = 0.1;

/// Default minimum neighbourhood size (the point itself included) for a
/// point to seed a cluster.
pub const DEFAULT_MIN_SAMPLES: usize = 3;

/// Member count at which hotspot intensity saturates at `1.0`.
const INTENSITY_SATURATION: f64 = 10.0;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// Finds hotspots with the default radius and density.
#[must_use]
pub fn identify_hotspots(reports: &[Report]) -> Vec<Hotspot> {
    cluster(reports, DEFAULT_EPS_KM, DEFAULT_MIN_SAMPLES)
}

/// Clusters reports and summarises each cluster as a [`Hotspot`].
///
/// Noise points are dropped. Hotspots are sorted by member count
/// (descending), then by centroid, so identical input always produces
/// identical output.
#[must_use]
pub fn cluster(reports: &[Report], eps_km: f64, min_samples: usize) -> Vec<Hotspot> {
    if reports.len() < 2 {
        return vec![];
    }

    let points: Vec<[f64; 2]> = reports.iter().map(|r| [r.latitude, r.longitude]).collect();
    let labels = dbscan(&points, eps_km / KM_PER_DEGREE, min_samples);

    let mut members: BTreeMap<usize, Vec<[f64; 2]>> = BTreeMap::new();
    for (point, label) in points.iter().zip(&labels) {
        if let Label::Cluster(id) = label {
            members.entry(*id).or_default().push(*point);
        }
    }

    let mut hotspots: Vec<Hotspot> = members.into_values().map(|m| summarize(&m)).collect();

    hotspots.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.lat.total_cmp(&b.lat))
            .then_with(|| a.lng.total_cmp(&b.lng))
    });

    log::debug!(
        "Found {} hotspots among {} reports",
        hotspots.len(),
        reports.len()
    );

    hotspots
}

#[allow(clippy::cast_precision_loss)]
fn summarize(members: &[[f64; 2]]) -> Hotspot {
    let count = members.len();
    let n = count as f64;
    let (sum_lat, sum_lng) = members
        .iter()
        .fold((0.0, 0.0), |(la, lo), p| (la + p[0], lo + p[1]));

    Hotspot {
        lat: sum_lat / n,
        lng: sum_lng / n,
        intensity: (n / INTENSITY_SATURATION).min(1.0),
        count,
    }
}

/// Labels each point with a cluster id or as noise.
///
/// `eps` is in the same units as the points. A point is a core point when
/// at least `min_samples` points (itself included) lie within `eps`.
/// Border points join the first cluster that reaches them.
fn dbscan(points: &[[f64; 2]], eps: f64, min_samples: usize) -> Vec<Label> {
    let tree: RTree<IndexedPoint> = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(idx, p)| GeomWithData::new(*p, idx))
            .collect(),
    );
    let eps_sq = eps * eps;
    let neighbours = |idx: usize| -> Vec<usize> {
        tree.locate_within_distance(points[idx], eps_sq)
            .map(|p| p.data)
            .collect()
    };

    let mut labels = vec![Label::Unvisited; points.len()];
    let mut next_id = 0;

    for idx in 0..points.len() {
        if labels[idx] != Label::Unvisited {
            continue;
        }

        let seeds = neighbours(idx);
        if seeds.len() < min_samples {
            labels[idx] = Label::Noise;
            continue;
        }

        let id = next_id;
        next_id += 1;
        labels[idx] = Label::Cluster(id);

        let mut queue: VecDeque<usize> = seeds.into();
        while let Some(current) = queue.pop_front() {
            match labels[current] {
                Label::Cluster(_) => {}
                Label::Noise => labels[current] = Label::Cluster(id),
                Label::Unvisited => {
                    labels[current] = Label::Cluster(id);
                    let reach = neighbours(current);
                    if reach.len() >= min_samples {
                        queue.extend(
                            reach
                                .into_iter()
                                .filter(|n| !matches!(labels[*n], Label::Cluster(_))),
                        );
                    }
                }
            }
        }
    }

    labels
}
