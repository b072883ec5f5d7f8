//! Path stitcher
//!
//! Groups primitives into maximal contiguous paths by tolerance-based
//! endpoint matching and splits the result into closed contours and open
//! runs.

use crate::path::Path;
use crate::primitive::{CadEntity, GraphicPrimitive};
use tracing::debug;

/// Outcome of stitching: closed contours and open runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchResult {
    pub closed: Vec<Path>,
    pub open: Vec<Path>,
}

impl StitchResult {
    pub fn len(&self) -> usize {
        self.closed.len() + self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.open.is_empty()
    }

    /// All paths, closed first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.closed.iter().chain(self.open.iter())
    }
}

/// Stitch CAD entities into paths.
///
/// Polylines are decomposed and kept together as seed paths. Every other
/// entity is dropped when it duplicates a primitive already kept, either
/// standalone or inside a polyline seed.
pub fn stitch(entities: &[CadEntity], error_range: f64) -> StitchResult {
    let mut seeds: Vec<Path> = Vec::new();

    for entity in entities.iter().filter(|e| e.is_polyline()) {
        let Some(path) = Path::from_primitives(entity.decompose(), error_range) else {
            continue;
        };
        if seeds.iter().any(|kept| kept.is_equal_to(&path, error_range)) {
            continue;
        }
        seeds.push(path);
    }

    for entity in entities.iter().filter(|e| !e.is_polyline()) {
        for primitive in entity.decompose() {
            push_unique(&mut seeds, primitive, error_range);
        }
    }

    merge_and_classify(seeds)
}

/// Stitch primitives that have already been adapted.
pub fn stitch_primitives(primitives: &[GraphicPrimitive], error_range: f64) -> StitchResult {
    let mut seeds: Vec<Path> = Vec::new();
    for primitive in primitives {
        push_unique(&mut seeds, *primitive, error_range);
    }
    merge_and_classify(seeds)
}

fn push_unique(seeds: &mut Vec<Path>, primitive: GraphicPrimitive, error_range: f64) {
    if seeds.iter().any(|kept| kept.contains(&primitive, error_range)) {
        return;
    }
    seeds.push(Path::new(primitive, error_range));
}

fn merge_and_classify(seeds: Vec<Path>) -> StitchResult {
    let seed_count = seeds.len();
    let mut paths = seeds;
    let mut passes = 0usize;

    loop {
        passes += 1;
        let before = paths.len();
        let mut slots: Vec<Option<Path>> = paths.into_iter().map(Some).collect();
        let mut remaining = Vec::with_capacity(before);

        for i in 0..slots.len() {
            let Some(mergee) = slots[i].take() else {
                continue;
            };
            let merged = slots[i + 1..]
                .iter_mut()
                .flatten()
                .any(|target| target.merge(&mergee));
            if !merged {
                remaining.push(mergee);
            }
        }

        paths = remaining;
        if paths.len() == before {
            break;
        }
    }

    let (closed, open): (Vec<Path>, Vec<Path>) = paths.into_iter().partition(Path::is_closed);
    debug!(
        seeds = seed_count,
        passes,
        closed = closed.len(),
        open = open.len(),
        "Stitched paths"
    );
    StitchResult { closed, open }
}
