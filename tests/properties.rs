//! Property-based tests for association invariants using the `proptest` crate.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;

use common::{corners, p, polygon, square};
use topomap::association::{find_face_association, find_propagation, Direction};
use topomap::creation::Extrude;
use topomap::math::Vector3;
use topomap::topology::{FaceId, Shape, ShapeType, TopologyStore};
use topomap::{Associate, AssociationMap, ShapeGraph};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_offset() -> impl Strategy<Value = (f64, f64)> {
    (-50.0f64..50.0, -50.0f64..50.0)
}

fn arb_scale() -> impl Strategy<Value = f64> {
    0.5f64..3.0
}

/// An irregular quadrilateral and a scaled, translated copy of it.
fn quad_pair(store: &mut TopologyStore, (dx, dy): (f64, f64), scale: f64) -> (FaceId, FaceId) {
    let outline = [(0.0, 0.0), (2.0, 0.0), (2.5, 1.0), (0.0, 1.5)];
    let first = polygon(store, outline.iter().map(|&(x, y)| p(x, y, 0.0)).collect());
    let second = polygon(
        store,
        outline
            .iter()
            .map(|&(x, y)| p(x * scale + dx + 10.0, y * scale + dy, 0.0))
            .collect(),
    );
    (first, second)
}

fn associate(store: &TopologyStore, a: FaceId, b: FaceId) -> AssociationMap {
    let mut map = AssociationMap::new();
    Associate::new(Shape::Face(a), Shape::Face(b))
        .execute(store, store, &mut map)
        .unwrap();
    map
}

// ---------------------------------------------------------------------------
// 1. Determinism: repeated runs yield identical maps
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn association_is_deterministic(offset in arb_offset(), scale in arb_scale()) {
        let mut store = TopologyStore::new();
        let (a, b) = quad_pair(&mut store, offset, scale);
        let first = associate(&store, a, b);
        let second = associate(&store, a, b);
        prop_assert_eq!(first, second);
    }
}

// ---------------------------------------------------------------------------
// 2. Map invariants: symmetry, type preservation and vertex closure
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn bound_pairs_are_symmetric_and_closed(offset in arb_offset(), scale in arb_scale()) {
        let mut store = TopologyStore::new();
        let (a, b) = quad_pair(&mut store, offset, scale);
        let map = associate(&store, a, b);
        prop_assert_eq!(map.len(), 9);

        for (key, value) in map.iter() {
            prop_assert_eq!(key.shape_type(), value.shape_type());
            prop_assert_eq!(map.get_in(Direction::Backward, value), Some(key));

            if let (Shape::Edge(e1), Shape::Edge(e2)) = (key, value) {
                let (s1, t1) = store.edge_vertices(e1).unwrap();
                let (s2, t2) = store.edge_vertices(e2).unwrap();
                let images: BTreeSet<Shape> = [s1, t1]
                    .into_iter()
                    .filter_map(|v| map.get(Shape::Vertex(v)))
                    .collect();
                let ends: BTreeSet<Shape> =
                    [Shape::Vertex(s2), Shape::Vertex(t2)].into_iter().collect();
                prop_assert_eq!(images, ends);
            }
        }
    }
}

proptest! {
    #[test]
    fn scaled_copies_match_corner_for_corner(offset in arb_offset(), scale in arb_scale()) {
        let mut store = TopologyStore::new();
        let (a, b) = quad_pair(&mut store, offset, scale);
        let map = associate(&store, a, b);
        for (va, vb) in corners(&store, a).into_iter().zip(corners(&store, b)) {
            prop_assert_eq!(map.get(Shape::Vertex(va)), Some(Shape::Vertex(vb)));
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Count invariance: unequal vertex counts never associate
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unequal_vertex_counts_never_associate(sides in 3usize..8, extra in 1usize..3) {
        let mut store = TopologyStore::new();
        let ring = |n: usize, x: f64| -> Vec<_> {
            (0..n)
                .map(|k| {
                    #[allow(clippy::cast_precision_loss)]
                    let angle = std::f64::consts::TAU * k as f64 / n as f64;
                    p(x + angle.cos(), angle.sin(), 0.0)
                })
                .collect()
        };
        let a = polygon(&mut store, ring(sides, 0.0));
        let b = polygon(&mut store, ring(sides + extra, 5.0));
        prop_assert_ne!(
            store.count(Shape::Face(a), ShapeType::Vertex).unwrap(),
            store.count(Shape::Face(b), ShapeType::Vertex).unwrap()
        );
        let mut map = AssociationMap::new();
        let result = Associate::new(Shape::Face(a), Shape::Face(b))
            .execute(&store, &store, &mut map);
        prop_assert!(result.is_err());
        prop_assert!(map.is_empty());
    }
}

// ---------------------------------------------------------------------------
// 4. Propagation across an N-layer wall
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn propagation_climbs_one_step_per_layer(layers in 1usize..6, side in 0usize..4) {
        let mut store = TopologyStore::new();
        let base = square(&mut store, 0.0, 0.0, 4.0);
        let prism = Extrude::new(base, Vector3::new(0.0, 0.0, 4.0))
            .with_layers(layers)
            .execute(&mut store)
            .unwrap();
        let seed = prism.rings[0][side];
        let target = prism.rings[layers][side];
        let found = find_propagation(&store, seed, target.edge).unwrap().unwrap();
        prop_assert_eq!(found.steps, layers);
        prop_assert_eq!(found.edge, target);
    }
}

// ---------------------------------------------------------------------------
// 5. Face alignment does not depend on which anchor comes first
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn swapped_anchors_align_the_same_edges(start in 0usize..4, offset in arb_offset()) {
        let mut store = TopologyStore::new();
        let a = square(&mut store, 0.0, 0.0, 1.0);
        let b = square(&mut store, offset.0 + 5.0, offset.1, 1.0);
        let (ca, cb) = (corners(&store, a), corners(&store, b));
        let next = (start + 1) % 4;

        let ahead =
            find_face_association(&store, a, [ca[start], ca[next]], &store, b, [cb[start], cb[next]])
                .unwrap();
        let behind =
            find_face_association(&store, a, [ca[next], ca[start]], &store, b, [cb[next], cb[start]])
                .unwrap();

        let pairs = |alignment: &topomap::association::FaceAlignment| -> BTreeSet<_> {
            alignment
                .edges1
                .iter()
                .zip(&alignment.edges2)
                .map(|(e1, e2)| (e1.edge, e2.edge))
                .collect()
        };
        prop_assert_eq!(pairs(&ahead), pairs(&behind));
        prop_assert_eq!(ahead.reversed, behind.reversed);
    }
}
