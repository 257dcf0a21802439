//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use topomap::creation::{MakeFace, MakeWire};
use topomap::math::{Point2, Point3};
use topomap::mesh::{FaceMesh, MeshNode, NodeId};
use topomap::topology::{
    EdgeData, EdgeId, FaceData, FaceId, OrientedEdge, Shape, ShapeType, TopologyStore, VertexData,
    VertexId, WireData,
};
use topomap::ShapeGraph;

pub fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

/// A planar polygonal face through `points`.
pub fn polygon(store: &mut TopologyStore, points: Vec<Point3>) -> FaceId {
    let wire = MakeWire::new(points, true).execute(store).unwrap();
    MakeFace::new(wire, vec![]).execute(store).unwrap()
}

/// An axis-aligned square of side `size` with its lower left corner at `(x, y)`.
pub fn square(store: &mut TopologyStore, x: f64, y: f64, size: f64) -> FaceId {
    polygon(
        store,
        vec![
            p(x, y, 0.0),
            p(x + size, y, 0.0),
            p(x + size, y + size, 0.0),
            p(x, y + size, 0.0),
        ],
    )
}

/// Start vertices of the outer wire's edges, in wire order.
pub fn corners(store: &TopologyStore, face: FaceId) -> Vec<VertexId> {
    store
        .outer_edges(face)
        .unwrap()
        .into_iter()
        .map(|oe| store.first_vertex(oe).unwrap())
        .collect()
}

/// Edges of the outer wire, in wire order.
pub fn outer_edges(store: &TopologyStore, face: FaceId) -> Vec<EdgeId> {
    store
        .outer_edges(face)
        .unwrap()
        .into_iter()
        .map(|oe| oe.edge)
        .collect()
}

pub fn count(store: &TopologyStore, shape: Shape, ty: ShapeType) -> usize {
    store.count(shape, ty).unwrap()
}

/// A closed circular edge on a single vertex, as bounds a cylinder cap.
pub fn circle(store: &mut TopologyStore, at: Point3) -> EdgeId {
    let v = store.add_vertex(VertexData::new(at));
    store.add_edge(EdgeData::new(v, v)).unwrap()
}

/// Topology of a sphere face: poles, a seam between them and a
/// degenerate edge on each pole.
pub struct Sphere {
    pub face: FaceId,
    pub south: VertexId,
    pub north: VertexId,
    pub seam: EdgeId,
    pub south_pole: EdgeId,
    pub north_pole: EdgeId,
    /// The seam runs north to south.
    pub seam_down: bool,
}

/// A sphere whose seam runs south to north.
pub fn sphere(store: &mut TopologyStore, radius: f64) -> Sphere {
    sphere_with_seam(store, radius, false)
}

/// A sphere whose seam runs south to north, or north to south when
/// `seam_down`. The wire follows the seam forwards first either way.
pub fn sphere_with_seam(store: &mut TopologyStore, radius: f64, seam_down: bool) -> Sphere {
    let south = store.add_vertex(VertexData::new(p(0.0, 0.0, -radius)));
    let north = store.add_vertex(VertexData::new(p(0.0, 0.0, radius)));
    let seam = if seam_down {
        store.add_edge(EdgeData::new(north, south)).unwrap()
    } else {
        store.add_edge(EdgeData::new(south, north)).unwrap()
    };
    let north_pole = store.add_edge(EdgeData::new(north, north)).unwrap();
    let south_pole = store.add_edge(EdgeData::new(south, south)).unwrap();
    let (far_pole, near_pole) = if seam_down {
        (south_pole, north_pole)
    } else {
        (north_pole, south_pole)
    };
    let wire = store
        .add_wire(WireData {
            edges: vec![
                OrientedEdge::new(seam, true),
                OrientedEdge::new(far_pole, true),
                OrientedEdge::new(seam, false),
                OrientedEdge::new(near_pole, true),
            ],
            is_closed: true,
        })
        .unwrap();
    let face = store
        .add_face(FaceData {
            outer_wire: wire,
            inner_wires: vec![],
        })
        .unwrap();
    Sphere {
        face,
        south,
        north,
        seam,
        south_pole,
        north_pole,
        seam_down,
    }
}

/// A UV mesh of a sphere face: `columns` nodes around each of `rings`
/// latitude rings, quads between rings and triangle fans at the poles.
///
/// Column 0 lies on the seam. When `shuffled`, nodes and elements are
/// inserted in reverse order and element cycles start elsewhere.
pub fn sphere_mesh(sphere: &Sphere, columns: usize, rings: usize, shuffled: bool) -> FaceMesh {
    sphere_grid(sphere, columns, rings, shuffled).0
}

/// [`sphere_mesh`] together with the node ids of the grid, indexed by
/// column then ring. Ring 0 is unused.
pub fn sphere_grid(
    sphere: &Sphere,
    columns: usize,
    rings: usize,
    shuffled: bool,
) -> (FaceMesh, Vec<Vec<NodeId>>) {
    #[allow(clippy::cast_precision_loss)]
    let frac = |k: usize, n: usize| k as f64 / n as f64;
    let mut nodes: Vec<(usize, usize, MeshNode)> = Vec::new();
    for j in 1..=rings {
        let v = frac(j, rings + 1);
        for i in 0..columns {
            let uv = Point2::new(frac(i, columns), v);
            let node = if i == 0 {
                let u = if sphere.seam_down { 1.0 - v } else { v };
                MeshNode::on_edge(sphere.seam, u, uv)
            } else {
                MeshNode::inside(uv)
            };
            nodes.push((i, j, node));
        }
    }
    if shuffled {
        nodes.reverse();
    }

    let mut mesh = FaceMesh::new();
    let south = mesh.add_node(MeshNode::on_vertex(sphere.south, Point2::new(0.0, 0.0)));
    let mut ids = vec![vec![NodeId::default(); rings + 1]; columns];
    for (i, j, node) in nodes {
        ids[i][j] = mesh.add_node(node);
    }
    let north = mesh.add_node(MeshNode::on_vertex(sphere.north, Point2::new(0.0, 1.0)));

    let mut elements = Vec::new();
    for i in 0..columns {
        let next = (i + 1) % columns;
        elements.push(vec![south, ids[next][1], ids[i][1]]);
        for j in 1..rings {
            elements.push(vec![ids[i][j], ids[next][j], ids[next][j + 1], ids[i][j + 1]]);
        }
        elements.push(vec![north, ids[i][rings], ids[next][rings]]);
    }
    if shuffled {
        elements.reverse();
    }
    for mut cycle in elements {
        if shuffled {
            cycle.rotate_left(1);
        }
        mesh.add_element(cycle).unwrap();
    }
    (mesh, ids)
}
