//! Half-edge mesh data structure.
//!
//! This module provides the polygon-mesh container shared by the skeleton
//! mesh and the joint collar mesh: arenas of vertices, half-edges, and faces
//! addressed by typed ids, with an explicit **twin** reference per half-edge
//! and a directed-edge map for O(1) face lookup.
//!
//! # Structure
//!
//! - Each undirected edge is split into two **half-edges** pointing in
//!   opposite directions; each half-edge knows its twin, its origin vertex,
//!   and the face it bounds (if any)
//! - Faces store their ordered vertex loop and may have arbitrary arity:
//!   the skeleton emits quads, the dome cap emits triangles
//! - Edges may exist without faces: the skeleton copies its branch structure
//!   into the mesh before any face is registered
//!
//! No manifoldness validation is performed here; callers are responsible for
//! supplying consistent windings.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{Result, SkeletonError};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Outgoing half-edges from this vertex, in insertion order.
    pub(crate) outgoing: Vec<HalfEdgeId>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            outgoing: Vec::new(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// The vertex this half-edge originates from.
    pub origin: VertexId,

    /// The opposite half-edge (pointing in the reverse direction).
    pub twin: HalfEdgeId,

    /// The face this half-edge bounds.
    /// Invalid while no face has been registered on this side of the edge.
    pub face: FaceId,
}

impl HalfEdge {
    fn new(origin: VertexId, twin: HalfEdgeId) -> Self {
        Self {
            origin,
            twin,
            face: FaceId::invalid(),
        }
    }
}

/// A face in the half-edge mesh: an ordered loop of vertex keys.
#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) vertices: Vec<VertexId>,
}

impl Face {
    /// The ordered vertex loop of this face.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Number of vertices in this face.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the face has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// A half-edge mesh for polygon faces of arbitrary arity.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    vertices: Vec<Vertex>,
    halfedges: Vec<HalfEdge>,
    faces: Vec<Face>,
    /// Directed edge (origin, destination) to half-edge lookup.
    edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,
}

impl HalfEdgeMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    /// Get the ordered vertex loop of a face.
    #[inline]
    pub fn face_vertices(&self, id: FaceId) -> &[VertexId] {
        &self.faces[id.index()].vertices
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, pos: Point3<f64>) {
        self.vertices[v.index()].position = pos;
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    /// Add an undirected edge between two vertices.
    ///
    /// Creates a twin pair of face-less half-edges. Returns the existing pair
    /// if the edge is already present. The forward half-edge (`u` to `v`)
    /// comes first in the returned tuple.
    pub fn add_edge(&mut self, u: VertexId, v: VertexId) -> (HalfEdgeId, HalfEdgeId) {
        if let Some(&he) = self.edge_map.get(&(u, v)) {
            return (he, self.halfedges[he.index()].twin);
        }

        let he_uv = HalfEdgeId::new(self.halfedges.len());
        let he_vu = HalfEdgeId::new(self.halfedges.len() + 1);

        self.halfedges.push(HalfEdge::new(u, he_vu));
        self.halfedges.push(HalfEdge::new(v, he_uv));

        self.edge_map.insert((u, v), he_uv);
        self.edge_map.insert((v, u), he_vu);

        self.vertices[u.index()].outgoing.push(he_uv);
        self.vertices[v.index()].outgoing.push(he_vu);

        (he_uv, he_vu)
    }

    /// Add a face from an ordered vertex loop.
    ///
    /// Missing edges along the loop are created on the fly; each forward
    /// half-edge of the loop is pointed at the new face. Windings are taken
    /// as given.
    pub fn add_face(&mut self, loop_vertices: &[VertexId]) -> FaceId {
        let fid = FaceId::new(self.faces.len());
        self.faces.push(Face {
            vertices: loop_vertices.to_vec(),
        });

        let n = loop_vertices.len();
        for i in 0..n {
            let u = loop_vertices[i];
            let v = loop_vertices[(i + 1) % n];
            let (he, _) = self.add_edge(u, v);
            self.halfedges[he.index()].face = fid;
        }

        fid
    }

    // ==================== Topology Queries ====================

    /// Get the half-edge from `u` to `v`, if the edge exists.
    #[inline]
    pub fn halfedge_id(&self, u: VertexId, v: VertexId) -> Option<HalfEdgeId> {
        self.edge_map.get(&(u, v)).copied()
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId) -> VertexId {
        let twin = self.halfedges[he.index()].twin;
        self.halfedges[twin.index()].origin
    }

    /// Get the face on the left of the directed edge `u` to `v`, if any.
    pub fn halfedge_face(&self, u: VertexId, v: VertexId) -> Option<FaceId> {
        let he = self.halfedge_id(u, v)?;
        let face = self.halfedges[he.index()].face;
        face.is_valid().then_some(face)
    }

    /// Get the face on the left of the directed edge `u` to `v`, failing if
    /// the edge is unknown or carries no face.
    pub fn require_halfedge_face(&self, u: VertexId, v: VertexId) -> Result<FaceId> {
        self.halfedge_face(u, v)
            .ok_or(SkeletonError::MissingHalfEdgeFace { from: u, to: v })
    }

    /// Get the vertex following `v` in the ordered loop of face `f`.
    pub fn face_vertex_after(&self, f: FaceId, v: VertexId) -> Result<VertexId> {
        let loop_vertices = &self.faces[f.index()].vertices;
        let i = loop_vertices
            .iter()
            .position(|&x| x == v)
            .ok_or(SkeletonError::VertexNotInFace { face: f, vertex: v })?;
        Ok(loop_vertices[(i + 1) % loop_vertices.len()])
    }

    /// Compute the degree (number of neighbors) of a vertex.
    #[inline]
    pub fn vertex_degree(&self, v: VertexId) -> usize {
        self.vertices[v.index()].outgoing.len()
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all faces with their IDs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceId::new(i), f))
    }

    /// Iterate over undirected edges, each reported once in insertion order
    /// with its first-inserted direction.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .filter(|(i, he)| *i < he.twin.index())
            .map(|(i, he)| (he.origin, self.dest(HalfEdgeId::new(i))))
    }

    /// Iterate over vertices adjacent to a vertex, in edge insertion order.
    pub fn vertex_neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices[v.index()]
            .outgoing
            .iter()
            .map(|&he| self.dest(he))
    }

    /// The neighbors of a vertex in cyclic order, derived by walking the
    /// incident faces.
    ///
    /// Starts from a face-less (boundary) neighbor when one exists so that an
    /// open fan is walked end to end; a closed fan cycles fully. Fails when a
    /// face loop is inconsistent with the edge structure.
    pub fn vertex_neighbors_ordered(&self, v: VertexId) -> Result<Vec<VertexId>> {
        let nbrs: Vec<VertexId> = self.vertex_neighbors(v).collect();
        if nbrs.len() <= 1 {
            return Ok(nbrs);
        }

        let mut start = nbrs[0];
        for &nbr in &nbrs {
            if self.halfedge_face(v, nbr).is_none() {
                start = nbr;
                break;
            }
        }

        let mut ordered = vec![start];
        let mut face = self.halfedge_face(start, v);
        while let Some(f) = face {
            let nbr = self.face_vertex_after(f, v)?;
            if nbr == start || ordered.len() == nbrs.len() {
                break;
            }
            ordered.push(nbr);
            face = self.halfedge_face(nbr, v);
        }

        Ok(ordered)
    }

    // ==================== Geometry ====================

    /// Compute the edge vector from `u` to `v`.
    #[inline]
    pub fn edge_vector(&self, u: VertexId, v: VertexId) -> Vector3<f64> {
        self.position(v) - self.position(u)
    }

    /// Compute the length of the edge from `u` to `v`.
    #[inline]
    pub fn edge_length(&self, u: VertexId, v: VertexId) -> f64 {
        self.edge_vector(u, v).norm()
    }

    /// Compute the midpoint of the edge from `u` to `v`.
    pub fn edge_midpoint(&self, u: VertexId, v: VertexId) -> Point3<f64> {
        Point3::from((self.position(u).coords + self.position(v).coords) * 0.5)
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let loop_vertices = &self.faces[f.index()].vertices;
        let sum: Vector3<f64> = loop_vertices
            .iter()
            .map(|&v| self.position(v).coords)
            .sum();
        Point3::from(sum / loop_vertices.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> HalfEdgeMesh {
        let mut mesh = HalfEdgeMesh::new();
        let v: Vec<VertexId> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|p| mesh.add_vertex(p))
        .collect();
        mesh.add_face(&v);
        mesh
    }

    fn tetrahedron() -> HalfEdgeMesh {
        let mut mesh = HalfEdgeMesh::new();
        let v: Vec<VertexId> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ]
        .into_iter()
        .map(|p| mesh.add_vertex(p))
        .collect();
        for f in [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]] {
            mesh.add_face(&[v[f[0]], v[f[1]], v[f[2]]]);
        }
        mesh
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
    }

    #[test]
    fn test_single_quad() {
        let mesh = quad_mesh();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_edges(), 4);

        let f = FaceId::new(0);
        assert_eq!(mesh.face(f).len(), 4);
        assert_eq!(
            mesh.halfedge_face(VertexId::new(0), VertexId::new(1)),
            Some(f)
        );
        // The reverse halfedge carries no face
        assert_eq!(mesh.halfedge_face(VertexId::new(1), VertexId::new(0)), None);
    }

    #[test]
    fn test_faceless_edges() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::origin());
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let (he_ab, he_ba) = mesh.add_edge(a, b);

        assert_eq!(mesh.halfedge(he_ab).twin, he_ba);
        assert_eq!(mesh.dest(he_ab), b);
        assert_eq!(mesh.halfedge_face(a, b), None);
        assert!(mesh.require_halfedge_face(a, b).is_err());

        // Adding the same edge again returns the existing pair
        assert_eq!(mesh.add_edge(a, b), (he_ab, he_ba));
        assert_eq!(mesh.num_halfedges(), 2);
    }

    #[test]
    fn test_edge_shared_by_two_faces() {
        let mut mesh = HalfEdgeMesh::new();
        let v: Vec<VertexId> = (0..4)
            .map(|i| mesh.add_vertex(Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let f0 = mesh.add_face(&[v[0], v[1], v[2]]);
        let f1 = mesh.add_face(&[v[1], v[0], v[3]]);

        assert_eq!(mesh.halfedge_face(v[0], v[1]), Some(f0));
        assert_eq!(mesh.halfedge_face(v[1], v[0]), Some(f1));
        assert_eq!(mesh.num_edges(), 5);
    }

    #[test]
    fn test_ordered_neighbors_closed_fan() {
        let mesh = tetrahedron();

        // Every vertex of a tetrahedron has a closed ring of 3 neighbors
        for v in mesh.vertex_ids() {
            let ordered = mesh.vertex_neighbors_ordered(v).unwrap();
            assert_eq!(ordered.len(), 3);
        }

        // The ring around vertex 3 follows the face windings: after any
        // neighbor a, the next is the vertex following 3 in face (a -> 3)
        let apex = VertexId::new(3);
        let ordered = mesh.vertex_neighbors_ordered(apex).unwrap();
        for pair in ordered.windows(2) {
            let f = mesh.halfedge_face(pair[0], apex).unwrap();
            assert_eq!(mesh.face_vertex_after(f, apex).unwrap(), pair[1]);
        }
    }

    #[test]
    fn test_edges_iteration() {
        let mesh = tetrahedron();
        let edges: Vec<_> = mesh.edges().collect();
        assert_eq!(edges.len(), 6);

        // Every edge of the closed tetrahedron bounds two faces
        for (u, v) in edges {
            assert!(mesh.halfedge_face(u, v).is_some());
            assert!(mesh.halfedge_face(v, u).is_some());
        }
    }

    #[test]
    fn test_face_vertex_after() {
        let mesh = quad_mesh();
        let f = FaceId::new(0);
        assert_eq!(
            mesh.face_vertex_after(f, VertexId::new(3)).unwrap(),
            VertexId::new(0)
        );
        assert!(matches!(
            mesh.face_vertex_after(f, VertexId::invalid()),
            Err(SkeletonError::VertexNotInFace { .. })
        ));
    }

    #[test]
    fn test_geometry_helpers() {
        let mesh = quad_mesh();
        let (a, b) = (VertexId::new(0), VertexId::new(1));
        assert!((mesh.edge_length(a, b) - 1.0).abs() < 1e-10);
        assert!((mesh.edge_midpoint(a, b) - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-10);

        let centroid = mesh.face_centroid(FaceId::new(0));
        assert!((centroid - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-10);
    }
}
