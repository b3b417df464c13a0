//! Joint collar meshes.
//!
//! A [`JointCollar`] connects the branch pipes converging at a single joint
//! into a smooth quad socket. The leaf positions of a one-joint sub-network
//! are run through the convex hull; the hull's halfedge adjacency is copied
//! into a *descendent tree* that records, per directed hull edge, two
//! generated collar vertices:
//!
//! - `jp` (*joint point*): one per hull face, shared by all three of its
//!   halfedges, placed along the face's equal-angle direction from the joint
//! - `lp` (*leaf point*): one per directed hull edge, placed around the
//!   hull vertex toward the neighboring face's `jp`
//!
//! Walking each hull vertex's ordered neighbor ring then emits one quad per
//! consecutive neighbor pair. The collar is rebuilt wholesale whenever the
//! underlying joint moves; the descendent tree is never patched
//! incrementally.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::error::{Result, SkeletonError};
use crate::hull::convex_hull_mesh;
use crate::mesh::{HalfEdgeMesh, VertexId};
use crate::network::{Network, NodeId};

const DEGENERACY_EPSILON: f64 = 1e-9;

/// Options for building a joint collar.
#[derive(Debug, Clone)]
pub struct CollarOptions {
    /// Distance from the joint center to each face's `jp` vertex.
    pub joint_width: f64,

    /// Distance from each hull vertex to its `lp` vertices.
    pub leaf_width: f64,
}

impl CollarOptions {
    /// Create options with the given joint and leaf widths.
    pub fn new(joint_width: f64, leaf_width: f64) -> Self {
        Self {
            joint_width,
            leaf_width,
        }
    }

    /// Set the joint width.
    pub fn with_joint_width(mut self, width: f64) -> Self {
        self.joint_width = width;
        self
    }

    /// Set the leaf width.
    pub fn with_leaf_width(mut self, width: f64) -> Self {
        self.leaf_width = width;
        self
    }
}

impl Default for CollarOptions {
    fn default() -> Self {
        Self {
            joint_width: 1.0,
            leaf_width: 1.0,
        }
    }
}

/// Generated vertex keys attached to one directed hull halfedge.
#[derive(Debug, Clone, Copy, Default)]
struct Descendent {
    jp: Option<VertexId>,
    lp: Option<VertexId>,
}

/// A quad collar socket around one joint.
#[derive(Debug, Clone)]
pub struct JointCollar {
    mesh: HalfEdgeMesh,
    hull: HalfEdgeMesh,
    /// Hull mesh vertex index to the network leaf it came from.
    hull_leaves: Vec<NodeId>,
    descendents: HashMap<(VertexId, VertexId), Descendent>,
    joint_width: f64,
    leaf_width: f64,
}

impl JointCollar {
    /// Build the collar for a sub-network with exactly one joint.
    ///
    /// # Errors
    ///
    /// Fails with [`SkeletonError::NotSingleJoint`] unless the sub-network
    /// has exactly one joint, and with
    /// [`SkeletonError::NonTriangularHullFace`] when the hull is not
    /// triangulated. Geometric degeneracies (a leaf at the joint center, a
    /// collapsed equal-angle direction) abort the whole build, since
    /// downstream indices would be invalid if a face were skipped.
    pub fn build(network: &Network, options: &CollarOptions) -> Result<Self> {
        let mut joints = Vec::new();
        let mut leaves = Vec::new();
        for n in network.nodes() {
            if network.is_leaf(n) {
                leaves.push(n);
            } else {
                joints.push(n);
            }
        }
        if joints.len() != 1 {
            return Err(SkeletonError::NotSingleJoint {
                joints: joints.len(),
            });
        }
        let center = network.position(joints[0]);

        let points: Vec<Point3<f64>> = leaves.iter().map(|&n| network.position(n)).collect();
        let (hull, used) = convex_hull_mesh(&points, &[])?;
        let hull_leaves: Vec<NodeId> = used.iter().map(|&i| leaves[i]).collect();

        let mut collar = Self {
            mesh: HalfEdgeMesh::new(),
            hull,
            hull_leaves,
            descendents: HashMap::new(),
            joint_width: options.joint_width,
            leaf_width: options.leaf_width,
        };

        collar.init_descendent_tree();
        collar.add_joint_vertices()?;
        collar.add_leaf_vertices()?;
        collar.add_collar_faces()?;
        collar.update_vertex_positions(center)?;

        Ok(collar)
    }

    /// The collar quad mesh.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// The convex hull mesh over the leaf positions.
    #[inline]
    pub fn hull(&self) -> &HalfEdgeMesh {
        &self.hull
    }

    /// The network leaf a hull vertex came from.
    #[inline]
    pub fn hull_leaf(&self, v: VertexId) -> NodeId {
        self.hull_leaves[v.index()]
    }

    /// The `jp` collar vertex of a directed hull halfedge, if assigned.
    pub fn jp(&self, u: VertexId, v: VertexId) -> Option<VertexId> {
        self.descendents.get(&(u, v)).and_then(|d| d.jp)
    }

    /// The `lp` collar vertex of a directed hull halfedge, if assigned.
    pub fn lp(&self, u: VertexId, v: VertexId) -> Option<VertexId> {
        self.descendents.get(&(u, v)).and_then(|d| d.lp)
    }

    /// The joint width the collar was built with.
    #[inline]
    pub fn joint_width(&self) -> f64 {
        self.joint_width
    }

    /// The leaf width the collar was built with.
    #[inline]
    pub fn leaf_width(&self) -> f64 {
        self.leaf_width
    }

    /// Copy the hull's halfedge adjacency with unset `jp`/`lp` records.
    fn init_descendent_tree(&mut self) {
        for (u, v) in self.hull.edges() {
            self.descendents.insert((u, v), Descendent::default());
            self.descendents.insert((v, u), Descendent::default());
        }
    }

    /// Allocate one `jp` vertex per hull face, shared by its halfedges.
    fn add_joint_vertices(&mut self) -> Result<()> {
        for f in self.hull.face_ids().collect::<Vec<_>>() {
            let face = self.hull.face_vertices(f).to_vec();
            if face.len() != 3 {
                return Err(SkeletonError::NonTriangularHullFace {
                    face: f.index(),
                    len: face.len(),
                });
            }

            let key = self.mesh.add_vertex(Point3::origin());
            for i in 0..face.len() {
                let u = face[i];
                let v = face[(i + 1) % face.len()];
                self.descendent_mut(u, v)?.jp = Some(key);
            }
        }
        Ok(())
    }

    /// Allocate one `lp` vertex per directed hull halfedge.
    fn add_leaf_vertices(&mut self) -> Result<()> {
        for v in self.hull.vertex_ids().collect::<Vec<_>>() {
            let nbrs: Vec<VertexId> = self.hull.vertex_neighbors(v).collect();
            for nbr in nbrs {
                let key = self.mesh.add_vertex(Point3::origin());
                self.descendent_mut(v, nbr)?.lp = Some(key);
            }
        }
        Ok(())
    }

    /// Emit one quad per consecutive pair in each hull vertex's ordered ring.
    fn add_collar_faces(&mut self) -> Result<()> {
        for key in self.hull.vertex_ids().collect::<Vec<_>>() {
            let ring = self.hull.vertex_neighbors_ordered(key)?;
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                let face = [
                    self.require_lp(key, a)?,
                    self.require_jp(key, a)?,
                    self.require_jp(key, b)?,
                    self.require_lp(key, b)?,
                ];
                self.mesh.add_face(&face);
            }
        }
        Ok(())
    }

    /// Place every `jp` and `lp` vertex around the joint center.
    fn update_vertex_positions(&mut self, center: Point3<f64>) -> Result<()> {
        // jp: along each face's equal-angle direction from the center
        for f in self.hull.face_ids().collect::<Vec<_>>() {
            let face = self.hull.face_vertices(f).to_vec();
            let mut directions = [Vector3::zeros(); 3];
            for (direction, &v) in directions.iter_mut().zip(&face) {
                let dir = self.hull.position(v) - center;
                if dir.norm() < DEGENERACY_EPSILON {
                    return Err(SkeletonError::Degeneracy {
                        details: format!("hull vertex {:?} coincides with the joint center", v),
                    });
                }
                *direction = dir.normalize();
            }

            let equal_angle = equal_angle_vector(&directions)?;
            let pt = center + equal_angle * self.joint_width;

            let key = self.require_jp(face[0], face[1])?;
            self.mesh.set_position(key, pt);
        }

        // lp: around each hull vertex, toward the neighboring face's jp
        // projected onto the plane perpendicular to the vertex's direction
        for v in self.hull.vertex_ids().collect::<Vec<_>>() {
            let pt_leaf = *self.hull.position(v);
            let axis = pt_leaf - center;

            let nbrs: Vec<VertexId> = self.hull.vertex_neighbors(v).collect();
            for nbr in nbrs {
                let jp = self.require_jp(v, nbr)?;
                let pt_joint = *self.mesh.position(jp);

                let projected = project_point_plane(pt_joint, pt_leaf, axis);
                let toward = projected - pt_leaf;
                if toward.norm() < DEGENERACY_EPSILON {
                    return Err(SkeletonError::Degeneracy {
                        details: format!(
                            "joint point of halfedge ({:?}, {:?}) projects onto its own leaf",
                            v, nbr
                        ),
                    });
                }
                let pt = pt_leaf + toward.normalize() * self.leaf_width;

                let key = self.require_lp(v, nbr)?;
                self.mesh.set_position(key, pt);
            }
        }

        Ok(())
    }

    fn descendent_mut(&mut self, u: VertexId, v: VertexId) -> Result<&mut Descendent> {
        self.descendents
            .get_mut(&(u, v))
            .ok_or(SkeletonError::MissingDescendent { from: u, to: v })
    }

    fn require_jp(&self, u: VertexId, v: VertexId) -> Result<VertexId> {
        self.jp(u, v)
            .ok_or(SkeletonError::MissingDescendent { from: u, to: v })
    }

    fn require_lp(&self, u: VertexId, v: VertexId) -> Result<VertexId> {
        self.lp(u, v)
            .ok_or(SkeletonError::MissingDescendent { from: u, to: v })
    }
}

/// The direction equally inclined to three unit directions: the cross
/// product of their two consecutive pairwise differences, unitized.
fn equal_angle_vector(directions: &[Vector3<f64>; 3]) -> Result<Vector3<f64>> {
    let first = directions[1] - directions[0];
    let second = directions[2] - directions[1];
    let cross = first.cross(&second);
    if cross.norm() < DEGENERACY_EPSILON {
        return Err(SkeletonError::Degeneracy {
            details: "equal-angle direction collapsed: face directions are degenerate".to_string(),
        });
    }
    Ok(cross.normalize())
}

/// Project a point onto the plane through `origin` with the given normal.
fn project_point_plane(
    point: Point3<f64>,
    origin: Point3<f64>,
    normal: Vector3<f64>,
) -> Point3<f64> {
    let n = normal.normalize();
    point - n * (point - origin).dot(&n)
}
