//! Skeleton geometry updates.
//!
//! Recomputes boundary-vertex coordinates from the width parameters without
//! touching topology, and carries per-vertex edit offsets across skeleton
//! edits through local-frame reprojection.
//!
//! Offset directions live in the plane of the network where possible: a
//! joint-side boundary vertex offsets along the cross product of its two
//! adjacent branch edges, a leaf-side pair along the cross product of the
//! branch and the world up axis. Every computed base position is displaced
//! by the vertex's stored `transform` offset before being committed, so
//! accumulated local edits survive a global width change.

use nalgebra::{Point3, Vector3};

use crate::error::{Result, SkeletonError};
use crate::frame::Frame;
use crate::mesh::VertexId;

use super::{Skeleton, VertexRole};

/// Cross products below this length are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-3;

/// Directions below this length cannot be normalized.
const OFFSET_EPSILON: f64 = 1e-9;

/// Which side of a directed branch halfedge an offset leaves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Frames anchored at one end of a branch: a single frame at a leaf, a
/// left/right pair at a joint.
enum EndFrames {
    Leaf(Frame),
    Joint(Frame, Frame),
}

impl Skeleton {
    /// Recompute the coordinates of every boundary vertex in place.
    ///
    /// Call after changing a width parameter. Topology is not altered.
    pub fn update_mesh_vertices(&mut self) -> Result<()> {
        if self.mesh.num_vertices() == 0 {
            return Ok(());
        }
        if self.branches.is_empty() {
            return self.update_dome_boundary_vertices();
        }

        for i in 0..self.branches.len() {
            let (u, v) = self.branches[i];
            for (a, b) in [(u, v), (v, u)] {
                if self.role(a) == VertexRole::Node {
                    self.update_node_boundary_vertex(a, b)?;
                } else {
                    self.update_leaf_boundary_vertex(a, b)?;
                }
            }
        }
        Ok(())
    }

    /// Move a generated mesh vertex, accumulating the displacement into its
    /// `transform` offset so it survives later geometry updates.
    pub fn move_mesh_vertex(&mut self, key: VertexId, new_pos: Point3<f64>) {
        let delta = new_pos - self.mesh.position(key);
        self.transforms[key.index()] += delta;
        self.mesh.set_position(key, new_pos);
    }

    /// Move a skeleton node or leaf and update everything that hangs off it.
    ///
    /// For each incident branch the frames at both ends are captured before
    /// and after the displacement, and each dependent boundary vertex's
    /// stored offset is reprojected from the before-frame into the
    /// after-frame. A zero displacement leaves every offset unchanged. When
    /// the new position produces a degenerate frame the move is rolled back.
    pub fn move_skeleton_vertex(&mut self, key: VertexId, new_pos: Point3<f64>) -> Result<()> {
        if self.role(key) == VertexRole::Boundary {
            return Err(SkeletonError::NotSkeletonVertex { vertex: key });
        }

        if self.branches.is_empty() {
            // dome: the cap hangs off the world axes, no frames to carry
            self.mesh.set_position(key, new_pos);
            return self.update_mesh_vertices();
        }

        let ring = self
            .rings
            .get(&key)
            .ok_or(SkeletonError::MissingNeighborRing { vertex: key })?
            .clone();

        let mut before = Vec::with_capacity(ring.len());
        for &v in &ring {
            before.push((
                self.capture_end_frames(key, v)?,
                self.capture_end_frames(v, key)?,
            ));
        }

        let old_pos = *self.mesh.position(key);
        self.mesh.set_position(key, new_pos);

        let after: Result<Vec<_>> = ring
            .iter()
            .map(|&v| {
                Ok((
                    self.capture_end_frames(key, v)?,
                    self.capture_end_frames(v, key)?,
                ))
            })
            .collect();
        let after = match after {
            Ok(frames) => frames,
            Err(err) => {
                self.mesh.set_position(key, old_pos);
                return Err(err);
            }
        };

        for i in 0..ring.len() {
            let v = ring[i];
            let (near_before, far_before) = &before[i];
            let (near_after, far_after) = &after[i];
            self.remount_end(key, v, near_before, near_after)?;
            self.remount_end(v, key, far_before, far_after)?;
        }

        self.update_mesh_vertices()
    }

    // ==================== Boundary vertex placement ====================

    fn update_node_boundary_vertex(&mut self, u: VertexId, v: VertexId) -> Result<()> {
        let face = self.mesh.require_halfedge_face(u, v)?;
        let key = self.mesh.face_vertices(face)[3];

        let base = self.node_boundary_vertex_pos(u, v)?;
        let pos = base + self.transforms[key.index()];
        self.mesh.set_position(key, pos);
        Ok(())
    }

    fn update_leaf_boundary_vertex(&mut self, u: VertexId, v: VertexId) -> Result<()> {
        let face_out = self.mesh.require_halfedge_face(u, v)?;
        let face_in = self.mesh.require_halfedge_face(v, u)?;
        let key1 = self.mesh.face_vertices(face_out)[3];
        let key2 = self.mesh.face_vertices(face_in)[2];

        let (right, left) = self.leaf_boundary_vertex_pos(u, v)?;
        let pos1 = right + self.transforms[key1.index()];
        let pos2 = left + self.transforms[key2.index()];
        self.mesh.set_position(key1, pos1);
        self.mesh.set_position(key2, pos2);
        Ok(())
    }

    fn update_dome_boundary_vertices(&mut self) -> Result<()> {
        let frame = Frame::world_xy();
        let center = *self.mesh.position(VertexId::new(0));
        let x = frame.xaxis() * self.node_width();
        let y = frame.yaxis() * self.node_width();

        let pts = [center + x, center + y, center - x, center - y];
        for (i, pt) in pts.into_iter().enumerate() {
            let key = VertexId::new(i + 1);
            let pos = pt + self.transforms[key.index()];
            self.mesh.set_position(key, pos);
        }
        Ok(())
    }

    fn node_boundary_vertex_pos(&self, u: VertexId, v: VertexId) -> Result<Point3<f64>> {
        let offset = self.offset_from_branch(u, v, Side::Left)? * self.node_width();
        Ok(self.mesh.position(u) + offset)
    }

    fn leaf_boundary_vertex_pos(&self, u: VertexId, v: VertexId) -> Result<(Point3<f64>, Point3<f64>)> {
        let along = self.mesh.edge_vector(v, u);
        let offset = along.cross(&Vector3::z());
        if offset.norm() < PARALLEL_EPSILON {
            // the branch runs along the up axis; no sideways direction exists
            return Err(SkeletonError::DegenerateOffset { from: u, to: v });
        }
        let offset = offset.normalize() * self.leaf_width();
        let extension = along.normalize() * self.leaf_extend();

        let pt = *self.mesh.position(u);
        Ok((pt + offset + extension, pt - offset + extension))
    }

    /// Unit offset direction for the boundary vertex of halfedge `(u, v)` on
    /// the given side of the branch.
    fn offset_from_branch(&self, u: VertexId, v: VertexId, side: Side) -> Result<Vector3<f64>> {
        let wing = match side {
            Side::Left => self.find_previous_vertex(u, v)?,
            Side::Right => self.find_next_vertex(u, v)?,
        };

        let along = self.mesh.edge_vector(u, v);
        let incoming = self.mesh.edge_vector(wing, u);
        let normal = along.cross(&incoming);

        let offset = if normal.norm() < PARALLEL_EPSILON {
            // the two adjacent branches are parallel
            Vector3::z().cross(&along)
        } else {
            // aim at the local triangle's centroid; the sign of the normal's
            // z component flips the direction when the corner turns past 180
            // degrees
            let centroid = centroid(&[
                *self.mesh.position(wing),
                *self.mesh.position(u),
                *self.mesh.position(v),
            ]);
            (centroid - self.mesh.position(u)) * (-normal.z)
        };

        if offset.norm() < OFFSET_EPSILON {
            return Err(SkeletonError::DegenerateOffset { from: u, to: v });
        }
        let offset = offset.normalize();
        Ok(match side {
            Side::Left => offset,
            Side::Right => -offset,
        })
    }

    // ==================== Neighbor rings ====================

    /// The vertex preceding `v` in the cyclic neighbor ring of `u`.
    fn find_previous_vertex(&self, u: VertexId, v: VertexId) -> Result<VertexId> {
        let ring = self.require_ring(u)?;
        let i = ring
            .iter()
            .position(|&x| x == v)
            .ok_or(SkeletonError::MissingNeighborRing { vertex: u })?;
        Ok(ring[(i + 1) % ring.len()])
    }

    /// The vertex following `v` in the cyclic neighbor ring of `u`.
    fn find_next_vertex(&self, u: VertexId, v: VertexId) -> Result<VertexId> {
        let ring = self.require_ring(u)?;
        let i = ring
            .iter()
            .position(|&x| x == v)
            .ok_or(SkeletonError::MissingNeighborRing { vertex: u })?;
        Ok(ring[(i + ring.len() - 1) % ring.len()])
    }

    fn require_ring(&self, u: VertexId) -> Result<&[VertexId]> {
        self.rings
            .get(&u)
            .map(Vec::as_slice)
            .ok_or(SkeletonError::MissingNeighborRing { vertex: u })
    }

    // ==================== Frames ====================

    /// The branch direction arriving at a leaf, from its ring neighbor.
    fn vec_along_branch(&self, leaf: VertexId) -> Result<Vector3<f64>> {
        let anchor = self.require_ring(leaf)?[0];
        Ok(self.mesh.edge_vector(anchor, leaf))
    }

    /// The local frame of a leaf: anchored at the leaf, x along the branch.
    fn leaf_vertex_frame(&self, leaf: VertexId) -> Result<Frame> {
        let along = self.vec_along_branch(leaf)?;
        let perp = along.cross(&Vector3::z());
        Frame::new(*self.mesh.position(leaf), along, perp)
    }

    /// The left/right local frames of a joint for halfedge `(u, v)`:
    /// anchored at the joint, x along the side's offset direction.
    fn joint_halfedge_frames(&self, u: VertexId, v: VertexId) -> Result<(Frame, Frame)> {
        let pt = *self.mesh.position(u);

        let left = self.offset_from_branch(u, v, Side::Left)?;
        let frame_left = Frame::new(pt, left, left.cross(&Vector3::z()))?;

        let right = self.offset_from_branch(u, v, Side::Right)?;
        let frame_right = Frame::new(pt, right, right.cross(&Vector3::z()))?;

        Ok((frame_left, frame_right))
    }

    // ==================== Offset carry-over ====================

    /// The generated corners flanking `u` on branch `(u, v)`:
    /// `(sp(u, v), ep(v, u))`.
    fn branch_end_keys(&self, u: VertexId, v: VertexId) -> Result<(VertexId, VertexId)> {
        let face_out = self.mesh.require_halfedge_face(u, v)?;
        let face_in = self.mesh.require_halfedge_face(v, u)?;
        Ok((
            self.mesh.face_vertices(face_out)[3],
            self.mesh.face_vertices(face_in)[2],
        ))
    }

    fn capture_end_frames(&self, anchor: VertexId, other: VertexId) -> Result<EndFrames> {
        match self.role(anchor) {
            VertexRole::Leaf => Ok(EndFrames::Leaf(self.leaf_vertex_frame(anchor)?)),
            VertexRole::Node => {
                let (left, right) = self.joint_halfedge_frames(anchor, other)?;
                Ok(EndFrames::Joint(left, right))
            }
            VertexRole::Boundary => Err(SkeletonError::NotSkeletonVertex { vertex: anchor }),
        }
    }

    /// Reproject the offsets of the corners flanking `anchor` on branch
    /// `(anchor, other)` from the before-frames into the after-frames.
    fn remount_end(
        &mut self,
        anchor: VertexId,
        other: VertexId,
        before: &EndFrames,
        after: &EndFrames,
    ) -> Result<()> {
        let (left_key, right_key) = self.branch_end_keys(anchor, other)?;
        match (before, after) {
            (EndFrames::Leaf(f1), EndFrames::Leaf(f2)) => {
                self.remount_transform(left_key, f1, f2);
                self.remount_transform(right_key, f1, f2);
            }
            (EndFrames::Joint(l1, r1), EndFrames::Joint(l2, r2)) => {
                self.remount_transform(left_key, l1, l2);
                self.remount_transform(right_key, r1, r2);
            }
            _ => unreachable!("vertex roles are fixed after construction"),
        }
        Ok(())
    }

    fn remount_transform(&mut self, key: VertexId, f1: &Frame, f2: &Frame) {
        let offset = self.transforms[key.index()];
        if offset == Vector3::zeros() {
            return;
        }
        let local = f1.to_local(&offset);
        self.transforms[key.index()] = f2.to_world(&local);
    }
}

fn centroid(points: &[Point3<f64>; 3]) -> Point3<f64> {
    Point3::from((points[0].coords + points[1].coords + points[2].coords) / 3.0)
}
