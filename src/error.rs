//! Error types for armature.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::mesh::{FaceId, VertexId};
use crate::network::NodeId;

/// Result type alias using [`SkeletonError`].
pub type Result<T> = std::result::Result<T, SkeletonError>;

/// Errors that can occur while building or editing skeleton meshes.
///
/// Topology errors abort a build immediately: once the adjacency is
/// inconsistent, downstream indices are meaningless. Geometric degeneracies
/// are recovered locally where a documented fallback exists and only surface
/// here when the fallback itself degenerates.
#[derive(Error, Debug)]
pub enum SkeletonError {
    /// The input network has no edges (and is not the single-node dome case).
    #[error("network has no branches")]
    EmptyNetwork,

    /// Too few points were supplied to seed a convex hull.
    #[error("convex hull needs at least 3 points, got {count}")]
    DegenerateHullInput {
        /// Number of points supplied.
        count: usize,
    },

    /// The first three hull points are collinear and cannot seed the hull.
    #[error("convex hull seed points are collinear")]
    CollinearSeedPoints,

    /// The collar builder requires a sub-network with exactly one joint.
    #[error("expected exactly one joint node, found {joints}")]
    NotSingleJoint {
        /// Number of joint nodes in the sub-network.
        joints: usize,
    },

    /// A hull face was not a triangle where triangulation is required.
    #[error("hull face {face} has {len} vertices, expected a triangle")]
    NonTriangularHullFace {
        /// Index of the offending hull face.
        face: usize,
        /// Number of vertices in that face.
        len: usize,
    },

    /// A directed edge has no face registered on it.
    #[error("no face is registered on halfedge ({from:?}, {to:?})")]
    MissingHalfEdgeFace {
        /// Origin vertex of the halfedge.
        from: VertexId,
        /// Destination vertex of the halfedge.
        to: VertexId,
    },

    /// A vertex was looked up in a face that does not contain it.
    #[error("face {face:?} does not contain vertex {vertex:?}")]
    VertexNotInFace {
        /// The face that was searched.
        face: FaceId,
        /// The missing vertex.
        vertex: VertexId,
    },

    /// A directed branch halfedge is missing its generated boundary keys.
    #[error("halfedge ({from:?}, {to:?}) has no boundary vertex assignment")]
    MissingBoundaryKey {
        /// Origin vertex of the branch halfedge.
        from: VertexId,
        /// Destination vertex of the branch halfedge.
        to: VertexId,
    },

    /// A hull halfedge is missing its descendent record.
    #[error("hull halfedge ({from:?}, {to:?}) has no descendent record")]
    MissingDescendent {
        /// Origin vertex of the hull halfedge.
        from: VertexId,
        /// Destination vertex of the hull halfedge.
        to: VertexId,
    },

    /// A neighbor cycle is not a permutation of the node's neighbors.
    #[error("neighbor cycle for node {node:?} is not a permutation of its neighbors")]
    InvalidNeighborCycle {
        /// The node whose cycle was rejected.
        node: NodeId,
    },

    /// A skeleton vertex has no stored neighbor ring.
    #[error("vertex {vertex:?} has no neighbor ring")]
    MissingNeighborRing {
        /// The vertex without a ring.
        vertex: VertexId,
    },

    /// The vertex is a generated boundary vertex, not a skeleton node or leaf.
    #[error("vertex {vertex:?} is not a skeleton node or leaf")]
    NotSkeletonVertex {
        /// The rejected vertex.
        vertex: VertexId,
    },

    /// An offset direction is undefined and the world-up fallback degenerated.
    #[error("offset direction for branch ({from:?}, {to:?}) is undefined: branch is parallel to the up axis")]
    DegenerateOffset {
        /// Origin vertex of the branch.
        from: VertexId,
        /// Destination vertex of the branch.
        to: VertexId,
    },

    /// Frame axes are parallel or zero-length.
    #[error("frame axes are parallel or zero-length")]
    DegenerateFrame,

    /// A geometric construction degenerated with no documented fallback.
    #[error("geometric degeneracy: {details}")]
    Degeneracy {
        /// Description of the degenerate configuration.
        details: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl SkeletonError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        SkeletonError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
