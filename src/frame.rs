//! Local coordinate frames.
//!
//! A [`Frame`] is an origin plus an orthonormal basis derived from two
//! non-parallel axis vectors. Frames carry a stored offset across a
//! reference change: convert the offset to local coordinates in the frame
//! captured before an edit, then back to world coordinates in the frame
//! captured after it.
//!
//! Offsets are displacement vectors, so only the rotational part of the
//! basis participates; the origin is kept for callers that anchor a frame at
//! a vertex but does not enter the conversion. Reprojecting through two
//! identical frames is the identity.

use nalgebra::{Point3, Vector3};

use crate::error::{Result, SkeletonError};

const AXIS_EPSILON: f64 = 1e-9;

/// An origin with a right-handed orthonormal basis.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    origin: Point3<f64>,
    xaxis: Vector3<f64>,
    yaxis: Vector3<f64>,
    zaxis: Vector3<f64>,
}

impl Frame {
    /// Create a frame from an origin and two non-parallel axis vectors.
    ///
    /// The x axis keeps the direction of `xaxis`; the y axis is re-derived
    /// inside the plane spanned by both inputs. Fails with
    /// [`SkeletonError::DegenerateFrame`] when the axes are parallel or
    /// zero-length.
    pub fn new(origin: Point3<f64>, xaxis: Vector3<f64>, yaxis: Vector3<f64>) -> Result<Self> {
        if xaxis.norm() < AXIS_EPSILON {
            return Err(SkeletonError::DegenerateFrame);
        }
        let x = xaxis.normalize();

        let z = x.cross(&yaxis);
        if z.norm() < AXIS_EPSILON {
            return Err(SkeletonError::DegenerateFrame);
        }
        let z = z.normalize();
        let y = z.cross(&x);

        Ok(Self {
            origin,
            xaxis: x,
            yaxis: y,
            zaxis: z,
        })
    }

    /// The world XY frame at the origin.
    pub fn world_xy() -> Self {
        Self {
            origin: Point3::origin(),
            xaxis: Vector3::x(),
            yaxis: Vector3::y(),
            zaxis: Vector3::z(),
        }
    }

    /// The origin of the frame.
    #[inline]
    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    /// The unit x axis.
    #[inline]
    pub fn xaxis(&self) -> Vector3<f64> {
        self.xaxis
    }

    /// The unit y axis.
    #[inline]
    pub fn yaxis(&self) -> Vector3<f64> {
        self.yaxis
    }

    /// The unit z axis.
    #[inline]
    pub fn zaxis(&self) -> Vector3<f64> {
        self.zaxis
    }

    /// Express a world-space displacement in frame-local coordinates.
    pub fn to_local(&self, v: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(v.dot(&self.xaxis), v.dot(&self.yaxis), v.dot(&self.zaxis))
    }

    /// Express a frame-local displacement in world coordinates.
    pub fn to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.xaxis * v.x + self.yaxis * v.y + self.zaxis * v.z
    }
}
