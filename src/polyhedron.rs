//! Convex polyhedra built by cutting a box with half-spaces. This is all the geometry the Voronoi
//! and power cells need: every cell starts as a cube around its center and is clipped by one plane
//! per neighbor.

use nalgebra::Vector3;

/// Points closer than this to a plane count as lying on it, in angstroms.
const PLANE_EPS: f64 = 1e-9;

/// Vertices closer than this are merged, in angstroms.
const VERTEX_EPS: f64 = 1e-8;

/// The half-space n · x ≤ offset, with n a unit vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    offset: f64,
}

impl Plane {
    /// Returns `None` for a zero or non-finite normal.
    pub fn new(normal: Vector3<f64>, offset: f64) -> Option<Self> {
        let norm = normal.norm();
        if !(norm.is_finite() && norm > 0.0 && offset.is_finite()) {
            return None;
        }
        Some(Self {
            normal: normal / norm,
            offset: offset / norm,
        })
    }

    /// The perpendicular bisector of two points, keeping the side of `inner`.
    pub fn from_opposite_points(inner: &Vector3<f64>, outer: &Vector3<f64>) -> Option<Self> {
        Self::radical(inner, 0.0, outer, 0.0)
    }

    /// The radical plane of two spheres: the points with equal power |x − p|² − r² with respect
    /// to both. Keeps the side of the first sphere.
    pub fn radical(
        p_i: &Vector3<f64>,
        r_i: f64,
        p_j: &Vector3<f64>,
        r_j: f64,
    ) -> Option<Self> {
        let delta = p_j - p_i;
        let d = delta.norm();
        if d <= PLANE_EPS {
            return None;
        }
        let u = delta / d;
        let t = (d * d + r_i * r_i - r_j * r_j) / (2.0 * d);
        Self::new(u, u.dot(p_i) + t)
    }

    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Positive outside, negative inside.
    pub fn signed_distance(&self, x: &Vector3<f64>) -> f64 {
        self.normal.dot(x) - self.offset
    }
}

/// A planar convex polygon on the boundary of a polyhedron. Vertices are in cyclic order.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub vertices: Vec<Vector3<f64>>,
    pub plane: Plane,
    /// Which clipping plane made this face. `None` for faces of the initial box.
    pub generator: Option<usize>,
}

impl Face {
    pub fn area(&self) -> f64 {
        let v0 = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(|w| (w[0] - v0).cross(&(w[1] - v0)))
            .sum::<Vector3<f64>>()
            .norm()
            * 0.5
    }
}

fn dedup_points(points: &mut Vec<Vector3<f64>>) {
    let mut unique: Vec<Vector3<f64>> = Vec::with_capacity(points.len());
    for p in points.drain(..) {
        if !unique.iter().any(|q| (p - q).norm() <= VERTEX_EPS) {
            unique.push(p);
        }
    }
    *points = unique;
}

/// Orders coplanar points by angle around their centroid, counterclockwise seen from the side
/// `normal` points to.
fn order_around(points: &mut [Vector3<f64>], normal: &Vector3<f64>) {
    let n = points.len() as f64;
    let centroid = points.iter().sum::<Vector3<f64>>() / n;
    let Some(e1) = points
        .iter()
        .map(|p| p - centroid)
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))
        .and_then(|v| v.try_normalize(PLANE_EPS))
    else {
        return;
    };
    let e2 = normal.cross(&e1);
    let angle = |p: &Vector3<f64>| {
        let v = p - centroid;
        v.dot(&e2).atan2(v.dot(&e1))
    };
    points.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolyhedron {
    faces: Vec<Face>,
}

impl ConvexPolyhedron {
    /// An axis-aligned cube centered at `center`.
    pub fn cube(center: &Vector3<f64>, half_width: f64) -> Self {
        let corner = |sx: f64, sy: f64, sz: f64| center + Vector3::new(sx, sy, sz) * half_width;
        let mut faces = vec![];
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let mut normal = Vector3::zeros();
                normal[axis] = sign;
                let mut vertices: Vec<Vector3<f64>> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                    .iter()
                    .map(|&(u, v)| {
                        let mut s = [0.0; 3];
                        s[axis] = sign;
                        s[(axis + 1) % 3] = u;
                        s[(axis + 2) % 3] = v;
                        corner(s[0], s[1], s[2])
                    })
                    .collect();
                order_around(&mut vertices, &normal);
                faces.push(Face {
                    vertices,
                    plane: Plane {
                        normal,
                        offset: normal.dot(center) + half_width,
                    },
                    generator: None,
                });
            }
        }
        Self { faces }
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Whether some face of the initial box survived clipping.
    pub fn touches_bounding_box(&self) -> bool {
        self.faces.iter().any(|f| f.generator.is_none())
    }

    /// Keeps only the part of the polyhedron inside `plane`. The new face remembers `generator`.
    /// Returns whether anything was cut away.
    pub fn clip(&mut self, plane: &Plane, generator: usize) -> bool {
        if !self
            .faces
            .iter()
            .flat_map(|f| &f.vertices)
            .any(|v| plane.signed_distance(v) > PLANE_EPS)
        {
            return false;
        }

        let mut cap = vec![];
        let mut faces = Vec::with_capacity(self.faces.len() + 1);
        for face in self.faces.drain(..) {
            let n = face.vertices.len();
            let s: Vec<f64> = face
                .vertices
                .iter()
                .map(|v| plane.signed_distance(v))
                .collect();
            let mut kept = vec![];
            for k in 0..n {
                let (vk, vn) = (face.vertices[k], face.vertices[(k + 1) % n]);
                let (sk, sn) = (s[k], s[(k + 1) % n]);
                if sk <= PLANE_EPS {
                    kept.push(vk);
                    if sk.abs() <= PLANE_EPS {
                        cap.push(vk);
                    }
                }
                if (sk < -PLANE_EPS && sn > PLANE_EPS) || (sk > PLANE_EPS && sn < -PLANE_EPS) {
                    let p = vk + (vn - vk) * (sk / (sk - sn));
                    kept.push(p);
                    cap.push(p);
                }
            }
            dedup_points(&mut kept);
            if kept.len() >= 3 {
                faces.push(Face {
                    vertices: kept,
                    ..face
                });
            }
        }

        dedup_points(&mut cap);
        if cap.len() >= 3 {
            order_around(&mut cap, plane.normal());
            faces.push(Face {
                vertices: cap,
                plane: *plane,
                generator: Some(generator),
            });
        }
        self.faces = faces;
        true
    }

    /// The distinct vertices, in face order.
    pub fn vertices(&self) -> Vec<Vector3<f64>> {
        let mut vs: Vec<Vector3<f64>> = self.faces.iter().flat_map(|f| f.vertices.clone()).collect();
        dedup_points(&mut vs);
        vs
    }

    /// The largest distance from `center` to a vertex, 0 for an empty polyhedron.
    pub fn max_distance_from(&self, center: &Vector3<f64>) -> f64 {
        self.faces
            .iter()
            .flat_map(|f| &f.vertices)
            .map(|v| (v - center).norm())
            .fold(0.0, f64::max)
    }

    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(Face::area).sum()
    }

    /// Sum of the pyramids from an interior point to every face.
    pub fn volume(&self) -> f64 {
        let vs = self.vertices();
        if vs.is_empty() {
            return 0.0;
        }
        let r = vs.iter().sum::<Vector3<f64>>() / vs.len() as f64;
        self.faces
            .iter()
            .map(|f| f.area() * (f.plane.offset - f.plane.normal.dot(&r)) / 3.0)
            .sum()
    }

    /// (generator, face area) for every face made by a clipping plane, in face order.
    pub fn generator_faces(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.faces
            .iter()
            .filter_map(|f| f.generator.map(|g| (g, f.area())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cube() {
        let c = ConvexPolyhedron::cube(&Vector3::new(1.0, 2.0, 3.0), 0.5);
        assert_eq!(c.faces().len(), 6);
        assert_eq!(c.vertices().len(), 8);
        assert_relative_eq!(c.volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.surface_area(), 6.0, epsilon = 1e-12);
        assert!(c.touches_bounding_box());
    }

    #[test]
    fn test_clip_corner() {
        let mut c = ConvexPolyhedron::cube(&Vector3::zeros(), 1.0);
        // cut off the corner at (1, 1, 1) through (0, 1, 1), (1, 0, 1), (1, 1, 0)
        let plane = Plane::new(Vector3::new(1.0, 1.0, 1.0), 2.0).unwrap();
        assert!(c.clip(&plane, 7));
        assert_eq!(c.faces().len(), 7);
        assert_eq!(c.vertices().len(), 10);
        assert_relative_eq!(c.volume(), 8.0 - 1.0 / 6.0, epsilon = 1e-10);
        let cap = c.faces().iter().find(|f| f.generator == Some(7)).unwrap();
        assert_relative_eq!(cap.area(), 3f64.sqrt() / 2.0, epsilon = 1e-10);
        // a plane that misses the polyhedron changes nothing
        assert!(!c.clip(&Plane::new(Vector3::x(), 5.0).unwrap(), 8));
    }

    #[test]
    fn test_bisectors_make_cube() {
        let mut c = ConvexPolyhedron::cube(&Vector3::zeros(), 10.0);
        for (g, axis) in [Vector3::x(), Vector3::y(), Vector3::z()].iter().enumerate() {
            for sign in [-1.0, 1.0] {
                let plane = Plane::from_opposite_points(&Vector3::zeros(), &(axis * 2.0 * sign))
                    .unwrap();
                c.clip(&plane, g);
            }
        }
        assert!(!c.touches_bounding_box());
        assert_relative_eq!(c.volume(), 8.0, epsilon = 1e-10);
        assert_relative_eq!(c.surface_area(), 24.0, epsilon = 1e-10);
    }

    #[test]
    fn test_radical_plane() {
        let p = Plane::radical(&Vector3::zeros(), 1.0, &Vector3::new(4.0, 0.0, 0.0), 2.0).unwrap();
        // (16 + 1 - 4) / 8
        assert_relative_eq!(p.offset(), 13.0 / 8.0, epsilon = 1e-12);
        assert!(p.signed_distance(&Vector3::zeros()) < 0.0);
        assert_eq!(Plane::radical(&Vector3::zeros(), 1.0, &Vector3::zeros(), 1.0), None);
    }
}
