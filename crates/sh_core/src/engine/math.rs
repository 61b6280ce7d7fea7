//! Minimal 3-component vector helpers.
//!
//! World positions and directions are plain `(f32, f32, f32)` tuples; the
//! few operations the behavior core needs live here rather than pulling in
//! a linear algebra dependency.

/// World-space vector: `(x, y, z)` with `y` up.
pub type Vec3 = (f32, f32, f32);

/// Degenerate-length guard for normalization.
const EPSILON: f32 = 0.0001;

#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    (a.0 - b.0, a.1 - b.1, a.2 - b.2)
}

#[inline]
pub fn scale(v: Vec3, s: f32) -> Vec3 {
    (v.0 * s, v.1 * s, v.2 * s)
}

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a.0 * b.0 + a.1 * b.1 + a.2 * b.2
}

#[inline]
pub fn length(v: Vec3) -> f32 {
    dot(v, v).sqrt()
}

#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    length(sub(a, b))
}

/// Normalize a vector; returns the zero vector when the input is degenerate.
#[inline]
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < EPSILON {
        (0.0, 0.0, 0.0)
    } else {
        (v.0 / len, v.1 / len, v.2 / len)
    }
}
