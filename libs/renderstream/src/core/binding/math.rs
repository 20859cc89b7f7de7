// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Matrix and rotation helpers for TRANSFORM and quaternion parameters.
//!
//! Matrices are 16 column-major floats. Quaternions are `[x, y, z, w]`.

use super::value::TransformValue;

/// Splits a TRS matrix into position, rotation and scale.
///
/// A negative determinant is attributed to the X axis.
pub fn decompose_transform(m: &[f32; 16]) -> TransformValue {
    let column = |c: usize| [m[c * 4], m[c * 4 + 1], m[c * 4 + 2]];
    let (c0, c1, c2) = (column(0), column(1), column(2));

    let mut scale = [length(c0), length(c1), length(c2)];
    if determinant(c0, c1, c2) < 0.0 {
        scale[0] = -scale[0];
    }

    let basis = [
        divide(c0, scale[0]),
        divide(c1, scale[1]),
        divide(c2, scale[2]),
    ];

    TransformValue {
        position: [m[12], m[13], m[14]],
        rotation: quaternion_from_basis(&basis),
        scale,
    }
}

/// Rotation of an orthonormal basis given as three columns.
pub fn quaternion_from_basis(basis: &[[f32; 3]; 3]) -> [f32; 4] {
    // r(row, col)
    let r = |row: usize, col: usize| basis[col][row];
    let trace = r(0, 0) + r(1, 1) + r(2, 2);

    let q = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        [
            (r(2, 1) - r(1, 2)) / s,
            (r(0, 2) - r(2, 0)) / s,
            (r(1, 0) - r(0, 1)) / s,
            0.25 * s,
        ]
    } else if r(0, 0) > r(1, 1) && r(0, 0) > r(2, 2) {
        let s = (1.0 + r(0, 0) - r(1, 1) - r(2, 2)).sqrt() * 2.0;
        [
            0.25 * s,
            (r(0, 1) + r(1, 0)) / s,
            (r(0, 2) + r(2, 0)) / s,
            (r(2, 1) - r(1, 2)) / s,
        ]
    } else if r(1, 1) > r(2, 2) {
        let s = (1.0 + r(1, 1) - r(0, 0) - r(2, 2)).sqrt() * 2.0;
        [
            (r(0, 1) + r(1, 0)) / s,
            0.25 * s,
            (r(1, 2) + r(2, 1)) / s,
            (r(0, 2) - r(2, 0)) / s,
        ]
    } else {
        let s = (1.0 + r(2, 2) - r(0, 0) - r(1, 1)).sqrt() * 2.0;
        [
            (r(0, 2) + r(2, 0)) / s,
            (r(1, 2) + r(2, 1)) / s,
            0.25 * s,
            (r(1, 0) - r(0, 1)) / s,
        ]
    };
    normalize(q)
}

/// Euler angles in degrees to a quaternion, rotating about Z, then X, then Y.
pub fn quaternion_from_euler(degrees: [f32; 3]) -> [f32; 4] {
    let half = |d: f32| (d.to_radians() * 0.5).sin_cos();
    let (sx, cx) = half(degrees[0]);
    let (sy, cy) = half(degrees[1]);
    let (sz, cz) = half(degrees[2]);

    let qx = [sx, 0.0, 0.0, cx];
    let qy = [0.0, sy, 0.0, cy];
    let qz = [0.0, 0.0, sz, cz];
    multiply(multiply(qy, qx), qz)
}

/// Hamilton product `a * b`.
pub fn multiply(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn divide(v: [f32; 3], s: f32) -> [f32; 3] {
    if s == 0.0 {
        return [0.0; 3];
    }
    [v[0] / s, v[1] / s, v[2] / s]
}

fn determinant(c0: [f32; 3], c1: [f32; 3], c2: [f32; 3]) -> f32 {
    c0[0] * (c1[1] * c2[2] - c1[2] * c2[1]) - c1[0] * (c0[1] * c2[2] - c0[2] * c2[1])
        + c2[0] * (c0[1] * c1[2] - c0[2] * c1[1])
}

fn normalize(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len == 0.0 || !len.is_finite() {
        return [0.0, 0.0, 0.0, 1.0];
    }
    [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
}
