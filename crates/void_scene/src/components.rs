//! Built-in host components
//!
//! These are the components the mirror bridge reads when building outbound
//! snapshots and writes when playing back inbound patches.

use crate::entity::Entity;
use serde::{Deserialize, Serialize};

/// Column-major 4x4 matrix laid out as 16 floats
pub type Matrix4 = [f32; 16];

/// Identity matrix
pub const IDENTITY_MATRIX: Matrix4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Hierarchy link to a parent entity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent {
    pub entity: Entity,
}

impl Parent {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

/// Local transform relative to the parent (or world for roots).
///
/// Applied in TRS order: Translation * Rotation * Scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub translation: [f32; 3],
    /// Unit quaternion [x, y, z, w]
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a column-major TRS matrix
    pub fn to_matrix(&self) -> Matrix4 {
        let [tx, ty, tz] = self.translation;
        let [qx, qy, qz, qw] = self.rotation;
        let [sx, sy, sz] = self.scale;

        let (x2, y2, z2) = (qx + qx, qy + qy, qz + qz);
        let (xx, xy, xz) = (qx * x2, qx * y2, qx * z2);
        let (yy, yz, zz) = (qy * y2, qy * z2, qz * z2);
        let (wx, wy, wz) = (qw * x2, qw * y2, qw * z2);

        [
            sx * (1.0 - yy - zz), sx * (xy + wz), sx * (xz - wy), 0.0,
            sy * (xy - wz), sy * (1.0 - xx - zz), sy * (yz + wx), 0.0,
            sz * (xz + wy), sz * (yz - wx), sz * (1.0 - xx - yy), 0.0,
            tx, ty, tz, 1.0,
        ]
    }

    /// Decompose a column-major TRS matrix. Shear is discarded.
    pub fn from_matrix(m: &Matrix4) -> Self {
        let column_len = |c: usize| {
            (m[c * 4] * m[c * 4] + m[c * 4 + 1] * m[c * 4 + 1] + m[c * 4 + 2] * m[c * 4 + 2]).sqrt()
        };

        let mut scale = [column_len(0), column_len(1), column_len(2)];
        if determinant3(m) < 0.0 {
            scale[0] = -scale[0];
        }

        // Normalized rotation element at (column, row)
        let r = |c: usize, row: usize| {
            if scale[c] == 0.0 {
                if c == row { 1.0 } else { 0.0 }
            } else {
                m[c * 4 + row] / scale[c]
            }
        };

        let trace = r(0, 0) + r(1, 1) + r(2, 2);
        let rotation = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            [
                (r(1, 2) - r(2, 1)) / s,
                (r(2, 0) - r(0, 2)) / s,
                (r(0, 1) - r(1, 0)) / s,
                0.25 * s,
            ]
        } else if r(0, 0) > r(1, 1) && r(0, 0) > r(2, 2) {
            let s = (1.0 + r(0, 0) - r(1, 1) - r(2, 2)).sqrt() * 2.0;
            [
                0.25 * s,
                (r(0, 1) + r(1, 0)) / s,
                (r(2, 0) + r(0, 2)) / s,
                (r(1, 2) - r(2, 1)) / s,
            ]
        } else if r(1, 1) > r(2, 2) {
            let s = (1.0 + r(1, 1) - r(0, 0) - r(2, 2)).sqrt() * 2.0;
            [
                (r(0, 1) + r(1, 0)) / s,
                0.25 * s,
                (r(1, 2) + r(2, 1)) / s,
                (r(2, 0) - r(0, 2)) / s,
            ]
        } else {
            let s = (1.0 + r(2, 2) - r(0, 0) - r(1, 1)).sqrt() * 2.0;
            [
                (r(2, 0) + r(0, 2)) / s,
                (r(1, 2) + r(2, 1)) / s,
                0.25 * s,
                (r(0, 1) - r(1, 0)) / s,
            ]
        };

        Self {
            translation: [m[12], m[13], m[14]],
            rotation,
            scale,
        }
    }
}

fn determinant3(m: &Matrix4) -> f32 {
    m[0] * (m[5] * m[10] - m[9] * m[6]) - m[4] * (m[1] * m[10] - m[9] * m[2])
        + m[8] * (m[1] * m[6] - m[5] * m[2])
}

/// World-space matrix written back by the guest simulation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalToWorld {
    pub matrix: Matrix4,
}

impl Default for LocalToWorld {
    fn default() -> Self {
        Self {
            matrix: IDENTITY_MATRIX,
        }
    }
}

impl LocalToWorld {
    pub fn translation(&self) -> [f32; 3] {
        [self.matrix[12], self.matrix[13], self.matrix[14]]
    }
}

/// Marks an entity as a candidate for mirroring into the guest runtime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorRequest;

/// Marks a template entity. Templates are never simulated or mirrored
/// themselves; instances created from them drop this marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prefab;

/// 128-bit asset hash
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid {
    pub hash: [u32; 4],
}

impl Guid {
    pub const fn new(hash: [u32; 4]) -> Self {
        Self { hash }
    }
}

/// Ordered list of template entities the guest may instantiate by index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateFamily {
    pub family_id: i32,
    pub templates: Vec<Entity>,
}

impl TemplateFamily {
    pub fn new(family_id: i32, templates: Vec<Entity>) -> Self {
        Self {
            family_id,
            templates,
        }
    }
}

/// Debug name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name(pub String);
