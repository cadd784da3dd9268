//! Serde utilities for glam types.
//!
//! glam is pulled in without its `serde` feature, so vectors that appear in
//! commands and configuration go through these proxies.

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serde proxy for Vec3
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Vec3Def {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Def {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Def> for Vec3 {
    fn from(def: Vec3Def) -> Self {
        Vec3::new(def.x, def.y, def.z)
    }
}

pub fn serialize_vec3<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Vec3Def::from(*v).serialize(s)
}

pub fn deserialize_vec3<'de, D>(d: D) -> Result<Vec3, D::Error>
where
    D: Deserializer<'de>,
{
    Vec3Def::deserialize(d).map(Vec3::from)
}

/// Use with `#[serde(with = "crate::serde_utils::vec3_list")]` on `Vec<Vec3>` fields.
pub mod vec3_list {
    use super::Vec3Def;
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(list: &[Vec3], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let proxies: Vec<Vec3Def> = list.iter().copied().map(Vec3Def::from).collect();
        proxies.serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec<Vec3>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let proxies = Vec::<Vec3Def>::deserialize(d)?;
        Ok(proxies.into_iter().map(Vec3::from).collect())
    }
}

/// Use with `#[serde(with = "crate::serde_utils::vec3")]` on `Vec3` fields.
pub mod vec3 {
    pub use super::deserialize_vec3 as deserialize;
    pub use super::serialize_vec3 as serialize;
}
