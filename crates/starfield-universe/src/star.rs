use glam::Vec3;

/// Identity of a generated star.
///
/// Universe stars are addressed by their global index in `[1, N]`. Synthetic
/// filler stars are addressed by the region seed that produced them and their
/// ordinal within that region, so the two can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StarId {
    Universe(u64),
    Synthetic { region: u64, ordinal: u32 },
}

impl StarId {
    /// Whether this star was manufactured to meet a minimum density.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, StarId::Synthetic { .. })
    }

    /// The global index, for universe stars only.
    pub fn universe_index(&self) -> Option<u64> {
        match *self {
            StarId::Universe(index) => Some(index),
            StarId::Synthetic { .. } => None,
        }
    }
}

/// A star derived on demand. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarRecord {
    pub id: StarId,
    /// World-space position.
    pub position: Vec3,
    /// Linear RGB in `[0, 1]`.
    pub color: [f32; 3],
    /// Point size in pixels before distance attenuation.
    pub size: f32,
    /// Brightness in `[0, 1]`.
    pub intensity: f32,
}
