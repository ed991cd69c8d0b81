//! Physical material properties for collision response

use serde::{Deserialize, Serialize};

/// Physical material properties for collision response
///
/// Materials define how bodies interact at contacts: friction (resistance to
/// sliding) and restitution (bounciness).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Coulomb friction coefficient (0.0 = ice, 1.0 = rubber)
    pub friction: f64,
    /// Restitution (0.0 = no bounce, 1.0 = perfect bounce)
    pub restitution: f64,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

impl PhysicsMaterial {
    /// Very low friction, slight bounce
    pub const ICE: Self = Self {
        friction: 0.05,
        restitution: 0.1,
    };

    /// High friction, very bouncy
    pub const RUBBER: Self = Self {
        friction: 0.9,
        restitution: 0.8,
    };

    pub const METAL: Self = Self {
        friction: 0.3,
        restitution: 0.3,
    };

    pub const WOOD: Self = Self {
        friction: 0.5,
        restitution: 0.2,
    };

    pub const CONCRETE: Self = Self {
        friction: 0.7,
        restitution: 0.1,
    };

    /// No friction and a perfectly elastic bounce
    pub const ELASTIC: Self = Self {
        friction: 0.0,
        restitution: 1.0,
    };

    /// Create a material; values are clamped to `[0.0, 1.0]`
    pub fn new(friction: f64, restitution: f64) -> Self {
        Self {
            friction: friction.clamp(0.0, 1.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }

    /// Combine two materials at a contact
    ///
    /// Geometric mean for friction, maximum for restitution.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            friction: (self.friction * other.friction).sqrt(),
            restitution: self.restitution.max(other.restitution),
        }
    }
}
