//! Neutral-Zero Method notation (`Extension-0-Flexion`).

use crate::joints::{JointType, MovementType};
use crate::utils::round_to_degree;
use crate::{Error, Result};

/// Side of the neutral zero a movement is written on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralZeroSide {
    /// `angle-0-0`
    Leading,
    /// `0-0-angle`
    Trailing,
}

impl NeutralZeroSide {
    /// Notation side of a movement
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for movements with no notation
    pub fn for_movement(joint: JointType, movement: MovementType) -> Result<Self> {
        match movement {
            MovementType::Flexion | MovementType::Plantarflexion | MovementType::Adduction => Ok(Self::Trailing),
            MovementType::Extension | MovementType::Dorsiflexion | MovementType::Abduction => Ok(Self::Leading),
            _ => Err(Error::Configuration(format!(
                "No Neutral-Zero notation for {joint}_{movement}"
            ))),
        }
    }
}

/// Render a ROM value in Neutral-Zero notation, e.g. `"0-0-95"`
///
/// # Errors
///
/// Returns [`Error::Configuration`] for unmapped movements and
/// [`Error::InvalidInput`] for non-finite angles
pub fn format_neutral_zero(angle: f64, joint: JointType, movement: MovementType) -> Result<String> {
    let side = NeutralZeroSide::for_movement(joint, movement)?;
    let degrees = round_to_degree(angle)?;
    Ok(match side {
        NeutralZeroSide::Leading => format!("{degrees}-0-0"),
        NeutralZeroSide::Trailing => format!("0-0-{degrees}"),
    })
}
