//! Joint and movement vocabulary plus the static joint registry.
//!
//! The registry is built once and handed to sessions by reference; nothing
//! in the crate reads joint configuration from global state.

use crate::landmark::LandmarkTriple;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Anatomical joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    Knee,
    Shoulder,
    Hip,
    Elbow,
    Ankle,
    Wrist,
    Fingers,
}

/// Movement performed by a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Flexion,
    Extension,
    Abduction,
    Adduction,
    InternalRotation,
    ExternalRotation,
    Dorsiflexion,
    Plantarflexion,
    Pronation,
    Supination,
}

/// Body side of the measured joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySide {
    Left,
    Right,
}

/// Camera placement relative to the patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    /// Side view
    Sagittal,
    /// Front view
    Frontal,
}

impl JointType {
    /// All joints in registry order
    pub const ALL: [Self; 7] = [
        Self::Knee,
        Self::Shoulder,
        Self::Hip,
        Self::Elbow,
        Self::Ankle,
        Self::Wrist,
        Self::Fingers,
    ];

    /// Snake-case identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Knee => "knee",
            Self::Shoulder => "shoulder",
            Self::Hip => "hip",
            Self::Elbow => "elbow",
            Self::Ankle => "ankle",
            Self::Wrist => "wrist",
            Self::Fingers => "fingers",
        }
    }

    /// Whether pelvic compensation can falsify a reading of this joint
    #[must_use]
    pub const fn is_lower_limb(&self) -> bool {
        matches!(self, Self::Hip | Self::Knee | Self::Ankle)
    }
}

impl MovementType {
    /// Snake-case identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flexion => "flexion",
            Self::Extension => "extension",
            Self::Abduction => "abduction",
            Self::Adduction => "adduction",
            Self::InternalRotation => "internal_rotation",
            Self::ExternalRotation => "external_rotation",
            Self::Dorsiflexion => "dorsiflexion",
            Self::Plantarflexion => "plantarflexion",
            Self::Pronation => "pronation",
            Self::Supination => "supination",
        }
    }
}

impl BodySide {
    /// Snake-case identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

macro_rules! impl_display_from_str {
    ($ty:ty, $what:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let normalized = s.trim().to_lowercase().replace('-', "_");
                $(
                    if normalized == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(Error::InvalidInput(format!("Unknown {}: {s}", $what)))
            }
        }
    };
}

impl_display_from_str!(JointType, "joint", [Knee, Shoulder, Hip, Elbow, Ankle, Wrist, Fingers]);
impl_display_from_str!(
    MovementType,
    "movement",
    [
        Flexion,
        Extension,
        Abduction,
        Adduction,
        InternalRotation,
        ExternalRotation,
        Dorsiflexion,
        Plantarflexion,
        Pronation,
        Supination,
    ]
);
impl_display_from_str!(BodySide, "body side", [Left, Right]);

/// Registry key: one measurable joint movement on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointKey {
    pub joint: JointType,
    pub side: BodySide,
    pub movement: MovementType,
}

impl JointKey {
    #[must_use]
    pub const fn new(joint: JointType, side: BodySide, movement: MovementType) -> Self {
        Self { joint, side, movement }
    }
}

impl fmt::Display for JointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.joint, self.side, self.movement)
    }
}

/// Static configuration for one joint movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMovementConfig {
    /// Proximal, vertex and distal keypoint indices
    pub landmark_triple: LandmarkTriple,
    /// Healthy range in ROM degrees (min, max)
    pub normal_range: (f64, f64),
    /// Display label
    pub label: String,
    /// Where the phone should be placed
    pub camera_position: CameraPosition,
    /// Step-by-step patient instructions
    pub instructions: Vec<String>,
}

/// Read-only table of all measurable joint movements
#[derive(Debug, Clone, Default)]
pub struct JointRegistry {
    entries: BTreeMap<JointKey, JointMovementConfig>,
}

struct MovementEntry {
    movement: MovementType,
    label: &'static str,
    normal_range: (f64, f64),
    camera: CameraPosition,
    instructions: &'static [&'static str],
}

const KNEE_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Knee flexion",
        normal_range: (0.0, 150.0),
        camera: CameraPosition::Sagittal,
        instructions: &[
            "Stand side-on to the camera",
            "Place one leg slightly behind",
            "Bend the knee as far as possible",
        ],
    },
    MovementEntry {
        movement: MovementType::Extension,
        label: "Knee extension",
        normal_range: (0.0, 10.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Sit down", "Stretch the leg out", "Push the knee straight"],
    },
];

const HIP_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Hip flexion",
        normal_range: (0.0, 120.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Lie on your back", "Pull the knee towards the chest"],
    },
    MovementEntry {
        movement: MovementType::Abduction,
        label: "Hip abduction",
        normal_range: (0.0, 40.0),
        camera: CameraPosition::Frontal,
        instructions: &["Lie on your back", "Move the straight leg out to the side"],
    },
];

const SHOULDER_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Shoulder anteversion",
        normal_range: (0.0, 180.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Raise the straight arm forwards and up"],
    },
    MovementEntry {
        movement: MovementType::Abduction,
        label: "Shoulder abduction",
        normal_range: (0.0, 180.0),
        camera: CameraPosition::Frontal,
        instructions: &["Raise the arm sideways and up"],
    },
];

const ELBOW_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Elbow flexion",
        normal_range: (0.0, 150.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Keep the arm at your side", "Bend the forearm as far as possible"],
    },
    MovementEntry {
        movement: MovementType::Extension,
        label: "Elbow extension",
        normal_range: (0.0, 10.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Stretch the arm downwards", "Push the elbow straight"],
    },
];

const WRIST_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Wrist palmar flexion",
        normal_range: (0.0, 80.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Rest the forearm", "Bend the hand downwards"],
    },
    MovementEntry {
        movement: MovementType::Extension,
        label: "Wrist dorsal extension",
        normal_range: (0.0, 70.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Rest the forearm", "Lift the hand upwards"],
    },
];

const ANKLE_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Dorsiflexion,
        label: "Ankle dorsiflexion",
        normal_range: (0.0, 20.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Stretch the leg out", "Pull the toes up"],
    },
    MovementEntry {
        movement: MovementType::Plantarflexion,
        label: "Ankle plantarflexion",
        normal_range: (0.0, 45.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Stretch the leg out", "Point the toes down"],
    },
];

const FINGER_MOVEMENTS: &[MovementEntry] = &[
    MovementEntry {
        movement: MovementType::Flexion,
        label: "Finger flexion",
        normal_range: (0.0, 100.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Stretch the hand flat", "Roll all fingers into a fist"],
    },
    MovementEntry {
        movement: MovementType::Extension,
        label: "Finger extension",
        normal_range: (0.0, 10.0),
        camera: CameraPosition::Sagittal,
        instructions: &["Lay the hand flat", "Stretch the fingers as far as possible"],
    },
];

/// Joint, BlazePose triples (left, right) and movements
const STANDARD_JOINTS: &[(JointType, LandmarkTriple, LandmarkTriple, &[MovementEntry])] = &[
    (JointType::Knee, LandmarkTriple(23, 25, 27), LandmarkTriple(24, 26, 28), KNEE_MOVEMENTS),
    (JointType::Hip, LandmarkTriple(11, 23, 25), LandmarkTriple(12, 24, 26), HIP_MOVEMENTS),
    (JointType::Shoulder, LandmarkTriple(23, 11, 13), LandmarkTriple(24, 12, 14), SHOULDER_MOVEMENTS),
    (JointType::Elbow, LandmarkTriple(11, 13, 15), LandmarkTriple(12, 14, 16), ELBOW_MOVEMENTS),
    (JointType::Wrist, LandmarkTriple(13, 15, 17), LandmarkTriple(14, 16, 18), WRIST_MOVEMENTS),
    (JointType::Ankle, LandmarkTriple(25, 27, 31), LandmarkTriple(26, 28, 32), ANKLE_MOVEMENTS),
    (JointType::Fingers, LandmarkTriple(15, 17, 19), LandmarkTriple(16, 18, 20), FINGER_MOVEMENTS),
];

impl JointRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every joint movement the app supports
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (joint, left, right, movements) in STANDARD_JOINTS {
            for (side, triple) in [(BodySide::Left, *left), (BodySide::Right, *right)] {
                for entry in *movements {
                    registry.register(
                        JointKey::new(*joint, side, entry.movement),
                        JointMovementConfig {
                            landmark_triple: triple,
                            normal_range: entry.normal_range,
                            label: format!("{} ({side})", entry.label),
                            camera_position: entry.camera,
                            instructions: entry.instructions.iter().map(|s| (*s).to_string()).collect(),
                        },
                    );
                }
            }
        }
        registry
    }

    /// Add or replace an entry
    pub fn register(&mut self, key: JointKey, config: JointMovementConfig) {
        self.entries.insert(key, config);
    }

    /// Look up a joint movement
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for keys that were never registered
    pub fn get(&self, key: &JointKey) -> Result<&JointMovementConfig> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::Configuration(format!("No joint configuration registered for {key}")))
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&JointKey, &JointMovementConfig)> {
        self.entries.iter()
    }

    /// Number of registered joint movements
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
