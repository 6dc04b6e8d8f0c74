// src/hand.rs - Joint indexing and per-frame hand input
use crate::error::{PoseError, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FINGER_COUNT: usize = 5;
pub const BONES_PER_FINGER: usize = 4;
pub const JOINT_COUNT: usize = FINGER_COUNT * BONES_PER_FINGER;

// MediaPipe layout: wrist, then 4 landmarks per finger from base to tip
const LANDMARK_COUNT: usize = 21;
const WRIST: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];
}

// Tracked point of a bone is its distal joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bone {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

impl Bone {
    pub const ALL: [Bone; BONES_PER_FINGER] = [
        Bone::Metacarpal,
        Bone::Proximal,
        Bone::Intermediate,
        Bone::Distal,
    ];
}

#[inline]
pub fn joint_index(finger: Finger, bone: Bone) -> usize {
    finger as usize * BONES_PER_FINGER + bone as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandId(pub i32);

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i32> for HandId {
    fn from(id: i32) -> Self {
        HandId(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    pub id: HandId,
    pub joints: [Point3<f64>; JOINT_COUNT],
}

impl HandFrame {
    pub fn new(id: impl Into<HandId>, joints: [Point3<f64>; JOINT_COUNT]) -> Self {
        Self {
            id: id.into(),
            joints,
        }
    }

    /// Builds a frame from a 21-point hand landmark list. The wrist landmark has
    /// no bone of its own and is dropped; extra landmarks past 21 are ignored.
    pub fn from_landmarks(id: impl Into<HandId>, landmarks: &[[f64; 3]]) -> Result<Self> {
        if landmarks.len() < LANDMARK_COUNT {
            return Err(PoseError::MissingLandmarks {
                expected: LANDMARK_COUNT,
                found: landmarks.len(),
            });
        }

        let mut joints = [Point3::origin(); JOINT_COUNT];
        for (slot, lm) in joints
            .iter_mut()
            .zip(landmarks[WRIST + 1..LANDMARK_COUNT].iter())
        {
            *slot = Point3::new(lm[0], lm[1], lm[2]);
        }

        Ok(Self::new(id, joints))
    }

    #[inline]
    pub fn joint(&self, finger: Finger, bone: Bone) -> Point3<f64> {
        self.joints[joint_index(finger, bone)]
    }

    pub fn iter_joints(&self) -> impl Iterator<Item = (Finger, Bone, Point3<f64>)> + '_ {
        Finger::ALL.into_iter().flat_map(move |finger| {
            Bone::ALL
                .into_iter()
                .map(move |bone| (finger, bone, self.joint(finger, bone)))
        })
    }

    pub fn translated(&self, offset: &nalgebra::Vector3<f64>) -> Self {
        let mut joints = self.joints;
        for joint in joints.iter_mut() {
            *joint += *offset;
        }
        Self { id: self.id, joints }
    }
}
