// src/lib.rs

pub mod config;
pub mod data;
pub mod error;
pub mod grasp;
pub mod hand;
pub mod holding;
pub mod kabsch;
pub mod reference;

pub use config::SolverConfig;
pub use error::{PoseError, Result};
pub use grasp::GraspedObject;
pub use hand::{joint_index, Bone, Finger, HandFrame, HandId, JOINT_COUNT};
pub use holding::{HoldingPoseController, RigidBodyFrame, StaticBody};
pub use kabsch::{AccumulatorState, AlignmentResult, KabschSolver};
pub use reference::{ReferencePointStore, ReferencePointTable};
