// src/error.rs
use crate::hand::HandId;
use thiserror::Error;

// Raised when the tracking layer and the store disagree about which hands grasp
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("hand {0} already has an active grasp")]
    HandAlreadyGrasping(HandId),

    #[error("hand {0} has no active grasp")]
    HandNotGrasping(HandId),

    #[error("hand {0} appears more than once in one frame")]
    DuplicateHand(HandId),

    #[error("hand {0} is still tracked")]
    HandStillTracked(HandId),

    #[error("expected at least {expected} hand landmarks, found {found}")]
    MissingLandmarks { expected: usize, found: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PoseError>;
