// src/grasp.rs - Grasp lifecycle of a single held object
use crate::config::SolverConfig;
use crate::error::{PoseError, Result};
use crate::hand::{HandFrame, HandId};
use crate::holding::{HoldingPoseController, RigidBodyFrame};
use crate::kabsch::AlignmentResult;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

/// An object driven by grasp events from the tracking layer. Which hands grasp,
/// lose tracking or time out is decided upstream; this only mirrors it into the
/// reference store and applies the holding pose to the body.
pub struct GraspedObject<B: RigidBodyFrame> {
    body: B,
    controller: HoldingPoseController,
    grasping: BTreeSet<HandId>,
    untracked: BTreeSet<HandId>,
}

impl<B: RigidBodyFrame> GraspedObject<B> {
    pub fn new(body: B, config: &SolverConfig) -> Self {
        Self {
            body,
            controller: HoldingPoseController::new(config),
            grasping: BTreeSet::new(),
            untracked: BTreeSet::new(),
        }
    }

    pub fn on_hand_grasp(&mut self, hand: &HandFrame) -> Result<()> {
        self.controller.add_hand(hand, &self.body)?;
        self.grasping.insert(hand.id);
        info!("Hand {} grasped object ({} grasping)", hand.id, self.grasping.len());
        Ok(())
    }

    // None when no tracked hand holds the object this frame
    pub fn on_hands_hold(&mut self, hands: &[HandFrame]) -> Result<Option<AlignmentResult>> {
        for hand in hands {
            if self.untracked.contains(&hand.id) {
                error!("Hand {} reported as holding while untracked", hand.id);
                return Err(PoseError::HandNotGrasping(hand.id));
            }
        }
        if hands.is_empty() {
            return Ok(None);
        }

        let result = self.controller.holding_pose(hands)?;
        self.body.set_pose(&result.isometry());
        Ok(Some(result))
    }

    pub fn on_hand_release(&mut self, hand_id: HandId) -> Result<()> {
        self.controller.remove_hand(hand_id)?;
        self.grasping.remove(&hand_id);
        self.untracked.remove(&hand_id);
        info!("Hand {} released object ({} grasping)", hand_id, self.grasping.len());
        Ok(())
    }

    pub fn on_hand_lost_tracking(&mut self, hand_id: HandId) -> Result<()> {
        if !self.grasping.contains(&hand_id) {
            error!("Untracked hand {} was not grasping", hand_id);
            return Err(PoseError::HandNotGrasping(hand_id));
        }
        self.untracked.insert(hand_id);
        debug!("Hand {} lost tracking while grasping", hand_id);
        Ok(())
    }

    pub fn on_hand_regained_tracking(&mut self, hand: &HandFrame, old_id: HandId) -> Result<()> {
        if !self.untracked.contains(&old_id) {
            return Err(if self.grasping.contains(&old_id) {
                PoseError::HandStillTracked(old_id)
            } else {
                PoseError::HandNotGrasping(old_id)
            });
        }

        self.controller.transfer_hand_id(old_id, hand.id)?;
        self.untracked.remove(&old_id);
        self.grasping.remove(&old_id);
        self.grasping.insert(hand.id);
        debug!("Hand {} regained tracking as {}", old_id, hand.id);
        Ok(())
    }

    pub fn on_hand_timeout(&mut self, hand_id: HandId) -> Result<()> {
        info!("Untracked hand {} timed out", hand_id);
        self.on_hand_release(hand_id)
    }

    pub fn is_being_grasped(&self) -> bool {
        !self.grasping.is_empty()
    }

    pub fn grasping_hand_count(&self) -> usize {
        self.grasping.len()
    }

    pub fn untracked_hand_count(&self) -> usize {
        self.untracked.len()
    }

    pub fn grasping_hands(&self) -> impl Iterator<Item = HandId> + '_ {
        self.grasping.iter().copied()
    }

    pub fn tracked_grasping_hands(&self) -> impl Iterator<Item = HandId> + '_ {
        self.grasping.difference(&self.untracked).copied()
    }

    pub fn untracked_grasping_hands(&self) -> impl Iterator<Item = HandId> + '_ {
        self.untracked.iter().copied()
    }

    pub fn is_being_grasped_by_hand(&self, hand_id: HandId) -> bool {
        self.grasping.contains(&hand_id)
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn controller(&self) -> &HoldingPoseController {
        &self.controller
    }
}
