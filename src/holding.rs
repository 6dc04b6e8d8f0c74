// src/holding.rs - Holding pose for one rigid object grasped by any number of hands
use crate::config::SolverConfig;
use crate::error::{PoseError, Result};
use crate::hand::{HandFrame, HandId};
use crate::kabsch::{AlignmentResult, KabschSolver};
use crate::reference::ReferencePointStore;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};
use tracing::{error, trace};

// Pose of the grasped body, owned by the physics backend
pub trait RigidBodyFrame {
    fn position(&self) -> Point3<f64>;
    fn rotation(&self) -> UnitQuaternion<f64>;

    fn set_pose(&mut self, pose: &Isometry3<f64>);

    fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position().coords), self.rotation())
    }

    fn inverse_pose(&self) -> Isometry3<f64> {
        self.pose().inverse()
    }
}

impl RigidBodyFrame for Isometry3<f64> {
    fn position(&self) -> Point3<f64> {
        Point3::from(self.translation.vector)
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    fn set_pose(&mut self, pose: &Isometry3<f64>) {
        *self = *pose;
    }
}

/// Reference points are object-local, so the solved alignment is directly the
/// object's new world pose.
#[derive(Debug)]
pub struct HoldingPoseController {
    store: ReferencePointStore,
    solver: KabschSolver,
    joint_weight: f64,
}

impl HoldingPoseController {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            store: ReferencePointStore::with_pool_capacity(config.initial_pool_capacity),
            solver: KabschSolver::new(config.degenerate_epsilon),
            joint_weight: config.joint_weight,
        }
    }

    pub fn add_hand(&mut self, hand: &HandFrame, body: &impl RigidBodyFrame) -> Result<()> {
        self.store
            .begin_grasp(hand.id, &hand.joints, &body.inverse_pose())?;
        Ok(())
    }

    pub fn remove_hand(&mut self, hand_id: HandId) -> Result<()> {
        self.store.end_grasp(hand_id)
    }

    pub fn transfer_hand_id(&mut self, old_id: HandId, new_id: HandId) -> Result<()> {
        self.store.transfer(old_id, new_id)
    }

    pub fn holding_pose(&mut self, hands: &[HandFrame]) -> Result<AlignmentResult> {
        for (i, hand) in hands.iter().enumerate() {
            if hands[..i].iter().any(|other| other.id == hand.id) {
                error!("holding_pose: hand {} passed twice", hand.id);
                return Err(PoseError::DuplicateHand(hand.id));
            }
        }

        self.solver.reset();

        for hand in hands {
            let table = self.store.table(hand.id)?;
            for (local, live) in table.local_points().iter().zip(hand.joints.iter()) {
                self.solver.add_pair(local, live, self.joint_weight);
            }
        }

        let result = self.solver.solve();
        trace!(
            "holding pose from {} hands ({} pairs): t = {:?}, angle = {:.4}",
            hands.len(),
            self.solver.pair_count(),
            result.translation,
            result.rotation.angle()
        );
        Ok(result)
    }

    pub fn is_holding(&self, hand_id: HandId) -> bool {
        self.store.contains(hand_id)
    }

    pub fn store(&self) -> &ReferencePointStore {
        &self.store
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticBody {
    pub position: Point3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl StaticBody {
    pub fn new(position: Point3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), UnitQuaternion::identity())
    }
}

impl RigidBodyFrame for StaticBody {
    fn position(&self) -> Point3<f64> {
        self.position
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    fn set_pose(&mut self, pose: &Isometry3<f64>) {
        self.position = Point3::from(pose.translation.vector);
        self.rotation = pose.rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::JOINT_COUNT;
    use nalgebra::Vector3;

    fn spread_hand(id: i32, center: Vector3<f64>) -> HandFrame {
        let joints: [Point3<f64>; JOINT_COUNT] = std::array::from_fn(|i| {
            let finger = (i / 4) as f64;
            let bone = (i % 4) as f64;
            Point3::new(finger * 0.02, bone * 0.03, finger * bone * 0.01) + center
        });
        HandFrame::new(id, joints)
    }

    #[test]
    fn test_unmoved_hand_keeps_body_pose() {
        let body = StaticBody::new(
            Point3::new(0.5, 1.0, -0.2),
            UnitQuaternion::from_euler_angles(0.2, 0.1, -0.4),
        );
        let mut controller = HoldingPoseController::new(&SolverConfig::default());
        let hand = spread_hand(1, Vector3::new(0.4, 1.0, -0.2));
        controller.add_hand(&hand, &body).unwrap();

        let pose = controller.holding_pose(&[hand]).unwrap().isometry();
        assert!((pose.translation.vector - body.position.coords).norm() < 1e-6);
        assert!(pose.rotation.angle_to(&body.rotation) < 1e-6);
    }

    #[test]
    fn test_moved_hand_carries_body() {
        let body = StaticBody::at(0.0, 0.0, 0.0);
        let mut controller = HoldingPoseController::new(&SolverConfig::default());
        let hand = spread_hand(3, Vector3::new(0.1, 0.0, 0.0));
        controller.add_hand(&hand, &body).unwrap();

        let motion = Isometry3::from_parts(
            Translation3::new(0.0, 0.2, 0.05),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3),
        );
        let mut moved = hand.clone();
        for joint in moved.joints.iter_mut() {
            *joint = motion.transform_point(joint);
        }

        let pose = controller.holding_pose(&[moved]).unwrap();
        assert!(pose.rotation.angle_to(&motion.rotation) < 1e-6);
        assert!((pose.translation - motion.translation.vector).norm() < 1e-6);
    }

    #[test]
    fn test_unknown_hand_is_contract_violation() {
        let mut controller = HoldingPoseController::new(&SolverConfig::default());
        let hand = spread_hand(4, Vector3::zeros());
        assert_eq!(
            controller.holding_pose(&[hand]),
            Err(PoseError::HandNotGrasping(HandId(4)))
        );
    }

    #[test]
    fn test_duplicate_hand_is_rejected() {
        let body = StaticBody::at(0.0, 0.0, 0.0);
        let mut controller = HoldingPoseController::new(&SolverConfig::default());
        let hand = spread_hand(2, Vector3::new(0.1, 0.0, 0.0));
        controller.add_hand(&hand, &body).unwrap();

        let shifted = hand.translated(&Vector3::new(0.0, 0.05, 0.0));
        assert_eq!(
            controller.holding_pose(&[hand.clone(), shifted]),
            Err(PoseError::DuplicateHand(HandId(2)))
        );
        assert!(controller.holding_pose(&[hand]).is_ok());
    }

    #[test]
    fn test_tiny_joint_weight_still_rotates() {
        let config = SolverConfig {
            joint_weight: 1e-12,
            ..SolverConfig::default()
        };
        let body = StaticBody::at(0.0, 0.0, 0.0);
        let mut controller = HoldingPoseController::new(&config);
        let hand = spread_hand(1, Vector3::new(0.05, 0.0, 0.0));
        controller.add_hand(&hand, &body).unwrap();

        let twist = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5);
        let mut moved = hand.clone();
        for joint in moved.joints.iter_mut() {
            *joint = twist * *joint;
        }

        let pose = controller.holding_pose(&[moved]).unwrap();
        assert!(pose.rotation.angle_to(&twist) < 1e-6);
        assert!(pose.translation.norm() < 1e-6);
    }

    #[test]
    fn test_no_hands_gives_identity() {
        let mut controller = HoldingPoseController::new(&SolverConfig::default());
        assert_eq!(
            controller.holding_pose(&[]).unwrap(),
            AlignmentResult::identity()
        );
    }

    #[test]
    fn test_isometry_is_a_body_frame() {
        let mut body = Isometry3::translation(1.0, 2.0, 3.0);
        assert_eq!(body.position(), Point3::new(1.0, 2.0, 3.0));

        let target = Isometry3::translation(-1.0, 0.0, 0.0);
        body.set_pose(&target);
        assert_eq!(body.pose(), target);
    }
}
