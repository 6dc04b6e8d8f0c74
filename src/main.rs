// src/main.rs
use anyhow::{Context, Result};
use grasp_pose::data::PoseRecorder;
use grasp_pose::{GraspedObject, HandFrame, HandId, SolverConfig, StaticBody, JOINT_COUNT};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use tracing::info;

const FRAME_DT: f64 = 1.0 / 60.0;
const FRAMES: u64 = 240;
const LOST_AT: u64 = 90;
const REGAINED_AT: u64 = 120;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SolverConfig::from_json_file(&path)
            .with_context(|| format!("Could not load config from {}", path))?,
        None => SolverConfig::default(),
    };
    info!("Solver config: {:?}", config);

    let mut object = GraspedObject::new(StaticBody::at(0.0, 1.0, 0.0), &config);
    let mut recorder = PoseRecorder::new(PoseRecorder::default_output_dir(), None);

    // Both hands close around the object on either side
    let left_rest = simulated_hand(1, Vector3::new(-0.06, 1.0, 0.0), 1.0);
    let right_rest = simulated_hand(2, Vector3::new(0.06, 1.0, 0.0), -1.0);
    object.on_hand_grasp(&left_rest)?;
    object.on_hand_grasp(&right_rest)?;

    let mut right_id = HandId(2);
    for frame in 0..FRAMES {
        let t = frame as f64 * FRAME_DT;

        // Carry the object along an arc while twisting it slowly
        let motion = Isometry3::from_parts(
            Translation3::new(0.2 * t.sin(), 0.1 * t, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4 * t),
        );
        let about_object = |hand: &HandFrame| -> HandFrame {
            let mut moved = hand.clone();
            for joint in moved.joints.iter_mut() {
                let local = *joint - Vector3::new(0.0, 1.0, 0.0);
                *joint = motion.transform_point(&local) + Vector3::new(0.0, 1.0, 0.0);
            }
            moved
        };

        if frame == LOST_AT {
            object.on_hand_lost_tracking(right_id)?;
        }
        if frame == REGAINED_AT {
            let new_id = HandId(3);
            let mut regained = about_object(&right_rest);
            regained.id = new_id;
            object.on_hand_regained_tracking(&regained, right_id)?;
            right_id = new_id;
        }

        let mut hands = vec![about_object(&left_rest)];
        if !(LOST_AT..REGAINED_AT).contains(&frame) {
            let mut right = about_object(&right_rest);
            right.id = right_id;
            hands.push(right);
        }

        if let Some(pose) = object.on_hands_hold(&hands)? {
            recorder.record(frame, t, object.grasping_hand_count(), &pose);
            if frame % 30 == 0 {
                info!(
                    "frame {:3}: {} hands, position {:?}, angle {:.3} rad",
                    frame,
                    hands.len(),
                    object.body().position.coords,
                    pose.rotation.angle()
                );
            }
        }
    }

    object.on_hand_release(HandId(1))?;
    object.on_hand_lost_tracking(right_id)?;
    object.on_hand_timeout(right_id)?;

    let csv_path = recorder.export_csv()?;
    let summary_path = recorder.export_json()?;
    info!("Recorded {} frames to {}", recorder.len(), csv_path.display());
    info!("Session summary written to {}", summary_path.display());

    Ok(())
}

// `side` mirrors the finger layout for left and right hands
fn simulated_hand(id: i32, palm: Vector3<f64>, side: f64) -> HandFrame {
    let joints: [Point3<f64>; JOINT_COUNT] = std::array::from_fn(|i| {
        let finger = (i / 4) as f64;
        let bone = (i % 4) as f64;
        let curl = 0.35 * bone;
        Point3::new(
            side * 0.02 * curl.cos(),
            0.02 * finger - 0.04,
            0.025 * (bone + 1.0) * curl.sin() + 0.01,
        ) + palm
    });
    HandFrame::new(id, joints)
}
