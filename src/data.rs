// src/data.rs - Session recording of solved holding poses
use crate::kabsch::AlignmentResult;
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct PoseRecord {
    timestamp: f64,
    frame: u64,
    grasping_hands: usize,

    translation_x: f64,
    translation_y: f64,
    translation_z: f64,

    // Quaternion, scalar last
    rotation_i: f64,
    rotation_j: f64,
    rotation_k: f64,
    rotation_w: f64,
    rotation_angle_deg: f64,
}

#[derive(Debug, Serialize)]
struct SessionSummary<'a> {
    session: &'a str,
    frames: usize,
    duration: f64,
    max_translation: f64,
    max_rotation_deg: f64,
}

pub struct PoseRecorder {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<PoseRecord>,
}

impl PoseRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
        }
    }

    pub fn default_output_dir() -> PathBuf {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("GraspPose")))
            .unwrap_or_else(|| PathBuf::from("./output"))
    }

    pub fn record(&mut self, frame: u64, timestamp: f64, grasping_hands: usize, pose: &AlignmentResult) {
        let q = pose.rotation.quaternion();
        self.records.push(PoseRecord {
            timestamp,
            frame,
            grasping_hands,
            translation_x: pose.translation.x,
            translation_y: pose.translation.y,
            translation_z: pose.translation.z,
            rotation_i: q.i,
            rotation_j: q.j,
            rotation_k: q.k,
            rotation_w: q.w,
            rotation_angle_deg: pose.rotation.angle().to_degrees(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("poses.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn export_json(&self) -> Result<PathBuf> {
        let json_path = self.session_dir().join("summary.json");

        if let Some(parent) = json_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let duration = match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        };
        let summary = SessionSummary {
            session: &self.session_name,
            frames: self.records.len(),
            duration,
            max_translation: self
                .records
                .iter()
                .map(|r| (r.translation_x.powi(2) + r.translation_y.powi(2) + r.translation_z.powi(2)).sqrt())
                .fold(0.0, f64::max),
            max_rotation_deg: self
                .records
                .iter()
                .map(|r| r.rotation_angle_deg)
                .fold(0.0, f64::max),
        };

        std::fs::write(&json_path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        Ok(json_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};
    use tempfile::tempdir;

    fn sample_pose(x: f64) -> AlignmentResult {
        AlignmentResult {
            rotation: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
            translation: Vector3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn test_export_csv_writes_every_frame() {
        let tmp = tempdir().unwrap();
        let mut recorder = PoseRecorder::new(tmp.path(), Some("unit".to_string()));
        recorder.record(0, 0.0, 1, &sample_pose(0.1));
        recorder.record(1, 0.033, 2, &sample_pose(0.2));

        let path = recorder.export_csv().unwrap();
        assert_eq!(path, tmp.path().join("unit").join("poses.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "timestamp");
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn test_export_json_summary() {
        let tmp = tempdir().unwrap();
        let mut recorder = PoseRecorder::new(tmp.path(), Some("summary".to_string()));
        recorder.record(0, 1.0, 1, &sample_pose(0.1));
        recorder.record(1, 3.0, 1, &sample_pose(-0.4));

        let path = recorder.export_json().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(value["frames"], 2);
        assert!((value["duration"].as_f64().unwrap() - 2.0).abs() < 1e-12);
        assert!((value["max_translation"].as_f64().unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_default_session_name() {
        let recorder = PoseRecorder::new("out", None);
        assert!(recorder.session_dir().to_string_lossy().contains("session_"));
        assert!(recorder.is_empty());
    }
}
