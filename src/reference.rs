// src/reference.rs - Per-hand reference points in object-local space
use crate::error::{PoseError, Result};
use crate::hand::{joint_index, Bone, Finger, HandId, JOINT_COUNT};
use nalgebra::{Isometry3, Point3};
use std::collections::HashMap;
use tracing::{debug, error, trace};

#[derive(Debug, Clone)]
pub struct ReferencePointTable {
    hand_id: HandId,
    local_points: [Point3<f64>; JOINT_COUNT],
    inverse_transform: Isometry3<f64>,
}

impl ReferencePointTable {
    fn blank() -> Self {
        Self {
            hand_id: HandId(-1),
            local_points: [Point3::origin(); JOINT_COUNT],
            inverse_transform: Isometry3::identity(),
        }
    }

    // Overwrites every slot; a recycled table carries nothing over.
    fn fill(
        &mut self,
        hand_id: HandId,
        world_joints: &[Point3<f64>; JOINT_COUNT],
        inverse_transform: &Isometry3<f64>,
    ) {
        self.hand_id = hand_id;
        self.inverse_transform = *inverse_transform;
        for (local, world) in self.local_points.iter_mut().zip(world_joints.iter()) {
            *local = inverse_transform.transform_point(world);
        }
    }

    pub fn hand_id(&self) -> HandId {
        self.hand_id
    }

    pub fn inverse_transform(&self) -> &Isometry3<f64> {
        &self.inverse_transform
    }

    #[inline]
    pub fn local_point(&self, finger: Finger, bone: Bone) -> Point3<f64> {
        self.local_points[joint_index(finger, bone)]
    }

    pub fn local_points(&self) -> &[Point3<f64>; JOINT_COUNT] {
        &self.local_points
    }
}

// Boxed so that pooling and re-keying never touch the allocator
#[derive(Debug, Default)]
pub struct ReferencePointStore {
    active: HashMap<HandId, Box<ReferencePointTable>>,
    pool: Vec<Box<ReferencePointTable>>,
}

impl ReferencePointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool_capacity(capacity: usize) -> Self {
        Self {
            active: HashMap::with_capacity(capacity),
            pool: (0..capacity)
                .map(|_| Box::new(ReferencePointTable::blank()))
                .collect(),
        }
    }

    pub fn begin_grasp(
        &mut self,
        hand_id: HandId,
        world_joints: &[Point3<f64>; JOINT_COUNT],
        inverse_transform: &Isometry3<f64>,
    ) -> Result<&ReferencePointTable> {
        if self.active.contains_key(&hand_id) {
            error!("begin_grasp: hand {} already has a reference table", hand_id);
            return Err(PoseError::HandAlreadyGrasping(hand_id));
        }

        let mut table = match self.pool.pop() {
            Some(table) => {
                trace!("reusing pooled reference table for hand {}", hand_id);
                table
            }
            None => {
                trace!("allocating reference table for hand {}", hand_id);
                Box::new(ReferencePointTable::blank())
            }
        };
        table.fill(hand_id, world_joints, inverse_transform);

        debug!(
            "hand {} began grasp ({} active, {} pooled)",
            hand_id,
            self.active.len() + 1,
            self.pool.len()
        );
        let table: &ReferencePointTable = self.active.entry(hand_id).or_insert(table);
        Ok(table)
    }

    pub fn transfer(&mut self, old_id: HandId, new_id: HandId) -> Result<()> {
        if !self.active.contains_key(&old_id) {
            error!("transfer: hand {} has no reference table", old_id);
            return Err(PoseError::HandNotGrasping(old_id));
        }
        if old_id == new_id {
            return Ok(());
        }
        if self.active.contains_key(&new_id) {
            error!("transfer: target hand {} already has a reference table", new_id);
            return Err(PoseError::HandAlreadyGrasping(new_id));
        }

        if let Some(mut table) = self.active.remove(&old_id) {
            table.hand_id = new_id;
            self.active.insert(new_id, table);
        }
        debug!("transferred reference table {} -> {}", old_id, new_id);
        Ok(())
    }

    pub fn get_local_point(&self, hand_id: HandId, finger: Finger, bone: Bone) -> Result<Point3<f64>> {
        self.table(hand_id).map(|table| table.local_point(finger, bone))
    }

    pub fn table(&self, hand_id: HandId) -> Result<&ReferencePointTable> {
        match self.active.get(&hand_id) {
            Some(table) => Ok(table.as_ref()),
            None => {
                error!("lookup: hand {} has no reference table", hand_id);
                Err(PoseError::HandNotGrasping(hand_id))
            }
        }
    }

    pub fn end_grasp(&mut self, hand_id: HandId) -> Result<()> {
        let table = self.active.remove(&hand_id).ok_or_else(|| {
            error!("end_grasp: hand {} has no reference table", hand_id);
            PoseError::HandNotGrasping(hand_id)
        })?;
        self.pool.push(table);

        debug!(
            "hand {} ended grasp ({} active, {} pooled)",
            hand_id,
            self.active.len(),
            self.pool.len()
        );
        Ok(())
    }

    pub fn contains(&self, hand_id: HandId) -> bool {
        self.active.contains_key(&hand_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    pub fn hand_ids(&self) -> impl Iterator<Item = HandId> + '_ {
        self.active.keys().copied()
    }
}
