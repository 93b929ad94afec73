//! Sensor emulation. Each registered sensor produces one reading per tick,
//! keyed by its name, which the controller consumes.

use crate::{
    rng::{RngBank, RngSlot, SubsystemRng},
    types::{RigidTransform, Vec3},
    world::PhysicsWorld,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colour of rigid object `i` is `OBJECT_COLORS[i % OBJECT_COLORS.len()]`.
pub const OBJECT_COLORS: [[f32; 3]; 6] = [
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectObservation {
    pub index:    usize,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub color:  [f32; 3],
    /// Centre in pixels.
    pub x:      f64,
    pub y:      f64,
    pub width:  f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorReading {
    Objects { objects: Vec<ObjectObservation> },
    Blobs { blobs: Vec<Blob> },
}

pub type SensorReadings = BTreeMap<String, SensorReading>;

pub trait Sensor {
    fn name(&self) -> &'static str;
    fn emulate(&mut self, world: &dyn PhysicsWorld) -> SensorReading;
}

/// Perfect knowledge of every rigid object's position and velocity.
#[derive(Debug, Default)]
pub struct OmniscientObjectSensor;

impl Sensor for OmniscientObjectSensor {
    fn name(&self) -> &'static str { "omniscient" }

    fn emulate(&mut self, world: &dyn PhysicsWorld) -> SensorReading {
        let objects = world
            .rigid_object_ids()
            .into_iter()
            .enumerate()
            .map(|(index, id)| ObjectObservation {
                index,
                position: world.body_transform(id).translation,
                velocity: world.body_velocity(id).linear,
            })
            .collect();
        SensorReading::Objects { objects }
    }
}

/// Pinhole camera that reports one coloured blob per visible rigid object.
pub struct CameraColorDetectorSensor {
    pub t_sensor:    RigidTransform,
    pub width:       u32,
    pub height:      u32,
    /// Horizontal field of view in radians.
    pub fov:         f64,
    /// Uniform pixel noise amplitude applied to blob centres.
    pub pixel_noise: f64,
    rng:             SubsystemRng,
}

impl CameraColorDetectorSensor {
    pub fn new(rng: SubsystemRng) -> Self {
        Self {
            // On the ground near the robot, looking down the field.
            t_sensor: RigidTransform {
                rotation:    [0.0, -1.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0],
                translation: [-1.5, -0.5, 0.25],
            },
            width:       320,
            height:      240,
            fov:         std::f64::consts::FRAC_PI_2,
            pixel_noise: 0.0,
            rng,
        }
    }

    pub fn with_pixel_noise(mut self, amplitude: f64) -> Self {
        self.pixel_noise = amplitude;
        self
    }

    fn focal_length(&self) -> f64 {
        (self.width as f64 / 2.0) / (self.fov / 2.0).tan()
    }

    /// Blob for a sphere at `center`, or None when it is behind the camera
    /// or its centre falls outside the image.
    fn project(&self, center: Vec3, radius: f64, color: [f32; 3]) -> Option<Blob> {
        const NEAR: f64 = 0.05;
        let local = self.t_sensor.inverse_apply(center);
        if local[2] <= NEAR {
            return None;
        }
        let f = self.focal_length();
        let x = self.width as f64 / 2.0 + f * local[0] / local[2];
        let y = self.height as f64 / 2.0 + f * local[1] / local[2];
        if !(0.0..self.width as f64).contains(&x) || !(0.0..self.height as f64).contains(&y) {
            return None;
        }
        let size = 2.0 * f * radius / local[2];
        Some(Blob { color, x, y, width: size, height: size })
    }
}

impl Sensor for CameraColorDetectorSensor {
    fn name(&self) -> &'static str { "blobdetector" }

    fn emulate(&mut self, world: &dyn PhysicsWorld) -> SensorReading {
        // The sandbox does not expose radii; detection assumes ball-sized objects.
        const APPARENT_RADIUS: f64 = 0.1;
        let mut blobs = Vec::new();
        for (index, id) in world.rigid_object_ids().into_iter().enumerate() {
            let color = OBJECT_COLORS[index % OBJECT_COLORS.len()];
            let center = world.body_transform(id).translation;
            if let Some(mut blob) = self.project(center, APPARENT_RADIUS, color) {
                if self.pixel_noise > 0.0 {
                    blob.x += self.rng.uniform(-self.pixel_noise, self.pixel_noise);
                    blob.y += self.rng.uniform(-self.pixel_noise, self.pixel_noise);
                }
                blobs.push(blob);
            }
        }
        SensorReading::Blobs { blobs }
    }
}

/// Registered sensors, emulated in name order.
#[derive(Default)]
pub struct SensorBank {
    sensors: BTreeMap<&'static str, Box<dyn Sensor>>,
}

impl SensorBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock setup: either the omniscient sensor or the blob detector.
    /// `pixel_noise` only applies to the blob detector.
    pub fn standard(omniscient: bool, pixel_noise: f64, rng_bank: &RngBank) -> Self {
        let mut bank = Self::new();
        if omniscient {
            bank.register(Box::new(OmniscientObjectSensor));
        } else {
            let camera = CameraColorDetectorSensor::new(rng_bank.for_slot(RngSlot::SensorNoise))
                .with_pixel_noise(pixel_noise);
            bank.register(Box::new(camera));
        }
        bank
    }

    pub fn register(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.insert(sensor.name(), sensor);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sensors.keys().copied().collect()
    }

    pub fn emulate_all(&mut self, world: &dyn PhysicsWorld) -> SensorReadings {
        self.sensors
            .iter_mut()
            .map(|(name, sensor)| (name.to_string(), sensor.emulate(world)))
            .collect()
    }
}
