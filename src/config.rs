use std::path::{Path, PathBuf};

use config::{Config, ConfigError, File, FileFormat};
use occgrid_geometry::{Cell, Pose};
use occgrid_navigation::{
    Connectivity, CostPolicy, Heuristic, LoadOptions, NavigationError, PlannerConfig,
    ProximityPenalty, SensorDescription, UnknownCellPolicy,
};
use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub map: MapSettings,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub paths: Vec<PathQuery>,
    #[serde(default)]
    pub scans: Vec<ScanQuery>,
}

/// The `[map]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    /// PGM file; relative paths are taken from the config file's directory.
    pub image: PathBuf,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// `[x, y, yaw]` of the image's bottom-left corner.
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default = "default_occupied_thresh")]
    pub occupied_thresh: f64,
    #[serde(default = "default_free_thresh")]
    pub free_thresh: f64,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub inflation_radius: f64,
}

fn default_resolution() -> f64 {
    LoadOptions::default().resolution
}

fn default_occupied_thresh() -> f64 {
    LoadOptions::default().occupied_thresh
}

fn default_free_thresh() -> f64 {
    LoadOptions::default().free_thresh
}

impl MapSettings {
    pub fn load_options(&self) -> LoadOptions {
        let [x, y, yaw] = self.origin;
        LoadOptions {
            resolution: self.resolution,
            origin: Pose::from_xy_yaw(x, y, yaw),
            occupied_thresh: self.occupied_thresh,
            free_thresh: self.free_thresh,
            negate: self.negate,
        }
    }

    /// Path of the map image, resolved against `config_path`'s directory.
    pub fn image_path(&self, config_path: &Path) -> PathBuf {
        if self.image.is_absolute() {
            return self.image.clone();
        }
        config_path
            .parent()
            .map_or_else(|| self.image.clone(), |dir| dir.join(&self.image))
    }
}

/// The `[planner]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub connectivity: Connectivity,
    pub heuristic: Heuristic,
    pub diagonal_cost: f64,
    pub unknown_traversable: bool,
    pub unknown_penalty: f64,
    pub proximity_radius: f64,
    pub proximity_weight: f64,
    pub allow_corner_cutting: bool,
    pub max_expansions: Option<usize>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        let config = PlannerConfig::default();
        Self {
            connectivity: config.connectivity,
            heuristic: config.heuristic,
            diagonal_cost: config.cost_policy.diagonal_cost,
            unknown_traversable: false,
            unknown_penalty: 0.0,
            proximity_radius: 0.0,
            proximity_weight: 0.0,
            allow_corner_cutting: false,
            max_expansions: None,
        }
    }
}

impl PlannerSettings {
    pub fn to_planner_config(&self) -> PlannerConfig {
        let unknown = if self.unknown_traversable {
            UnknownCellPolicy::Traversable {
                penalty: self.unknown_penalty,
            }
        } else {
            UnknownCellPolicy::Impassable
        };
        let proximity = (self.proximity_radius > 0.0 && self.proximity_weight > 0.0).then_some(
            ProximityPenalty {
                radius: self.proximity_radius,
                weight: self.proximity_weight,
            },
        );

        PlannerConfig {
            connectivity: self.connectivity,
            heuristic: self.heuristic,
            max_expansions: self.max_expansions,
            cost_policy: CostPolicy {
                diagonal_cost: self.diagonal_cost,
                unknown,
                proximity,
                allow_corner_cutting: self.allow_corner_cutting,
                ..CostPolicy::default()
            },
        }
    }
}

/// One `[[paths]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PathQuery {
    pub start: [i32; 2],
    pub goal: [i32; 2],
}

impl PathQuery {
    pub fn cells(&self) -> (Cell, Cell) {
        (
            Cell::new(self.start[0], self.start[1]),
            Cell::new(self.goal[0], self.goal[1]),
        )
    }
}

/// One `[[scans]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanQuery {
    /// `[x, y, yaw]` of the sensor.
    pub pose: [f64; 3],
    pub angle_min: f64,
    pub angle_max: f64,
    pub angle_increment: f64,
    #[serde(default)]
    pub range_min: f64,
    pub range_max: f64,
    #[serde(default)]
    pub unknown_as_occupied: bool,
}

impl ScanQuery {
    pub fn pose(&self) -> Pose {
        let [x, y, yaw] = self.pose;
        Pose::from_xy_yaw(x, y, yaw)
    }

    pub fn sensor(&self) -> Result<SensorDescription, NavigationError> {
        SensorDescription::from_angle_range(
            self.angle_min,
            self.angle_max,
            self.angle_increment,
            self.range_min,
            self.range_max,
        )
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", path.display());

    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .build()
        .and_then(|config| config.try_deserialize::<AppConfig>());

    match settings {
        Ok(config) => {
            info!(
                paths = config.paths.len(),
                scans = config.scans.len(),
                "Successfully loaded configuration"
            );
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
