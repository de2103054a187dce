use serde::{Deserialize, Serialize};
use tokyo_motion::{
    geometry::CarPose,
    vehicle::{StateMachine, Vehicle},
};

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDto {
    pub id: String,
    pub kind: VehicleKind,
    pub railway: Option<String>,
    pub phase: String,
    pub progress: f64,
    pub delay_ms: Option<f64>,
    pub from_station: Option<String>,
    pub to_station: Option<String>,
    pub cars: Vec<CarPose>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Train,
    Flight,
}

impl From<&Vehicle> for VehicleDto {
    fn from(vehicle: &Vehicle) -> Self {
        let pose = vehicle.current_pose();
        let train = vehicle.as_train();
        Self {
            id: vehicle.id().to_string(),
            kind: match vehicle {
                Vehicle::Train(_) => VehicleKind::Train,
                Vehicle::Flight(_) => VehicleKind::Flight,
            },
            railway: vehicle.railway().map(str::to_string),
            phase: format!("{:?}", vehicle.phase()),
            progress: pose.progress,
            delay_ms: train.map(|train| train.delay().as_millis()),
            from_station: train
                .and_then(|train| train.departure_station())
                .map(|id| id.to_string()),
            to_station: train
                .and_then(|train| train.arrival_station())
                .map(|id| id.to_string()),
            cars: pose.cars.clone(),
        }
    }
}
