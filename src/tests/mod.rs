use crate::prelude::{
    Constellation, Duration, EpochRecord, Epoch, SatelliteObservation, Vector3, SV,
};
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand_distr::{Distribution, Normal};

mod e2e;

#[cfg(feature = "serde")]
mod cfg;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Epochs spaced by 30s
pub(crate) fn epochs() -> impl Iterator<Item = Epoch> {
    let t0 = Epoch::from_str("2020-06-25T00:00:00 GPST").unwrap();
    (0..).map(move |i| t0 + Duration::from_seconds(30.0 * i as f64))
}

/// Line of sight unit vector, from elevation and azimuth [deg]
fn line_of_sight(elevation: f64, azimuth: f64) -> Vector3<f64> {
    let (el, az) = (elevation.to_radians(), azimuth.to_radians());
    Vector3::new(el.cos() * az.sin(), el.cos() * az.cos(), el.sin())
}

/// Simulated satellite
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sat {
    pub sv: SV,
    pub elevation: f64,
    pub azimuth: f64,
    /// Phase ambiguity [m]
    pub ambiguity: f64,
}

impl Sat {
    pub fn new(sv: SV, elevation: f64, azimuth: f64, ambiguity: f64) -> Self {
        Self {
            sv,
            elevation,
            azimuth,
            ambiguity,
        }
    }
}

/// Measurement noise generator
pub(crate) struct Noise {
    pub rng: SmallRng,
    pub code: Normal<f64>,
    pub phase: Normal<f64>,
}

/// Static receiver observing constant geometries
#[derive(Debug, Clone)]
pub(crate) struct Scenario {
    /// Position correction [m]
    pub position: Vector3<f64>,
    /// Inter system bias of any non GPS constellation [m]
    pub isb: f64,
    /// Code weight of every satellite
    pub weight: f64,
}

impl Scenario {
    pub fn new(position: Vector3<f64>) -> Self {
        Self {
            position,
            isb: 0.0,
            weight: 1.0,
        }
    }
    /// Synthesizes the [EpochRecord] of these satellites at `t`
    pub fn record(
        &self,
        t: Epoch,
        clock: f64,
        sats: &[Sat],
        mut noise: Option<&mut Noise>,
    ) -> EpochRecord {
        let mut record = EpochRecord::new(t);
        for sat in sats {
            let partials = -line_of_sight(sat.elevation, sat.azimuth);
            let wet_mapping = 1.0 / sat.elevation.to_radians().sin();

            let mut range = partials.dot(&self.position) + clock;
            if sat.sv.constellation != Constellation::GPS {
                range += self.isb;
            }

            let (code_noise, phase_noise) = match noise.as_mut() {
                Some(noise) => (
                    noise.code.sample(&mut noise.rng),
                    noise.phase.sample(&mut noise.rng),
                ),
                None => (0.0, 0.0),
            };

            let obs = SatelliteObservation::new(
                sat.sv,
                range + code_noise,
                range + sat.ambiguity + phase_noise,
                partials,
                wet_mapping,
            )
            .with_weight(self.weight);

            record.satellites.push(obs);
        }
        record
    }
}

pub(crate) fn gps(prn: u8) -> SV {
    SV::new(Constellation::GPS, prn)
}

pub(crate) fn galileo(prn: u8) -> SV {
    SV::new(Constellation::Galileo, prn)
}

pub(crate) fn beidou(prn: u8) -> SV {
    SV::new(Constellation::BeiDou, prn)
}

/// Four GPS satellites, well spread
pub(crate) fn four_sats() -> Vec<Sat> {
    vec![
        Sat::new(gps(1), 90.0, 0.0, 3.2),
        Sat::new(gps(2), 40.0, 0.0, -7.5),
        Sat::new(gps(3), 35.0, 120.0, 11.0),
        Sat::new(gps(4), 30.0, 240.0, 0.4),
    ]
}

/// Six GPS satellites, well spread
pub(crate) fn six_sats() -> Vec<Sat> {
    let mut sats = four_sats();
    sats.push(Sat::new(gps(5), 60.0, 300.0, -2.1));
    sats.push(Sat::new(gps(6), 20.0, 75.0, 5.6));
    sats
}
