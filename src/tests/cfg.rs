use crate::prelude::{Config, Constellation, CoordinateFrame, Filter, StochasticModel};

#[test]
fn partial_config() {
    let content = r#"
    {
        "frame": "NEU",
        "filter": "LSQ",
        "constellations": ["GPS", "Galileo"],
        "tropo_model": { "RandomWalk": { "q_prime": 1.0E-8 } },
        "clock_model": { "WhiteNoise": { "sigma": 1000.0 } },
        "convergence": { "window": 20 },
        "priors": { "isb_variance": 100.0 }
    }"#;

    let cfg: Config = serde_json::from_str(content).unwrap();
    let default = Config::default();

    assert_eq!(cfg.frame, CoordinateFrame::NEU);
    assert_eq!(cfg.filter, Filter::LSQ);
    assert_eq!(
        cfg.constellations,
        vec![Constellation::GPS, Constellation::Galileo]
    );
    assert_eq!(cfg.tropo_model, StochasticModel::random_walk(1.0E-8));
    assert_eq!(cfg.clock_model, StochasticModel::white_noise(1000.0));
    assert_eq!(cfg.convergence.window, 20);
    assert_eq!(cfg.convergence.max_sigma_m, default.convergence.max_sigma_m);
    assert_eq!(cfg.priors.isb_variance, 100.0);
    assert_eq!(cfg.priors.clock_variance, default.priors.clock_variance);
    assert_eq!(cfg.weight_factor, default.weight_factor);
    assert_eq!(cfg.x_model, StochasticModel::Constant);
    assert!(cfg.kinematic.is_none());
}

#[test]
fn kinematic_config() {
    let content = r#"{ "kinematic": { "sigma_z": 10.0 } }"#;
    let cfg: Config = serde_json::from_str(content).unwrap();
    let kinematic = cfg.kinematic.unwrap();
    assert_eq!(kinematic.sigma_x, 100.0);
    assert_eq!(kinematic.sigma_z, 10.0);
}
