use rand::{rngs::SmallRng, SeedableRng};
use rand_distr::Normal;

use crate::prelude::{Config, Solver, StochasticModel, Vector3};
use crate::tests::{epochs, four_sats, init_logger, Noise, Scenario};

#[test]
fn static_receiver() {
    init_logger();

    let mut cfg = Config::default().with_convergence_window(3);
    cfg.convergence.max_sigma_m = 1.0;
    // constant geometry: troposphere cannot be told apart from the clock
    cfg.tropo_model = StochasticModel::Constant;
    cfg.priors.tropo_variance = 1.0E-6;

    let mut scenario = Scenario::new(Vector3::new(1.5, -2.0, 0.8));
    scenario.weight = 25.0;

    let mut noise = Noise {
        rng: SmallRng::seed_from_u64(0x5eed),
        code: Normal::new(0.0, 0.2).unwrap(),
        phase: Normal::new(0.0, 0.002).unwrap(),
    };

    let sats = four_sats();
    let mut solver = Solver::new("STAT", cfg);

    let mut sigma_3d = f64::MAX;

    for (k, t) in epochs().take(10).enumerate() {
        let mut record = scenario.record(t, 12.0 + k as f64, &sats, Some(&mut noise));
        let solution = solver.process(&mut record).unwrap();

        assert_eq!(solution.epoch, t);
        assert_eq!(solution.satellites, 4);
        assert_eq!(solution.ambiguities.len(), 4);
        assert_eq!(solution.converged, k >= 2, "epoch #{}", k);

        // formal precision improves as phase accumulates
        assert!(solution.sigma_3d() <= sigma_3d + 1.0E-9);
        sigma_3d = solution.sigma_3d();

        for obs in record.satellites.iter() {
            assert!(obs.postfit_code_m().unwrap().abs() < 1.0);
            assert!(obs.postfit_phase_m().unwrap().abs() < 0.1);
        }

        if k == 9 {
            for i in 0..3 {
                let err = (solution.position[i] - scenario.position[i]).abs();
                assert!(err < 1.0, "axis #{} error {}", i, err);
            }
        }
    }

    assert!(sigma_3d < 0.3, "final sigma {}", sigma_3d);
    assert_eq!(solver.converged(), Ok(true));
    assert_eq!(solver.ttfc(), &[60.0]);
}
