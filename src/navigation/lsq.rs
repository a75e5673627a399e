use log::debug;
use nalgebra::{DMatrix, DVector};

use super::{Input, Weights};
use crate::prelude::Error;

/// Weighted least squares, each epoch solved on its own.
#[derive(Debug, Clone)]
pub(crate) struct LSQState {
    /// number of iterations
    nth: u64,
}

impl LSQState {
    pub fn init() -> Self {
        Self { nth: 0 }
    }
    /// Returns (x, P) = ((HᵀWH)⁻¹HᵀWz, (HᵀWH)⁻¹)
    pub fn resolve(&mut self, input: &Input) -> Result<(DVector<f64>, DMatrix<f64>), Error> {
        let h_prime = input.h.transpose();

        let h_w = match &input.w {
            Weights::Vector(w) => {
                // HᵀW without forming W
                let mut h_w = h_prime.clone();
                for (j, w_j) in w.iter().enumerate() {
                    h_w.column_mut(j).scale_mut(*w_j);
                }
                h_w
            },
            Weights::Matrix(w) => &h_prime * w,
            Weights::PerSatellite(_) => {
                return Err(Error::InvalidRequest("per satellite weights must be expanded"));
            },
        };

        let p = (&h_w * &input.h)
            .try_inverse()
            .ok_or(Error::MatrixInversion)?;

        let x = &p * (h_w * &input.z);

        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::MatrixInversion);
        }

        self.nth += 1;
        debug!("lsq iteration #{} ({} measurements, {} unknowns)", self.nth, input.z.len(), x.len());
        Ok((x, p))
    }
}

#[cfg(test)]
mod test {
    use super::LSQState;
    use crate::navigation::{Input, Weights};
    use crate::prelude::Error;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn exact_solution() {
        let h = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        );
        let truth = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let z = &h * &truth;
        let mut lsq = LSQState::init();

        for w in [
            Weights::Vector(DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0])),
            Weights::Matrix(DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]))),
        ] {
            let (x, p) = lsq
                .resolve(&Input {
                    z: z.clone(),
                    h: h.clone(),
                    w,
                })
                .unwrap();
            assert!((x - &truth).amax() < 1.0E-9);
            assert_eq!(p.nrows(), 3);
        }
    }

    #[test]
    fn underdetermined() {
        let mut lsq = LSQState::init();
        let input = Input {
            z: DVector::zeros(2),
            h: DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            w: Weights::Vector(DVector::from_element(2, 1.0)),
        };
        assert_eq!(lsq.resolve(&input), Err(Error::MatrixInversion));
    }
}
