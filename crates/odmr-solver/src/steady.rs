//! Stationary distribution from the generator's null space.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::population::Reference;

/// Unique `P` with `W P = 0` and `sum(P) = 1`.
///
/// Singular values at or below `null_space_tol * sigma_max` count as zero.
/// A null space of dimension above one means the chain is reducible and
/// the stationary state depends on the initial condition; that case is an
/// error rather than an arbitrary pick.
pub fn null_vector(w: &DMatrix<f64>, cfg: &SolverConfig) -> SolverResult<DVector<f64>> {
    let n = w.nrows();
    if n == 1 {
        return Ok(DVector::from_element(1, 1.0));
    }

    let svd = w.clone().svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| SolverError::NumericalInstability {
        what: "SVD did not produce right singular vectors".to_string(),
    })?;
    let sigma = &svd.singular_values;
    let sigma_max = sigma.max();
    let threshold = cfg.null_space_tol * sigma_max;
    let null_dim = sigma.iter().filter(|&&s| s <= threshold).count();
    debug!(n, null_dim, sigma_max, "Steady-state null space");

    if null_dim > 1 {
        return Err(SolverError::DegenerateSteadyState {
            null_dim,
            tol: cfg.null_space_tol,
        });
    }
    if null_dim == 0 {
        return Err(SolverError::NumericalInstability {
            what: format!(
                "generator has no null space (smallest singular value {:e}); columns must sum to zero",
                sigma.min()
            ),
        });
    }

    let idx = sigma.imin();
    let v: DVector<f64> = v_t.row(idx).transpose();
    let total = v.sum();
    if total.abs() <= f64::EPSILON * v.amax() || !total.is_finite() {
        return Err(SolverError::NumericalInstability {
            what: "null vector sums to zero and cannot be normalised".to_string(),
        });
    }
    let mut p = v / total;

    let scale = w.amax();
    let residual = (w * &p).amax();
    if residual > cfg.residual_tol * scale {
        return Err(SolverError::NumericalInstability {
            what: format!("steady-state residual {residual:e} exceeds {:e}", cfg.residual_tol * scale),
        });
    }

    let reference = Reference {
        sum: 1.0,
        l1: 1.0,
        check_negative: true,
    };
    cfg.population.apply(&mut p, &reference)?;
    let total = p.sum();
    Ok(p / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_pair_is_uniform() {
        let w = DMatrix::from_row_slice(2, 2, &[-1e6, 1e6, 1e6, -1e6]);
        let p = null_vector(&w, &SolverConfig::default()).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn detailed_balance_ratio() {
        // 0 -> 1 at 3, 1 -> 0 at 1: P1 / P0 = 3.
        let w = DMatrix::from_row_slice(2, 2, &[-3.0, 1.0, 3.0, -1.0]);
        let p = null_vector(&w, &SolverConfig::default()).unwrap();
        assert!((p[0] - 0.25).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn single_state_is_trivially_stationary() {
        let w = DMatrix::zeros(1, 1);
        let p = null_vector(&w, &SolverConfig::default()).unwrap();
        assert_eq!(p.as_slice(), &[1.0]);
    }

    #[test]
    fn disconnected_pairs_are_degenerate() {
        let mut w = DMatrix::zeros(4, 4);
        for (a, b) in [(0, 1), (2, 3)] {
            w[(a, a)] = -1.0;
            w[(b, a)] = 1.0;
            w[(b, b)] = -1.0;
            w[(a, b)] = 1.0;
        }
        assert!(matches!(
            null_vector(&w, &SolverConfig::default()),
            Err(SolverError::DegenerateSteadyState { null_dim: 2, .. })
        ));
    }

    #[test]
    fn near_reducible_chain_follows_null_space_tol() {
        // Two fast pairs (rate 1) joined by a weak link: the second singular
        // value sits near `eps`, well clear of rounding noise.
        let eps = 1e-8;
        let mut w = DMatrix::zeros(4, 4);
        for (from, to, rate) in [
            (0, 1, 1.0),
            (1, 0, 1.0),
            (2, 3, 1.0),
            (3, 2, 1.0),
            (1, 2, eps),
            (2, 1, eps),
        ] {
            w[(to, from)] += rate;
            w[(from, from)] -= rate;
        }

        let p = null_vector(&w, &SolverConfig::default()).unwrap();
        for &x in p.iter() {
            assert!((x - 0.25).abs() < 1e-6, "{p}");
        }
        assert!((p.sum() - 1.0).abs() < 1e-12);

        let coarse = SolverConfig {
            null_space_tol: 1e-6,
            ..SolverConfig::default()
        };
        match null_vector(&w, &coarse) {
            Err(SolverError::DegenerateSteadyState { null_dim, tol }) => {
                assert_eq!(null_dim, 2);
                assert_eq!(tol, 1e-6);
            }
            other => panic!("expected a degenerate steady state, got {other:?}"),
        }
    }

    #[test]
    fn no_transitions_is_degenerate() {
        let w = DMatrix::zeros(3, 3);
        assert!(matches!(
            null_vector(&w, &SolverConfig::default()),
            Err(SolverError::DegenerateSteadyState { null_dim: 3, .. })
        ));
    }

    #[test]
    fn absorbing_state_collects_everything() {
        // 0 -> 1 -> 2, nothing leaves 2.
        let w = DMatrix::from_row_slice(3, 3, &[-1.0, 0.0, 0.0, 1.0, -2.0, 0.0, 0.0, 2.0, 0.0]);
        let p = null_vector(&w, &SolverConfig::default()).unwrap();
        assert!((p[2] - 1.0).abs() < 1e-12);
        assert!(p[0].abs() < 1e-12 && p[1].abs() < 1e-12);
    }
}
