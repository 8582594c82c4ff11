//! Butcher tableaux for the explicit fixed-step methods.
//!
//! Each method is a lower-triangular explicit Runge-Kutta scheme:
//!
//! ```text
//! k_i    = f(x_n + c_i*h, y_n + h * sum_{j<i} a_ij * k_j)
//! y_n+1  = y_n + h * sum_i b_i * k_i
//! ```
//!
//! The Dormand-Prince table is the 5th-order half of DOPRI5(4) from
//! Dormand & Prince (1980), "A family of embedded Runge-Kutta formulae",
//! J. Comp. Appl. Math. 6(1). The seventh (FSAL) stage has a zero weight in
//! the 5th-order solution and the embedded 4th-order weights are only used
//! for error estimation, so neither is stored here.

/// Coefficients of one explicit Runge-Kutta method.
#[derive(Debug, Clone, Copy)]
pub struct Tableau {
    /// Nodes: stage `i` is evaluated at `x + c[i]*h`
    pub c: &'static [f64],
    /// Strictly lower-triangular stage matrix, row `i` has `i` entries
    pub a: &'static [&'static [f64]],
    /// Weights of the stage derivatives in the update
    pub b: &'static [f64],
}

impl Tableau {
    /// Number of stages (derivative evaluations per step).
    pub const fn stages(&self) -> usize {
        self.b.len()
    }
}

/// Forward Euler: one stage, first order.
pub const EULER: Tableau = Tableau {
    c: &[0.0],
    a: &[&[]],
    b: &[1.0],
};

/// Explicit midpoint: slope taken at the half step, second order.
pub const MIDPOINT: Tableau = Tableau {
    c: &[0.0, 0.5],
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
};

/// Heun (improved Euler): Euler predictor, trapezoidal corrector.
pub const HEUN: Tableau = Tableau {
    c: &[0.0, 1.0],
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
};

/// Classical 4-stage Runge-Kutta, weights 1,2,2,1 / 6.
pub const RUNGE_KUTTA4: Tableau = Tableau {
    c: &[0.0, 0.5, 0.5, 1.0],
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 2.0 / 6.0, 2.0 / 6.0, 1.0 / 6.0],
};

/// Dormand-Prince, first six stages with the 5th-order weights.
pub const DORMAND_PRINCE: Tableau = Tableau {
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0],
    a: &[
        &[],
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-14;

    const ALL: [(&str, Tableau); 5] = [
        ("euler", EULER),
        ("midpoint", MIDPOINT),
        ("heun", HEUN),
        ("rk4", RUNGE_KUTTA4),
        ("dopri5", DORMAND_PRINCE),
    ];

    #[test]
    fn test_shapes_are_lower_triangular() {
        for (name, t) in ALL {
            assert_eq!(t.c.len(), t.stages(), "{name}: c length");
            assert_eq!(t.a.len(), t.stages(), "{name}: a rows");
            for (i, row) in t.a.iter().enumerate() {
                assert_eq!(row.len(), i, "{name}: row {i} length");
            }
        }
    }

    #[test]
    fn test_row_sums_match_nodes() {
        for (name, t) in ALL {
            for (i, row) in t.a.iter().enumerate() {
                let row_sum: f64 = row.iter().sum();
                assert!(
                    (row_sum - t.c[i]).abs() < TOL,
                    "{name}: row {i} sum = {row_sum}, expected c[{i}] = {}",
                    t.c[i]
                );
            }
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (name, t) in ALL {
            let b_sum: f64 = t.b.iter().sum();
            assert!((b_sum - 1.0).abs() < TOL, "{name}: weights sum to {b_sum}");
        }
    }

    #[test]
    fn test_stage_counts() {
        let stages: Vec<usize> = ALL.iter().map(|(_, t)| t.stages()).collect();
        assert_eq!(stages, vec![1, 2, 2, 4, 6]);
    }

    #[test]
    fn test_dormand_prince_fifth_order_conditions() {
        let t = DORMAND_PRINCE;
        // sum b_i c_i^(k-1) = 1/k for k = 1..5
        for k in 1..=5 {
            let lhs: f64 = t
                .b
                .iter()
                .zip(t.c)
                .map(|(b, c)| b * c.powi(k - 1))
                .sum();
            assert!(
                (lhs - 1.0 / k as f64).abs() < TOL,
                "quadrature condition k={k}: {lhs}"
            );
        }
    }

    #[test]
    fn test_specific_coefficients() {
        assert_eq!(DORMAND_PRINCE.b[0], 35.0 / 384.0);
        assert_eq!(DORMAND_PRINCE.b[1], 0.0);
        assert_eq!(DORMAND_PRINCE.b[4], -2187.0 / 6784.0);
        assert_eq!(DORMAND_PRINCE.c[4], 8.0 / 9.0);
        assert_eq!(RUNGE_KUTTA4.b[1], 1.0 / 3.0);
    }
}
