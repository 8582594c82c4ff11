//! Elementwise arithmetic over state vectors.
//!
//! Every stepper builds its stage states out of these two operations. Both
//! allocate a fresh result and leave their inputs untouched.

/// Multiply every component of `v` by `c`.
pub fn scale(c: f64, v: &[f64]) -> Vec<f64> {
    v.iter().map(|vi| c * vi).collect()
}

/// Componentwise sum of two vectors of equal length.
///
/// # Panics
/// If `a` and `b` have different lengths. A mismatch means the caller
/// mixed states of different systems.
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(
        a.len(),
        b.len(),
        "vector length mismatch: {} vs {}",
        a.len(),
        b.len()
    );
    a.iter().zip(b).map(|(ai, bi)| ai + bi).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        assert_eq!(scale(2.0, &[1.0, -0.5, 3.0]), vec![2.0, -1.0, 6.0]);
        assert!(scale(4.0, &[]).is_empty());
    }

    #[test]
    fn test_add() {
        assert_eq!(add(&[1.0, 2.0], &[0.5, -2.0]), vec![1.5, 0.0]);
    }

    #[test]
    fn test_negated_sum_is_zero() {
        let vectors: [&[f64]; 3] = [&[1.0, 2.0, 3.0], &[-7.25, 1e300, 1e-300], &[0.1]];
        for v in vectors {
            let zero = add(&scale(-1.0, v), v);
            assert!(zero.iter().all(|&z| z == 0.0), "{:?} -> {:?}", v, zero);
        }
    }

    #[test]
    fn test_inputs_not_mutated() {
        let a = vec![1.0, 2.0];
        let b = vec![3.0, 4.0];
        let _ = add(&a, &b);
        let _ = scale(10.0, &a);
        assert_eq!(a, vec![1.0, 2.0]);
        assert_eq!(b, vec![3.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "vector length mismatch")]
    fn test_add_length_mismatch_panics() {
        add(&[1.0, 2.0], &[1.0]);
    }
}
