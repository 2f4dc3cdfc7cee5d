//! Row reduction of stoichiometry matrices.
//!
//! `echelon_decomposition` factors a (reactions x SOMs) matrix `A` with
//! nalgebra's LU (partial pivoting, `P·A = L·U`). nalgebra pivots on the
//! diagonal only and skips a column only when it is exactly zero, so for a
//! rank-deficient `A` two rows of its `U` can start in the same column. A
//! second, tolerance-aware elimination pass (`complete_echelon`) brings `U` to
//! row-echelon form: `P₂·U = L₂·U'`.
//! Every row of the echelon form is a linear combination of original
//! reactions; `lower_inverse = L₂⁻¹·P₂·L⁻¹·P` holds the coefficients
//! (`U' = lower_inverse·A`), so each reduced row can be traced back to the
//! reactions it was built from.
//! `reduced_echelon` continues to the reduced row-echelon form, carrying the
//! same bookkeeping in `transform` (`RREF = transform·A`).
//! Entries with magnitude below the tolerance are treated as exact zeros.
use crate::MassBalance::errors::MassBalanceError;
use log::debug;
use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub struct EchelonDecomposition {
    /// row i of P·A is row `permutation[i]` of A
    pub permutation: Vec<usize>,
    /// unit lower factor of the LU, padded to a square matrix
    pub lower: DMatrix<f64>,
    /// P₂ᵀ·L₂: maps the echelon form back to the upper factor of the LU
    pub completion: DMatrix<f64>,
    /// row-echelon form
    pub upper: DMatrix<f64>,
    pub lower_inverse: DMatrix<f64>,
    /// (row, column) of every pivot of `upper`, top to bottom
    pub pivots: Vec<(usize, usize)>,
}

impl EchelonDecomposition {
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }
    pub fn permutation_matrix(&self) -> DMatrix<f64> {
        permutation_matrix(&self.permutation)
    }
    /// Pᵀ·L·P₂ᵀ·L₂·U', which must give back the decomposed matrix
    pub fn reconstruct(&self) -> DMatrix<f64> {
        self.permutation_matrix().transpose() * &self.lower * &self.completion * &self.upper
    }
}

#[derive(Debug, Clone)]
pub struct ReducedEchelonForm {
    pub matrix: DMatrix<f64>,
    pub transform: DMatrix<f64>,
    pub pivots: Vec<(usize, usize)>,
}

/// P with P[(i, permutation[i])] = 1
pub fn permutation_matrix(permutation: &[usize]) -> DMatrix<f64> {
    let n = permutation.len();
    let mut p = DMatrix::zeros(n, n);
    for (i, &j) in permutation.iter().enumerate() {
        p[(i, j)] = 1.0;
    }
    p
}

/// sets every entry with |x| < tolerance to exactly zero
pub fn snap_to_zero(matrix: &mut DMatrix<f64>, tolerance: f64) {
    for value in matrix.iter_mut() {
        if value.abs() < tolerance {
            *value = 0.0;
        }
    }
}

fn all_finite(matrix: &DMatrix<f64>) -> bool {
    matrix.iter().all(|v| v.is_finite())
}

fn inverse_of_lower(lower: &DMatrix<f64>) -> Result<DMatrix<f64>, MassBalanceError> {
    let n = lower.nrows();
    lower
        .solve_lower_triangular(&DMatrix::identity(n, n))
        .ok_or_else(|| {
            MassBalanceError::ReductionInconclusive(
                "lower triangular factor is singular".to_string(),
            )
        })
}

/// Gaussian elimination with partial pivoting that skips columns whose
/// remaining entries are all below the tolerance. `upper` is reduced in place;
/// returns the row permutation, the unit lower factor and the pivots.
fn complete_echelon(
    upper: &mut DMatrix<f64>,
    tolerance: f64,
) -> (Vec<usize>, DMatrix<f64>, Vec<(usize, usize)>) {
    let (nrows, ncols) = upper.shape();
    let mut lower = DMatrix::<f64>::identity(nrows, nrows);
    let mut permutation: Vec<usize> = (0..nrows).collect();
    let mut pivots = Vec::new();

    let mut row = 0;
    for col in 0..ncols {
        if row >= nrows {
            break;
        }
        // largest magnitude in the column, first one on ties
        let mut pivot_row = row;
        let mut pivot_value = upper[(row, col)].abs();
        for i in row + 1..nrows {
            if upper[(i, col)].abs() > pivot_value {
                pivot_row = i;
                pivot_value = upper[(i, col)].abs();
            }
        }
        if pivot_value < tolerance {
            for i in row..nrows {
                upper[(i, col)] = 0.0;
            }
            continue;
        }
        if pivot_row != row {
            upper.swap_rows(row, pivot_row);
            permutation.swap(row, pivot_row);
            for k in 0..row {
                let tmp = lower[(row, k)];
                lower[(row, k)] = lower[(pivot_row, k)];
                lower[(pivot_row, k)] = tmp;
            }
        }
        let pivot = upper[(row, col)];
        for i in row + 1..nrows {
            let factor = upper[(i, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            lower[(i, row)] = factor;
            for j in col..ncols {
                upper[(i, j)] -= factor * upper[(row, j)];
            }
            upper[(i, col)] = 0.0;
        }
        snap_to_zero(upper, tolerance);
        pivots.push((row, col));
        row += 1;
    }
    (permutation, lower, pivots)
}

/// LU decomposition with partial pivoting, completed to row-echelon form.
/// Fails (reduction inconclusive) on non-finite input or results, a failed
/// triangular inversion, or a reconstruction error beyond the tolerance.
pub fn echelon_decomposition(
    a: &DMatrix<f64>,
    tolerance: f64,
) -> Result<EchelonDecomposition, MassBalanceError> {
    if !all_finite(a) {
        return Err(MassBalanceError::ReductionInconclusive(
            "stoichiometry matrix contains non-finite values".to_string(),
        ));
    }
    let (nrows, ncols) = a.shape();
    let mut snapped = a.clone();
    snap_to_zero(&mut snapped, tolerance);
    let lu = snapped.lu();
    let rank_bound = nrows.min(ncols);

    let mut order = DMatrix::from_fn(nrows, 1, |i, _| i as f64);
    lu.p().permute_rows(&mut order);
    let permutation: Vec<usize> = order.iter().map(|i| *i as usize).collect();
    let mut lower = DMatrix::<f64>::identity(nrows, nrows);
    lower
        .view_mut((0, 0), (nrows, rank_bound))
        .copy_from(&lu.l());
    let mut upper = DMatrix::<f64>::zeros(nrows, ncols);
    upper
        .view_mut((0, 0), (rank_bound, ncols))
        .copy_from(&lu.u());
    snap_to_zero(&mut upper, tolerance);

    let (completion_permutation, completion_lower, pivots) = complete_echelon(&mut upper, tolerance);
    let completion_p = permutation_matrix(&completion_permutation);
    let lower_inverse = inverse_of_lower(&completion_lower)?
        * &completion_p
        * inverse_of_lower(&lower)?
        * permutation_matrix(&permutation);
    let decomposition = EchelonDecomposition {
        permutation,
        lower,
        completion: completion_p.transpose() * completion_lower,
        upper,
        lower_inverse,
        pivots,
    };
    if !all_finite(&decomposition.lower) || !all_finite(&decomposition.lower_inverse) {
        return Err(MassBalanceError::ReductionInconclusive(
            "decomposition produced non-finite values".to_string(),
        ));
    }
    let scale = 1.0 + a.amax();
    let allowed = tolerance * scale * nrows.max(1) as f64;
    let error = (decomposition.reconstruct() - a).amax();
    if error > allowed {
        return Err(MassBalanceError::ReductionInconclusive(format!(
            "ill-conditioned stoichiometry matrix: reconstruction error {:e} exceeds {:e}",
            error, allowed
        )));
    }
    debug!(
        "echelon decomposition: {}x{} matrix of rank {}",
        nrows,
        ncols,
        decomposition.rank()
    );
    Ok(decomposition)
}

/// Back-substitution from the echelon form: every pivot becomes 1 and every
/// entry above a pivot becomes 0. Values are snapped to the tolerance.
pub fn reduced_echelon(
    decomposition: &EchelonDecomposition,
    tolerance: f64,
) -> ReducedEchelonForm {
    let mut matrix = decomposition.upper.clone();
    let mut transform = decomposition.lower_inverse.clone();
    let ncols = matrix.ncols();
    let ntransform = transform.ncols();
    for &(row, col) in decomposition.pivots.iter().rev() {
        let pivot = matrix[(row, col)];
        for j in 0..ncols {
            matrix[(row, j)] /= pivot;
        }
        for j in 0..ntransform {
            transform[(row, j)] /= pivot;
        }
        for i in 0..row {
            let factor = matrix[(i, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..ncols {
                matrix[(i, j)] -= factor * matrix[(row, j)];
            }
            for j in 0..ntransform {
                transform[(i, j)] -= factor * transform[(row, j)];
            }
            matrix[(i, col)] = 0.0;
        }
    }
    snap_to_zero(&mut matrix, tolerance);
    snap_to_zero(&mut transform, tolerance);
    ReducedEchelonForm {
        matrix,
        transform,
        pivots: decomposition.pivots.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    const TOL: f64 = 1e-4;

    fn sample() -> DMatrix<f64> {
        // rows: reactions, columns: SOMs
        DMatrix::from_row_slice(
            3,
            4,
            &[
                -1.0, -1.0, 1.0, 1.0, //
                2.0, 0.0, -1.0, -1.0, //
                1.0, -1.0, 0.0, 0.0,
            ],
        )
    }

    #[test]
    fn test_decomposition_reconstructs_matrix() {
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        assert_relative_eq!(dec.reconstruct(), a, epsilon = 1e-9);
        // first pivot is the largest entry of column 0
        assert_eq!(dec.permutation[0], 1);
        for i in 0..3 {
            assert_relative_eq!(dec.lower[(i, i)], 1.0);
            for j in i + 1..3 {
                assert_eq!(dec.lower[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_lower_inverse_traces_rows_to_reactions() {
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        assert_relative_eq!(&dec.lower_inverse * &a, dec.upper.clone(), epsilon = 1e-9);
    }

    #[test]
    fn test_upper_is_in_echelon_form() {
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        let mut last_pivot_col: Option<usize> = None;
        for &(row, col) in &dec.pivots {
            if let Some(prev) = last_pivot_col {
                assert!(col > prev);
            }
            for i in row + 1..dec.upper.nrows() {
                assert_eq!(dec.upper[(i, col)], 0.0);
            }
            last_pivot_col = Some(col);
        }
        // third reaction is the sum of the first two

        assert_eq!(dec.rank(), 2);
        assert!(dec.upper.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rank_deficient_column_is_skipped() {
        let a = DMatrix::from_row_slice(2, 3, &[0.0, 1.0, -1.0, 0.0, 2.0, 1.0]);
        let dec = echelon_decomposition(&a, TOL).unwrap();
        assert_eq!(dec.pivots, vec![(0, 1), (1, 2)]);
        assert_relative_eq!(dec.reconstruct(), a, epsilon = 1e-9);
        // the LU leaves both rows starting in column 1; the second pass swaps and eliminates
        assert_relative_eq!(dec.upper[(0, 1)], 2.0);
        assert_eq!(dec.upper[(1, 1)], 0.0);
        assert_relative_eq!(dec.upper[(1, 2)], -1.5);
        assert_relative_eq!(&dec.lower_inverse * &a, dec.upper.clone(), epsilon = 1e-9);
    }

    #[test]
    fn test_lu_factors_are_kept() {
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        // P·A = L·(P₂ᵀ·L₂·U')
        assert_relative_eq!(
            dec.permutation_matrix() * &a,
            &dec.lower * &dec.completion * &dec.upper,
            epsilon = 1e-9
        );
        let lu = a.clone().lu();
        assert_relative_eq!(dec.lower.columns(0, 3).into_owned(), lu.l(), epsilon = 1e-12);
    }

    #[test]
    fn test_more_reactions_than_soms() {
        let a = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 0.0, 2.0, 0.0, 3.0]);
        let dec = echelon_decomposition(&a, TOL).unwrap();
        assert_eq!(dec.rank(), 1);
        assert_eq!(dec.pivots, vec![(0, 1)]);
        assert_relative_eq!(dec.reconstruct(), a, epsilon = 1e-9);
        assert_relative_eq!(&dec.lower_inverse * &a, dec.upper.clone(), epsilon = 1e-9);
        assert!(dec.upper.row(1).iter().all(|v| *v == 0.0));
        assert!(dec.upper.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_net_stoichiometry_is_preserved() {
        // total signed stoichiometry per SOM over the reduced rows equals the
        // same combination of original reactions
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        let ones = DMatrix::from_element(1, 3, 1.0);
        let reduced_total = &ones * &dec.upper;
        let original_total = &ones * &dec.lower_inverse * &a;
        assert_relative_eq!(reduced_total, original_total, epsilon = TOL);
    }

    #[test]
    fn test_reduced_echelon_form() {
        let a = sample();
        let dec = echelon_decomposition(&a, TOL).unwrap();
        let rref = reduced_echelon(&dec, TOL);
        for &(row, col) in &rref.pivots {
            assert_relative_eq!(rref.matrix[(row, col)], 1.0, epsilon = 1e-12);
            for i in 0..rref.matrix.nrows() {
                if i != row {
                    assert_eq!(rref.matrix[(i, col)], 0.0);
                }
            }
        }
        assert_relative_eq!(&rref.transform * &a, rref.matrix.clone(), epsilon = 1e-3);
    }

    #[test]
    fn test_non_finite_input_is_inconclusive() {
        let a = DMatrix::from_row_slice(1, 2, &[f64::NAN, 1.0]);
        assert!(matches!(
            echelon_decomposition(&a, TOL),
            Err(MassBalanceError::ReductionInconclusive(_))
        ));
    }

    #[test]
    fn test_tiny_entries_are_zero() {
        let mut m = DMatrix::from_row_slice(1, 3, &[1e-6, -2e-5, 0.5]);
        snap_to_zero(&mut m, TOL);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 2)], 0.5);
    }
}
