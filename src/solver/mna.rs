//! MNA matrix assembly and dense LU solving over real or complex scalars.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_complex::Complex64;
use thiserror::Error;

/// Field the MNA system is solved over: `f64` for DC and transient,
/// `Complex64` for AC.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_real(value: f64) -> Self;
    /// Magnitude used for pivot selection.
    fn magnitude(&self) -> f64;
}

impl Scalar for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_real(value: f64) -> Self {
        value
    }

    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }

    fn from_real(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

/// LU factorization hit a pivot below tolerance.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("pivot magnitude {magnitude:e} below tolerance in column {column}")]
pub struct SingularPivot {
    pub column: usize,
    pub magnitude: f64,
}

/// MNA matrix system Ax = z.
#[derive(Debug, Clone)]
pub struct MnaMatrix<T: Scalar = f64> {
    /// System matrix A (row-major)
    pub a: Vec<T>,
    /// Source vector z
    pub z: Vec<T>,
    /// Solution vector x
    pub x: Vec<T>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    lu: Vec<T>,
    /// Pivot indices for LU decomposition
    pivots: Vec<usize>,
    /// Largest entry magnitude of each row of `lu`, permuted with it
    row_scales: Vec<f64>,
    /// Smallest acceptable pivot, relative to its row's largest entry
    pivot_tolerance: f64,
}

impl<T: Scalar> MnaMatrix<T> {
    /// Allocate a zeroed system of the given dimension.
    pub fn new(size: usize, pivot_tolerance: f64) -> Self {
        Self {
            a: vec![T::zero(); size * size],
            z: vec![T::zero(); size],
            x: vec![T::zero(); size],
            size,
            lu: vec![T::zero(); size * size],
            pivots: (0..size).collect(),
            row_scales: vec![0.0; size],
            pivot_tolerance,
        }
    }

    /// Clear the matrix and vectors to zero.
    pub fn clear(&mut self) {
        self.a.fill(T::zero());
        self.z.fill(T::zero());
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> T {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: T) {
        self.z[row] += value;
    }

    /// Stamp an admittance between two nodes.
    /// For an admittance Y between nodes n1 and n2:
    ///   A[n1,n1] += Y
    ///   A[n2,n2] += Y
    ///   A[n1,n2] -= Y
    ///   A[n2,n1] -= Y
    pub fn stamp_admittance(&mut self, n1: Option<usize>, n2: Option<usize>, y: T) {
        if let Some(i) = n1 {
            self.add(i, i, y);
        }
        if let Some(j) = n2 {
            self.add(j, j, y);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -y);
            self.add(j, i, -y);
        }
    }

    /// Stamp a branch with its own current unknown at row/column `br`:
    ///   V[n+] - V[n-] - Z * I = E
    ///
    /// `Z = 0` is the ideal voltage source pattern.
    pub fn stamp_branch(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        impedance: T,
        source: T,
    ) {
        if let Some(i) = n_pos {
            self.add(br, i, T::one());
            self.add(i, br, T::one());
        }
        if let Some(j) = n_neg {
            self.add(br, j, -T::one());
            self.add(j, br, -T::one());
        }
        if impedance != T::zero() {
            self.add(br, br, -impedance);
        }
        self.add_source(br, source);
    }

    /// Inject a current into `n_pos` and draw it from `n_neg`.
    pub fn inject_current(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: T) {
        if let Some(i) = n_pos {
            self.add_source(i, current);
        }
        if let Some(j) = n_neg {
            self.add_source(j, -current);
        }
    }

    /// Perform LU decomposition with partial pivoting.
    ///
    /// A pivot is rejected when it is zero or smaller than `pivot_tolerance`
    /// times the largest entry of its original row, so uniformly tiny
    /// conductances (gigaohm networks) still factor.
    pub fn factor(&mut self) -> Result<(), SingularPivot> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }
        for (i, scale) in self.row_scales.iter_mut().enumerate() {
            *scale = self.a[i * n..(i + 1) * n]
                .iter()
                .map(Scalar::magnitude)
                .fold(0.0, f64::max);
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].magnitude();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].magnitude();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if !self.acceptable_pivot(max_val, self.row_scales[max_row]) {
                return Err(SingularPivot {
                    column: k,
                    magnitude: max_val,
                });
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                self.row_scales.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    let delta = factor * self.lu[k * n + j];
                    self.lu[i * n + j] -= delta;
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<(), SingularPivot> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                let delta = self.lu[i * n + j] * self.x[j];
                self.x[i] -= delta;
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let delta = self.lu[i * n + j] * self.x[j];
                self.x[i] -= delta;
            }
            let diag = self.lu[i * n + i];
            if !self.acceptable_pivot(diag.magnitude(), self.row_scales[i]) {
                return Err(SingularPivot {
                    column: i,
                    magnitude: diag.magnitude(),
                });
            }
            self.x[i] = self.x[i] / diag;
        }

        Ok(())
    }

    fn acceptable_pivot(&self, magnitude: f64, row_scale: f64) -> bool {
        magnitude > 0.0 && magnitude >= self.pivot_tolerance * row_scale
    }

    /// Factor and solve in one call.
    pub fn factor_and_solve(&mut self) -> Result<&[T], SingularPivot> {
        self.factor()?;
        self.solve()?;
        Ok(&self.x)
    }

    /// Get the voltage at a node (ground reads as zero).
    pub fn voltage(&self, node: Option<usize>) -> T {
        match node {
            Some(i) => self.x[i],
            None => T::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_voltage_divider() {
        // V1 = 1V at node 0, R1 = 1k from 0 to 1, R2 = 1k from 1 to ground
        let mut m: MnaMatrix<f64> = MnaMatrix::new(3, 1e-15);
        m.stamp_admittance(Some(0), Some(1), 1e-3);
        m.stamp_admittance(Some(1), None, 1e-3);
        m.stamp_branch(Some(0), None, 2, 0.0, 1.0);

        m.factor_and_solve().unwrap();
        assert_relative_eq!(m.voltage(Some(1)), 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.voltage(None), 0.0);
        // Branch current enters the source's positive terminal
        assert_relative_eq!(m.x[2], -0.5e-3, epsilon = 1e-15);
    }

    #[test]
    fn test_current_injection() {
        let mut m: MnaMatrix<f64> = MnaMatrix::new(1, 1e-15);
        m.stamp_admittance(Some(0), None, 0.5);
        m.inject_current(Some(0), None, 1.0);
        m.factor_and_solve().unwrap();
        assert_relative_eq!(m.x[0], 2.0);
    }

    #[test]
    fn test_pivoting_handles_zero_diagonal() {
        // Voltage source rows have zero diagonals until pivoted
        let mut m: MnaMatrix<f64> = MnaMatrix::new(2, 1e-15);
        m.stamp_branch(Some(0), None, 1, 0.0, 3.0);
        m.stamp_admittance(Some(0), None, 1.0);
        m.factor_and_solve().unwrap();
        assert_relative_eq!(m.x[0], 3.0);
    }

    #[test]
    fn test_singular_matrix() {
        // Node 1 is floating
        let mut m: MnaMatrix<f64> = MnaMatrix::new(2, 1e-15);
        m.stamp_admittance(Some(0), None, 1.0);
        let err = m.factor().unwrap_err();
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_high_impedance_divider() {
        // Two 1e16 ohm resistors: conductances far below the tolerance
        let g = 1e-16;
        let mut m: MnaMatrix<f64> = MnaMatrix::new(3, 1e-15);
        m.stamp_admittance(Some(0), Some(1), g);
        m.stamp_admittance(Some(1), None, g);
        m.stamp_branch(Some(0), None, 2, 0.0, 1.0);
        m.factor_and_solve().unwrap();
        assert_relative_eq!(m.voltage(Some(1)), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_sources_stay_singular() {
        let mut m: MnaMatrix<f64> = MnaMatrix::new(3, 1e-15);
        m.stamp_admittance(Some(0), None, 1e-3);
        m.stamp_branch(Some(0), None, 1, 0.0, 1.0);
        m.stamp_branch(Some(0), None, 2, 0.0, 2.0);
        assert!(m.factor().is_err());
    }

    #[test]
    fn test_complex_rc() {
        // 1 ohm in series with admittance j1 to ground, driven by 1V
        let mut m: MnaMatrix<Complex64> = MnaMatrix::new(3, 1e-15);
        m.stamp_admittance(Some(0), Some(1), Complex64::new(1.0, 0.0));
        m.stamp_admittance(Some(1), None, Complex64::new(0.0, 1.0));
        m.stamp_branch(Some(0), None, 2, Complex64::zero(), Complex64::one());
        m.factor_and_solve().unwrap();
        // V = 1 / (1 + j)
        let v = m.voltage(Some(1));
        assert_relative_eq!(v.re, 0.5, epsilon = 1e-12);
        assert_relative_eq!(v.im, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_system() {
        let mut m: MnaMatrix<f64> = MnaMatrix::new(0, 1e-15);
        assert!(m.factor_and_solve().unwrap().is_empty());
    }
}
