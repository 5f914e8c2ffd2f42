//! Value types for operators on a spin's Hilbert space, together with the
//! algebraic primitives used by the Hamiltonian builders and the evolution
//! engine.
//!
//! All Hamiltonian-like quantities are expressed in MHz and times in
//! microseconds, so every exponential and propagator carries an explicit
//! factor of 2π.

use std::f64::consts::TAU;
use std::ops::{ Add, Deref, Mul, Neg, Sub };
use itertools::Itertools;
use ndarray as nd;
use ndarray_linalg::{ self as la, Eigh };
use num_complex::Complex64 as C64;
use rand::Rng;
use crate::error::{ NmrError, NmrResult };

/// Tolerance for Hermiticity validation, relative to the largest element
/// magnitude.
pub const HERM_TOL: f64 = 1e-10;

/// Tolerance for the unit-trace validation of a density matrix.
pub const TRACE_TOL: f64 = 1e-6;

/// Lower bound on the eigenvalues of a density matrix.
pub const EIG_FLOOR: f64 = -1e-10;

/// Planck constant, in J s.
pub const H_PLANCK: f64 = 6.62607015e-34;

/// Boltzmann constant, in J/K.
pub const K_BOLTZMANN: f64 = 1.380649e-23;

fn hermitian_eigh(matrix: &nd::Array2<C64>) -> (nd::Array1<f64>, nd::Array2<C64>) {
    matrix.eigh(la::UPLO::Lower)
        .expect("hermitian_eigh: diagonalization error")
}

/// A linear operator on a spin's Hilbert space, wrapping a square complex
/// matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Operator {
    matrix: nd::Array2<C64>,
}

impl Operator {
    /// Create a new operator from a matrix.
    ///
    /// Fails with [`NmrError::InvalidParameter`] if the matrix is empty or not
    /// square.
    pub fn new(matrix: nd::Array2<C64>) -> NmrResult<Self> {
        let (a, b) = matrix.dim();
        if a == 0 || a != b {
            return Err(NmrError::InvalidParameter(format!(
                "operator matrix must be square and non-empty, got {}x{}", a, b)));
        }
        Ok(Self { matrix })
    }

    pub(crate) fn from_matrix(matrix: nd::Array2<C64>) -> Self { Self { matrix } }

    /// Create the identity operator of dimension `dim`.
    pub fn identity(dim: usize) -> Self { Self { matrix: nd::Array2::eye(dim) } }

    /// Create the zero operator of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self { matrix: nd::Array2::zeros((dim, dim)) }
    }

    /// Return the dimension of the underlying Hilbert space.
    pub fn dim(&self) -> usize { self.matrix.dim().0 }

    /// Return a reference to the underlying matrix.
    pub fn matrix(&self) -> &nd::Array2<C64> { &self.matrix }

    /// Consume `self` and return the underlying matrix.
    pub fn into_matrix(self) -> nd::Array2<C64> { self.matrix }

    /// Return the Hermitian conjugate.
    pub fn dagger(&self) -> Self {
        Self { matrix: self.matrix.t().mapv(|a| a.conj()) }
    }

    /// Return the trace.
    pub fn trace(&self) -> C64 { self.matrix.diag().iter().sum() }

    /// Return the matrix product `self · rhs`.
    pub fn dot(&self, rhs: &Self) -> Self {
        Self { matrix: self.matrix.dot(&rhs.matrix) }
    }

    /// Return the largest element magnitude.
    pub fn max_norm(&self) -> f64 {
        self.matrix.iter().map(|a| a.norm()).fold(0.0, f64::max)
    }

    /// Return `true` if `self` is Hermitian within tolerance `tol`, taken
    /// relative to the largest element magnitude.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        let scale = self.max_norm().max(1.0);
        let n = self.dim();
        (0..n).all(|i| {
            (i..n).all(|j| {
                (self.matrix[[i, j]] - self.matrix[[j, i]].conj()).norm()
                    <= tol * scale
            })
        })
    }
}

impl Add for Operator {
    type Output = Operator;

    fn add(self, rhs: Self) -> Self::Output {
        Self { matrix: self.matrix + rhs.matrix }
    }
}

impl Sub for Operator {
    type Output = Operator;

    fn sub(self, rhs: Self) -> Self::Output {
        Self { matrix: self.matrix - rhs.matrix }
    }
}

impl Neg for Operator {
    type Output = Operator;

    fn neg(self) -> Self::Output { Self { matrix: -self.matrix } }
}

impl Mul<f64> for Operator {
    type Output = Operator;

    fn mul(self, rhs: f64) -> Self::Output {
        Self { matrix: self.matrix * C64::from(rhs) }
    }
}

impl Mul<C64> for Operator {
    type Output = Operator;

    fn mul(self, rhs: C64) -> Self::Output {
        Self { matrix: self.matrix * rhs }
    }
}

macro_rules! impl_scalar_mul {
    ( $ty:ty ) => {
        impl Mul<Operator> for $ty {
            type Output = Operator;

            fn mul(self, rhs: Operator) -> Self::Output { rhs * self }
        }
    }
}
impl_scalar_mul!(f64);
impl_scalar_mul!(C64);

/// An [`Operator`] guaranteed Hermitian on construction; a measurable quantity
/// or a Hamiltonian term, in MHz.
///
/// Sums, differences, negations, and real scalar multiples of observables are
/// again observables; multiplication by a complex scalar demotes the result to
/// a plain [`Operator`].
#[derive(Clone, Debug, PartialEq)]
pub struct Observable(Operator);

impl Observable {
    /// Validate that `op` is Hermitian within [`HERM_TOL`].
    ///
    /// Fails with [`NmrError::InvalidParameter`] otherwise.
    pub fn new(op: Operator) -> NmrResult<Self> {
        if !op.is_hermitian(HERM_TOL) {
            return Err(NmrError::InvalidParameter(
                "observable matrix is not Hermitian".to_string()));
        }
        Ok(Self(op))
    }

    /// Like [`Self::new`], but taking a bare matrix.
    pub fn from_matrix(matrix: nd::Array2<C64>) -> NmrResult<Self> {
        Self::new(Operator::new(matrix)?)
    }

    /// Create an observable from the Hermitian part `(M + M†) / 2` of `op`.
    pub fn symmetrized(op: Operator) -> Self {
        let dag = op.dagger();
        Self((op + dag) * 0.5)
    }

    /// Return a reference to the underlying operator.
    pub fn operator(&self) -> &Operator { &self.0 }

    /// Consume `self` and return the underlying operator.
    pub fn into_operator(self) -> Operator { self.0 }

    /// Compute the eigenvalues and eigenvectors of `self`.
    ///
    /// Eigenvalues are returned in ascending order, with the `k`-th column of
    /// the eigenvector matrix belonging to the `k`-th eigenvalue.
    pub fn eigh(&self) -> (nd::Array1<f64>, nd::Array2<C64>) {
        hermitian_eigh(&self.0.matrix)
    }

    /// Compute `exp(z · self)` through the eigenbasis of `self`.
    ///
    /// For purely imaginary `z` the result is unitary by construction.
    pub fn exp_scaled(&self, z: C64) -> Operator {
        let (E, V) = self.eigh();
        let exp_e: nd::Array1<C64> = E.mapv(|e| (z * e).exp());
        let Vdag: nd::Array2<C64> = V.t().mapv(|a| a.conj());
        Operator::from_matrix((&V * &exp_e).dot(&Vdag))
    }

    /// Return the expectation value `Tr[rho · self]`.
    pub fn expectation_value(&self, rho: &DensityMatrix) -> f64 {
        rho.dot(&self.0).trace().re
    }
}

impl Deref for Observable {
    type Target = Operator;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl AsRef<Operator> for Observable {
    fn as_ref(&self) -> &Operator { &self.0 }
}

impl From<Observable> for Operator {
    fn from(obs: Observable) -> Self { obs.0 }
}

impl Add for Observable {
    type Output = Observable;

    fn add(self, rhs: Self) -> Self::Output { Self(self.0 + rhs.0) }
}

impl Sub for Observable {
    type Output = Observable;

    fn sub(self, rhs: Self) -> Self::Output { Self(self.0 - rhs.0) }
}

impl Neg for Observable {
    type Output = Observable;

    fn neg(self) -> Self::Output { Self(-self.0) }
}

impl Mul<f64> for Observable {
    type Output = Observable;

    fn mul(self, rhs: f64) -> Self::Output { Self(self.0 * rhs) }
}

impl Mul<Observable> for f64 {
    type Output = Observable;

    fn mul(self, rhs: Observable) -> Self::Output { rhs * self }
}

impl Mul<C64> for Observable {
    type Output = Operator;

    fn mul(self, rhs: C64) -> Self::Output { self.0 * rhs }
}

/// An [`Operator`] validated Hermitian, unit-trace, and positive
/// semi-definite on construction; the statistical state of the spin ensemble.
///
/// States are never mutated in place: the evolution engine always returns a
/// fresh instance.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityMatrix(Operator);

impl DensityMatrix {
    /// Validate Hermiticity within [`HERM_TOL`], unit trace within
    /// [`TRACE_TOL`], and eigenvalues bounded below by [`EIG_FLOOR`].
    ///
    /// Fails with [`NmrError::InvalidParameter`] otherwise.
    pub fn new(op: Operator) -> NmrResult<Self> {
        if !op.is_hermitian(HERM_TOL) {
            return Err(NmrError::InvalidParameter(
                "density matrix is not Hermitian".to_string()));
        }
        let tr = op.trace();
        if (tr - C64::from(1.0)).norm() > TRACE_TOL {
            return Err(NmrError::InvalidParameter(format!(
                "density matrix has trace {}, expected 1", tr)));
        }
        let (E, _) = hermitian_eigh(&op.matrix);
        if E[0] < EIG_FLOOR {
            return Err(NmrError::InvalidParameter(format!(
                "density matrix has negative eigenvalue {:.3e}", E[0])));
        }
        Ok(Self(op))
    }

    /// Like [`Self::new`], but taking a bare matrix.
    pub fn from_matrix(matrix: nd::Array2<C64>) -> NmrResult<Self> {
        Self::new(Operator::new(matrix)?)
    }

    /// Create the maximally mixed state `1/d` for a `dim`-dimensional space.
    pub fn maximally_mixed(dim: usize) -> Self {
        let matrix = nd::Array2::eye(dim) * C64::from((dim as f64).recip());
        Self(Operator::from_matrix(matrix))
    }

    /// Create the canonical (thermal-equilibrium) state
    /// `exp(−h H / k T) / Z` for Hamiltonian `h` in MHz and temperature in
    /// kelvin.
    ///
    /// Fails with [`NmrError::InvalidParameter`] if `temperature` is not
    /// positive, or with [`NmrError::NumericalDegeneracy`] if the Boltzmann
    /// exponential leaves the finite floating-point range.
    pub fn canonical(h: &Observable, temperature: f64) -> NmrResult<Self> {
        if temperature <= 0.0 {
            return Err(NmrError::InvalidParameter(format!(
                "temperature must be positive, got {} K", temperature)));
        }
        let scale: f64 = -H_PLANCK / K_BOLTZMANN * TAU * 1e6 / temperature;
        let boltzmann = h.exp_scaled(C64::from(scale));
        let z = boltzmann.trace();
        if !z.re.is_finite() || z.re <= 0.0 {
            return Err(NmrError::NumericalDegeneracy(format!(
                "canonical state has non-normalizable Boltzmann weights \
                (Z = {}); the interaction is likely too strong relative to \
                the temperature", z)));
        }
        Self::new(boltzmann * z.re.recip())
    }

    /// Return the populations, i.e. the real part of the diagonal.
    pub fn populations(&self) -> nd::Array1<f64> {
        self.0.matrix.diag().mapv(|a| a.re)
    }

    /// Return a reference to the underlying operator.
    pub fn operator(&self) -> &Operator { &self.0 }

    /// Consume `self` and return the underlying operator.
    pub fn into_operator(self) -> Operator { self.0 }
}

impl Deref for DensityMatrix {
    type Target = Operator;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl AsRef<Operator> for DensityMatrix {
    fn as_ref(&self) -> &Operator { &self.0 }
}

impl From<DensityMatrix> for Operator {
    fn from(dm: DensityMatrix) -> Self { dm.0 }
}

/// Compute the commutator `[A, B] = A B − B A`.
pub fn commutator(A: &Operator, B: &Operator) -> Operator {
    Operator::from_matrix(
        A.matrix().dot(B.matrix()) - B.matrix().dot(A.matrix()))
}

/// Compute the anti-commutator `{A, B} = A B + B A`.
pub fn anti_commutator(A: &Operator, B: &Operator) -> Operator {
    Operator::from_matrix(
        A.matrix().dot(B.matrix()) + B.matrix().dot(A.matrix()))
}

/// Transform `op` into the picture generated by `generator`, returning
/// `U · op · U†` with `U = exp(−i 2π · generator · time)`.
///
/// `invert = true` flips the sign of the exponent, undoing a transformation
/// performed with the same generator and time.
pub fn changed_picture(
    op: &Operator,
    generator: &Observable,
    time: f64,
    invert: bool,
) -> Operator
{
    let z: C64
        = if invert { C64::i() * TAU * time } else { -C64::i() * TAU * time };
    let U = generator.exp_scaled(z);
    U.dot(op).dot(&U.dagger())
}

/// Compute the first Magnus term `2π ∫ H(t) dt` for Hamiltonian samples `h`
/// with uniform spacing `dt`, via the trapezoidal rule.
///
/// A single sample is treated as a constant Hamiltonian over an interval of
/// length `dt`. Panics if `h` is empty.
pub fn magnus_first_term(h: &[Observable], dt: f64) -> Operator {
    let n = h.len();
    if n == 0 { panic!("magnus_first_term: empty sample list"); }
    if n == 1 { return h[0].operator().clone() * (TAU * dt); }
    let mut integral: nd::Array2<C64>
        = (h[0].matrix() + h[n - 1].matrix()) * C64::from(0.5);
    for hk in h[1..n - 1].iter() {
        integral = integral + hk.matrix();
    }
    Operator::from_matrix(integral * C64::from(TAU * dt))
}

/// Compute the second Magnus term
/// `(i/2) (2π)² Σ_{t1 > t2} [H(t1), H(t2)] dt²`
/// for Hamiltonian samples `h` with uniform spacing `dt`.
///
/// The result is Hermitian since each commutator of Hermitian samples is
/// anti-Hermitian. Panics if `h` is empty.
pub fn magnus_second_term(h: &[Observable], dt: f64) -> Operator {
    let n = h.len();
    if n == 0 { panic!("magnus_second_term: empty sample list"); }
    let d = h[0].dim();
    let mut acc: nd::Array2<C64> = nd::Array2::zeros((d, d));
    for (h2, h1) in h.iter().tuple_combinations() {
        // h1 is the later sample
        acc = acc + (h1.matrix().dot(h2.matrix()) - h2.matrix().dot(h1.matrix()));
    }
    Operator::from_matrix(acc * (C64::i() * 0.5 * TAU * TAU * dt * dt))
}

/// Exponentiate `i · k` for a Hermitian-up-to-roundoff generator `k`,
/// symmetrizing first so the result is exactly unitary.
pub fn exp_i_generator(k: &Operator) -> Operator {
    Observable::symmetrized(k.clone()).exp_scaled(C64::i())
}

/// Return an operator with the real and imaginary parts of all elements drawn
/// uniformly from [−10, 10).
pub fn random_operator<R>(dim: usize, rng: &mut R) -> Operator
where R: Rng + ?Sized
{
    let matrix = nd::Array2::from_shape_fn((dim, dim), |_| {
        C64::new(
            20.0 * (rng.gen::<f64>() - 0.5),
            20.0 * (rng.gen::<f64>() - 0.5),
        )
    });
    Operator::from_matrix(matrix)
}

/// Return the Hermitian part of a [`random_operator`] draw.
pub fn random_observable<R>(dim: usize, rng: &mut R) -> Observable
where R: Rng + ?Sized
{
    Observable::symmetrized(random_operator(dim, rng))
}

/// Return a random mixed state, built from uniformly drawn populations
/// conjugated by a random unitary.
pub fn random_density_matrix<R>(dim: usize, rng: &mut R)
    -> NmrResult<DensityMatrix>
where R: Rng + ?Sized
{
    let probs: nd::Array1<f64>
        = (0..dim).map(|_| rng.gen::<f64>()).collect();
    let norm: f64 = probs.sum();
    let diag: nd::Array1<C64> = probs.mapv(|p| C64::from(p / norm));
    let U = random_observable(dim, rng).exp_scaled(C64::i());
    let matrix
        = U.matrix().dot(&nd::Array2::from_diag(&diag))
        .dot(&U.dagger().into_matrix());
    DensityMatrix::from_matrix(matrix)
}
