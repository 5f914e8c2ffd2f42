//! Spin quantum numbers and the angular momentum operators attached to a
//! single nuclear species.
//!
//! Quantum numbers are stored as integer numbers of *halves* so that both
//! integer and half-integer spins are represented exactly. Matrix
//! representations use the basis of `I_z` eigenstates `|m⟩` ordered by
//! *descending* `m`, so index 0 is the `m = +I` state.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ NmrError, NmrResult };
use crate::operators::{ Observable, Operator };

/// Total spin quantum number `I`, stored as a number of halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinQuantumNumber(u32);

impl SpinQuantumNumber {
    /// Create a new quantum number equal to `halves / 2`.
    pub fn new(halves: u32) -> Self { Self(halves) }

    /// Convert from an ordinary float.
    ///
    /// Fails with [`NmrError::InvalidParameter`] if `f` is not a finite,
    /// non-negative multiple of 1/2.
    pub fn from_f64(f: f64) -> NmrResult<Self> {
        if !f.is_finite() || f < 0.0 {
            return Err(NmrError::InvalidParameter(format!(
                "spin quantum number must be finite and non-negative, got {}",
                f)));
        }
        let halves = (2.0 * f).round();
        if (2.0 * f - halves).abs() > 1e-9 {
            return Err(NmrError::InvalidParameter(format!(
                "spin quantum number must be a multiple of 1/2, got {}", f)));
        }
        Ok(Self(halves as u32))
    }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> u32 { self.0 }

    /// Return `self` as an `f64`.
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }

    /// Return the dimension `2 I + 1` of the associated Hilbert space.
    pub fn dim(self) -> usize { self.0 as usize + 1 }

    /// Return an iterator over all projection numbers, in descending order
    /// from `m = +I` to `m = −I`.
    pub fn projections(self) -> Projections {
        Projections { total: self.0, cur: Some(self.0 as i32) }
    }
}

/// Projection quantum number `m`, stored as a number of halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpinProjection(i32);

impl SpinProjection {
    /// Create a new projection number equal to `halves / 2`.
    pub fn new(halves: i32) -> Self { Self(halves) }

    /// Return `self` as a bare number of halves.
    pub fn halves(self) -> i32 { self.0 }

    /// Return `self` as an `f64`.
    pub fn f(self) -> f64 { f64::from(self.0) / 2.0 }

    /// Return a copy of `self` raised by 1, without any bound check.
    pub fn raised(self) -> Self { Self(self.0 + 2) }

    /// Return a copy of `self` lowered by 1, without any bound check.
    pub fn lowered(self) -> Self { Self(self.0 - 2) }
}

/// Iterator over the projection numbers of a [`SpinQuantumNumber`], in
/// descending order.
#[derive(Copy, Clone, Debug)]
pub struct Projections {
    total: u32,
    cur: Option<i32>,
}

impl Iterator for Projections {
    type Item = SpinProjection;

    fn next(&mut self) -> Option<Self::Item> {
        self.cur.take()
            .map(|cur| {
                let next = cur - 2;
                if next >= -(self.total as i32) { self.cur = Some(next); }
                SpinProjection(cur)
            })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n: usize
            = self.cur
            .map(|cur| ((cur + self.total as i32) / 2 + 1) as usize)
            .unwrap_or(0);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Projections { }

impl std::iter::FusedIterator for Projections { }

/// A single nuclear species: its spin quantum number, its gyromagnetic ratio,
/// and the matrix representations of its angular momentum operators.
///
/// The gyromagnetic ratio is given as `γ/2π` in MHz/T.
#[derive(Clone, Debug)]
pub struct NuclearSpin {
    quantum_number: SpinQuantumNumber,
    gyromagnetic_ratio: f64,
    ix: Observable,
    iy: Observable,
    iz: Observable,
    iplus: Operator,
    iminus: Operator,
}

impl NuclearSpin {
    /// Create a new species from a float quantum number and a gyromagnetic
    /// ratio in MHz/T.
    ///
    /// Fails with [`NmrError::InvalidParameter`] if `quantum_number` is not a
    /// non-negative multiple of 1/2.
    pub fn new(quantum_number: f64, gyromagnetic_ratio: f64) -> NmrResult<Self> {
        let qn = SpinQuantumNumber::from_f64(quantum_number)?;
        Ok(Self::from_quantum_number(qn, gyromagnetic_ratio))
    }

    /// Create a new species from an already validated quantum number.
    pub fn from_quantum_number(
        quantum_number: SpinQuantumNumber,
        gyromagnetic_ratio: f64,
    ) -> Self
    {
        let d = quantum_number.dim();
        let ii1 = quantum_number.f() * (quantum_number.f() + 1.0);
        let mut raising: nd::Array2<C64> = nd::Array2::zeros((d, d));
        // raising from the state at index k lands at index k - 1
        for (k, m) in quantum_number.projections().enumerate().skip(1) {
            let c = (ii1 - m.f() * m.raised().f()).max(0.0).sqrt();
            raising[[k - 1, k]] = C64::from(c);
        }
        let iplus = Operator::from_matrix(raising);
        let iminus = iplus.dagger();
        let ix = Observable::symmetrized(
            (iplus.clone() + iminus.clone()) * 0.5);
        let iy = Observable::symmetrized(
            (iplus.clone() - iminus.clone()) * C64::new(0.0, -0.5));
        let zdiag: nd::Array1<C64>
            = quantum_number.projections()
            .map(|m| C64::from(m.f()))
            .collect();
        let iz = Observable::symmetrized(
            Operator::from_matrix(nd::Array2::from_diag(&zdiag)));
        Self { quantum_number, gyromagnetic_ratio, ix, iy, iz, iplus, iminus }
    }

    /// Return the spin quantum number.
    pub fn quantum_number(&self) -> SpinQuantumNumber { self.quantum_number }

    /// Return the gyromagnetic ratio `γ/2π` in MHz/T.
    pub fn gyromagnetic_ratio(&self) -> f64 { self.gyromagnetic_ratio }

    /// Return the dimension `2 I + 1` of the Hilbert space.
    pub fn dim(&self) -> usize { self.quantum_number.dim() }

    /// Return the `I_x` operator.
    pub fn ix(&self) -> &Observable { &self.ix }

    /// Return the `I_y` operator.
    pub fn iy(&self) -> &Observable { &self.iy }

    /// Return the `I_z` operator.
    pub fn iz(&self) -> &Observable { &self.iz }

    /// Return the raising operator `I_+`.
    pub fn iplus(&self) -> &Operator { &self.iplus }

    /// Return the lowering operator `I_−`.
    pub fn iminus(&self) -> &Operator { &self.iminus }

    /// Return the component of the angular momentum along the direction with
    /// polar angle `theta` and azimuthal angle `phi` (radians),
    /// `n̂ · I = I_x sin θ cos φ + I_y sin θ sin φ + I_z cos θ`.
    pub fn projected(&self, theta: f64, phi: f64) -> Observable {
        self.ix.clone() * (theta.sin() * phi.cos())
            + self.iy.clone() * (theta.sin() * phi.sin())
            + self.iz.clone() * theta.cos()
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use crate::operators::commutator;
    use super::*;

    fn maxdiff(a: &Operator, b: &Operator) -> f64 {
        (a.matrix() - b.matrix()).iter()
            .map(|x| x.norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn quantum_number_from_f64() {
        assert_eq!(SpinQuantumNumber::from_f64(0.0).unwrap().halves(), 0);
        assert_eq!(SpinQuantumNumber::from_f64(0.5).unwrap().halves(), 1);
        assert_eq!(SpinQuantumNumber::from_f64(1.5).unwrap().halves(), 3);
        assert_eq!(SpinQuantumNumber::from_f64(2.5).unwrap().dim(), 6);
        assert!(SpinQuantumNumber::from_f64(-0.5).is_err());
        assert!(SpinQuantumNumber::from_f64(0.7).is_err());
    }

    // NaN fails every comparison, so the half-integer guard alone would wave
    // it through as I = 0; infinity would saturate the halves count
    #[test]
    fn quantum_number_rejects_nonfinite() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                SpinQuantumNumber::from_f64(f),
                Err(NmrError::InvalidParameter(_))));
            assert!(matches!(
                NuclearSpin::new(f, 1.0),
                Err(NmrError::InvalidParameter(_))));
        }
    }

    #[test]
    fn projections_descend() {
        let qn = SpinQuantumNumber::from_f64(1.5).unwrap();
        let proj: Vec<f64> = qn.projections().map(|m| m.f()).collect();
        assert_eq!(proj, vec![1.5, 0.5, -0.5, -1.5]);
        assert_eq!(qn.projections().len(), 4);
    }

    #[test]
    fn raise_lower_round_trip() {
        let m = SpinProjection::new(-1);
        assert_eq!(m.raised().lowered(), m);
        assert_eq!(m.raised().f(), 0.5);
    }

    #[test]
    fn commutation_relations() {
        for i in [0.5, 1.0, 1.5, 2.5] {
            let spin = NuclearSpin::new(i, 1.0).unwrap();
            let pairs = [
                (spin.ix(), spin.iy(), spin.iz()),
                (spin.iy(), spin.iz(), spin.ix()),
                (spin.iz(), spin.ix(), spin.iy()),
            ];
            for (a, b, c) in pairs {
                let comm = commutator(a.operator(), b.operator());
                let expected = c.operator().clone() * C64::i();
                assert!(
                    maxdiff(&comm, &expected) < 1e-12,
                    "commutation failed for I = {}", i,
                );
            }
        }
    }

    #[test]
    fn casimir_invariant() {
        for i in [0.5, 1.0, 1.5, 2.5] {
            let spin = NuclearSpin::new(i, 1.0).unwrap();
            let sum
                = spin.ix().dot(spin.ix())
                + spin.iy().dot(spin.iy())
                + spin.iz().dot(spin.iz());
            let expected = Operator::identity(spin.dim()) * (i * (i + 1.0));
            assert!(maxdiff(&sum, &expected) < 1e-12);
        }
    }

    #[test]
    fn ladder_operators_annihilate_extremes() {
        let spin = NuclearSpin::new(1.5, 1.0).unwrap();
        let d = spin.dim();
        assert!(
            spin.iplus().matrix().column(0).iter()
            .all(|a| a.norm() == 0.0)
        );
        assert!(
            spin.iminus().matrix().column(d - 1).iter()
            .all(|a| a.norm() == 0.0)
        );
    }

    #[test]
    fn iz_is_diagonal_descending() {
        let spin = NuclearSpin::new(2.5, 1.0).unwrap();
        let m = spin.iz().matrix();
        assert!((m[[0, 0]].re - 2.5).abs() < 1e-15);
        assert!((m[[5, 5]].re + 2.5).abs() < 1e-15);
    }

    #[test]
    fn projected_recovers_cartesian_components() {
        let spin = NuclearSpin::new(1.0, 1.0).unwrap();
        let along_z = spin.projected(0.0, 0.37);
        assert!(maxdiff(along_z.operator(), spin.iz().operator()) < 1e-15);
        let along_x = spin.projected(PI / 2.0, 0.0);
        assert!(maxdiff(along_x.operator(), spin.ix().operator()) < 1e-12);
    }
}
