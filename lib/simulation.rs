//! Density-matrix time evolution and simulation setup.
//!
//! Free evolution under a stationary Hamiltonian is computed by exact
//! exponentiation in the Hamiltonian's eigenbasis. Pulse evolution moves to a
//! working picture (interaction picture or rotating reference frame), samples
//! the moving-frame Hamiltonian on a uniform time grid, builds a first- or
//! second-order Magnus generator, applies the single resulting propagator,
//! and transforms back to the Schrödinger picture. All propagators are
//! unitary by construction, so the density-matrix invariants are preserved up
//! to roundoff.

use std::f64::consts::TAU;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::error::{ NmrError, NmrResult };
use crate::hamiltonians::{ self, PulseMode, RotatingFrame };
use crate::operators::{
    changed_picture,
    exp_i_generator,
    magnus_first_term,
    magnus_second_term,
    DensityMatrix,
    Observable,
    Operator,
};
use crate::spin::NuclearSpin;

/// Working frame for pulse evolution.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Picture {
    /// Interaction picture: the picture generator is the stationary
    /// Hamiltonian itself.
    Interaction,
    /// Rotating reference frame with the given parameters.
    RotatingFrame(RotatingFrame),
}

/// Truncation order of the Magnus expansion used for the pulse propagator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnusOrder {
    First,
    Second,
}

impl Default for MagnusOrder {
    fn default() -> Self { Self::Second }
}

/// Spin species parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpinParams {
    /// Spin quantum number (non-negative multiple of 1/2).
    pub quantum_number: f64,
    /// Gyromagnetic ratio `γ/2π` in MHz/T.
    pub gyromagnetic_ratio: f64,
}

/// Static-field parameters for the Zeeman interaction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZeemanParams {
    /// Field magnitude in tesla.
    pub field_magnitude: f64,
    /// Polar angle of the field direction, radians.
    pub theta_z: f64,
    /// Azimuthal angle of the field direction, radians.
    pub phi_z: f64,
}

/// Quadrupole coupling parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadrupoleParams {
    /// Coupling constant `e²qQ/h` in MHz.
    pub coupling_constant: f64,
    /// Asymmetry parameter of the field gradient, in `[0, 1]`.
    pub asymmetry: f64,
    /// Euler angles rotating the gradient's principal axes into the lab
    /// frame, radians.
    pub alpha_q: f64,
    pub beta_q: f64,
    pub gamma_q: f64,
}

/// Description of the initial state of the ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// Thermal equilibrium at the given temperature in kelvin.
    Canonical { temperature: f64 },
    /// The maximally mixed state.
    MaximallyMixed,
    /// An explicit density matrix, given row by row as `[re, im]` pairs.
    Explicit { matrix: Vec<Vec<(f64, f64)>> },
}

impl Default for InitialState {
    fn default() -> Self { Self::Canonical { temperature: 1e-4 } }
}

/// Build the spin, the stationary Hamiltonian, and the initial state from
/// parameter records.
///
/// The stationary Hamiltonian is the sum of the Zeeman and quadrupole terms
/// for the records that are present; with neither present it is zero.
pub fn nuclear_system_setup(
    spin_par: &SpinParams,
    zeeman_par: Option<&ZeemanParams>,
    quad_par: Option<&QuadrupoleParams>,
    initial: &InitialState,
) -> NmrResult<(NuclearSpin, Observable, DensityMatrix)>
{
    let spin = NuclearSpin::new(
        spin_par.quantum_number, spin_par.gyromagnetic_ratio)?;
    let mut h0 = Observable::symmetrized(Operator::zeros(spin.dim()));
    if let Some(zp) = zeeman_par {
        h0 = h0 + hamiltonians::zeeman(
            &spin, zp.theta_z, zp.phi_z, zp.field_magnitude)?;
    }
    if let Some(qp) = quad_par {
        h0 = h0 + hamiltonians::quadrupole(
            &spin,
            qp.coupling_constant,
            qp.asymmetry,
            qp.alpha_q,
            qp.beta_q,
            qp.gamma_q,
        )?;
    }
    let dm = match initial {
        InitialState::Canonical { temperature } =>
            DensityMatrix::canonical(&h0, *temperature)?,
        InitialState::MaximallyMixed =>
            DensityMatrix::maximally_mixed(spin.dim()),
        InitialState::Explicit { matrix } =>
            explicit_state(matrix, spin.dim())?,
    };
    Ok((spin, h0, dm))
}

fn explicit_state(rows: &[Vec<(f64, f64)>], dim: usize)
    -> NmrResult<DensityMatrix>
{
    if rows.len() != dim || rows.iter().any(|row| row.len() != dim) {
        return Err(NmrError::InvalidParameter(format!(
            "explicit initial state must be a {0}x{0} matrix", dim)));
    }
    let mut matrix: nd::Array2<C64> = nd::Array2::zeros((dim, dim));
    for (i, row) in rows.iter().enumerate() {
        for (j, &(re, im)) in row.iter().enumerate() {
            matrix[[i, j]] = C64::new(re, im);
        }
    }
    DensityMatrix::from_matrix(matrix)
}

/// Evolve `dm_initial` under the stationary Hamiltonian `h` alone for `time`
/// µs, returning `U ρ U†` with `U = exp(+i 2π h · time)`.
pub fn free_evolution(
    h: &Observable,
    dm_initial: &DensityMatrix,
    time: f64,
) -> NmrResult<DensityMatrix>
{
    let U = h.exp_scaled(C64::i() * TAU * time);
    DensityMatrix::from_matrix(
        U.matrix().dot(dm_initial.matrix()).dot(&U.dagger().into_matrix()))
}

/// Evolve `dm_initial` under the stationary Hamiltonian `h_unperturbed` and
/// the pulse described by `modes` for `pulse_time` µs.
///
/// With no modes this reduces to [`free_evolution`]; with modes present the
/// moving-frame Hamiltonian selected by `picture` is sampled on `n_points`
/// uniformly spaced instants spanning `[0, pulse_time]` and exponentiated
/// through a Magnus generator of the given `order`.
///
/// Fails with [`NmrError::InvalidParameter`] if `pulse_time` is negative, or
/// if modes are present and `n_points` is zero.
#[allow(clippy::too_many_arguments)]
pub fn evolve(
    spin: &NuclearSpin,
    h_unperturbed: &Observable,
    dm_initial: &DensityMatrix,
    modes: &[PulseMode],
    pulse_time: f64,
    picture: Picture,
    n_points: usize,
    order: MagnusOrder,
) -> NmrResult<DensityMatrix>
{
    if pulse_time < 0.0 {
        return Err(NmrError::InvalidParameter(format!(
            "pulse time must be non-negative, got {} µs", pulse_time)));
    }
    if pulse_time == 0.0 {
        return Ok(dm_initial.clone());
    }
    if modes.is_empty() {
        return free_evolution(h_unperturbed, dm_initial, pulse_time);
    }
    if n_points < 1 {
        return Err(NmrError::InvalidParameter(
            "at least one sample point is required for pulse evolution"
                .to_string()));
    }
    let generator: Observable = match picture {
        Picture::Interaction => h_unperturbed.clone(),
        Picture::RotatingFrame(frame) =>
            hamiltonians::rrf_generator(spin, &frame),
    };
    let dt: f64
        = if n_points == 1 { pulse_time }
        else { pulse_time / (n_points - 1) as f64 };
    let samples: Vec<Observable>
        = (0..n_points)
        .map(|k| {
            hamiltonians::changed_picture_hamiltonian(
                spin, modes, h_unperturbed, &generator, k as f64 * dt)
        })
        .collect::<NmrResult<Vec<_>>>()?;
    let K: Operator = match order {
        MagnusOrder::First => magnus_first_term(&samples, dt),
        MagnusOrder::Second =>
            magnus_first_term(&samples, dt) + magnus_second_term(&samples, dt),
    };
    let U = exp_i_generator(&K);
    let moved = U.dot(dm_initial.operator()).dot(&U.dagger());
    let back = changed_picture(&moved, &generator, pulse_time, true);
    DensityMatrix::from_matrix(back.into_matrix())
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use rand::SeedableRng;
    use crate::operators::random_observable;
    use super::*;

    fn rng() -> rand::rngs::StdRng { rand::rngs::StdRng::seed_from_u64(10546) }

    fn maxdiff(a: &Operator, b: &Operator) -> f64 {
        (a.matrix() - b.matrix()).iter()
            .map(|x| x.norm())
            .fold(0.0, f64::max)
    }

    fn x_mode(frequency: f64, amplitude: f64) -> PulseMode {
        PulseMode {
            frequency, amplitude, phase: 0.0,
            theta_p: PI / 2.0, phi_p: 0.0,
        }
    }

    #[test]
    fn evolve_zero_time_returns_initial() {
        let spin = NuclearSpin::new(0.5, 1.0).unwrap();
        let h0 = hamiltonians::zeeman(&spin, 0.0, 0.0, 10.0).unwrap();
        let dm = DensityMatrix::maximally_mixed(2);
        let out = evolve(
            &spin, &h0, &dm, &[x_mode(10.0, 1.0)], 0.0,
            Picture::Interaction, 10, MagnusOrder::Second,
        ).unwrap();
        assert_eq!(out, dm);
    }

    #[test]
    fn evolve_rejects_bad_arguments() {
        let spin = NuclearSpin::new(0.5, 1.0).unwrap();
        let h0 = hamiltonians::zeeman(&spin, 0.0, 0.0, 10.0).unwrap();
        let dm = DensityMatrix::maximally_mixed(2);
        assert!(matches!(
            evolve(
                &spin, &h0, &dm, &[], -1.0,
                Picture::Interaction, 10, MagnusOrder::Second,
            ),
            Err(NmrError::InvalidParameter(_))));
        assert!(matches!(
            evolve(
                &spin, &h0, &dm, &[x_mode(10.0, 1.0)], 1.0,
                Picture::Interaction, 0, MagnusOrder::Second,
            ),
            Err(NmrError::InvalidParameter(_))));
    }

    #[test]
    fn maximally_mixed_state_is_stationary() {
        let mut g = rng();
        let spin = NuclearSpin::new(1.5, 1.0).unwrap();
        let h0 = random_observable(4, &mut g);
        let dm = DensityMatrix::maximally_mixed(4);
        let free = free_evolution(&h0, &dm, 3.7).unwrap();
        assert!(maxdiff(free.operator(), dm.operator()) < 1e-10);
        let frame = RotatingFrame {
            reference_frequency: 5.0, theta: 0.0, phi: 0.0,
        };
        let pulsed = evolve(
            &spin, &h0, &dm, &[x_mode(5.0, 0.3)], 1.0,
            Picture::RotatingFrame(frame), 64, MagnusOrder::Second,
        ).unwrap();
        assert!(maxdiff(pulsed.operator(), dm.operator()) < 1e-10);
    }

    #[test]
    fn free_evolution_fixes_stationary_states() {
        let spin = NuclearSpin::new(1.0, 4.2).unwrap();
        let h0 = hamiltonians::zeeman(&spin, 0.0, 0.0, 5.0).unwrap();
        let dm = DensityMatrix::from_matrix(nd::Array2::from_diag(
            &nd::array![C64::from(1.0), C64::from(0.0), C64::from(0.0)],
        )).unwrap();
        let out = free_evolution(&h0, &dm, 2.31).unwrap();
        assert!(maxdiff(out.operator(), dm.operator()) < 1e-12);
    }

    #[test]
    fn zero_amplitude_mode_matches_free_evolution() {
        let spin = NuclearSpin::new(0.5, 1.0).unwrap();
        let h0 = hamiltonians::zeeman(&spin, 0.0, 0.0, 10.0).unwrap();
        // |+x⟩⟨+x|
        let half = C64::from(0.5);
        let dm = DensityMatrix::from_matrix(
            nd::array![[half, half], [half, half]]).unwrap();
        let t: f64 = 0.8;
        let pulsed = evolve(
            &spin, &h0, &dm, &[x_mode(10.0, 0.0)], t,
            Picture::Interaction, 100, MagnusOrder::Second,
        ).unwrap();
        let free = free_evolution(&h0, &dm, t).unwrap();
        assert!(maxdiff(pulsed.operator(), free.operator()) < 1e-10);
    }

    #[test]
    fn resonant_half_pulse_rotates_polarization() {
        let spin = NuclearSpin::new(0.5, 1.0).unwrap();
        let h0 = hamiltonians::zeeman(&spin, 0.0, 0.0, 10.0).unwrap();
        let dm = DensityMatrix::from_matrix(nd::Array2::from_diag(
            &nd::array![C64::from(1.0), C64::from(0.0)])).unwrap();
        assert!((spin.iz().expectation_value(&dm) - 0.5).abs() < 1e-12);
        // pulse area 2π · (amplitude/2) · t = π/2
        let out = evolve(
            &spin, &h0, &dm, &[x_mode(10.0, 1.0)], 0.5,
            Picture::Interaction, 501, MagnusOrder::Second,
        ).unwrap();
        let z = spin.iz().expectation_value(&out);
        assert!(z.abs() < 0.08, "residual longitudinal polarization {}", z);
        let coherence = out.dot(spin.iplus()).trace().norm();
        assert!(coherence > 0.4, "transverse coherence {}", coherence);
    }

    #[test]
    fn setup_composes_static_terms() {
        let spin_par = SpinParams {
            quantum_number: 1.0, gyromagnetic_ratio: 4.2,
        };
        let zeeman_par = ZeemanParams {
            field_magnitude: 5.0, theta_z: 0.0, phi_z: 0.0,
        };
        let (spin, h0, dm) = nuclear_system_setup(
            &spin_par, Some(&zeeman_par), None, &InitialState::MaximallyMixed,
        ).unwrap();
        let expected
            = hamiltonians::zeeman(&spin, 0.0, 0.0, 5.0).unwrap();
        assert!(maxdiff(h0.operator(), expected.operator()) < 1e-12);
        assert_eq!(dm, DensityMatrix::maximally_mixed(3));
    }

    #[test]
    fn setup_rejects_malformed_explicit_state() {
        let spin_par = SpinParams {
            quantum_number: 0.5, gyromagnetic_ratio: 1.0,
        };
        let initial = InitialState::Explicit {
            matrix: vec![vec![(1.0, 0.0)]],
        };
        assert!(matches!(
            nuclear_system_setup(&spin_par, None, None, &initial),
            Err(NmrError::InvalidParameter(_))));
        let initial = InitialState::Explicit {
            matrix: vec![
                vec![(1.0, 0.0), (0.0, 0.0)],
                vec![(0.0, 0.0), (0.0, 0.0)],
            ],
        };
        assert!(nuclear_system_setup(&spin_par, None, None, &initial).is_ok());
    }

    #[test]
    fn default_initial_state_is_cold_canonical() {
        match InitialState::default() {
            InitialState::Canonical { temperature } => {
                assert!((temperature - 1e-4).abs() < 1e-18);
            }
            other => panic!("unexpected default initial state: {:?}", other),
        }
    }
}
