//! Builders for the interaction Hamiltonians of a nuclear spin: the Zeeman
//! coupling to a static field, the electric quadrupole coupling, and
//! time-dependent radiofrequency pulses, plus the generators used to move
//! between reference frames.
//!
//! All outputs are in MHz. Orientations are given by polar/azimuthal angle
//! pairs in radians, following the convention of
//! [`NuclearSpin::projected`].

use std::f64::consts::TAU;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::error::{ NmrError, NmrResult };
use crate::operators::{ anti_commutator, changed_picture, Observable, Operator };
use crate::spin::NuclearSpin;

/// A single rotating-field component of a radiofrequency pulse.
///
/// `frequency` is the carrier frequency in MHz, `amplitude` the Rabi
/// frequency scale `γ B_1 / 2π` in MHz, `phase` the carrier phase in radians,
/// and `theta_p`/`phi_p` the polar/azimuthal angles of the field direction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseMode {
    pub frequency: f64,
    pub amplitude: f64,
    pub phase: f64,
    pub theta_p: f64,
    pub phi_p: f64,
}

impl PulseMode {
    /// Check the mode parameters for physical validity.
    ///
    /// Fails with [`NmrError::InvalidParameter`] if the amplitude or the
    /// frequency is negative. Zero values are allowed and contribute a null
    /// or static term.
    pub fn validate(&self) -> NmrResult<()> {
        if self.amplitude < 0.0 {
            return Err(NmrError::InvalidParameter(format!(
                "pulse mode amplitude must be non-negative, got {}",
                self.amplitude)));
        }
        if self.frequency < 0.0 {
            return Err(NmrError::InvalidParameter(format!(
                "pulse mode frequency must be non-negative, got {}",
                self.frequency)));
        }
        Ok(())
    }
}

/// Parameters of a rotating reference frame: the rotation frequency in MHz
/// and the polar/azimuthal angles of the rotation axis in radians.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotatingFrame {
    pub reference_frequency: f64,
    pub theta: f64,
    pub phi: f64,
}

/// Compute the Zeeman Hamiltonian `−γ H_0 (n̂ · I)` for a static field of
/// magnitude `field_magnitude` (tesla) along the direction
/// (`theta_z`, `phi_z`).
///
/// Fails with [`NmrError::InvalidParameter`] if `field_magnitude` is
/// negative.
pub fn zeeman(
    spin: &NuclearSpin,
    theta_z: f64,
    phi_z: f64,
    field_magnitude: f64,
) -> NmrResult<Observable>
{
    if field_magnitude < 0.0 {
        return Err(NmrError::InvalidParameter(format!(
            "field magnitude must be non-negative, got {} T",
            field_magnitude)));
    }
    Ok(
        spin.projected(theta_z, phi_z)
            * (-spin.gyromagnetic_ratio() * field_magnitude)
    )
}

/// Compute the electric quadrupole Hamiltonian for coupling constant
/// `e²qQ/h = coupling_constant` (MHz), asymmetry parameter
/// `asymmetry ∈ [0, 1]`, and Euler angles (`alpha_q`, `beta_q`, `gamma_q`)
/// rotating the principal axes of the field gradient into the lab frame.
///
/// Spins with `I = 0` or `I = 1/2` carry no quadrupole moment and yield the
/// zero observable. Fails with [`NmrError::InvalidParameter`] if `asymmetry`
/// lies outside `[0, 1]`.
pub fn quadrupole(
    spin: &NuclearSpin,
    coupling_constant: f64,
    asymmetry: f64,
    alpha_q: f64,
    beta_q: f64,
    gamma_q: f64,
) -> NmrResult<Observable>
{
    if !(0.0..=1.0).contains(&asymmetry) {
        return Err(NmrError::InvalidParameter(format!(
            "asymmetry parameter must fall in [0, 1], got {}", asymmetry)));
    }
    let i_f = spin.quantum_number().f();
    let d = spin.dim();
    if spin.quantum_number().halves() < 2 {
        return Ok(Observable::symmetrized(Operator::zeros(d)));
    }
    let prefactor = coupling_constant / (i_f * (2.0 * i_f - 1.0));
    let iz = spin.iz().operator();
    let secular
        = (iz.dot(iz) * 3.0 - Operator::identity(d) * (i_f * (i_f + 1.0)))
        * (0.5 * v0(asymmetry, beta_q, gamma_q));
    let spinning
        = anti_commutator(iz, spin.iplus())
            * v1(-1, asymmetry, alpha_q, beta_q, gamma_q)
        + anti_commutator(iz, spin.iminus())
            * v1(1, asymmetry, alpha_q, beta_q, gamma_q)
        + spin.iplus().dot(spin.iplus())
            * v2(-2, asymmetry, alpha_q, beta_q, gamma_q)
        + spin.iminus().dot(spin.iminus())
            * v2(2, asymmetry, alpha_q, beta_q, gamma_q);
    let total = (secular + spinning * (6.0_f64.sqrt() / 4.0)) * prefactor;
    Ok(Observable::symmetrized(total))
}

/// Rank-2 spherical component `V_0` of the Wigner-rotated field gradient,
/// with the gradient strength normalized out.
fn v0(eta: f64, beta: f64, gamma: f64) -> f64 {
    0.5 * (
        (3.0 * beta.cos().powi(2) - 1.0) / 2.0
        - eta * beta.sin().powi(2) * (2.0 * gamma).cos() / 2.0
    )
}

/// Rank-2 spherical component `V_{±1}`; only the sign of `sign` is used.
fn v1(sign: i32, eta: f64, alpha: f64, beta: f64, gamma: f64) -> C64 {
    let s = f64::from(sign.signum());
    let spinning
        = C64::i() * (-s) * (3.0_f64 / 8.0).sqrt() * (2.0 * beta).sin()
        * (C64::i() * s * alpha).exp();
    let asymmetric
        = C64::i() * (eta / 6.0_f64.sqrt()) * beta.sin()
        * (
            (C64::i() * (s * alpha + 2.0 * gamma)).exp()
                * (-(1.0 + s * beta.cos()) / 2.0)
            + (C64::i() * (s * alpha - 2.0 * gamma)).exp()
                * ((1.0 - s * beta.cos()) / 2.0)
        );
    (spinning + asymmetric) * 0.5
}

/// Rank-2 spherical component `V_{±2}`; only the sign of `sign` is used.
fn v2(sign: i32, eta: f64, alpha: f64, beta: f64, gamma: f64) -> C64 {
    let s = f64::from(sign.signum());
    let spinning = C64::from((3.0_f64 / 8.0).sqrt() * beta.sin().powi(2));
    let asymmetric
        = (C64::i() * 2.0 * gamma).exp()
            * ((1.0 + s * beta.cos()).powi(2) / 4.0)
        + (C64::i() * (-2.0) * gamma).exp()
            * ((1.0 - s * beta.cos()).powi(2) / 4.0);
    (C64::i() * s * 2.0 * alpha).exp()
        * (spinning + asymmetric * (eta / 6.0_f64.sqrt()))
        * 0.5
}

/// Compute the Hamiltonian of a single pulse mode at the instant `t` (µs),
/// `amplitude · cos(2π · frequency · t + phase) · (n̂ · I)`.
///
/// Fails with [`NmrError::InvalidParameter`] if the mode parameters are
/// invalid; see [`PulseMode::validate`].
pub fn single_mode_pulse(
    spin: &NuclearSpin,
    mode: &PulseMode,
    t: f64,
) -> NmrResult<Observable>
{
    mode.validate()?;
    let envelope
        = mode.amplitude * (TAU * mode.frequency * t + mode.phase).cos();
    Ok(spin.projected(mode.theta_p, mode.phi_p) * envelope)
}

/// Compute the total pulse Hamiltonian of an ordered mode sequence at the
/// instant `t` (µs). An empty sequence yields the zero observable.
pub fn multi_mode_pulse(
    spin: &NuclearSpin,
    modes: &[PulseMode],
    t: f64,
) -> NmrResult<Observable>
{
    let mut acc = Observable::symmetrized(Operator::zeros(spin.dim()));
    for mode in modes.iter() {
        acc = acc + single_mode_pulse(spin, mode, t)?;
    }
    Ok(acc)
}

/// Compute the generator `ν_ref · (n̂ · I)` of a rotating reference frame.
pub fn rrf_generator(spin: &NuclearSpin, frame: &RotatingFrame) -> Observable {
    spin.projected(frame.theta, frame.phi) * frame.reference_frequency
}

/// Compute the total Hamiltonian seen from the moving frame generated by
/// `generator` at the instant `t`,
/// `U(t) · (H_pulse(t) + H_0 − G) · U(t)†` with `U(t) = exp(−i 2π G t)`.
pub fn changed_picture_hamiltonian(
    spin: &NuclearSpin,
    modes: &[PulseMode],
    h_unperturbed: &Observable,
    generator: &Observable,
    t: f64,
) -> NmrResult<Observable>
{
    let total
        = multi_mode_pulse(spin, modes, t)?
        + h_unperturbed.clone()
        - generator.clone();
    let moved = changed_picture(total.operator(), generator, t, false);
    Ok(Observable::symmetrized(moved))
}
