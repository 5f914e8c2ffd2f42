//! Derivation of observable signals from the simulated state: discrete
//! transition spectra, free-induction decay (FID) synthesis, and the windowed
//! Fourier analysis used to read frequencies and phases back out of the
//! signal.

use std::f64::consts::TAU;
use std::ops::{ Deref, DerefMut };
use indexmap::IndexMap;
use itertools::Itertools;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::error::{ NmrError, NmrResult };
use crate::operators::{ DensityMatrix, Observable };
use crate::spin::NuclearSpin;

/// Number of frequency samples returned by [`fourier_transform_signal`].
pub const FT_POINTS: usize = 1000;

/// Half-width of the frequency window searched by [`fourier_phase_shift`],
/// in MHz.
pub const PEAK_WINDOW: f64 = 0.25;

/// Samples per microsecond in [`fid_signal`]'s time grid.
pub const FID_RATE: f64 = 10.0;

/// A single observable transition: its frequency in MHz and its relative
/// intensity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransitionLine {
    pub frequency: f64,
    pub intensity: f64,
}

/// The discrete transition spectrum of a stationary Hamiltonian: one line per
/// unordered eigenstate pair `(i, j)` with `i < j`, keyed by the pair in
/// insertion order.
///
/// This collection is backed by a single [`IndexMap`], which can be accessed
/// via [`AsRef`], [`AsMut`], [`Deref`] and [`DerefMut`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionSpectrum {
    lines: IndexMap<(usize, usize), TransitionLine>,
}

impl AsRef<IndexMap<(usize, usize), TransitionLine>> for TransitionSpectrum {
    fn as_ref(&self) -> &IndexMap<(usize, usize), TransitionLine> {
        &self.lines
    }
}

impl AsMut<IndexMap<(usize, usize), TransitionLine>> for TransitionSpectrum {
    fn as_mut(&mut self) -> &mut IndexMap<(usize, usize), TransitionLine> {
        &mut self.lines
    }
}

impl Deref for TransitionSpectrum {
    type Target = IndexMap<(usize, usize), TransitionLine>;

    fn deref(&self) -> &Self::Target { &self.lines }
}

impl DerefMut for TransitionSpectrum {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.lines }
}

impl Default for TransitionSpectrum {
    fn default() -> Self { Self { lines: IndexMap::default() } }
}

impl FromIterator<((usize, usize), TransitionLine)> for TransitionSpectrum {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = ((usize, usize), TransitionLine)>
    {
        Self { lines: iter.into_iter().collect() }
    }
}

impl TransitionSpectrum {
    /// Create a new, empty spectrum.
    pub fn new() -> Self { Self::default() }

    /// Get the line for a particular eigenstate pair.
    pub fn get_line(&self, i: usize, j: usize) -> Option<TransitionLine> {
        self.lines.get(&(i, j)).copied()
    }

    /// Return the largest intensity over all lines, if any.
    pub fn max_intensity(&self) -> Option<f64> {
        self.lines.values().map(|line| line.intensity).reduce(f64::max)
    }

    /// Return arrays of the line frequencies and intensities, in key order.
    pub fn to_arrays(&self) -> (nd::Array1<f64>, nd::Array1<f64>) {
        (
            self.lines.values().map(|line| line.frequency).collect(),
            self.lines.values().map(|line| line.intensity).collect(),
        )
    }
}

/// Compute the discrete transition spectrum of `h` for an ensemble prepared
/// in `dm_initial`.
///
/// `h` is diagonalized once; for each unordered eigenstate pair `(i, j)` with
/// `i < j` (eigenvalues ascending) the line frequency is `E_j − E_i` and the
/// intensity is `|⟨j| I_x |i⟩|² · |p_i − p_j|`, with `p` the initial
/// populations in the eigenbasis. With `normalized` the intensities are
/// scaled so the largest equals 1; a spectrum of all-zero intensities is left
/// untouched.
pub fn transition_spectrum(
    spin: &NuclearSpin,
    h: &Observable,
    dm_initial: &DensityMatrix,
    normalized: bool,
) -> TransitionSpectrum
{
    let d = spin.dim();
    let (E, V) = h.eigh();
    let Vdag = V.t().mapv(|a| a.conj());
    let x_e = Vdag.dot(spin.ix().matrix()).dot(&V);
    let rho_e = Vdag.dot(dm_initial.matrix()).dot(&V);
    let p: nd::Array1<f64> = rho_e.diag().mapv(|a| a.re);
    let mut spectrum: TransitionSpectrum
        = (0..d).tuple_combinations()
        .map(|(i, j)| {
            let line = TransitionLine {
                frequency: E[j] - E[i],
                intensity: x_e[[j, i]].norm_sqr() * (p[i] - p[j]).abs(),
            };
            ((i, j), line)
        })
        .collect();
    if normalized {
        if let Some(max) = spectrum.max_intensity() {
            if max > 0.0 {
                spectrum.values_mut()
                    .for_each(|line| { line.intensity /= max; });
            }
        }
    }
    spectrum
}

/// Synthesize the free-induction decay observed from `dm` evolving under the
/// stationary Hamiltonian `h`.
///
/// The signal is sampled at [`FID_RATE`] points per microsecond (at least
/// two) on a uniform grid spanning `[0, time_window]` µs:
/// `s(t) = Tr[ρ(t) · I_+ · e^(−i φ)] · e^(−t / t2)`, with `ρ(t)` advanced by
/// exact exponentiation of `h`. Returns the sample times and the complex
/// signal.
///
/// `t2` is the transverse relaxation time in µs; pass `f64::INFINITY` for no
/// decay. Fails with [`NmrError::InvalidParameter`] if `time_window` is
/// negative or `t2` is not positive.
pub fn fid_signal(
    spin: &NuclearSpin,
    h: &Observable,
    dm: &DensityMatrix,
    time_window: f64,
    t2: f64,
    phi: f64,
) -> NmrResult<(nd::Array1<f64>, nd::Array1<C64>)>
{
    if time_window < 0.0 {
        return Err(NmrError::InvalidParameter(format!(
            "acquisition window must be non-negative, got {} µs",
            time_window)));
    }
    if t2 <= 0.0 {
        return Err(NmrError::InvalidParameter(format!(
            "transverse relaxation time must be positive, got {} µs", t2)));
    }
    let n = ((time_window * FID_RATE) as usize).max(2);
    let times = nd::Array1::linspace(0.0, time_window, n);
    let (E, V) = h.eigh();
    let Vdag = V.t().mapv(|a| a.conj());
    let rho_e = Vdag.dot(dm.matrix()).dot(&V);
    let detection = spin.iplus().matrix() * (C64::i() * (-phi)).exp();
    let det_e = Vdag.dot(&detection).dot(&V);
    let d = E.len();
    let signal: nd::Array1<C64>
        = times.iter()
        .map(|&t| {
            let phases: nd::Array1<C64>
                = E.mapv(|e| (C64::i() * TAU * e * t).exp());
            let mut acc = C64::zero();
            for a in 0..d {
                for b in 0..d {
                    acc += phases[a] * phases[b].conj()
                        * rho_e[[a, b]] * det_e[[b, a]];
                }
            }
            acc * (-t / t2).exp()
        })
        .collect();
    Ok((times, signal))
}

/// Compute the direct discrete Fourier transform of a uniformly sampled
/// signal on [`FT_POINTS`] frequencies spanning `[freq_min, freq_max]` MHz,
/// `F(ν) = Σ_k s(t_k) · e^(−i 2π ν t_k) · Δt`.
///
/// Returns the frequency grid and the complex spectrum. Fails with
/// [`NmrError::InvalidParameter`] if the signal and time arrays differ in
/// length or hold fewer than two samples.
pub fn fourier_transform_signal(
    signal: &nd::Array1<C64>,
    times: &nd::Array1<f64>,
    freq_min: f64,
    freq_max: f64,
) -> NmrResult<(nd::Array1<f64>, nd::Array1<C64>)>
{
    if signal.len() != times.len() {
        return Err(NmrError::InvalidParameter(format!(
            "signal and time arrays must have equal lengths, got {} and {}",
            signal.len(), times.len())));
    }
    if times.len() < 2 {
        return Err(NmrError::InvalidParameter(
            "at least two signal samples are required".to_string()));
    }
    let dt = times[1] - times[0];
    let freqs = nd::Array1::linspace(freq_min, freq_max, FT_POINTS);
    let spectrum: nd::Array1<C64>
        = freqs.mapv(|f| {
            signal.iter().zip(times.iter())
                .map(|(s, &t)| s * (-C64::i() * TAU * f * t).exp())
                .sum::<C64>()
                * dt
        });
    Ok((freqs, spectrum))
}

/// Estimate the acquisition phase correction from a computed spectrum.
///
/// Among the sampled frequencies within [`PEAK_WINDOW`] MHz of
/// `peak_frequency_hint` (falling back to the single nearest sample if the
/// window holds none), the largest-magnitude spectral value is selected, and
/// the returned phase `φ = −arg F` is the one that rotates it onto the
/// positive real axis.
pub fn fourier_phase_shift(
    freqs: &nd::Array1<f64>,
    spectrum: &nd::Array1<C64>,
    peak_frequency_hint: f64,
) -> NmrResult<f64>
{
    if freqs.len() != spectrum.len() {
        return Err(NmrError::InvalidParameter(format!(
            "frequency and spectrum arrays must have equal lengths, \
            got {} and {}", freqs.len(), spectrum.len())));
    }
    if freqs.is_empty() {
        return Err(NmrError::InvalidParameter(
            "cannot locate a peak in an empty spectrum".to_string()));
    }
    let mut peak: Option<C64> = None;
    for (&f, &s) in freqs.iter().zip(spectrum.iter()) {
        if (f - peak_frequency_hint).abs() <= PEAK_WINDOW
            && peak.map(|p| s.norm() > p.norm()).unwrap_or(true)
        {
            peak = Some(s);
        }
    }
    let peak = match peak {
        Some(s) => s,
        None => {
            let mut nearest = (f64::INFINITY, C64::zero());
            for (&f, &s) in freqs.iter().zip(spectrum.iter()) {
                let dist = (f - peak_frequency_hint).abs();
                if dist < nearest.0 { nearest = (dist, s); }
            }
            nearest.1
        }
    };
    Ok(-peak.arg())
}
