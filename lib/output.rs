//! NPZ artifact writers for simulation outputs.
//!
//! Each writer produces a single `.npz` archive whose member arrays can be
//! loaded directly by the usual numerical plotting tools. Complex signals
//! are split into `re`/`im` members so no reader-side complex support is
//! needed.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use num_complex::Complex64 as C64;
use crate::error::NmrResult;
use crate::spectra::TransitionSpectrum;

/// Write a time-domain signal as members `times`, `re`, and `im`.
pub fn write_signal<P>(
    path: P,
    times: &nd::Array1<f64>,
    signal: &nd::Array1<C64>,
) -> NmrResult<()>
where P: AsRef<Path>
{
    let mut npz = NpzWriter::new(BufWriter::new(File::create(path)?));
    npz.add_array("times", times)?;
    npz.add_array("re", &signal.mapv(|s| s.re))?;
    npz.add_array("im", &signal.mapv(|s| s.im))?;
    npz.finish()?;
    Ok(())
}

/// Write a frequency-domain spectrum as members `frequencies`, `re`, and
/// `im`.
pub fn write_spectrum<P>(
    path: P,
    frequencies: &nd::Array1<f64>,
    spectrum: &nd::Array1<C64>,
) -> NmrResult<()>
where P: AsRef<Path>
{
    let mut npz = NpzWriter::new(BufWriter::new(File::create(path)?));
    npz.add_array("frequencies", frequencies)?;
    npz.add_array("re", &spectrum.mapv(|s| s.re))?;
    npz.add_array("im", &spectrum.mapv(|s| s.im))?;
    npz.finish()?;
    Ok(())
}

/// Write a discrete transition spectrum as members `frequencies` and
/// `intensities`, in line order.
pub fn write_transitions<P>(
    path: P,
    transitions: &TransitionSpectrum,
) -> NmrResult<()>
where P: AsRef<Path>
{
    let (frequencies, intensities) = transitions.to_arrays();
    let mut npz = NpzWriter::new(BufWriter::new(File::create(path)?));
    npz.add_array("frequencies", &frequencies)?;
    npz.add_array("intensities", &intensities)?;
    npz.finish()?;
    Ok(())
}
