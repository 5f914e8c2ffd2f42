//! Crate-wide error and result types.

use thiserror::Error;

/// Errors raised by the validating constructors, the Hamiltonian builders, the
/// evolution engine, and the parameter/artifact io layers.
#[derive(Debug, Error)]
pub enum NmrError {
    /// A physically impossible input parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A computation left the range of finite floating-point values.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Couldn't read a parameter file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Couldn't parse a TOML parameter file.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Couldn't write an NPZ archive.
    #[error("npz write error: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),
}

pub type NmrResult<T> = Result<T, NmrError>;
