#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Simulation of the dynamics of a single nuclear spin in a static magnetic
//! field, driven by electromagnetic pulses and an optional electric
//! quadrupole coupling.
//!
//! Spin operators are constructed for arbitrary (half-)integer spin, static
//! and pulse Hamiltonians are assembled from lab-frame parameters, and
//! density matrices are evolved with first- or second-order average
//! Hamiltonians in a chosen dynamical picture. Free-induction decay signals,
//! their Fourier transforms, and discrete transition spectra are computed
//! from the evolved states.

pub mod error;
pub mod operators;
pub mod spin;
pub mod hamiltonians;
pub mod simulation;
pub mod spectra;
pub mod config;
pub mod output;
