//! Simulation parameters loaded from TOML files.
//!
//! The file layout mirrors the parameter records consumed by
//! [`nuclear_system_setup`][crate::simulation::nuclear_system_setup] and
//! [`evolve`][crate::simulation::evolve]: a `[spin]` table, optional
//! `[zeeman]` and `[quadrupole]` tables, an ordered `[[pulse]]` mode table,
//! an optional `[rotating_frame]` table, and top-level evolution controls.

use std::path::Path;
use serde::{ Deserialize, Serialize };
use crate::error::NmrResult;
use crate::hamiltonians::{ PulseMode, RotatingFrame };
use crate::operators::{ DensityMatrix, Observable };
use crate::simulation::{
    nuclear_system_setup,
    InitialState,
    MagnusOrder,
    Picture,
    QuadrupoleParams,
    SpinParams,
    ZeemanParams,
};
use crate::spin::NuclearSpin;

fn default_n_points() -> usize { 100 }

/// Complete parameter set for a pulsed-NMR simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Spin species.
    pub spin: SpinParams,
    /// Static-field interaction, if any.
    #[serde(default)]
    pub zeeman: Option<ZeemanParams>,
    /// Quadrupole interaction, if any.
    #[serde(default)]
    pub quadrupole: Option<QuadrupoleParams>,
    /// Ordered pulse mode table.
    #[serde(default, rename = "pulse")]
    pub pulses: Vec<PulseMode>,
    /// Rotating reference frame; its presence selects the RRF picture.
    #[serde(default)]
    pub rotating_frame: Option<RotatingFrame>,
    /// Initial state of the ensemble.
    #[serde(default)]
    pub initial: InitialState,
    /// Pulse duration in µs.
    #[serde(default)]
    pub pulse_time: f64,
    /// Number of Hamiltonian samples for the Magnus integrals.
    #[serde(default = "default_n_points")]
    pub n_points: usize,
    /// Truncation order of the Magnus expansion.
    #[serde(default)]
    pub magnus_order: MagnusOrder,
}

impl SimulationConfig {
    /// Read a parameter set from a TOML file.
    ///
    /// Fails with [`NmrError::Io`][crate::error::NmrError::Io] if the file
    /// cannot be read or [`NmrError::Parse`][crate::error::NmrError::Parse]
    /// if it does not parse.
    pub fn load<P>(path: P) -> NmrResult<Self>
    where P: AsRef<Path>
    {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Working picture implied by the parameters: the rotating reference
    /// frame when one is given, otherwise the interaction picture.
    pub fn picture(&self) -> Picture {
        match self.rotating_frame {
            Some(frame) => Picture::RotatingFrame(frame),
            None => Picture::Interaction,
        }
    }

    /// Build the spin, the stationary Hamiltonian, and the initial state
    /// described by these parameters.
    pub fn setup(&self) -> NmrResult<(NuclearSpin, Observable, DensityMatrix)> {
        nuclear_system_setup(
            &self.spin,
            self.zeeman.as_ref(),
            self.quadrupole.as_ref(),
            &self.initial,
        )
    }
}

#[cfg(test)]
mod test {
    use crate::error::NmrError;
    use super::*;

    const FULL: &str = r#"
pulse_time = 0.5
n_points = 250
magnus_order = "first"
initial = "maximally_mixed"

[spin]
quantum_number = 1.5
gyromagnetic_ratio = 4.2

[zeeman]
field_magnitude = 9.4
theta_z = 0.0
phi_z = 0.0

[quadrupole]
coupling_constant = 2.0
asymmetry = 0.3
alpha_q = 0.0
beta_q = 0.5
gamma_q = 0.0

[[pulse]]
frequency = 39.5
amplitude = 0.1
phase = 0.0
theta_p = 1.5707963267948966
phi_p = 0.0

[[pulse]]
frequency = 39.5
amplitude = 0.05
phase = 1.0
theta_p = 1.5707963267948966
phi_p = 1.5707963267948966

[rotating_frame]
reference_frequency = 39.5
theta = 0.0
phi = 0.0
"#;

    #[test]
    fn parse_full_document() {
        let config: SimulationConfig = toml::from_str(FULL).unwrap();
        assert_eq!(config.spin.quantum_number, 1.5);
        assert_eq!(config.zeeman.unwrap().field_magnitude, 9.4);
        assert_eq!(config.quadrupole.unwrap().asymmetry, 0.3);
        assert_eq!(config.pulses.len(), 2);
        assert_eq!(config.pulses[1].phase, 1.0);
        assert_eq!(
            config.rotating_frame.unwrap().reference_frequency, 39.5);
        assert_eq!(config.initial, InitialState::MaximallyMixed);
        assert_eq!(config.pulse_time, 0.5);
        assert_eq!(config.n_points, 250);
        assert_eq!(config.magnus_order, MagnusOrder::First);
        assert!(matches!(config.picture(), Picture::RotatingFrame(_)));
    }

    #[test]
    fn defaults_apply_to_minimal_document() {
        let text = "
[spin]
quantum_number = 0.5
gyromagnetic_ratio = 1.0
";
        let config: SimulationConfig = toml::from_str(text).unwrap();
        assert!(config.zeeman.is_none());
        assert!(config.quadrupole.is_none());
        assert!(config.pulses.is_empty());
        assert!(config.rotating_frame.is_none());
        assert_eq!(
            config.initial, InitialState::Canonical { temperature: 1e-4 });
        assert_eq!(config.pulse_time, 0.0);
        assert_eq!(config.n_points, 100);
        assert_eq!(config.magnus_order, MagnusOrder::Second);
        assert_eq!(config.picture(), Picture::Interaction);
    }

    #[test]
    fn round_trip_preserves_values() {
        let config: SimulationConfig = toml::from_str(FULL).unwrap();
        let text = toml::to_string(&config).unwrap();
        let back: SimulationConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn load_reads_files_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.n_points, 250);

        assert!(matches!(
            SimulationConfig::load(dir.path().join("missing.toml")),
            Err(NmrError::Io(_))));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[spin]\nquantum_number = \"oops\"").unwrap();
        assert!(matches!(
            SimulationConfig::load(&bad), Err(NmrError::Parse(_))));
    }

    #[test]
    fn setup_builds_system_from_config() {
        let config: SimulationConfig = toml::from_str(FULL).unwrap();
        let (spin, h0, dm) = config.setup().unwrap();
        assert_eq!(spin.dim(), 4);
        assert!(h0.is_hermitian(crate::operators::HERM_TOL));
        assert_eq!(dm.dim(), 4);
    }
}
