//! On-disk circuit artifacts
//!
//! Each circuit persists three files under one directory:
//! `{circuit_id}.r1cs` (constraint system), `{circuit_id}.pk` and
//! `{circuit_id}.vk`. Loads happen on every call so that re-running setup
//! takes effect without a restart.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{
    AlgorithmId, CircuitError, ConstraintSystem, ProvingBackend, ProvingKey, Result,
    VerifyingKey,
};

#[derive(Debug, Clone)]
pub struct CircuitStore {
    dir: PathBuf,
}

impl CircuitStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn system_path(&self, circuit: AlgorithmId) -> PathBuf {
        self.path(circuit, "r1cs")
    }

    pub fn proving_key_path(&self, circuit: AlgorithmId) -> PathBuf {
        self.path(circuit, "pk")
    }

    pub fn verifying_key_path(&self, circuit: AlgorithmId) -> PathBuf {
        self.path(circuit, "vk")
    }

    fn path(&self, circuit: AlgorithmId, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", circuit.circuit_id()))
    }

    /// Whether all three artifacts exist for `circuit`.
    pub fn is_initialized(&self, circuit: AlgorithmId) -> bool {
        self.system_path(circuit).exists()
            && self.proving_key_path(circuit).exists()
            && self.verifying_key_path(circuit).exists()
    }

    /// Compile, run setup and persist one circuit, replacing existing files.
    pub fn initialize(&self, backend: &dyn ProvingBackend, circuit: AlgorithmId) -> Result<()> {
        let system = backend.compile(circuit);
        let (proving_key, verifying_key) = backend.setup(&system)?;
        self.save(&system, &proving_key, &verifying_key)?;

        info!(
            circuit = %circuit,
            dir = %self.dir.display(),
            digest = %hex::encode(system.digest),
            "Circuit initialized"
        );
        Ok(())
    }

    pub fn save(
        &self,
        system: &ConstraintSystem,
        proving_key: &ProvingKey,
        verifying_key: &VerifyingKey,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CircuitError::Artifact(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        write_artifact(&self.system_path(system.circuit), system)?;
        write_artifact(&self.proving_key_path(system.circuit), proving_key)?;
        write_artifact(&self.verifying_key_path(system.circuit), verifying_key)
    }

    pub fn load_system(&self, circuit: AlgorithmId) -> Result<ConstraintSystem> {
        let system: ConstraintSystem = read_artifact(&self.system_path(circuit))?;
        ensure_circuit(circuit, system.circuit)?;
        Ok(system)
    }

    pub fn load_proving_key(&self, circuit: AlgorithmId) -> Result<ProvingKey> {
        let key: ProvingKey = read_artifact(&self.proving_key_path(circuit))?;
        ensure_circuit(circuit, key.circuit)?;
        Ok(key)
    }

    pub fn load_verifying_key(&self, circuit: AlgorithmId) -> Result<VerifyingKey> {
        let key: VerifyingKey = read_artifact(&self.verifying_key_path(circuit))?;
        ensure_circuit(circuit, key.circuit)?;
        Ok(key)
    }
}

fn ensure_circuit(expected: AlgorithmId, actual: AlgorithmId) -> Result<()> {
    if expected != actual {
        return Err(CircuitError::CircuitMismatch { expected, actual });
    }
    Ok(())
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    std::fs::write(path, bytes)
        .map_err(|e| CircuitError::Artifact(format!("cannot write {}: {e}", path.display())))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| CircuitError::Artifact(format!("cannot read {}: {e}", path.display())))?;
    Ok(bincode::deserialize(&bytes)?)
}
