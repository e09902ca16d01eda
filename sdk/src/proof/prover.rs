//! Proof generation driver
//!
//! Resolves circuit artifacts (memoised per circuit name), drives the
//! external prover backend, and re-serializes the result into the on-chain
//! verifier layout. The proof + public-inputs tuple is emitted atomically;
//! no partially-populated request ever leaves this module.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundary::ProverBackend;
use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::proof::Groth16Proof;
use crate::witness::{Circuit, CircuitWitness};

/// Artifact cache eviction policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Keep every artifact for the session (default)
    Unbounded,
    /// Keep at most n artifacts, least-recently-used evicted first
    SizedLru(usize),
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Unbounded
    }
}

/// Prover configuration: where circuit artifacts live and how many to keep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Base URL or path under which `<circuit>.wasm` / `<circuit>.zkey` live
    pub artifact_root: String,
    pub cache_policy: CachePolicy,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            artifact_root: "./artifacts".to_string(),
            cache_policy: CachePolicy::Unbounded,
        }
    }
}

/// Resolved artifact locations for one circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitArtifact {
    pub circuit: Circuit,
    pub witness_generator: String,
    pub proving_key: String,
}

impl CircuitArtifact {
    fn resolve(root: &str, circuit: Circuit) -> Self {
        let base = format!("{}/{}", root.trim_end_matches('/'), circuit.name());
        Self {
            circuit,
            witness_generator: format!("{base}.wasm"),
            proving_key: format!("{base}.zkey"),
        }
    }
}

/// Memoises artifact descriptors per circuit name.
struct ArtifactCache {
    policy: CachePolicy,
    entries: HashMap<&'static str, Arc<CircuitArtifact>>,
    order: VecDeque<&'static str>,
}

impl ArtifactCache {
    fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get_or_resolve(&mut self, root: &str, circuit: Circuit) -> Arc<CircuitArtifact> {
        let name = circuit.name();
        if let Some(artifact) = self.entries.get(name) {
            let artifact = artifact.clone();
            self.touch(name);
            return artifact;
        }

        let artifact = Arc::new(CircuitArtifact::resolve(root, circuit));
        self.entries.insert(name, artifact.clone());
        self.order.push_back(name);
        self.evict();
        artifact
    }

    fn touch(&mut self, name: &'static str) {
        if let Some(pos) = self.order.iter().position(|n| *n == name) {
            self.order.remove(pos);
            self.order.push_back(name);
        }
    }

    fn evict(&mut self) {
        if let CachePolicy::SizedLru(limit) = self.policy {
            while self.entries.len() > limit.max(1) {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(oldest);
                } else {
                    break;
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A completed operation: the formatted proof and its ordered public inputs.
#[derive(Clone, Debug)]
pub struct ProvenOperation {
    pub circuit: Circuit,
    pub proof: Groth16Proof,
    pub public_inputs: Vec<[u8; 32]>,
}

impl ProvenOperation {
    /// The 256-byte buffer handed to the instruction builder.
    pub fn proof_bytes(&self) -> [u8; Groth16Proof::SIZE] {
        self.proof.to_bytes()
    }
}

/// Drives the external prover for typed witnesses.
pub struct ProofGenerator {
    backend: Arc<dyn ProverBackend>,
    config: ProverConfig,
    cache: Mutex<ArtifactCache>,
}

impl ProofGenerator {
    pub fn new(backend: Arc<dyn ProverBackend>, config: ProverConfig) -> Self {
        let cache = Mutex::new(ArtifactCache::new(config.cache_policy));
        Self {
            backend,
            config,
            cache,
        }
    }

    /// Resolve (and memoise) the artifact descriptor for a circuit.
    pub fn artifact(&self, circuit: Circuit) -> Arc<CircuitArtifact> {
        let mut cache = self.cache.lock().expect("artifact cache poisoned");
        cache.get_or_resolve(&self.config.artifact_root, circuit)
    }

    pub fn cached_artifacts(&self) -> usize {
        self.cache.lock().expect("artifact cache poisoned").len()
    }

    /// Build a proof for a fully-constructed witness.
    ///
    /// Witness construction has already completed by the time this runs; on
    /// cancellation nothing partial is returned.
    pub async fn prove<W: CircuitWitness>(
        &self,
        witness: &W,
        cancel: &CancelToken,
    ) -> Result<ProvenOperation> {
        cancel.check()?;

        let circuit = witness.circuit();
        let artifact = self.artifact(circuit);
        let inputs = witness.input_map();
        let public_inputs = witness.public_inputs();

        info!(circuit = circuit.name(), "invoking prover backend");
        let raw = self.backend.prove(&artifact, &inputs).await?;
        cancel.check()?;

        Ok(ProvenOperation {
            circuit,
            proof: Groth16Proof::from_prover(&raw),
            public_inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::ProverBackend;
    use crate::errors::SdkError;
    use crate::proof::{G1Point, G2Point, ProverProof};
    use crate::witness::WitnessMap;
    use async_trait::async_trait;

    struct StaticBackend;

    #[async_trait]
    impl ProverBackend for StaticBackend {
        async fn prove(
            &self,
            _artifact: &CircuitArtifact,
            _inputs: &WitnessMap,
        ) -> Result<ProverProof> {
            Ok(ProverProof {
                a: G1Point {
                    x: [1u8; 32],
                    y: [2u8; 32],
                },
                b: G2Point {
                    x_real: [3u8; 32],
                    x_imag: [4u8; 32],
                    y_real: [5u8; 32],
                    y_imag: [6u8; 32],
                },
                c: G1Point {
                    x: [7u8; 32],
                    y: [8u8; 32],
                },
            })
        }
    }

    #[test]
    fn test_artifact_resolution_and_memoisation() {
        let generator = Arc::new(StaticBackend);
        let prover = ProofGenerator::new(generator, ProverConfig::default());

        let first = prover.artifact(Circuit::Transfer1x2);
        assert!(first.witness_generator.ends_with("transfer/1x2.wasm"));
        assert!(first.proving_key.ends_with("transfer/1x2.zkey"));

        let second = prover.artifact(Circuit::Transfer1x2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(prover.cached_artifacts(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let config = ProverConfig {
            artifact_root: "https://example.org/circuits".to_string(),
            cache_policy: CachePolicy::SizedLru(2),
        };
        let prover = ProofGenerator::new(Arc::new(StaticBackend), config);

        prover.artifact(Circuit::Transfer1x2);
        prover.artifact(Circuit::Consolidate3x1);
        prover.artifact(Circuit::Swap);
        assert_eq!(prover.cached_artifacts(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_before_prove() {
        use crate::witness::tests::dummy_witness;

        let prover = ProofGenerator::new(Arc::new(StaticBackend), ProverConfig::default());
        let cancel = CancelToken::new();
        cancel.cancel();

        let witness = dummy_witness();
        let result = prover.prove(&witness, &cancel).await;
        assert_eq!(result.err(), Some(SdkError::Cancelled));
    }

    #[tokio::test]
    async fn test_prove_formats_output() {
        use crate::witness::tests::dummy_witness;

        let prover = ProofGenerator::new(Arc::new(StaticBackend), ProverConfig::default());
        let witness = dummy_witness();
        let proven = prover.prove(&witness, &CancelToken::new()).await.unwrap();

        // A.x survives, G2 coordinates swapped by the formatter
        let bytes = proven.proof_bytes();
        assert_eq!(&bytes[0..32], &[1u8; 32]);
        assert_eq!(&bytes[64..96], &[4u8; 32]);
    }
}
