//! Operation pipelines
//!
//! Glue for the typical flows: shield a new note, spend a scanned note
//! through the transfer circuit, consolidate fragments. Each pipeline
//! completes witness construction before the prover is invoked and emits
//! the resulting (proof, public inputs, commitments, encrypted notes,
//! nullifiers) tuple atomically; nothing partial ever leaves.

use std::sync::Arc;

use rand::{CryptoRng, RngCore};

use crate::boundary::{MerkleProvider, ProverBackend};
use crate::cancel::CancelToken;
use crate::crypto::babyjubjub::Point;
use crate::crypto::keys::Wallet;
use crate::crypto::stealth::{self, StealthAddress};
use crate::errors::{Result, SdkError};
use crate::field::id_to_field;
use crate::merkle;
use crate::note::commitment::{commit_standard, random_fr};
use crate::note::encrypted::{seal_note, to_chain_layout};
use crate::note::{Note, NotePlaintext};
use crate::proof::prover::{ProofGenerator, ProvenOperation, ProverConfig};
use crate::scanner::OwnedNote;
use crate::witness::transfer::{
    build_consolidate, build_transfer, ConsolidateRequest, OutputSpec, TransferRequest,
};
use crate::witness::StandardInput;

/// Everything the shield instruction needs.
#[derive(Clone, Debug)]
pub struct ShieldOperation {
    pub commitment: [u8; 32],
    /// Fixed on-chain encrypted-note record
    pub encrypted_note: Vec<u8>,
    pub stealth_address: StealthAddress,
    pub note: Note,
}

/// Shield tokens to a recipient: derive a one-time address, build the note,
/// commit, and seal the ciphertext under the same ephemeral.
pub fn build_shield<R: RngCore + CryptoRng>(
    recipient: &Point,
    token_mint: &[u8; 32],
    amount: u64,
    rng: &mut R,
) -> Result<ShieldOperation> {
    let generated = stealth::generate(recipient, rng)?;

    let note = Note {
        stealth_pub_x: generated.address.stealth_pubkey.x,
        token_mint: id_to_field(token_mint),
        amount,
        randomness: random_fr(rng),
    };
    let commitment =
        commit_standard(&note.stealth_pub_x, &note.token_mint, amount, &note.randomness)?;

    let ciphertext = seal_note(
        &NotePlaintext::Standard(note),
        recipient,
        &generated.ephemeral_scalar,
        rng,
    )?;

    Ok(ShieldOperation {
        commitment,
        encrypted_note: to_chain_layout(&ciphertext)?,
        stealth_address: generated.address,
        note,
    })
}

/// A completed spend ready for the instruction builder.
#[derive(Clone, Debug)]
pub struct SpendBundle {
    pub proven: ProvenOperation,
    pub merkle_root: [u8; 32],
    pub nullifiers: Vec<[u8; 32]>,
    pub out_commitments: Vec<[u8; 32]>,
    /// One fixed-layout record per output commitment, in order
    pub encrypted_notes: Vec<Vec<u8>>,
}

/// Drives scan results through witness construction and proving.
pub struct SpendPipeline {
    generator: ProofGenerator,
    merkle: Arc<dyn MerkleProvider>,
}

impl SpendPipeline {
    pub fn new(
        backend: Arc<dyn ProverBackend>,
        config: ProverConfig,
        merkle: Arc<dyn MerkleProvider>,
    ) -> Self {
        Self {
            generator: ProofGenerator::new(backend, config),
            merkle,
        }
    }

    /// Spend one scanned note: `amount` to the recipient, the rest back to
    /// the wallet as change, minus unshield and fee.
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer<R: RngCore + CryptoRng>(
        &self,
        wallet: &Wallet,
        input: &OwnedNote,
        recipient: &Point,
        amount: u64,
        unshield_amount: u64,
        fee_amount: u64,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<SpendBundle> {
        let opened = self.open_standard(input).await?;
        let change = opened
            .note
            .amount
            .checked_sub(amount)
            .and_then(|rest| rest.checked_sub(unshield_amount))
            .and_then(|rest| rest.checked_sub(fee_amount))
            .ok_or(SdkError::Unbalanced)?;

        // one-time addresses for both outputs; change returns to the wallet
        let to_recipient = stealth::generate(recipient, rng)?;
        let to_self = stealth::generate(wallet.public_key(), rng)?;

        let witness = build_transfer(
            wallet,
            &TransferRequest {
                input: opened,
                outputs: [
                    OutputSpec {
                        stealth_pub_x: to_recipient.address.stealth_pubkey.x,
                        amount,
                    },
                    OutputSpec {
                        stealth_pub_x: to_self.address.stealth_pubkey.x,
                        amount: change,
                    },
                ],
                unshield_amount,
                fee_amount,
            },
            rng,
        )?;

        // the witness's sampled randomness goes into the ciphertexts verbatim
        let sealed_recipient = seal_note(
            &NotePlaintext::Standard(witness.output_notes[0]),
            recipient,
            &to_recipient.ephemeral_scalar,
            rng,
        )?;
        let sealed_change = seal_note(
            &NotePlaintext::Standard(witness.output_notes[1]),
            wallet.public_key(),
            &to_self.ephemeral_scalar,
            rng,
        )?;

        let merkle_root = witness.merkle_root;
        let nullifier = witness.nullifier;
        let out_commitments = witness.out_commitments.to_vec();
        let proven = self.generator.prove(&witness, cancel).await?;

        Ok(SpendBundle {
            proven,
            merkle_root,
            nullifiers: vec![nullifier],
            out_commitments,
            encrypted_notes: vec![
                to_chain_layout(&sealed_recipient)?,
                to_chain_layout(&sealed_change)?,
            ],
        })
    }

    /// Merge 2..=3 scanned notes into a single note back to the wallet.
    pub async fn consolidate<R: RngCore + CryptoRng>(
        &self,
        wallet: &Wallet,
        inputs: &[OwnedNote],
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<SpendBundle> {
        let mut opened = Vec::with_capacity(inputs.len());
        for input in inputs {
            opened.push(self.open_standard(input).await?);
        }

        let to_self = stealth::generate(wallet.public_key(), rng)?;
        let witness = build_consolidate(
            wallet,
            &ConsolidateRequest {
                inputs: opened,
                output_stealth_pub_x: to_self.address.stealth_pubkey.x,
            },
            rng,
        )?;

        let sealed = seal_note(
            &NotePlaintext::Standard(witness.output_note),
            wallet.public_key(),
            &to_self.ephemeral_scalar,
            rng,
        )?;

        let merkle_root = witness.merkle_root;
        let nullifiers = witness
            .nullifiers
            .iter()
            .filter(|n| **n != [0u8; 32])
            .copied()
            .collect();
        let out_commitments = vec![witness.out_commitment];
        let proven = self.generator.prove(&witness, cancel).await?;

        Ok(SpendBundle {
            proven,
            merkle_root,
            nullifiers,
            out_commitments,
            encrypted_notes: vec![to_chain_layout(&sealed)?],
        })
    }

    /// Fetch and locally verify the Merkle proof for a scanned note, then
    /// open it as circuit input.
    async fn open_standard(&self, input: &OwnedNote) -> Result<StandardInput> {
        let note = match input.plaintext {
            NotePlaintext::Standard(note) => note,
            _ => return Err(SdkError::InvalidNoteKind),
        };

        let proof = self.merkle.merkle_proof(&input.account_hash).await?;
        if !merkle::verify_proof(&proof, &input.commitment)? {
            return Err(SdkError::Boundary(
                "merkle proof does not open the note's commitment".to_string(),
            ));
        }

        Ok(StandardInput {
            note,
            commitment: input.commitment,
            merkle: proof,
            stealth_ephemeral: Some(input.stealth_ephemeral),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MerkleProofResult;
    use crate::field::u64_to_field;
    use crate::note::commitment::commitment_of;
    use crate::proof::prover::CircuitArtifact;
    use crate::proof::{G1Point, G2Point, ProverProof};
    use crate::witness::WitnessMap;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct EmptyTreeMerkle;

    #[async_trait]
    impl MerkleProvider for EmptyTreeMerkle {
        async fn merkle_proof(&self, account_hash: &str) -> Result<MerkleProofResult> {
            // a one-leaf tree: every sibling is an empty subtree
            let leaf_index: u64 = account_hash
                .rsplit('-')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            Ok(MerkleProofResult {
                root: [0u8; 32],
                path: Vec::new(),
                path_indices: Vec::new(),
                leaf_index,
            })
        }
    }

    struct CheckingBackend;

    #[async_trait]
    impl ProverBackend for CheckingBackend {
        async fn prove(
            &self,
            artifact: &CircuitArtifact,
            inputs: &WitnessMap,
        ) -> Result<ProverProof> {
            assert!(!inputs.is_empty());
            assert!(!artifact.proving_key.is_empty());
            Ok(ProverProof {
                a: G1Point {
                    x: u64_to_field(1),
                    y: u64_to_field(2),
                },
                b: G2Point {
                    x_real: u64_to_field(3),
                    x_imag: u64_to_field(4),
                    y_real: u64_to_field(5),
                    y_imag: u64_to_field(6),
                },
                c: G1Point {
                    x: u64_to_field(7),
                    y: u64_to_field(8),
                },
            })
        }
    }

    fn owned_note(wallet: &Wallet, amount: u64, leaf_index: u64, rng: &mut StdRng) -> OwnedNote {
        let generated = stealth::generate(wallet.public_key(), rng).unwrap();
        let plaintext = NotePlaintext::Standard(Note {
            stealth_pub_x: generated.address.stealth_pubkey.x,
            token_mint: u64_to_field(800),
            amount,
            randomness: random_fr(rng),
        });
        let commitment = commitment_of(&plaintext).unwrap();
        OwnedNote {
            plaintext,
            commitment,
            leaf_index,
            pool_id: u64_to_field(30),
            account_hash: format!("acct-{leaf_index}"),
            slot: 1,
            nullifier: [0u8; 32],
            stealth_ephemeral: generated.address.ephemeral_pubkey,
            spent: false,
        }
    }

    /// Build a real tree over the leaves so every proof opens under one root.
    fn tree_proofs(leaves: &[[u8; 32]]) -> Vec<MerkleProofResult> {
        use crate::constants::MERKLE_TREE_DEPTH;

        let mut paths: Vec<Vec<[u8; 32]>> = vec![Vec::new(); leaves.len()];
        let mut indices: Vec<Vec<u8>> = vec![Vec::new(); leaves.len()];
        let mut positions: Vec<usize> = (0..leaves.len()).collect();
        let mut level: Vec<[u8; 32]> = leaves.to_vec();
        let mut empty = merkle::empty_leaf().unwrap();

        for _ in 0..MERKLE_TREE_DEPTH {
            if level.len() % 2 == 1 {
                level.push(empty);
            }
            for (leaf, pos) in positions.iter_mut().enumerate() {
                paths[leaf].push(level[*pos ^ 1]);
                indices[leaf].push((*pos & 1) as u8);
                *pos /= 2;
            }
            level = level
                .chunks(2)
                .map(|pair| merkle::hash_pair(&pair[0], &pair[1]).unwrap())
                .collect();
            empty = merkle::hash_pair(&empty, &empty).unwrap();
        }

        let root = level[0];
        (0..leaves.len())
            .map(|leaf| MerkleProofResult {
                root,
                path: paths[leaf].clone(),
                path_indices: indices[leaf].clone(),
                leaf_index: leaf as u64,
            })
            .collect()
    }

    /// A merkle provider whose proofs actually open the commitments.
    struct ConsistentMerkle {
        proofs: Vec<MerkleProofResult>,
    }

    impl ConsistentMerkle {
        fn over(commitments: &[[u8; 32]]) -> Self {
            Self {
                proofs: tree_proofs(commitments),
            }
        }
    }

    #[async_trait]
    impl MerkleProvider for ConsistentMerkle {
        async fn merkle_proof(&self, account_hash: &str) -> Result<MerkleProofResult> {
            let leaf_index: usize =
                account_hash.rsplit('-').next().unwrap().parse().unwrap();
            Ok(self.proofs[leaf_index].clone())
        }
    }

    #[test]
    fn test_shield_commitment_matches_ciphertext() {
        let mut rng = StdRng::seed_from_u64(901);
        let wallet = Wallet::create(&mut rng).unwrap();

        let shield =
            build_shield(wallet.public_key(), &[0x12u8; 32], 5_000, &mut rng).unwrap();

        // the recipient can open the record and recompute the commitment
        let ciphertext =
            crate::note::encrypted::from_chain_layout(&shield.encrypted_note).unwrap();
        let plaintext = crate::crypto::ecies::decrypt(
            &ciphertext,
            wallet.spending_key().unwrap(),
        )
        .unwrap();
        let parsed = NotePlaintext::parse(&plaintext).unwrap();
        assert_eq!(parsed, NotePlaintext::Standard(shield.note));
        assert_eq!(commitment_of(&parsed).unwrap(), shield.commitment);
    }

    #[tokio::test]
    async fn test_transfer_pipeline_emits_complete_bundle() {
        let mut rng = StdRng::seed_from_u64(902);
        let alice = Wallet::create(&mut rng).unwrap();
        let bob = Wallet::create(&mut rng).unwrap();

        let input = owned_note(&alice, 100, 0, &mut rng);
        let pipeline = SpendPipeline::new(
            Arc::new(CheckingBackend),
            ProverConfig::default(),
            Arc::new(ConsistentMerkle::over(&[input.commitment])),
        );

        let bundle = pipeline
            .transfer(
                &alice,
                &input,
                bob.public_key(),
                70,
                4,
                1,
                &mut rng,
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(bundle.nullifiers.len(), 1);
        assert_eq!(bundle.out_commitments.len(), 2);
        assert_eq!(bundle.encrypted_notes.len(), 2);
        assert_eq!(bundle.proven.public_inputs.len(), 8);

        // Bob recovers his output and it reproduces the first commitment
        let ciphertext =
            crate::note::encrypted::from_chain_layout(&bundle.encrypted_notes[0]).unwrap();
        let plaintext = crate::crypto::ecies::decrypt(
            &ciphertext,
            bob.spending_key().unwrap(),
        )
        .unwrap();
        let parsed = NotePlaintext::parse(&plaintext).unwrap();
        assert_eq!(parsed.amount(), 70);
        assert_eq!(commitment_of(&parsed).unwrap(), bundle.out_commitments[0]);
    }

    #[tokio::test]
    async fn test_transfer_rejects_mismatched_merkle_proof() {
        let mut rng = StdRng::seed_from_u64(903);
        let alice = Wallet::create(&mut rng).unwrap();
        let bob = Wallet::create(&mut rng).unwrap();

        let input = owned_note(&alice, 100, 0, &mut rng);
        let pipeline = SpendPipeline::new(
            Arc::new(CheckingBackend),
            ProverConfig::default(),
            Arc::new(EmptyTreeMerkle),
        );

        let result = pipeline
            .transfer(
                &alice,
                &input,
                bob.public_key(),
                70,
                4,
                1,
                &mut rng,
                &CancelToken::new(),
            )
            .await;
        assert!(matches!(result.err(), Some(SdkError::Boundary(_))));
    }

    #[tokio::test]
    async fn test_consolidate_pipeline() {
        let mut rng = StdRng::seed_from_u64(904);
        let alice = Wallet::create(&mut rng).unwrap();

        let inputs = vec![
            owned_note(&alice, 10, 0, &mut rng),
            owned_note(&alice, 20, 1, &mut rng),
            owned_note(&alice, 30, 2, &mut rng),
        ];
        let pipeline = SpendPipeline::new(
            Arc::new(CheckingBackend),
            ProverConfig::default(),
            Arc::new(ConsistentMerkle::over(
                &inputs.iter().map(|note| note.commitment).collect::<Vec<_>>(),
            )),
        );

        let bundle = pipeline
            .consolidate(&alice, &inputs, &mut rng, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(bundle.nullifiers.len(), 3);
        assert_eq!(bundle.out_commitments.len(), 1);

        // Alice recovers the merged note
        let ciphertext =
            crate::note::encrypted::from_chain_layout(&bundle.encrypted_notes[0]).unwrap();
        let plaintext = crate::crypto::ecies::decrypt(
            &ciphertext,
            alice.spending_key().unwrap(),
        )
        .unwrap();
        assert_eq!(NotePlaintext::parse(&plaintext).unwrap().amount(), 60);
    }
}
