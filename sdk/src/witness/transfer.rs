//! transfer/1x2 and consolidate/3x1 witnesses

use rand::{CryptoRng, RngCore};

use crate::crypto::keys::Wallet;
use crate::errors::{Result, SdkError};
use crate::field::u64_to_field;
use crate::note::commitment::{commit_standard, random_fr};
use crate::note::nullifier;
use crate::note::Note;
use crate::witness::{
    effective_spending_key, insert_scalar, insert_standard_input, insert_u64, insert_vector,
    pad_merkle_path, Circuit, CircuitWitness, StandardInput, WitnessMap,
};

/// One requested output: where it goes and how much.
#[derive(Clone, Copy, Debug)]
pub struct OutputSpec {
    pub stealth_pub_x: [u8; 32],
    pub amount: u64,
}

/// A 1-input, 2-output private transfer with optional unshield and fee.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub input: StandardInput,
    pub outputs: [OutputSpec; 2],
    pub unshield_amount: u64,
    pub fee_amount: u64,
}

/// Built transfer witness. The sampled output randomness is part of the
/// returned notes and must be used verbatim as the AEAD plaintext.
#[derive(Clone, Debug)]
pub struct TransferWitness {
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub out_commitments: [[u8; 32]; 2],
    pub token_mint: [u8; 32],
    pub transfer_amount: u64,
    pub unshield_amount: u64,
    pub fee_amount: u64,
    pub output_notes: [Note; 2],

    input: StandardInput,
    stealth_spending_key: [u8; 32],
}

/// Build a transfer witness.
///
/// Fails with `Unbalanced` unless
/// input = out_1 + out_2 + unshield + fee holds over u64 with no wrap.
pub fn build_transfer<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &TransferRequest,
    rng: &mut R,
) -> Result<TransferWitness> {
    let outgoing = request.outputs[0]
        .amount
        .checked_add(request.outputs[1].amount)
        .and_then(|sum| sum.checked_add(request.unshield_amount))
        .and_then(|sum| sum.checked_add(request.fee_amount))
        .ok_or(SdkError::Unbalanced)?;
    if outgoing != request.input.note.amount {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        request.input.merkle.leaf_index,
    )?;

    let token_mint = request.input.note.token_mint;
    let mut output_notes = [Note {
        stealth_pub_x: [0u8; 32],
        token_mint,
        amount: 0,
        randomness: [0u8; 32],
    }; 2];
    let mut out_commitments = [[0u8; 32]; 2];

    for (slot, spec) in request.outputs.iter().enumerate() {
        let randomness = random_fr(rng);
        output_notes[slot] = Note {
            stealth_pub_x: spec.stealth_pub_x,
            token_mint,
            amount: spec.amount,
            randomness,
        };
        out_commitments[slot] =
            commit_standard(&spec.stealth_pub_x, &token_mint, spec.amount, &randomness)?;
    }

    Ok(TransferWitness {
        merkle_root: request.input.merkle.root,
        nullifier,
        out_commitments,
        token_mint,
        transfer_amount: request.outputs[0].amount + request.outputs[1].amount,
        unshield_amount: request.unshield_amount,
        fee_amount: request.fee_amount,
        output_notes,
        input: request.input.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for TransferWitness {
    fn circuit(&self) -> Circuit {
        Circuit::Transfer1x2
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "nullifier", self.nullifier);
        insert_scalar(&mut map, "out_commitment_1", self.out_commitments[0]);
        insert_scalar(&mut map, "out_commitment_2", self.out_commitments[1]);
        insert_scalar(&mut map, "token_mint", self.token_mint);
        insert_u64(&mut map, "transfer_amount", self.transfer_amount);
        insert_u64(&mut map, "unshield_amount", self.unshield_amount);
        insert_u64(&mut map, "fee_amount", self.fee_amount);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);

        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        for (slot, note) in self.output_notes.iter().enumerate() {
            let n = slot + 1;
            insert_scalar(&mut map, &format!("out_stealth_pub_x_{n}"), note.stealth_pub_x);
            insert_u64(&mut map, &format!("out_amount_{n}"), note.amount);
            insert_scalar(&mut map, &format!("out_randomness_{n}"), note.randomness);
        }

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifier,
            self.out_commitments[0],
            self.out_commitments[1],
            self.token_mint,
            u64_to_field(self.transfer_amount),
            u64_to_field(self.unshield_amount),
            u64_to_field(self.fee_amount),
        ]
    }
}

/// Merge 2..=3 notes of one mint into a single output note.
#[derive(Clone, Debug)]
pub struct ConsolidateRequest {
    pub inputs: Vec<StandardInput>,
    pub output_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct ConsolidateWitness {
    pub merkle_root: [u8; 32],
    /// One per slot; a zero entry marks a disabled third slot
    pub nullifiers: [[u8; 32]; 3],
    pub out_commitment: [u8; 32],
    pub token_mint: [u8; 32],
    pub output_note: Note,

    inputs: Vec<StandardInput>,
    spending_keys: Vec<[u8; 32]>,
}

/// Build a consolidation witness.
///
/// All inputs must share one token mint and one Merkle root. The output
/// amount is the input sum; a two-input batch leaves the third slot zeroed.
pub fn build_consolidate<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &ConsolidateRequest,
    rng: &mut R,
) -> Result<ConsolidateWitness> {
    let count = request.inputs.len();
    if !(2..=3).contains(&count) {
        return Err(SdkError::InvalidInputCount(count));
    }

    let token_mint = request.inputs[0].note.token_mint;
    let merkle_root = request.inputs[0].merkle.root;
    let mut total: u64 = 0;
    for input in &request.inputs {
        if input.note.token_mint != token_mint {
            return Err(SdkError::Unbalanced);
        }
        if input.merkle.root != merkle_root {
            return Err(SdkError::Boundary(
                "merkle roots differ across consolidation inputs".to_string(),
            ));
        }
        total = total
            .checked_add(input.note.amount)
            .ok_or(SdkError::Unbalanced)?;
    }

    let mut nullifiers = [[0u8; 32]; 3];
    let mut spending_keys = Vec::with_capacity(count);
    for (slot, input) in request.inputs.iter().enumerate() {
        nullifiers[slot] = nullifier::spending(
            &wallet.viewing_key().nullifier_key,
            &input.commitment,
            input.merkle.leaf_index,
        )?;
        spending_keys.push(effective_spending_key(
            wallet,
            input.stealth_ephemeral.as_ref(),
        )?);
    }

    let randomness = random_fr(rng);
    let output_note = Note {
        stealth_pub_x: request.output_stealth_pub_x,
        token_mint,
        amount: total,
        randomness,
    };
    let out_commitment = commit_standard(
        &output_note.stealth_pub_x,
        &token_mint,
        total,
        &randomness,
    )?;

    Ok(ConsolidateWitness {
        merkle_root,
        nullifiers,
        out_commitment,
        token_mint,
        output_note,
        inputs: request.inputs.clone(),
        spending_keys,
    })
}

impl CircuitWitness for ConsolidateWitness {
    fn circuit(&self) -> Circuit {
        Circuit::Consolidate3x1
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        for (slot, n) in self.nullifiers.iter().enumerate() {
            insert_scalar(&mut map, &format!("nullifier_{}", slot + 1), *n);
        }
        insert_scalar(&mut map, "out_commitment", self.out_commitment);
        insert_scalar(&mut map, "token_mint", self.token_mint);
        insert_u64(&mut map, "in_count", self.inputs.len() as u64);

        for slot in 0..3 {
            let prefix = format!("in_{}_", slot + 1);
            match self.inputs.get(slot) {
                Some(input) => insert_standard_input(
                    &mut map,
                    &prefix,
                    input,
                    self.spending_keys[slot],
                ),
                None => insert_standard_input(
                    &mut map,
                    &prefix,
                    &disabled_slot(),
                    [0u8; 32],
                ),
            }
        }

        insert_scalar(&mut map, "out_stealth_pub_x", self.output_note.stealth_pub_x);
        insert_u64(&mut map, "out_amount", self.output_note.amount);
        insert_scalar(&mut map, "out_randomness", self.output_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifiers[0],
            self.nullifiers[1],
            self.nullifiers[2],
            self.out_commitment,
            self.token_mint,
        ]
    }
}

/// All-zero input for a disabled consolidation slot.
fn disabled_slot() -> StandardInput {
    StandardInput {
        note: Note {
            stealth_pub_x: [0u8; 32],
            token_mint: [0u8; 32],
            amount: 0,
            randomness: [0u8; 32],
        },
        commitment: [0u8; 32],
        merkle: crate::boundary::MerkleProofResult {
            root: [0u8; 32],
            path: Vec::new(),
            path_indices: Vec::new(),
            leaf_index: 0,
        },
        stealth_ephemeral: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MerkleProofResult;
    use crate::field::u64_to_field;
    use crate::note::commitment::commit_standard;
    use crate::witness::FieldInput;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn opened_note(wallet: &Wallet, amount: u64, leaf_index: u64) -> StandardInput {
        let note = Note {
            stealth_pub_x: wallet.public_key().x,
            token_mint: u64_to_field(500),
            amount,
            randomness: u64_to_field(leaf_index + 1),
        };
        let commitment =
            commit_standard(&note.stealth_pub_x, &note.token_mint, amount, &note.randomness)
                .unwrap();
        StandardInput {
            note,
            commitment,
            merkle: MerkleProofResult {
                root: u64_to_field(99),
                path: vec![[3u8; 32]; 8],
                path_indices: vec![0, 1, 0, 1, 0, 1, 0, 1],
                leaf_index,
            },
            stealth_ephemeral: None,
        }
    }

    fn transfer_request(wallet: &Wallet, fee: u64) -> TransferRequest {
        TransferRequest {
            input: opened_note(wallet, 100, 4),
            outputs: [
                OutputSpec {
                    stealth_pub_x: u64_to_field(71),
                    amount: 70,
                },
                OutputSpec {
                    stealth_pub_x: u64_to_field(72),
                    amount: 25,
                },
            ],
            unshield_amount: 4,
            fee_amount: fee,
        }
    }

    #[test]
    fn test_balanced_transfer_builds() {
        let mut rng = StdRng::seed_from_u64(201);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let witness = build_transfer(&wallet, &transfer_request(&wallet, 1), &mut rng).unwrap();
        assert_eq!(witness.transfer_amount, 95);

        let publics = witness.public_inputs();
        assert_eq!(publics.len(), 8);
        assert_eq!(publics[5], u64_to_field(95));
        assert_eq!(publics[6], u64_to_field(4));
        assert_eq!(publics[7], u64_to_field(1));
    }

    #[test]
    fn test_unbalanced_transfer_rejected() {
        let mut rng = StdRng::seed_from_u64(202);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let result = build_transfer(&wallet, &transfer_request(&wallet, 2), &mut rng);
        assert_eq!(result.err(), Some(SdkError::Unbalanced));
    }

    #[test]
    fn test_overflowing_outputs_rejected() {
        let mut rng = StdRng::seed_from_u64(203);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let mut request = transfer_request(&wallet, 1);
        request.outputs[0].amount = u64::MAX;
        request.outputs[1].amount = 2;
        assert_eq!(
            build_transfer(&wallet, &request, &mut rng).err(),
            Some(SdkError::Unbalanced)
        );
    }

    #[test]
    fn test_output_randomness_matches_commitments() {
        let mut rng = StdRng::seed_from_u64(204);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let witness = build_transfer(&wallet, &transfer_request(&wallet, 1), &mut rng).unwrap();
        for (slot, note) in witness.output_notes.iter().enumerate() {
            let recomputed = commit_standard(
                &note.stealth_pub_x,
                &note.token_mint,
                note.amount,
                &note.randomness,
            )
            .unwrap();
            assert_eq!(recomputed, witness.out_commitments[slot]);
        }
    }

    #[test]
    fn test_transfer_map_has_fixed_depth_path() {
        let mut rng = StdRng::seed_from_u64(205);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let witness = build_transfer(&wallet, &transfer_request(&wallet, 1), &mut rng).unwrap();
        let map = witness.input_map();
        match map.get("merkle_path").unwrap() {
            FieldInput::Vector(path) => assert_eq!(path.len(), 32),
            _ => panic!("merkle_path must be a vector"),
        }
        assert!(map.contains_key("stealth_spending_key"));
    }

    #[test]
    fn test_watch_only_cannot_build() {
        let mut rng = StdRng::seed_from_u64(206);
        let full = Wallet::load(u64_to_field(11)).unwrap();
        let watch = Wallet::watch_only(full.viewing_key().clone(), *full.public_key()).unwrap();

        let result = build_transfer(&watch, &transfer_request(&full, 1), &mut rng);
        assert_eq!(result.err(), Some(SdkError::InvalidSpendingKey));
    }

    #[test]
    fn test_consolidate_three_notes() {
        let mut rng = StdRng::seed_from_u64(207);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let request = ConsolidateRequest {
            inputs: vec![
                opened_note(&wallet, 10, 0),
                opened_note(&wallet, 20, 1),
                opened_note(&wallet, 30, 2),
            ],
            output_stealth_pub_x: u64_to_field(88),
        };
        let witness = build_consolidate(&wallet, &request, &mut rng).unwrap();
        assert_eq!(witness.output_note.amount, 60);
        assert_ne!(witness.nullifiers[2], [0u8; 32]);
        assert_eq!(witness.public_inputs().len(), 6);
    }

    #[test]
    fn test_consolidate_two_notes_disables_third_slot() {
        let mut rng = StdRng::seed_from_u64(208);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let request = ConsolidateRequest {
            inputs: vec![opened_note(&wallet, 10, 0), opened_note(&wallet, 20, 1)],
            output_stealth_pub_x: u64_to_field(88),
        };
        let witness = build_consolidate(&wallet, &request, &mut rng).unwrap();
        assert_eq!(witness.output_note.amount, 30);
        assert_eq!(witness.nullifiers[2], [0u8; 32]);

        let map = witness.input_map();
        assert_eq!(
            map.get("in_count"),
            Some(&FieldInput::Scalar(u64_to_field(2)))
        );
    }

    #[test]
    fn test_consolidate_arity_enforced() {
        let mut rng = StdRng::seed_from_u64(209);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let request = ConsolidateRequest {
            inputs: vec![opened_note(&wallet, 10, 0)],
            output_stealth_pub_x: u64_to_field(88),
        };
        assert_eq!(
            build_consolidate(&wallet, &request, &mut rng).err(),
            Some(SdkError::InvalidInputCount(1))
        );
    }

    #[test]
    fn test_consolidate_rejects_mixed_mints() {
        let mut rng = StdRng::seed_from_u64(210);
        let wallet = Wallet::load(u64_to_field(11)).unwrap();

        let mut mixed = opened_note(&wallet, 20, 1);
        mixed.note.token_mint = u64_to_field(501);
        let request = ConsolidateRequest {
            inputs: vec![opened_note(&wallet, 10, 0), mixed],
            output_stealth_pub_x: u64_to_field(88),
        };
        assert_eq!(
            build_consolidate(&wallet, &request, &mut rng).err(),
            Some(SdkError::Unbalanced)
        );
    }
}
