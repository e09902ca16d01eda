//! AMM circuit witnesses: swap, add-liquidity, remove-liquidity

use rand::{CryptoRng, RngCore};

use crate::crypto::keys::Wallet;
use crate::errors::{Result, SdkError};
use crate::field::{id_to_field, u64_to_field};
use crate::note::commitment::{commit_lp, commit_standard, random_fr};
use crate::note::nullifier;
use crate::note::{LpNote, Note};
use crate::witness::{
    effective_spending_key, insert_scalar, insert_standard_input, insert_u64, insert_vector,
    mask_state_hash, pad_merkle_path, Circuit, CircuitWitness, LpInput, StandardInput,
    WitnessMap,
};

/// Swap a note through a shielded AMM pool.
#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub input: StandardInput,
    /// Raw host pool identifier; reduced to a field element by the builder
    pub pool_id: [u8; 32],
    pub a_to_b: bool,
    pub swap_in_amount: u64,
    /// Output the trade is expected to produce; committed in the out note
    pub expected_output: u64,
    pub min_output: u64,
    pub fee_bps: u16,
    /// Raw mint of the receiving side
    pub output_token_mint: [u8; 32],
    pub out_stealth_pub_x: [u8; 32],
    pub change_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct SwapWitness {
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub pool_id: [u8; 32],
    pub out_commitment: [u8; 32],
    pub change_commitment: [u8; 32],
    pub min_output: u64,
    pub output_note: Note,
    pub change_note: Note,

    input: StandardInput,
    stealth_spending_key: [u8; 32],
    swap_in_amount: u64,
    a_to_b: bool,
    fee_bps: u16,
}

/// Build a swap witness. The change note keeps the input mint; the output
/// note carries the receiving mint and the expected trade output.
pub fn build_swap<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &SwapRequest,
    rng: &mut R,
) -> Result<SwapWitness> {
    if request.swap_in_amount == 0 || request.swap_in_amount > request.input.note.amount {
        return Err(SdkError::Unbalanced);
    }
    if request.expected_output < request.min_output {
        return Err(SdkError::Unbalanced);
    }
    let change_amount = request.input.note.amount - request.swap_in_amount;

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        request.input.merkle.leaf_index,
    )?;

    let output_mint = id_to_field(&request.output_token_mint);
    let output_note = Note {
        stealth_pub_x: request.out_stealth_pub_x,
        token_mint: output_mint,
        amount: request.expected_output,
        randomness: random_fr(rng),
    };
    let change_note = Note {
        stealth_pub_x: request.change_stealth_pub_x,
        token_mint: request.input.note.token_mint,
        amount: change_amount,
        randomness: random_fr(rng),
    };

    Ok(SwapWitness {
        merkle_root: request.input.merkle.root,
        nullifier,
        pool_id: id_to_field(&request.pool_id),
        out_commitment: commit_standard(
            &output_note.stealth_pub_x,
            &output_note.token_mint,
            output_note.amount,
            &output_note.randomness,
        )?,
        change_commitment: commit_standard(
            &change_note.stealth_pub_x,
            &change_note.token_mint,
            change_note.amount,
            &change_note.randomness,
        )?,
        min_output: request.min_output,
        output_note,
        change_note,
        input: request.input.clone(),
        stealth_spending_key,
        swap_in_amount: request.swap_in_amount,
        a_to_b: request.a_to_b,
        fee_bps: request.fee_bps,
    })
}

impl CircuitWitness for SwapWitness {
    fn circuit(&self) -> Circuit {
        Circuit::Swap
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "nullifier", self.nullifier);
        insert_scalar(&mut map, "pool_id", self.pool_id);
        insert_scalar(&mut map, "out_commitment", self.out_commitment);
        insert_scalar(&mut map, "change_commitment", self.change_commitment);
        insert_u64(&mut map, "min_output", self.min_output);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "in_token_mint", self.input.note.token_mint);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_u64(&mut map, "swap_in_amount", self.swap_in_amount);
        insert_u64(&mut map, "swap_a_to_b", self.a_to_b as u64);
        insert_u64(&mut map, "fee_bps", self.fee_bps as u64);

        insert_scalar(&mut map, "out_stealth_pub_x", self.output_note.stealth_pub_x);
        insert_scalar(&mut map, "out_token_mint", self.output_note.token_mint);
        insert_u64(&mut map, "out_amount", self.output_note.amount);
        insert_scalar(&mut map, "out_randomness", self.output_note.randomness);

        insert_scalar(
            &mut map,
            "change_stealth_pub_x",
            self.change_note.stealth_pub_x,
        );
        insert_u64(&mut map, "change_amount", self.change_note.amount);
        insert_scalar(&mut map, "change_randomness", self.change_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifier,
            self.pool_id,
            self.out_commitment,
            self.change_commitment,
            u64_to_field(self.min_output),
        ]
    }
}

/// Deposit two notes into a pool for LP units.
#[derive(Clone, Debug)]
pub struct AddLiquidityRequest {
    pub input_a: StandardInput,
    pub input_b: StandardInput,
    pub pool_id: [u8; 32],
    pub deposit_a: u64,
    pub deposit_b: u64,
    /// LP units the pool is expected to mint for the deposits
    pub lp_amount: u64,
    pub lp_stealth_pub_x: [u8; 32],
    pub change_stealth_pub_x_a: [u8; 32],
    pub change_stealth_pub_x_b: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct AddLiquidityWitness {
    pub nullifier_a: [u8; 32],
    pub nullifier_b: [u8; 32],
    pub pool_id: [u8; 32],
    pub lp_commitment: [u8; 32],
    pub change_commitment_a: [u8; 32],
    pub change_commitment_b: [u8; 32],
    pub lp_note: LpNote,
    pub change_note_a: Note,
    pub change_note_b: Note,

    input_a: StandardInput,
    input_b: StandardInput,
    spending_key_a: [u8; 32],
    spending_key_b: [u8; 32],
    deposit_a: u64,
    deposit_b: u64,
}

pub fn build_add_liquidity<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &AddLiquidityRequest,
    rng: &mut R,
) -> Result<AddLiquidityWitness> {
    if request.deposit_a == 0 || request.deposit_a > request.input_a.note.amount {
        return Err(SdkError::Unbalanced);
    }
    if request.deposit_b == 0 || request.deposit_b > request.input_b.note.amount {
        return Err(SdkError::Unbalanced);
    }

    let nk = &wallet.viewing_key().nullifier_key;
    let nullifier_a = nullifier::spending(
        nk,
        &request.input_a.commitment,
        request.input_a.merkle.leaf_index,
    )?;
    let nullifier_b = nullifier::spending(
        nk,
        &request.input_b.commitment,
        request.input_b.merkle.leaf_index,
    )?;

    let pool_id = id_to_field(&request.pool_id);
    let lp_note = LpNote {
        stealth_pub_x: request.lp_stealth_pub_x,
        pool_id,
        lp_amount: request.lp_amount,
        randomness: random_fr(rng),
    };
    let change_note_a = Note {
        stealth_pub_x: request.change_stealth_pub_x_a,
        token_mint: request.input_a.note.token_mint,
        amount: request.input_a.note.amount - request.deposit_a,
        randomness: random_fr(rng),
    };
    let change_note_b = Note {
        stealth_pub_x: request.change_stealth_pub_x_b,
        token_mint: request.input_b.note.token_mint,
        amount: request.input_b.note.amount - request.deposit_b,
        randomness: random_fr(rng),
    };

    Ok(AddLiquidityWitness {
        nullifier_a,
        nullifier_b,
        pool_id,
        lp_commitment: commit_lp(&lp_note)?,
        change_commitment_a: commit_standard(
            &change_note_a.stealth_pub_x,
            &change_note_a.token_mint,
            change_note_a.amount,
            &change_note_a.randomness,
        )?,
        change_commitment_b: commit_standard(
            &change_note_b.stealth_pub_x,
            &change_note_b.token_mint,
            change_note_b.amount,
            &change_note_b.randomness,
        )?,
        lp_note,
        change_note_a,
        change_note_b,
        spending_key_a: effective_spending_key(
            wallet,
            request.input_a.stealth_ephemeral.as_ref(),
        )?,
        spending_key_b: effective_spending_key(
            wallet,
            request.input_b.stealth_ephemeral.as_ref(),
        )?,
        input_a: request.input_a.clone(),
        input_b: request.input_b.clone(),
        deposit_a: request.deposit_a,
        deposit_b: request.deposit_b,
    })
}

impl CircuitWitness for AddLiquidityWitness {
    fn circuit(&self) -> Circuit {
        Circuit::SwapAddLiquidity
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "nullifier_a", self.nullifier_a);
        insert_scalar(&mut map, "nullifier_b", self.nullifier_b);
        insert_scalar(&mut map, "pool_id", self.pool_id);
        insert_scalar(&mut map, "lp_commitment", self.lp_commitment);
        insert_scalar(&mut map, "change_commitment_a", self.change_commitment_a);
        insert_scalar(&mut map, "change_commitment_b", self.change_commitment_b);

        insert_scalar(&mut map, "merkle_root", self.input_a.merkle.root);
        insert_standard_input(&mut map, "in_a_", &self.input_a, self.spending_key_a);
        insert_standard_input(&mut map, "in_b_", &self.input_b, self.spending_key_b);
        insert_scalar(&mut map, "in_a_token_mint", self.input_a.note.token_mint);
        insert_scalar(&mut map, "in_b_token_mint", self.input_b.note.token_mint);

        insert_u64(&mut map, "deposit_a", self.deposit_a);
        insert_u64(&mut map, "deposit_b", self.deposit_b);

        insert_scalar(&mut map, "lp_stealth_pub_x", self.lp_note.stealth_pub_x);
        insert_u64(&mut map, "lp_amount", self.lp_note.lp_amount);
        insert_scalar(&mut map, "lp_randomness", self.lp_note.randomness);

        insert_scalar(
            &mut map,
            "change_a_stealth_pub_x",
            self.change_note_a.stealth_pub_x,
        );
        insert_u64(&mut map, "change_a_amount", self.change_note_a.amount);
        insert_scalar(&mut map, "change_a_randomness", self.change_note_a.randomness);
        insert_scalar(
            &mut map,
            "change_b_stealth_pub_x",
            self.change_note_b.stealth_pub_x,
        );
        insert_u64(&mut map, "change_b_amount", self.change_note_b.amount);
        insert_scalar(&mut map, "change_b_randomness", self.change_note_b.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.nullifier_a,
            self.nullifier_b,
            self.pool_id,
            self.lp_commitment,
            self.change_commitment_a,
            self.change_commitment_b,
        ]
    }
}

/// Burn an LP note and withdraw both pool sides.
#[derive(Clone, Debug)]
pub struct RemoveLiquidityRequest {
    pub lp_input: LpInput,
    pub pool_id: [u8; 32],
    pub withdraw_a: u64,
    pub withdraw_b: u64,
    /// Raw mints of the two pool sides
    pub token_mint_a: [u8; 32],
    pub token_mint_b: [u8; 32],
    pub out_stealth_pub_x_a: [u8; 32],
    pub out_stealth_pub_x_b: [u8; 32],
    /// Keccak pool-state hashes before and after, as published by the host
    pub old_state_hash: [u8; 32],
    pub new_state_hash: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct RemoveLiquidityWitness {
    pub lp_nullifier: [u8; 32],
    pub pool_id: [u8; 32],
    pub out_commitment_a: [u8; 32],
    pub out_commitment_b: [u8; 32],
    pub old_state_hash: [u8; 32],
    pub new_state_hash: [u8; 32],
    pub output_note_a: Note,
    pub output_note_b: Note,

    lp_input: LpInput,
    stealth_spending_key: [u8; 32],
}

pub fn build_remove_liquidity<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &RemoveLiquidityRequest,
    rng: &mut R,
) -> Result<RemoveLiquidityWitness> {
    if request.lp_input.note.lp_amount == 0 {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.lp_input.stealth_ephemeral.as_ref())?;
    let lp_nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.lp_input.commitment,
        request.lp_input.merkle.leaf_index,
    )?;

    let output_note_a = Note {
        stealth_pub_x: request.out_stealth_pub_x_a,
        token_mint: id_to_field(&request.token_mint_a),
        amount: request.withdraw_a,
        randomness: random_fr(rng),
    };
    let output_note_b = Note {
        stealth_pub_x: request.out_stealth_pub_x_b,
        token_mint: id_to_field(&request.token_mint_b),
        amount: request.withdraw_b,
        randomness: random_fr(rng),
    };

    Ok(RemoveLiquidityWitness {
        lp_nullifier,
        pool_id: id_to_field(&request.pool_id),
        out_commitment_a: commit_standard(
            &output_note_a.stealth_pub_x,
            &output_note_a.token_mint,
            output_note_a.amount,
            &output_note_a.randomness,
        )?,
        out_commitment_b: commit_standard(
            &output_note_b.stealth_pub_x,
            &output_note_b.token_mint,
            output_note_b.amount,
            &output_note_b.randomness,
        )?,
        old_state_hash: mask_state_hash(&request.old_state_hash),
        new_state_hash: mask_state_hash(&request.new_state_hash),
        output_note_a,
        output_note_b,
        lp_input: request.lp_input.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for RemoveLiquidityWitness {
    fn circuit(&self) -> Circuit {
        Circuit::SwapRemoveLiquidity
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "lp_nullifier", self.lp_nullifier);
        insert_scalar(&mut map, "pool_id", self.pool_id);
        insert_scalar(&mut map, "out_commitment_a", self.out_commitment_a);
        insert_scalar(&mut map, "out_commitment_b", self.out_commitment_b);
        insert_scalar(&mut map, "old_state_hash", self.old_state_hash);
        insert_scalar(&mut map, "new_state_hash", self.new_state_hash);

        insert_scalar(
            &mut map,
            "lp_stealth_pub_x",
            self.lp_input.note.stealth_pub_x,
        );
        insert_u64(&mut map, "lp_amount", self.lp_input.note.lp_amount);
        insert_scalar(&mut map, "lp_randomness", self.lp_input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.lp_input.merkle.leaf_index);
        insert_scalar(&mut map, "merkle_root", self.lp_input.merkle.root);
        let (path, indices) = pad_merkle_path(&self.lp_input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(
            &mut map,
            "out_a_stealth_pub_x",
            self.output_note_a.stealth_pub_x,
        );
        insert_scalar(&mut map, "out_a_token_mint", self.output_note_a.token_mint);
        insert_u64(&mut map, "out_a_amount", self.output_note_a.amount);
        insert_scalar(&mut map, "out_a_randomness", self.output_note_a.randomness);
        insert_scalar(
            &mut map,
            "out_b_stealth_pub_x",
            self.output_note_b.stealth_pub_x,
        );
        insert_scalar(&mut map, "out_b_token_mint", self.output_note_b.token_mint);
        insert_u64(&mut map, "out_b_amount", self.output_note_b.amount);
        insert_scalar(&mut map, "out_b_randomness", self.output_note_b.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.lp_nullifier,
            self.pool_id,
            self.out_commitment_a,
            self.out_commitment_b,
            self.old_state_hash,
            self.new_state_hash,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MerkleProofResult;
    use crate::field::u64_to_field;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn opened_note(wallet: &Wallet, amount: u64, mint: u64, leaf_index: u64) -> StandardInput {
        let note = Note {
            stealth_pub_x: wallet.public_key().x,
            token_mint: u64_to_field(mint),
            amount,
            randomness: u64_to_field(leaf_index + 7),
        };
        let commitment =
            commit_standard(&note.stealth_pub_x, &note.token_mint, amount, &note.randomness)
                .unwrap();
        StandardInput {
            note,
            commitment,
            merkle: MerkleProofResult {
                root: u64_to_field(42),
                path: vec![[1u8; 32]; 4],
                path_indices: vec![0, 1, 1, 0],
                leaf_index,
            },
            stealth_ephemeral: None,
        }
    }

    fn swap_request(wallet: &Wallet) -> SwapRequest {
        SwapRequest {
            input: opened_note(wallet, 1_000, 1, 3),
            pool_id: [0x44u8; 32],
            a_to_b: true,
            swap_in_amount: 400,
            expected_output: 390,
            min_output: 380,
            fee_bps: 30,
            output_token_mint: [0x55u8; 32],
            out_stealth_pub_x: u64_to_field(61),
            change_stealth_pub_x: u64_to_field(62),
        }
    }

    #[test]
    fn test_swap_builds_change_and_output() {
        let mut rng = StdRng::seed_from_u64(301);
        let wallet = Wallet::load(u64_to_field(21)).unwrap();

        let witness = build_swap(&wallet, &swap_request(&wallet), &mut rng).unwrap();
        assert_eq!(witness.change_note.amount, 600);
        assert_eq!(witness.output_note.amount, 390);
        assert!(crate::field::is_canonical(&witness.pool_id));
        assert_eq!(witness.public_inputs().len(), 6);
    }

    #[test]
    fn test_swap_rejects_overdraw_and_bad_slippage() {
        let mut rng = StdRng::seed_from_u64(302);
        let wallet = Wallet::load(u64_to_field(21)).unwrap();

        let mut overdraw = swap_request(&wallet);
        overdraw.swap_in_amount = 2_000;
        assert_eq!(
            build_swap(&wallet, &overdraw, &mut rng).err(),
            Some(SdkError::Unbalanced)
        );

        let mut slippage = swap_request(&wallet);
        slippage.expected_output = 100;
        assert_eq!(
            build_swap(&wallet, &slippage, &mut rng).err(),
            Some(SdkError::Unbalanced)
        );
    }

    #[test]
    fn test_add_liquidity_balances_per_token() {
        let mut rng = StdRng::seed_from_u64(303);
        let wallet = Wallet::load(u64_to_field(21)).unwrap();

        let request = AddLiquidityRequest {
            input_a: opened_note(&wallet, 500, 1, 0),
            input_b: opened_note(&wallet, 900, 2, 1),
            pool_id: [0x66u8; 32],
            deposit_a: 500,
            deposit_b: 750,
            lp_amount: 610,
            lp_stealth_pub_x: u64_to_field(71),
            change_stealth_pub_x_a: u64_to_field(72),
            change_stealth_pub_x_b: u64_to_field(73),
        };
        let witness = build_add_liquidity(&wallet, &request, &mut rng).unwrap();
        assert_eq!(witness.change_note_a.amount, 0);
        assert_eq!(witness.change_note_b.amount, 150);
        assert_eq!(witness.lp_note.lp_amount, 610);
        assert_ne!(witness.nullifier_a, witness.nullifier_b);
    }

    #[test]
    fn test_remove_liquidity_masks_state_hashes() {
        let mut rng = StdRng::seed_from_u64(304);
        let wallet = Wallet::load(u64_to_field(21)).unwrap();

        let lp_note = LpNote {
            stealth_pub_x: wallet.public_key().x,
            pool_id: u64_to_field(9),
            lp_amount: 610,
            randomness: u64_to_field(8),
        };
        let request = RemoveLiquidityRequest {
            lp_input: LpInput {
                commitment: commit_lp(&lp_note).unwrap(),
                note: lp_note,
                merkle: MerkleProofResult {
                    root: u64_to_field(42),
                    path: vec![[1u8; 32]; 4],
                    path_indices: vec![1, 0, 0, 1],
                    leaf_index: 17,
                },
                stealth_ephemeral: None,
            },
            pool_id: [0x66u8; 32],
            withdraw_a: 500,
            withdraw_b: 750,
            token_mint_a: [0x11u8; 32],
            token_mint_b: [0x22u8; 32],
            out_stealth_pub_x_a: u64_to_field(81),
            out_stealth_pub_x_b: u64_to_field(82),
            old_state_hash: [0xffu8; 32],
            new_state_hash: [0xeeu8; 32],
        };

        let witness = build_remove_liquidity(&wallet, &request, &mut rng).unwrap();
        assert_eq!(witness.old_state_hash[0], 0x1f);
        assert_eq!(witness.new_state_hash[0], 0x0e);
        assert!(crate::field::is_canonical(&witness.old_state_hash));

        let publics = witness.public_inputs();
        assert_eq!(publics[4], witness.old_state_hash);
        assert_eq!(publics[5], witness.new_state_hash);
    }
}
