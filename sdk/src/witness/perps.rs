//! Perpetual-futures circuit witnesses: open/close position, pool liquidity

use rand::{CryptoRng, RngCore};

use crate::crypto::keys::Wallet;
use crate::errors::{Result, SdkError};
use crate::field::{id_to_field, u64_to_field};
use crate::note::commitment::{commit_lp, commit_position, commit_standard, random_fr};
use crate::note::nullifier;
use crate::note::{LpNote, Note, PositionNote};
use crate::witness::{
    effective_spending_key, insert_scalar, insert_u64, insert_vector, pad_merkle_path,
    Circuit, CircuitWitness, LpInput, PositionInput, StandardInput, WitnessMap,
};

/// Open a leveraged position funded by a collateral note.
#[derive(Clone, Debug)]
pub struct OpenPositionRequest {
    pub input: StandardInput,
    pub perps_pool_id: [u8; 32],
    pub market_id: [u8; 32],
    pub is_long: bool,
    pub margin: u64,
    pub leverage: u8,
    pub position_fee: u64,
    pub position_size: u64,
    pub entry_price: u64,
    pub position_stealth_pub_x: [u8; 32],
    pub change_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct OpenPositionWitness {
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub perps_pool_id: [u8; 32],
    pub market_id: [u8; 32],
    pub position_commitment: [u8; 32],
    pub change_commitment: [u8; 32],
    pub is_long: bool,
    pub margin: u64,
    pub leverage: u8,
    pub position_fee: u64,
    pub change_amount: u64,
    pub position_note: PositionNote,
    pub change_note: Note,

    input: StandardInput,
    stealth_spending_key: [u8; 32],
}

/// Build an open-position witness.
///
/// Balance rule: input = margin + position_fee + change over u64.
pub fn build_open_position<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &OpenPositionRequest,
    rng: &mut R,
) -> Result<OpenPositionWitness> {
    let committed = request
        .margin
        .checked_add(request.position_fee)
        .ok_or(SdkError::Unbalanced)?;
    let change_amount = request
        .input
        .note
        .amount
        .checked_sub(committed)
        .ok_or(SdkError::Unbalanced)?;
    if request.margin == 0 || request.leverage == 0 {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        request.input.merkle.leaf_index,
    )?;

    let position_note = PositionNote {
        stealth_pub_x: request.position_stealth_pub_x,
        market_id: id_to_field(&request.market_id),
        is_long: request.is_long,
        margin: request.margin,
        size: request.position_size,
        leverage: request.leverage,
        entry_price: request.entry_price,
        randomness: random_fr(rng),
    };
    let change_note = Note {
        stealth_pub_x: request.change_stealth_pub_x,
        token_mint: request.input.note.token_mint,
        amount: change_amount,
        randomness: random_fr(rng),
    };

    Ok(OpenPositionWitness {
        merkle_root: request.input.merkle.root,
        nullifier,
        perps_pool_id: id_to_field(&request.perps_pool_id),
        market_id: position_note.market_id,
        position_commitment: commit_position(&position_note)?,
        change_commitment: commit_standard(
            &change_note.stealth_pub_x,
            &change_note.token_mint,
            change_note.amount,
            &change_note.randomness,
        )?,
        is_long: request.is_long,
        margin: request.margin,
        leverage: request.leverage,
        position_fee: request.position_fee,
        change_amount,
        position_note,
        change_note,
        input: request.input.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for OpenPositionWitness {
    fn circuit(&self) -> Circuit {
        Circuit::PerpsOpenPosition
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "nullifier", self.nullifier);
        insert_scalar(&mut map, "perps_pool_id", self.perps_pool_id);
        insert_scalar(&mut map, "market_id", self.market_id);
        insert_scalar(&mut map, "position_commitment", self.position_commitment);
        insert_scalar(&mut map, "change_commitment", self.change_commitment);
        insert_u64(&mut map, "is_long", self.is_long as u64);
        insert_u64(&mut map, "margin", self.margin);
        insert_u64(&mut map, "leverage", self.leverage as u64);
        insert_u64(&mut map, "position_fee", self.position_fee);
        insert_u64(&mut map, "change_amount", self.change_amount);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_u64(&mut map, "position_size", self.position_note.size);
        insert_u64(&mut map, "entry_price", self.position_note.entry_price);
        insert_scalar(
            &mut map,
            "position_stealth_pub_x",
            self.position_note.stealth_pub_x,
        );
        insert_scalar(&mut map, "position_randomness", self.position_note.randomness);
        insert_scalar(
            &mut map,
            "change_stealth_pub_x",
            self.change_note.stealth_pub_x,
        );
        insert_scalar(&mut map, "change_randomness", self.change_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifier,
            self.perps_pool_id,
            self.market_id,
            self.position_commitment,
            self.change_commitment,
            u64_to_field(self.is_long as u64),
            u64_to_field(self.margin),
            u64_to_field(self.leverage as u64),
            u64_to_field(self.position_fee),
            u64_to_field(self.change_amount),
        ]
    }
}

/// Close a position and settle margin plus PnL into a collateral note.
#[derive(Clone, Debug)]
pub struct ClosePositionRequest {
    pub position: PositionInput,
    pub perps_pool_id: [u8; 32],
    pub exit_price: u64,
    pub close_fee: u64,
    pub pnl_amount: u64,
    pub is_profit: bool,
    /// Raw collateral mint for the settlement note
    pub collateral_mint: [u8; 32],
    pub out_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct ClosePositionWitness {
    pub merkle_root: [u8; 32],
    pub position_nullifier: [u8; 32],
    pub perps_pool_id: [u8; 32],
    pub out_commitment: [u8; 32],
    pub is_long: bool,
    pub exit_price: u64,
    pub close_fee: u64,
    pub pnl_amount: u64,
    pub is_profit: bool,
    pub settlement_note: Note,

    position: PositionInput,
    stealth_spending_key: [u8; 32],
}

/// Build a close-position witness. Settlement = margin ± pnl - close_fee;
/// an underflow (loss or fee exceeding margin) is `Unbalanced`.
pub fn build_close_position<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &ClosePositionRequest,
    rng: &mut R,
) -> Result<ClosePositionWitness> {
    let margin = request.position.note.margin;
    let after_pnl = if request.is_profit {
        margin.checked_add(request.pnl_amount)
    } else {
        margin.checked_sub(request.pnl_amount)
    }
    .ok_or(SdkError::Unbalanced)?;
    let settlement_amount = after_pnl
        .checked_sub(request.close_fee)
        .ok_or(SdkError::Unbalanced)?;

    let stealth_spending_key =
        effective_spending_key(wallet, request.position.stealth_ephemeral.as_ref())?;
    let position_nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.position.commitment,
        request.position.merkle.leaf_index,
    )?;

    let settlement_note = Note {
        stealth_pub_x: request.out_stealth_pub_x,
        token_mint: id_to_field(&request.collateral_mint),
        amount: settlement_amount,
        randomness: random_fr(rng),
    };

    Ok(ClosePositionWitness {
        merkle_root: request.position.merkle.root,
        position_nullifier,
        perps_pool_id: id_to_field(&request.perps_pool_id),
        out_commitment: commit_standard(
            &settlement_note.stealth_pub_x,
            &settlement_note.token_mint,
            settlement_note.amount,
            &settlement_note.randomness,
        )?,
        is_long: request.position.note.is_long,
        exit_price: request.exit_price,
        close_fee: request.close_fee,
        pnl_amount: request.pnl_amount,
        is_profit: request.is_profit,
        settlement_note,
        position: request.position.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for ClosePositionWitness {
    fn circuit(&self) -> Circuit {
        Circuit::PerpsClosePosition
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "position_nullifier", self.position_nullifier);
        insert_scalar(&mut map, "perps_pool_id", self.perps_pool_id);
        insert_scalar(&mut map, "out_commitment", self.out_commitment);
        insert_u64(&mut map, "is_long", self.is_long as u64);
        insert_u64(&mut map, "exit_price", self.exit_price);
        insert_u64(&mut map, "close_fee", self.close_fee);
        insert_u64(&mut map, "pnl_amount", self.pnl_amount);
        insert_u64(&mut map, "is_profit", self.is_profit as u64);

        let note = &self.position.note;
        insert_scalar(&mut map, "position_stealth_pub_x", note.stealth_pub_x);
        insert_scalar(&mut map, "market_id", note.market_id);
        insert_u64(&mut map, "margin", note.margin);
        insert_u64(&mut map, "position_size", note.size);
        insert_u64(&mut map, "leverage", note.leverage as u64);
        insert_u64(&mut map, "entry_price", note.entry_price);
        insert_scalar(&mut map, "position_randomness", note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.position.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.position.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(
            &mut map,
            "out_stealth_pub_x",
            self.settlement_note.stealth_pub_x,
        );
        insert_u64(&mut map, "out_amount", self.settlement_note.amount);
        insert_scalar(&mut map, "out_randomness", self.settlement_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.position_nullifier,
            self.perps_pool_id,
            self.out_commitment,
            u64_to_field(self.is_long as u64),
            u64_to_field(self.exit_price),
            u64_to_field(self.close_fee),
            u64_to_field(self.pnl_amount),
            u64_to_field(self.is_profit as u64),
        ]
    }
}

/// Deposit collateral into the perps pool for LP units.
#[derive(Clone, Debug)]
pub struct PerpsAddLiquidityRequest {
    pub input: StandardInput,
    pub perps_pool_id: [u8; 32],
    pub token_index: u16,
    pub deposit_amount: u64,
    pub lp_amount_minted: u64,
    pub fee_amount: u64,
    pub lp_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct PerpsAddLiquidityWitness {
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub perps_pool_id: [u8; 32],
    pub lp_commitment: [u8; 32],
    pub token_index: u16,
    pub deposit_amount: u64,
    pub lp_amount_minted: u64,
    pub fee_amount: u64,
    pub lp_note: LpNote,

    input: StandardInput,
    stealth_spending_key: [u8; 32],
}

/// Build a perps add-liquidity witness. The full input funds the deposit
/// plus fee; no change output exists in this circuit.
pub fn build_perps_add_liquidity<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &PerpsAddLiquidityRequest,
    rng: &mut R,
) -> Result<PerpsAddLiquidityWitness> {
    let needed = request
        .deposit_amount
        .checked_add(request.fee_amount)
        .ok_or(SdkError::Unbalanced)?;
    if request.input.note.amount != needed || request.deposit_amount == 0 {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        request.input.merkle.leaf_index,
    )?;

    let perps_pool_id = id_to_field(&request.perps_pool_id);
    let lp_note = LpNote {
        stealth_pub_x: request.lp_stealth_pub_x,
        pool_id: perps_pool_id,
        lp_amount: request.lp_amount_minted,
        randomness: random_fr(rng),
    };

    Ok(PerpsAddLiquidityWitness {
        merkle_root: request.input.merkle.root,
        nullifier,
        perps_pool_id,
        lp_commitment: commit_lp(&lp_note)?,
        token_index: request.token_index,
        deposit_amount: request.deposit_amount,
        lp_amount_minted: request.lp_amount_minted,
        fee_amount: request.fee_amount,
        lp_note,
        input: request.input.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for PerpsAddLiquidityWitness {
    fn circuit(&self) -> Circuit {
        Circuit::PerpsAddLiquidity
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "nullifier", self.nullifier);
        insert_scalar(&mut map, "perps_pool_id", self.perps_pool_id);
        insert_scalar(&mut map, "lp_commitment", self.lp_commitment);
        insert_u64(&mut map, "token_index", self.token_index as u64);
        insert_u64(&mut map, "deposit_amount", self.deposit_amount);
        insert_u64(&mut map, "lp_amount_minted", self.lp_amount_minted);
        insert_u64(&mut map, "fee_amount", self.fee_amount);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(&mut map, "lp_stealth_pub_x", self.lp_note.stealth_pub_x);
        insert_scalar(&mut map, "lp_randomness", self.lp_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifier,
            self.perps_pool_id,
            self.lp_commitment,
            u64_to_field(self.token_index as u64),
            u64_to_field(self.deposit_amount),
            u64_to_field(self.lp_amount_minted),
            u64_to_field(self.fee_amount),
        ]
    }
}

/// Burn perps LP units and withdraw one pool token.
#[derive(Clone, Debug)]
pub struct PerpsRemoveLiquidityRequest {
    pub lp_input: LpInput,
    pub perps_pool_id: [u8; 32],
    pub token_index: u16,
    pub withdraw_amount: u64,
    pub lp_amount_burned: u64,
    pub fee_amount: u64,
    /// Raw mint of the token being withdrawn
    pub token_mint: [u8; 32],
    pub out_stealth_pub_x: [u8; 32],
    pub change_lp_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct PerpsRemoveLiquidityWitness {
    pub merkle_root: [u8; 32],
    pub lp_nullifier: [u8; 32],
    pub perps_pool_id: [u8; 32],
    pub out_commitment: [u8; 32],
    pub token_index: u16,
    pub withdraw_amount: u64,
    pub lp_amount_burned: u64,
    pub fee_amount: u64,
    pub output_note: Note,
    /// LP units kept when the burn is partial
    pub change_lp_note: LpNote,
    pub change_lp_commitment: [u8; 32],

    lp_input: LpInput,
    stealth_spending_key: [u8; 32],
}

pub fn build_perps_remove_liquidity<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &PerpsRemoveLiquidityRequest,
    rng: &mut R,
) -> Result<PerpsRemoveLiquidityWitness> {
    if request.lp_amount_burned == 0 {
        return Err(SdkError::Unbalanced);
    }
    let change_lp_amount = request
        .lp_input
        .note
        .lp_amount
        .checked_sub(request.lp_amount_burned)
        .ok_or(SdkError::Unbalanced)?;
    let out_amount = request
        .withdraw_amount
        .checked_sub(request.fee_amount)
        .ok_or(SdkError::Unbalanced)?;

    let stealth_spending_key =
        effective_spending_key(wallet, request.lp_input.stealth_ephemeral.as_ref())?;
    let lp_nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.lp_input.commitment,
        request.lp_input.merkle.leaf_index,
    )?;

    let perps_pool_id = id_to_field(&request.perps_pool_id);
    let output_note = Note {
        stealth_pub_x: request.out_stealth_pub_x,
        token_mint: id_to_field(&request.token_mint),
        amount: out_amount,
        randomness: random_fr(rng),
    };
    let change_lp_note = LpNote {
        stealth_pub_x: request.change_lp_stealth_pub_x,
        pool_id: perps_pool_id,
        lp_amount: change_lp_amount,
        randomness: random_fr(rng),
    };

    Ok(PerpsRemoveLiquidityWitness {
        merkle_root: request.lp_input.merkle.root,
        lp_nullifier,
        perps_pool_id,
        out_commitment: commit_standard(
            &output_note.stealth_pub_x,
            &output_note.token_mint,
            output_note.amount,
            &output_note.randomness,
        )?,
        token_index: request.token_index,
        withdraw_amount: request.withdraw_amount,
        lp_amount_burned: request.lp_amount_burned,
        fee_amount: request.fee_amount,
        change_lp_commitment: commit_lp(&change_lp_note)?,
        output_note,
        change_lp_note,
        lp_input: request.lp_input.clone(),
        stealth_spending_key,
    })
}

impl CircuitWitness for PerpsRemoveLiquidityWitness {
    fn circuit(&self) -> Circuit {
        Circuit::PerpsRemoveLiquidity
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "lp_nullifier", self.lp_nullifier);
        insert_scalar(&mut map, "perps_pool_id", self.perps_pool_id);
        insert_scalar(&mut map, "out_commitment", self.out_commitment);
        insert_u64(&mut map, "token_index", self.token_index as u64);
        insert_u64(&mut map, "withdraw_amount", self.withdraw_amount);
        insert_u64(&mut map, "lp_amount_burned", self.lp_amount_burned);
        insert_u64(&mut map, "fee_amount", self.fee_amount);

        insert_scalar(
            &mut map,
            "lp_stealth_pub_x",
            self.lp_input.note.stealth_pub_x,
        );
        insert_u64(&mut map, "lp_amount", self.lp_input.note.lp_amount);
        insert_scalar(&mut map, "lp_randomness", self.lp_input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.lp_input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.lp_input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(&mut map, "out_stealth_pub_x", self.output_note.stealth_pub_x);
        insert_scalar(&mut map, "out_token_mint", self.output_note.token_mint);
        insert_u64(&mut map, "out_amount", self.output_note.amount);
        insert_scalar(&mut map, "out_randomness", self.output_note.randomness);

        insert_scalar(&mut map, "change_lp_commitment", self.change_lp_commitment);
        insert_u64(&mut map, "change_lp_amount", self.change_lp_note.lp_amount);
        insert_scalar(
            &mut map,
            "change_lp_stealth_pub_x",
            self.change_lp_note.stealth_pub_x,
        );
        insert_scalar(
            &mut map,
            "change_lp_randomness",
            self.change_lp_note.randomness,
        );

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.lp_nullifier,
            self.perps_pool_id,
            self.out_commitment,
            u64_to_field(self.token_index as u64),
            u64_to_field(self.withdraw_amount),
            u64_to_field(self.lp_amount_burned),
            u64_to_field(self.fee_amount),
        ]
    }
}
