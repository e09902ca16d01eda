//! Orderbook circuit witnesses: order create, fill, cancel

use rand::{CryptoRng, RngCore};

use crate::crypto::babyjubjub::Point;
use crate::crypto::keys::Wallet;
use crate::errors::{Result, SdkError};
use crate::field::{id_to_field, u64_to_field};
use crate::note::commitment::{commit_standard, random_fr};
use crate::note::nullifier;
use crate::note::Note;
use crate::poseidon;
use crate::witness::{
    effective_spending_key, insert_scalar, insert_u64, insert_vector, pad_merkle_path,
    Circuit, CircuitWitness, StandardInput, WitnessMap,
};

/// The four terms of a limit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTerms {
    /// Raw mint the maker offers
    pub offer_mint: [u8; 32],
    pub offer_amount: u64,
    /// Raw mint the maker asks for
    pub request_mint: [u8; 32],
    pub request_amount: u64,
}

impl OrderTerms {
    /// terms_hash = Poseidon(offer_mint, offer_amount, request_mint,
    /// request_amount), undomained as the circuit expects.
    pub fn hash(&self) -> Result<[u8; 32]> {
        poseidon::hash(&[
            id_to_field(&self.offer_mint),
            u64_to_field(self.offer_amount),
            id_to_field(&self.request_mint),
            u64_to_field(self.request_amount),
        ])
    }
}

/// Escrow an input note behind a new limit order.
#[derive(Clone, Debug)]
pub struct OrderCreateRequest {
    pub input: StandardInput,
    pub terms: OrderTerms,
    /// Raw host order identifier
    pub order_id: [u8; 32],
    pub expiry: u64,
    pub escrow_stealth_pub_x: [u8; 32],
    pub maker_receive_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct OrderCreateWitness {
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub order_id: [u8; 32],
    pub escrow_commitment: [u8; 32],
    pub terms_hash: [u8; 32],
    pub expiry: u64,
    pub escrow_note: Note,

    input: StandardInput,
    stealth_spending_key: [u8; 32],
    terms: OrderTerms,
    maker_receive_stealth_pub_x: [u8; 32],
}

/// Build an order-create witness. The full input note moves into escrow, so
/// its amount must equal the offered amount exactly.
pub fn build_order_create<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &OrderCreateRequest,
    rng: &mut R,
) -> Result<OrderCreateWitness> {
    if request.input.note.amount != request.terms.offer_amount {
        return Err(SdkError::Unbalanced);
    }
    if request.input.note.token_mint != id_to_field(&request.terms.offer_mint) {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        request.input.merkle.leaf_index,
    )?;

    let escrow_note = Note {
        stealth_pub_x: request.escrow_stealth_pub_x,
        token_mint: id_to_field(&request.terms.offer_mint),
        amount: request.terms.offer_amount,
        randomness: random_fr(rng),
    };

    Ok(OrderCreateWitness {
        merkle_root: request.input.merkle.root,
        nullifier,
        order_id: id_to_field(&request.order_id),
        escrow_commitment: commit_standard(
            &escrow_note.stealth_pub_x,
            &escrow_note.token_mint,
            escrow_note.amount,
            &escrow_note.randomness,
        )?,
        terms_hash: request.terms.hash()?,
        expiry: request.expiry,
        escrow_note,
        input: request.input.clone(),
        stealth_spending_key,
        terms: request.terms,
        maker_receive_stealth_pub_x: request.maker_receive_stealth_pub_x,
    })
}

impl CircuitWitness for OrderCreateWitness {
    fn circuit(&self) -> Circuit {
        Circuit::OrderCreate
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "nullifier", self.nullifier);
        insert_scalar(&mut map, "order_id", self.order_id);
        insert_scalar(&mut map, "escrow_commitment", self.escrow_commitment);
        insert_scalar(&mut map, "terms_hash", self.terms_hash);
        insert_u64(&mut map, "expiry", self.expiry);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(&mut map, "offer_mint", id_to_field(&self.terms.offer_mint));
        insert_u64(&mut map, "offer_amount", self.terms.offer_amount);
        insert_scalar(
            &mut map,
            "request_mint",
            id_to_field(&self.terms.request_mint),
        );
        insert_u64(&mut map, "request_amount", self.terms.request_amount);

        insert_scalar(
            &mut map,
            "escrow_stealth_pub_x",
            self.escrow_note.stealth_pub_x,
        );
        insert_scalar(&mut map, "escrow_randomness", self.escrow_note.randomness);
        insert_scalar(
            &mut map,
            "maker_receive_stealth_pub_x",
            self.maker_receive_stealth_pub_x,
        );

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.merkle_root,
            self.nullifier,
            self.order_id,
            self.escrow_commitment,
            self.terms_hash,
            u64_to_field(self.expiry),
        ]
    }
}

/// Fill an open order with a taker note of the requested mint.
#[derive(Clone, Debug)]
pub struct OrderFillRequest {
    pub taker_input: StandardInput,
    pub terms: OrderTerms,
    pub order_id: [u8; 32],
    pub current_timestamp: u64,
    pub taker_receive_stealth_pub_x: [u8; 32],
    pub taker_change_stealth_pub_x: [u8; 32],
    pub maker_receive_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct OrderFillWitness {
    pub taker_nullifier: [u8; 32],
    pub order_id: [u8; 32],
    pub current_timestamp: u64,
    /// Offered funds released from escrow to the taker
    pub taker_receive_note: Note,
    /// Requested funds to the maker
    pub maker_receive_note: Note,
    pub taker_change_note: Note,

    taker_input: StandardInput,
    stealth_spending_key: [u8; 32],
    terms: OrderTerms,
}

pub fn build_order_fill<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &OrderFillRequest,
    rng: &mut R,
) -> Result<OrderFillWitness> {
    let request_mint = id_to_field(&request.terms.request_mint);
    if request.taker_input.note.token_mint != request_mint {
        return Err(SdkError::Unbalanced);
    }
    if request.taker_input.note.amount < request.terms.request_amount {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.taker_input.stealth_ephemeral.as_ref())?;
    let taker_nullifier = nullifier::spending(
        &wallet.viewing_key().nullifier_key,
        &request.taker_input.commitment,
        request.taker_input.merkle.leaf_index,
    )?;

    let taker_receive_note = Note {
        stealth_pub_x: request.taker_receive_stealth_pub_x,
        token_mint: id_to_field(&request.terms.offer_mint),
        amount: request.terms.offer_amount,
        randomness: random_fr(rng),
    };
    let maker_receive_note = Note {
        stealth_pub_x: request.maker_receive_stealth_pub_x,
        token_mint: request_mint,
        amount: request.terms.request_amount,
        randomness: random_fr(rng),
    };
    let taker_change_note = Note {
        stealth_pub_x: request.taker_change_stealth_pub_x,
        token_mint: request_mint,
        amount: request.taker_input.note.amount - request.terms.request_amount,
        randomness: random_fr(rng),
    };

    Ok(OrderFillWitness {
        taker_nullifier,
        order_id: id_to_field(&request.order_id),
        current_timestamp: request.current_timestamp,
        taker_receive_note,
        maker_receive_note,
        taker_change_note,
        taker_input: request.taker_input.clone(),
        stealth_spending_key,
        terms: request.terms,
    })
}

impl CircuitWitness for OrderFillWitness {
    fn circuit(&self) -> Circuit {
        Circuit::OrderFill
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "taker_nullifier", self.taker_nullifier);
        insert_scalar(&mut map, "order_id", self.order_id);
        insert_u64(&mut map, "current_timestamp", self.current_timestamp);

        insert_scalar(
            &mut map,
            "taker_stealth_pub_x",
            self.taker_input.note.stealth_pub_x,
        );
        insert_u64(&mut map, "taker_amount", self.taker_input.note.amount);
        insert_scalar(&mut map, "taker_randomness", self.taker_input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.taker_input.merkle.leaf_index);
        insert_scalar(&mut map, "merkle_root", self.taker_input.merkle.root);
        let (path, indices) = pad_merkle_path(&self.taker_input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_scalar(&mut map, "offer_mint", id_to_field(&self.terms.offer_mint));
        insert_u64(&mut map, "offer_amount", self.terms.offer_amount);
        insert_scalar(
            &mut map,
            "request_mint",
            id_to_field(&self.terms.request_mint),
        );
        insert_u64(&mut map, "request_amount", self.terms.request_amount);

        insert_scalar(
            &mut map,
            "taker_receive_stealth_pub_x",
            self.taker_receive_note.stealth_pub_x,
        );
        insert_scalar(
            &mut map,
            "taker_receive_randomness",
            self.taker_receive_note.randomness,
        );
        insert_scalar(
            &mut map,
            "taker_change_stealth_pub_x",
            self.taker_change_note.stealth_pub_x,
        );
        insert_u64(&mut map, "taker_change_amount", self.taker_change_note.amount);
        insert_scalar(
            &mut map,
            "taker_change_randomness",
            self.taker_change_note.randomness,
        );
        insert_scalar(
            &mut map,
            "maker_receive_stealth_pub_x",
            self.maker_receive_note.stealth_pub_x,
        );
        insert_scalar(
            &mut map,
            "maker_receive_randomness",
            self.maker_receive_note.randomness,
        );

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.taker_nullifier,
            self.order_id,
            u64_to_field(self.current_timestamp),
        ]
    }
}

/// Cancel an expired or unwanted order and reclaim the escrow.
#[derive(Clone, Debug)]
pub struct OrderCancelRequest {
    /// The escrow note created by order_create
    pub escrow_note: Note,
    pub escrow_commitment: [u8; 32],
    /// Ephemeral key of the escrow stealth address, if one was used
    pub escrow_stealth_ephemeral: Option<Point>,
    pub order_id: [u8; 32],
    pub current_timestamp: u64,
    pub refund_stealth_pub_x: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct OrderCancelWitness {
    pub order_id: [u8; 32],
    pub current_timestamp: u64,
    pub refund_note: Note,

    escrow_note: Note,
    escrow_commitment: [u8; 32],
    escrow_spending_key: [u8; 32],
}

pub fn build_order_cancel<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &OrderCancelRequest,
    rng: &mut R,
) -> Result<OrderCancelWitness> {
    let escrow_spending_key =
        effective_spending_key(wallet, request.escrow_stealth_ephemeral.as_ref())?;

    let refund_note = Note {
        stealth_pub_x: request.refund_stealth_pub_x,
        token_mint: request.escrow_note.token_mint,
        amount: request.escrow_note.amount,
        randomness: random_fr(rng),
    };

    Ok(OrderCancelWitness {
        order_id: id_to_field(&request.order_id),
        current_timestamp: request.current_timestamp,
        refund_note,
        escrow_note: request.escrow_note,
        escrow_commitment: request.escrow_commitment,
        escrow_spending_key,
    })
}

impl CircuitWitness for OrderCancelWitness {
    fn circuit(&self) -> Circuit {
        Circuit::OrderCancel
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "order_id", self.order_id);
        insert_u64(&mut map, "current_timestamp", self.current_timestamp);

        insert_scalar(
            &mut map,
            "escrow_stealth_pub_x",
            self.escrow_note.stealth_pub_x,
        );
        insert_scalar(&mut map, "escrow_token_mint", self.escrow_note.token_mint);
        insert_u64(&mut map, "escrow_amount", self.escrow_note.amount);
        insert_scalar(&mut map, "escrow_randomness", self.escrow_note.randomness);
        insert_scalar(&mut map, "escrow_commitment", self.escrow_commitment);
        insert_scalar(&mut map, "escrow_spending_key", self.escrow_spending_key);

        insert_scalar(
            &mut map,
            "refund_stealth_pub_x",
            self.refund_note.stealth_pub_x,
        );
        insert_scalar(&mut map, "refund_randomness", self.refund_note.randomness);

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![self.order_id, u64_to_field(self.current_timestamp)]
    }
}
