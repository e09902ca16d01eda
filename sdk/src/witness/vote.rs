//! Governance vote circuit witness
//!
//! Voting spends nothing: an action nullifier scoped to the proposal makes
//! the vote at-most-once while the note stays live. The ballot encrypts the
//! note's amount as voting power under the committee's threshold key, one
//! ciphertext per option.

use rand::{CryptoRng, RngCore};

use crate::crypto::babyjubjub::Point;
use crate::crypto::elgamal::{self, Ciphertext};
use crate::crypto::keys::Wallet;
use crate::errors::{Result, SdkError};
use crate::field::id_to_field;
use crate::note::nullifier;
use crate::witness::{
    effective_spending_key, insert_scalar, insert_u64, insert_vector, pad_merkle_path,
    Circuit, CircuitWitness, StandardInput, WitnessMap,
};

/// Cast an encrypted ballot weighted by one note.
#[derive(Clone, Debug)]
pub struct VoteRequest {
    pub input: StandardInput,
    /// Raw host proposal identifier; doubles as the action domain
    pub proposal_id: [u8; 32],
    /// The committee's combined threshold public key
    pub election_key: Point,
    pub choice: usize,
    pub num_options: usize,
}

#[derive(Clone, Debug)]
pub struct VoteWitness {
    pub merkle_root: [u8; 32],
    pub action_nullifier: [u8; 32],
    pub proposal_id: [u8; 32],
    pub token_mint: [u8; 32],
    pub election_key: Point,
    /// One ciphertext per option, homomorphically aggregatable on chain
    pub ballot: Vec<Ciphertext>,
    pub voting_power: u64,

    input: StandardInput,
    stealth_spending_key: [u8; 32],
    choice: usize,
    randomness: Vec<[u8; 32]>,
}

pub fn build_vote<R: RngCore + CryptoRng>(
    wallet: &Wallet,
    request: &VoteRequest,
    rng: &mut R,
) -> Result<VoteWitness> {
    if request.num_options == 0 || request.choice >= request.num_options {
        return Err(SdkError::InvalidScalar);
    }
    let voting_power = request.input.note.amount;
    if voting_power == 0 {
        return Err(SdkError::Unbalanced);
    }

    let stealth_spending_key =
        effective_spending_key(wallet, request.input.stealth_ephemeral.as_ref())?;
    let proposal_id = id_to_field(&request.proposal_id);
    let action_nullifier = nullifier::action(
        &wallet.viewing_key().nullifier_key,
        &request.input.commitment,
        &proposal_id,
    )?;

    let randomness = elgamal::sample_ballot_randomness(request.num_options, rng);
    let ballot = elgamal::encrypt_ballot(
        voting_power,
        request.choice,
        &request.election_key,
        &randomness,
    )?;

    Ok(VoteWitness {
        merkle_root: request.input.merkle.root,
        action_nullifier,
        proposal_id,
        token_mint: request.input.note.token_mint,
        election_key: request.election_key,
        ballot,
        voting_power,
        input: request.input.clone(),
        stealth_spending_key,
        choice: request.choice,
        randomness,
    })
}

impl CircuitWitness for VoteWitness {
    fn circuit(&self) -> Circuit {
        Circuit::GovernanceVote
    }

    fn input_map(&self) -> WitnessMap {
        let mut map = WitnessMap::new();

        insert_scalar(&mut map, "merkle_root", self.merkle_root);
        insert_scalar(&mut map, "action_nullifier", self.action_nullifier);
        insert_scalar(&mut map, "proposal_id", self.proposal_id);
        insert_scalar(&mut map, "token_mint", self.token_mint);
        insert_scalar(&mut map, "threshold_pubkey_x", self.election_key.x);
        insert_scalar(&mut map, "threshold_pubkey_y", self.election_key.y);

        insert_scalar(&mut map, "in_stealth_pub_x", self.input.note.stealth_pub_x);
        insert_u64(&mut map, "in_amount", self.input.note.amount);
        insert_scalar(&mut map, "in_randomness", self.input.note.randomness);
        insert_scalar(&mut map, "stealth_spending_key", self.stealth_spending_key);
        insert_u64(&mut map, "leaf_index", self.input.merkle.leaf_index);
        let (path, indices) = pad_merkle_path(&self.input.merkle);
        insert_vector(&mut map, "merkle_path", path);
        insert_vector(&mut map, "merkle_path_indices", indices);

        insert_u64(&mut map, "voting_power", self.voting_power);
        insert_u64(&mut map, "choice", self.choice as u64);
        insert_vector(&mut map, "vote_randomness", self.randomness.clone());

        insert_vector(
            &mut map,
            "ballot_c1_x",
            self.ballot.iter().map(|ct| ct.c1.x).collect(),
        );
        insert_vector(
            &mut map,
            "ballot_c1_y",
            self.ballot.iter().map(|ct| ct.c1.y).collect(),
        );
        insert_vector(
            &mut map,
            "ballot_c2_x",
            self.ballot.iter().map(|ct| ct.c2.x).collect(),
        );
        insert_vector(
            &mut map,
            "ballot_c2_y",
            self.ballot.iter().map(|ct| ct.c2.y).collect(),
        );

        map
    }

    fn public_inputs(&self) -> Vec<[u8; 32]> {
        let mut inputs = vec![
            self.merkle_root,
            self.action_nullifier,
            self.proposal_id,
            self.token_mint,
            self.election_key.x,
        ];
        for ct in &self.ballot {
            inputs.push(ct.c1.x);
            inputs.push(ct.c2.x);
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MerkleProofResult;
    use crate::field::u64_to_field;
    use crate::note::commitment::commit_standard;
    use crate::note::Note;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn voting_note(wallet: &Wallet, amount: u64) -> StandardInput {
        let note = Note {
            stealth_pub_x: wallet.public_key().x,
            token_mint: u64_to_field(700),
            amount,
            randomness: u64_to_field(8),
        };
        let commitment =
            commit_standard(&note.stealth_pub_x, &note.token_mint, amount, &note.randomness)
                .unwrap();
        StandardInput {
            note,
            commitment,
            merkle: MerkleProofResult {
                root: u64_to_field(88),
                path: vec![[5u8; 32]; 6],
                path_indices: vec![0, 1, 0, 1, 0, 1],
                leaf_index: 2,
            },
            stealth_ephemeral: None,
        }
    }

    fn vote_request(wallet: &Wallet, election_key: Point) -> VoteRequest {
        VoteRequest {
            input: voting_note(wallet, 10),
            proposal_id: [0x99u8; 32],
            election_key,
            choice: 0,
            num_options: 3,
        }
    }

    #[test]
    fn test_vote_builds_full_ballot() {
        let mut rng = StdRng::seed_from_u64(601);
        let wallet = Wallet::load(u64_to_field(51)).unwrap();
        let committee = Wallet::load(u64_to_field(52)).unwrap();

        let witness =
            build_vote(&wallet, &vote_request(&wallet, *committee.public_key()), &mut rng)
                .unwrap();
        assert_eq!(witness.ballot.len(), 3);
        assert_eq!(witness.voting_power, 10);
        // 5 fixed inputs + (c1.x, c2.x) per option
        assert_eq!(witness.public_inputs().len(), 5 + 6);
    }

    #[test]
    fn test_vote_is_at_most_once_per_proposal() {
        let mut rng = StdRng::seed_from_u64(602);
        let wallet = Wallet::load(u64_to_field(51)).unwrap();
        let committee = Wallet::load(u64_to_field(52)).unwrap();

        let first =
            build_vote(&wallet, &vote_request(&wallet, *committee.public_key()), &mut rng)
                .unwrap();
        let second =
            build_vote(&wallet, &vote_request(&wallet, *committee.public_key()), &mut rng)
                .unwrap();
        // same note, same proposal: identical action nullifier
        assert_eq!(first.action_nullifier, second.action_nullifier);

        let mut other = vote_request(&wallet, *committee.public_key());
        other.proposal_id = [0x9au8; 32];
        let third = build_vote(&wallet, &other, &mut rng).unwrap();
        assert_ne!(first.action_nullifier, third.action_nullifier);
    }

    #[test]
    fn test_vote_rejects_bad_choice() {
        let mut rng = StdRng::seed_from_u64(603);
        let wallet = Wallet::load(u64_to_field(51)).unwrap();
        let committee = Wallet::load(u64_to_field(52)).unwrap();

        let mut request = vote_request(&wallet, *committee.public_key());
        request.choice = 3;
        assert!(build_vote(&wallet, &request, &mut rng).is_err());
    }

    #[test]
    fn test_zero_power_vote_rejected() {
        let mut rng = StdRng::seed_from_u64(604);
        let wallet = Wallet::load(u64_to_field(51)).unwrap();
        let committee = Wallet::load(u64_to_field(52)).unwrap();

        let mut request = vote_request(&wallet, *committee.public_key());
        request.input = voting_note(&wallet, 0);
        assert_eq!(
            build_vote(&wallet, &request, &mut rng).err(),
            Some(SdkError::Unbalanced)
        );
    }
}
