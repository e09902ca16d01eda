//! Vote tallying
//!
//! Combines committee decryption shares over an aggregated ballot. Every
//! share is DLEQ-checked against the member's public key before it can
//! contribute; one bad share rejects the batch with its member index so the
//! caller can drop the member or abort per policy.

use crate::crypto::babyjubjub::Point;
use crate::crypto::elgamal::{self, Ciphertext, DleqProof};
use crate::errors::{Result, SdkError};

/// One committee member's contribution: a share per ballot option, each
/// with its DLEQ proof.
#[derive(Clone, Debug)]
pub struct DecryptionShareEntry {
    pub member_index: u64,
    pub member_pubkey: Point,
    pub shares: Vec<Point>,
    pub proofs: Vec<DleqProof>,
}

/// Everything that went into decrypting one option, kept for audit.
#[derive(Clone, Debug)]
pub struct OptionTranscript {
    pub option: usize,
    pub ciphertext: Ciphertext,
    pub member_indices: Vec<u64>,
    pub shares: Vec<Point>,
    pub recovered_point: Point,
    pub total: u64,
}

/// Decrypted per-option totals plus their transcripts.
#[derive(Clone, Debug)]
pub struct TallyOutcome {
    pub totals: Vec<u64>,
    pub transcripts: Vec<OptionTranscript>,
}

/// Combine t shares into per-option totals.
///
/// `dl_bound` is the deployment's maximum recoverable tally (total voting
/// power); see [`crate::constants::DEFAULT_DISCRETE_LOG_BOUND`].
pub fn tally(
    ballot: &[Ciphertext],
    entries: &[DecryptionShareEntry],
    dl_bound: u64,
) -> Result<TallyOutcome> {
    if ballot.is_empty() || entries.is_empty() {
        return Err(SdkError::InvalidScalar);
    }

    // 1. verify every member's shares before any combination
    for entry in entries {
        if entry.shares.len() != ballot.len() || entry.proofs.len() != ballot.len() {
            return Err(SdkError::BadShare(entry.member_index));
        }
        for (option, ct) in ballot.iter().enumerate() {
            let valid = elgamal::dleq_verify(
                &entry.member_pubkey,
                &ct.c1,
                &entry.shares[option],
                &entry.proofs[option],
            )?;
            if !valid {
                return Err(SdkError::BadShare(entry.member_index));
            }
        }
    }

    let member_indices: Vec<u64> = entries.iter().map(|entry| entry.member_index).collect();

    // 2..4. Lagrange-combine per option and recover the exponent
    let mut totals = Vec::with_capacity(ballot.len());
    let mut transcripts = Vec::with_capacity(ballot.len());
    for (option, ct) in ballot.iter().enumerate() {
        let shares: Vec<Point> = entries
            .iter()
            .map(|entry| entry.shares[option])
            .collect();

        let recovered_point = elgamal::combine(ct, &shares, &member_indices)?;
        let total = elgamal::discrete_log(&recovered_point, dl_bound)?.ok_or_else(|| {
            SdkError::Boundary("tally exceeds the discrete-log recovery bound".to_string())
        })?;

        totals.push(total);
        transcripts.push(OptionTranscript {
            option,
            ciphertext: *ct,
            member_indices: member_indices.clone(),
            shares,
            recovered_point,
            total,
        });
    }

    Ok(TallyOutcome {
        totals,
        transcripts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::babyjubjub;
    use crate::crypto::elgamal::VoteChoice;
    use crate::crypto::stealth;
    use crate::field::u64_to_field;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// t = 2 of n = 3 committee with shares of f(x) = secret + coeff*x.
    struct Committee {
        secret: [u8; 32],
        coeff: [u8; 32],
    }

    impl Committee {
        fn new(rng: &mut StdRng) -> Self {
            Self {
                secret: stealth::sample_scalar(rng),
                coeff: stealth::sample_scalar(rng),
            }
        }

        fn election_key(&self) -> Point {
            babyjubjub::mul_base(&self.secret).unwrap()
        }

        fn share_scalar(&self, index: u64) -> [u8; 32] {
            babyjubjub::scalar_add(
                &self.secret,
                &babyjubjub::scalar_mul(&self.coeff, &u64_to_field(index)),
            )
        }

        fn entry(
            &self,
            index: u64,
            ballot: &[Ciphertext],
            rng: &mut StdRng,
        ) -> DecryptionShareEntry {
            let scalar = self.share_scalar(index);
            let shares: Vec<Point> = ballot
                .iter()
                .map(|ct| elgamal::decryption_share(ct, &scalar).unwrap())
                .collect();
            let proofs: Vec<DleqProof> = ballot
                .iter()
                .map(|ct| elgamal::dleq_prove(&scalar, &ct.c1, rng).unwrap())
                .collect();
            DecryptionShareEntry {
                member_index: index,
                member_pubkey: babyjubjub::mul_base(&scalar).unwrap(),
                shares,
                proofs,
            }
        }
    }

    fn cast_ballot(
        committee: &Committee,
        power: u64,
        choice: VoteChoice,
        rng: &mut StdRng,
    ) -> Vec<Ciphertext> {
        let randomness = [
            stealth::sample_scalar(rng),
            stealth::sample_scalar(rng),
            stealth::sample_scalar(rng),
        ];
        elgamal::encrypt_vote(power, choice, &committee.election_key(), &randomness).unwrap()
    }

    #[test]
    fn test_two_of_three_tally() {
        let mut rng = StdRng::seed_from_u64(801);
        let committee = Committee::new(&mut rng);

        let ballot = cast_ballot(&committee, 10, VoteChoice::Yes, &mut rng);
        let entries = vec![
            committee.entry(1, &ballot, &mut rng),
            committee.entry(3, &ballot, &mut rng),
        ];

        let outcome = tally(&ballot, &entries, 1_000).unwrap();
        assert_eq!(outcome.totals, vec![10, 0, 0]);
        assert_eq!(outcome.transcripts.len(), 3);
        assert_eq!(outcome.transcripts[0].member_indices, vec![1, 3]);
    }

    #[test]
    fn test_aggregated_ballots_tally() {
        let mut rng = StdRng::seed_from_u64(802);
        let committee = Committee::new(&mut rng);

        let first = cast_ballot(&committee, 10, VoteChoice::Yes, &mut rng);
        let second = cast_ballot(&committee, 7, VoteChoice::No, &mut rng);
        let aggregated: Vec<Ciphertext> = first
            .iter()
            .zip(&second)
            .map(|(a, b)| elgamal::add(a, b).unwrap())
            .collect();

        let entries = vec![
            committee.entry(1, &aggregated, &mut rng),
            committee.entry(2, &aggregated, &mut rng),
        ];

        let outcome = tally(&aggregated, &entries, 1_000).unwrap();
        assert_eq!(outcome.totals, vec![10, 7, 0]);
    }

    #[test]
    fn test_corrupted_share_is_rejected_with_member_index() {
        let mut rng = StdRng::seed_from_u64(803);
        let committee = Committee::new(&mut rng);

        let ballot = cast_ballot(&committee, 10, VoteChoice::Yes, &mut rng);
        let good = committee.entry(1, &ballot, &mut rng);
        let mut bad = committee.entry(3, &ballot, &mut rng);
        // swap in a share formed with the wrong scalar
        bad.shares[0] = babyjubjub::mul_base(&u64_to_field(1234)).unwrap();

        let result = tally(&ballot, &[good, bad], 1_000);
        assert_eq!(result.err(), Some(SdkError::BadShare(3)));
    }

    #[test]
    fn test_shape_mismatch_is_bad_share() {
        let mut rng = StdRng::seed_from_u64(804);
        let committee = Committee::new(&mut rng);

        let ballot = cast_ballot(&committee, 10, VoteChoice::Yes, &mut rng);
        let mut entry = committee.entry(2, &ballot, &mut rng);
        entry.shares.pop();

        assert_eq!(
            tally(&ballot, &[entry], 1_000).err(),
            Some(SdkError::BadShare(2))
        );
    }

    #[test]
    fn test_out_of_bound_tally_surfaces() {
        let mut rng = StdRng::seed_from_u64(805);
        let committee = Committee::new(&mut rng);

        let ballot = cast_ballot(&committee, 5_000, VoteChoice::Abstain, &mut rng);
        let entries = vec![
            committee.entry(1, &ballot, &mut rng),
            committee.entry(2, &ballot, &mut rng),
        ];

        assert!(matches!(
            tally(&ballot, &entries, 100).err(),
            Some(SdkError::Boundary(_))
        ));
    }
}
