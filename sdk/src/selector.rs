//! Note selection and fragmentation management
//!
//! Picks notes to cover a target amount under a strategy, analyses wallet
//! fragmentation, and plans consolidation batches. Selection is pure CPU
//! work over amounts; nothing here touches the chain.

use crate::errors::{Result, SdkError};

/// A note the selector can spend. `leaf_index` is signed so consolidation
/// plans can mark virtual (not-yet-created) notes with -1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpendableNote {
    pub amount: u64,
    pub leaf_index: i64,
    pub commitment: [u8; 32],
}

impl SpendableNote {
    pub fn is_virtual(&self) -> bool {
        self.leaf_index < 0
    }
}

/// Selection strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Smallest single covering note, else descending accumulation
    Greedy,
    /// Exact single or pair match, greedy fallback
    Exact,
    /// 1- and 2-subsets minimising (sum - target)
    MinimizeChange,
    /// Prefer spending dust, topping up with one regular note
    ConsolidationAware,
    /// Ascending accumulation; the default, reduces fragmentation
    #[default]
    SmallestFirst,
}

/// Selection constraints.
#[derive(Clone, Copy, Debug)]
pub struct SelectionParams {
    pub target: u64,
    pub strategy: SelectionStrategy,
    pub max_inputs: usize,
    pub fee: u64,
    pub dust_threshold: u64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            target: 0,
            strategy: SelectionStrategy::default(),
            max_inputs: 3,
            fee: 0,
            dust_threshold: 0,
        }
    }
}

/// Which circuit the selected inputs feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitKind {
    /// Single input spends directly
    Transfer1x2,
    /// Multiple inputs consolidate first
    Consolidate3x1,
}

/// Result of a selection.
#[derive(Clone, Debug)]
pub struct SelectionResult {
    pub notes: Vec<SpendableNote>,
    pub total: u64,
    pub change: u64,
    pub circuit_kind: CircuitKind,
    /// True when the selection needs more than one consolidation batch
    /// before it can be spent
    pub needs_consolidation: bool,
}

/// Select notes covering `target + fee` under the given strategy.
///
/// Fails with `InsufficientFunds` when the whole wallet cannot cover the
/// target, and `NeedsConsolidation` when a covering subset exists only
/// above `max_inputs`.
pub fn select_notes(
    notes: &[SpendableNote],
    params: &SelectionParams,
) -> Result<SelectionResult> {
    let needed = params
        .target
        .checked_add(params.fee)
        .ok_or(SdkError::InsufficientFunds)?;
    if needed == 0 {
        return Err(SdkError::InsufficientFunds);
    }
    let max_inputs = params.max_inputs.max(1);

    let wallet_total: u64 = notes.iter().map(|note| note.amount).sum();
    if wallet_total < needed {
        return Err(SdkError::InsufficientFunds);
    }

    let picked = match params.strategy {
        SelectionStrategy::Greedy => greedy(notes, needed, max_inputs),
        SelectionStrategy::Exact => exact(notes, needed, max_inputs),
        SelectionStrategy::MinimizeChange => minimize_change(notes, needed, max_inputs),
        SelectionStrategy::ConsolidationAware => {
            consolidation_aware(notes, needed, max_inputs, params.dust_threshold)
        }
        SelectionStrategy::SmallestFirst => smallest_first(notes, needed, max_inputs),
    };

    let picked = match picked {
        Some(picked) => picked,
        // the wallet covers the target, only the input bound is in the way
        None => return Err(SdkError::NeedsConsolidation),
    };

    let total: u64 = picked.iter().map(|note| note.amount).sum();
    let circuit_kind = if picked.len() == 1 {
        CircuitKind::Transfer1x2
    } else {
        CircuitKind::Consolidate3x1
    };

    Ok(SelectionResult {
        needs_consolidation: picked.len() > 3,
        change: total - needed,
        total,
        circuit_kind,
        notes: picked,
    })
}

/// Smallest single covering note; otherwise accumulate descending.
fn greedy(notes: &[SpendableNote], needed: u64, max_inputs: usize) -> Option<Vec<SpendableNote>> {
    if let Some(best_single) = notes
        .iter()
        .filter(|note| note.amount >= needed)
        .min_by_key(|note| note.amount)
    {
        return Some(vec![*best_single]);
    }

    let mut sorted: Vec<SpendableNote> = notes.to_vec();
    sorted.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut picked = Vec::new();
    let mut sum = 0u64;
    for note in sorted {
        if picked.len() == max_inputs {
            break;
        }
        picked.push(note);
        sum += note.amount;
        if sum >= needed {
            return Some(picked);
        }
    }
    None
}

/// Exact single, then exact unordered pair, then greedy.
fn exact(notes: &[SpendableNote], needed: u64, max_inputs: usize) -> Option<Vec<SpendableNote>> {
    if let Some(single) = notes.iter().find(|note| note.amount == needed) {
        return Some(vec![*single]);
    }

    if max_inputs >= 2 {
        for (i, a) in notes.iter().enumerate() {
            for b in notes.iter().skip(i + 1) {
                if a.amount.checked_add(b.amount) == Some(needed) {
                    return Some(vec![*a, *b]);
                }
            }
        }
    }

    greedy(notes, needed, max_inputs)
}

/// Enumerate 1- and 2-subsets covering the target; keep the one with the
/// least overshoot (ties favour fewer inputs). Greedy fallback.
fn minimize_change(
    notes: &[SpendableNote],
    needed: u64,
    max_inputs: usize,
) -> Option<Vec<SpendableNote>> {
    let mut best: Option<(u64, Vec<SpendableNote>)> = None;

    let mut consider = |candidate: Vec<SpendableNote>| {
        let sum: u64 = candidate.iter().map(|note| note.amount).sum();
        if sum < needed {
            return;
        }
        let overshoot = sum - needed;
        let better = match &best {
            None => true,
            Some((best_overshoot, best_notes)) => {
                overshoot < *best_overshoot
                    || (overshoot == *best_overshoot && candidate.len() < best_notes.len())
            }
        };
        if better {
            best = Some((overshoot, candidate));
        }
    };

    for note in notes {
        consider(vec![*note]);
    }
    if max_inputs >= 2 {
        for (i, a) in notes.iter().enumerate() {
            for b in notes.iter().skip(i + 1) {
                consider(vec![*a, *b]);
            }
        }
    }

    match best {
        Some((_, picked)) => Some(picked),
        None => greedy(notes, needed, max_inputs),
    }
}

/// Prefer clearing dust: an all-dust covering subset, else dust plus one
/// regular note, else greedy.
fn consolidation_aware(
    notes: &[SpendableNote],
    needed: u64,
    max_inputs: usize,
    dust_threshold: u64,
) -> Option<Vec<SpendableNote>> {
    let mut dust: Vec<SpendableNote> = notes
        .iter()
        .filter(|note| note.amount < dust_threshold)
        .copied()
        .collect();
    dust.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut picked = Vec::new();
    let mut sum = 0u64;
    for note in &dust {
        if picked.len() == max_inputs {
            break;
        }
        picked.push(*note);
        sum += note.amount;
        if sum >= needed {
            return Some(picked);
        }
    }

    // top the dust up with the smallest covering regular note
    if !picked.is_empty() && picked.len() < max_inputs {
        let shortfall = needed - sum;
        if let Some(top_up) = notes
            .iter()
            .filter(|note| note.amount >= dust_threshold.max(shortfall))
            .min_by_key(|note| note.amount)
        {
            picked.push(*top_up);
            return Some(picked);
        }
    }

    greedy(notes, needed, max_inputs)
}

/// Ascending accumulation.
fn smallest_first(
    notes: &[SpendableNote],
    needed: u64,
    max_inputs: usize,
) -> Option<Vec<SpendableNote>> {
    let mut sorted: Vec<SpendableNote> = notes.to_vec();
    sorted.sort_by_key(|note| note.amount);

    let mut picked = Vec::new();
    let mut sum = 0u64;
    for note in sorted {
        if picked.len() == max_inputs {
            break;
        }
        picked.push(note);
        sum += note.amount;
        if sum >= needed {
            return Some(picked);
        }
    }
    None
}

/// Fragmentation analysis of a note set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentationReport {
    pub total_notes: usize,
    pub dust_notes: usize,
    pub largest: u64,
    pub smallest: u64,
    pub total: u64,
    /// 0..=100, higher means more fragmented
    pub score: u8,
    pub should_consolidate: bool,
}

/// score = round(40*min(n/10, 1) + 30*dust/n + 30*(1 - largest/total))
pub fn analyze_fragmentation(notes: &[SpendableNote], dust_threshold: u64) -> FragmentationReport {
    if notes.is_empty() {
        return FragmentationReport::default();
    }

    let total_notes = notes.len();
    let dust_notes = notes
        .iter()
        .filter(|note| note.amount < dust_threshold)
        .count();
    let largest = notes.iter().map(|note| note.amount).max().unwrap_or(0);
    let smallest = notes.iter().map(|note| note.amount).min().unwrap_or(0);
    let total: u64 = notes.iter().map(|note| note.amount).sum();

    let count_term = 40.0 * (total_notes as f64 / 10.0).min(1.0);
    let dust_term = 30.0 * dust_notes as f64 / total_notes as f64;
    let concentration_term = if total == 0 {
        0.0
    } else {
        30.0 * (1.0 - largest as f64 / total as f64)
    };
    let score = (count_term + dust_term + concentration_term)
        .round()
        .clamp(0.0, 100.0) as u8;

    FragmentationReport {
        total_notes,
        dust_notes,
        largest,
        smallest,
        total,
        score,
        should_consolidate: total_notes > 5 || dust_notes > 2 || score > 50,
    }
}

/// One consolidation step: up to three inputs merged into one output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidationBatch {
    pub inputs: Vec<SpendableNote>,
    pub output_amount: u64,
}

/// Plan an ordered batch sequence merging all notes into one. Each batch's
/// output becomes a virtual input (leaf_index -1) for the next batch.
pub fn plan_consolidation(notes: &[SpendableNote]) -> Vec<ConsolidationBatch> {
    let mut queue: Vec<SpendableNote> = notes.to_vec();
    queue.sort_by_key(|note| note.amount);

    let mut batches = Vec::new();
    while queue.len() > 1 {
        let take = queue.len().min(3);
        let inputs: Vec<SpendableNote> = queue.drain(..take).collect();
        let output_amount = inputs.iter().map(|note| note.amount).sum();

        queue.push(SpendableNote {
            amount: output_amount,
            leaf_index: -1,
            commitment: [0u8; 32],
        });
        queue.sort_by_key(|note| note.amount);

        batches.push(ConsolidationBatch {
            inputs,
            output_amount,
        });
    }
    batches
}
