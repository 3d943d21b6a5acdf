// N-best shortest-path search over the (state, input position) lattice.
//
// Best-first expansion in the tropical semiring: path cost is the plain sum of
// arc weights plus the final weight, and the cheapest frontier entry is always
// expanded next. Since every weight is non-negative, complete paths leave the
// queue in non-decreasing cost order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use g2p_core::DecodeOptions;
use g2p_fst::{EPSILON, FstArc, Label, StateId, Weight, WeightedFst};
use hashbrown::HashMap;

use crate::assembler::{PhonemeId, PhonemeInventory};

/// Parent index of the root hypothesis.
const NO_PARENT: u32 = u32::MAX;

/// Output-prefix id of the empty output.
const EMPTY_PREFIX: u32 = 0;

/// Limits for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Complete paths to accept before stopping.
    pub n_best: usize,
    /// Hypotheses expanded per input position.
    pub beam_width: usize,
    /// Consecutive epsilon-input arcs allowed on a path.
    pub max_epsilon_depth: usize,
    /// Stop when this instant passes.
    pub deadline: Option<Instant>,
}

impl SearchParams {
    /// Search limits from decode options, with the deadline measured from
    /// `started`.
    pub fn from_options(options: &DecodeOptions, started: Instant) -> Self {
        Self {
            n_best: options.n_best,
            beam_width: options.beam_width,
            max_epsilon_depth: options.max_epsilon_depth,
            deadline: options.timeout().map(|t| started + t),
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from_options(&DecodeOptions::default(), Instant::now())
    }
}

/// A complete path from the start state to a final state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPath {
    /// Arcs in traversal order.
    pub arcs: Vec<FstArc>,
    /// Sum of arc weights plus the final weight.
    pub weight: Weight,
}

impl SearchPath {
    /// Non-epsilon output labels along the path.
    pub fn output_labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.arcs.iter().map(|a| a.olabel).filter(|&l| l != EPSILON)
    }

    /// State reached at the end of the path.
    pub fn final_state(&self) -> Option<StateId> {
        self.arcs.last().map(|a| a.target)
    }
}

/// Counters from one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Complete paths the caller accepted.
    pub accepted: usize,
    /// Hypotheses expanded.
    pub expanded: usize,
    /// Hypotheses dropped by dominance or beam pruning.
    pub pruned: usize,
    /// Whether the deadline stopped the search.
    pub timed_out: bool,
}

/// Partial path in the search arena.
#[derive(Debug, Clone, Copy)]
struct Hypothesis {
    state: StateId,
    pos: u32,
    parent: u32,
    arc: Option<FstArc>,
    /// Interned id of the phonemes emitted so far.
    prefix: u32,
    /// Consecutive epsilon-input arcs at the end of the path.
    epsilon_run: u32,
}

/// Priority queue entry. `complete` entries carry the final weight already.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: Weight,
    seq: u64,
    hyp: u32,
    complete: bool,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and the cheapest (then oldest)
        // candidate must come out first.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Interns phoneme sequences as a trie so prefixes compare in O(1).
#[derive(Debug, Default)]
struct PrefixTrie {
    children: HashMap<(u32, PhonemeId), u32>,
    next: u32,
}

impl PrefixTrie {
    fn child(&mut self, parent: u32, phoneme: PhonemeId) -> u32 {
        let next = &mut self.next;
        *self.children.entry((parent, phoneme)).or_insert_with(|| {
            *next += 1;
            *next
        })
    }
}

/// Shortest-path search over one FST.
///
/// A search node is an FST state paired with an input position. Arcs whose
/// input label matches the next grapheme advance the position; epsilon-input
/// arcs do not, and at most `max_epsilon_depth` of them may follow each other.
///
/// Two prunings bound the work:
/// - a node is expanded once per distinct phoneme prefix (a later, costlier
///   hypothesis with the same prefix has the same continuations) and at most
///   `n_best` times. Prefixes are spelled through the [`PhonemeInventory`], so
///   silent labels add nothing and `K|S` equals `K` then `S`;
/// - at most `beam_width` hypotheses are expanded per input position. This
///   trades exactness for bounded latency: with a narrow beam the true optimum
///   or later N-best entries may be missed.
pub struct PathSearch<'a> {
    fst: &'a WeightedFst,
    inventory: &'a PhonemeInventory,
}

impl<'a> PathSearch<'a> {
    pub fn new(fst: &'a WeightedFst, inventory: &'a PhonemeInventory) -> Self {
        Self { fst, inventory }
    }

    /// Run the search over `input`, handing each complete path to `accept` in
    /// non-decreasing weight order.
    ///
    /// `accept` returns whether the path counts toward `n_best` (the caller
    /// may reject paths that duplicate an earlier result). The search stops
    /// after `n_best` accepted paths, when the frontier is empty, or when the
    /// deadline passes.
    pub fn run<F>(&self, input: &[Label], params: &SearchParams, mut accept: F) -> SearchStats
    where
        F: FnMut(SearchPath) -> bool,
    {
        let mut stats = SearchStats::default();
        if params.n_best == 0 || params.beam_width == 0 {
            return stats;
        }

        let len = input.len();
        let mut arena: Vec<Hypothesis> = Vec::new();
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut seq: u64 = 0;
        let mut prefixes = PrefixTrie::default();
        let mut node_prefixes: HashMap<(StateId, u32), Vec<u32>> = HashMap::new();
        let mut expanded_at = vec![0usize; len + 1];

        arena.push(Hypothesis {
            state: self.fst.start_state(),
            pos: 0,
            parent: NO_PARENT,
            arc: None,
            prefix: EMPTY_PREFIX,
            epsilon_run: 0,
        });
        heap.push(Candidate {
            cost: 0.0,
            seq,
            hyp: 0,
            complete: false,
        });

        while let Some(candidate) = heap.pop() {
            if let Some(deadline) = params.deadline {
                if Instant::now() >= deadline {
                    stats.timed_out = true;
                    break;
                }
            }

            if candidate.complete {
                let path = Self::trace(&arena, candidate.hyp, candidate.cost);
                if accept(path) {
                    stats.accepted += 1;
                    if stats.accepted >= params.n_best {
                        break;
                    }
                }
                continue;
            }

            let hyp = arena[candidate.hyp as usize];
            let pos = hyp.pos as usize;

            let seen = node_prefixes.entry((hyp.state, hyp.pos)).or_default();
            if seen.len() >= params.n_best || seen.contains(&hyp.prefix) {
                stats.pruned += 1;
                continue;
            }
            if expanded_at[pos] >= params.beam_width {
                stats.pruned += 1;
                continue;
            }
            seen.push(hyp.prefix);
            expanded_at[pos] += 1;
            stats.expanded += 1;

            if pos == len {
                if let Some(final_weight) = self.fst.final_weight(hyp.state) {
                    seq += 1;
                    heap.push(Candidate {
                        cost: candidate.cost + final_weight,
                        seq,
                        hyp: candidate.hyp,
                        complete: true,
                    });
                }
            }

            if (hyp.epsilon_run as usize) < params.max_epsilon_depth {
                for arc in self.fst.epsilon_arcs(hyp.state) {
                    seq += 1;
                    let prefix = self.extend_prefix(&mut prefixes, hyp.prefix, arc);
                    arena.push(Hypothesis {
                        state: arc.target,
                        pos: hyp.pos,
                        parent: candidate.hyp,
                        arc: Some(*arc),
                        prefix,
                        epsilon_run: hyp.epsilon_run + 1,
                    });
                    heap.push(Candidate {
                        cost: candidate.cost + arc.weight,
                        seq,
                        hyp: (arena.len() - 1) as u32,
                        complete: false,
                    });
                }
            }

            if pos < len && input[pos] != EPSILON {
                for arc in self.fst.outgoing_arcs(hyp.state, input[pos]) {
                    seq += 1;
                    let prefix = self.extend_prefix(&mut prefixes, hyp.prefix, arc);
                    arena.push(Hypothesis {
                        state: arc.target,
                        pos: hyp.pos + 1,
                        parent: candidate.hyp,
                        arc: Some(*arc),
                        prefix,
                        epsilon_run: 0,
                    });
                    heap.push(Candidate {
                        cost: candidate.cost + arc.weight,
                        seq,
                        hyp: (arena.len() - 1) as u32,
                        complete: false,
                    });
                }
            }
        }

        stats
    }

    fn extend_prefix(&self, prefixes: &mut PrefixTrie, prefix: u32, arc: &FstArc) -> u32 {
        self.inventory
            .spelling(arc.olabel)
            .iter()
            .fold(prefix, |prefix, &id| prefixes.child(prefix, id))
    }

    fn trace(arena: &[Hypothesis], mut index: u32, weight: Weight) -> SearchPath {
        let mut arcs = Vec::new();
        while index != NO_PARENT {
            let hyp = &arena[index as usize];
            if let Some(arc) = hyp.arc {
                arcs.push(arc);
            }
            index = hyp.parent;
        }
        arcs.reverse();
        SearchPath { arcs, weight }
    }
}
