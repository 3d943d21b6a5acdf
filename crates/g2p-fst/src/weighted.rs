// Weighted FST store: immutable arc storage with per-state label lookup.

use std::collections::VecDeque;
use std::ops::Range;

use crate::arc::FstArc;
use crate::{EPSILON, Label, LoadError, StateId, Weight, is_valid_weight};

/// Per-state slice into the shared arc array.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StateEntry {
    first_arc: u32,
    num_arcs: u32,
    final_weight: Option<Weight>,
}

impl StateEntry {
    fn range(&self) -> Range<usize> {
        let start = self.first_arc as usize;
        start..start + self.num_arcs as usize
    }
}

/// Immutable weighted transducer.
///
/// All arcs live in one array; each state owns a contiguous slice of it,
/// sorted by `(ilabel, weight)`. Looking up the arcs for one input label is a
/// binary search over that slice, and the returned arcs are cheapest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFst {
    start: StateId,
    states: Vec<StateEntry>,
    arcs: Vec<FstArc>,
}

impl WeightedFst {
    pub fn start_state(&self) -> StateId {
        self.start
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// State ids `0..num_states`.
    pub fn states(&self) -> Range<StateId> {
        0..self.states.len() as StateId
    }

    /// Final weight of `state`, or `None` if it is not final (or out of range).
    pub fn final_weight(&self, state: StateId) -> Option<Weight> {
        self.states.get(state as usize).and_then(|s| s.final_weight)
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_weight(state).is_some()
    }

    /// All outgoing arcs of `state`, sorted by `(ilabel, weight)`.
    pub fn arcs(&self, state: StateId) -> &[FstArc] {
        match self.states.get(state as usize) {
            Some(entry) => &self.arcs[entry.range()],
            None => &[],
        }
    }

    /// Outgoing arcs of `state` with input label `ilabel`, cheapest first.
    pub fn outgoing_arcs(&self, state: StateId, ilabel: Label) -> &[FstArc] {
        let arcs = self.arcs(state);
        let lo = arcs.partition_point(|a| a.ilabel < ilabel);
        let hi = lo + arcs[lo..].partition_point(|a| a.ilabel == ilabel);
        &arcs[lo..hi]
    }

    /// Outgoing arcs of `state` that consume no input.
    pub fn epsilon_arcs(&self, state: StateId) -> &[FstArc] {
        self.outgoing_arcs(state, EPSILON)
    }

    /// Every arc in the graph, grouped by source state.
    pub fn all_arcs(&self) -> &[FstArc] {
        &self.arcs
    }

    /// Number of final states.
    pub fn num_final_states(&self) -> usize {
        self.states.iter().filter(|s| s.final_weight.is_some()).count()
    }

    /// Breadth-first search from the start state for any final state.
    pub fn final_reachable(&self) -> bool {
        let mut seen = vec![false; self.states.len()];
        let mut queue = VecDeque::new();
        if let Some(flag) = seen.get_mut(self.start as usize) {
            *flag = true;
            queue.push_back(self.start);
        }
        while let Some(state) = queue.pop_front() {
            if self.is_final(state) {
                return true;
            }
            for arc in self.arcs(state) {
                let next = arc.target as usize;
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(arc.target);
                }
            }
        }
        false
    }
}

/// Mutable construction of a [`WeightedFst`].
///
/// States are created on demand: `add_arc` and `set_final` extend the state
/// list to cover the state they name. Arc targets, the start state and weights
/// are validated by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct FstBuilder {
    start: Option<StateId>,
    finals: Vec<Option<Weight>>,
    arcs: Vec<Vec<FstArc>>,
}

impl FstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh non-final state.
    pub fn add_state(&mut self) -> StateId {
        let id = self.finals.len() as StateId;
        self.finals.push(None);
        self.arcs.push(Vec::new());
        id
    }

    /// Make sure states `0..=state` exist.
    pub fn ensure_state(&mut self, state: StateId) {
        while self.finals.len() <= state as usize {
            self.add_state();
        }
    }

    pub fn num_states(&self) -> usize {
        self.finals.len()
    }

    pub fn set_start(&mut self, state: StateId) {
        self.start = Some(state);
    }

    pub fn set_final(&mut self, state: StateId, weight: Weight) {
        self.ensure_state(state);
        self.finals[state as usize] = Some(weight);
    }

    pub fn add_arc(
        &mut self,
        source: StateId,
        target: StateId,
        ilabel: Label,
        olabel: Label,
        weight: Weight,
    ) {
        self.ensure_state(source);
        self.arcs[source as usize].push(FstArc::new(source, target, ilabel, olabel, weight));
    }

    /// Validate and freeze the graph.
    pub fn build(self) -> Result<WeightedFst, LoadError> {
        let state_count = self.finals.len();
        let start = self.start.unwrap_or(0);
        if start as usize >= state_count {
            return Err(LoadError::InvalidStartState { start, state_count });
        }

        let mut states = Vec::with_capacity(state_count);
        let mut arcs = Vec::with_capacity(self.arcs.iter().map(Vec::len).sum());

        for (state, (final_weight, mut state_arcs)) in
            self.finals.into_iter().zip(self.arcs).enumerate()
        {
            let state = state as StateId;
            if let Some(weight) = final_weight {
                if !is_valid_weight(weight) {
                    return Err(LoadError::InvalidWeight { state, weight });
                }
            }
            for (i, arc) in state_arcs.iter().enumerate() {
                if arc.target as usize >= state_count {
                    return Err(LoadError::DanglingArcReference {
                        state,
                        arc: i,
                        target: arc.target,
                        state_count,
                    });
                }
                if !is_valid_weight(arc.weight) {
                    return Err(LoadError::InvalidWeight {
                        state,
                        weight: arc.weight,
                    });
                }
            }

            state_arcs.sort_by(|a, b| {
                a.ilabel
                    .cmp(&b.ilabel)
                    .then(a.weight.total_cmp(&b.weight))
                    .then(a.olabel.cmp(&b.olabel))
                    .then(a.target.cmp(&b.target))
            });

            states.push(StateEntry {
                first_arc: arcs.len() as u32,
                num_arcs: state_arcs.len() as u32,
                final_weight,
            });
            arcs.extend(state_arcs);
        }

        Ok(WeightedFst {
            start,
            states,
            arcs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -a:x/0.5-> 1, 0 -a:y/0.2-> 1, 0 -b:z/0.1-> 2, 0 -eps:eps/0.3-> 2, 1 final 0.0, 2 final 1.0
    fn sample() -> WeightedFst {
        let mut b = FstBuilder::new();
        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        b.set_start(s0);
        b.add_arc(s0, s1, 1, 10, 0.5);
        b.add_arc(s0, s2, 2, 12, 0.1);
        b.add_arc(s0, s1, 1, 11, 0.2);
        b.add_arc(s0, s2, EPSILON, EPSILON, 0.3);
        b.set_final(s1, 0.0);
        b.set_final(s2, 1.0);
        b.build().unwrap()
    }

    #[test]
    fn counts_and_finals() {
        let fst = sample();
        assert_eq!(fst.start_state(), 0);
        assert_eq!(fst.num_states(), 3);
        assert_eq!(fst.num_arcs(), 4);
        assert_eq!(fst.num_final_states(), 2);
        assert_eq!(fst.final_weight(0), None);
        assert_eq!(fst.final_weight(2), Some(1.0));
        assert!(fst.is_final(1));
    }

    #[test]
    fn arcs_sorted_by_label_then_weight() {
        let fst = sample();
        let labels: Vec<(Label, Weight)> =
            fst.arcs(0).iter().map(|a| (a.ilabel, a.weight)).collect();
        assert_eq!(labels, vec![(0, 0.3), (1, 0.2), (1, 0.5), (2, 0.1)]);
    }

    #[test]
    fn outgoing_arcs_by_label() {
        let fst = sample();
        let a = fst.outgoing_arcs(0, 1);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].olabel, 11);
        assert_eq!(a[1].olabel, 10);
        assert_eq!(fst.outgoing_arcs(0, 2).len(), 1);
        assert!(fst.outgoing_arcs(0, 3).is_empty());
        assert_eq!(fst.epsilon_arcs(0).len(), 1);
        assert!(fst.outgoing_arcs(1, 1).is_empty());
    }

    #[test]
    fn out_of_range_state_has_no_arcs() {
        let fst = sample();
        assert!(fst.arcs(99).is_empty());
        assert!(fst.outgoing_arcs(99, 1).is_empty());
        assert_eq!(fst.final_weight(99), None);
    }

    #[test]
    fn arcs_keep_their_source() {
        let fst = sample();
        assert!(fst.all_arcs().iter().all(|a| a.source == 0));
    }

    #[test]
    fn add_arc_creates_states() {
        let mut b = FstBuilder::new();
        b.add_arc(2, 0, 1, 1, 0.0);
        assert_eq!(b.num_states(), 3);
        b.set_final(4, 0.0);
        assert_eq!(b.num_states(), 5);
    }

    #[test]
    fn reject_dangling_target() {
        let mut b = FstBuilder::new();
        b.add_state();
        b.add_arc(0, 5, 1, 1, 0.0);
        let err = b.build().unwrap_err();
        assert!(matches!(
            err,
            LoadError::DanglingArcReference {
                state: 0,
                arc: 0,
                target: 5,
                state_count: 1
            }
        ));
    }

    #[test]
    fn reject_bad_start() {
        let mut b = FstBuilder::new();
        b.add_state();
        b.set_start(3);
        assert!(matches!(
            b.build(),
            Err(LoadError::InvalidStartState { start: 3, .. })
        ));
        assert!(matches!(
            FstBuilder::new().build(),
            Err(LoadError::InvalidStartState { state_count: 0, .. })
        ));
    }

    #[test]
    fn reject_negative_and_nan_weights() {
        let mut b = FstBuilder::new();
        b.add_state();
        b.add_arc(0, 0, 1, 1, -0.5);
        assert!(matches!(b.build(), Err(LoadError::InvalidWeight { .. })));

        let mut b = FstBuilder::new();
        b.set_final(0, f32::NAN);
        assert!(matches!(b.build(), Err(LoadError::InvalidWeight { .. })));
    }

    #[test]
    fn final_reachability() {
        assert!(sample().final_reachable());

        // 0 -> 1, final state 2 is disconnected
        let mut b = FstBuilder::new();
        b.add_arc(0, 1, 1, 1, 0.0);
        b.set_final(2, 0.0);
        assert!(!b.build().unwrap().final_reachable());
    }

    #[test]
    fn reachability_through_cycle() {
        let mut b = FstBuilder::new();
        b.add_arc(0, 1, 1, 1, 0.0);
        b.add_arc(1, 0, 1, 1, 0.0);
        b.add_arc(1, 2, 2, 2, 0.0);
        b.set_final(2, 0.0);
        assert!(b.build().unwrap().final_reachable());
    }
}
