//! Column dependency tracking
//!
//! Edges run from a referenced column (precedent) to the formula column that
//! reads it (dependent). A formula reading its own column adds no edge.

use ahash::{AHashMap, AHashSet};
use tabula_core::{ColumnId, FormulaStep, Store};

/// Dependency graph between columns
#[derive(Debug, Default, Clone)]
pub struct ColumnGraph {
    /// Column → formula columns that read it
    dependents: AHashMap<ColumnId, AHashSet<ColumnId>>,
    /// Formula column → columns it reads
    precedents: AHashMap<ColumnId, AHashSet<ColumnId>>,
}

impl ColumnGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from persisted steps
    pub fn from_steps<'s, I>(steps: I) -> Self
    where
        I: IntoIterator<Item = &'s FormulaStep>,
    {
        let mut graph = Self::new();
        for step in steps {
            if let Some(referenced) = step.referenced_column() {
                graph.add_dependency(referenced, step.column);
            }
        }
        graph
    }

    /// Build the graph from every formula in the store
    pub fn from_store(store: &Store) -> Self {
        Self::from_steps(&store.all_steps())
    }

    /// Add a dependency: `dependent` reads `precedent`
    pub fn add_dependency(&mut self, precedent: ColumnId, dependent: ColumnId) {
        if precedent == dependent {
            return;
        }
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Formula columns that read `column` directly
    pub fn dependents(&self, column: ColumnId) -> impl Iterator<Item = ColumnId> + '_ {
        self.dependents
            .get(&column)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Columns that `column`'s formula reads directly
    pub fn precedents(&self, column: ColumnId) -> impl Iterator<Item = ColumnId> + '_ {
        self.precedents
            .get(&column)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Every column downstream of `changed`, precedents before dependents
    ///
    /// The changed columns themselves are not included. Columns on a cycle
    /// appear once; the cycle is left for evaluation to report.
    pub fn recalc_order(&self, changed: &[ColumnId]) -> Vec<ColumnId> {
        let mut postorder = Vec::new();
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();

        for &column in changed {
            self.topological_sort(column, &mut postorder, &mut visited, &mut in_stack);
        }

        postorder.reverse();
        postorder.retain(|column| !changed.contains(column));
        postorder
    }

    fn topological_sort(
        &self,
        column: ColumnId,
        result: &mut Vec<ColumnId>,
        visited: &mut AHashSet<ColumnId>,
        in_stack: &mut AHashSet<ColumnId>,
    ) {
        if visited.contains(&column) || in_stack.contains(&column) {
            return;
        }

        in_stack.insert(column);
        if let Some(dependents) = self.dependents.get(&column) {
            for &dependent in dependents {
                self.topological_sort(dependent, result, visited, in_stack);
            }
        }
        in_stack.remove(&column);

        visited.insert(column);
        result.push(column);
    }

    /// Detect whether `column` sits on a cycle of formulas
    pub fn has_circular_reference(&self, column: ColumnId) -> bool {
        let mut visited = AHashSet::new();
        let mut in_stack = AHashSet::new();
        self.detect_cycle(column, column, &mut visited, &mut in_stack)
    }

    fn detect_cycle(
        &self,
        start: ColumnId,
        column: ColumnId,
        visited: &mut AHashSet<ColumnId>,
        in_stack: &mut AHashSet<ColumnId>,
    ) -> bool {
        if in_stack.contains(&column) {
            return column == start;
        }
        if !visited.insert(column) {
            return false;
        }

        in_stack.insert(column);
        let found = self
            .precedents(column)
            .any(|precedent| self.detect_cycle(start, precedent, visited, in_stack));
        in_stack.remove(&column);
        found
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FormulaOperand, OperationKind};

    fn reads(owner: ColumnId, referenced: ColumnId) -> FormulaStep {
        FormulaStep::new(
            owner,
            0,
            Some(OperationKind::Add),
            Some(FormulaOperand::Column(referenced)),
        )
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = ColumnGraph::new();
        let a = ColumnId::new();
        let b = ColumnId::new();

        graph.add_dependency(a, b);

        assert!(graph.dependents(a).any(|c| c == b));
        assert!(graph.precedents(b).any(|c| c == a));
    }

    #[test]
    fn test_self_reference_adds_no_edge() {
        let a = ColumnId::new();
        let graph = ColumnGraph::from_steps(&[reads(a, a)]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_recalc_order_is_topological() {
        // A -> B -> D, A -> C -> D
        let a = ColumnId::new();
        let b = ColumnId::new();
        let c = ColumnId::new();
        let d = ColumnId::new();
        let steps = vec![reads(b, a), reads(c, a), reads(d, b), reads(d, c)];
        let graph = ColumnGraph::from_steps(&steps);

        let order = graph.recalc_order(&[a]);
        assert_eq!(order.len(), 3);
        let pos = |x: ColumnId| order.iter().position(|c| *c == x).unwrap();
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
        assert!(!order.contains(&a));
    }

    #[test]
    fn test_circular_reference() {
        let a = ColumnId::new();
        let b = ColumnId::new();
        let c = ColumnId::new();
        let outside = ColumnId::new();

        let mut graph = ColumnGraph::new();
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, a);
        graph.add_dependency(c, outside);

        assert!(graph.has_circular_reference(a));
        assert!(graph.has_circular_reference(b));
        assert!(graph.has_circular_reference(c));
        assert!(!graph.has_circular_reference(outside));

        // Cycles terminate
        let order = graph.recalc_order(&[a]);
        assert_eq!(order.len(), 3);
    }
}
