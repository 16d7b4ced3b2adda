//! Dependency graph of providers, stored as an arena of nodes with index-based edges.

use crate::error::ActivationError;
use fxhash::FxHashMap;

/// A single provider in a [DependencyGraph]. Edges point at indices of required nodes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GraphNode {
    pub name: &'static str,
    pub requires: Vec<usize>,
}

/// Graph of "requires" relationships between providers, in provider input order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

impl DependencyGraph {
    /// Builds the graph from `(name, requires)` pairs. Fails if any requirement names an unknown
    /// provider or a name is duplicated.
    pub fn build<I>(providers: I) -> Result<Self, ActivationError>
    where
        I: IntoIterator<Item = (&'static str, Vec<&'static str>)>,
    {
        let providers: Vec<_> = providers.into_iter().collect();

        let mut indices = FxHashMap::default();
        for (index, (name, _)) in providers.iter().enumerate() {
            if indices.insert(*name, index).is_some() {
                return Err(ActivationError::DuplicateProvider(name.to_string()));
            }
        }

        let nodes = providers
            .into_iter()
            .map(|(name, requires)| {
                requires
                    .into_iter()
                    .map(|required| {
                        indices.get(required).copied().ok_or_else(|| {
                            ActivationError::MissingRequiredProvider {
                                provider: name.to_string(),
                                required: required.to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(|requires| GraphNode { name, requires })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes })
    }

    #[inline]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Returns node indices ordered so that every node comes after all nodes it requires. Nodes
    /// are visited depth-first in input order, so the result is stable for a given input.
    pub fn topological_order(&self) -> Result<Vec<usize>, ActivationError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for index in 0..self.nodes.len() {
            self.visit(index, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        index: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), ActivationError> {
        match marks[index] {
            Mark::Visited => return Ok(()),
            Mark::Visiting => return Err(self.cycle_error(index, path)),
            Mark::Unvisited => {}
        }

        marks[index] = Mark::Visiting;
        path.push(index);

        for &required in &self.nodes[index].requires {
            self.visit(required, marks, path, order)?;
        }

        path.pop();
        marks[index] = Mark::Visited;
        order.push(index);

        Ok(())
    }

    fn cycle_error(&self, index: usize, path: &[usize]) -> ActivationError {
        let start = path
            .iter()
            .position(|&visited| visited == index)
            .unwrap_or_default();

        ActivationError::CircularDependency {
            cycle: path[start..]
                .iter()
                .chain(std::iter::once(&index))
                .map(|&node| self.nodes[node].name.to_string())
                .collect(),
        }
    }
}
