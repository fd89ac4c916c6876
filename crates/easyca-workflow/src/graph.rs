//! Task graph construction and traversal.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::step::StepSpec;

/// A validated, acyclic set of steps for one instance.
///
/// Steps are kept in declaration order, which doubles as the deterministic
/// tie-break for topological ordering: the builder declares steps in the
/// order the underlying tooling expects them to run when the edge set alone
/// leaves the order open (the Legacy DH-before-CA convention relies on
/// this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
  instance: String,
  steps: Vec<StepSpec>,
}

impl TaskGraph {
  /// Build a graph, validating step names, edges and acyclicity.
  pub fn new(instance: impl Into<String>, steps: Vec<StepSpec>) -> Result<Self, WorkflowError> {
    let mut seen = HashSet::new();
    for step in &steps {
      if !seen.insert(step.name.as_str()) {
        return Err(WorkflowError::DuplicateStep(step.name.clone()));
      }
    }

    for step in &steps {
      for requires in &step.requires {
        if !seen.contains(requires.as_str()) {
          return Err(WorkflowError::UnknownPrerequisite {
            step: step.name.clone(),
            requires: requires.clone(),
          });
        }
      }
    }

    let graph = Self {
      instance: instance.into(),
      steps,
    };

    // Kahn's algorithm doubles as the acyclicity check: any step left
    // unplaced sits on a cycle.
    let placed = graph.order_indices();
    if placed.len() != graph.steps.len() {
      let on_cycle: Vec<String> = graph
        .steps
        .iter()
        .enumerate()
        .filter(|(i, _)| !placed.contains(i))
        .map(|(_, s)| s.name.clone())
        .collect();
      return Err(WorkflowError::Cycle(on_cycle));
    }

    Ok(graph)
  }

  pub fn instance(&self) -> &str {
    &self.instance
  }

  /// Steps in declaration order.
  pub fn steps(&self) -> &[StepSpec] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&StepSpec> {
    self.steps.iter().find(|s| s.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// Steps in a stable topological order.
  ///
  /// Among steps whose prerequisites are all met, declaration order wins.
  pub fn topo_order(&self) -> Vec<&StepSpec> {
    self
      .order_indices()
      .into_iter()
      .map(|i| &self.steps[i])
      .collect()
  }

  /// Declaration-order Kahn traversal; stops early on a cycle.
  fn order_indices(&self) -> Vec<usize> {
    let index: HashMap<&str, usize> = self
      .steps
      .iter()
      .enumerate()
      .map(|(i, s)| (s.name.as_str(), i))
      .collect();

    let mut placed: Vec<usize> = Vec::with_capacity(self.steps.len());
    let mut done = vec![false; self.steps.len()];

    while placed.len() < self.steps.len() {
      let next = self.steps.iter().enumerate().find(|(i, step)| {
        !done[*i]
          && step
            .requires
            .iter()
            .all(|r| index.get(r.as_str()).is_some_and(|&j| done[j]))
      });
      match next {
        Some((i, _)) => {
          done[i] = true;
          placed.push(i);
        }
        None => break,
      }
    }

    placed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::step::CompletionCheck;
  use std::path::PathBuf;

  fn step(name: &str, requires: &[&str]) -> StepSpec {
    StepSpec {
      name: name.to_string(),
      command: "true".to_string(),
      workdir: PathBuf::from("/tmp"),
      completion: CompletionCheck::FileExists(PathBuf::from(format!("/tmp/{name}"))),
      requires: requires.iter().map(|r| r.to_string()).collect(),
      env: Default::default(),
      timeout: None,
    }
  }

  #[test]
  fn topo_order_respects_edges_and_declaration_order() {
    let graph = TaskGraph::new(
      "test",
      vec![
        step("dh", &[]),
        step("ca", &[]),
        step("server", &["ca"]),
        step("crl", &["server"]),
      ],
    )
    .unwrap();

    let order: Vec<&str> = graph.topo_order().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["dh", "ca", "server", "crl"]);
  }

  #[test]
  fn declaration_order_breaks_ties_among_independent_steps() {
    let graph = TaskGraph::new(
      "test",
      vec![step("b", &[]), step("a", &[]), step("c", &["b"])],
    )
    .unwrap();

    let order: Vec<&str> = graph.topo_order().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
  }

  #[test]
  fn prerequisite_pulls_step_after_dependency() {
    // "late" is declared first but requires "early".
    let graph = TaskGraph::new("test", vec![step("late", &["early"]), step("early", &[])]).unwrap();
    let order: Vec<&str> = graph.topo_order().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(order, vec!["early", "late"]);
  }

  #[test]
  fn unknown_prerequisite_is_rejected() {
    let result = TaskGraph::new("test", vec![step("a", &["ghost"])]);
    assert!(matches!(
      result,
      Err(WorkflowError::UnknownPrerequisite { .. })
    ));
  }

  #[test]
  fn duplicate_step_is_rejected() {
    let result = TaskGraph::new("test", vec![step("a", &[]), step("a", &[])]);
    assert!(matches!(result, Err(WorkflowError::DuplicateStep(_))));
  }

  #[test]
  fn cycle_is_rejected() {
    let result = TaskGraph::new("test", vec![step("a", &["b"]), step("b", &["a"])]);
    match result {
      Err(WorkflowError::Cycle(steps)) => {
        assert_eq!(steps.len(), 2);
      }
      other => panic!("expected cycle error, got {other:?}"),
    }
  }
}
