// ABOUTME: Dependency graph analysis and topological phase construction
// ABOUTME: Groups tasks into levels so independent tasks run concurrently

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};

use super::error::{ExecutionError, Result};
use crate::workflow::WorkflowDefinition;

pub struct DependencyGraph {
    graph: Graph<String, ()>,
    task_indices: HashMap<String, NodeIndex>,
    declaration_order: Vec<String>,
}

/// Ordered phases; every task in a phase has all of its dependencies in
/// strictly earlier phases. Derived per resolution, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub phases: Vec<Vec<String>>,
    pub total_tasks: usize,
}

impl DependencyGraph {
    /// Build the graph, rejecting references to task ids that do not exist
    /// in the definition.
    pub fn from_definition(definition: &WorkflowDefinition) -> Result<Self> {
        let mut graph = Graph::new();
        let mut task_indices = HashMap::new();
        let mut declaration_order = Vec::with_capacity(definition.tasks.len());

        for task in &definition.tasks {
            let node = graph.add_node(task.task_id.clone());
            task_indices.insert(task.task_id.clone(), node);
            declaration_order.push(task.task_id.clone());
        }

        for task in &definition.tasks {
            let task_node = task_indices[&task.task_id];
            for dependency in &task.dependencies {
                match task_indices.get(dependency) {
                    Some(&dep_node) => {
                        graph.add_edge(dep_node, task_node, ());
                    }
                    None => {
                        return Err(ExecutionError::UnknownDependency {
                            task_id: task.task_id.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            graph,
            task_indices,
            declaration_order,
        })
    }

    /// Topological leveling: level 0 for tasks without dependencies,
    /// otherwise 1 + the maximum level among dependencies. Within a phase,
    /// tasks keep their declaration order so planning is deterministic.
    pub fn execution_plan(&self) -> Result<ExecutionPlan> {
        let sorted = toposort(&self.graph, None)
            .map_err(|_| ExecutionError::CircularDependency {
                tasks: self.cycle_members(),
            })?;

        let mut levels: HashMap<NodeIndex, usize> = HashMap::with_capacity(sorted.len());
        let mut max_level = 0;
        for node in sorted {
            let level = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| levels[&dep] + 1)
                .max()
                .unwrap_or(0);
            max_level = max_level.max(level);
            levels.insert(node, level);
        }

        let phase_count = if self.declaration_order.is_empty() {
            0
        } else {
            max_level + 1
        };
        let mut phases = vec![Vec::new(); phase_count];
        for task_id in &self.declaration_order {
            let level = levels[&self.task_indices[task_id]];
            phases[level].push(task_id.clone());
        }

        Ok(ExecutionPlan {
            phases,
            total_tasks: self.declaration_order.len(),
        })
    }

    /// Names every task sitting on a cycle, for the error message.
    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.iter().any(|&n| self.graph.contains_edge(n, n))
            })
            .flatten()
            .map(|node| self.graph[node].clone())
            .collect();
        members.sort();
        members
    }

    pub fn dependencies_of(&self, task_id: &str) -> Vec<String> {
        match self.task_indices.get(task_id) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| self.graph[dep].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn dependents_of(&self, task_id: &str) -> Vec<String> {
        match self.task_indices.get(task_id) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|dep| self.graph[dep].clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl ExecutionPlan {
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Largest batch of tasks eligible to run at once.
    pub fn max_parallelism(&self) -> usize {
        self.phases.iter().map(|p| p.len()).max().unwrap_or(0)
    }

    /// 1 - phases/tasks; 0.0 for an empty plan. A fully sequential chain
    /// scores 0, a single all-parallel phase approaches 1.
    pub fn parallel_efficiency(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        1.0 - (self.phases.len() as f64 / self.total_tasks as f64)
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.phases
            .iter()
            .any(|phase| phase.iter().any(|t| t == task_id))
    }

    pub fn phase_of(&self, task_id: &str) -> Option<usize> {
        self.phases
            .iter()
            .position(|phase| phase.iter().any(|t| t == task_id))
    }
}
