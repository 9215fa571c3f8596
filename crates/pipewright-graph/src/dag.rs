//! Task dependency graph derived from `taskOutput` argument references.
//!
//! The document only stores the consumer side of each dependency (the
//! argument); this module builds both directions so reachability and
//! ordering queries do not rescan every task.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use pipewright_spec::GraphSpec;

#[derive(Debug, Clone, Default)]
pub struct TaskDag<'a> {
    upstream: BTreeMap<&'a str, BTreeSet<&'a str>>,
    downstream: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> TaskDag<'a> {
    /// Build the adjacency for `graph`. References to tasks that do not
    /// exist are ignored.
    pub fn new(graph: &'a GraphSpec) -> Self {
        let mut upstream: BTreeMap<&'a str, BTreeSet<&'a str>> = graph
            .tasks
            .keys()
            .map(|id| (id.as_str(), BTreeSet::new()))
            .collect();
        let mut downstream = upstream.clone();

        for (task_id, _, argument) in graph.arguments() {
            let Some(reference) = argument.as_task_output() else {
                continue;
            };
            let source = reference.task_id.as_str();
            if !upstream.contains_key(source) {
                continue;
            }
            if let Some(set) = upstream.get_mut(task_id) {
                set.insert(source);
            }
            if let Some(set) = downstream.get_mut(source) {
                set.insert(task_id);
            }
        }

        Self {
            upstream,
            downstream,
        }
    }

    pub fn len(&self) -> usize {
        self.upstream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty()
    }

    /// Tasks whose outputs `task_id` consumes.
    pub fn upstream(&self, task_id: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.upstream.get(task_id).into_iter().flatten().copied()
    }

    /// Tasks consuming an output of `task_id`.
    pub fn downstream(&self, task_id: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.downstream.get(task_id).into_iter().flatten().copied()
    }

    /// Returns `true` if `task_id` transitively consumes an output of `ancestor`.
    pub fn depends_on(&self, task_id: &str, ancestor: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<&str> = self.upstream(task_id).collect();
        while let Some(current) = queue.pop_front() {
            if current == ancestor {
                return true;
            }
            if visited.insert(current) {
                queue.extend(self.upstream(current));
            }
        }
        false
    }

    /// Every task downstream of `task_id`, excluding itself unless it sits on a cycle.
    pub fn descendants(&self, task_id: &str) -> BTreeSet<&'a str> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&'a str> = self.downstream(task_id).collect();
        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                queue.extend(self.downstream(current));
            }
        }
        seen
    }

    /// Kahn's algorithm with lexicographic tie-breaking. Returns the ordered
    /// tasks and the tasks left over because they sit on or behind a cycle.
    fn kahn(&self) -> (Vec<&'a str>, Vec<&'a str>) {
        let mut in_degree: BTreeMap<&'a str, usize> = self
            .upstream
            .iter()
            .map(|(id, ups)| (*id, ups.len()))
            .collect();
        let mut ready: BTreeSet<&'a str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(current) = ready.pop_first() {
            order.push(current);
            for next in self.downstream(current) {
                if let Some(d) = in_degree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        let stuck = in_degree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(id, _)| id)
            .collect();
        (order, stuck)
    }

    /// Tasks in dependency order, or `None` if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<&'a str>> {
        let (order, stuck) = self.kahn();
        stuck.is_empty().then_some(order)
    }

    /// Tasks that cannot be ordered: members of a cycle and anything
    /// downstream of one.
    pub fn unorderable(&self) -> Vec<&'a str> {
        self.kahn().1
    }
}
