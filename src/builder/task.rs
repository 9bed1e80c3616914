//! Named build tasks and their runner.
//!
//! [`TaskRunner::execute`] runs tasks in reverse registration order and
//! ignores `depends_on` / `finalized_by`. [`TaskRunner::execute_ordered`]
//! schedules by those edges instead.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use anyhow::{bail, Context, Result};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// One step of a task.
pub type Action<'a> = Box<dyn FnOnce() -> ActionFuture<'a> + Send + 'a>;

/// A named unit of work: an ordered list of actions.
pub struct Task<'a> {
    pub name: String,
    pub description: Option<String>,
    pub depends_on: Vec<String>,
    pub finalized_by: Vec<String>,
    actions: Vec<Action<'a>>,
}

impl<'a> Task<'a> {
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    async fn run(self) -> Result<()> {
        tracing::debug!("Running task `{}`", self.name);
        let name = self.name;
        for action in self.actions {
            action()
                .await
                .with_context(|| format!("task `{}` failed", name))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("finalized_by", &self.finalized_by)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Builds a [`Task`].
pub struct TaskBuilder<'a> {
    task: Task<'a>,
}

impl<'a> TaskBuilder<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        TaskBuilder {
            task: Task {
                name: name.into(),
                description: None,
                depends_on: Vec::new(),
                finalized_by: Vec::new(),
                actions: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.task.description = Some(description.into());
        self
    }

    /// Run `action` before every action added so far.
    pub fn do_first<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        self.task.actions.insert(0, boxed(action));
        self
    }

    /// Run `action` after every action added so far.
    pub fn do_last<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        self.task.actions.push(boxed(action));
        self
    }

    pub fn depends_on(mut self, task: impl Into<String>) -> Self {
        self.task.depends_on.push(task.into());
        self
    }

    pub fn finalized_by(mut self, task: impl Into<String>) -> Self {
        self.task.finalized_by.push(task.into());
        self
    }

    pub fn build(self) -> Task<'a> {
        self.task
    }
}

fn boxed<'a, F, Fut>(action: F) -> Action<'a>
where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: Future<Output = Result<()>> + Send + 'a,
{
    Box::new(move || Box::pin(action()) as ActionFuture<'a>)
}

/// Runs registered tasks one at a time.
#[derive(Debug, Default)]
pub struct TaskRunner<'a> {
    tasks: Vec<Task<'a>>,
}

impl<'a> TaskRunner<'a> {
    pub fn new() -> Self {
        TaskRunner { tasks: Vec::new() }
    }

    /// Register a task. The most recently added task runs first.
    pub fn add_task(&mut self, task: Task<'a>) {
        self.tasks.insert(0, task);
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Run every task in list order, each action awaited before the next.
    /// Stops at the first failing action.
    pub async fn execute(self) -> Result<()> {
        for task in self.tasks {
            task.run().await?;
        }
        Ok(())
    }

    /// Run tasks in an order that honours `depends_on` and `finalized_by`.
    ///
    /// Unrelated tasks keep their `execute` order. Unknown task names and
    /// cycles are errors; nothing runs in that case.
    pub async fn execute_ordered(self) -> Result<()> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<_> = (0..self.tasks.len()).map(|i| graph.add_node(i)).collect();
        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let lookup = |owner: &str, name: &str| -> Result<usize> {
            index
                .get(name)
                .copied()
                .with_context(|| format!("task `{}` refers to unknown task `{}`", owner, name))
        };

        // Insert edges from the back so the sort keeps registration order
        // for unrelated tasks.
        for (i, task) in self.tasks.iter().enumerate().rev() {
            for dep in &task.depends_on {
                graph.add_edge(nodes[lookup(&task.name, dep)?], nodes[i], ());
            }
            for finalizer in &task.finalized_by {
                graph.add_edge(nodes[i], nodes[lookup(&task.name, finalizer)?], ());
            }
        }

        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                let name = &self.tasks[graph[cycle.node_id()]].name;
                bail!("task `{}` is part of a dependency cycle", name);
            }
        };

        let mut slots: Vec<Option<Task<'a>>> = self.tasks.into_iter().map(Some).collect();
        for node in order {
            if let Some(task) = slots[graph[node]].take() {
                task.run().await?;
            }
        }
        Ok(())
    }
}
