//! The [`Epicenter`]: an ordered collection of [`Workspace`]s sharing one
//! [`EpicenterConfig`] root, with inter-workspace dependencies resolved into a DAG at
//! construction time (§2, §3 invariant 6).
//!
//! Grounded on the teacher's `Instance`, which hosts multiple `Database`s behind one
//! storage backend (`instance/mod.rs`): the `Epicenter` plays the analogous role one
//! level up, hosting multiple `Workspace`s behind one shared config root, plus the
//! dependency-DAG bookkeeping a single `Instance` database never needed.

mod errors;

pub use errors::EpicenterError;

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{ActionContext, ActionSet, DependencyHandle};
use crate::config::EpicenterConfig;
use crate::workspace::Workspace;

/// One workspace's id, its dependency ids, and its declared [`ActionSet`], as handed to
/// [`EpicenterBuilder::workspace`] — the not-yet-resolved form, before dependency order
/// is known (§2, §4.11).
struct PendingWorkspace {
    id: String,
    workspace: Arc<Workspace>,
    dependencies: Vec<String>,
    actions: ActionSet,
}

/// Builder for an [`Epicenter`] (§2's "application composes several workspaces").
pub struct EpicenterBuilder {
    config: EpicenterConfig,
    pending: Vec<PendingWorkspace>,
}

impl EpicenterBuilder {
    pub fn new(config: EpicenterConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Register a workspace with its declared dependencies (other workspace ids this
    /// one's actions may call into, §4.11 `context.workspaces`) and its [`ActionSet`]
    /// (the `actions(context) -> { name -> action }` declaration of §4.11).
    pub fn workspace(
        mut self,
        id: impl Into<String>,
        workspace: Arc<Workspace>,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
        actions: ActionSet,
    ) -> Self {
        self.pending.push(PendingWorkspace {
            id: id.into(),
            workspace,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            actions,
        });
        self
    }

    /// Resolve the dependency DAG (rejecting cycles and dangling references, §3
    /// invariant 6) and build every workspace's [`ActionContext`] in dependency order,
    /// so that a dependent workspace's context always embeds its dependencies' *already
    /// resolved* contexts (§4.11, §8 property 7).
    pub fn build(self) -> Result<Epicenter, EpicenterError> {
        let mut workspaces = HashMap::new();
        let mut dependencies = HashMap::new();
        let mut actions_by_id = HashMap::new();

        for entry in self.pending {
            if workspaces
                .insert(entry.id.clone(), entry.workspace)
                .is_some()
            {
                return Err(EpicenterError::DuplicateWorkspace { id: entry.id });
            }
            dependencies.insert(entry.id.clone(), entry.dependencies);
            actions_by_id.insert(entry.id.clone(), entry.actions);
        }

        for (id, deps) in &dependencies {
            for dep in deps {
                if !workspaces.contains_key(dep) {
                    return Err(EpicenterError::UnknownDependency {
                        workspace: id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let order = topological_order(&dependencies)?;

        let mut contexts: HashMap<String, ActionContext> = HashMap::new();
        let mut action_sets: HashMap<String, Arc<ActionSet>> = HashMap::new();

        for id in &order {
            let workspace = workspaces.get(id).expect("id came from workspaces").clone();
            let mut ctx_dependencies = HashMap::new();
            for dep in &dependencies[id] {
                let dep_actions = Arc::clone(&action_sets[dep]);
                let dep_context = contexts[dep].clone();
                ctx_dependencies.insert(dep.clone(), DependencyHandle::new(dep_actions, dep_context));
            }
            let ctx = ActionContext::new(
                Arc::clone(&workspace),
                workspace.schema_arc(),
                ctx_dependencies,
                self.config.root().to_path_buf(),
                id.clone(),
            );
            contexts.insert(id.clone(), ctx);
            action_sets.insert(id.clone(), Arc::new(actions_by_id.remove(id).unwrap_or_default()));
        }

        Ok(Epicenter {
            config: self.config,
            workspaces,
            actions: action_sets,
            contexts,
            order,
        })
    }
}

/// Kahn's algorithm with a leftover-node cycle report (§3 invariant 6's
/// "cycles are rejected at construction", §7 `dependency-cycle`).
fn topological_order(dependencies: &HashMap<String, Vec<String>>) -> Result<Vec<String>, EpicenterError> {
    let mut in_degree: HashMap<&str, usize> = dependencies.keys().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = dependencies.keys().map(|id| (id.as_str(), Vec::new())).collect();

    for (id, deps) in dependencies {
        *in_degree.get_mut(id.as_str()).unwrap() += deps.len();
        for dep in deps {
            dependents.get_mut(dep.as_str()).unwrap().push(id.as_str());
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    ready.sort_unstable();

    let mut order = Vec::with_capacity(dependencies.len());
    let mut queue = std::collections::VecDeque::from(ready);
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        let mut newly_ready = Vec::new();
        for dependent in &dependents[id] {
            let degree = in_degree.get_mut(dependent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                newly_ready.push(*dependent);
            }
        }
        newly_ready.sort_unstable();
        queue.extend(newly_ready);
    }

    if order.len() != dependencies.len() {
        let remaining: Vec<&str> = dependencies
            .keys()
            .map(String::as_str)
            .filter(|id| !order.contains(&id.to_string()))
            .collect();
        return Err(EpicenterError::DependencyCycle {
            cycle: remaining.join(", "),
        });
    }
    Ok(order)
}

/// A running application: every registered [`Workspace`] plus the dependency order
/// they were started in (§2, §3 invariant 6, §8 property 7).
pub struct Epicenter {
    config: EpicenterConfig,
    workspaces: HashMap<String, Arc<Workspace>>,
    actions: HashMap<String, Arc<ActionSet>>,
    contexts: HashMap<String, ActionContext>,
    order: Vec<String>,
}

impl Epicenter {
    pub fn builder(config: EpicenterConfig) -> EpicenterBuilder {
        EpicenterBuilder::new(config)
    }

    pub fn config(&self) -> &EpicenterConfig {
        &self.config
    }

    pub fn workspace(&self, id: &str) -> Option<&Arc<Workspace>> {
        self.workspaces.get(id)
    }

    /// Every registered workspace id, in dependency order (dependencies first).
    pub fn workspace_ids(&self) -> &[String] {
        &self.order
    }

    /// Bring up every workspace in dependency order: a dependency's materializers
    /// finish their initial pull, and its providers start, before any dependent
    /// workspace begins its own startup (§8 property 7).
    pub async fn start(&self) -> Result<(), EpicenterError> {
        for id in &self.order {
            let workspace = &self.workspaces[id];
            workspace
                .start()
                .await
                .map_err(|source| EpicenterError::WorkspaceStartFailed {
                    workspace: id.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Release every workspace in reverse dependency order (§3 lifecycle).
    pub async fn shutdown(&self) {
        for id in self.order.iter().rev() {
            self.workspaces[id].shutdown().await;
        }
    }

    /// A typed client whose keys are workspace ids and whose values are that
    /// workspace's invocable actions (§2).
    pub fn client(&self) -> Client {
        let workspaces = self
            .order
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    WorkspaceClient {
                        actions: Arc::clone(&self.actions[id]),
                        context: self.contexts[id].clone(),
                    },
                )
            })
            .collect();
        Client { workspaces }
    }
}

/// One workspace's actions, bound to the context they were resolved with (§2, §4.11).
#[derive(Clone)]
pub struct WorkspaceClient {
    actions: Arc<ActionSet>,
    context: ActionContext,
}

impl WorkspaceClient {
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    /// Invoke a named action with a raw JSON input (the shape the CLI and HTTP
    /// surfaces both need, §4.11, §4.12).
    pub async fn invoke(
        &self,
        action: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, crate::action::ActionError> {
        let action = self.actions.get(action).ok_or_else(|| {
            crate::action::ActionError::new("unknown-action", format!("no action named '{action}'"))
        })?;
        action.invoke_json(input, self.context.clone()).await
    }
}

/// The typed client an Epicenter produces (§2): workspace id -> that workspace's actions.
pub struct Client {
    workspaces: HashMap<String, WorkspaceClient>,
}

impl Client {
    pub fn workspace(&self, id: &str) -> Option<&WorkspaceClient> {
        self.workspaces.get(id)
    }

    pub fn workspace_ids(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(id, d)| (id.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = deps(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_dependency_orders_each_parent_before_child() {
        let graph = deps(&[("a", &[]), ("b", &["a"]), ("c", &["a"]), ("d", &["b", "c"])]);
        let order = topological_order(&graph).unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn cycle_is_rejected() {
        let graph = deps(&[("a", &["b"]), ("b", &["a"])]);
        let err = topological_order(&graph).unwrap_err();
        assert_eq!(err.code(), "dependency-cycle");
    }
}
