//! The resolved dependency tree.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::core::{DependencyConf, DependencyScope, KotlinTarget, ModuleConf};
use crate::resolver::errors::ResolveError;
use crate::resolver::version::compare_versions;

/// One resolved dependency and its resolved transitive dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDependencyNode {
    /// The dependency as declared
    pub dependency: DependencyConf,

    /// The version actually selected, when it differs from or refines the
    /// declared one (npm ranges, Maven redirects)
    pub resolved_version: Option<String>,

    /// Transitive dependencies, in declaration order
    pub children: Vec<ChildDependencyNode>,

    /// Files this dependency contributes to a build
    pub artifacts: Vec<PathBuf>,

    /// Set when this dependency could not be resolved
    pub error: Option<ResolveError>,
}

impl ChildDependencyNode {
    pub fn new(dependency: DependencyConf) -> Self {
        ChildDependencyNode {
            dependency,
            resolved_version: None,
            children: Vec::new(),
            artifacts: Vec::new(),
            error: None,
        }
    }

    pub fn key(&self) -> String {
        self.dependency.key()
    }

    /// The version used for conflict resolution.
    pub fn version(&self) -> Option<&str> {
        self.resolved_version
            .as_deref()
            .or_else(|| self.dependency.version())
    }

    pub fn scope(&self) -> DependencyScope {
        self.dependency.scope()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Display label: the dependency with its selected version.
    pub fn label(&self) -> String {
        match (&self.dependency, &self.resolved_version) {
            (DependencyConf::Npm { name, .. }, Some(version)) => format!("{}@{}", name, version),
            (dep, _) => dep.to_string(),
        }
    }
}

/// The root of a resolved dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDependencyNode {
    /// The module that was resolved
    pub module: ModuleConf,

    /// Targets the tree was resolved for
    pub targets: Vec<KotlinTarget>,

    /// Direct dependencies, in declaration order
    pub children: Vec<ChildDependencyNode>,
}

impl RootDependencyNode {
    /// Flatten the tree into one node per dependency key.
    ///
    /// Nodes are visited depth-first in declaration order. When a key is seen
    /// again with a strictly higher version, the new node takes the old
    /// one's position; equal versions keep the earlier node. When either
    /// version cannot be compared the first-seen node wins. Failed nodes
    /// are left out.
    pub fn filter_child_versions(&self) -> Vec<&ChildDependencyNode> {
        self.flatten(true)
    }

    /// [`filter_child_versions`](Self::filter_child_versions), optionally
    /// skipping test-scope subtrees before versions are compared.
    fn flatten(&self, include_test: bool) -> Vec<&ChildDependencyNode> {
        let mut selected: Vec<&ChildDependencyNode> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        let mut stack: Vec<&ChildDependencyNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if !include_test && node.scope() == DependencyScope::Test {
                continue;
            }
            stack.extend(node.children.iter().rev());
            if node.is_failed() {
                continue;
            }

            let key = node.key();
            match index.get(&key) {
                Some(&i) => {
                    let current = selected[i];
                    let newer = match (current.version(), node.version()) {
                        (Some(old), Some(new)) => {
                            compare_versions(new, old).is_some_and(|o| o.is_gt())
                        }
                        _ => false,
                    };
                    if newer {
                        tracing::debug!(
                            "{} supersedes {}",
                            node.label(),
                            current.label()
                        );
                        selected[i] = node;
                    }
                }
                None => {
                    index.insert(key, selected.len());
                    selected.push(node);
                }
            }
        }

        selected
    }

    /// Every failed node in the tree, in visit order.
    pub fn failures(&self) -> Vec<(&DependencyConf, &ResolveError)> {
        let mut failures = Vec::new();
        let mut stack: Vec<&ChildDependencyNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if let Some(error) = &node.error {
                failures.push((&node.dependency, error));
            }
            stack.extend(node.children.iter().rev());
        }
        failures
    }

    /// Artifact paths of the flattened dependency list.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.filter_child_versions()
            .into_iter()
            .flat_map(|node| node.artifacts.iter().cloned())
            .collect()
    }

    /// Artifact paths for a build, leaving out test dependencies unless
    /// `include_test` is set.
    ///
    /// Test subtrees are dropped before conflicts are settled, so a test
    /// dependency never displaces a regular one from a non-test build.
    pub fn artifacts_for(&self, include_test: bool) -> Vec<PathBuf> {
        self.flatten(include_test)
            .into_iter()
            .flat_map(|node| node.artifacts.iter().cloned())
            .collect()
    }

    /// Render the tree for display, `cargo tree` style.
    ///
    /// Repeated subtrees are printed once and then marked `(*)`.
    pub fn render_tree(&self) -> String {
        let winners: HashMap<String, String> = self
            .filter_child_versions()
            .into_iter()
            .filter_map(|n| n.version().map(|v| (n.key(), v.to_string())))
            .collect();

        let mut out = format!("{} v{}\n", self.module.name, self.module.version);
        let mut printed = HashSet::new();
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            render_node(child, "", i + 1 == count, &winners, &mut printed, &mut out);
        }
        out
    }
}

fn render_node(
    node: &ChildDependencyNode,
    prefix: &str,
    last: bool,
    winners: &HashMap<String, String>,
    printed: &mut HashSet<(String, Option<String>)>,
    out: &mut String,
) {
    let branch = if last { "└── " } else { "├── " };
    let _ = write!(out, "{}{}{}", prefix, branch, node.label());

    if let Some(error) = &node.error {
        let _ = writeln!(out, " (failed: {})", error);
        return;
    }

    if let (Some(version), Some(winner)) = (node.version(), winners.get(&node.key())) {
        if version != winner {
            let _ = write!(out, " (superseded by {})", winner);
        }
    }

    let identity = (node.key(), node.version().map(str::to_string));
    if !node.children.is_empty() && !printed.insert(identity) {
        let _ = writeln!(out, " (*)");
        return;
    }
    out.push('\n');

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_node(child, &child_prefix, i + 1 == count, winners, printed, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MavenCoordinate;

    fn maven(coordinate: &str) -> ChildDependencyNode {
        ChildDependencyNode::new(DependencyConf::maven(
            &MavenCoordinate::parse(coordinate).unwrap(),
            DependencyScope::Implementation,
        ))
    }

    fn with_children(mut node: ChildDependencyNode, children: Vec<ChildDependencyNode>) -> ChildDependencyNode {
        node.children = children;
        node
    }

    fn root(children: Vec<ChildDependencyNode>) -> RootDependencyNode {
        RootDependencyNode {
            module: ModuleConf::new("app", "1.0.0"),
            targets: vec![KotlinTarget::Jvm],
            children,
        }
    }

    fn flat(root: &RootDependencyNode) -> Vec<String> {
        root.filter_child_versions()
            .iter()
            .map(|n| n.dependency.to_string())
            .collect()
    }

    #[test]
    fn test_higher_version_wins_in_place() {
        let tree = root(vec![
            with_children(maven("a:a:1.0.0"), vec![maven("lib:lib:1.0.0")]),
            maven("b:b:1.0.0"),
            with_children(maven("c:c:1.0.0"), vec![maven("lib:lib:1.2.0")]),
        ]);

        assert_eq!(
            flat(&tree),
            vec!["a:a:1.0.0", "lib:lib:1.2.0", "b:b:1.0.0", "c:c:1.0.0"]
        );
    }

    #[test]
    fn test_lower_and_equal_versions_keep_first() {
        let first = maven("lib:lib:2.0.0");
        let mut tie = maven("lib:lib:2.0");
        tie.artifacts.push(PathBuf::from("/tie.jar"));
        let tree = root(vec![first, maven("lib:lib:1.9.9"), tie]);

        let selected = tree.filter_child_versions();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].version(), Some("2.0.0"));
        assert!(selected[0].artifacts.is_empty());
    }

    #[test]
    fn test_incomparable_versions_keep_first() {
        let tree = root(vec![maven("lib:lib:main-SNAPSHOT"), maven("lib:lib:1.0.0")]);
        assert_eq!(flat(&tree), vec!["lib:lib:main-SNAPSHOT"]);
    }

    #[test]
    fn test_failed_nodes_are_reported_not_flattened() {
        let mut broken = maven("x:x:1.0.0");
        broken.error = Some(ResolveError::NotFound {
            dependency: "x:x:1.0.0".into(),
        });
        let tree = root(vec![maven("a:a:1.0.0"), broken]);

        assert_eq!(flat(&tree), vec!["a:a:1.0.0"]);
        let failures = tree.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.key(), "maven:x:x");
    }

    #[test]
    fn test_test_artifacts_only_for_test_builds() {
        let mut main = maven("a:a:1.0.0");
        main.artifacts.push(PathBuf::from("/a.jar"));
        let mut test = ChildDependencyNode::new(
            maven("t:t:1.0.0").dependency.with_scope(DependencyScope::Test),
        );
        test.artifacts.push(PathBuf::from("/t.jar"));
        let tree = root(vec![main, test]);

        assert_eq!(tree.artifacts_for(false), vec![PathBuf::from("/a.jar")]);
        assert_eq!(tree.artifacts_for(true).len(), 2);
        assert_eq!(tree.artifacts(), tree.artifacts_for(true));
    }

    #[test]
    fn test_test_dependency_does_not_displace_regular_one() {
        let mut hamcrest = maven("org.hamcrest:hamcrest:1.3");
        hamcrest.artifacts.push(PathBuf::from("/hamcrest-1.3.jar"));
        let mut newer = ChildDependencyNode::new(
            maven("org.hamcrest:hamcrest:2.2").dependency.with_scope(DependencyScope::Test),
        );
        newer.artifacts.push(PathBuf::from("/hamcrest-2.2.jar"));
        let mut junit = with_children(
            ChildDependencyNode::new(
                maven("junit:junit:4.13.2").dependency.with_scope(DependencyScope::Test),
            ),
            vec![newer],
        );
        junit.artifacts.push(PathBuf::from("/junit-4.13.2.jar"));
        let tree = root(vec![hamcrest, junit]);

        assert_eq!(
            tree.artifacts_for(false),
            vec![PathBuf::from("/hamcrest-1.3.jar")]
        );
        assert_eq!(
            tree.artifacts_for(true),
            vec![
                PathBuf::from("/hamcrest-2.2.jar"),
                PathBuf::from("/junit-4.13.2.jar"),
            ]
        );
    }

    #[test]
    fn test_render_tree() {
        let mut broken = maven("x:x:1.0.0");
        broken.error = Some(ResolveError::NotFound {
            dependency: "x:x:1.0.0".into(),
        });
        let tree = root(vec![
            with_children(
                maven("a:a:1.0.0"),
                vec![with_children(maven("lib:lib:1.0.0"), vec![maven("z:z:1.0.0")])],
            ),
            with_children(
                maven("c:c:1.0.0"),
                vec![
                    maven("lib:lib:1.2.0"),
                    with_children(maven("lib:lib:1.0.0"), vec![maven("z:z:1.0.0")]),
                ],
            ),
            broken,
        ]);

        let expected = "\
app v1.0.0
├── a:a:1.0.0
│   └── lib:lib:1.0.0 (superseded by 1.2.0)
│       └── z:z:1.0.0
├── c:c:1.0.0
│   ├── lib:lib:1.2.0
│   └── lib:lib:1.0.0 (superseded by 1.2.0) (*)
└── x:x:1.0.0 (failed: `x:x:1.0.0` was not found in any repository)
";
        assert_eq!(tree.render_tree(), expected);
    }
}
