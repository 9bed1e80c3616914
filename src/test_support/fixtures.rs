//! Sample module layouts used across tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::MockFetcher;

/// A module directory to write into a temp dir.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    /// Directory name of the module
    pub name: String,
    /// pack.toml contents
    pub manifest: String,
    /// Files relative to the module root -> contents
    pub files: BTreeMap<PathBuf, String>,
}

impl ModuleFixture {
    /// A module with only a manifest.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = format!("[module]\nname = \"{}\"\nversion = \"1.0.0\"\n", name);
        ModuleFixture {
            name,
            manifest,
            files: BTreeMap::new(),
        }
    }

    /// `1-basic`: a single `main.kt` entry point.
    pub fn basic() -> Self {
        Self::new("basic").with_file(
            "src/common/kotlin/main.kt",
            "fun main() {\n    println(\"Hello, World!\")\n}\n",
        )
    }

    /// `3-multiple-bins`: two binary entry points sharing one file.
    pub fn multiple_bins() -> Self {
        Self::new("multiple_bins")
            .with_file(
                "src/common/kotlin/main.kt",
                "fun main() {\n    println(greeting())\n}\n",
            )
            .with_file(
                "src/common/kotlin/shared.kt",
                "fun greeting() = \"Hello from shared\"\n",
            )
            .with_file(
                "src/common/kotlin/bin/other.kt",
                "fun main() {\n    println(\"other: \" + greeting())\n}\n",
            )
    }

    /// `6-dependencies`: Maven dependencies spread over target aliases.
    ///
    /// Pair with [`sample_dependency_fetcher`].
    pub fn dependencies() -> Self {
        Self::new("dependencies")
            .with_manifest(
                r#"[module]
name = "dependencies"
version = "1.0.0"
targets = ["jvm", "js_node", "linux_x64"]

[dependencies.common]
coroutines = "org.jetbrains.kotlinx:kotlinx-coroutines-core:1.6.4"
datetime = "org.jetbrains.kotlinx:kotlinx-datetime:0.4.0"
serialization = "org.jetbrains.kotlinx:kotlinx-serialization-json:1.5.0"

[dependencies.jvm]
okio = "com.squareup.okio:okio:3.2.0"

[dependencies.js]
left-pad = { npm = "^1.3.0" }
"#,
            )
            .with_file("src/common/kotlin/main.kt", "fun main() {}\n")
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write the module under `base` and return its root.
    pub fn write_to(&self, base: &Path) -> std::io::Result<PathBuf> {
        let root = base.join(&self.name);
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join(crate::core::MANIFEST_NAME), &self.manifest)?;

        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(root)
    }
}

/// JVM metadata for the libraries declared by [`ModuleFixture::dependencies`].
///
/// Several paths reach `kotlin-stdlib` and friends at different versions.
pub fn sample_dependency_fetcher() -> MockFetcher {
    MockFetcher::new()
        .maven(
            "org.jetbrains.kotlinx:kotlinx-coroutines-core:1.6.4",
            &["org.jetbrains.kotlinx:kotlinx-coroutines-core-jvm:1.6.4"],
        )
        .maven(
            "org.jetbrains.kotlinx:kotlinx-coroutines-core-jvm:1.6.4",
            &[
                "org.jetbrains.kotlin:kotlin-stdlib-jdk8:1.6.21",
                "org.jetbrains.kotlin:kotlin-stdlib-common:1.6.21",
            ],
        )
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib-jdk8:1.6.21",
            &["org.jetbrains.kotlin:kotlin-stdlib:1.6.21"],
        )
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib:1.6.21",
            &["org.jetbrains:annotations:13.0"],
        )
        .maven("org.jetbrains.kotlin:kotlin-stdlib-common:1.6.21", &[])
        .maven("org.jetbrains:annotations:13.0", &[])
        .maven(
            "org.jetbrains.kotlinx:kotlinx-datetime:0.4.0",
            &["org.jetbrains.kotlinx:kotlinx-datetime-jvm:0.4.0"],
        )
        .maven(
            "org.jetbrains.kotlinx:kotlinx-datetime-jvm:0.4.0",
            &[
                "org.jetbrains.kotlin:kotlin-stdlib:1.7.0",
                "org.jetbrains.kotlinx:kotlinx-serialization-core:1.4.1",
            ],
        )
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib:1.7.0",
            &["org.jetbrains:annotations:13.0"],
        )
        .maven(
            "org.jetbrains.kotlinx:kotlinx-serialization-core:1.4.1",
            &["org.jetbrains.kotlin:kotlin-stdlib-common:1.7.0"],
        )
        .maven("org.jetbrains.kotlin:kotlin-stdlib-common:1.7.0", &[])
        .maven(
            "org.jetbrains.kotlinx:kotlinx-serialization-json:1.5.0",
            &[
                "org.jetbrains.kotlinx:kotlinx-serialization-core:1.5.0",
                "org.jetbrains.kotlin:kotlin-stdlib:1.8.10",
            ],
        )
        .maven("org.jetbrains.kotlinx:kotlinx-serialization-core:1.5.0", &[])
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib:1.8.10",
            &["org.jetbrains:annotations:13.0"],
        )
        .maven(
            "com.squareup.okio:okio:3.2.0",
            &["com.squareup.okio:okio-jvm:3.2.0"],
        )
        .maven(
            "com.squareup.okio:okio-jvm:3.2.0",
            &["org.jetbrains.kotlin:kotlin-stdlib-jdk8:1.6.20"],
        )
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib-jdk8:1.6.20",
            &["org.jetbrains.kotlin:kotlin-stdlib:1.6.20"],
        )
        .maven(
            "org.jetbrains.kotlin:kotlin-stdlib:1.6.20",
            &["org.jetbrains:annotations:13.0"],
        )
        .npm("left-pad", "^1.3.0", "1.3.0")
}
