//! Kotlin source collection.
//!
//! Sources live under `<module>/src/<alias>/kotlin`, one directory per
//! source-set alias (`common`, `jvm`, `linuxX64`, ...). Test builds also
//! read the `<alias>Test` variant of every alias.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::KotlinTarget;

/// Universal source-set alias.
pub const COMMON_ALIAS: &str = "common";

const SOURCE_EXTENSION: &str = "kt";

/// What a compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildType {
    Bin,
    Lib,
    Test,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Bin => "bin",
            BuildType::Lib => "lib",
            BuildType::Test => "test",
        }
    }

    /// Root entry file detected for this build type.
    fn entry_file_name(&self) -> Option<&'static str> {
        match self {
            BuildType::Bin => Some("main.kt"),
            BuildType::Lib => Some("lib.kt"),
            BuildType::Test => None,
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files gathered for one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedSource {
    /// Shared sources, without any entry file
    pub source_files: Vec<PathBuf>,

    /// `main.kt` for binaries, `lib.kt` for libraries
    pub main_file: Option<PathBuf>,

    /// Extra binary entry points under `bin/`
    pub bin_files: Vec<PathBuf>,
}

impl CollectedSource {
    /// Concatenate with `other`. Nothing is deduplicated; the first main
    /// file wins.
    pub fn merge(mut self, other: CollectedSource) -> CollectedSource {
        self.source_files.extend(other.source_files);
        self.main_file = self.main_file.or(other.main_file);
        self.bin_files.extend(other.bin_files);
        self
    }

    /// Whether there is nothing to compile.
    pub fn is_empty(&self) -> bool {
        self.source_files.is_empty() && self.main_file.is_none()
    }

    /// Sources plus the main file, in compile order.
    pub fn compile_files(&self) -> Vec<PathBuf> {
        self.source_files
            .iter()
            .chain(self.main_file.iter())
            .cloned()
            .collect()
    }
}

/// Collects a module's Kotlin sources.
#[derive(Debug, Clone)]
pub struct SourceCollector {
    source_root: PathBuf,
    autobin: bool,
}

impl SourceCollector {
    pub fn new(module_dir: &Path, autobin: bool) -> Self {
        SourceCollector {
            source_root: module_dir.join("src"),
            autobin,
        }
    }

    /// Source-set aliases read for `target`.
    ///
    /// Without a target only `common` applies. JVM compiles common code
    /// itself, so it reads `common` plus its own aliases; every other
    /// target reads only its own aliases and gets common code through
    /// [`SourceCollector::collect_for_build`].
    pub fn aliases(target: Option<KotlinTarget>, build_type: BuildType) -> Vec<String> {
        let mut aliases: Vec<String> = match target {
            None => vec![COMMON_ALIAS.to_string()],
            Some(target) if target.is_jvm() => std::iter::once(COMMON_ALIAS)
                .chain(target.source_set_aliases().iter().copied())
                .map(str::to_string)
                .collect(),
            Some(target) => target
                .source_set_aliases()
                .iter()
                .map(|a| a.to_string())
                .collect(),
        };

        if build_type == BuildType::Test {
            let tests: Vec<String> = aliases.iter().map(|a| format!("{}Test", a)).collect();
            aliases.extend(tests);
        }
        aliases
    }

    /// Collect sources for `target` (or common code only).
    pub fn collect_kotlin(
        &self,
        target: Option<KotlinTarget>,
        build_type: BuildType,
    ) -> CollectedSource {
        let mut collected = CollectedSource::default();
        for alias in Self::aliases(target, build_type) {
            let dir = self.source_root.join(&alias).join("kotlin");
            if dir.is_dir() {
                collected = collected.merge(self.collect_dir(&dir, build_type));
            }
        }

        tracing::debug!(
            "Collected {} source file(s) for {} {}",
            collected.source_files.len(),
            target.map(|t| t.as_str()).unwrap_or(COMMON_ALIAS),
            build_type
        );
        collected
    }

    /// Everything one compilation for `target` needs: common code merged
    /// with the target's own sources.
    pub fn collect_for_build(&self, target: KotlinTarget, build_type: BuildType) -> CollectedSource {
        if target.is_jvm() {
            self.collect_kotlin(Some(target), build_type)
        } else {
            self.collect_kotlin(None, build_type)
                .merge(self.collect_kotlin(Some(target), build_type))
        }
    }

    fn collect_dir(&self, dir: &Path, build_type: BuildType) -> CollectedSource {
        let mut collected = CollectedSource::default();
        let bin_dir = dir.join("bin");

        let files = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == SOURCE_EXTENSION));

        for entry in files {
            let path = entry.into_path();
            let at_root = path.parent() == Some(dir);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

            if path.starts_with(&bin_dir) {
                if build_type == BuildType::Bin && self.autobin {
                    collected.bin_files.push(path);
                }
            } else if at_root && name == "main.kt" {
                if build_type == BuildType::Bin {
                    collected.main_file = Some(path);
                }
            } else if at_root && name == "lib.kt" {
                match build_type.entry_file_name() {
                    Some("lib.kt") => collected.main_file = Some(path),
                    // Test builds compile the library they test
                    None => collected.source_files.push(path),
                    _ => {}
                }
            } else {
                collected.source_files.push(path);
            }
        }
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ModuleFixture;
    use tempfile::TempDir;

    fn collector(fixture: &ModuleFixture) -> (TempDir, SourceCollector) {
        let tmp = TempDir::new().unwrap();
        let root = fixture.write_to(tmp.path()).unwrap();
        (tmp, SourceCollector::new(&root, true))
    }

    #[test]
    fn test_aliases() {
        assert_eq!(SourceCollector::aliases(None, BuildType::Bin), vec!["common"]);
        assert_eq!(
            SourceCollector::aliases(Some(KotlinTarget::Jvm), BuildType::Test),
            vec!["common", "jvm", "commonTest", "jvmTest"]
        );
        let linux = SourceCollector::aliases(Some(KotlinTarget::LinuxX64), BuildType::Lib);
        assert!(!linux.contains(&"common".to_string()));
        assert!(linux.contains(&"linuxX64".to_string()));
    }

    #[test]
    fn test_basic_module() {
        let (_tmp, collector) = collector(&ModuleFixture::basic());

        let bin = collector.collect_kotlin(None, BuildType::Bin);
        assert!(bin.source_files.is_empty());
        assert!(bin
            .main_file
            .as_ref()
            .is_some_and(|p| p.ends_with("src/common/kotlin/main.kt")));

        let lib = collector.collect_kotlin(None, BuildType::Lib);
        assert!(lib.is_empty());
        assert!(lib.bin_files.is_empty());
    }

    #[test]
    fn test_multiple_bins_for_every_target() {
        let (_tmp, collector) = collector(&ModuleFixture::multiple_bins());

        for target in KotlinTarget::ALL {
            let collected = collector.collect_for_build(target, BuildType::Bin);
            assert_eq!(collected.source_files.len(), 1, "{}", target);
            assert!(collected.source_files[0].ends_with("shared.kt"));
            assert_eq!(collected.bin_files.len(), 1, "{}", target);
            assert!(collected.bin_files[0].ends_with("bin/other.kt"));
            assert!(collected.main_file.is_some());
        }
    }

    #[test]
    fn test_autobin_off() {
        let tmp = TempDir::new().unwrap();
        let root = ModuleFixture::multiple_bins().write_to(tmp.path()).unwrap();
        let collected = SourceCollector::new(&root, false).collect_kotlin(None, BuildType::Bin);

        assert!(collected.bin_files.is_empty());
        // bin/ entry points never join the shared sources
        assert_eq!(collected.source_files.len(), 1);
    }

    #[test]
    fn test_target_and_test_sources() {
        let fixture = ModuleFixture::new("mixed")
            .with_file("src/common/kotlin/lib.kt", "fun answer() = 42\n")
            .with_file("src/jvm/kotlin/Platform.kt", "actual fun platform() = \"jvm\"\n")
            .with_file("src/linux/kotlin/Platform.kt", "actual fun platform() = \"linux\"\n")
            .with_file("src/commonTest/kotlin/AnswerTest.kt", "class AnswerTest\n")
            .with_file("src/common/kotlin/README.md", "not kotlin\n");
        let (_tmp, collector) = collector(&fixture);

        let jvm = collector.collect_for_build(KotlinTarget::Jvm, BuildType::Lib);
        assert_eq!(jvm.source_files.len(), 1);
        assert!(jvm.source_files[0].ends_with("jvm/kotlin/Platform.kt"));
        assert!(jvm.main_file.as_ref().is_some_and(|p| p.ends_with("lib.kt")));

        let linux = collector.collect_for_build(KotlinTarget::LinuxArm64, BuildType::Lib);
        assert!(linux.source_files[0].ends_with("linux/kotlin/Platform.kt"));

        let test = collector.collect_for_build(KotlinTarget::Jvm, BuildType::Test);
        assert_eq!(test.main_file, None);
        assert_eq!(test.source_files.len(), 3);
        assert!(test.source_files.iter().any(|p| p.ends_with("AnswerTest.kt")));
    }

    #[test]
    fn test_merge_concatenates() {
        let a = CollectedSource {
            source_files: vec![PathBuf::from("a.kt")],
            main_file: Some(PathBuf::from("main.kt")),
            bin_files: Vec::new(),
        };
        let b = CollectedSource {
            source_files: vec![PathBuf::from("a.kt")],
            main_file: Some(PathBuf::from("other/main.kt")),
            bin_files: vec![PathBuf::from("bin/x.kt")],
        };
        let merged = a.merge(b);
        assert_eq!(merged.source_files.len(), 2);
        assert_eq!(merged.main_file, Some(PathBuf::from("main.kt")));
        assert_eq!(merged.compile_files().len(), 3);
    }
}
