//! Kotlin compiler command lines.
//!
//! One invocation compiles every file of a (target, build type) pair:
//! `kotlinc` for the JVM, `kotlinc-js` for JS and `kotlinc-native` for
//! native targets.

use std::path::{Path, PathBuf};

use crate::builder::module_builder::{BuildError, InstalledToolchains};
use crate::builder::sources::BuildType;
use crate::core::{HostOs, HostPlatform, KotlinTarget};
use crate::util::ProcessBuilder;

/// Inputs of one compilation.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub target: KotlinTarget,
    pub build_type: BuildType,
    pub release: bool,
    /// Output name without extension
    pub name: String,
    /// Every file to compile
    pub files: Vec<PathBuf>,
    /// The subset of `files` that is common code; empty for JVM
    pub common_files: Vec<PathBuf>,
    /// Dependency artifacts for the classpath / library path
    pub libraries: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

/// A ready-to-run compiler command and the artifact it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub artifact: PathBuf,
}

impl CompilerInvocation {
    pub fn to_process(&self, cwd: &Path) -> ProcessBuilder {
        self.env.iter().fold(
            ProcessBuilder::new(&self.program).args(&self.args).cwd(cwd),
            |pb, (k, v)| pb.env(k, v),
        )
    }
}

/// Artifact file name for a compilation.
pub fn artifact_file_name(target: KotlinTarget, build_type: BuildType, name: &str) -> String {
    match (target, build_type) {
        (KotlinTarget::Jvm, BuildType::Test) => format!("{}-test.jar", name),
        (KotlinTarget::Jvm, _) => format!("{}.jar", name),
        (_, BuildType::Lib) => format!("{}.klib", name),
        (t, _) if t.is_js() => format!("{}.js", name),
        (KotlinTarget::WindowsX64, _) => format!("{}.exe", name),
        _ => format!("{}.kexe", name),
    }
}

/// Library file extension each compiler accepts.
pub fn library_extension(target: KotlinTarget) -> &'static str {
    if target.is_jvm() {
        "jar"
    } else {
        "klib"
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn join_paths(paths: &[PathBuf], separator: &str) -> String {
    paths.iter().map(|p| display(p)).collect::<Vec<_>>().join(separator)
}

fn tool(home: &Path, name: &str, host: &HostPlatform) -> PathBuf {
    let suffix = if host.os == HostOs::Windows { ".bat" } else { "" };
    home.join("bin").join(format!("{}{}", name, suffix))
}

/// Build the compiler command for `request`.
pub fn compiler_invocation(
    request: &CompileRequest,
    toolchains: &InstalledToolchains,
    host: &HostPlatform,
) -> Result<CompilerInvocation, BuildError> {
    let separator = if host.os == HostOs::Windows { ";" } else { ":" };
    let artifact = request.output_dir.join(artifact_file_name(
        request.target,
        request.build_type,
        &request.name,
    ));
    let mut args: Vec<String> = Vec::new();

    let program = if request.target.is_jvm() {
        let home = toolchains
            .kotlin
            .as_deref()
            .ok_or(BuildError::MissingToolchain { toolchain: "kotlin" })?;

        args.extend(["-d".to_string(), display(&artifact)]);
        args.extend(["-module-name".to_string(), request.name.clone()]);
        if !request.libraries.is_empty() {
            args.extend(["-cp".to_string(), join_paths(&request.libraries, separator)]);
        }
        if request.build_type == BuildType::Bin {
            args.push("-include-runtime".to_string());
        }
        tool(home, "kotlinc", host)
    } else if request.target.is_js() {
        let home = toolchains
            .kotlin
            .as_deref()
            .ok_or(BuildError::MissingToolchain { toolchain: "kotlin" })?;

        if request.build_type == BuildType::Lib {
            args.push("-Xir-produce-klib-file".to_string());
        } else {
            args.push("-Xir-produce-js".to_string());
            let module_kind = if request.target == KotlinTarget::JsBrowser {
                "umd"
            } else {
                "commonjs"
            };
            args.extend(["-module-kind".to_string(), module_kind.to_string()]);
        }
        args.extend(["-ir-output-dir".to_string(), display(&request.output_dir)]);
        args.extend(["-ir-output-name".to_string(), request.name.clone()]);

        let mut libraries = vec![home.join("lib").join("kotlin-stdlib-js.klib")];
        libraries.extend(request.libraries.iter().cloned());
        args.extend(["-libraries".to_string(), join_paths(&libraries, separator)]);
        tool(home, "kotlinc-js", host)
    } else {
        let home = toolchains
            .kotlin_native
            .as_deref()
            .ok_or(BuildError::MissingToolchain {
                toolchain: "kotlin-native",
            })?;
        let konan_target = request
            .target
            .konan_target()
            .ok_or(BuildError::IncompatibleHost {
                target: request.target,
            })?;

        args.extend(["-target".to_string(), konan_target.to_string()]);
        args.extend([
            "-o".to_string(),
            display(&request.output_dir.join(&request.name)),
        ]);
        let produce = if request.build_type == BuildType::Lib {
            "library"
        } else {
            "program"
        };
        args.extend(["-p".to_string(), produce.to_string()]);
        if request.build_type == BuildType::Test {
            args.push("-tr".to_string());
        }
        args.push(if request.release { "-opt" } else { "-g" }.to_string());
        for library in &request.libraries {
            args.extend(["-l".to_string(), display(library)]);
        }
        tool(home, "kotlinc-native", host)
    };

    if !request.target.is_jvm() && !request.common_files.is_empty() {
        args.push("-Xmulti-platform".to_string());
        args.push(format!(
            "-Xcommon-sources={}",
            join_paths(&request.common_files, ",")
        ));
    }

    args.extend(request.files.iter().map(|f| display(f)));

    let env = toolchains
        .java_home
        .as_ref()
        .map(|home| vec![("JAVA_HOME".to_string(), display(home))])
        .unwrap_or_default();

    Ok(CompilerInvocation {
        program,
        args,
        env,
        artifact,
    })
}
