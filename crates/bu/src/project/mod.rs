//! Project type detection from marker files.

mod version;

use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Build ecosystems bu knows how to dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectType {
    /// Buck2
    Buck2,
    /// Bazel
    Bazel,
    /// Rust with Cargo
    Cargo,
    /// Go modules
    Go,
    /// Zig build
    Zig,
    /// Maven
    Maven,
    /// Gradle
    Gradle,
    /// npm
    Npm,
    /// pnpm
    Pnpm,
    /// Yarn
    Yarn,
    /// Bun
    Bun,
    /// Deno
    Deno,
    /// uv
    Uv,
    /// Poetry
    Poetry,
    /// pip
    Pip,
    /// .NET SDK
    Dotnet,
    /// Swift Package Manager
    Swift,
    /// Bundler
    Bundler,
    /// Mix
    Mix,
    /// Composer
    Composer,
    /// Make
    Make,
    /// Just
    Just,
    /// CMake
    CMake,
}

/// Detection order; the first type with a marker present wins.
const DETECTION_ORDER: [(ProjectType, &[&str]); 22] = [
    (ProjectType::Buck2, &[".buckconfig", "BUCK"]),
    (
        ProjectType::Bazel,
        &["WORKSPACE", "WORKSPACE.bazel", "MODULE.bazel"],
    ),
    (ProjectType::Cargo, &["Cargo.toml"]),
    (ProjectType::Go, &["go.mod"]),
    (ProjectType::Zig, &["build.zig"]),
    (ProjectType::Maven, &["pom.xml"]),
    (ProjectType::Gradle, &["build.gradle", "build.gradle.kts"]),
    (ProjectType::Bun, &["bun.lockb"]),
    (ProjectType::Pnpm, &["pnpm-lock.yaml"]),
    (ProjectType::Yarn, &["yarn.lock"]),
    (ProjectType::Deno, &["deno.json", "deno.jsonc"]),
    (ProjectType::Uv, &["uv.lock"]),
    (ProjectType::Poetry, &["poetry.lock"]),
    (ProjectType::Pip, &["requirements.txt"]),
    (ProjectType::Uv, &["pyproject.toml"]),
    // .NET is matched by extension between these two groups
    (ProjectType::Swift, &["Package.swift"]),
    (ProjectType::Bundler, &["Gemfile"]),
    (ProjectType::Mix, &["mix.exs"]),
    (ProjectType::Composer, &["composer.json"]),
    (ProjectType::Npm, &["package.json"]),
    (ProjectType::Just, &["justfile", ".justfile"]),
    (ProjectType::CMake, &["CMakeLists.txt"]),
];

/// Index in [`DETECTION_ORDER`] before which .NET solutions are checked.
const DOTNET_SLOT: usize = 15;

const DOTNET_EXTENSIONS: [&str; 4] = ["sln", "csproj", "fsproj", "vbproj"];

const MAKE_MARKERS: [&str; 2] = ["Makefile", "makefile"];

impl ProjectType {
    /// Every supported type, in detection order.
    pub const ALL: [Self; 23] = [
        Self::Buck2,
        Self::Bazel,
        Self::Cargo,
        Self::Go,
        Self::Zig,
        Self::Maven,
        Self::Gradle,
        Self::Bun,
        Self::Pnpm,
        Self::Yarn,
        Self::Deno,
        Self::Uv,
        Self::Poetry,
        Self::Pip,
        Self::Dotnet,
        Self::Swift,
        Self::Bundler,
        Self::Mix,
        Self::Composer,
        Self::Npm,
        Self::Just,
        Self::CMake,
        Self::Make,
    ];

    /// Executable dispatched to for this project type.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Buck2 => "buck2",
            Self::Bazel => "bazel",
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::Zig => "zig",
            Self::Maven => "mvn",
            Self::Gradle => "gradle",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
            Self::Deno => "deno",
            Self::Uv => "uv",
            Self::Poetry => "poetry",
            Self::Pip => "pip",
            Self::Dotnet => "dotnet",
            Self::Swift => "swift",
            Self::Bundler => "bundle",
            Self::Mix => "mix",
            Self::Composer => "composer",
            Self::Make => "make",
            Self::Just => "just",
            Self::CMake => "cmake",
        }
    }

    /// Human-readable ecosystem name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Buck2 => "Buck2",
            Self::Bazel => "Bazel",
            Self::Cargo => "Cargo",
            Self::Go => "Go",
            Self::Zig => "Zig",
            Self::Maven => "Maven",
            Self::Gradle => "Gradle",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "Yarn",
            Self::Bun => "Bun",
            Self::Deno => "Deno",
            Self::Uv => "uv",
            Self::Poetry => "Poetry",
            Self::Pip => "pip",
            Self::Dotnet => ".NET",
            Self::Swift => "Swift",
            Self::Bundler => "Bundler",
            Self::Mix => "Mix",
            Self::Composer => "Composer",
            Self::Make => "Make",
            Self::Just => "Just",
            Self::CMake => "CMake",
        }
    }

    /// Version pinned by the project's version file, if any.
    ///
    /// Unreadable or malformed files are logged and treated as absent.
    #[must_use]
    pub fn version(self, dir: &Path) -> Option<String> {
        match version::read(self, dir) {
            Ok(found) => found,
            Err(e) => {
                warn!(project = %self, error = %e, "Failed to read version file");
                None
            }
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Detect the project type of `dir`.
#[must_use]
pub fn detect(dir: &Path) -> Option<ProjectType> {
    let has = |name: &str| dir.join(name).exists();

    for (index, (project, markers)) in DETECTION_ORDER.iter().enumerate() {
        if index == DOTNET_SLOT && has_dotnet_project(dir) {
            return found(ProjectType::Dotnet);
        }
        if markers.iter().any(|marker| has(marker)) {
            return found(*project);
        }
    }
    if MAKE_MARKERS.iter().any(|marker| has(marker)) {
        return found(ProjectType::Make);
    }
    None
}

fn found(project: ProjectType) -> Option<ProjectType> {
    debug!(%project, "Detected project type");
    Some(project)
}

fn has_dotnet_project(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DOTNET_EXTENSIONS.contains(&ext))
    })
}

/// Comma-separated list of supported ecosystems for help output.
#[must_use]
pub fn supported_summary() -> String {
    let mut names: Vec<&str> = Vec::new();
    for project in ProjectType::ALL {
        let name = project.display_name();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(", ")
}
