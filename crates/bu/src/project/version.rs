//! Version files per ecosystem.

use super::ProjectType;
use std::fs;
use std::io;
use std::path::Path;
use bu_core::is_path_component;
use tracing::{debug, warn};

const GRADLE_PROPERTIES: &str = "gradle/wrapper/gradle-wrapper.properties";
const MAVEN_PROPERTIES: &str = ".mvn/wrapper/maven-wrapper.properties";

/// Read the pinned version for `project` in `dir`.
///
/// `Ok(None)` means no usable pin; only I/O failures on existing files are
/// errors.
pub(super) fn read(project: ProjectType, dir: &Path) -> io::Result<Option<String>> {
    let version = match project {
        ProjectType::Buck2 => plain(&dir.join(".buckversion"))?,
        ProjectType::Bazel => plain(&dir.join(".bazelversion"))?,
        ProjectType::Npm | ProjectType::Pnpm | ProjectType::Yarn | ProjectType::Bun => node(dir)?,
        ProjectType::Uv | ProjectType::Poetry | ProjectType::Pip => python(dir)?,
        ProjectType::Gradle => {
            properties_url(&dir.join(GRADLE_PROPERTIES))?.and_then(|url| gradle_version(&url))
        }
        ProjectType::Maven => {
            properties_url(&dir.join(MAVEN_PROPERTIES))?.and_then(|url| maven_version(&url))
        }
        ProjectType::Dotnet => dotnet(dir)?,
        _ => None,
    };
    match version {
        Some(version) if !is_path_component(&version) => {
            warn!(%project, %version, "Ignoring version pin that is not a single path component");
            Ok(None)
        }
        Some(version) => {
            debug!(%project, %version, "Found pinned version");
            Ok(Some(version))
        }
        None => Ok(None),
    }
}

/// Contents of `path` if it exists.
fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn plain(path: &Path) -> io::Result<Option<String>> {
    Ok(read_optional(path)?.and_then(|content| non_empty(&content)))
}

fn node(dir: &Path) -> io::Result<Option<String>> {
    for file in [".nvmrc", ".node-version"] {
        if let Some(version) = plain(&dir.join(file))? {
            return Ok(Some(version.trim_start_matches('v').to_string()));
        }
    }
    Ok(None)
}

fn python(dir: &Path) -> io::Result<Option<String>> {
    if let Some(version) = plain(&dir.join(".python-version"))? {
        return Ok(Some(version));
    }
    let Some(content) = read_optional(&dir.join("pyproject.toml"))? else {
        return Ok(None);
    };
    Ok(requires_python(&content))
}

/// `project.requires-python` with comparison operators removed.
fn requires_python(pyproject: &str) -> Option<String> {
    let doc: toml::Table = toml::from_str(pyproject).ok()?;
    let requirement = doc.get("project")?.get("requires-python")?.as_str()?;
    let stripped: String = requirement
        .chars()
        .filter(|c| !matches!(c, '>' | '<' | '=' | '~'))
        .collect();
    non_empty(&stripped)
}

/// `distributionUrl` from a Java properties file, with `\:` unescaped.
fn properties_url(path: &Path) -> io::Result<Option<String>> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    Ok(content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "distributionUrl").then(|| value.trim().replace("\\:", ":"))
    }))
}

/// `…/gradle-8.5-bin.zip` → `8.5`
fn gradle_version(url: &str) -> Option<String> {
    let file = url.rsplit('/').next()?;
    let rest = file.strip_prefix("gradle-")?;
    let end = rest.find('-')?;
    non_empty(&rest[..end])
}

/// `…/apache-maven/3.9.6/apache-maven-3.9.6-bin.zip` → `3.9.6`
fn maven_version(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("apache-maven/")?;
    let end = rest.find('/')?;
    non_empty(&rest[..end])
}

fn dotnet(dir: &Path) -> io::Result<Option<String>> {
    let Some(content) = read_optional(&dir.join("global.json"))? else {
        return Ok(None);
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        debug!("global.json is not valid JSON");
        return Ok(None);
    };
    Ok(json
        .get("sdk")
        .and_then(|sdk| sdk.get("version"))
        .and_then(serde_json::Value::as_str)
        .and_then(non_empty))
}
