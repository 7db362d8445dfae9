//! Editor version parsing and package compatibility checks.
//!
//! Editor versions look like `2022.3.10f1`: year, minor, patch, release
//! kind letter, release number. Packages declare a minimum with `unity`
//! (`2020.3`) and optionally `unityRelease` (`0f1`).

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;

use super::error::{codes, PkgError};
use super::packument::PackumentVersion;
use crate::paths::project_version_path;

/// Release stream letter of an editor build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseKind {
    Experimental,
    Alpha,
    Beta,
    /// `f` and `c` (regional) builds.
    Final,
    Patch,
}

impl ReleaseKind {
    fn from_letter(c: char) -> Option<Self> {
        match c {
            'x' => Some(Self::Experimental),
            'a' => Some(Self::Alpha),
            'b' => Some(Self::Beta),
            'f' | 'c' => Some(Self::Final),
            'p' => Some(Self::Patch),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Self::Experimental => 'x',
            Self::Alpha => 'a',
            Self::Beta => 'b',
            Self::Final => 'f',
            Self::Patch => 'p',
        }
    }
}

/// A parsed editor version. A missing release sorts before any release of
/// the same patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub release: Option<(ReleaseKind, u32)>,
}

impl EditorVersion {
    /// Parse `2022.3`, `2022.3.10`, or `2022.3.10f1`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().splitn(3, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let Some(rest) = parts.next() else {
            return Some(Self {
                major,
                minor,
                patch: 0,
                release: None,
            });
        };
        let (patch, release) = parse_patch_and_release(rest)?;
        Some(Self {
            major,
            minor,
            patch,
            release,
        })
    }

    /// Minimum editor a package version requires, if it declares one.
    ///
    /// Returns `Err` with the raw value when the declaration is malformed.
    pub fn required_by(data: &PackumentVersion) -> Result<Option<Self>, String> {
        let Some(unity) = data.unity.as_deref() else {
            return Ok(None);
        };
        let raw = match data.unity_release.as_deref() {
            Some(release) => format!("{unity}.{release}"),
            None => unity.to_string(),
        };
        Self::parse(&raw).map(Some).ok_or(raw)
    }
}

fn parse_patch_and_release(input: &str) -> Option<(u32, Option<(ReleaseKind, u32)>)> {
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (patch, rest) = input.split_at(split);
    let patch = patch.parse().ok()?;
    if rest.is_empty() {
        return Some((patch, None));
    }
    let mut chars = rest.chars();
    let kind = ReleaseKind::from_letter(chars.next()?)?;
    let number = chars.as_str().parse().ok()?;
    Some((patch, Some((kind, number))))
}

impl Ord for EditorVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.release).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.release,
        ))
    }
}

impl PartialOrd for EditorVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EditorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some((kind, number)) = self.release {
            write!(f, "{}{number}", kind.letter())?;
        }
        Ok(())
    }
}

/// Read the editor version a project was last opened with.
///
/// Returns `Ok(None)` when `ProjectVersion.txt` is missing or has no
/// parseable `m_EditorVersion` line.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn read_project_editor_version(project_root: &Path) -> Result<Option<EditorVersion>, PkgError> {
    let path = project_version_path(project_root);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PkgError::config_invalid(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };

    let version = content
        .lines()
        .find_map(|line| line.trim().strip_prefix("m_EditorVersion:"))
        .and_then(EditorVersion::parse);
    if version.is_none() {
        tracing::warn!(path = %path.display(), "no editor version found");
    }
    Ok(version)
}

/// Fail when `data` requires a newer editor than `editor`.
///
/// # Errors
/// `PKG_EDITOR_INCOMPATIBLE` for a too-new or malformed requirement.
pub fn check_editor_compatibility(
    name: &str,
    version: &str,
    data: &PackumentVersion,
    editor: &EditorVersion,
) -> Result<(), PkgError> {
    match EditorVersion::required_by(data) {
        Ok(None) => Ok(()),
        Ok(Some(required)) if required <= *editor => Ok(()),
        Ok(Some(required)) => Err(PkgError::new(
            codes::PKG_EDITOR_INCOMPATIBLE,
            format!("{name}@{version} requires editor {required} or newer, project uses {editor}"),
        )),
        Err(raw) => Err(PkgError::new(
            codes::PKG_EDITOR_INCOMPATIBLE,
            format!("{name}@{version} declares an invalid editor version '{raw}'"),
        )),
    }
}
