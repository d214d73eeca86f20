//! File classification by naming convention
//!
//! Uploaded exports are recognised only by name: a category keyword
//! (`POSTULANTE`, `INSTRUMENTO`, `FA`) plus a track code (`ASC`, `NOM`, `ACC`).
//! Names matching no rule are dropped without complaint; the missing role is
//! what gates report generation later.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::reports::ReportKind;

/// Semantic role an uploaded file can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Asc,
    Nom,
    Acc,
    AscInst,
    NomInst,
    AccInst,
    AscFa,
    AccFa,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Asc,
        Role::Nom,
        Role::Acc,
        Role::AscInst,
        Role::NomInst,
        Role::AccInst,
        Role::AscFa,
        Role::AccFa,
    ];

    /// Short key used in listings
    pub fn key(&self) -> &'static str {
        match self {
            Role::Asc => "asc",
            Role::Nom => "nom",
            Role::Acc => "acc",
            Role::AscInst => "asc_inst",
            Role::NomInst => "nom_inst",
            Role::AccInst => "acc_inst",
            Role::AscFa => "asc_fa",
            Role::AccFa => "acc_fa",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// An uploaded spreadsheet: its original name and raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        SourceFile {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(SourceFile::new(name, bytes))
    }
}

/// Role for a file name, or `None` when no rule applies
pub fn classify_name(name: &str) -> Option<Role> {
    let key = name.to_uppercase().replace(' ', "");
    let track = |asc: Role, nom: Role, acc: Role| {
        if key.contains("ASC") {
            Some(asc)
        } else if key.contains("NOM") {
            Some(nom)
        } else if key.contains("ACC") {
            Some(acc)
        } else {
            None
        }
    };

    if key.contains("POSTULANTE") {
        track(Role::Asc, Role::Nom, Role::Acc)
    } else if key.contains("INSTRUMENTO") {
        track(Role::AscInst, Role::NomInst, Role::AccInst)
    } else if key.contains("FA") {
        // NOM has no auxiliary-form role, so it is not even checked
        if key.contains("ASC") {
            Some(Role::AscFa)
        } else if key.contains("ACC") {
            Some(Role::AccFa)
        } else {
            None
        }
    } else {
        None
    }
}

/// Files assigned to roles, at most one per role
#[derive(Debug, Clone, Default)]
pub struct ClassifiedFiles {
    files: BTreeMap<Role, SourceFile>,
}

impl ClassifiedFiles {
    pub fn get(&self, role: Role) -> Option<&SourceFile> {
        self.files.get(&role)
    }

    pub fn is_filled(&self, role: Role) -> bool {
        self.files.contains_key(&role)
    }

    /// Roles a report needs that no file fills
    pub fn missing(&self, kind: ReportKind) -> Vec<Role> {
        kind.required_roles()
            .iter()
            .copied()
            .filter(|role| !self.is_filled(*role))
            .collect()
    }

    /// Bytes of a role's file
    pub fn bytes(&self, role: Role) -> Result<&[u8]> {
        self.get(role)
            .map(|f| f.bytes.as_slice())
            .with_context(|| format!("No file classified as '{}'", role))
    }

    /// Role → file name for every role, `None` when unfilled
    pub fn summary(&self) -> BTreeMap<Role, Option<String>> {
        Role::ALL
            .iter()
            .map(|role| (*role, self.get(*role).map(|f| f.name.clone())))
            .collect()
    }
}

/// Assign each file to a role; later files replace earlier ones
pub fn classify(files: impl IntoIterator<Item = SourceFile>) -> ClassifiedFiles {
    let mut classified = ClassifiedFiles::default();

    for file in files {
        match classify_name(&file.name) {
            Some(role) => {
                if let Some(previous) = classified.files.get(&role) {
                    log::debug!(
                        "'{}' replaces '{}' as {}",
                        file.name,
                        previous.name,
                        role
                    );
                } else {
                    log::debug!("'{}' classified as {}", file.name, role);
                }
                classified.files.insert(role, file);
            }
            None => log::debug!("'{}' matches no role, ignored", file.name),
        }
    }

    classified
}
