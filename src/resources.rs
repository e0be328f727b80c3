//! Dossier `resources/` : fichiers de Servo, police du chrome, listes de filtres.
//!
//! Servo exige un `ResourceReaderMethods` enregistré via
//! `servo::resources::set()` avant `ServoBuilder::build()`.
//!
//! Ordre de recherche du dossier :
//! 1. Variable d'environnement `SERVO_RESOURCES_PATH`
//! 2. À côté de l'exécutable (`<exe_dir>/resources/`), ou à la racine du
//!    projet si l'exécutable est dans `target/{debug,release}/`
//! 3. Répertoire courant (`./resources/`)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

use servo::resources::{self, Resource};
use tracing::{error, info};

use crate::error::{BrowserError, Result};
use crate::pages;

static RESOURCES_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Localise le dossier et enregistre le lecteur auprès de Servo.
pub fn init() -> Result<PathBuf> {
    let dir = match RESOURCES_DIR.get() {
        Some(dir) => dir.clone(),
        None => {
            let found = locate_resources_dir()?;
            RESOURCES_DIR.get_or_init(|| found).clone()
        }
    };
    info!(dir = %dir.display(), "Resources directory");
    resources::set(Box::new(ResourceReader { dir: dir.clone() }));
    Ok(dir)
}

/// Dossier résolu par [`init`], `None` avant.
pub fn resources_dir() -> Option<&'static Path> {
    RESOURCES_DIR.get().map(PathBuf::as_path)
}

/// Lit `file` (chemin relatif) depuis le dossier de ressources.
pub fn read(file: &str) -> Result<Vec<u8>> {
    let base = resources_dir().ok_or_else(|| BrowserError::MissingResource(PathBuf::from(file)))?;
    Ok(fs::read(resolve_within(base, file)?)?)
}

/// Dossier des listes de filtres Adblock Plus.
pub fn filters_dir() -> Option<PathBuf> {
    resources_dir().map(|dir| dir.join("filters"))
}

/// Résout `file` sous `base` en refusant toute sortie du dossier
/// (`../`, liens symboliques).
pub fn resolve_within(base: &Path, file: &str) -> Result<PathBuf> {
    let candidate = base.join(file);
    let canonical = candidate
        .canonicalize()
        .map_err(|_| BrowserError::MissingResource(candidate.clone()))?;
    let base_canonical = base
        .canonicalize()
        .map_err(|_| BrowserError::MissingResource(base.to_path_buf()))?;

    if !canonical.starts_with(&base_canonical) {
        return Err(BrowserError::ResourceTraversal(candidate));
    }
    Ok(canonical)
}

struct ResourceReader {
    dir: PathBuf,
}

/// Ressources servies depuis le binaire plutôt que depuis le disque : toute
/// erreur réseau (ou de certificat) affiche la page d'erreur de B2B.
fn builtin(file: &Resource) -> Option<&'static [u8]> {
    match file {
        Resource::NetErrorHTML | Resource::BadCertHTML => Some(pages::ERROR_PAGE.as_bytes()),
        _ => None,
    }
}

impl resources::ResourceReaderMethods for ResourceReader {
    fn read(&self, file: Resource) -> Vec<u8> {
        if let Some(bytes) = builtin(&file) {
            return bytes.to_vec();
        }
        match resolve_within(&self.dir, file.filename()).and_then(|p| Ok(fs::read(p)?)) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(file = file.filename(), error = %e, "Cannot read Servo resource");
                Vec::new()
            }
        }
    }

    fn sandbox_access_files_dirs(&self) -> Vec<PathBuf> {
        vec![self.dir.clone()]
    }

    fn sandbox_access_files(&self) -> Vec<PathBuf> {
        vec![]
    }
}

fn locate_resources_dir() -> Result<PathBuf> {
    if let Ok(path) = env::var("SERVO_RESOURCES_PATH") {
        let path = PathBuf::from(path);
        if path.is_dir() {
            return Ok(path);
        }
    }

    if let Ok(exe_path) = env::current_exe()
        && let Ok(canonical) = exe_path.canonicalize()
        && let Some(exe_dir) = canonical.parent()
    {
        let path = exe_dir.join("resources");
        if path.is_dir() {
            return Ok(path);
        }

        // Développement : target/{debug,release}/ → racine du projet.
        if let Some(target_dir) = exe_dir.parent()
            && target_dir.file_name().is_some_and(|n| n == "target")
            && let Some(project_root) = target_dir.parent()
        {
            let path = project_root.join("resources");
            if path.is_dir() {
                return Ok(path);
            }
        }
    }

    let path = env::current_dir()?.join("resources");
    if path.is_dir() {
        return Ok(path);
    }

    Err(BrowserError::MissingResource(PathBuf::from("resources")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_use_the_error_page() {
        assert_eq!(builtin(&Resource::NetErrorHTML), Some(pages::ERROR_PAGE.as_bytes()));
        assert_eq!(builtin(&Resource::BadCertHTML), Some(pages::ERROR_PAGE.as_bytes()));
        assert_eq!(builtin(&Resource::DomainList), None);
    }

    #[test]
    fn test_reader_serves_error_page_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let reader = ResourceReader {
            dir: dir.path().to_path_buf(),
        };
        let bytes = resources::ResourceReaderMethods::read(&reader, Resource::NetErrorHTML);
        assert_eq!(bytes, pages::ERROR_PAGE.as_bytes());
    }

    #[test]
    fn test_resolve_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefs.json"), "{}").unwrap();
        let path = resolve_within(dir.path(), "prefs.json").unwrap();
        assert!(path.is_absolute());
        assert_eq!(fs::read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_resolve_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("fonts")).unwrap();
        fs::write(dir.path().join("fonts").join("a.ttf"), [0u8; 4]).unwrap();
        assert!(resolve_within(dir.path(), "fonts/a.ttf").is_ok());
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolve_within(dir.path(), "nope.json"),
            Err(BrowserError::MissingResource(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("resources");
        fs::create_dir(&base).unwrap();
        fs::write(root.path().join("secret.txt"), "x").unwrap();

        assert!(matches!(
            resolve_within(&base, "../secret.txt"),
            Err(BrowserError::ResourceTraversal(_))
        ));
    }
}
