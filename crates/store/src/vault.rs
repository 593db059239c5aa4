use crate::error::{Result, StoreError};
use crate::extract::extract_text;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const NOTES_FILE: &str = "_notes.txt";

/// Identity of one project: organization name plus project name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId {
    pub organization: String,
    pub project: String,
}

impl ProjectId {
    pub fn new(organization: impl Into<String>, project: impl Into<String>) -> Result<Self> {
        let organization = organization.into();
        let project = project.into();
        validate_name(&organization)?;
        validate_name(&project)?;
        Ok(Self {
            organization,
            project,
        })
    }
}

/// Filesystem-backed store of organizations, projects, documents, and notes.
///
/// Layout: `<root>/<organization>/<project>/<document files>`, with
/// underscore-prefixed files reserved for internal state and hidden from
/// document listings.
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault rooted at `DOSSIER_VAULT_DIR`, defaulting to `./vault`.
    pub fn from_env() -> Self {
        let root = std::env::var("DOSSIER_VAULT_DIR").unwrap_or_else(|_| "vault".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_organization(&self, organization: &str) -> Result<()> {
        validate_name(organization)?;
        std::fs::create_dir_all(self.root.join(organization))?;
        log::info!("Created organization '{organization}'");
        Ok(())
    }

    pub fn create_project(&self, id: &ProjectId) -> Result<()> {
        std::fs::create_dir_all(self.project_dir(id))?;
        log::info!("Created project '{}/{}'", id.organization, id.project);
        Ok(())
    }

    pub fn list_organizations(&self) -> Result<Vec<String>> {
        self.list_dirs(&self.root)
    }

    pub fn list_projects(&self, organization: &str) -> Result<Vec<String>> {
        validate_name(organization)?;
        self.list_dirs(&self.root.join(organization))
    }

    /// Store raw document bytes under the project directory.
    pub fn add_document(&self, id: &ProjectId, filename: &str, bytes: &[u8]) -> Result<()> {
        validate_filename(filename)?;
        let dir = self.existing_project_dir(id)?;
        std::fs::write(dir.join(filename), bytes)?;
        log::info!(
            "Stored document '{filename}' in '{}/{}'",
            id.organization,
            id.project
        );
        Ok(())
    }

    pub fn remove_document(&self, id: &ProjectId, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let path = self.existing_project_dir(id)?.join(filename);
        if !path.is_file() {
            return Err(StoreError::NotFound(format!(
                "{}/{}/{filename}",
                id.organization, id.project
            )));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// All reference documents as raw bytes, keyed by filename.
    /// Underscore-prefixed (internal) files are hidden.
    pub fn list_documents(&self, id: &ProjectId) -> Result<BTreeMap<String, Vec<u8>>> {
        let dir = self.existing_project_dir(id)?;
        let mut documents = BTreeMap::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if name.starts_with('_') {
                continue;
            }
            documents.insert(name.to_string(), std::fs::read(entry.path())?);
        }
        Ok(documents)
    }

    pub fn document_names(&self, id: &ProjectId) -> Result<Vec<String>> {
        Ok(self.list_documents(id)?.into_keys().collect())
    }

    /// Extracted text of every reference document, plus extraction warnings.
    ///
    /// Documents that fail extraction contribute empty text and a warning,
    /// never an error.
    pub fn project_texts(&self, id: &ProjectId) -> Result<(BTreeMap<String, String>, Vec<String>)> {
        let mut texts = BTreeMap::new();
        let mut warnings = Vec::new();
        for (filename, bytes) in self.list_documents(id)? {
            let extracted = extract_text(&filename, &bytes);
            if let Some(warning) = extracted.warning {
                warnings.push(format!("{filename}: {warning}"));
            }
            texts.insert(filename, extracted.text);
        }
        Ok((texts, warnings))
    }

    /// Persistent project notes; missing notes read as empty.
    pub fn read_notes(&self, id: &ProjectId) -> Result<String> {
        let path = self.existing_project_dir(id)?.join(NOTES_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write_notes(&self, id: &ProjectId, notes: &str) -> Result<()> {
        let dir = self.existing_project_dir(id)?;
        std::fs::write(dir.join(NOTES_FILE), notes)?;
        log::info!("Saved notes for '{}/{}'", id.organization, id.project);
        Ok(())
    }

    fn project_dir(&self, id: &ProjectId) -> PathBuf {
        self.root.join(&id.organization).join(&id.project)
    }

    fn existing_project_dir(&self, id: &ProjectId) -> Result<PathBuf> {
        let dir = self.project_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(format!(
                "project '{}/{}'",
                id.organization, id.project
            )));
        }
        Ok(dir)
    }

    fn list_dirs(&self, parent: &Path) -> Result<Vec<String>> {
        if !parent.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidName(
            name.to_string(),
            "must not be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StoreError::InvalidName(
            name.to_string(),
            "must not contain path separators".to_string(),
        ));
    }
    Ok(())
}

fn validate_filename(filename: &str) -> Result<()> {
    validate_name(filename)?;
    if filename.starts_with('_') {
        return Err(StoreError::InvalidName(
            filename.to_string(),
            "leading underscore is reserved for internal files".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vault() -> (TempDir, Vault, ProjectId) {
        let temp = TempDir::new().expect("tempdir");
        let vault = Vault::new(temp.path());
        let id = ProjectId::new("acme", "tower").expect("project id");
        vault.create_project(&id).expect("create project");
        (temp, vault, id)
    }

    #[test]
    fn notes_round_trip() {
        let (_temp, vault, id) = vault();
        assert_eq!(vault.read_notes(&id).unwrap(), "");

        vault
            .write_notes(&id, "never accept surcharges above 5%")
            .unwrap();
        assert_eq!(
            vault.read_notes(&id).unwrap(),
            "never accept surcharges above 5%"
        );
    }

    #[test]
    fn underscore_files_are_hidden_from_listings() {
        let (_temp, vault, id) = vault();
        vault.add_document(&id, "spec.txt", b"reference").unwrap();
        vault.write_notes(&id, "internal").unwrap();

        let docs = vault.list_documents(&id).unwrap();
        assert_eq!(docs.keys().collect::<Vec<_>>(), vec!["spec.txt"]);
    }

    #[test]
    fn add_document_rejects_reserved_and_unsafe_names() {
        let (_temp, vault, id) = vault();
        assert!(vault.add_document(&id, "_sneaky.txt", b"x").is_err());
        assert!(vault.add_document(&id, "../escape.txt", b"x").is_err());
        assert!(vault.add_document(&id, "", b"x").is_err());
    }

    #[test]
    fn project_texts_collects_warnings_instead_of_failing() {
        let (_temp, vault, id) = vault();
        vault.add_document(&id, "good.txt", b"hourly rate 48").unwrap();
        vault
            .add_document(&id, "image.bin", &[0u8, 159, 146, 150])
            .unwrap();

        let (texts, warnings) = vault.project_texts(&id).unwrap();
        assert_eq!(texts["good.txt"], "hourly rate 48");
        assert_eq!(texts["image.bin"], "");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("image.bin:"));
    }

    #[test]
    fn missing_project_is_reported() {
        let temp = TempDir::new().unwrap();
        let vault = Vault::new(temp.path());
        let id = ProjectId::new("ghost", "nowhere").unwrap();
        assert!(matches!(
            vault.list_documents(&id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn organizations_and_projects_list_sorted() {
        let temp = TempDir::new().unwrap();
        let vault = Vault::new(temp.path());
        vault.create_organization("zeta").unwrap();
        vault.create_organization("acme").unwrap();
        vault
            .create_project(&ProjectId::new("acme", "tower").unwrap())
            .unwrap();
        vault
            .create_project(&ProjectId::new("acme", "bridge").unwrap())
            .unwrap();

        assert_eq!(vault.list_organizations().unwrap(), vec!["acme", "zeta"]);
        assert_eq!(
            vault.list_projects("acme").unwrap(),
            vec!["bridge", "tower"]
        );
    }

    #[test]
    fn remove_document_deletes_only_existing_files() {
        let (_temp, vault, id) = vault();
        vault.add_document(&id, "spec.txt", b"x").unwrap();
        vault.remove_document(&id, "spec.txt").unwrap();
        assert!(vault.list_documents(&id).unwrap().is_empty());
        assert!(vault.remove_document(&id, "spec.txt").is_err());
    }
}
