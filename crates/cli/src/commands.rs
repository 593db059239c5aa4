use anyhow::{Context, Result};
use dossier_chunker::ChunkConfig;
use dossier_model_gateway::{GatewayConfig, GeminiProvider, ModelGateway};
use dossier_pipeline::{build_context, PipelineContext, ResultCache};
use dossier_store::{extract_text, ProjectId, Vault};
use dossier_vector_index::{collection_id, embedder_from_env, VectorIndex};
use std::path::Path;
use std::sync::Arc;

pub fn project_create(vault: &Vault, organization: &str, project: &str) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    vault.create_organization(organization)?;
    vault.create_project(&id)?;
    println!("Created project {organization}/{project}");
    Ok(())
}

pub fn project_list(vault: &Vault, organization: Option<&str>) -> Result<()> {
    let names = match organization {
        Some(organization) => vault.list_projects(organization)?,
        None => vault.list_organizations()?,
    };
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn notes(vault: &Vault, organization: &str, project: &str, set: Option<&str>) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    match set {
        Some(text) => {
            vault.write_notes(&id, text)?;
            println!("Notes saved for {organization}/{project}");
        }
        None => println!("{}", vault.read_notes(&id)?),
    }
    Ok(())
}

pub fn docs_add(vault: &Vault, organization: &str, project: &str, file: &Path) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable filename", file.display()))?;
    vault.add_document(&id, filename, &bytes)?;
    println!("Added {filename} to {organization}/{project}");
    Ok(())
}

pub fn docs_list(vault: &Vault, organization: &str, project: &str) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    for name in vault.document_names(&id)? {
        println!("{name}");
    }
    Ok(())
}

pub fn docs_remove(vault: &Vault, organization: &str, project: &str, filename: &str) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    vault.remove_document(&id, filename)?;
    println!("Removed {filename} from {organization}/{project}");
    Ok(())
}

pub async fn index(vault: &Vault, organization: &str, project: &str) -> Result<()> {
    let (_, project_key, chunks, documents) =
        build_project_index(vault, organization, project).await?;
    println!("Indexed {chunks} chunks from {documents} documents into '{project_key}'");
    Ok(())
}

pub async fn models() -> Result<()> {
    let provider = Arc::new(GeminiProvider::from_env()?);
    let gateway = ModelGateway::new(provider, GatewayConfig::default());
    for model in gateway.candidate_models().await? {
        println!("{model}");
    }
    Ok(())
}

pub async fn audit(
    vault: &Vault,
    organization: &str,
    project: &str,
    addendum_path: &Path,
    corrections: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let id = ProjectId::new(organization, project)?;
    let bytes = std::fs::read(addendum_path)
        .with_context(|| format!("failed to read {}", addendum_path.display()))?;
    let filename = addendum_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("addendum");
    let addendum = extract_text(filename, &bytes);
    if let Some(warning) = &addendum.warning {
        log::warn!("Addendum extraction degraded: {warning}");
    }

    let notes = vault.read_notes(&id)?;
    let (index, project_key, _, _) = build_project_index(vault, organization, project).await?;

    if dry_run {
        // Retrieval only: economy-mode context straight from the addendum.
        let context = build_context(&index, &project_key, &[], &addendum.text).await;
        println!("{context}");
        return Ok(());
    }

    let provider = Arc::new(GeminiProvider::from_env()?);
    let gateway = Arc::new(ModelGateway::new(provider, GatewayConfig::default()));
    let pipeline = PipelineContext::new(index, gateway, Arc::new(ResultCache::new()));

    let mut session = pipeline.run_audit(&project_key, &notes, &addendum.text).await?;
    if let Some(corrections) = corrections {
        pipeline.revise(&mut session, corrections, &notes).await?;
    }

    if let Some(report) = &session.report {
        println!("{report}");
    }
    match &session.summary {
        Some(summary) => println!("{}", serde_json::to_string_pretty(summary)?),
        None => log::warn!(
            "Summary is not yet available; re-run the audit to retry the summary stage"
        ),
    }
    Ok(())
}

/// Rebuild the in-memory index for one project from the vault's documents.
///
/// Collections live only for the process, so every command that queries
/// re-indexes first.
async fn build_project_index(
    vault: &Vault,
    organization: &str,
    project: &str,
) -> Result<(Arc<VectorIndex>, String, usize, usize)> {
    let id = ProjectId::new(organization, project)?;
    let (texts, warnings) = vault.project_texts(&id)?;
    for warning in &warnings {
        log::warn!("Extraction degraded: {warning}");
    }

    let chunking = ChunkConfig::default();
    chunking.validate()?;
    let embedder = embedder_from_env()?;
    let index = Arc::new(VectorIndex::new(embedder, chunking.window_words));
    let project_key = collection_id(organization, project);
    let chunks = index.reindex(&project_key, &texts).await?;
    Ok((index, project_key, chunks, texts.len()))
}
