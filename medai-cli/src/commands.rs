//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use medai_agent::{
    Assistant, AssistantConfig, ClinicalAgent, GeminiGenerator, Lookup, PatientDirectory,
    SessionLog, TavilySearch,
};
use medai_rag::{IndexBuilder, OpenAIEmbeddingProvider, Retriever, VectorIndex};
use tracing::info;

use crate::console;

/// Used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "medai.toml";

/// Resolve configuration: file, then environment. Validates the result.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AssistantConfig> {
    let config = match path {
        Some(path) => AssistantConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            AssistantConfig::load(DEFAULT_CONFIG_FILE)?
        }
        None => AssistantConfig::default(),
    };
    let config = config.with_env();
    config.validate()?;
    Ok(config)
}

fn embedding_provider(config: &AssistantConfig) -> anyhow::Result<Arc<OpenAIEmbeddingProvider>> {
    let settings = &config.embedding;
    let mut provider =
        OpenAIEmbeddingProvider::with_timeout(&settings.base_url, config.embedding_timeout())?
            .with_model(&settings.model, settings.dimensions);
    if let Some(key) = &settings.api_key {
        provider = provider.with_api_key(key);
    }
    Ok(Arc::new(provider))
}

/// `medai index`: build and persist the vector index for `input`.
pub async fn run_index(
    config: AssistantConfig,
    input: &Path,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let out = out.unwrap_or_else(|| config.index_dir.clone());
    let builder = IndexBuilder::builder()
        .config(config.rag.clone())
        .embedding_provider(embedding_provider(&config)?)
        .build()?;

    let index = builder
        .build_from_file(input)
        .await
        .with_context(|| format!("failed to index {}", input.display()))?;
    index.persist(&out).with_context(|| format!("failed to write index to {}", out.display()))?;

    info!(input = %input.display(), out = %out.display(), chunks = index.len(), "index written");
    println!("Indexed {} chunks from {} into {}", index.len(), input.display(), out.display());
    Ok(())
}

/// `medai chat`: run an interactive session on the console.
pub async fn run_chat(
    mut config: AssistantConfig,
    index_dir: Option<PathBuf>,
    patients: Option<PathBuf>,
    no_log: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = index_dir {
        config.index_dir = dir;
    }
    if let Some(path) = patients {
        config.patient_data = path;
    }

    let Some(gemini_key) = config.generation.api_key.clone() else {
        bail!("no generation API key configured; set GEMINI_API_KEY");
    };

    let provider = embedding_provider(&config)?;
    let index = VectorIndex::load(&config.index_dir, &config.embedding.model).with_context(|| {
        format!("failed to load index from {}; run `medai index` first", config.index_dir.display())
    })?;
    let retriever = Retriever::new(provider, Arc::new(index), config.rag.clone())?;

    let search = TavilySearch::new(
        &config.search.endpoint,
        config.search.api_key.clone(),
        config.search_timeout(),
    )?
    .with_search_depth(&config.search.search_depth);
    let generator = GeminiGenerator::new(
        &config.generation.base_url,
        gemini_key,
        &config.generation.model,
        config.generation_timeout(),
    )?;

    let clinical = ClinicalAgent::new(Arc::new(retriever), Arc::new(search), Arc::new(generator))
        .with_document_label(&config.document_label)
        .with_generation_timeout(config.generation_timeout());

    let directory = PatientDirectory::load(&config.patient_data)?;
    let mut assistant = Assistant::new(directory, config.dialogue.clone(), clinical);
    if !no_log {
        let log = SessionLog::open(&config.session_log)?;
        info!(session_id = %log.session_id(), path = %log.path().display(), "session log opened");
        assistant = assistant.with_session_log(log);
    }

    console::run(assistant).await
}

/// `medai lookup`: print the outcome of a name search.
pub fn run_lookup(
    config: AssistantConfig,
    name: &str,
    patients: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = patients.unwrap_or(config.patient_data);
    let directory = PatientDirectory::load(&path)?;
    println!("{}", describe_lookup(&directory.find_by_name(name)));
    Ok(())
}

/// Human-readable summary of a lookup result.
pub fn describe_lookup(lookup: &Lookup<'_>) -> String {
    match lookup {
        Lookup::NotFound => "Patient not found.".to_string(),
        Lookup::Found(record) => format!(
            "{}\n  Discharged: {}\n  Diagnosis: {}\n  Medications: {}\n  Follow-up: {}",
            record.patient_name,
            record.discharge_date,
            record.primary_diagnosis,
            record.medications.join(", "),
            record.follow_up.join(", "),
        ),
        Lookup::Ambiguous(records) => {
            let mut out = format!("{} patients share this name:", records.len());
            for record in records {
                out.push_str(&format!(
                    "\n  - discharged {} ({})",
                    record.discharge_date, record.primary_diagnosis
                ));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use medai_agent::PatientRecord;

    use super::*;

    fn record(date: &str, diagnosis: &str) -> PatientRecord {
        PatientRecord {
            patient_name: "Lee Park".to_string(),
            discharge_date: date.to_string(),
            primary_diagnosis: diagnosis.to_string(),
            medications: vec!["Tacrolimus 2mg".to_string(), "Prednisone 5mg".to_string()],
            dietary_restrictions: vec![],
            follow_up: vec!["Transplant clinic weekly".to_string()],
            warning_signs: vec![],
            discharge_instructions: String::new(),
        }
    }

    #[test]
    fn describes_each_lookup_outcome() {
        assert_eq!(describe_lookup(&Lookup::NotFound), "Patient not found.");

        let single = record("2025-01-10", "Kidney transplant");
        let text = describe_lookup(&Lookup::Found(&single));
        assert!(text.starts_with("Lee Park\n"));
        assert!(text.contains("Medications: Tacrolimus 2mg, Prednisone 5mg"));

        let other = record("2025-06-02", "Acute rejection");
        let text = describe_lookup(&Lookup::Ambiguous(vec![&single, &other]));
        assert_eq!(
            text,
            "2 patients share this name:\n  - discharged 2025-01-10 (Kidney transplant)\n  \
             - discharged 2025-06-02 (Acute rejection)"
        );
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medai.toml");
        std::fs::write(&path, "patient_data = \"data/patients.json\"\n[rag]\ntop_k = 3\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.patient_data, PathBuf::from("data/patients.json"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medai.toml");
        std::fs::write(&path, "[rag]\nchunk_size = 0\n").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
        assert!(load_config(Some(dir.path().join("missing.toml").as_path())).is_err());
    }
}
