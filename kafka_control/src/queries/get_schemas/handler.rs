use crate::codec::{SchemaCatalog, SubjectSchema};
use anyhow::{bail, Context};
use tracing::info;

/// Registered subjects, sorted.
#[tracing::instrument(skip_all)]
pub async fn get_subjects(catalog: &dyn SchemaCatalog) -> Result<Vec<String>, anyhow::Error> {
    let mut subjects = catalog
        .subjects()
        .await
        .context("While listing schema subjects")?;
    subjects.sort();
    info!("Schema registry has {} subjects", subjects.len());

    Ok(subjects)
}

#[tracing::instrument(skip(catalog))]
pub async fn get_subject_schema(
    catalog: &dyn SchemaCatalog,
    subject: &str,
) -> Result<SubjectSchema, anyhow::Error> {
    if subject.trim().is_empty() {
        bail!("Schema subject can't be empty")
    }

    catalog
        .schema_by_subject(subject)
        .await
        .with_context(|| format!("While fetching latest schema of subject {}", subject))
}
