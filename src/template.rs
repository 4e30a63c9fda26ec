//! Document template filling.
//!
//! Templates use minijinja syntax and are rendered with `date` (dd/mm/YYYY)
//! and `services` (the catalog as loaded).

use std::path::{Component, Path, PathBuf};

use minijinja::{Environment, context};

use crate::catalog::Service;
use crate::errors::TemplateError;

#[derive(Debug, Clone)]
pub struct TemplateFiller {
    template_path: PathBuf,
    output_path: PathBuf,
}

impl TemplateFiller {
    pub fn new(template_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            template_path,
            output_path,
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Resolve a template name supplied by the model.
    ///
    /// Only relative paths without `..` are accepted; they resolve next to the
    /// configured template.
    pub fn resolve(&self, requested: Option<&str>) -> Option<PathBuf> {
        let Some(requested) = requested.filter(|r| !r.trim().is_empty()) else {
            return Some(self.template_path.clone());
        };
        let requested = Path::new(requested.trim());
        if !requested
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        let base = self.template_path.parent().unwrap_or(Path::new(""));
        Some(base.join(requested))
    }

    /// Render `template` with the services and write it to the output path.
    pub fn fill(&self, template: &Path, services: &[Service]) -> Result<PathBuf, TemplateError> {
        let source = std::fs::read_to_string(template).map_err(|source| TemplateError::Read {
            path: template.to_path_buf(),
            source,
        })?;

        let date = chrono::Local::now().format("%d/%m/%Y").to_string();
        let env = Environment::new();
        let rendered = env
            .render_str(&source, context! { date => date, services => services })
            .map_err(|source| TemplateError::Render {
                path: template.to_path_buf(),
                source,
            })?;

        let write_err = |source| TemplateError::Write {
            path: self.output_path.clone(),
            source,
        };
        if let Some(parent) = self.output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&self.output_path, rendered).map_err(write_err)?;

        tracing::info!(
            template = %template.display(),
            output = %self.output_path.display(),
            "Filled document template"
        );
        Ok(self.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(template: &str) -> (TemplateFiller, TempDir) {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("templates/invoice.txt");
        std::fs::create_dir_all(template_path.parent().unwrap()).unwrap();
        std::fs::write(&template_path, template).unwrap();
        let filler = TemplateFiller::new(template_path, dir.path().join("outputs/filled.txt"));
        (filler, dir)
    }

    #[test]
    fn test_fill_renders_services_and_date() {
        let (filler, _dir) = setup(
            "Date: {{ date }}\n{% for s in services %}{{ s.index }}. {{ s.name }} - {{ s.price }}\n{% endfor %}",
        );
        let services = vec![Service::new(1, "Translation", 150.0)];
        let out = filler.fill(filler.template_path(), &services).unwrap();

        let content = std::fs::read_to_string(out).unwrap();
        assert!(content.contains("1. Translation - 150"));
        let today = chrono::Local::now().format("%d/%m/%Y").to_string();
        assert!(content.contains(&today));
    }

    #[test]
    fn test_fill_missing_template() {
        let (filler, dir) = setup("x");
        let err = filler
            .fill(&dir.path().join("nope.txt"), &[])
            .unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }

    #[test]
    fn test_fill_invalid_syntax() {
        let (filler, _dir) = setup("{% for %}");
        let err = filler.fill(filler.template_path(), &[]).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_resolve_defaults_to_configured_template() {
        let (filler, _dir) = setup("x");
        assert_eq!(filler.resolve(None).unwrap(), filler.template_path());
        assert_eq!(filler.resolve(Some("  ")).unwrap(), filler.template_path());
    }

    #[test]
    fn test_resolve_relative_to_template_dir() {
        let (filler, dir) = setup("x");
        assert_eq!(
            filler.resolve(Some("receipt.txt")).unwrap(),
            dir.path().join("templates/receipt.txt")
        );
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let (filler, _dir) = setup("x");
        assert!(filler.resolve(Some("../secret.txt")).is_none());
        assert!(filler.resolve(Some("/etc/passwd")).is_none());
    }
}
