//! API documentation generation with typedoc.

use serde::Deserialize;
use serde_json::json;

use crate::domain::{
    error::DomainError,
    project::{GeneratedFile, Project, Task},
};

pub const TYPEDOC_CONFIG_PATH: &str = "typedoc.json";
pub const TYPEDOC_TASK: &str = "typedocDocgen";
pub const DOCGEN_TASK: &str = "docgen";
pub const DOCS_DIRECTORY: &str = "docs";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocgenOptions {
    /// Use an existing typedoc config instead of generating `typedoc.json`.
    pub config_file_path: Option<String>,
    /// Emit HTML instead of markdown.
    #[serde(default)]
    pub html: bool,
}

/// Attach documentation generation.
///
/// With options, a typedoc config plus a `typedocDocgen` task that runs
/// after compilation; without, a plain `docgen` task. Options without
/// docgen enabled are rejected.
pub fn add_docgen(
    project: &mut Project,
    enabled: bool,
    options: Option<&DocgenOptions>,
) -> Result<(), DomainError> {
    match (enabled, options) {
        (false, None) => Ok(()),
        (false, Some(_)) => Err(DomainError::DocgenOptionsWithoutDocgen),
        (true, None) => {
            let srcdir = project.srcdir().to_string();
            project
                .add_task(Task::new(DOCGEN_TASK).described("Generate API documentation"))?
                .exec(format!("typedoc {srcdir} --out {DOCS_DIRECTORY}"));
            project.manifest_mut().add_dev_deps(&["typedoc"]);
            project.tasks_mut().get_mut("post-compile")?.spawn(DOCGEN_TASK);
            Ok(())
        }
        (true, Some(options)) => add_typedoc(project, options),
    }
}

fn add_typedoc(project: &mut Project, options: &DocgenOptions) -> Result<(), DomainError> {
    let config_path = match &options.config_file_path {
        Some(path) => path.clone(),
        None => {
            let srcdir = project.srcdir().to_string();
            let mut config = json!({
                "$schema": "https://typedoc.org/schema.json",
                "entryPoints": [format!("{srcdir}/index.ts")],
                "out": DOCS_DIRECTORY,
                "readme": "none",
            });
            if !options.html {
                config["plugin"] = json!(["typedoc-plugin-markdown"]);
            }
            project.add_file(GeneratedFile::json(TYPEDOC_CONFIG_PATH, config)?)?;
            TYPEDOC_CONFIG_PATH.to_string()
        }
    };

    let manifest = project.manifest_mut();
    manifest.add_dev_deps(&["typedoc"]);
    if !options.html {
        manifest.add_dev_deps(&["typedoc-plugin-markdown"]);
    }

    project
        .add_task(Task::new(TYPEDOC_TASK).described("Generate API documentation with typedoc"))?
        .exec(format!("typedoc --options {config_path}"));
    project.tasks_mut().get_mut("post-compile")?.spawn(TYPEDOC_TASK);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{FileContent, ProjectOptions, TaskStep};

    fn project() -> Project {
        Project::new(ProjectOptions::new("@time-loop/widget")).unwrap()
    }

    #[test]
    fn disabled_adds_nothing() {
        let mut project = project();
        add_docgen(&mut project, false, None).unwrap();
        assert!(project.tasks().get(DOCGEN_TASK).is_none());
        assert!(project.try_find_file(TYPEDOC_CONFIG_PATH).is_none());
    }

    #[test]
    fn options_require_docgen() {
        let mut project = project();
        let err = add_docgen(&mut project, false, Some(&DocgenOptions::default())).unwrap_err();
        assert_eq!(err, DomainError::DocgenOptionsWithoutDocgen);
    }

    #[test]
    fn plain_docgen_runs_after_compile() {
        let mut project = project();
        add_docgen(&mut project, true, None).unwrap();
        let post = project.tasks().get("post-compile").unwrap();
        assert!(post.steps().contains(&TaskStep::Spawn(DOCGEN_TASK.into())));
        assert!(project.manifest().has_dependency("typedoc"));
    }

    #[test]
    fn markdown_plugin_unless_html() {
        let mut project = project();
        add_docgen(&mut project, true, Some(&DocgenOptions::default())).unwrap();
        let Some(FileContent::Json(config)) = project
            .try_find_file(TYPEDOC_CONFIG_PATH)
            .map(|file| file.content())
        else {
            panic!("typedoc.json missing");
        };
        assert_eq!(config["plugin"], json!(["typedoc-plugin-markdown"]));
        assert!(project.manifest().has_dependency("typedoc-plugin-markdown"));

        let mut html = self::project();
        let options = DocgenOptions {
            html: true,
            ..Default::default()
        };
        add_docgen(&mut html, true, Some(&options)).unwrap();
        assert!(!html.manifest().has_dependency("typedoc-plugin-markdown"));
    }

    #[test]
    fn existing_config_is_referenced() {
        let mut project = project();
        let options = DocgenOptions {
            config_file_path: Some("docs/typedoc.json".into()),
            html: false,
        };
        add_docgen(&mut project, true, Some(&options)).unwrap();
        assert!(project.try_find_file(TYPEDOC_CONFIG_PATH).is_none());
        let task = project.tasks().get(TYPEDOC_TASK).unwrap();
        assert_eq!(
            task.steps(),
            [TaskStep::Exec("typedoc --options docs/typedoc.json".into())]
        );
    }
}
