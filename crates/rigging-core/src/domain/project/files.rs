use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::domain::{
    common::{FileMode, RelativePath},
    error::DomainError,
};

use super::structure::WritePolicy;

/// Marker placed at the top of every managed file.
pub const GENERATED_MARKER: &str =
    "~~ Generated by rigging. To modify, edit your options and run \"rigging new\" again.";

#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    /// A YAML document, rendered with a leading marker comment.
    Yaml(YamlValue),
    /// A JSON document; objects get a `"//"` marker field, `.json5` files a
    /// marker comment.
    Json(JsonValue),
    /// Line-oriented config (`.npmrc`, `.gitignore`), marker as first line.
    Lines(Vec<String>),
    /// Verbatim text, no marker.
    Text(String),
}

/// A file attached to a [`Project`](super::Project).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    path: RelativePath,
    content: FileContent,
    mode: FileMode,
    policy: WritePolicy,
}

impl GeneratedFile {
    pub fn new(path: &str, content: FileContent) -> Result<Self, DomainError> {
        Ok(Self {
            path: RelativePath::try_new(path)?,
            content,
            mode: FileMode::read_write(),
            policy: WritePolicy::Overwrite,
        })
    }

    pub fn yaml(path: &str, value: YamlValue) -> Result<Self, DomainError> {
        Self::new(path, FileContent::Yaml(value))
    }

    pub fn json(path: &str, value: JsonValue) -> Result<Self, DomainError> {
        Self::new(path, FileContent::Json(value))
    }

    pub fn lines<S: Into<String>>(
        path: &str,
        lines: impl IntoIterator<Item = S>,
    ) -> Result<Self, DomainError> {
        Self::new(
            path,
            FileContent::Lines(lines.into_iter().map(Into::into).collect()),
        )
    }

    pub fn text(path: &str, text: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(path, FileContent::Text(text.into()))
    }

    /// Starter content written only when the file does not exist yet.
    pub fn sample(path: &str, text: impl Into<String>) -> Result<Self, DomainError> {
        let mut file = Self::text(path, text)?;
        file.policy = WritePolicy::IfMissing;
        Ok(file)
    }

    pub fn executable(mut self) -> Self {
        self.mode = FileMode::executable();
        self
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    pub fn content(&self) -> &FileContent {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut FileContent {
        &mut self.content
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Render to the exact bytes written to disk.
    pub fn render(&self) -> Result<String, DomainError> {
        let render_err = |reason: String| DomainError::RenderFailed {
            path: self.path.to_slash(),
            reason,
        };

        match &self.content {
            FileContent::Yaml(value) => {
                let body = serde_yaml::to_string(value).map_err(|e| render_err(e.to_string()))?;
                Ok(format!("# {GENERATED_MARKER}\n\n{body}"))
            }
            FileContent::Json(value) if self.path.to_slash().ends_with(".json5") => {
                let body =
                    serde_json::to_string_pretty(value).map_err(|e| render_err(e.to_string()))?;
                Ok(format!("// {GENERATED_MARKER}\n{body}\n"))
            }
            FileContent::Json(value) => {
                let mut value = value.clone();
                if let JsonValue::Object(map) = &mut value {
                    map.insert("//".into(), JsonValue::from(GENERATED_MARKER));
                }
                let body =
                    serde_json::to_string_pretty(&value).map_err(|e| render_err(e.to_string()))?;
                Ok(format!("{body}\n"))
            }
            FileContent::Lines(lines) => {
                let mut out = format!("# {GENERATED_MARKER}\n");
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                Ok(out)
            }
            FileContent::Text(text) => Ok(text.clone()),
        }
    }
}
