//! `sleuth init`: scaffold a new plugin source file.

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use {
    anyhow::{Result, bail},
    sleuth_common::{to_snake_case, to_type_name},
    sleuth_plugins::plugin::{DEFAULT_COLOR, DEFAULT_ICON},
    tracing::info,
};

const TEMPLATE: &str = r#"//! __DOC_LABEL__ entity.

use {
    serde_json::json,
    sleuth_plugins::{
        ElementSpec, ExecutionContext, InputRecord, PluginDefinition, PluginSource,
        TransformDescriptor, TransformError, TransformOutput,
    },
};

pub fn __NAME__() -> PluginDefinition {
    PluginDefinition::new(__LABEL_LITERAL__)
        .color("__COLOR__")
        .icon("__ICON__")
__META__        .element(ElementSpec::text("Value").required())
        .transform(TransformDescriptor::new(__TRANSFORM_LITERAL__, to___NAME__))
}

async fn to___NAME__(
    input: InputRecord,
    ctx: ExecutionContext,
) -> Result<TransformOutput, TransformError> {
    let value = input
        .text("value")
        .ok_or_else(|| TransformError::plugin("Please provide a value."))?;
    Ok(ctx.blueprint("__NAME__", [("value", json!(value))])?.into())
}

/// Feeds this entity to a registry.
pub struct __TYPE__Source;

impl PluginSource for __TYPE__Source {
    fn definitions(&self) -> Vec<PluginDefinition> {
        vec![__NAME__()]
    }
}
"#;

/// What `sleuth init` was asked to scaffold.
#[derive(Debug, Clone)]
pub struct Scaffold {
    pub label: String,
    pub description: Option<String>,
    pub authors: Vec<String>,
}

impl Scaffold {
    /// Rust source of the new plugin.
    pub fn render(&self) -> Result<String> {
        let name = to_snake_case(&self.label);
        let type_name = to_type_name(&self.label);
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            bail!("'{}' does not make a valid plugin name", self.label);
        }

        let mut meta = String::new();
        if let Some(description) = &self.description {
            meta.push_str(&format!("        .description({description:?})\n"));
        }
        for author in &self.authors {
            meta.push_str(&format!("        .author({author:?})\n"));
        }

        let label = self.label.trim();
        // Doc comments end at a newline; string literals are escaped.
        let doc_label = label.split_whitespace().collect::<Vec<_>>().join(" ");

        Ok(TEMPLATE
            .replace("__LABEL_LITERAL__", &format!("{:?}", self.label))
            .replace("__TRANSFORM_LITERAL__", &format!("{:?}", format!("To {label}")))
            .replace("__DOC_LABEL__", &doc_label)
            .replace("__NAME__", &name)
            .replace("__TYPE__", &type_name)
            .replace("__COLOR__", DEFAULT_COLOR)
            .replace("__ICON__", DEFAULT_ICON)
            .replace("__META__", &meta))
    }

    /// Write the plugin source into `dir` as `<name>.rs`.
    ///
    /// Never overwrites an existing file.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let source = self.render()?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.rs", to_snake_case(&self.label)));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!("{} already exists, refusing to overwrite", path.display());
            },
            Err(e) => return Err(e.into()),
        };
        file.write_all(source.as_bytes())?;
        info!(path = %path.display(), "plugin scaffolded");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold(label: &str) -> Scaffold {
        Scaffold {
            label: label.into(),
            description: Some("Phone numbers \"in\" E.164".into()),
            authors: vec!["Ada".into(), "Grace".into()],
        }
    }

    #[test]
    fn renders_names_from_label() {
        let source = scaffold("Phone Number").render().unwrap();
        assert!(source.contains("pub fn phone_number() -> PluginDefinition"));
        assert!(source.contains("PluginDefinition::new(\"Phone Number\")"));
        assert!(source.contains("pub struct PhoneNumberSource;"));
        assert!(source.contains("async fn to_phone_number("));
        assert!(source.contains(".description(\"Phone numbers \\\"in\\\" E.164\")"));
        assert!(source.contains(".author(\"Grace\")"));
        assert!(source.contains(".color(\"#145070\")"));
        assert!(!source.contains("__"));
    }

    #[test]
    fn quotes_and_newlines_in_labels_stay_inside_literals() {
        let source = scaffold("Say \"hi\" \\ Bye\nNow").render().unwrap();
        assert!(source.contains(r#"TransformDescriptor::new("To Say \"hi\" \\ Bye\nNow", to_say_hi_bye_now)"#));
        assert!(source.starts_with("//! Say \"hi\" \\ Bye Now entity.\n"));
        assert!(!source.contains("To Say \"hi\""));
    }

    #[test]
    fn rejects_labels_without_a_name() {
        assert!(scaffold("!!!").render().is_err());
        assert!(scaffold("42 Things").render().is_err());
    }

    #[test]
    fn writes_once_and_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("plugins");

        let path = scaffold("Phone Number").write_to(&target).unwrap();
        assert_eq!(path, target.join("phone_number.rs"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("phone_number"));

        std::fs::write(&path, "// edited").unwrap();
        let err = scaffold("phone-number").write_to(&target).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// edited");
    }
}
