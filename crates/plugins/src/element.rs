//! Declarative UI element descriptors.
//!
//! An entity's node schema is a list of [`ElementSpec`]s. Input kinds carry
//! data the user enters and become fields of the transform input; display
//! kinds only render values that transforms produced.

use std::path::Path;

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::error::{FieldIssue, NumberKind};

/// Widget kind, serialized as the `type` tag the UI renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    // inputs
    Text,
    #[serde(rename = "textarea")]
    TextArea,
    Dropdown,
    Number,
    Decimal,
    Upload,
    // displays
    Title,
    Section,
    CopyText,
    CopyCode,
    Json,
    Image,
    Pdf,
    Video,
    List,
    Table,
    Empty,
}

impl ElementKind {
    /// Whether the element takes user input and contributes an input field.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Self::Text | Self::TextArea | Self::Dropdown | Self::Number | Self::Decimal | Self::Upload
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Dropdown => "dropdown",
            Self::Number => "number",
            Self::Decimal => "decimal",
            Self::Upload => "upload",
            Self::Title => "title",
            Self::Section => "section",
            Self::CopyText => "copy-text",
            Self::CopyCode => "copy-code",
            Self::Json => "json",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::List => "list",
            Self::Table => "table",
            Self::Empty => "empty",
        }
    }
}

/// One choice of a dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl DropdownOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tooltip: None,
            value: None,
        }
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl From<&str> for DropdownOption {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A single declared element of a node schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSpec {
    #[serde(rename = "type")]
    kind: ElementKind,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<DropdownOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    supported_files: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    style: Map<String, Value>,
}

impl ElementSpec {
    pub fn new(kind: ElementKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            icon: None,
            placeholder: None,
            default: None,
            required: false,
            options: Vec::new(),
            supported_files: Vec::new(),
            style: Map::new(),
        }
    }

    // ── inputs ──────────────────────────────────────────────────────────────

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Text, label)
    }

    pub fn textarea(label: impl Into<String>) -> Self {
        Self::new(ElementKind::TextArea, label)
    }

    pub fn dropdown<I, O>(label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<DropdownOption>,
    {
        let mut spec = Self::new(ElementKind::Dropdown, label);
        spec.options = options.into_iter().map(Into::into).collect();
        spec
    }

    pub fn number(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Number, label)
    }

    pub fn decimal(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Decimal, label)
    }

    /// File upload restricted to the given extensions (`".pdf"` or `"pdf"`).
    /// An empty list accepts any file.
    pub fn upload<I, S>(label: impl Into<String>, supported_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(ElementKind::Upload, label);
        spec.supported_files = supported_files.into_iter().map(Into::into).collect();
        spec
    }

    // ── displays ────────────────────────────────────────────────────────────

    pub fn title(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Title, label)
    }

    pub fn section(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Section, label)
    }

    pub fn copy_text(label: impl Into<String>) -> Self {
        Self::new(ElementKind::CopyText, label)
    }

    pub fn copy_code(label: impl Into<String>) -> Self {
        Self::new(ElementKind::CopyCode, label)
    }

    pub fn json(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Json, label)
    }

    pub fn image(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Image, label)
    }

    pub fn pdf(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Pdf, label)
    }

    pub fn video(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Video, label)
    }

    pub fn list(label: impl Into<String>) -> Self {
        Self::new(ElementKind::List, label)
    }

    pub fn table(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Table, label)
    }

    /// Layout spacer. Has no label and holds no data.
    pub fn empty() -> Self {
        Self::new(ElementKind::Empty, "")
    }

    // ── builder ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn options(&self) -> &[DropdownOption] {
        &self.options
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Canonical field / property name: the snake-cased label.
    pub fn field_name(&self) -> String {
        sleuth_common::to_snake_case(&self.label)
    }

    /// Value used when the user supplied nothing for this input.
    ///
    /// The declared default wins; otherwise text kinds fall back to `""`,
    /// numeric kinds to zero, and choice/file kinds to `null`.
    pub fn default_value(&self) -> Value {
        if let Some(ref value) = self.default {
            return value.clone();
        }
        match self.kind {
            ElementKind::Text | ElementKind::TextArea => Value::String(String::new()),
            ElementKind::Number => Value::from(0_i64),
            ElementKind::Decimal => Value::from(0.0_f64),
            _ => Value::Null,
        }
    }

    /// Coerce one raw user value into this input's typed value.
    ///
    /// `raw` is never `null` here; absent values are resolved by the caller
    /// through [`default_value`](Self::default_value).
    pub fn coerce(&self, raw: &Value) -> Result<Value, FieldIssue> {
        match self.kind {
            ElementKind::Text | ElementKind::TextArea => coerce_text(raw).map(Value::String),
            ElementKind::Number => coerce_integer(raw).map(Value::from),
            ElementKind::Decimal => coerce_decimal(raw).map(Value::from),
            ElementKind::Dropdown => self.coerce_choice(raw).map(Value::String),
            ElementKind::Upload => self.coerce_file(raw).map(Value::String),
            _ => Err(FieldIssue::Unknown),
        }
    }

    fn coerce_choice(&self, raw: &Value) -> Result<String, FieldIssue> {
        // The UI echoes back the whole option object; accept that or its label.
        let picked = match raw {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => match obj.get("label") {
                Some(Value::String(s)) => s.as_str(),
                _ => {
                    return Err(FieldIssue::WrongType {
                        expected: "an option label",
                        got: "object",
                    });
                },
            },
            other => {
                return Err(FieldIssue::WrongType {
                    expected: "an option label",
                    got: json_type(other),
                });
            },
        };
        let picked = picked.trim();
        self.options
            .iter()
            .find(|o| o.label == picked || o.value.as_deref() == Some(picked))
            .map(|o| o.label.clone())
            .ok_or_else(|| FieldIssue::InvalidChoice {
                value: picked.to_string(),
                allowed: self.options.iter().map(|o| o.label.clone()).collect(),
            })
    }

    fn coerce_file(&self, raw: &Value) -> Result<String, FieldIssue> {
        let file = coerce_text(raw)?;
        if self.supported_files.is_empty() {
            return Ok(file);
        }
        let ext = Path::new(&file)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let supported = ext.as_deref().is_some_and(|ext| {
            self.supported_files
                .iter()
                .any(|s| s.trim_start_matches('.').eq_ignore_ascii_case(ext))
        });
        if supported {
            Ok(file)
        } else {
            Err(FieldIssue::UnsupportedFile {
                file,
                allowed: self.supported_files.clone(),
            })
        }
    }
}

fn coerce_text(raw: &Value) -> Result<String, FieldIssue> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FieldIssue::WrongType {
            expected: "text",
            got: json_type(other),
        }),
    }
}

fn coerce_integer(raw: &Value) -> Result<i64, FieldIssue> {
    let not_a_number = || FieldIssue::NotANumber {
        raw: raw_display(raw),
        expected: NumberKind::Integer,
    };
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
                .ok_or_else(not_a_number),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_a_number()),
        _ => Err(not_a_number()),
    }
}

fn coerce_decimal(raw: &Value) -> Result<f64, FieldIssue> {
    let not_a_number = || FieldIssue::NotANumber {
        raw: raw_display(raw),
        expected: NumberKind::Decimal,
    };
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(not_a_number),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(not_a_number),
        _ => Err(not_a_number()),
    }
}

fn raw_display(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use {rstest::rstest, serde_json::json};

    use super::*;

    #[rstest]
    #[case(json!("alice"), json!("alice"))]
    #[case(json!(42), json!("42"))]
    #[case(json!(true), json!("true"))]
    fn text_coercion(#[case] raw: Value, #[case] expected: Value) {
        assert_eq!(ElementSpec::text("Name").coerce(&raw), Ok(expected));
    }

    #[test]
    fn text_rejects_structured_values() {
        let issue = ElementSpec::text("Name").coerce(&json!(["a"])).unwrap_err();
        assert_eq!(
            issue,
            FieldIssue::WrongType {
                expected: "text",
                got: "array"
            }
        );
    }

    #[rstest]
    #[case(json!(7), 7)]
    #[case(json!(" 12 "), 12)]
    #[case(json!(3.0), 3)]
    #[case(json!("-4"), -4)]
    fn integer_coercion(#[case] raw: Value, #[case] expected: i64) {
        assert_eq!(ElementSpec::number("Pages").coerce(&raw), Ok(json!(expected)));
    }

    #[rstest]
    #[case(json!("ten"), "ten")]
    #[case(json!(2.5), "2.5")]
    #[case(json!("1.5"), "1.5")]
    fn integer_rejects(#[case] raw: Value, #[case] shown: &str) {
        let issue = ElementSpec::number("Pages").coerce(&raw).unwrap_err();
        assert_eq!(
            issue,
            FieldIssue::NotANumber {
                raw: shown.into(),
                expected: NumberKind::Integer
            }
        );
    }

    #[rstest]
    #[case(json!(1.25), 1.25)]
    #[case(json!("3.5"), 3.5)]
    #[case(json!(2), 2.0)]
    fn decimal_coercion(#[case] raw: Value, #[case] expected: f64) {
        assert_eq!(ElementSpec::decimal("Ratio").coerce(&raw), Ok(json!(expected)));
    }

    #[test]
    fn decimal_rejects_non_finite_text() {
        let issue = ElementSpec::decimal("Ratio").coerce(&json!("inf")).unwrap_err();
        assert!(matches!(issue, FieldIssue::NotANumber { expected: NumberKind::Decimal, .. }));
    }

    #[test]
    fn dropdown_accepts_label_value_or_option_object() {
        let spec = ElementSpec::dropdown(
            "Engine",
            [
                DropdownOption::new("Google").with_value("g"),
                DropdownOption::new("Bing"),
            ],
        );
        assert_eq!(spec.coerce(&json!("Bing")), Ok(json!("Bing")));
        assert_eq!(spec.coerce(&json!("g")), Ok(json!("Google")));
        assert_eq!(
            spec.coerce(&json!({"label": "Google", "tooltip": ""})),
            Ok(json!("Google"))
        );
    }

    #[test]
    fn dropdown_rejects_unknown_choice_with_allowed_set() {
        let spec = ElementSpec::dropdown("Mode", ["a", "b"]);
        assert_eq!(
            spec.coerce(&json!("c")),
            Err(FieldIssue::InvalidChoice {
                value: "c".into(),
                allowed: vec!["a".into(), "b".into()],
            })
        );
    }

    #[rstest]
    #[case("report.PDF", true)]
    #[case("notes.docx", true)]
    #[case("image.png", false)]
    #[case("no_extension", false)]
    fn upload_checks_extension(#[case] file: &str, #[case] ok: bool) {
        let spec = ElementSpec::upload("Document", [".pdf", "docx"]);
        assert_eq!(spec.coerce(&json!(file)).is_ok(), ok);
    }

    #[test]
    fn display_kinds_never_coerce() {
        assert_eq!(
            ElementSpec::title("Result").coerce(&json!("x")),
            Err(FieldIssue::Unknown)
        );
        assert!(!ElementKind::CopyText.is_input());
        assert!(ElementKind::Upload.is_input());
    }

    #[test]
    fn defaults_fall_back_per_kind() {
        assert_eq!(ElementSpec::text("A").default_value(), json!(""));
        assert_eq!(ElementSpec::number("B").default_value(), json!(0));
        assert_eq!(ElementSpec::decimal("C").default_value(), json!(0.0));
        assert_eq!(ElementSpec::dropdown("D", ["x"]).default_value(), Value::Null);
        assert_eq!(
            ElementSpec::number("E").with_default(5).default_value(),
            json!(5)
        );
    }

    #[test]
    fn serializes_for_the_ui() {
        let spec = ElementSpec::text("Profile Link")
            .with_icon("link")
            .with_placeholder("https://");
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "type": "text",
                "label": "Profile Link",
                "icon": "link",
                "placeholder": "https://",
            })
        );
        assert_eq!(spec.field_name(), "profile_link");
        assert_eq!(
            serde_json::to_value(ElementKind::CopyText).unwrap(),
            json!("copy-text")
        );
        assert_eq!(ElementKind::TextArea.as_str(), "textarea");
    }
}
