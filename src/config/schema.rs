use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Declarative description of one generated bindings file: the anchors,
/// literal call sites and signatures the rewrite stages rely on.
#[derive(Debug, Deserialize, Clone)]
pub struct Profile {
    #[serde(default)]
    pub meta: Metadata,
    pub helpers: Helpers,
    pub linkage: Linkage,
    pub alias: Alias,
    #[serde(default)]
    pub call_sites: Vec<CallSite>,
    pub lowering: Lowering,
    pub returns: Returns,
    #[serde(default)]
    pub out_param: Option<OutParam>,
}

impl Profile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let required = [
            ("helpers.buffer_type", &self.helpers.buffer_type),
            ("helpers.native_type", &self.helpers.native_type),
            ("helpers.to_native", &self.helpers.to_native),
            ("helpers.from_native", &self.helpers.from_native),
            ("linkage.include", &self.linkage.include),
            ("linkage.import", &self.linkage.import),
            ("alias.declaration", &self.alias.declaration),
            ("lowering.definition_prefix", &self.lowering.definition_prefix),
            ("lowering.method", &self.lowering.method),
            ("returns.native_prefix", &self.returns.native_prefix),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::MissingField { entry: None, field });
            }
        }

        if self.helpers.to_native == self.helpers.from_native {
            issues.push(ValidationIssue::InvalidCombo {
                entry: None,
                message: "to_native and from_native must differ".to_string(),
            });
        }

        let lists = [
            ("linkage.directives", self.linkage.directives.len()),
            ("alias.fields", self.alias.fields.len()),
            ("lowering.receivers", self.lowering.receivers.len()),
            (
                "lowering.converter_prefixes",
                self.lowering.converter_prefixes.len(),
            ),
            ("returns.signatures", self.returns.signatures.len()),
        ];
        for (field, len) in lists {
            if len == 0 {
                issues.push(ValidationIssue::EmptyList { field });
            }
        }

        let mut seen = HashSet::new();
        for site in &self.call_sites {
            if site.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry: None,
                    field: "call_sites.id",
                });
            } else if !seen.insert(site.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    id: site.id.clone(),
                });
            }
            if site.search.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry: Some(site.id.clone()),
                    field: "search",
                });
            } else if site.replace.contains(&site.search) {
                // The search text would match again in the patched output.
                issues.push(ValidationIssue::InvalidCombo {
                    entry: Some(site.id.clone()),
                    message: "replace must not contain the search text".to_string(),
                });
            }
        }

        if let Some(out) = &self.out_param {
            let fields = [
                ("out_param.assignee", &out.assignee),
                ("out_param.converter_prefix", &out.converter_prefix),
                ("out_param.receiver", &out.receiver),
                ("out_param.method", &out.method),
            ];
            for (field, value) in fields {
                if value.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField { entry: None, field });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Names of the buffer types and the two conversion helpers.
#[derive(Debug, Deserialize, Clone)]
pub struct Helpers {
    pub buffer_type: String,
    pub native_type: String,
    pub to_native: String,
    pub from_native: String,
}

/// The include/import anchor and the directives inserted between its lines.
#[derive(Debug, Deserialize, Clone)]
pub struct Linkage {
    pub include: String,
    pub import: String,
    pub directives: Vec<String>,
}

impl Linkage {
    pub fn anchor(&self) -> String {
        format!("{}\n{}", self.include, self.import)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Alias {
    pub declaration: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Field {
    pub name: String,
    pub ty: String,
}

/// One literal call-site substitution.
#[derive(Debug, Deserialize, Clone)]
pub struct CallSite {
    pub id: String,
    pub search: String,
    pub replace: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Lowering {
    /// Trimmed-line prefix of a method definition, e.g. `func (`
    pub definition_prefix: String,
    pub method: String,
    pub receivers: Vec<String>,
    pub converter_prefixes: Vec<String>,
}

impl Lowering {
    /// Text that marks a definition line as defining the lowering method.
    pub fn definition_marker(&self) -> String {
        format!(") {}(", self.method)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Returns {
    pub native_prefix: String,
    /// Exact function-literal openings whose declared result is the buffer type
    pub signatures: Vec<String>,
}

/// Values assigned into a native out-parameter.
#[derive(Debug, Deserialize, Clone)]
pub struct OutParam {
    pub assignee: String,
    pub converter_prefix: String,
    pub receiver: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        entry: Option<String>,
        field: &'static str,
    },
    EmptyList {
        field: &'static str,
    },
    DuplicateId {
        id: String,
    },
    InvalidCombo {
        entry: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { entry, field } => match entry {
                Some(id) => write!(f, "call site '{id}' missing required field '{field}'"),
                None => write!(f, "profile missing required field '{field}'"),
            },
            ValidationIssue::EmptyList { field } => {
                write!(f, "profile field '{field}' must not be empty")
            }
            ValidationIssue::DuplicateId { id } => {
                write!(f, "call site id '{id}' is defined more than once")
            }
            ValidationIssue::InvalidCombo { entry, message } => match entry {
                Some(id) => write!(f, "call site '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid profile configuration: {message}"),
            },
        }
    }
}
