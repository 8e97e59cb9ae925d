//! URI template grammar: parsing the placeholder forms from spec §4.3.

use std::fmt;

/// The declared type of a typed placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    String,
}

impl TypeTag {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// How a `{name:pattern:glob}` placeholder's glob should be interpreted,
/// derived from the position of `*` wildcards (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobMatch {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl GlobMatch {
    fn from_glob(glob: &str) -> Self {
        let starts = glob.starts_with('*');
        let ends = glob.ends_with('*') && glob.len() > 1;
        match (starts, ends) {
            (true, true) => Self::Contains(glob[1..glob.len() - 1].to_string()),
            (true, false) => Self::Suffix(glob[1..].to_string()),
            (false, true) => Self::Prefix(glob[..glob.len() - 1].to_string()),
            (false, false) => Self::Exact(glob.to_string()),
        }
    }

    /// Whether `value` satisfies this glob.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Exact(s) => value == s,
            Self::Prefix(s) => value.starts_with(s.as_str()),
            Self::Suffix(s) => value.ends_with(s.as_str()),
            Self::Contains(s) => value.contains(s.as_str()),
        }
    }
}

/// What kind of validation a placeholder's captured value is subject to.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationKind {
    String,
    Typed(TypeTag),
    Pattern(GlobMatch),
}

/// Validation metadata for a single placeholder, the per-parameter entry in
/// a [`crate::ParsedTemplate`]'s `validations` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub kind: ValidationKind,
    pub required: bool,
    pub default: Option<String>,
    pub range: Option<(f64, f64)>,
}

/// A parsed placeholder: its name plus validation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub name: String,
    pub validation: Validation,
}

/// Errors raised while parsing a single `{...}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("empty placeholder name")]
    EmptyName,
    #[error("unknown type tag: {0}")]
    UnknownType(String),
    #[error("malformed pattern placeholder")]
    MalformedPattern,
    #[error("malformed range: {0}")]
    MalformedRange(String),
    #[error("unterminated placeholder")]
    Unterminated,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name)
    }
}

/// Parses the inner text of a single `{...}` placeholder (without braces)
/// into a [`Placeholder`], covering every form in spec §4.3's grammar table:
/// `name`, `name?`, `name=literal`, `name:type`, `name:pattern:glob`,
/// `name:type=default`, `name:type?`, plus the `name:type:min..max` range
/// extension the spec's cache-entry shape implies but the grammar table
/// doesn't give explicit syntax for.
pub fn parse_placeholder(inner: &str) -> Result<Placeholder, GrammarError> {
    let mut rest = inner;
    let mut optional = false;
    let mut default: Option<String> = None;

    if let Some(eq_pos) = rest.find('=') {
        default = Some(rest[eq_pos + 1..].to_string());
        rest = &rest[..eq_pos];
        optional = true;
    } else if let Some(stripped) = rest.strip_suffix('?') {
        rest = stripped;
        optional = true;
    }

    let (name, kind_part) = match rest.find(':') {
        Some(colon) => (&rest[..colon], Some(&rest[colon + 1..])),
        None => (rest, None),
    };

    if name.is_empty() {
        return Err(GrammarError::EmptyName);
    }

    let (kind, range) = match kind_part {
        None => (ValidationKind::String, None),
        Some(spec) if spec.starts_with("pattern:") => {
            let glob = spec.strip_prefix("pattern:").ok_or(GrammarError::MalformedPattern)?;
            if glob.is_empty() {
                return Err(GrammarError::MalformedPattern);
            }
            (ValidationKind::Pattern(GlobMatch::from_glob(glob)), None)
        }
        Some(spec) => {
            let (type_part, range_part) = match spec.find(':') {
                Some(c) => (&spec[..c], Some(&spec[c + 1..])),
                None => (spec, None),
            };
            let tag = TypeTag::parse(type_part)
                .ok_or_else(|| GrammarError::UnknownType(type_part.to_string()))?;
            let range = match range_part {
                None => None,
                Some(r) => Some(parse_range(r)?),
            };
            (ValidationKind::Typed(tag), range)
        }
    };

    Ok(Placeholder {
        name: name.to_string(),
        validation: Validation {
            kind,
            required: !optional,
            default,
            range,
        },
    })
}

fn parse_range(s: &str) -> Result<(f64, f64), GrammarError> {
    let (min, max) = s
        .split_once("..")
        .ok_or_else(|| GrammarError::MalformedRange(s.to_string()))?;
    let min: f64 = min
        .parse()
        .map_err(|_| GrammarError::MalformedRange(s.to_string()))?;
    let max: f64 = max
        .parse()
        .map_err(|_| GrammarError::MalformedRange(s.to_string()))?;
    Ok((min, max))
}
