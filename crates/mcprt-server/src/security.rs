//! Per-template ACL and validator hooks (spec §4.8 "Template Security").
//!
//! Validators are `Arc<dyn Fn(...) -> bool + Send + Sync>` closures rather
//! than a handler trait — the teacher stores its ACL predicates the same
//! way in `turbomcp-server::handlers::traits`, as plain boxed closures
//! rather than a dedicated object for something this small.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// `(template_uri, params, role) -> allowed`.
pub type ValidatorFn = Arc<dyn Fn(&str, &HashMap<String, Value>, Option<&str>) -> bool + Send + Sync>;

const WILDCARD_ROLE: &str = "*";

struct TemplateEntry {
    roles: HashSet<String>,
    validator: Option<ValidatorFn>,
}

/// Per-template ACL/validator storage plus an optional default validator
/// applied to templates with no validator of their own.
pub struct TemplateSecurity {
    entries: RwLock<HashMap<String, TemplateEntry>>,
    default_validator: RwLock<Option<ValidatorFn>>,
}

impl TemplateSecurity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_validator: RwLock::new(None),
        }
    }

    /// Registers (or replaces) the allowed-role set for a template. An empty
    /// set means "no restriction" — Open Question (a), resolved as
    /// permissive (see `DESIGN.md`).
    pub fn set_acl(&self, template_uri: &str, roles: HashSet<String>) {
        self.entries
            .write()
            .entry(template_uri.to_string())
            .or_insert_with(|| TemplateEntry { roles: HashSet::new(), validator: None })
            .roles = roles;
    }

    /// Registers (or replaces) the template-specific validator.
    pub fn set_validator(&self, template_uri: &str, validator: ValidatorFn) {
        self.entries
            .write()
            .entry(template_uri.to_string())
            .or_insert_with(|| TemplateEntry { roles: HashSet::new(), validator: None })
            .validator = Some(validator);
    }

    /// Registers the fallback validator applied to templates with no
    /// validator of their own.
    pub fn set_default_validator(&self, validator: ValidatorFn) {
        *self.default_validator.write() = Some(validator);
    }

    pub fn clear(&self, template_uri: &str) {
        self.entries.write().remove(template_uri);
    }

    /// Evaluates access for `template_uri` (spec §4.8 "Check order"): role
    /// check first, deny if the caller's role is absent and the template
    /// declares a non-empty role set; otherwise the template's validator, or
    /// the default validator, or permissive if neither is set.
    #[must_use]
    pub fn check(&self, template_uri: &str, role: Option<&str>, params: &HashMap<String, Value>) -> bool {
        let entries = self.entries.read();
        let entry = entries.get(template_uri);

        if let Some(entry) = entry {
            if !entry.roles.is_empty() {
                let allowed = match role {
                    Some(r) => entry.roles.contains(r) || entry.roles.contains(WILDCARD_ROLE),
                    None => false,
                };
                if !allowed {
                    return false;
                }
            }
        }

        let validator = entry.and_then(|e| e.validator.clone());
        match validator.or_else(|| self.default_validator.read().clone()) {
            Some(validator) => validator(template_uri, params, role),
            None => true,
        }
    }
}

impl Default for TemplateSecurity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_when_no_acl_and_no_default_validator() {
        let security = TemplateSecurity::new();
        assert!(security.check("t://x", None, &HashMap::new()));
    }

    #[test]
    fn empty_role_set_is_not_restrictive() {
        let security = TemplateSecurity::new();
        security.set_acl("t://x", HashSet::new());
        assert!(security.check("t://x", None, &HashMap::new()));
    }

    #[test]
    fn absent_role_denied_against_nonempty_acl() {
        let security = TemplateSecurity::new();
        security.set_acl("t://x", HashSet::from(["admin".to_string()]));
        assert!(!security.check("t://x", None, &HashMap::new()));
        assert!(!security.check("t://x", Some("guest"), &HashMap::new()));
        assert!(security.check("t://x", Some("admin"), &HashMap::new()));
    }

    #[test]
    fn wildcard_role_matches_any_caller() {
        let security = TemplateSecurity::new();
        security.set_acl("t://x", HashSet::from(["*".to_string()]));
        assert!(security.check("t://x", Some("anyone"), &HashMap::new()));
    }

    #[test]
    fn template_specific_validator_overrides_default() {
        let security = TemplateSecurity::new();
        security.set_default_validator(Arc::new(|_, _, _| false));
        security.set_validator("t://x", Arc::new(|_, _, _| true));
        assert!(security.check("t://x", None, &HashMap::new()));
        assert!(!security.check("t://other", None, &HashMap::new()));
    }
}
