//! Tool/resource/resource-template catalogs (spec §4.7 "Registration"),
//! guarded by `parking_lot::RwLock` per the teacher's
//! `turbomcp-server::server::core` convention of a main-mutex-guarded
//! registry that registration and request handling can safely interleave
//! with.

use parking_lot::RwLock;

use mcprt_protocol::{ResourceDescriptor, ResourceTemplateDescriptor, ToolDescriptor};

/// Holds the server's tool/resource/resource-template catalogs. Every
/// registration deep-copies its descriptor (spec §4.7 "caller may free
/// theirs immediately") simply by taking the value, not a reference.
#[derive(Default)]
pub struct HandlerRegistry {
    tools: RwLock<Vec<ToolDescriptor>>,
    resources: RwLock<Vec<ResourceDescriptor>>,
    resource_templates: RwLock<Vec<ResourceTemplateDescriptor>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces (by name, in place) a tool descriptor.
    pub fn add_tool(&self, tool: ToolDescriptor) {
        let mut tools = self.tools.write();
        match tools.iter().position(|t| t.name == tool.name) {
            Some(idx) => tools[idx] = tool,
            None => tools.push(tool),
        }
    }

    /// Removes the tool named `name`. Surviving entries keep their relative
    /// order (contiguous-shift-left semantics, spec §4.7 "Registration") —
    /// `Vec::retain` already shifts in place rather than leaving a hole.
    /// Returns whether a tool was removed.
    pub fn remove_tool(&self, name: &str) -> bool {
        let mut tools = self.tools.write();
        let before = tools.len();
        tools.retain(|t| t.name != name);
        tools.len() != before
    }

    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.read().iter().find(|t| t.name == name).cloned()
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.read().clone()
    }

    pub fn add_resource(&self, resource: ResourceDescriptor) {
        let mut resources = self.resources.write();
        match resources.iter().position(|r| r.uri == resource.uri) {
            Some(idx) => resources[idx] = resource,
            None => resources.push(resource),
        }
    }

    pub fn remove_resource(&self, uri: &str) -> bool {
        let mut resources = self.resources.write();
        let before = resources.len();
        resources.retain(|r| r.uri != uri);
        resources.len() != before
    }

    #[must_use]
    pub fn find_resource(&self, uri: &str) -> Option<ResourceDescriptor> {
        self.resources.read().iter().find(|r| r.uri == uri).cloned()
    }

    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.resources.read().clone()
    }

    pub fn add_resource_template(&self, template: ResourceTemplateDescriptor) {
        let mut templates = self.resource_templates.write();
        match templates.iter().position(|t| t.uri_template == template.uri_template) {
            Some(idx) => templates[idx] = template,
            None => templates.push(template),
        }
    }

    pub fn remove_resource_template(&self, uri_template: &str) -> bool {
        let mut templates = self.resource_templates.write();
        let before = templates.len();
        templates.retain(|t| t.uri_template != uri_template);
        templates.len() != before
    }

    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        self.resource_templates.read().clone()
    }

    /// Finds the resource template, if any, registered under `uri_template`
    /// (used to associate tool names with a template-addressed resource,
    /// spec §4.7 step 3).
    #[must_use]
    pub fn find_resource_template(&self, uri_template: &str) -> Option<ResourceTemplateDescriptor> {
        self.resource_templates
            .read()
            .iter()
            .find(|t| t.uri_template == uri_template)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_tool_preserves_order_of_survivors() {
        let registry = HandlerRegistry::new();
        registry.add_tool(ToolDescriptor::new("a", ""));
        registry.add_tool(ToolDescriptor::new("b", ""));
        registry.add_tool(ToolDescriptor::new("c", ""));
        assert!(registry.remove_tool("b"));
        let names: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn add_tool_with_existing_name_replaces_in_place() {
        let registry = HandlerRegistry::new();
        registry.add_tool(ToolDescriptor::new("a", "first"));
        registry.add_tool(ToolDescriptor::new("b", ""));
        registry.add_tool(ToolDescriptor::new("a", "second"));
        let names: Vec<_> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.find_tool("a").unwrap().description, "second");
    }

    #[test]
    fn remove_tool_returns_false_when_absent() {
        let registry = HandlerRegistry::new();
        assert!(!registry.remove_tool("nope"));
    }

    #[test]
    fn find_tool_is_none_after_removal() {
        let registry = HandlerRegistry::new();
        registry.add_tool(ToolDescriptor::new("a", ""));
        registry.remove_tool("a");
        assert!(registry.find_tool("a").is_none());
    }
}
