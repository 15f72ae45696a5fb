//! Client resource module dependencies recorded by resource directives.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    Script,
    Style,
}

impl ModuleKind {
    /// `type="style"` selects a style module; any other value, or none, a script module.
    pub fn from_type_attribute(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("style") => ModuleKind::Style,
            _ => ModuleKind::Script,
        }
    }
}

/// Receives dependencies as resource directives are consumed.
pub trait DependencySink {
    fn add_script_module(&mut self, name: &str);
    fn add_style_module(&mut self, name: &str);

    fn add_module(&mut self, kind: ModuleKind, name: &str) {
        match kind {
            ModuleKind::Script => self.add_script_module(name),
            ModuleKind::Style => self.add_style_module(name),
        }
    }
}

/// Collected dependencies, in first-seen order without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleDependencies {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl ModuleDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

impl DependencySink for ModuleDependencies {
    fn add_script_module(&mut self, name: &str) {
        push_unique(&mut self.scripts, name);
    }

    fn add_style_module(&mut self, name: &str) {
        push_unique(&mut self.styles, name);
    }
}
