//! Templates and the per-chain Template Catalog
//!
//! Catalog entries are immutable. Importing one produces an
//! [`ImportedTemplate`] snapshot that the editor session owns and edits.

use std::fmt;
use std::sync::Arc;

use crate::core::request::{ChainContext, ExecutionCallback, OperationKind};
use crate::domain::argument::{Argument, ArgumentModel};
use crate::domain::chain::Chain;
use crate::domain::info::AuxiliaryInfo;

/// Builds auxiliary info for the chain an editor is connected to
pub type AuxBuilder = fn(&ChainContext) -> AuxiliaryInfo;

#[derive(Clone)]
pub enum AuxSource {
    Static(AuxiliaryInfo),
    PerChain(AuxBuilder),
}

impl AuxSource {
    fn resolve(&self, ctx: &ChainContext) -> AuxiliaryInfo {
        match self {
            AuxSource::Static(info) => info.clone(),
            AuxSource::PerChain(build) => build(ctx),
        }
    }
}

/// A named preset for one operation kind
#[derive(Clone)]
pub struct Template {
    pub kind: OperationKind,
    pub description: Option<String>,
    pub body: String,
    pub arguments: Vec<Argument>,
    pub auxiliary: AuxSource,
    pub callback: Option<Arc<dyn ExecutionCallback>>,
    pub should_sign: bool,
    pub args_adjustable: bool,
}

impl Template {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            description: None,
            body: String::new(),
            arguments: Vec::new(),
            auxiliary: AuxSource::Static(AuxiliaryInfo::default()),
            callback: None,
            should_sign: false,
            args_adjustable: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_args(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_auxiliary(mut self, info: AuxiliaryInfo) -> Self {
        self.auxiliary = AuxSource::Static(info);
        self
    }

    pub fn with_auxiliary_for(mut self, build: AuxBuilder) -> Self {
        self.auxiliary = AuxSource::PerChain(build);
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn ExecutionCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The connected wallet co-signs by default
    pub fn signing(mut self) -> Self {
        self.should_sign = true;
        self
    }

    /// Arguments may be edited but not added or removed
    pub fn fixed_shape(mut self) -> Self {
        self.args_adjustable = false;
        self
    }

    /// Copy this template into fresh live editor state
    pub fn import(&self, ctx: &ChainContext) -> ImportedTemplate {
        ImportedTemplate {
            kind: self.kind,
            description: self.description.clone(),
            body: self.body.clone(),
            arguments: ArgumentModel::new(self.arguments.clone(), self.args_adjustable),
            auxiliary: self.auxiliary.resolve(ctx),
            callback: self.callback.clone(),
            should_sign: self.should_sign,
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("arguments", &self.arguments.len())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Live editor state copied out of a template
#[derive(Clone)]
pub struct ImportedTemplate {
    pub kind: OperationKind,
    pub description: Option<String>,
    pub body: String,
    pub arguments: ArgumentModel,
    pub auxiliary: AuxiliaryInfo,
    pub callback: Option<Arc<dyn ExecutionCallback>>,
    pub should_sign: bool,
}

impl ImportedTemplate {
    /// Blank state for `kind` with no callback bound
    pub fn empty(kind: OperationKind) -> Self {
        Template::new(kind).import(&ChainContext::new(Chain::Evm))
    }
}

impl fmt::Debug for ImportedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedTemplate")
            .field("kind", &self.kind)
            .field("body", &self.body)
            .field("arguments", &self.arguments)
            .field("auxiliary", &self.auxiliary)
            .field("callback", &self.callback.is_some())
            .field("should_sign", &self.should_sign)
            .finish()
    }
}

/// Titled group of named templates, in menu order
#[derive(Debug, Clone)]
pub struct TemplateGroup {
    pub title: String,
    pub templates: Vec<(String, Template)>,
}

impl TemplateGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            templates: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, template: Template) -> Self {
        self.templates.push((name.into(), template));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|(n, _)| n.as_str())
    }
}

/// Per-chain editor defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorProfile {
    /// Kinds hidden for this chain
    pub disabled_kinds: Vec<OperationKind>,
    pub default_kind: OperationKind,
    /// Selecting one of these kinds imports its first template
    pub autoload_kinds: Vec<OperationKind>,
    /// Whether transactions accept extra signer credentials
    pub extra_signers: bool,
    /// Start with an empty body
    pub clear_body: bool,
}

impl Default for EditorProfile {
    fn default() -> Self {
        Self {
            disabled_kinds: Vec::new(),
            default_kind: OperationKind::ReadScript,
            autoload_kinds: Vec::new(),
            extra_signers: false,
            clear_body: false,
        }
    }
}

impl EditorProfile {
    pub fn is_enabled(&self, kind: OperationKind) -> bool {
        !self.disabled_kinds.contains(&kind)
    }
}

/// Static, grouped templates of one chain
#[derive(Debug, Clone)]
pub struct Catalog {
    pub chain: Chain,
    pub groups: Vec<TemplateGroup>,
    pub profile: EditorProfile,
}

impl Catalog {
    pub fn new(chain: Chain, profile: EditorProfile) -> Self {
        Self {
            chain,
            groups: Vec::new(),
            profile,
        }
    }

    pub fn with_group(mut self, group: TemplateGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn list_groups(&self) -> &[TemplateGroup] {
        &self.groups
    }

    pub fn find(&self, group: &str, name: &str) -> Option<&Template> {
        self.groups
            .iter()
            .find(|g| g.title.eq_ignore_ascii_case(group))
            .and_then(|g| g.get(name))
    }

    /// Look up `"<group>/<name>"`, or a bare name across all groups
    pub fn find_path(&self, path: &str) -> Option<&Template> {
        match path.split_once('/') {
            Some((group, name)) => self.find(group, name),
            None => self
                .groups
                .iter()
                .flat_map(|g| g.templates.iter())
                .find(|(n, _)| n == path)
                .map(|(_, t)| t),
        }
    }

    /// First template of `kind` in menu order
    pub fn first_for_kind(&self, kind: OperationKind) -> Option<&Template> {
        self.groups
            .iter()
            .flat_map(|g| g.templates.iter())
            .map(|(_, t)| t)
            .find(|t| t.kind == kind)
    }

    /// Every template as `(group, name, template)` in menu order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Template)> {
        self.groups.iter().flat_map(|g| {
            g.templates
                .iter()
                .map(move |(n, t)| (g.title.as_str(), n.as_str(), t))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::info::{InfoEntry, InfoFamily, InfoGroup};

    fn contract_info(ctx: &ChainContext) -> AuxiliaryInfo {
        AuxiliaryInfo::contract(
            InfoGroup::default().with("chain", InfoEntry::new(ctx.chain.name())),
        )
    }

    fn catalog() -> Catalog {
        Catalog::new(Chain::Evm, EditorProfile::default())
            .with_group(
                TemplateGroup::new("Transactions").with(
                    "sendEth",
                    Template::new(OperationKind::Transaction)
                        .with_args(vec![Argument::new("uint256").with_value("1")]),
                ),
            )
            .with_group(
                TemplateGroup::new("Contract").with(
                    "getValue",
                    Template::new(OperationKind::ContractCall).with_auxiliary_for(contract_info),
                ),
            )
    }

    #[test]
    fn test_import_copies_state() {
        let catalog = catalog();
        let template = catalog.find("Transactions", "sendEth").unwrap();
        let mut imported = template.import(&ChainContext::new(Chain::Evm));
        imported.arguments.set_value(0, "2").unwrap();
        assert_eq!(
            template.arguments[0].value,
            crate::domain::argument::ArgValue::from("1")
        );
    }

    #[test]
    fn test_auxiliary_resolved_against_context() {
        let catalog = catalog();
        let imported = catalog
            .find_path("contract/getValue")
            .unwrap()
            .import(&ChainContext::new(Chain::Solana));
        assert_eq!(imported.auxiliary.get(InfoFamily::Contract, "chain"), Some("solana"));
    }

    #[test]
    fn test_lookup_and_order() {
        let catalog = catalog();
        assert!(catalog.find_path("getValue").is_some());
        assert!(catalog.find_path("Transactions/missing").is_none());
        assert_eq!(
            catalog.first_for_kind(OperationKind::ContractCall).map(|t| t.kind),
            Some(OperationKind::ContractCall)
        );
        assert!(catalog.first_for_kind(OperationKind::ResourceRead).is_none());
        let names: Vec<&str> = catalog.entries().map(|(_, n, _)| n).collect();
        assert_eq!(names, vec!["sendEth", "getValue"]);
    }

    #[test]
    fn test_profile_disabled_kinds() {
        let profile = EditorProfile {
            disabled_kinds: vec![OperationKind::ReadScript, OperationKind::Transaction],
            ..EditorProfile::default()
        };
        assert!(!profile.is_enabled(OperationKind::ReadScript));
        assert!(!profile.is_enabled(OperationKind::Transaction));
        assert!(profile.is_enabled(OperationKind::SignMessage));
    }
}
