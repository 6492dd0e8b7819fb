//! The exported API set.
//!
//! Building an [`ApiSet`] freezes the declarations: argument holders are
//! expanded and every authoring mistake that can be detected up front is
//! reported as a [`CliError::Configuration`].

use super::api::ApiDescriptor;
use super::holder::expand;
use super::method::{MethodDescriptor, Parameter};
use super::slot::{ArgumentDescriptor, ArgumentKind};
use crate::args::same_key;
use crate::error::{CliError, CliResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Link-time API registration collected by [`ApiSet::discover`].
///
/// ```ignore
/// inventory::submit! { cliapi::metadata::ApiExport(demo_api) }
/// ```
#[cfg(feature = "discovery")]
pub struct ApiExport(pub fn() -> ApiDescriptor);

#[cfg(feature = "discovery")]
inventory::collect!(ApiExport);

/// Frozen set of exported APIs, cheap to clone
#[derive(Debug, Clone)]
pub struct ApiSet {
    apis: Arc<Vec<Arc<ApiDescriptor>>>,
}

impl ApiSet {
    /// Validate and freeze a set of APIs.
    ///
    /// Fails when no API other than a help API is present.
    pub fn new<I>(apis: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = ApiDescriptor>,
    {
        let mut frozen: Vec<Arc<ApiDescriptor>> = Vec::new();
        for mut api in apis {
            if let Some(existing) = frozen.iter().find(|a| a.matches(api.name())) {
                return Err(CliError::configuration(format!(
                    "Duplicate API name \"{}\" ({} and {})",
                    api.name(),
                    existing.value_type(),
                    api.value_type()
                )));
            }
            prepare_api(&mut api)?;
            frozen.push(Arc::new(api));
        }

        if frozen.iter().all(|a| a.is_help_api()) {
            return Err(CliError::configuration("No CLI APIs exported"));
        }
        debug!(apis = frozen.len(), "Exported CLI APIs");
        Ok(Self {
            apis: Arc::new(frozen),
        })
    }

    /// Like [`new`](Self::new), with the built-in help API appended
    pub fn with_help_api<I>(apis: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = ApiDescriptor>,
    {
        Self::new(apis.into_iter().chain(std::iter::once(crate::help::help_api())))
    }

    /// Collect every API submitted through [`ApiExport`]. Help APIs are
    /// skipped; add one explicitly when wanted.
    #[cfg(feature = "discovery")]
    pub fn discover() -> CliResult<Self> {
        let mut apis: Vec<ApiDescriptor> = Vec::new();
        for export in inventory::iter::<ApiExport> {
            let api = (export.0)();
            if !api.is_help_api() {
                apis.push(api);
            }
        }
        apis.sort_by(|a, b| a.name().cmp(b.name()));
        Self::new(apis)
    }

    /// Number of exported APIs, help API included
    pub fn len(&self) -> usize {
        self.apis.len()
    }

    /// Always false for a built set
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    /// APIs in export order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ApiDescriptor>> {
        self.apis.iter()
    }

    /// Find an API by name, falling back to the bare type name
    pub fn get(&self, name: &str) -> Option<&Arc<ApiDescriptor>> {
        self.apis
            .iter()
            .find(|a| same_key(a.name(), name))
            .or_else(|| self.apis.iter().find(|a| a.matches(name)))
    }

    /// The first exported API
    pub fn first(&self) -> Option<&Arc<ApiDescriptor>> {
        self.apis.first()
    }

    /// The default-flagged API, else the first one
    pub fn default_api(&self) -> Option<&Arc<ApiDescriptor>> {
        self.apis
            .iter()
            .find(|a| a.is_default())
            .or_else(|| self.apis.first())
    }

    /// The designated help API, if exported
    pub fn help_api(&self) -> Option<&Arc<ApiDescriptor>> {
        self.apis.iter().find(|a| a.is_help_api())
    }

    /// API names in export order
    pub fn names(&self) -> Vec<&str> {
        self.apis.iter().map(|a| a.name()).collect()
    }
}

fn prepare_api(api: &mut ApiDescriptor) -> CliResult<()> {
    for property in &mut api.properties {
        expand(&mut property.descriptor, &mut Vec::new())?;
    }
    let api_name = api.name().to_string();
    let api_type = api.value_type();
    let api_scope: Vec<ArgumentDescriptor> = api.flatten().into_iter().cloned().collect();
    check_scope(&api_name, None, api_scope.iter())?;

    let mut seen: Vec<String> = Vec::new();
    for method in &mut api.methods {
        if seen.iter().any(|name| same_key(name, method.name())) {
            return Err(CliError::configuration(format!(
                "Duplicate method \"{}\" in API \"{api_name}\"",
                method.name()
            )));
        }
        seen.push(method.name().to_string());

        let method = Arc::make_mut(method);
        prepare_method(method)?;
        let Some(handler) = method.handler.as_ref() else {
            return Err(CliError::configuration(format!(
                "Method \"{}\" of API \"{api_name}\" has no handler",
                method.name()
            )));
        };
        if let Some(owner) = handler.owner() {
            if owner != api_type {
                return Err(CliError::configuration(format!(
                    "Method \"{}\" runs on {owner} but API \"{api_name}\" is {api_type}",
                    method.name()
                )));
            }
        }
        check_scope(&api_name, Some(method.name()), api_scope.iter().chain(method.flatten()))?;
    }
    Ok(())
}

fn prepare_method(method: &mut MethodDescriptor) -> CliResult<()> {
    for parameter in &mut method.parameters {
        if let Parameter::Argument(descriptor) = parameter {
            expand(descriptor, &mut Vec::new())?;
        }
    }
    Ok(())
}

fn check_scope<'a, I>(api: &str, method: Option<&str>, slots: I) -> CliResult<()>
where
    I: Iterator<Item = &'a ArgumentDescriptor>,
{
    let scope = match method {
        Some(method) => format!("{api} {method}"),
        None => api.to_string(),
    };
    let mut named: HashSet<String> = HashSet::new();
    for slot in slots {
        if slot.is_keyless() {
            if slot.kind() == ArgumentKind::Flag {
                return Err(CliError::configuration(format!(
                    "Flag \"{}\" of {scope} can't be keyless",
                    slot.name()
                )));
            }
        } else if !named.insert(slot.name().to_lowercase()) {
            return Err(CliError::configuration(format!(
                "Duplicate argument \"{}\" in {scope}",
                slot.name()
            )));
        }
        if let Some(produces) = slot.parser.as_ref().and_then(|p| p.produces()) {
            if produces != slot.value_type() {
                return Err(CliError::configuration(format!(
                    "Parser of argument \"{}\" in {scope} produces {produces}, expected {}",
                    slot.name(),
                    slot.value_type()
                )));
            }
        }
        if slot.parse_json && slot.is_complex() && !slot.can_json_parse() && slot.parser.is_none() {
            return Err(CliError::configuration(format!(
                "Argument \"{}\" in {scope} requests JSON parsing but {} can't be decoded",
                slot.name(),
                slot.value_type()
            )));
        }
    }
    Ok(())
}
