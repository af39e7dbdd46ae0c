//! Flow configuration
//!
//! Turns a [`FlowRequest`] into a [`FlowPlan`]: classify the input files,
//! check the variant's declared options and roles (and those of any enabled
//! sub-flow), then let the variant's stage templates fill a [`GraphBuilder`].
//! Nothing is written until the caller asks for it.

mod fasm2bels;
mod nextpnr;
mod symbiflow;
mod synth;
mod vpr;

use crate::emit::Emitter;
use crate::error::{BuildError, BuildResult};
use crate::files::{FileClassifier, InputFile, Role, RoleAssignment};
use crate::graph::{BuildGraph, GraphBuilder, OverlapPolicy};
use crate::options::Options;
use crate::variant::{SubFlow, Variant};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Everything needed to configure one build
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRequest {
    /// Design name, used to name most artifacts
    pub name: String,
    /// Toplevel module
    pub toplevel: String,
    pub variant: Variant,
    pub files: Vec<InputFile>,
    pub options: Options,
}

impl FlowRequest {
    /// Create a request; the toplevel defaults to the design name
    pub fn new(name: impl Into<String>, variant: Variant) -> Self {
        let name = name.into();
        Self {
            toplevel: name.clone(),
            name,
            variant,
            files: Vec::new(),
            options: Options::new(),
        }
    }

    pub fn with_toplevel(mut self, toplevel: impl Into<String>) -> Self {
        self.toplevel = toplevel.into();
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file_type: impl Into<String>) -> Self {
        self.files.push(InputFile::new(name, file_type));
        self
    }

    pub fn with_files(mut self, files: Vec<InputFile>) -> Self {
        self.files = files;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::options::OptionValue>,
    ) -> Self {
        self.options.insert(key, value);
        self
    }
}

/// A helper script the flow references but does not render itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperScript {
    /// Template the script is rendered from
    pub template: String,
    /// Path the rendered script must be written to, relative to the work root
    pub path: String,
    /// Values the template needs
    pub params: BTreeMap<String, String>,
}

/// Result of configuring a flow
#[derive(Debug, Clone)]
pub struct FlowPlan {
    pub variant: Variant,
    pub graph: BuildGraph,
    /// Input files the flow did not consume, in supply order
    pub unused_files: Vec<InputFile>,
    /// Files the default target produces
    pub artifacts: Vec<InputFile>,
    pub helper_scripts: Vec<HelperScript>,
}

impl FlowPlan {
    pub fn default_targets(&self) -> &[String] {
        self.graph.default_targets()
    }

    /// Write the Makefile into the work root
    pub fn write(&self, work_root: &Path) -> BuildResult<PathBuf> {
        Emitter::write_graph(&self.graph, work_root)
    }
}

/// Configure a flow
pub fn configure(request: &FlowRequest) -> BuildResult<FlowPlan> {
    let variant = request.variant;

    if request.name.trim().is_empty() {
        return Err(BuildError::missing_option("name", variant));
    }

    let roles = FileClassifier::new(variant.role_rules()).classify(&request.files)?;
    variant.option_schema().validate(variant, &request.options)?;
    require_roles(variant, variant.required_roles(), &roles)?;
    let subflows = enabled_subflows(variant, &request.options, &roles)?;

    tracing::debug!(
        variant = %variant,
        files = request.files.len(),
        subflows = subflows.len(),
        "configuring flow"
    );

    let mut ctx = FlowContext::new(request, roles, subflows);
    match variant {
        Variant::Nextpnr(arch) => nextpnr::configure(arch, &mut ctx)?,
        Variant::SymbiflowNextpnr(arch) => symbiflow::configure(arch, &mut ctx)?,
        Variant::Vpr(vendor) => vpr::configure(vendor, &mut ctx)?,
    }
    ctx.finish()
}

fn require_roles(
    owner: impl std::fmt::Display,
    required: &[Role],
    roles: &RoleAssignment,
) -> BuildResult<()> {
    match required.iter().find(|role| !roles.contains(**role)) {
        Some(role) => Err(BuildError::missing_role(role, owner)),
        None => Ok(()),
    }
}

/// Sub-flows switched on by the options, validated in chain order
fn enabled_subflows(
    variant: Variant,
    options: &Options,
    roles: &RoleAssignment,
) -> BuildResult<Vec<SubFlow>> {
    let key = SubFlow::Fasm2Bels.option_key();
    if !options.get_bool(key)? {
        return Ok(Vec::new());
    }
    if !variant.supports_subflows() {
        return Err(BuildError::invalid_option(
            key,
            format!("back-annotation is not available for {}", variant),
        ));
    }

    let mut subflows = vec![SubFlow::Fasm2Bels];
    if options.get_bool_or(SubFlow::TimingSummary.option_key(), true)? {
        subflows.push(SubFlow::TimingSummary);
    }

    for subflow in &subflows {
        subflow.option_schema().validate(subflow, options)?;
        require_roles(subflow, subflow.required_roles(), roles)?;
    }
    Ok(subflows)
}

/// Map a Xilinx 7-series part to the bitstream database device
pub(crate) fn xilinx_bitstream_device(part: &str) -> BuildResult<&'static str> {
    const FAMILIES: &[(&str, &str)] = &[("xc7a", "artix7"), ("xc7z", "zynq7"), ("xc7k", "kintex7")];

    FAMILIES
        .iter()
        .find(|(prefix, _)| part.contains(prefix))
        .map(|(_, device)| *device)
        .ok_or_else(|| {
            BuildError::invalid_option(
                "part",
                format!("'{}' is not an Artix-7, Zynq-7000 or Kintex-7 part", part),
            )
        })
}

/// Shared state while a variant's templates fill the graph
pub(crate) struct FlowContext<'r> {
    request: &'r FlowRequest,
    roles: RoleAssignment,
    consumed: HashSet<Role>,
    subflows: Vec<SubFlow>,
    pub(crate) graph: GraphBuilder,
    helper_scripts: Vec<HelperScript>,
    artifacts: Vec<InputFile>,
}

impl<'r> FlowContext<'r> {
    fn new(request: &'r FlowRequest, roles: RoleAssignment, subflows: Vec<SubFlow>) -> Self {
        Self {
            request,
            roles,
            consumed: HashSet::new(),
            subflows,
            graph: GraphBuilder::new().with_overlap_policy(OverlapPolicy::Reject),
            helper_scripts: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub(crate) fn variant(&self) -> Variant {
        self.request.variant
    }

    pub(crate) fn name(&self) -> &'r str {
        &self.request.name
    }

    pub(crate) fn toplevel(&self) -> &'r str {
        &self.request.toplevel
    }

    pub(crate) fn options(&self) -> &'r Options {
        &self.request.options
    }

    pub(crate) fn subflows(&self) -> &[SubFlow] {
        &self.subflows
    }

    /// Files assigned to a role, without marking them consumed
    pub(crate) fn peek(&self, role: Role) -> &[InputFile] {
        self.roles.many(role)
    }

    /// Take the file assigned to a single-file role
    pub(crate) fn take_single(&mut self, role: Role) -> Option<String> {
        self.consumed.insert(role);
        self.roles.single(role).map(|f| f.name.clone())
    }

    /// Take a file the flow cannot do without
    pub(crate) fn require_single(&mut self, role: Role) -> BuildResult<String> {
        let variant = self.variant();
        self.take_single(role)
            .ok_or_else(|| BuildError::missing_role(role, variant))
    }

    /// Take every file assigned to a role, in supply order
    pub(crate) fn take_many(&mut self, role: Role) -> Vec<String> {
        self.consumed.insert(role);
        self.roles
            .names(role)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn helper(
        &mut self,
        template: &str,
        path: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> String {
        let path = path.into();
        self.helper_scripts.push(HelperScript {
            template: template.to_string(),
            path: path.clone(),
            params,
        });
        path
    }

    pub(crate) fn artifact(&mut self, name: impl Into<String>, file_type: &str) {
        self.artifacts.push(InputFile::new(name, file_type));
    }

    fn finish(self) -> BuildResult<FlowPlan> {
        let rules = self.request.variant.role_rules();
        let unused_files: Vec<InputFile> = self
            .request
            .files
            .iter()
            .filter(|file| {
                rules
                    .iter()
                    .find(|rule| rule.file_type == file.file_type)
                    .map_or(true, |rule| !self.consumed.contains(&rule.role))
            })
            .cloned()
            .collect();

        let graph = self.graph.build()?;
        tracing::info!(
            variant = %self.request.variant,
            stages = graph.len(),
            default = %graph.default_targets().join(" "),
            "flow configured"
        );

        Ok(FlowPlan {
            variant: self.request.variant,
            graph,
            unused_files,
            artifacts: self.artifacts,
            helper_scripts: self.helper_scripts,
        })
    }
}
