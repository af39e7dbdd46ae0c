//! Command graph construction and Makefile serialization
use crate::command::{Arg, Command};
use crate::error::{BuildError, BuildResult};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

const BANNER: &str = "# Auto generated by edaflow\n";
const LAUNCHER: &str = "$(EDAFLOW_LAUNCHER)";

/// Characters with no working escape in a rule line
const UNREPRESENTABLE: &[char] = &['\n', '\r', '\t', '=', ';', '\\'];

/// Escape a path for the target or prerequisite side of a rule
///
/// Spaces and make metacharacters are backslash-escaped and `$` is doubled,
/// so make tracks the same file the recipe names.
pub fn make_escape(path: &str) -> Cow<'_, str> {
    if !path.contains(|c: char| " $:#%*?[]".contains(c)) {
        return Cow::Borrowed(path);
    }
    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        match c {
            '$' => escaped.push_str("$$"),
            ' ' | ':' | '#' | '%' | '*' | '?' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn check_representable(path: &str) -> BuildResult<()> {
    match path.chars().find(|c| UNREPRESENTABLE.contains(c)) {
        Some(character) => Err(BuildError::UnrepresentablePath {
            path: path.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

fn escape_all<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    paths
        .into_iter()
        .map(make_escape)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One build rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Command run to produce the outputs
    pub command: Command,
    /// Produced artifacts; the first one is the primary output
    pub outputs: Vec<String>,
    /// Files the command depends on
    pub inputs: Vec<String>,
    /// Whether the outputs name an action rather than a file
    pub phony: bool,
}

impl Stage {
    pub fn primary_output(&self) -> &str {
        &self.outputs[0]
    }
}

/// What to do when two stages declare the same output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Accept the graph and record the overlap in [`BuildGraph::hazards`]
    #[default]
    Flag,
    /// Fail with [`BuildError::DuplicateOutput`]
    Reject,
}

/// Two stages claiming the same output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHazard {
    pub output: String,
    /// Index of the stage registered first
    pub first: usize,
    /// Index of the later stage
    pub second: usize,
}

/// Accumulates stages, variables and header text for one build request
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    header: Vec<String>,
    variables: Vec<String>,
    stages: Vec<Stage>,
    default_targets: Vec<String>,
    policy: OverlapPolicy,
}

impl GraphBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overlap policy
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append a global definition, emitted before any rule
    pub fn add_variable(&mut self, text: impl Into<String>) -> &mut Self {
        self.variables.push(text.into());
        self
    }

    /// Append raw prelude text, emitted verbatim before the variables
    pub fn add_header(&mut self, text: impl Into<String>) -> &mut Self {
        self.header.push(text.into());
        self
    }

    /// Register a rule
    pub fn add_stage<O, I>(&mut self, command: Command, outputs: O, inputs: I) -> BuildResult<()>
    where
        O: IntoIterator,
        O::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.push_stage(command, outputs, inputs, false)
    }

    /// Register a rule whose output is an action name rather than a file
    pub fn add_phony_stage<O, I>(
        &mut self,
        command: Command,
        outputs: O,
        inputs: I,
    ) -> BuildResult<()>
    where
        O: IntoIterator,
        O::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.push_stage(command, outputs, inputs, true)
    }

    fn push_stage<O, I>(
        &mut self,
        command: Command,
        outputs: O,
        inputs: I,
        phony: bool,
    ) -> BuildResult<()>
    where
        O: IntoIterator,
        O::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let outputs: Vec<String> = outputs.into_iter().map(Into::into).collect();
        if outputs.is_empty() {
            return Err(BuildError::EmptyOutputs {
                command: command.render(),
            });
        }
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        for path in outputs.iter().chain(&inputs) {
            check_representable(path)?;
        }

        self.stages.push(Stage {
            command,
            outputs,
            inputs,
            phony,
        });
        Ok(())
    }

    /// Record the default build target
    pub fn set_default_target(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_targets = vec![name.into()];
        self
    }

    /// Record several default build targets
    pub fn set_default_targets<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.default_targets = names.into_iter().map(Into::into).collect();
        self
    }

    /// Stages registered so far
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Validate and freeze the graph
    ///
    /// When no default target was set, the first output of the last stage is
    /// used.
    pub fn build(mut self) -> BuildResult<BuildGraph> {
        if self.default_targets.is_empty() {
            let Some(last) = self.stages.last() else {
                return Err(BuildError::UnknownTarget {
                    target: "all".to_string(),
                });
            };
            tracing::debug!(
                default_target = last.primary_output(),
                "no default target set, using last stage output"
            );
            self.default_targets = vec![last.primary_output().to_string()];
        }

        let mut producers: HashMap<&str, usize> = HashMap::new();
        let mut hazards = Vec::new();
        for (index, stage) in self.stages.iter().enumerate() {
            for output in &stage.outputs {
                if let Some(&first) = producers.get(output.as_str()) {
                    hazards.push(OutputHazard {
                        output: output.clone(),
                        first,
                        second: index,
                    });
                } else {
                    producers.insert(output.as_str(), index);
                }
            }
        }

        if let Some(hazard) = hazards.first() {
            if self.policy == OverlapPolicy::Reject {
                return Err(BuildError::DuplicateOutput {
                    output: hazard.output.clone(),
                    first: hazard.first,
                    second: hazard.second,
                });
            }
            for hazard in &hazards {
                tracing::warn!(
                    output = %hazard.output,
                    first = hazard.first,
                    second = hazard.second,
                    "output is produced by more than one stage"
                );
            }
        }

        for (index, stage) in self.stages.iter().enumerate() {
            for input in &stage.inputs {
                if let Some(&producer) = producers.get(input.as_str()) {
                    if producer >= index {
                        return Err(BuildError::ForwardDependency {
                            stage: stage.primary_output().to_string(),
                            input: input.clone(),
                        });
                    }
                }
            }
        }

        if let Some(target) = self
            .default_targets
            .iter()
            .find(|t| !producers.contains_key(t.as_str()))
        {
            return Err(BuildError::UnknownTarget {
                target: target.clone(),
            });
        }

        Ok(BuildGraph {
            header: self.header,
            variables: self.variables,
            stages: self.stages,
            default_targets: self.default_targets,
            hazards,
        })
    }
}

/// A validated, immutable command graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph {
    header: Vec<String>,
    variables: Vec<String>,
    stages: Vec<Stage>,
    default_targets: Vec<String>,
    hazards: Vec<OutputHazard>,
}

impl BuildGraph {
    /// Stages in emission order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn default_targets(&self) -> &[String] {
        &self.default_targets
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Output overlaps accepted under [`OverlapPolicy::Flag`]
    pub fn hazards(&self) -> &[OutputHazard] {
        &self.hazards
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Index of the first stage producing the given output
    pub fn producer_of(&self, output: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|s| s.outputs.iter().any(|o| o == output))
    }

    /// Group stages by dependency depth
    ///
    /// Stages in the same group have no dependency on each other and may be
    /// run concurrently by the executor. Groups are in build order and each
    /// group lists stage indices in ascending order.
    pub fn parallel_groups(&self) -> Vec<Vec<usize>> {
        let mut depth = vec![0usize; self.stages.len()];
        for (index, stage) in self.stages.iter().enumerate() {
            let d = stage
                .inputs
                .iter()
                .filter_map(|input| self.producer_of(input))
                .filter(|&producer| producer < index)
                .map(|producer| depth[producer] + 1)
                .max()
                .unwrap_or(0);
            depth[index] = d;
        }

        let levels = depth.iter().max().map_or(0, |d| d + 1);
        let mut groups = vec![Vec::new(); levels];
        for (index, d) in depth.into_iter().enumerate() {
            groups[d].push(index);
        }
        groups
    }

    /// Outputs a clean rule must remove: non-phony, each listed once
    fn removable_outputs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.stages
            .iter()
            .filter(|s| !s.phony)
            .flat_map(|s| s.outputs.iter())
            .filter(|o| seen.insert(o.as_str()))
            .map(String::as_str)
            .collect()
    }

    fn phony_targets(&self) -> Vec<&str> {
        let mut targets = vec!["all", "clean"];
        for output in self.stages.iter().filter(|s| s.phony).flat_map(|s| &s.outputs) {
            if !targets.contains(&output.as_str()) {
                targets.push(output);
            }
        }
        targets
    }

    /// Render the graph as a Makefile
    pub fn serialize(&self) -> String {
        let mut out = String::from(BANNER);
        out.push('\n');

        for block in &self.header {
            out.push_str(block);
            if !block.ends_with('\n') {
                out.push('\n');
            }
        }
        if !self.header.is_empty() {
            out.push('\n');
        }

        for var in &self.variables {
            out.push_str(var);
            out.push('\n');
        }
        if !self.variables.is_empty() {
            out.push('\n');
        }

        out.push_str(&format!(".PHONY: {}\n", escape_all(self.phony_targets())));
        out.push('\n');
        out.push_str(&format!(
            "all: {}\n",
            escape_all(self.default_targets.iter().map(String::as_str))
        ));

        for stage in &self.stages {
            // several real files from one recipe form a grouped target
            let separator = if stage.outputs.len() > 1 && !stage.phony {
                " &:"
            } else {
                ":"
            };
            out.push('\n');
            out.push_str(&escape_all(stage.outputs.iter().map(String::as_str)));
            out.push_str(separator);
            for input in &stage.inputs {
                out.push(' ');
                out.push_str(&make_escape(input));
            }
            out.push('\n');
            if !stage.command.is_empty() {
                out.push_str(&format!("\t{} {}\n", LAUNCHER, stage.command.render()));
            }
        }

        out.push_str("\nclean:\n");
        let removable = self.removable_outputs();
        if !removable.is_empty() {
            let paths: Vec<String> = removable
                .into_iter()
                .map(|p| Arg::path(p).render().into_owned())
                .collect();
            out.push_str(&format!("\trm -f {}\n", paths.join(" ")));
        }

        out
    }
}
