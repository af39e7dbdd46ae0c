//! Input file classification
//!
//! Every flow starts by sorting the supplied files into roles. Each variant
//! declares a [`RoleRule`] table mapping `file_type` tags onto roles; tags with
//! no rule are passed through untouched in the unused bucket so the caller can
//! hand them on to whatever consumes the flow's outputs.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A tagged input file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFile {
    /// Path to the file, as it should appear on the command line
    pub name: String,
    /// Type tag (e.g. `jsonNetlist`, `PCF`, `verilogSource`)
    pub file_type: String,
}

impl InputFile {
    /// Create a new input file
    pub fn new(name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_type: file_type.into(),
        }
    }
}

/// Constraint file formats understood by the supported toolchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstraintFormat {
    /// Gowin physical constraints
    Cst,
    /// Lattice preference file
    Lpf,
    /// Lattice Nexus physical design constraints
    Pdc,
    /// Pin constraint file
    Pcf,
    /// Xilinx design constraints
    Xdc,
    /// Quartus settings file
    Qsf,
    /// Synopsys timing constraints
    Sdc,
}

impl ConstraintFormat {
    /// Command line flag nextpnr uses for this format
    pub fn nextpnr_flag(&self) -> &'static str {
        match self {
            Self::Cst => "--cst",
            Self::Lpf => "--lpf",
            Self::Pdc => "--pdc",
            Self::Pcf => "--pcf",
            Self::Xdc => "--xdc",
            Self::Qsf => "--qsf",
            Self::Sdc => "--sdc",
        }
    }
}

impl fmt::Display for ConstraintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cst => write!(f, "CST"),
            Self::Lpf => write!(f, "LPF"),
            Self::Pdc => write!(f, "PDC"),
            Self::Pcf => write!(f, "PCF"),
            Self::Xdc => write!(f, "XDC"),
            Self::Qsf => write!(f, "QSF"),
            Self::Sdc => write!(f, "SDC"),
        }
    }
}

/// Netlist formats accepted by place-and-route
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetlistFormat {
    /// Yosys JSON netlist
    Json,
    /// FPGA interchange logical netlist
    Interchange,
}

impl NetlistFormat {
    /// The `file_type` tag for this format
    pub fn file_type(&self) -> &'static str {
        match self {
            Self::Json => "jsonNetlist",
            Self::Interchange => "fpgaInterchangeNetlist",
        }
    }
}

impl fmt::Display for NetlistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "JSON netlist"),
            Self::Interchange => write!(f, "FPGA interchange netlist"),
        }
    }
}

/// HDL source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HdlLanguage {
    Verilog,
    Vhdl,
}

/// The logical purpose a file serves within a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Constraints(ConstraintFormat),
    Netlist(NetlistFormat),
    HdlSource(HdlLanguage),
    /// Place-and-route chip database (`.bba`/`.bin`)
    ChipDb,
    /// FPGA interchange device resources
    DeviceResources,
    /// VPR routing resource graph
    RoutingGraph,
    /// VPR grid map
    PlacementGrid,
    /// Cap'n Proto schema directory marker
    Schema,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constraints(format) => write!(f, "{} constraint", format),
            Self::Netlist(format) => write!(f, "{}", format),
            Self::HdlSource(HdlLanguage::Verilog) => write!(f, "Verilog source"),
            Self::HdlSource(HdlLanguage::Vhdl) => write!(f, "VHDL source"),
            Self::ChipDb => write!(f, "chip database"),
            Self::DeviceResources => write!(f, "device resources"),
            Self::RoutingGraph => write!(f, "routing resource graph"),
            Self::PlacementGrid => write!(f, "VPR grid"),
            Self::Schema => write!(f, "capnp schema"),
        }
    }
}

/// How many files a role can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// At most one file
    Single,
    /// Any number of files, in supply order
    Many,
}

/// One row of a variant's classification table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRule {
    pub file_type: &'static str,
    pub role: Role,
    pub slot: Slot,
}

impl RoleRule {
    pub const fn single(file_type: &'static str, role: Role) -> Self {
        Self {
            file_type,
            role,
            slot: Slot::Single,
        }
    }

    pub const fn many(file_type: &'static str, role: Role) -> Self {
        Self {
            file_type,
            role,
            slot: Slot::Many,
        }
    }
}

/// Result of classifying a set of input files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignment {
    assigned: BTreeMap<Role, Vec<InputFile>>,
    unused: Vec<InputFile>,
}

impl RoleAssignment {
    /// The file assigned to a role, if any
    pub fn single(&self, role: Role) -> Option<&InputFile> {
        self.assigned.get(&role).and_then(|files| files.first())
    }

    /// All files assigned to a role, in supply order
    pub fn many(&self, role: Role) -> &[InputFile] {
        self.assigned.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// File names assigned to a role, in supply order
    pub fn names(&self, role: Role) -> Vec<&str> {
        self.many(role).iter().map(|f| f.name.as_str()).collect()
    }

    pub fn contains(&self, role: Role) -> bool {
        !self.many(role).is_empty()
    }

    /// Roles that received at least one file
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.assigned.keys().copied()
    }

    /// Files whose type tag had no rule in the table
    pub fn unused(&self) -> &[InputFile] {
        &self.unused
    }

    /// Total number of classified files, unused included
    pub fn len(&self) -> usize {
        self.assigned.values().map(Vec::len).sum::<usize>() + self.unused.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets input files into roles according to a rule table
#[derive(Debug, Clone, Copy)]
pub struct FileClassifier {
    rules: &'static [RoleRule],
}

impl FileClassifier {
    pub fn new(rules: &'static [RoleRule]) -> Self {
        Self { rules }
    }

    fn rule_for(&self, file_type: &str) -> Option<&RoleRule> {
        self.rules.iter().find(|rule| rule.file_type == file_type)
    }

    /// Classify files in supply order
    ///
    /// Fails with [`BuildError::DuplicateAssignment`] as soon as a second file
    /// lands in a [`Slot::Single`] role.
    pub fn classify(&self, files: &[InputFile]) -> BuildResult<RoleAssignment> {
        let mut assignment = RoleAssignment::default();

        for file in files {
            let Some(rule) = self.rule_for(&file.file_type) else {
                assignment.unused.push(file.clone());
                continue;
            };

            let slot = assignment.assigned.entry(rule.role).or_default();
            if rule.slot == Slot::Single {
                if let Some(first) = slot.first() {
                    return Err(BuildError::DuplicateAssignment {
                        role: rule.role.to_string(),
                        first: first.name.clone(),
                        second: file.name.clone(),
                    });
                }
            }
            slot.push(file.clone());
        }

        tracing::debug!(
            assigned = assignment.len() - assignment.unused.len(),
            unused = assignment.unused.len(),
            "classified input files"
        );

        Ok(assignment)
    }
}
