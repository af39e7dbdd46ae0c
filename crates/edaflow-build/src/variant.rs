//! Supported toolchain variants
//!
//! A variant is a combination of backend mode and target architecture. Each
//! one declares the files it understands, the option keys it requires and the
//! file roles it cannot do without; the flow modules only build stages once
//! these declarations have been checked.

use crate::error::{BuildError, BuildResult};
use crate::files::{ConstraintFormat, HdlLanguage, NetlistFormat, Role, RoleRule};
use crate::options::OptionSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// nextpnr on a pre-synthesized netlist
    Nextpnr,
    /// Symbiflow: Yosys, then nextpnr
    SymbiflowNextpnr,
    /// Symbiflow: the VPR based toolchain scripts
    SymbiflowVpr,
}

impl Backend {
    /// Parse a backend mode name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nextpnr" => Some(Self::Nextpnr),
            "symbiflow-nextpnr" => Some(Self::SymbiflowNextpnr),
            "symbiflow-vpr" | "symbiflow-vtr" => Some(Self::SymbiflowVpr),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nextpnr => "nextpnr",
            Self::SymbiflowNextpnr => "symbiflow-nextpnr",
            Self::SymbiflowVpr => "symbiflow-vpr",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Architectures supported by stand-alone nextpnr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextpnrArch {
    Ice40,
    Ecp5,
    Gowin,
    Mistral,
    Nexus,
    FpgaInterchange,
}

impl NextpnrArch {
    pub const ALL: [NextpnrArch; 6] = [
        Self::Ice40,
        Self::Ecp5,
        Self::Gowin,
        Self::Mistral,
        Self::Nexus,
        Self::FpgaInterchange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ice40 => "ice40",
            Self::Ecp5 => "ecp5",
            Self::Gowin => "gowin",
            Self::Mistral => "mistral",
            Self::Nexus => "nexus",
            Self::FpgaInterchange => "fpga_interchange",
        }
    }
}

/// Architectures of the Symbiflow nextpnr flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbiflowArch {
    Xilinx,
    FpgaInterchange,
}

impl SymbiflowArch {
    pub const ALL: [SymbiflowArch; 2] = [Self::Xilinx, Self::FpgaInterchange];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xilinx => "xilinx",
            Self::FpgaInterchange => "fpga_interchange",
        }
    }
}

/// Device vendors of the Symbiflow VPR flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Xilinx,
    Quicklogic,
}

impl Vendor {
    pub const ALL: [Vendor; 2] = [Self::Xilinx, Self::Quicklogic];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xilinx => "xilinx",
            Self::Quicklogic => "quicklogic",
        }
    }
}

/// A supported (backend, architecture) combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Nextpnr(NextpnrArch),
    SymbiflowNextpnr(SymbiflowArch),
    Vpr(Vendor),
}

const NEXTPNR_ROLES: &[RoleRule] = &[
    RoleRule::single("CST", Role::Constraints(ConstraintFormat::Cst)),
    RoleRule::single("LPF", Role::Constraints(ConstraintFormat::Lpf)),
    RoleRule::single("PDC", Role::Constraints(ConstraintFormat::Pdc)),
    RoleRule::single("PCF", Role::Constraints(ConstraintFormat::Pcf)),
    RoleRule::single("XDC", Role::Constraints(ConstraintFormat::Xdc)),
    RoleRule::single("QSF", Role::Constraints(ConstraintFormat::Qsf)),
    RoleRule::single("jsonNetlist", Role::Netlist(NetlistFormat::Json)),
    RoleRule::single(
        "fpgaInterchangeNetlist",
        Role::Netlist(NetlistFormat::Interchange),
    ),
];

const SYMBIFLOW_XILINX_ROLES: &[RoleRule] = &[
    RoleRule::many("verilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("systemVerilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("vhdlSource", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::many("vhdlSource-2008", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::single("bba", Role::ChipDb),
    RoleRule::single("device", Role::DeviceResources),
    RoleRule::many("xdc", Role::Constraints(ConstraintFormat::Xdc)),
    RoleRule::single("RRGraph", Role::RoutingGraph),
    RoleRule::single("VPRGrid", Role::PlacementGrid),
    RoleRule::single("capnp", Role::Schema),
];

// Identical to the xilinx table except that RapidWright takes exactly one XDC
const SYMBIFLOW_INTERCHANGE_ROLES: &[RoleRule] = &[
    RoleRule::many("verilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("systemVerilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("vhdlSource", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::many("vhdlSource-2008", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::single("bba", Role::ChipDb),
    RoleRule::single("device", Role::DeviceResources),
    RoleRule::single("xdc", Role::Constraints(ConstraintFormat::Xdc)),
    RoleRule::single("RRGraph", Role::RoutingGraph),
    RoleRule::single("VPRGrid", Role::PlacementGrid),
    RoleRule::single("capnp", Role::Schema),
];

const VPR_ROLES: &[RoleRule] = &[
    RoleRule::many("verilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("systemVerilogSource", Role::HdlSource(HdlLanguage::Verilog)),
    RoleRule::many("vhdlSource", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::many("vhdlSource-2008", Role::HdlSource(HdlLanguage::Vhdl)),
    RoleRule::many("SDC", Role::Constraints(ConstraintFormat::Sdc)),
    RoleRule::many("PCF", Role::Constraints(ConstraintFormat::Pcf)),
    RoleRule::many("xdc", Role::Constraints(ConstraintFormat::Xdc)),
    RoleRule::single("RRGraph", Role::RoutingGraph),
    RoleRule::single("VPRGrid", Role::PlacementGrid),
    RoleRule::single("capnp", Role::Schema),
];

impl Variant {
    /// Select a variant from its architecture and backend names
    pub fn resolve(arch: &str, backend: &str) -> BuildResult<Self> {
        let unsupported = || BuildError::UnsupportedVariant {
            arch: arch.to_string(),
            backend: backend.to_string(),
        };

        let backend = Backend::parse(backend).ok_or_else(unsupported)?;
        let arch_lower = arch.to_lowercase();
        let variant = match backend {
            Backend::Nextpnr => NextpnrArch::ALL
                .into_iter()
                .find(|a| a.name() == arch_lower)
                .map(Self::Nextpnr),
            Backend::SymbiflowNextpnr => SymbiflowArch::ALL
                .into_iter()
                .find(|a| a.name() == arch_lower)
                .map(Self::SymbiflowNextpnr),
            Backend::SymbiflowVpr => Vendor::ALL
                .into_iter()
                .find(|v| v.name() == arch_lower)
                .map(Self::Vpr),
        };

        variant.ok_or_else(unsupported)
    }

    /// Every supported variant
    pub fn all() -> Vec<Self> {
        NextpnrArch::ALL
            .into_iter()
            .map(Self::Nextpnr)
            .chain(SymbiflowArch::ALL.into_iter().map(Self::SymbiflowNextpnr))
            .chain(Vendor::ALL.into_iter().map(Self::Vpr))
            .collect()
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Nextpnr(_) => Backend::Nextpnr,
            Self::SymbiflowNextpnr(_) => Backend::SymbiflowNextpnr,
            Self::Vpr(_) => Backend::SymbiflowVpr,
        }
    }

    pub fn arch_name(&self) -> &'static str {
        match self {
            Self::Nextpnr(arch) => arch.name(),
            Self::SymbiflowNextpnr(arch) => arch.name(),
            Self::Vpr(vendor) => vendor.name(),
        }
    }

    /// Classification table for this variant
    pub fn role_rules(&self) -> &'static [RoleRule] {
        match self {
            Self::Nextpnr(_) => NEXTPNR_ROLES,
            Self::SymbiflowNextpnr(SymbiflowArch::Xilinx) => SYMBIFLOW_XILINX_ROLES,
            Self::SymbiflowNextpnr(SymbiflowArch::FpgaInterchange) => SYMBIFLOW_INTERCHANGE_ROLES,
            Self::Vpr(_) => VPR_ROLES,
        }
    }

    /// Option keys that must be present
    pub fn option_schema(&self) -> OptionSchema {
        match self {
            Self::Nextpnr(NextpnrArch::Ice40 | NextpnrArch::Ecp5) => OptionSchema::EMPTY,
            Self::Nextpnr(NextpnrArch::Gowin | NextpnrArch::Mistral | NextpnrArch::Nexus) => {
                OptionSchema::requires(&["device"])
            }
            Self::Nextpnr(NextpnrArch::FpgaInterchange) => OptionSchema::requires(&["chipdb"]),
            Self::SymbiflowNextpnr(_) | Self::Vpr(_) => {
                OptionSchema::requires(&["part", "package"])
            }
        }
    }

    /// File roles that must be filled
    ///
    /// The netlist of the nextpnr variants is checked by the flow itself so
    /// that a netlist of the wrong format is reported as such.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Self::Nextpnr(NextpnrArch::FpgaInterchange) => {
                &[Role::Constraints(ConstraintFormat::Xdc)]
            }
            Self::Nextpnr(_) => &[],
            Self::SymbiflowNextpnr(SymbiflowArch::Xilinx) => {
                &[Role::ChipDb, Role::Constraints(ConstraintFormat::Xdc)]
            }
            Self::SymbiflowNextpnr(SymbiflowArch::FpgaInterchange) => &[
                Role::ChipDb,
                Role::DeviceResources,
                Role::Constraints(ConstraintFormat::Xdc),
            ],
            Self::Vpr(_) => &[],
        }
    }

    /// Whether the variant supports the fasm2bels back-annotation sub-flow
    pub fn supports_subflows(&self) -> bool {
        !matches!(self, Self::Nextpnr(_))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.backend(), self.arch_name())
    }
}

/// Optional extensions appended after a variant's main chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubFlow {
    /// Back-annotate the bitstream into a Verilog netlist with fasm2bels
    Fasm2Bels,
    /// Vivado timing summary on the back-annotated netlist
    TimingSummary,
}

impl SubFlow {
    /// Boolean option gating the sub-flow
    pub fn option_key(&self) -> &'static str {
        match self {
            Self::Fasm2Bels => "fasm2bels",
            Self::TimingSummary => "timing_summary",
        }
    }

    pub fn option_schema(&self) -> OptionSchema {
        match self {
            Self::Fasm2Bels => OptionSchema::requires(&["dbroot"]),
            Self::TimingSummary => OptionSchema::EMPTY,
        }
    }

    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Self::Fasm2Bels => &[Role::RoutingGraph, Role::PlacementGrid, Role::Schema],
            Self::TimingSummary => &[],
        }
    }
}

impl fmt::Display for SubFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fasm2Bels => write!(f, "fasm2bels sub-flow"),
            Self::TimingSummary => write!(f, "timing summary sub-flow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_variants() {
        assert_eq!(
            Variant::resolve("ice40", "nextpnr").unwrap(),
            Variant::Nextpnr(NextpnrArch::Ice40)
        );
        assert_eq!(
            Variant::resolve("fpga_interchange", "symbiflow-nextpnr").unwrap(),
            Variant::SymbiflowNextpnr(SymbiflowArch::FpgaInterchange)
        );
        assert_eq!(
            Variant::resolve("QuickLogic", "symbiflow-vtr").unwrap(),
            Variant::Vpr(Vendor::Quicklogic)
        );
    }

    #[test]
    fn test_resolve_unknown_arch_and_backend() {
        match Variant::resolve("quicklogic", "nextpnr") {
            Err(BuildError::UnsupportedVariant { arch, backend }) => {
                assert_eq!(arch, "quicklogic");
                assert_eq!(backend, "nextpnr");
            }
            other => panic!("Expected UnsupportedVariant, got {:?}", other),
        }
        assert!(Variant::resolve("ice40", "vivado").is_err());
    }

    #[test]
    fn test_all_variants_round_trip_through_resolve() {
        for variant in Variant::all() {
            let resolved = Variant::resolve(variant.arch_name(), variant.backend().name()).unwrap();
            assert_eq!(resolved, variant);
        }
        assert_eq!(Variant::all().len(), 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Variant::Nextpnr(NextpnrArch::Gowin).to_string(),
            "nextpnr gowin"
        );
        assert_eq!(Variant::Vpr(Vendor::Xilinx).to_string(), "symbiflow-vpr xilinx");
    }
}
