//! Symbiflow with nextpnr place and route
//!
//! Yosys synthesis, then either `nextpnr-xilinx` straight to FASM or the FPGA
//! interchange chain (netlist conversion, nextpnr, FASM generation plus a
//! RapidWright/Vivado check), then the Xilinx bitstream writer.

use super::fasm2bels::{self, BackAnnotation};
use super::{synth, xilinx_bitstream_device, FlowContext};
use crate::command::{Arg, Command};
use crate::error::{BuildError, BuildResult};
use crate::files::{ConstraintFormat, Role};
use crate::variant::SymbiflowArch;
use std::collections::BTreeMap;

/// Part families the interchange FASM generator knows about
const INTERCHANGE_FAMILIES: &[&str] = &["xc7"];

const SCHEMA_GUARD: &str = "ifndef INTERCHANGE_SCHEMA_PATH
$(error Environment variable INTERCHANGE_SCHEMA_PATH was not found. It should be set to <fpga-interchange-schema path>/interchange)
endif
";

const RAPIDWRIGHT_GUARD: &str = "ifndef RAPIDWRIGHT_PATH
$(error Environment variable RAPIDWRIGHT_PATH was not found. It should be set to <rapid wright path>)
endif
";

pub(crate) fn configure(arch: SymbiflowArch, ctx: &mut FlowContext<'_>) -> BuildResult<()> {
    let variant = ctx.variant();
    let options = ctx.options();
    let name = ctx.name();

    let part = options.require_str("part", variant)?;
    let package = options.require_str("package", variant)?;
    let partname = format!("{}{}", part, package);
    let family = match arch {
        SymbiflowArch::FpgaInterchange => interchange_family(&part)?,
        SymbiflowArch::Xilinx => "",
    };
    let bitstream_device = xilinx_bitstream_device(&part)?;

    let json = synth::yosys_json(ctx, "xilinx")?;
    let chipdb = ctx.require_single(Role::ChipDb)?;
    let xdc = ctx.take_many(Role::Constraints(ConstraintFormat::Xdc));

    let fasm = match arch {
        SymbiflowArch::Xilinx => xilinx_chain(ctx, &json, &chipdb, &xdc)?,
        SymbiflowArch::FpgaInterchange => {
            let chain = InterchangeChain {
                family,
                part: &part,
                package: &package,
                json: &json,
                chipdb: &chipdb,
                xdc: &xdc,
            };
            chain.add_stages(ctx)?
        }
    };

    let bitstream = format!("{}.bit", name);
    let command = Command::new("symbiflow_write_bitstream")
        .arg("-d")
        .arg(bitstream_device)
        .flag_path("-f", &fasm)
        .arg("-p")
        .arg(&partname)
        .flag_path("-b", &bitstream);
    ctx.graph
        .add_stage(command, [bitstream.clone()], [fasm])?;
    ctx.artifact(bitstream.clone(), "bitstream");

    let last = fasm2bels::configure(
        ctx,
        &BackAnnotation {
            bitstream: &bitstream,
            bitstream_device,
            partname: &partname,
            xdc: &xdc,
            route: None,
            eblif: None,
            pcf: &[],
        },
    )?;
    ctx.graph.set_default_target(last.unwrap_or(bitstream));
    Ok(())
}

fn xdc_args(xdc: &[String]) -> Vec<Arg> {
    xdc.iter()
        .flat_map(|file| [Arg::literal("--xdc"), Arg::path(file)])
        .collect()
}

fn xilinx_chain(
    ctx: &mut FlowContext<'_>,
    json: &str,
    chipdb: &str,
    xdc: &[String],
) -> BuildResult<String> {
    let name = ctx.name();
    let fasm = format!("{}.fasm", name);
    let routed = format!("{}.routed.json", name);

    let command = Command::new("nextpnr-xilinx")
        .flag_path("--chipdb", chipdb)
        .args(xdc_args(xdc))
        .flag_path("--json", json)
        .flag_path("--write", &routed)
        .flag_path("--fasm", &fasm)
        .flag_path("--log", "nextpnr.log")
        .args(ctx.options().args("nextpnr_options")?);

    let mut inputs = vec![json.to_string(), chipdb.to_string()];
    inputs.extend(xdc.iter().cloned());
    ctx.graph.add_stage(command, [fasm.clone(), routed], inputs)?;
    Ok(fasm)
}

/// Interchange family for a part, checked before the bitstream device
fn interchange_family(part: &str) -> BuildResult<&'static str> {
    INTERCHANGE_FAMILIES
        .iter()
        .copied()
        .find(|family| part.contains(family))
        .ok_or_else(|| {
            BuildError::invalid_option(
                "part",
                format!(
                    "no interchange family for '{}'. Available families: {}",
                    part,
                    INTERCHANGE_FAMILIES.join(", ")
                ),
            )
        })
}

struct InterchangeChain<'a> {
    family: &'static str,
    part: &'a str,
    package: &'a str,
    json: &'a str,
    chipdb: &'a str,
    xdc: &'a [String],
}

impl InterchangeChain<'_> {
    /// Add the interchange stages and return the FASM file they write
    fn add_stages(&self, ctx: &mut FlowContext<'_>) -> BuildResult<String> {
        let family = self.family;
        let options = ctx.options();
        let name = ctx.name();
        let device = ctx.require_single(Role::DeviceResources)?;

        let schema_dir = match options.get_str("schema_dir")? {
            Some(dir) => Arg::path(dir),
            None => {
                ctx.graph.add_header(SCHEMA_GUARD);
                Arg::raw("$(INTERCHANGE_SCHEMA_PATH)")
            }
        };
        ctx.graph.add_header(RAPIDWRIGHT_GUARD);

        let mut tcl_params = BTreeMap::new();
        tcl_params.insert("name".to_string(), name.to_string());
        tcl_params.insert("part".to_string(), self.part.to_string());
        if let Some(clocks) = options.get("clocks") {
            tcl_params.insert("clocks".to_string(), clocks.to_string());
        }
        let tcl = ctx.helper("interchange-tcl.j2", "interchange.tcl", tcl_params);
        let vivado = ctx.helper(
            "vivado-sh.j2",
            "vivado_interchange.sh",
            BTreeMap::from([("tcl".to_string(), "interchange".to_string())]),
        );

        let netlist = format!("{}.netlist", name);
        let phys = format!("{}.phys", name);
        let routed = format!("{}.routed.json", name);
        let fasm = format!("{}.fasm", name);
        let dcp = format!("{}.dcp", name);
        let timing = format!("{}.timing", name);

        let command = Command::new("python")
            .arg("-m")
            .arg("fpga_interchange.yosys_json")
            .arg("--schema_dir")
            .arg(schema_dir.clone())
            .flag_path("--device", &device)
            .arg("--top")
            .arg(ctx.toplevel())
            .path(self.json)
            .path(&netlist);
        ctx.graph.add_stage(
            command,
            [netlist.clone()],
            [self.json.to_string(), device.clone()],
        )?;

        // nextpnr wants the package without the speed grade
        let package = self.package.split('-').next().unwrap_or(self.package);
        let command = Command::new("nextpnr-fpga_interchange")
            .flag_path("--chipdb", self.chipdb)
            .arg("--package")
            .arg(package)
            .args(xdc_args(self.xdc))
            .flag_path("--netlist", &netlist)
            .flag_path("--write", &routed)
            .flag_path("--phys", &phys)
            .args(options.args("nextpnr_options")?);
        let mut inputs = vec![netlist.clone(), self.chipdb.to_string()];
        inputs.extend(self.xdc.iter().cloned());
        ctx.graph
            .add_stage(command, [phys.clone(), routed], inputs)?;

        let command = Command::new("python")
            .arg("-m")
            .arg("fpga_interchange.fasm_generator")
            .arg("--schema_dir")
            .arg(schema_dir)
            .arg("--family")
            .arg(family)
            .path(&device)
            .path(&netlist)
            .path(&phys)
            .path(&fasm);
        ctx.graph.add_stage(
            command,
            [fasm.clone()],
            [phys.clone(), netlist.clone(), device],
        )?;

        let command = Command::raw(
            "RAPIDWRIGHT_PATH=$(RAPIDWRIGHT_PATH) $(RAPIDWRIGHT_PATH)/scripts/invoke_rapidwright.sh",
        )
        .arg("com.xilinx.rapidwright.interchange.PhysicalNetlistToDcp")
        .path(&netlist)
        .path(&phys)
        .args(self.xdc.iter().map(Arg::path))
        .path(&dcp);
        let mut inputs = vec![netlist, phys];
        inputs.extend(self.xdc.iter().cloned());
        ctx.graph.add_stage(command, [dcp.clone()], inputs)?;

        let command = Command::new("bash").path(&vivado);
        ctx.graph
            .add_stage(command, [timing], [dcp, vivado, tcl])?;

        Ok(fasm)
    }
}
