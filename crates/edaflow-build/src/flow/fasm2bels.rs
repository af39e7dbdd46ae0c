//! Bitstream back-annotation and the Vivado timing summary chained off it
use super::FlowContext;
use crate::command::{Arg, Command};
use crate::error::BuildResult;
use crate::files::Role;
use crate::variant::SubFlow;
use std::collections::BTreeMap;

const TIMING_REPORT: &str = "timing_summary.rpt";

/// What the main chain hands to the back-annotation sub-flows
pub(crate) struct BackAnnotation<'a> {
    /// Bitstream written by the main chain
    pub bitstream: &'a str,
    /// Bitstream database device, e.g. `artix7`
    pub bitstream_device: &'a str,
    /// Full part name, package included
    pub partname: &'a str,
    /// Placement constraints forwarded to Vivado
    pub xdc: &'a [String],
    /// VPR routing result; nextpnr flows have none
    pub route: Option<String>,
    /// VPR synthesis netlist
    pub eblif: Option<String>,
    /// Pin constraints, VPR only
    pub pcf: &'a [String],
}

/// Add the enabled sub-flow stages and return the last output
pub(crate) fn configure(
    ctx: &mut FlowContext<'_>,
    chain: &BackAnnotation<'_>,
) -> BuildResult<Option<String>> {
    if !ctx.subflows().contains(&SubFlow::Fasm2Bels) {
        return Ok(None);
    }
    let verilog = fasm2bels_stage(ctx, chain)?;

    if !ctx.subflows().contains(&SubFlow::TimingSummary) {
        return Ok(Some(verilog));
    }
    timing_summary_stage(ctx, chain, &verilog)?;
    Ok(Some(TIMING_REPORT.to_string()))
}

fn fasm2bels_stage(ctx: &mut FlowContext<'_>, chain: &BackAnnotation<'_>) -> BuildResult<String> {
    let options = ctx.options();
    let top = ctx.toplevel();
    let dbroot = options.require_str("dbroot", SubFlow::Fasm2Bels)?;
    let rr_graph = ctx.require_single(Role::RoutingGraph)?;
    let grid = ctx.require_single(Role::PlacementGrid)?;
    let schema = ctx.require_single(Role::Schema)?;

    let verilog = format!("{}.bit.v", top);
    let xdc = format!("{}.bit.xdc", top);
    let fasm = format!("{}.bit.fasm", top);

    let mut command = Command::new("python")
        .arg("-m")
        .arg("fasm2bels")
        .flag_path("--db_root", format!("{}/{}", dbroot, chain.bitstream_device))
        .arg("--part")
        .arg(chain.partname)
        .arg("--bitread")
        .arg("bitread")
        .flag_path("--bit_file", chain.bitstream)
        .flag_path("--fasm_file", &fasm);
    if let Some(eblif) = &chain.eblif {
        command = command.flag_path("--eblif", eblif);
    }
    command = command
        .flag_path("--connection_database", "channels.db")
        .flag_path("--rr_graph", &rr_graph);
    if let Some(route) = &chain.route {
        command = command.flag_path("--route_file", route);
    }
    command = command
        .flag_path("--vpr_grid_map", &grid)
        .flag_path("--vpr_capnp_schema_dir", &schema);
    if !chain.pcf.is_empty() {
        command = command
            .arg("--pcf")
            .args(chain.pcf.iter().map(Arg::path));
    }
    command = command
        .flag_path("--verilog_file", &verilog)
        .flag_path("--xdc_file", &xdc)
        .arg(Arg::raw("&& rm channels.db"));

    let mut inputs = vec![chain.bitstream.to_string()];
    inputs.extend(chain.eblif.iter().cloned());
    inputs.extend(chain.route.iter().cloned());
    inputs.extend([rr_graph, grid, schema]);
    inputs.extend(chain.pcf.iter().cloned());

    ctx.graph
        .add_stage(command, [verilog.clone(), xdc, fasm], inputs)?;
    Ok(verilog)
}

fn timing_summary_stage(
    ctx: &mut FlowContext<'_>,
    chain: &BackAnnotation<'_>,
    verilog: &str,
) -> BuildResult<()> {
    let mut params = BTreeMap::new();
    params.insert("top".to_string(), ctx.toplevel().to_string());
    params.insert("part".to_string(), chain.partname.to_string());
    params.insert("xdc".to_string(), chain.xdc.join(" "));
    if let Some(clocks) = ctx.options().get("clocks") {
        params.insert("clocks".to_string(), clocks.to_string());
    }
    let tcl = ctx.helper("symbiflow-fasm2bels-tcl.j2", "fasm2bels.tcl", params);

    let script = ctx.helper(
        "vivado-sh.j2",
        "vivado_fasm2bels.sh",
        BTreeMap::from([("tcl".to_string(), "fasm2bels".to_string())]),
    );

    let command = Command::new("bash").path(&script);
    ctx.graph
        .add_stage(command, [TIMING_REPORT], [verilog.to_string(), script, tcl])?;
    Ok(())
}
