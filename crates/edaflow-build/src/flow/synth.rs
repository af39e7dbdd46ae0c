//! Yosys synthesis front end shared by the symbiflow flows
use super::FlowContext;
use crate::command::Command;
use crate::error::{BuildError, BuildResult};
use crate::files::{HdlLanguage, Role};
use std::collections::BTreeMap;

const YOSYS_TEMPLATE: &str = "yosys-script-tcl.j2";

/// Verilog sources of the design
///
/// Yosys only reads Verilog here, so any VHDL source is a format error.
pub(crate) fn verilog_sources(ctx: &mut FlowContext<'_>) -> BuildResult<Vec<String>> {
    if let Some(file) = ctx.peek(Role::HdlSource(HdlLanguage::Vhdl)).first() {
        return Err(BuildError::format_mismatch(
            ctx.variant(),
            "expected Verilog sources",
            format!("{} ({})", file.name, file.file_type),
        ));
    }
    Ok(ctx.take_many(Role::HdlSource(HdlLanguage::Verilog)))
}

/// Add the synthesis stage and return the JSON netlist it writes
pub(crate) fn yosys_json(ctx: &mut FlowContext<'_>, arch: &str) -> BuildResult<String> {
    let sources = verilog_sources(ctx)?;
    let options = ctx.options();
    let name = ctx.name();
    let netlist = format!("{}.json", name);

    let mut params = BTreeMap::new();
    params.insert("name".to_string(), name.to_string());
    params.insert("toplevel".to_string(), ctx.toplevel().to_string());
    params.insert("arch".to_string(), arch.to_string());
    params.insert("output_format".to_string(), "json".to_string());
    params.insert("sources".to_string(), sources.join(" "));
    for key in ["yosys_synth_options", "yosys_additional_commands"] {
        if let Some(value) = options.get_str(key)? {
            params.insert(key.to_string(), value);
        }
    }
    let script = ctx.helper(YOSYS_TEMPLATE, format!("{}_yosys.tcl", name), params);

    let command = Command::new("yosys")
        .arg("-l")
        .path("yosys.log")
        .arg("-p")
        .arg(format!("tcl {}", script));

    let mut inputs = sources;
    inputs.push(script);
    ctx.graph.add_stage(command, [netlist.clone()], inputs)?;
    Ok(netlist)
}
