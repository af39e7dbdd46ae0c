//! Stand-alone nextpnr place and route
use super::FlowContext;
use crate::command::Command;
use crate::error::{BuildError, BuildResult};
use crate::files::{ConstraintFormat, NetlistFormat, Role};
use crate::variant::NextpnrArch;

/// Target artifact written by each architecture
struct ArchOutput {
    extension: &'static str,
    flag: &'static str,
    file_type: &'static str,
    constraints: ConstraintFormat,
    needs_device: bool,
}

fn arch_output(arch: NextpnrArch) -> ArchOutput {
    match arch {
        NextpnrArch::Ice40 => ArchOutput {
            extension: "asc",
            flag: "--asc",
            file_type: "iceboxAscii",
            constraints: ConstraintFormat::Pcf,
            needs_device: false,
        },
        NextpnrArch::Ecp5 => ArchOutput {
            extension: "config",
            flag: "--textcfg",
            file_type: "trellisConfig",
            constraints: ConstraintFormat::Lpf,
            needs_device: false,
        },
        NextpnrArch::Gowin => ArchOutput {
            extension: "pack",
            flag: "--write",
            file_type: "gowinPack",
            constraints: ConstraintFormat::Cst,
            needs_device: true,
        },
        NextpnrArch::Mistral => ArchOutput {
            extension: "rbf",
            flag: "--rbf",
            file_type: "rbf",
            constraints: ConstraintFormat::Qsf,
            needs_device: true,
        },
        NextpnrArch::Nexus => ArchOutput {
            extension: "fasm",
            flag: "--fasm",
            file_type: "fasm",
            constraints: ConstraintFormat::Pdc,
            needs_device: true,
        },
        NextpnrArch::FpgaInterchange => ArchOutput {
            extension: "phys",
            flag: "--phys",
            file_type: "fpgaInterchangePhysicalNetlist",
            constraints: ConstraintFormat::Xdc,
            needs_device: false,
        },
    }
}

/// Name of the phony target opening the nextpnr GUI
pub(crate) const GUI_TARGET: &str = "build-gui";

pub(crate) fn configure(arch: NextpnrArch, ctx: &mut FlowContext<'_>) -> BuildResult<()> {
    let variant = ctx.variant();
    let options = ctx.options();
    let output = arch_output(arch);
    let target = format!("{}.{}", ctx.name(), output.extension);

    let expected = if arch == NextpnrArch::FpgaInterchange {
        NetlistFormat::Interchange
    } else {
        NetlistFormat::Json
    };
    let netlist = select_netlist(ctx, expected)?;
    let mut inputs = vec![netlist.clone()];

    let mut command = Command::new(format!("nextpnr-{}", arch.name()))
        .arg("-l")
        .path("next.log");
    if output.needs_device {
        command = command
            .arg("--device")
            .arg(options.require_str("device", variant)?);
    }
    command = command.args(options.args("nextpnr_options")?);

    if let Some(constraints) = ctx.take_single(Role::Constraints(output.constraints)) {
        command = command.flag_path(output.constraints.nextpnr_flag(), &constraints);
        inputs.push(constraints);
    }

    if arch == NextpnrArch::FpgaInterchange {
        let chipdb = options.require_str("chipdb", variant)?;
        command = command
            .flag_path("--netlist", &netlist)
            .flag_path("--chipdb", &chipdb);
        inputs.push(chipdb);
    } else {
        command = command.flag_path("--json", &netlist);
    }

    if let Some(package) = options.get_str("package")? {
        command = command.arg("--package").arg(package);
    }
    command = command.flag_path(output.flag, &target);

    ctx.graph
        .add_stage(command.clone(), [target.clone()], inputs.clone())?;
    ctx.graph
        .add_phony_stage(command.arg("--gui"), [GUI_TARGET], inputs)?;

    if options.get_bool("gui")? {
        ctx.graph.set_default_target(GUI_TARGET);
    } else {
        ctx.graph.set_default_target(target.clone());
        ctx.artifact(target, output.file_type);
    }
    Ok(())
}

/// Pick the netlist, rejecting one of the wrong format or two competing ones
fn select_netlist(ctx: &mut FlowContext<'_>, expected: NetlistFormat) -> BuildResult<String> {
    let variant = ctx.variant();
    let json = ctx.peek(Role::Netlist(NetlistFormat::Json)).first().cloned();
    let interchange = ctx
        .peek(Role::Netlist(NetlistFormat::Interchange))
        .first()
        .cloned();
    ctx.take_single(Role::Netlist(NetlistFormat::Json));
    ctx.take_single(Role::Netlist(NetlistFormat::Interchange));

    let describe = |f: &crate::files::InputFile| format!("{} ({})", f.name, f.file_type);

    match (json, interchange) {
        (Some(a), Some(b)) => Err(BuildError::format_mismatch(
            variant,
            describe(&a),
            describe(&b),
        )),
        (Some(file), None) | (None, Some(file)) => {
            if file.file_type == expected.file_type() {
                Ok(file.name)
            } else {
                Err(BuildError::format_mismatch(
                    variant,
                    format!("expected {}", expected.file_type()),
                    describe(&file),
                ))
            }
        }
        (None, None) => Err(BuildError::missing_role(Role::Netlist(expected), variant)),
    }
}
