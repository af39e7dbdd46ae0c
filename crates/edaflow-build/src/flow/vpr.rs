//! Symbiflow with VPR place and route
use super::fasm2bels::{self, BackAnnotation};
use super::{synth, xilinx_bitstream_device, FlowContext};
use crate::command::{Arg, Command};
use crate::error::BuildResult;
use crate::files::{ConstraintFormat, Role};
use crate::variant::Vendor;

/// Device naming derived from the part and package options
#[derive(Debug, PartialEq, Eq)]
struct DeviceNames {
    /// Part as the architecture database knows it
    db_part: String,
    /// Name passed to the tools' `-P` / `-p` part flags
    partname: String,
    /// VPR device, `<db_part>_<suffix>`
    device: String,
    bitstream_device: String,
}

impl DeviceNames {
    fn new(vendor: Vendor, part: &str, package: &str) -> BuildResult<Self> {
        Ok(match vendor {
            Vendor::Xilinx => {
                // the a35t is an a50t die; only the database lookup is remapped
                let db_part = if part == "xc7a35t" { "xc7a50t" } else { part };
                Self {
                    db_part: db_part.to_string(),
                    partname: format!("{}{}", part, package),
                    device: format!("{}_test", db_part),
                    bitstream_device: xilinx_bitstream_device(part)?.to_string(),
                }
            }
            Vendor::Quicklogic => Self {
                db_part: part.to_string(),
                partname: package.to_string(),
                device: format!("{}_wlcsp", part),
                bitstream_device: format!("{}_wlcsp", part),
            },
        })
    }
}

/// `<flag> file...`, or nothing when there are no files
fn file_args(flag: &str, files: &[String]) -> Vec<Arg> {
    if files.is_empty() {
        return Vec::new();
    }
    std::iter::once(Arg::literal(flag))
        .chain(files.iter().map(Arg::path))
        .collect()
}

pub(crate) fn configure(vendor: Vendor, ctx: &mut FlowContext<'_>) -> BuildResult<()> {
    let variant = ctx.variant();
    let options = ctx.options();
    let top = ctx.toplevel();

    let part = options.require_str("part", variant)?;
    let package = options.require_str("package", variant)?;
    let names = DeviceNames::new(vendor, &part, &package)?;

    let sources = synth::verilog_sources(ctx)?;
    let sdc = ctx.take_many(Role::Constraints(ConstraintFormat::Sdc));
    let pcf = ctx.take_many(Role::Constraints(ConstraintFormat::Pcf));
    let xdc = ctx.take_many(Role::Constraints(ConstraintFormat::Xdc));

    let vpr_options: Vec<Arg> = match options.get_str("vpr_options")? {
        Some(opts) => vec![Arg::literal("--additional_vpr_options"), Arg::literal(opts)],
        None => Vec::new(),
    };
    let sdc_args = file_args("-s", &sdc);
    let pcf_args = file_args("-p", &pcf);

    ctx.graph
        .add_variable(format!("export EDALIZE_VENDOR={}", vendor.name()))
        .add_variable(format!("export EDALIZE_PART={}", names.db_part));

    let eblif = format!("{}.eblif", top);
    let net = format!("{}.net", top);
    let place = format!("{}.place", top);
    let route = format!("{}.route", top);
    let fasm = format!("{}.fasm", top);
    let bit = format!("{}.bit", top);

    // symbiflow_synth expects a bare -p when there is no pin constraint
    let synth_pcf = if pcf.is_empty() {
        vec![Arg::literal("-p")]
    } else {
        pcf_args.clone()
    };
    let mut command = Command::new("symbiflow_synth")
        .arg("-t")
        .arg(top)
        .arg("-v")
        .args(sources.iter().map(Arg::path))
        .arg("-d")
        .arg(&names.bitstream_device)
        .args(synth_pcf)
        .arg("-P")
        .arg(&names.partname);
    if vendor == Vendor::Quicklogic {
        command = command.args(pcf_args.clone());
    }
    command = command.args(file_args("-x", &xdc));
    let inputs = sources.iter().chain(&pcf).chain(&xdc).cloned();
    ctx.graph.add_stage(command, [eblif.clone()], inputs)?;

    let pnr = |tool: &str| {
        Command::new(tool)
            .flag_path("-e", &eblif)
            .arg("-d")
            .arg(&names.device)
    };
    let with_sdc = |first: &str| -> Vec<String> {
        [first.to_string(), eblif.clone()]
            .into_iter()
            .chain(sdc.iter().cloned())
            .collect()
    };

    let command = pnr("symbiflow_pack")
        .args(sdc_args.clone())
        .args(vpr_options.clone());
    ctx.graph.add_stage(
        command,
        [net.clone()],
        std::iter::once(eblif.clone()).chain(sdc.iter().cloned()),
    )?;

    let command = pnr("symbiflow_place")
        .flag_path("-n", &net)
        .arg("-P")
        .arg(&names.partname)
        .args(sdc_args.clone())
        .args(pcf_args)
        .args(vpr_options.clone());
    let mut inputs = with_sdc(net.as_str());
    inputs.extend(pcf.iter().cloned());
    ctx.graph.add_stage(command, [place.clone()], inputs)?;

    let command = pnr("symbiflow_route")
        .args(sdc_args.clone())
        .args(vpr_options.clone());
    ctx.graph
        .add_stage(command, [route.clone()], with_sdc(place.as_str()))?;

    let command = pnr("symbiflow_write_fasm")
        .args(sdc_args)
        .args(vpr_options);
    ctx.graph
        .add_stage(command, [fasm.clone()], with_sdc(route.as_str()))?;

    let part_flag = match vendor {
        Vendor::Xilinx => "-p",
        Vendor::Quicklogic => "-P",
    };
    let command = Command::new("symbiflow_write_bitstream")
        .arg("-d")
        .arg(&names.bitstream_device)
        .flag_path("-f", &fasm)
        .arg(part_flag)
        .arg(&names.partname)
        .flag_path("-b", &bit);
    ctx.graph.add_stage(command, [bit.clone()], [fasm])?;

    let last = fasm2bels::configure(
        ctx,
        &BackAnnotation {
            bitstream: &bit,
            bitstream_device: &names.bitstream_device,
            partname: &names.partname,
            xdc: &xdc,
            route: Some(route),
            eblif: Some(eblif),
            pcf: &pcf,
        },
    )?;

    match vendor {
        Vendor::Xilinx => {
            ctx.artifact(bit.clone(), "bitstream");
            ctx.graph.set_default_target(last.unwrap_or(bit));
        }
        // the programming files stay defaults; the sub-flow output joins them
        Vendor::Quicklogic => {
            let mut defaults = quicklogic_outputs(ctx, &bit)?;
            defaults.extend(last);
            ctx.graph.set_default_targets(defaults);
        }
    }
    Ok(())
}

/// Binary, C header and debugger files written from the bitstream
///
/// Returns the files built by default; the J-Link script is only built on
/// request.
fn quicklogic_outputs(ctx: &mut FlowContext<'_>, bit: &str) -> BuildResult<Vec<String>> {
    const WRITERS: &[(&str, &str, &str)] = &[
        ("symbiflow_write_binary", "bin", "binary"),
        ("symbiflow_write_bitheader", "h", "cHeader"),
        ("symbiflow_write_openocd", "openocd.cfg", "openocdConfig"),
        ("symbiflow_write_jlink", "jlink", "jlinkScript"),
    ];

    let top = ctx.toplevel();
    let mut defaults = Vec::new();
    for &(tool, extension, file_type) in WRITERS {
        let target = format!("{}.{}", top, extension);
        let command = Command::new(tool).path(bit).path(&target);
        ctx.graph
            .add_stage(command, [target.clone()], [bit.to_string()])?;
        if extension != "jlink" {
            ctx.artifact(target.clone(), file_type);
            defaults.push(target);
        }
    }
    Ok(defaults)
}
