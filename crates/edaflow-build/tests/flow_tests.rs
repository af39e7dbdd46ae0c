//! End-to-end flow configuration
//!
//! Drives `configure` for every variant and checks the resulting graphs

use edaflow_build::{
    configure, BuildError, FlowPlan, FlowRequest, InputFile, NextpnrArch, OptionValue, Options, Variant,
    Vendor, MAKEFILE_NAME,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashSet;
use std::fs;

/// The smallest request each variant accepts
fn minimal(arch: &str, backend: &str) -> FlowRequest {
    let variant = Variant::resolve(arch, backend).unwrap();
    let request = FlowRequest::new("blinky", variant);
    match variant {
        Variant::Nextpnr(NextpnrArch::FpgaInterchange) => request
            .with_file("blinky.netlist", "fpgaInterchangeNetlist")
            .with_file("arty.xdc", "XDC")
            .with_option("chipdb", "xc7a35t.bin"),
        Variant::Nextpnr(NextpnrArch::Ice40 | NextpnrArch::Ecp5) => {
            request.with_file("blinky.json", "jsonNetlist")
        }
        Variant::Nextpnr(_) => request
            .with_file("blinky.json", "jsonNetlist")
            .with_option("device", "GW1N-LV1QN48C6/I5"),
        Variant::SymbiflowNextpnr(_) => request
            .with_file("blinky.v", "verilogSource")
            .with_file("xc7a35t.bin", "bba")
            .with_file("xc7a35t.device", "device")
            .with_file("arty.xdc", "xdc")
            .with_option("part", "xc7a35t")
            .with_option("package", "csg324-1"),
        Variant::Vpr(Vendor::Quicklogic) => request
            .with_file("blinky.v", "verilogSource")
            .with_option("part", "ql-eos-s3")
            .with_option("package", "PD64"),
        Variant::Vpr(Vendor::Xilinx) => request
            .with_file("blinky.v", "verilogSource")
            .with_option("part", "xc7a35t")
            .with_option("package", "csg324-1"),
    }
}

fn with_fasm2bels(request: FlowRequest) -> FlowRequest {
    request
        .with_file("rr_graph.bin", "RRGraph")
        .with_file("grid.xml", "VPRGrid")
        .with_file("schema", "capnp")
        .with_option("fasm2bels", true)
        .with_option("dbroot", "/opt/prjxray-db")
}

/// Every file `make all` builds, following producers back from the defaults
fn built_by_default(plan: &FlowPlan) -> HashSet<String> {
    let mut built = HashSet::new();
    let mut pending: Vec<String> = plan.default_targets().to_vec();
    while let Some(target) = pending.pop() {
        let Some(index) = plan.graph.producer_of(&target) else {
            continue;
        };
        let stage = &plan.graph.stages()[index];
        for output in &stage.outputs {
            built.insert(output.clone());
        }
        pending.extend(stage.inputs.iter().filter(|i| !built.contains(*i)).cloned());
    }
    built
}

#[test]
fn test_direct_nextpnr_primary_and_gui_stage() {
    let request = FlowRequest::new("blinky", Variant::resolve("ice40", "nextpnr").unwrap())
        .with_file("pins.pcf", "PCF")
        .with_file("blinky.json", "jsonNetlist");

    let plan = configure(&request).unwrap();
    let stages = plan.graph.stages();
    assert_eq!(stages.len(), 2);

    let (primary, gui) = (&stages[0], &stages[1]);
    assert_eq!(primary.outputs, vec!["blinky.asc"]);
    assert!(!primary.phony);
    assert_eq!(gui.outputs, vec!["build-gui"]);
    assert!(gui.phony);
    assert_eq!(primary.inputs, gui.inputs);
    assert_eq!(&gui.command.tokens()[..primary.command.tokens().len()], primary.command.tokens());
    assert_eq!(plan.default_targets(), ["blinky.asc"]);
    assert_eq!(plan.artifacts, vec![InputFile::new("blinky.asc", "iceboxAscii")]);
}

#[test]
fn test_direct_nextpnr_makefile() {
    let options: Options = [
        ("package", OptionValue::from("sg48")),
        ("nextpnr_options", OptionValue::from(vec!["--up5k"])),
    ]
    .into_iter()
    .collect();
    let request = FlowRequest::new("blinky", Variant::resolve("ice40", "nextpnr").unwrap())
        .with_file("blinky.json", "jsonNetlist")
        .with_file("pins.pcf", "PCF")
        .with_options(options);

    let plan = configure(&request).unwrap();
    let expected = "\
# Auto generated by edaflow

.PHONY: all clean build-gui

all: blinky.asc

blinky.asc: blinky.json pins.pcf
\t$(EDAFLOW_LAUNCHER) nextpnr-ice40 -l next.log --up5k --pcf pins.pcf --json blinky.json --package sg48 --asc blinky.asc

build-gui: blinky.json pins.pcf
\t$(EDAFLOW_LAUNCHER) nextpnr-ice40 -l next.log --up5k --pcf pins.pcf --json blinky.json --package sg48 --asc blinky.asc --gui

clean:
\trm -f blinky.asc
";
    assert_eq!(plan.graph.serialize(), expected);
}

#[test]
fn test_gui_option_selects_gui_target() {
    let request = minimal("ice40", "nextpnr").with_option("gui", true);
    let plan = configure(&request).unwrap();

    assert_eq!(plan.default_targets(), ["build-gui"]);
    assert!(plan.artifacts.is_empty());
}

#[test]
fn test_missing_device_is_reported() {
    let request = FlowRequest::new("blinky", Variant::resolve("gowin", "nextpnr").unwrap())
        .with_file("blinky.json", "jsonNetlist");

    match configure(&request) {
        Err(BuildError::MissingOption { key, variant }) => {
            assert_eq!(key, "device");
            assert_eq!(variant, "nextpnr gowin");
        }
        other => panic!("Expected MissingOption, got {:?}", other),
    }
}

#[test]
fn test_device_is_passed_to_nextpnr() {
    let plan = configure(&minimal("nexus", "nextpnr")).unwrap();
    let command = plan.graph.stages()[0].command.render();
    assert!(command.contains("--device GW1N-LV1QN48C6/I5"), "{}", command);
    assert!(command.ends_with("--fasm blinky.fasm"), "{}", command);
}

#[test]
fn test_missing_netlist_is_reported() {
    let request = FlowRequest::new("blinky", Variant::resolve("ecp5", "nextpnr").unwrap())
        .with_file("pins.lpf", "LPF");

    match configure(&request) {
        Err(BuildError::MissingRole { role, .. }) => assert_eq!(role, "JSON netlist"),
        other => panic!("Expected MissingRole, got {:?}", other),
    }
}

#[test]
fn test_conflicting_netlists_name_both_files() {
    let request = minimal("ice40", "nextpnr").with_file("blinky.netlist", "fpgaInterchangeNetlist");

    match configure(&request) {
        Err(BuildError::FormatMismatch { first, second, .. }) => {
            assert_eq!(first, "blinky.json (jsonNetlist)");
            assert_eq!(second, "blinky.netlist (fpgaInterchangeNetlist)");
        }
        other => panic!("Expected FormatMismatch, got {:?}", other),
    }
}

#[test]
fn test_wrong_netlist_format_names_expected_format() {
    let request = FlowRequest::new("blinky", Variant::resolve("ice40", "nextpnr").unwrap())
        .with_file("blinky.netlist", "fpgaInterchangeNetlist");

    match configure(&request) {
        Err(BuildError::FormatMismatch { first, second, .. }) => {
            assert_eq!(first, "expected jsonNetlist");
            assert_eq!(second, "blinky.netlist (fpgaInterchangeNetlist)");
        }
        other => panic!("Expected FormatMismatch, got {:?}", other),
    }
}

#[test]
fn test_interchange_netlist_is_used() {
    let plan = configure(&minimal("fpga_interchange", "nextpnr")).unwrap();
    let primary = &plan.graph.stages()[0];

    assert_eq!(
        primary.command.render(),
        "nextpnr-fpga_interchange -l next.log --xdc arty.xdc --netlist blinky.netlist \
         --chipdb xc7a35t.bin --phys blinky.phys"
    );
    assert_eq!(primary.inputs, vec!["blinky.netlist", "arty.xdc", "xc7a35t.bin"]);
}

#[test]
fn test_interchange_requires_xdc() {
    let request = FlowRequest::new("blinky", Variant::resolve("fpga_interchange", "nextpnr").unwrap())
        .with_file("blinky.netlist", "fpgaInterchangeNetlist")
        .with_option("chipdb", "xc7a35t.bin");

    match configure(&request) {
        Err(BuildError::MissingRole { role, .. }) => assert_eq!(role, "XDC constraint"),
        other => panic!("Expected MissingRole, got {:?}", other),
    }
}

#[test]
fn test_unconsumed_files_are_returned_in_order() {
    let request = minimal("ice40", "nextpnr")
        .with_file("README.md", "text")
        .with_file("pins.lpf", "LPF");

    let plan = configure(&request).unwrap();
    assert_eq!(
        plan.unused_files,
        vec![
            InputFile::new("README.md", "text"),
            InputFile::new("pins.lpf", "LPF"),
        ]
    );
}

#[rstest]
#[case("ice40", "nextpnr", &["blinky.asc"])]
#[case("ecp5", "nextpnr", &["blinky.config"])]
#[case("gowin", "nextpnr", &["blinky.pack"])]
#[case("mistral", "nextpnr", &["blinky.rbf"])]
#[case("nexus", "nextpnr", &["blinky.fasm"])]
#[case("fpga_interchange", "nextpnr", &["blinky.phys"])]
#[case("xilinx", "symbiflow-nextpnr", &["blinky.bit"])]
#[case("fpga_interchange", "symbiflow-nextpnr", &["blinky.bit"])]
#[case("xilinx", "symbiflow-vpr", &["blinky.bit"])]
#[case("quicklogic", "symbiflow-vtr", &["blinky.bin", "blinky.h", "blinky.openocd.cfg"])]
fn test_default_target_is_final_artifact(
    #[case] arch: &str,
    #[case] backend: &str,
    #[case] expected: &[&str],
) {
    let plan = configure(&minimal(arch, backend)).unwrap();

    assert_eq!(plan.default_targets(), expected);
    for target in expected {
        assert!(plan.graph.producer_of(target).is_some());
        assert!(plan.artifacts.iter().any(|a| a.name == *target));
    }
    assert!(plan.graph.hazards().is_empty());
}

#[rstest]
#[case("xilinx", "symbiflow-nextpnr", &["blinky.bit.v"])]
#[case("xilinx", "symbiflow-vpr", &["timing_summary.rpt"])]
#[case(
    "quicklogic",
    "symbiflow-vpr",
    &["blinky.bin", "blinky.h", "blinky.openocd.cfg", "timing_summary.rpt"]
)]
fn test_default_target_with_fasm2bels(
    #[case] arch: &str,
    #[case] backend: &str,
    #[case] expected: &[&str],
) {
    let mut request = with_fasm2bels(minimal(arch, backend));
    if backend == "symbiflow-nextpnr" {
        request = request.with_option("timing_summary", false);
    }
    let plan = configure(&request).unwrap();

    assert_eq!(plan.default_targets(), expected);
    let built = built_by_default(&plan);
    for artifact in &plan.artifacts {
        assert!(built.contains(&artifact.name), "{} is not built by make all", artifact.name);
    }
}

#[test]
fn test_vpr_makefile_escapes_source_names() {
    let request = FlowRequest::new("blinky", Variant::resolve("xilinx", "symbiflow-vpr").unwrap())
        .with_file("my top.v", "verilogSource")
        .with_file("a$b.v", "verilogSource")
        .with_option("part", "xc7a35t")
        .with_option("package", "csg324-1");
    let text = configure(&request).unwrap().graph.serialize();

    assert!(text.contains("\nblinky.eblif: my\\ top.v a$$b.v"), "{}", text);
    assert!(text.contains("-v 'my top.v' 'a$$b.v'"), "{}", text);
}

#[test]
fn test_multi_output_stages_are_grouped() {
    let plan = configure(&with_fasm2bels(minimal("xilinx", "symbiflow-vpr"))).unwrap();
    let text = plan.graph.serialize();

    assert!(
        text.contains("\nblinky.bit.v blinky.bit.xdc blinky.bit.fasm &: blinky.bit "),
        "{}",
        text
    );
    for stage in plan.graph.stages().iter().filter(|s| s.outputs.len() > 1) {
        let rule = format!("\n{} &:", stage.outputs.join(" "));
        assert!(text.contains(&rule), "{}", rule);
    }
}

#[rstest]
#[case("xilinx", "symbiflow-nextpnr")]
#[case("xilinx", "symbiflow-vpr")]
fn test_fasm2bels_requires_dbroot(#[case] arch: &str, #[case] backend: &str) {
    let request = minimal(arch, backend).with_option("fasm2bels", true);

    match configure(&request) {
        Err(BuildError::MissingOption { key, variant }) => {
            assert_eq!(key, "dbroot");
            assert_eq!(variant, "fasm2bels sub-flow");
        }
        other => panic!("Expected MissingOption, got {:?}", other),
    }
}

#[test]
fn test_fasm2bels_requires_routing_graph() {
    let request = minimal("xilinx", "symbiflow-vpr")
        .with_option("fasm2bels", true)
        .with_option("dbroot", "/opt/prjxray-db");

    match configure(&request) {
        Err(BuildError::MissingRole { role, .. }) => assert_eq!(role, "routing resource graph"),
        other => panic!("Expected MissingRole, got {:?}", other),
    }
}

#[test]
fn test_disabled_subflow_needs_nothing() {
    let request = minimal("xilinx", "symbiflow-vpr").with_option("fasm2bels", false);
    let plan = configure(&request).unwrap();
    assert_eq!(plan.default_targets(), ["blinky.bit"]);
}

#[test]
fn test_subflows_extend_the_chain() {
    let plan = configure(&with_fasm2bels(minimal("xilinx", "symbiflow-vpr"))).unwrap();
    let stages = plan.graph.stages();

    let fasm2bels = &stages[stages.len() - 2];
    assert_eq!(
        fasm2bels.outputs,
        vec!["blinky.bit.v", "blinky.bit.xdc", "blinky.bit.fasm"]
    );
    assert_eq!(&fasm2bels.inputs[..3], ["blinky.bit", "blinky.eblif", "blinky.route"]);
    assert!(fasm2bels
        .command
        .render()
        .ends_with("--xdc_file blinky.bit.xdc && rm channels.db"));

    let timing = &stages[stages.len() - 1];
    assert_eq!(timing.outputs, vec!["timing_summary.rpt"]);
    assert_eq!(timing.command.render(), "bash vivado_fasm2bels.sh");
    assert_eq!(plan.default_targets(), ["timing_summary.rpt"]);

    let scripts: Vec<&str> = plan.helper_scripts.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(scripts, ["fasm2bels.tcl", "vivado_fasm2bels.sh"]);
}

#[test]
fn test_timing_summary_can_be_disabled() {
    let request = with_fasm2bels(minimal("xilinx", "symbiflow-nextpnr"))
        .with_option("timing_summary", false);
    let plan = configure(&request).unwrap();

    assert_eq!(plan.default_targets(), ["blinky.bit.v"]);
    let fasm2bels = plan.graph.stages().last().unwrap();
    assert!(!fasm2bels.command.render().contains("--route_file"));
    assert_eq!(fasm2bels.inputs[0], "blinky.bit");
}

#[test]
fn test_fasm2bels_not_offered_by_direct_nextpnr() {
    let request = minimal("ice40", "nextpnr").with_option("fasm2bels", true);

    match configure(&request) {
        Err(BuildError::InvalidOption { key, .. }) => assert_eq!(key, "fasm2bels"),
        other => panic!("Expected InvalidOption, got {:?}", other),
    }
}

#[test]
fn test_vhdl_rejected_by_yosys_flows() {
    let request = minimal("xilinx", "symbiflow-vpr").with_file("core.vhd", "vhdlSource");

    match configure(&request) {
        Err(BuildError::FormatMismatch { second, .. }) => {
            assert_eq!(second, "core.vhd (vhdlSource)")
        }
        other => panic!("Expected FormatMismatch, got {:?}", other),
    }
}

#[test]
fn test_vpr_xilinx_naming() {
    let request = minimal("xilinx", "symbiflow-vpr")
        .with_file("timing.sdc", "SDC")
        .with_option("vpr_options", "--seed 3");
    let plan = configure(&request).unwrap();

    assert_eq!(
        plan.graph.variables(),
        ["export EDALIZE_VENDOR=xilinx", "export EDALIZE_PART=xc7a50t"]
    );
    let stages = plan.graph.stages();
    assert_eq!(
        stages[0].command.render(),
        "symbiflow_synth -t blinky -v blinky.v -d artix7 -p -P xc7a35tcsg324-1"
    );
    assert_eq!(
        stages[1].command.render(),
        "symbiflow_pack -e blinky.eblif -d xc7a50t_test -s timing.sdc \
         --additional_vpr_options '--seed 3'"
    );
    assert_eq!(
        stages[5].command.render(),
        "symbiflow_write_bitstream -d artix7 -f blinky.fasm -p xc7a35tcsg324-1 -b blinky.bit"
    );
}

#[test]
fn test_vpr_quicklogic_repeats_pin_constraints() {
    let request = minimal("quicklogic", "symbiflow-vpr").with_file("pins.pcf", "PCF");
    let plan = configure(&request).unwrap();
    let stages = plan.graph.stages();

    assert_eq!(
        stages[0].command.render(),
        "symbiflow_synth -t blinky -v blinky.v -d ql-eos-s3_wlcsp -p pins.pcf -P PD64 -p pins.pcf"
    );
    assert!(stages[5].command.render().contains("-P PD64"));

    let outputs: Vec<&str> = stages.iter().map(|s| s.primary_output()).collect();
    assert_eq!(
        &outputs[6..],
        ["blinky.bin", "blinky.h", "blinky.openocd.cfg", "blinky.jlink"]
    );
}

#[test]
fn test_vpr_outputs_follow_toplevel() {
    let request = minimal("xilinx", "symbiflow-vpr").with_toplevel("top");
    let plan = configure(&request).unwrap();
    assert_eq!(plan.default_targets(), ["top.bit"]);
}

#[test]
fn test_stages_run_in_dependency_order() {
    let plan = configure(&minimal("xilinx", "symbiflow-vpr")).unwrap();
    let groups = plan.graph.parallel_groups();
    assert_eq!(groups.len(), plan.graph.len());
}

#[test]
fn test_serialize_is_deterministic() {
    let request = with_fasm2bels(minimal("fpga_interchange", "symbiflow-nextpnr"));
    let first = configure(&request).unwrap().graph.serialize();
    let second = configure(&request).unwrap().graph.serialize();
    assert_eq!(first, second);
}

#[test]
fn test_plan_writes_makefile() {
    let dir = tempfile::tempdir().unwrap();
    let plan = configure(&minimal("ecp5", "nextpnr")).unwrap();

    let path = plan.write(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(MAKEFILE_NAME));
    assert_eq!(fs::read_to_string(&path).unwrap(), plan.graph.serialize());
}

#[test]
fn test_unknown_backend_is_unsupported() {
    match Variant::resolve("ice40", "vivado") {
        Err(BuildError::UnsupportedVariant { arch, backend }) => {
            assert_eq!(arch, "ice40");
            assert_eq!(backend, "vivado");
        }
        other => panic!("Expected UnsupportedVariant, got {:?}", other),
    }
}
