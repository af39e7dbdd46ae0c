//! Variants command - list supported backend/architecture pairs

use anyhow::Result;
use edaflow_build::Variant;

/// Run the variants command
pub fn run(json: bool) -> Result<()> {
    let variants = Variant::all();

    if json {
        let entries: Vec<_> = variants.iter().map(describe).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:<20} {:<18} {:<16} {}", "BACKEND", "ARCH", "OPTIONS", "FASM2BELS");
    for variant in &variants {
        let required = variant.option_schema().required;
        let options = if required.is_empty() {
            "-".to_string()
        } else {
            required.join(",")
        };
        println!(
            "{:<20} {:<18} {:<16} {}",
            variant.backend().name(),
            variant.arch_name(),
            options,
            if variant.supports_subflows() { "yes" } else { "no" }
        );
    }

    Ok(())
}

fn describe(variant: &Variant) -> serde_json::Value {
    let roles: Vec<String> = variant
        .required_roles()
        .iter()
        .map(|role| role.to_string())
        .collect();

    serde_json::json!({
        "backend": variant.backend().name(),
        "arch": variant.arch_name(),
        "required_options": variant.option_schema().required,
        "required_files": roles,
        "subflows": variant.supports_subflows(),
    })
}
