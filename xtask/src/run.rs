use duct::cmd;

/// Builds a UEFI binary and runs it in a VM.
pub fn run_in_vm(binary: &str, ovmf_code: Option<&str>, release: bool, add_file: Option<&str>) -> anyhow::Result<()> {
    let mut run_args = vec!["-d"];
    let mut build_args = vec![
        "build",
        "--bin",
        binary,
        "--target",
        "x86_64-unknown-uefi",
        "--features",
        "refit-rs-core/global_allocator,refit-rs-core/panic_handler",
    ];

    if let Some(ovmf_code) = ovmf_code {
        run_args.extend(["-b", ovmf_code]);
    }

    if let Some(add_file) = add_file {
        run_args.extend(["-f", add_file]);
    }

    let profile = if release {
        build_args.extend(["--profile", "release-lto"]);
        "release-lto"
    } else {
        "debug"
    };
    let efi = format!("target/x86_64-unknown-uefi/{profile}/{binary}.efi");
    run_args.push(&efi);

    cmd!("cargo", "install", "uefi-run").run()?; // will not install if its already installed
    cmd("cargo", build_args).run()?;
    if let Err(e) = cmd("uefi-run", run_args).run() {
        println!(
            "hint: if the error was that the PC BIOS could not be loaded, you may have to specify ovmf-code"
        );
        return Err(e.into());
    }
    Ok(())
}

pub fn run_cli(ovmf_code: Option<&str>, release: bool, add_file: Option<&str>) -> anyhow::Result<()> {
    run_in_vm("refit-rs-cli", ovmf_code, release, add_file)
}
