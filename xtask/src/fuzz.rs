use clap::Subcommand;
use duct::cmd;

#[derive(Subcommand)]
pub enum Fuzz {
    /// Run the config file tokenizer
    Tokenizer,

    /// Run the whole config reader, directives and stanzas included
    Config,

    /// Run filesystem signature detection
    Signature,

    /// Run the legacy boot code scanner
    Bootcode,

    /// Run the extended partition walker
    Ebr,
}

pub fn fuzz_parsers(command: Fuzz) -> anyhow::Result<()> {
    let mut args = vec!["fuzz", "run"];
    match command {
        Fuzz::Tokenizer => args.push("tokenizer"),
        Fuzz::Config => args.push("config"),
        Fuzz::Signature => args.push("signature"),
        Fuzz::Bootcode => args.push("bootcode"),
        Fuzz::Ebr => args.push("ebr"),
    }

    cmd!("cargo", "install", "cargo-fuzz").run()?; // will not install if its already installed
    cmd("cargo", args).run()?;
    Ok(())
}
