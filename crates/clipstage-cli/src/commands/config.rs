//! Stage configuration file command.

use std::path::PathBuf;

use clap::Args;
use clipstage_core::{DEFAULT_TAPS, DriveCurve};
use clipstage_effects::StageConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start from an existing configuration instead of the defaults
    #[arg(short, long)]
    from: Option<PathBuf>,

    /// Curve to select
    #[arg(long)]
    curve: Option<String>,

    /// Include the built-in anti-aliasing taps so they can be edited
    #[arg(long)]
    with_coefficients: bool,

    /// Include the default tuning of every curve so it can be edited
    #[arg(long)]
    with_tunings: bool,
}

fn build(args: &ConfigArgs) -> anyhow::Result<StageConfig> {
    let mut config = match &args.from {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(name) = &args.curve {
        config.controls.curve = name.parse::<DriveCurve>()?;
    }
    if args.with_coefficients && config.coefficients.is_none() {
        config = config.with_coefficients(DEFAULT_TAPS.to_vec());
    }
    if args.with_tunings {
        for curve in DriveCurve::ALL {
            if !config.tunings.iter().any(|t| t.curve == curve) {
                config = config.with_tuning(curve, curve.default_tuning());
            }
        }
    }
    config.validate()?;
    Ok(config)
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let text = build(&args)?.to_toml()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
