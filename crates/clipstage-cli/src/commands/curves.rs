//! Drive curve listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings

use clap::Args;
use clipstage_core::{CurveShape, DriveCurve};

#[derive(Args)]
pub struct CurvesArgs {
    /// Show the transfer table for one curve
    #[arg(value_name = "CURVE")]
    curve: Option<String>,
}

fn description(curve: DriveCurve) -> &'static str {
    match curve {
        DriveCurve::Linear => "No shaping; the stage passes audio through untouched",
        DriveCurve::AbsFold => "Quadratic fold s(2-|s|) on the clamped input",
        DriveCurve::Sigmoid => "Arctangent saturation",
        DriveCurve::Tanh => "Hyperbolic tangent saturation",
        DriveCurve::Cubic => "Cubic soft clip s - s^3/3",
        DriveCurve::Hard => "Hard clip at the clip threshold",
        DriveCurve::Polynomial => "Parametric cubic knee (uses clip, shape, asymmetric)",
        DriveCurve::Rational => "Asymptotic (k+1)s/(1+k|s|) with dry blend (uses shape, bias)",
    }
}

pub fn run(args: CurvesArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.curve {
        let curve: DriveCurve = name.parse()?;
        let tuning = curve.default_tuning();

        println!("{curve}");
        println!("{}", "=".repeat(curve.name().len()));
        println!();
        println!("{}", description(curve));
        println!();
        println!(
            "Tuning: gain = {} + {} * drive^2 * range, output x{}",
            tuning.gain_offset, tuning.gain_scale, tuning.output_scale
        );
        println!();
        println!("  {:>8}  {:>10}", "Input", "Output");
        println!("  {:>8}  {:>10}", "-----", "------");

        let shape = CurveShape::default();
        for i in -8i8..=8 {
            let s = f32::from(i) / 4.0;
            println!("  {:>8.2}  {:>10.4}", s, curve.apply(s, &shape));
        }
        return Ok(());
    }

    println!("Available Drive Curves");
    println!("======================");
    println!();
    println!("  {:12}  {}", "Name", "Description");
    println!("  {:12}  {}", "----", "-----------");
    for curve in DriveCurve::ALL {
        let marker = if curve == DriveCurve::default() { " (default)" } else { "" };
        println!("  {:12}  {}{}", curve.name(), description(curve), marker);
    }
    println!();
    println!("Example usage:");
    println!();
    println!("  clipstage process input.wav output.wav --curve tanh --drive 0.7");
    println!("  clipstage curves rational");

    Ok(())
}
