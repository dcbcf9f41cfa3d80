//! File-based processing through the nonlinear stage.
//!
//! The command acts as the stage's host: it hands out input blocks cut from
//! the decoded file, collects emitted blocks, and recycles the storage the
//! stage releases.

use std::path::PathBuf;

use clap::Args;
use clipstage_core::DriveCurve;
use clipstage_effects::{BlockHost, NonlinearStage, StageConfig};
use indicatif::{ProgressBar, ProgressStyle};

use crate::wav::{read_mono, write_mono};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Stage configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drive curve (see `clipstage curves`)
    #[arg(long)]
    curve: Option<String>,

    /// Drive amount [0, 1]
    #[arg(short, long, alias = "gain")]
    drive: Option<f32>,

    /// Output level [0, 1]
    #[arg(short, long)]
    level: Option<f32>,

    /// Tone [0, 1] (low-pass from 800 Hz to 8.8 kHz)
    #[arg(short, long)]
    tone: Option<f32>,

    /// Bottom [0, 1] (pre high-pass from 400 Hz down to 50 Hz)
    #[arg(short, long)]
    bottom: Option<f32>,

    /// Clip threshold [0.05, 1] for the hard and polynomial curves
    #[arg(long)]
    clip: Option<f32>,

    /// Curve amount [0, 10] for the polynomial and rational curves
    #[arg(long)]
    shape: Option<f32>,

    /// Input bias [-0.5, 0.5] for the rational curve
    #[arg(long, allow_hyphen_values = true)]
    bias: Option<f32>,

    /// Shape only the positive half (polynomial curve)
    #[arg(long)]
    asymmetric: bool,

    /// Run the curve at the host rate instead of oversampling
    #[arg(long)]
    no_oversample: bool,

    /// Host block size (defaults to the stage block length)
    #[arg(long)]
    block_size: Option<usize>,

    /// Shift the output earlier by the oversampler latency
    #[arg(long)]
    compensate_latency: bool,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

impl ProcessArgs {
    /// Fold command-line overrides into `config`.
    fn apply_overrides(&self, config: &mut StageConfig) -> anyhow::Result<()> {
        let controls = &mut config.controls;
        if let Some(name) = &self.curve {
            controls.curve = name.parse::<DriveCurve>()?;
        }
        let overrides = [
            (&mut controls.drive, self.drive),
            (&mut controls.level, self.level),
            (&mut controls.tone, self.tone),
            (&mut controls.bottom, self.bottom),
            (&mut controls.clip, self.clip),
            (&mut controls.shape, self.shape),
            (&mut controls.bias, self.bias),
        ];
        for (field, value) in overrides {
            if let Some(v) = value {
                *field = v;
            }
        }
        if self.asymmetric {
            controls.asymmetric = true;
        }
        Ok(())
    }
}

/// Host over an in-memory signal.
struct FileHost<'a> {
    input: std::slice::Chunks<'a, f32>,
    output: Vec<f32>,
    spare: Vec<Vec<f32>>,
    progress: ProgressBar,
}

impl BlockHost for FileHost<'_> {
    type Block = Vec<f32>;

    fn acquire_input_block(&mut self) -> Option<Vec<f32>> {
        let chunk = self.input.next()?;
        let mut block = self.spare.pop().unwrap_or_default();
        block.clear();
        block.extend_from_slice(chunk);
        Some(block)
    }

    fn emit(&mut self, block: &Vec<f32>) {
        self.output.extend_from_slice(block);
        self.progress.inc(block.len() as u64);
    }

    fn release_block(&mut self, block: Vec<f32>) {
        self.spare.push(block);
    }
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    println!("Reading {}...", args.input.display());
    let (mut samples, spec) = read_mono(&args.input)?;
    let sample_rate = spec.sample_rate as f32;

    println!(
        "  {} samples, {} Hz, {} ch, {:.2}s",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        samples.len() as f32 / sample_rate
    );

    let mut config = match &args.config {
        Some(path) => {
            println!("Loading config {}...", path.display());
            StageConfig::load(path)?
        }
        None => StageConfig::default(),
    };
    if args.config.is_some() && config.sample_rate != sample_rate {
        tracing::info!(
            configured = config.sample_rate,
            file = sample_rate,
            "using the input file's sample rate"
        );
    }
    config.sample_rate = sample_rate;
    args.apply_overrides(&mut config)?;

    let mut stage = NonlinearStage::new(config)?;
    let oversampling = stage.begin(!args.no_oversample);
    if !args.no_oversample && !oversampling {
        println!("  Oversampling unavailable, processing at {sample_rate} Hz");
    }

    let controls = stage.params().controls();
    println!(
        "Processing: curve {}, drive {:.2}, level {:.2}, tone {:.2}, bottom {:.2} ({}x)",
        controls.curve,
        controls.drive,
        controls.level,
        controls.tone,
        controls.bottom,
        stage.active_factor()
    );

    let latency = if args.compensate_latency {
        stage.latency_samples()
    } else {
        0
    };
    let original_len = samples.len();
    samples.resize(original_len + latency, 0.0);

    let block_size = args.block_size.unwrap_or(stage.block_len()).max(1);
    let progress = ProgressBar::new(samples.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut host = FileHost {
        input: samples.chunks(block_size),
        output: Vec::with_capacity(samples.len()),
        spare: Vec::new(),
        progress,
    };
    while stage.run_cycle(&mut host) {}
    host.progress.finish_with_message("done");

    let output = host.output.split_off(latency);
    let input = &samples[..original_len];

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(input)),
        linear_to_db(peak(input))
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&output)),
        linear_to_db(peak(&output))
    );
    if latency > 0 {
        println!("  Latency compensated: {latency} samples");
    }

    println!("\nWriting {}...", args.output.display());
    write_mono(&args.output, &output, spec.sample_rate, args.bit_depth)?;
    println!("Done!");

    Ok(())
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
