use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use indicatif::{MultiProgress, ProgressBar};
use itw::process::decode::{DecodedImage, Decoder};

use super::output::{create_output_path, write_image_file};
use super::progress::create_progress_bar;
use crate::cli::command::{Cli, DecodeArgs};
use crate::input::InputReader;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding {} ITW file(s) to {:?} (strict mode: {})",
        args.inputs.len(),
        args.format,
        cli.strict
    );

    if let Some(ref path) = args.output_path {
        log::info!("Output path specified: {}", path.display());
        if !path.is_dir() {
            bail!("Output path {} is not a directory", path.display());
        }
    }

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, args.inputs.len() as u64)?),
        None => None,
    };

    let mut decoder = Decoder::default();
    decoder.set_fail_level(cli.fail_level());

    let start_time = Instant::now();
    let mut failed = 0usize;

    for input in &args.inputs {
        if let Some(ref pb) = pb {
            pb.set_message(input.display().to_string());
        }

        if let Err(e) = decode_file(&decoder, input, args, pb.as_ref()) {
            log::error!("{}: {e:#}", input.display());
            failed += 1;
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    log::info!(
        "Decoded {} of {} file(s) in {:.3}s",
        args.inputs.len() - failed,
        args.inputs.len(),
        start_time.elapsed().as_secs_f64()
    );

    if failed > 0 {
        bail!("{failed} of {} file(s) failed to decode", args.inputs.len());
    }

    Ok(())
}

fn decode_file(
    decoder: &Decoder,
    input: &Path,
    args: &DecodeArgs,
    pb: Option<&ProgressBar>,
) -> Result<()> {
    let mut reader = InputReader::new(input)?;
    let raw = reader.read_all()?;
    log::debug!(
        "{}: read {} bytes{}",
        input.display(),
        raw.len(),
        if reader.is_pipe() { " from stdin" } else { "" }
    );

    let image = decoder.decode(&raw).context("Decoding container")?;
    log_summary(input, &image);

    let output = create_output_path(input, args.output_path.as_deref(), args.format);
    write_image_file(&output, &image, args.format)?;

    let message = format!("{} -> {}", input.display(), output.display());
    match pb {
        Some(pb) => pb.set_message(message),
        None => log::info!("{message}"),
    }

    Ok(())
}

fn log_summary(input: &Path, image: &DecodedImage) {
    log::debug!(
        "{}: {}x{} image, {} pixels described",
        input.display(),
        image.width,
        image.height,
        image.expanded_pixels
    );
}
