use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use itw::process::decode::Decoder;
use itw::process::parse::Parser;
use itw::process::reconstruct::count_run_markers;
use itw::structs::channel::CompressedChannel;
use itw::structs::container::ItwContainer;
use itw::structs::huffman::HuffmanTree;
use serde::Serialize;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing ITW container: {}", args.input.display());

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message("Analyzing container...");
            Some(pb)
        }
        None => None,
    };

    let raw = InputReader::new(&args.input)?.read_all()?;

    let mut parser = Parser::default();
    parser.set_fail_level(cli.fail_level());
    let container = parser.parse(&raw).context("Parsing container")?;

    let mut decoder = Decoder::default();
    decoder.set_fail_level(cli.fail_level());

    let report = ContainerReport::analyze(&decoder, &container, raw.len());

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    if args.yaml {
        print!("{}", serde_yaml_ng::to_string(&report)?);
    } else {
        display_report(&report);
    }

    if args.tree {
        print!("{}", render_trees(&report));
    }

    match report.error {
        Some(e) => Err(anyhow::anyhow!(e)),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize)]
struct ContainerReport {
    file_size: usize,
    width: u16,
    height: u16,
    pixel_count: usize,
    palette: Vec<u8>,
    pixel_channel: ChannelReport,
    repeat_channel: ChannelReport,
    run_markers: Option<usize>,
    expanded_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChannelReport {
    #[serde(skip)]
    tree: Option<HuffmanTree>,
    leaves: usize,
    internal_nodes: usize,
    max_code_length: usize,
    bits_to_process: u32,
    payload_bytes: usize,
    symbols: Option<usize>,
    ended_on_boundary: Option<bool>,
}

impl ChannelReport {
    fn from_channel(channel: &CompressedChannel) -> Self {
        let tree = match HuffmanTree::build(&channel.leaves) {
            Ok(tree) => Some(tree),
            Err(e) => {
                log::debug!("{} channel tree: {e}", channel.kind);
                None
            }
        };

        Self {
            max_code_length: tree.as_ref().map_or(0, |t| t.max_depth()),
            internal_nodes: tree.as_ref().map_or(0, |t| t.internal_count()),
            tree,
            leaves: channel.leaves.len(),
            bits_to_process: channel.bits_to_process,
            payload_bytes: channel.payload.len(),
            symbols: None,
            ended_on_boundary: None,
        }
    }
}

impl ContainerReport {
    /// Collects everything that can be learned from `container`. Decode
    /// failures are kept in `error` so the fields gathered before them are
    /// still reported.
    fn analyze(decoder: &Decoder, container: &ItwContainer, file_size: usize) -> Self {
        let mut report = Self {
            file_size,
            width: container.width(),
            height: container.height(),
            pixel_count: container.header.pixel_count(),
            palette: container.palette.entries().to_vec(),
            pixel_channel: ChannelReport::from_channel(&container.pixel_channel),
            repeat_channel: ChannelReport::from_channel(&container.repeat_channel),
            run_markers: None,
            expanded_pixels: None,
            error: None,
        };

        if let Err(e) = report.decode(decoder, container) {
            log::warn!("{e:#}");
            report.error = Some(format!("{e:#}"));
        }

        report
    }

    fn decode(&mut self, decoder: &Decoder, container: &ItwContainer) -> Result<()> {
        let pixels = decoder.decode_compressed(&container.pixel_channel)?;
        self.pixel_channel.symbols = Some(pixels.symbols.len());
        self.pixel_channel.ended_on_boundary = Some(pixels.ended_on_boundary);
        self.run_markers = Some(count_run_markers(&pixels.symbols, &container.palette));

        let repeats = decoder.decode_compressed(&container.repeat_channel)?;
        self.repeat_channel.symbols = Some(repeats.symbols.len());
        self.repeat_channel.ended_on_boundary = Some(repeats.ended_on_boundary);

        let image = decoder.reconstruct(container, &pixels, &repeats)?;
        self.expanded_pixels = Some(image.expanded_pixels);
        Ok(())
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn display_report(report: &ContainerReport) {
    println!();
    println!("ITW Container Information");
    println!("=========================");
    println!();

    println!("Image");
    println!("  File size                 {} bytes", report.file_size);
    println!("  Dimensions                {}x{}", report.width, report.height);
    println!("  Pixels                    {}", report.pixel_count);
    println!();

    let palette = report
        .palette
        .iter()
        .map(|v| format!("{v:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("Palette");
    println!("  Entries                   {}", report.palette.len());
    if !palette.is_empty() {
        println!("  Values                    {palette}");
    }
    println!();

    display_channel("Pixel channel", &report.pixel_channel);
    display_channel("Repeat channel", &report.repeat_channel);

    println!("Reconstruction");
    println!("  Run markers               {}", or_dash(report.run_markers));
    println!("  Expanded pixels           {}", or_dash(report.expanded_pixels));
    if let Some(ref e) = report.error {
        println!("  Error                     {e}");
    }
    println!();
}

/// Text dump of both trees, built once while analyzing.
fn render_trees(report: &ContainerReport) -> String {
    let mut out = String::new();

    for (title, channel) in [
        ("Pixel channel tree", &report.pixel_channel),
        ("Repeat channel tree", &report.repeat_channel),
    ] {
        out.push_str(title);
        out.push('\n');
        match channel.tree {
            Some(ref tree) => out.push_str(&tree.to_string()),
            None => out.push_str("  unavailable: leaf table cannot form a tree\n"),
        }
        out.push('\n');
    }

    out
}

fn display_channel(title: &str, channel: &ChannelReport) {
    println!("{title}");
    println!("  Leaves                    {}", channel.leaves);
    println!("  Internal nodes            {}", channel.internal_nodes);
    println!("  Longest code              {} bits", channel.max_code_length);
    println!("  Bits to process           {}", channel.bits_to_process);
    println!("  Payload                   {} bytes", channel.payload_bytes);
    println!("  Decoded symbols           {}", or_dash(channel.symbols));
    println!(
        "  Ends on symbol boundary   {}",
        or_dash(channel.ended_on_boundary)
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use itw::process::EXAMPLE_DATA;

    #[test]
    fn report_for_example() -> Result<()> {
        let container = Parser::default().parse(EXAMPLE_DATA)?;
        let report = ContainerReport::analyze(&Decoder::default(), &container, EXAMPLE_DATA.len());

        assert_eq!((report.width, report.height), (4, 1));
        assert_eq!(report.palette, [0x80, 0x20]);
        assert_eq!(report.pixel_channel.leaves, 3);
        assert_eq!(report.pixel_channel.internal_nodes, 2);
        assert_eq!(report.pixel_channel.symbols, Some(3));
        assert_eq!(report.repeat_channel.symbols, Some(1));
        assert_eq!(report.run_markers, Some(1));
        assert_eq!(report.expanded_pixels, Some(4));
        assert!(report.error.is_none());

        let yaml = serde_yaml_ng::to_string(&report)?;
        assert!(yaml.contains("expanded_pixels: 4"));
        assert!(!yaml.contains("error"));
        Ok(())
    }

    #[test]
    fn decode_errors_are_kept() -> Result<()> {
        let mut container = Parser::default().parse(EXAMPLE_DATA)?;
        container.repeat_channel.bits_to_process = 0;
        container.repeat_channel.payload = &[];

        let report = ContainerReport::analyze(&Decoder::default(), &container, 0);
        assert_eq!(report.run_markers, Some(1));
        assert_eq!(report.repeat_channel.symbols, Some(0));
        assert!(report.expanded_pixels.is_none());
        assert!(report.error.is_some_and(|e| e.contains("Repeat data does not match")));
        Ok(())
    }

    #[test]
    fn unusable_leaf_table_keeps_report_and_trees() -> Result<()> {
        let mut container = Parser::default().parse(EXAMPLE_DATA)?;
        container.pixel_channel.leaves[0].weight = f32::NAN;

        let report = ContainerReport::analyze(&Decoder::default(), &container, 0);
        assert!(report.pixel_channel.tree.is_none());
        assert_eq!(report.pixel_channel.internal_nodes, 0);
        assert!(report.pixel_channel.symbols.is_none());
        assert!(report.repeat_channel.tree.is_some());
        assert!(report.error.is_some());

        let dump = render_trees(&report);
        assert!(dump.contains("Pixel channel tree\n  unavailable"));
        assert!(dump.contains("Repeat channel tree\n-id: 0"));
        assert!(dump.contains("value: 01"));
        Ok(())
    }

    #[test]
    fn trees_are_dumped_from_report() -> Result<()> {
        let container = Parser::default().parse(EXAMPLE_DATA)?;
        let report = ContainerReport::analyze(&Decoder::default(), &container, 0);

        let pixel_tree = HuffmanTree::build(&container.pixel_channel.leaves)?;
        assert_eq!(report.pixel_channel.tree.as_ref(), Some(&pixel_tree));
        assert_eq!(report.pixel_channel.max_code_length, pixel_tree.max_depth());

        let dump = render_trees(&report);
        assert!(dump.starts_with(&format!("Pixel channel tree\n{pixel_tree}")));
        Ok(())
    }
}
