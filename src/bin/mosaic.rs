use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command, ValueEnum};
use pixel_mosaic::{ColoringMethod, MosaicConfig, OverlayKind, Palette};

const SWATCH_SIZE: u32 = 100;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    QuantizeThenResize,
    ResizeThenQuantize,
    ClusterPixelate,
    PaletteDirect,
    PaletteClustering,
}

impl From<MethodArg> for ColoringMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::QuantizeThenResize => ColoringMethod::QuantizeThenResize,
            MethodArg::ResizeThenQuantize => ColoringMethod::ResizeThenQuantize,
            MethodArg::ClusterPixelate => ColoringMethod::ClusterPixelate,
            MethodArg::PaletteDirect => ColoringMethod::PaletteDirect,
            MethodArg::PaletteClustering => ColoringMethod::PaletteClustering,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OverlayArg {
    None,
    Grid,
    Numbers,
    GridAndNumbers,
    Print,
}

impl From<OverlayArg> for OverlayKind {
    fn from(arg: OverlayArg) -> Self {
        match arg {
            OverlayArg::None => OverlayKind::None,
            OverlayArg::Grid => OverlayKind::Grid,
            OverlayArg::Numbers => OverlayKind::Numbers,
            OverlayArg::GridAndNumbers => OverlayKind::GridAndNumbers,
            OverlayArg::Print => OverlayKind::GridAndNumbersNoColor,
        }
    }
}

fn command() -> Command {
    Command::new("mosaic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn a photo into a color mosaic or a paint-by-number sheet.")
        .arg(
            Arg::new("input")
                .help("Source image")
                .required(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output PNG")
                .value_parser(value_parser!(PathBuf))
                .default_value("mosaic.png"),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .value_name("W,H")
                .help("Mosaic size in cells"),
        )
        .arg(
            Arg::new("multiplier")
                .short('m')
                .long("multiplier")
                .value_name("UINT")
                .help("Pixels per cell side")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("colors")
                .short('k')
                .long("colors")
                .value_name("UINT")
                .help("Number of colors to pick automatically")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("palette")
                .long("palette")
                .value_name("#RRGGBB#RRGGBB...")
                .help("Explicit palette as concatenated hex colors"),
        )
        .group(ArgGroup::new("color_source").args(["colors", "palette"]))
        .arg(
            Arg::new("method")
                .long("method")
                .value_name("METHOD")
                .help("Coloring method")
                .value_parser(value_parser!(MethodArg)),
        )
        .arg(
            Arg::new("overlay")
                .long("overlay")
                .value_name("OVERLAY")
                .help("Overlay drawn on the mosaic")
                .value_parser(value_parser!(OverlayArg)),
        )
        .arg(
            Arg::new("numbers_size")
                .long("numbers-size")
                .value_name("UINT")
                .help("Font size of cell numbers")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("font")
                .long("font")
                .value_name("FILE")
                .help("TTF/OTF font for cell numbers")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration; flags override its values")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("distribution")
                .long("distribution")
                .value_name("FILE")
                .help("Write the color table to FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("swatches")
                .long("swatches")
                .value_name("DIR")
                .help("Write one swatch image per color into DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn parse_size(size: &str) -> anyhow::Result<(u32, u32)> {
    let Some((w, h)) = size.split_once(',') else {
        bail!("Size must be W,H, got {:?}", size);
    };
    let w = w.trim().parse().with_context(|| format!("Invalid width in {:?}", size))?;
    let h = h.trim().parse().with_context(|| format!("Invalid height in {:?}", size))?;
    Ok((w, h))
}

/// Applies command-line flags on top of the loaded config.
///
/// A color source flag without `--method` switches to a method that accepts it.
fn apply_overrides(matches: &ArgMatches, config: &mut MosaicConfig) -> anyhow::Result<()> {
    let method_given = matches.contains_id("method");
    let mut builder = config.parameters.to_builder();
    if let Some(size) = matches.get_one::<String>("size") {
        let (w, h) = parse_size(size)?;
        builder = builder.cells(w, h);
    }
    if let Some(&multiplier) = matches.get_one::<u32>("multiplier") {
        builder = builder.multiplier(multiplier);
    }
    if let Some(&count) = matches.get_one::<usize>("colors") {
        builder = builder.color_count(count);
        if !method_given && config.parameters.method().uses_palette() {
            builder = builder.method(ColoringMethod::QuantizeThenResize);
        }
    }
    if let Some(text) = matches.get_one::<String>("palette") {
        builder = builder.palette(Palette::from_hex_text(text)?);
        if !method_given && !config.parameters.method().uses_palette() {
            builder = builder.method(ColoringMethod::PaletteDirect);
        }
    }
    if let Some(&method) = matches.get_one::<MethodArg>("method") {
        builder = builder.method(method.into());
    }
    if let Some(&overlay) = matches.get_one::<OverlayArg>("overlay") {
        builder = builder.overlay(overlay.into());
    }
    if let Some(&size) = matches.get_one::<u32>("numbers_size") {
        builder = builder.numbers_size(Some(size));
    }
    if let Some(font) = matches.get_one::<PathBuf>("font") {
        config.font_path = Some(font.clone());
    }
    config.parameters = builder.build()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => MosaicConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MosaicConfig::default(),
    };

    apply_overrides(&matches, &mut config)?;

    let input = matches
        .get_one::<PathBuf>("input")
        .context("Missing input image")?;
    let source = image::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?
        .to_rgb8();
    log::info!("Loaded {} ({}x{})", input.display(), source.width(), source.height());

    let generator = config.build_generator()?;
    let mosaic = generator.generate(&source, &config.parameters)?;

    let output = matches
        .get_one::<PathBuf>("output")
        .context("Missing output path")?;
    mosaic
        .image
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    log::info!("Saved {}", output.display());

    if let Some(path) = matches.get_one::<PathBuf>("distribution") {
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        mosaic.distribution.write_table(&mut file)?;
        log::info!("Wrote {} colors to {}", mosaic.distribution.len(), path.display());
    }

    if let Some(dir) = matches.get_one::<PathBuf>("swatches") {
        fs::create_dir_all(dir)?;
        for (name, swatch) in mosaic.distribution.swatches(SWATCH_SIZE, SWATCH_SIZE) {
            swatch.save(dir.join(format!("{}.png", name)))?;
        }
        log::info!("Wrote swatches to {}", dir.display());
    }

    Ok(())
}
