//! Approximate raw RGBA8 image (or a generated test pattern) with shapes and print the result

use shapefit::*;
use std::{
    env,
    fs::File,
    io::{Read, Write},
};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

type Error = Box<dyn std::error::Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Json,
    Desmos,
    Rgba,
}

#[derive(Debug)]
struct Args {
    input_file: Option<String>,
    size: Size,
    count: usize,
    mode: FidelityMode,
    seed: u64,
    kinds: Vec<ShapeKind>,
    background: Background,
    output: Output,
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            input_file: None,
            size: Size {
                width: 64,
                height: 64,
            },
            count: 100,
            mode: FidelityMode::Standard,
            seed: 0,
            kinds: Vec::new(),
            background: Background::Average,
            output: Output::Json,
        };
        let mut args = env::args();
        let cmd = args.next().unwrap_or_else(|| "sketch".to_string());
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    usage(&cmd);
                    std::process::exit(0);
                }
                "-s" => {
                    let size = args.next().ok_or("-s requires <width>x<height> argument")?;
                    let (width, height) = size
                        .split_once('x')
                        .ok_or("size must be <width>x<height>")?;
                    result.size = Size {
                        width: width.parse()?,
                        height: height.parse()?,
                    };
                }
                "-n" => {
                    result.count = args.next().ok_or("-n requires argument")?.parse()?;
                }
                "-m" => {
                    result.mode = args.next().ok_or("-m requires argument")?.parse()?;
                }
                "-r" => {
                    result.seed = args.next().ok_or("-r requires argument")?.parse()?;
                }
                "-k" => {
                    let kind = args.next().ok_or("-k requires argument")?.parse()?;
                    result.kinds.push(kind);
                }
                "-bg" => {
                    let bg: RGBA = args
                        .next()
                        .ok_or("-bg requires color #rrggbb argument")?
                        .parse()?;
                    result.background = Background::Color(bg);
                }
                "-d" => result.output = Output::Desmos,
                "-p" => result.output = Output::Rgba,
                _ if result.input_file.is_none() => result.input_file = Some(arg),
                _ => {
                    usage(&cmd);
                    return Err("unexpected positional argument".into());
                }
            }
        }
        Ok(result)
    }
}

fn usage(cmd: &str) {
    eprintln!("Approximate an image with semi-transparent shapes");
    eprintln!("\nUSAGE:");
    eprintln!(
        "    {} [-s <w>x<h>] [-n <count>] [-m <mode>] [-r <seed>] [-k <kind>]... [-bg <color>] [-d|-p] [<image.rgba>]",
        cmd
    );
    eprintln!("\nARGS:");
    eprintln!("    -s <w>x<h>     size of the input image (default: 64x64)");
    eprintln!("    -n <count>     number of shapes (default: 100)");
    eprintln!("    -m <mode>      fidelity mode standard|high|super|hyper");
    eprintln!("    -r <seed>      random seed");
    eprintln!("    -k <kind>      enable shape kind ellipse|polygon|line (default: ellipse)");
    eprintln!("    -bg <color>    initial canvas color (default: average color)");
    eprintln!("    -d             print Desmos graph state instead of JSON");
    eprintln!("    -p             write RGBA8 canvas to stdout instead of JSON");
    eprintln!("    <image.rgba>   raw RGBA8 pixels ('-' means stdin), test pattern if missing");
}

/// Concentric rings over a vertical gradient
fn test_pattern(size: Size) -> Vec<u8> {
    let mut data = Vec::with_capacity(size.area() * 4);
    for row in 0..size.height {
        for col in 0..size.width {
            let x = col as Scalar / size.width as Scalar - 0.5;
            let y = row as Scalar / size.height as Scalar - 0.5;
            let ring = ((x * x + y * y).sqrt() * 12.0) as usize % 2 == 0;
            let shade = (255.0 * (y + 0.5)) as u8;
            let pixel = if ring {
                [240, shade, 40, 255]
            } else {
                [30, 90, 255 - shade, 255]
            };
            data.extend_from_slice(&pixel);
        }
    }
    data
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let data = match args.input_file.as_deref() {
        None => test_pattern(args.size),
        Some("-") => {
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            data
        }
        Some(path) => {
            let mut data = Vec::new();
            File::open(path)?.read_to_end(&mut data)?;
            data
        }
    };

    let mut config = SessionConfig::new(args.mode)
        .with_seed(args.seed)
        .with_background(args.background);
    if !args.kinds.is_empty() {
        config = config.with_kinds(args.kinds.iter().copied());
    }
    let image = RawImage::rgba8(args.size.width, args.size.height, &data);
    let mut session = Session::with_config(image, args.count, config)?;

    let budget = session.recommended_unit_budget();
    let mut report = |progress: &Progress, shape: &ShapeGenome| {
        tracing::info!(
            "[shape] {}/{} {} delta={} score={}",
            progress.index + 1,
            progress.target,
            shape.kind(),
            progress.delta,
            progress.score,
        );
    };
    while !session.advance_by_observed(budget, &mut report)? {}
    let target = RawImage::rgba8(args.size.width, args.size.height, &data).decode()?;
    tracing::info!("[rmse] {:.4}", difference::rmse(&target, session.canvas()?));

    let mut stdout = std::io::stdout().lock();
    match args.output {
        Output::Json => writeln!(stdout, "{}", session.export()?)?,
        Output::Desmos => writeln!(stdout, "{}", session.export_desmos()?)?,
        Output::Rgba => stdout.write_all(session.canvas_rgba()?)?,
    }
    session.dispose()?;
    Ok(())
}
