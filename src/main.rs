use hough_detector::{find_segments, DetectorParams, StateMap};
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let program = env::args()
        .next()
        .unwrap_or_else(|| "hough_demo".to_string());
    let config = parse_args(&program)?;

    let img = image::open(&config.input_path)
        .map_err(|e| format!("Failed to open {}: {e}", config.input_path.display()))?
        .to_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let gray = img.into_raw();

    // Ink on paper by default: dark pixels are foreground.
    let mask: Vec<u8> = gray
        .iter()
        .map(|&v| {
            let foreground = v < config.threshold;
            u8::from(foreground != config.invert)
        })
        .collect();

    let state = StateMap::from_mask(height, width, &mask);
    let foreground = mask.iter().filter(|&&v| v != 0).count();

    let mut params = DetectorParams::default();
    if let Some(min_length) = config.min_length {
        params.min_length = min_length;
    }

    let segments = find_segments(state, &params, config.seed)
        .map_err(|e| format!("Detection failed: {e}"))?;

    println!(
        "{}x{} image, {foreground} foreground pixels, {} segments (seed {})",
        width,
        height,
        segments.len(),
        config.seed
    );
    for s in &segments {
        println!("  {s}");
    }

    if let Some(path) = config.json_out {
        let json = serde_json::to_string_pretty(&segments)
            .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
        fs::write(&path, json)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        println!("JSON segment list written to {}", path.display());
    }

    Ok(())
}

struct Config {
    input_path: PathBuf,
    json_out: Option<PathBuf>,
    seed: u32,
    threshold: u8,
    invert: bool,
    min_length: Option<u16>,
}

fn parse_args(program: &str) -> Result<Config, String> {
    let usage = || {
        format!(
            "Usage: {program} <image> [--seed N] [--threshold N] [--invert] \
             [--min-length N] [--json PATH]"
        )
    };

    let mut input_path = None;
    let mut json_out = None;
    let mut seed = 0u32;
    let mut threshold = 128u8;
    let mut invert = false;
    let mut min_length = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().ok_or_else(|| format!("--seed needs a value\n{}", usage()))?;
                seed = value
                    .parse()
                    .map_err(|e| format!("Bad seed {value:?}: {e}"))?;
            }
            "--threshold" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("--threshold needs a value\n{}", usage()))?;
                threshold = value
                    .parse()
                    .map_err(|e| format!("Bad threshold {value:?}: {e}"))?;
            }
            "--min-length" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("--min-length needs a value\n{}", usage()))?;
                min_length = Some(
                    value
                        .parse()
                        .map_err(|e| format!("Bad min length {value:?}: {e}"))?,
                );
            }
            "--json" => {
                let value = args.next().ok_or_else(|| format!("--json needs a path\n{}", usage()))?;
                json_out = Some(PathBuf::from(value));
            }
            "--invert" => invert = true,
            "--help" | "-h" => return Err(usage()),
            other if other.starts_with('-') => {
                return Err(format!("Unknown option {other:?}\n{}", usage()));
            }
            other => {
                if input_path.replace(PathBuf::from(other)).is_some() {
                    return Err(format!("Multiple input paths given\n{}", usage()));
                }
            }
        }
    }

    Ok(Config {
        input_path: input_path.ok_or_else(usage)?,
        json_out,
        seed,
        threshold,
        invert,
        min_length,
    })
}
