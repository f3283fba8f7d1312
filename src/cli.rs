use std::str::FromStr;

use pod_onset::io::config::{load_config, save_config};
use pod_onset::{DetectorConfig, EventSink, OnsetDetector, OnsetEvent, OnsetMap, WindowType};

/// Prints each onset as it is confirmed and keeps the full map for the end.
struct Report {
    map: OnsetMap,
    print_flux: bool,
    json: bool,
}

impl EventSink for Report {
    fn on_flux(&mut self, hop_index: u64, flux: f32) {
        if self.print_flux && !self.json {
            println!("flux {:6} {:.6}", hop_index, flux);
        }
        self.map.on_flux(hop_index, flux);
    }

    fn on_onset(&mut self, event: &OnsetEvent) {
        if !self.json {
            println!(
                "onset {:8.4}s  peak {:.6}  (hop {}, confirmed at hop {})",
                event.peak_time_secs(self.map.sample_rate),
                event.peak_magnitude,
                event.peak_hop_index,
                event.hop_index
            );
        }
        self.map.on_onset(event);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        std::process::exit(1);
    }

    let input_path = &args[1];

    let mut config_path: Option<String> = None;
    let mut save_path: Option<String> = None;
    let mut window_size: Option<usize> = None;
    let mut hop_size: Option<usize> = None;
    let mut block_size: usize = 64;
    let mut window_type: Option<WindowType> = None;
    let mut upper: Option<f32> = None;
    let mut lower: Option<f32> = None;
    let mut upper_scale: Option<f32> = None;
    let mut lower_scale: Option<f32> = None;
    let mut debounce: Option<u32> = None;
    let mut consecutive_ms: Option<f32> = None;
    let mut masking_ms: Option<f32> = None;
    let mut masking_decay: Option<f32> = None;
    let mut json = false;
    let mut print_flux = false;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                config_path = Some(parse_string(&args, i, "config"));
            }
            "--save-config" => {
                i += 1;
                save_path = Some(parse_string(&args, i, "save-config"));
            }
            "--window-size" => {
                i += 1;
                window_size = Some(parse_usize(&args, i, "window-size"));
            }
            "--hop-size" => {
                i += 1;
                hop_size = Some(parse_usize(&args, i, "hop-size"));
            }
            "--block-size" => {
                i += 1;
                block_size = parse_usize(&args, i, "block-size");
            }
            "--window" | "-w" => {
                i += 1;
                window_type = Some(parse_window(&args, i));
            }
            "--upper" => {
                i += 1;
                upper = Some(parse_f32(&args, i, "upper"));
            }
            "--lower" => {
                i += 1;
                lower = Some(parse_f32(&args, i, "lower"));
            }
            "--upper-scale" => {
                i += 1;
                upper_scale = Some(parse_f32(&args, i, "upper-scale"));
            }
            "--lower-scale" => {
                i += 1;
                lower_scale = Some(parse_f32(&args, i, "lower-scale"));
            }
            "--debounce" => {
                i += 1;
                debounce = Some(parse_u32(&args, i, "debounce"));
            }
            "--consecutive-ms" => {
                i += 1;
                consecutive_ms = Some(parse_f32(&args, i, "consecutive-ms"));
            }
            "--masking-ms" => {
                i += 1;
                masking_ms = Some(parse_f32(&args, i, "masking-ms"));
            }
            "--masking-decay" => {
                i += 1;
                masking_decay = Some(parse_f32(&args, i, "masking-decay"));
            }
            "--json" => json = true,
            "--flux" => print_flux = true,
            "--verbose" | "-v" => verbose = true,
            other => {
                eprintln!("ERROR: Unknown option '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => DetectorConfig::default(),
    };

    if let Some(v) = window_size {
        config = config.with_window_size(v);
    }
    if let Some(v) = hop_size {
        config = config.with_hop_size(v);
    }
    if let Some(v) = window_type {
        config = config.with_window_type(v);
    }
    if let Some(v) = debounce {
        config = config.with_debounce_threshold(v);
    }
    if upper.is_some() || lower.is_some() {
        let upper = upper.unwrap_or(config.upper_threshold);
        let lower = lower.unwrap_or(config.lower_threshold);
        config = config.with_thresholds(upper, lower);
    }
    if upper_scale.is_some() {
        config.upper_scale = upper_scale;
    }
    if lower_scale.is_some() {
        config.lower_scale = lower_scale;
    }
    if let Some(v) = consecutive_ms {
        config = config.with_consecutive_onset_ms(v);
    }
    if let Some(v) = masking_ms {
        config = config.with_masking_ms(v);
    }
    if let Some(v) = masking_decay {
        config = config.with_masking_decay(v);
    }

    if let Some(path) = &save_path {
        if let Err(e) = save_config(path, &config) {
            eprintln!("ERROR: Failed to write {}: {}", path, e);
            std::process::exit(1);
        }
        eprintln!("Config written to {}", path);
    }

    let buffer = match pod_onset::io::wav::read_wav_file(input_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("ERROR: Failed to read {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    eprintln!(
        "Input: {} frames, {} Hz, {:?}, {:.2}s",
        buffer.num_frames(),
        buffer.sample_rate,
        buffer.channels,
        buffer.duration_secs()
    );

    config = config.with_sample_rate(buffer.sample_rate as f32);
    let mut detector = match OnsetDetector::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("ERROR: Failed to create detector: {}", e);
            std::process::exit(1);
        }
    };

    if verbose {
        let active = detector.config();
        eprintln!(
            "Window: {} ({:?}), hop: {} ({:.2} ms), block: {}",
            active.window_size,
            active.window_type,
            active.hop_size,
            active.hop_ms(),
            block_size
        );
        if detector.is_automatic() {
            eprintln!(
                "Thresholds: automatic (scales {:?} / {:?})",
                active.upper_scale, active.lower_scale
            );
        } else {
            eprintln!(
                "Thresholds: upper {} lower {}",
                detector.upper_threshold(),
                detector.lower_threshold()
            );
        }
    }

    let active = detector.config();
    let mut report = Report {
        map: OnsetMap::new(active.hop_size, active.sample_rate),
        print_flux,
        json,
    };

    let block_size = block_size.max(1);
    let start = std::time::Instant::now();
    let mono = buffer.to_mono();
    for block in mono.chunks(block_size) {
        detector.process_into(block, &mut report);
    }
    let elapsed = start.elapsed();

    if json {
        match serde_json::to_string_pretty(&report.map) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("ERROR: Failed to serialize onsets: {}", e);
                std::process::exit(1);
            }
        }
    }

    eprintln!(
        "{} onsets in {} hops",
        report.map.onsets.len(),
        detector.hops_processed()
    );
    if verbose {
        let processing_secs = elapsed.as_secs_f64();
        let realtime_factor = if processing_secs > 0.0 {
            buffer.duration_secs() / processing_secs
        } else {
            f64::INFINITY
        };
        eprintln!(
            "Processing time: {:.3}s ({:.1}x realtime), final running mean {:.6}",
            processing_secs,
            realtime_factor,
            detector.running_mean()
        );
    }
}

fn print_usage() {
    eprintln!("Usage: pod-onset-cli <input.wav> [options]");
    eprintln!();
    eprintln!("Analysis:");
    eprintln!("  --window-size <N>      Frame length, power of two (default: 1024)");
    eprintln!("  --hop-size <N>         Hop length, power of two (default: 256)");
    eprintln!("  --block-size <N>       Samples per streamed block (default: 64)");
    eprintln!("  --window <type>        hann (default) or hamming");
    eprintln!();
    eprintln!("Peak picking:");
    eprintln!("  --upper <f>            Fixed upper threshold");
    eprintln!("  --lower <f>            Fixed lower threshold");
    eprintln!("  --upper-scale <f>      Upper threshold as a multiple of the mean flux");
    eprintln!("  --lower-scale <f>      Lower threshold as a multiple of the mean flux");
    eprintln!("  --debounce <N>         Hops to wait for a higher peak (default: 3)");
    eprintln!("  --consecutive-ms <f>   Hold-off after an onset (default: 30)");
    eprintln!("  --masking-ms <f>       Post-onset masking time (default: 100)");
    eprintln!("  --masking-decay <f>    Per-hop masking decay in [0, 1) (default: 0.6)");
    eprintln!();
    eprintln!("Config and output:");
    eprintln!("  --config, -c <file>    Load settings from JSON (flags override)");
    eprintln!("  --save-config <file>   Write the effective settings as JSON");
    eprintln!("  --json                 Print the onset map as JSON");
    eprintln!("  --flux                 Print the flux value of every hop");
    eprintln!("  --verbose, -v          Debug logging and timing");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  pod-onset-cli drums.wav");
    eprintln!("  pod-onset-cli drums.wav --upper-scale 4 --lower-scale 1 --json");
    eprintln!("  pod-onset-cli drums.wav --window hamming --consecutive-ms 50");
}

fn parse_string(args: &[String], idx: usize, name: &str) -> String {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    args[idx].clone()
}

fn parse_f32(args: &[String], idx: usize, name: &str) -> f32 {
    parse_or_exit(args, idx, name)
}

fn parse_usize(args: &[String], idx: usize, name: &str) -> usize {
    parse_or_exit(args, idx, name)
}

fn parse_u32(args: &[String], idx: usize, name: &str) -> u32 {
    parse_or_exit(args, idx, name)
}

fn parse_or_exit<T: FromStr>(args: &[String], idx: usize, name: &str) -> T {
    match parse_value(args, idx, name) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            std::process::exit(1);
        }
    }
}

/// Parses `args[idx]` as `T`; out-of-range values are rejected, not wrapped.
fn parse_value<T: FromStr>(args: &[String], idx: usize, name: &str) -> Result<T, String> {
    let value = args
        .get(idx)
        .ok_or_else(|| format!("--{} requires a value", name))?;
    value
        .parse()
        .map_err(|_| format!("Invalid {}: {}", name, value))
}

fn parse_window(args: &[String], idx: usize) -> WindowType {
    if idx >= args.len() {
        eprintln!("ERROR: --window requires a value (hann, hamming)");
        std::process::exit(1);
    }
    parse_window_str(&args[idx])
}

fn parse_window_str(s: &str) -> WindowType {
    match s {
        "hann" | "0" => WindowType::Hann,
        "hamming" | "1" => WindowType::Hamming,
        other => {
            eprintln!("ERROR: Unknown window type '{}' (use hann or hamming)", other);
            std::process::exit(1);
        }
    }
}
