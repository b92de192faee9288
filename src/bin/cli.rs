use anyhow::{anyhow, bail, Context, Result};
use crabclip::audio::{read_wav_header, AnalogSource};
use crabclip::avi::IndexEntry;
use crabclip::clip::parse_name_fields;
use crabclip::{parse_clip_name, upload_clip, AudioRecorder, CrabClipConfig, FsStorage};
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    crabclip::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabclip-cli <convert|inspect|record|config|info> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "convert" => cmd_convert(&args),
        "inspect" => cmd_inspect(&args),
        "record" => cmd_record(&args),
        "config" => cmd_config(&args),
        "info" => cmd_info(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn load_config(args: &[String]) -> Result<CrabClipConfig> {
    let path = match args.iter().position(|a| a == "--config") {
        Some(i) => args
            .get(i + 1)
            .map(Path::new)
            .ok_or_else(|| anyhow!("--config needs a path"))?
            .to_path_buf(),
        None => CrabClipConfig::default_path(),
    };
    CrabClipConfig::load_layered(&path).with_context(|| format!("loading {}", path.display()))
}

/// Split `<clip path>` into the storage root and the clip name inside it
fn split_clip_path(path: &str) -> Result<(String, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a clip file: {}", path.display()))?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((root.display().to_string(), name.to_string()))
}

fn cmd_convert(args: &[String]) -> Result<()> {
    // convert <clip> <out> [--cluster <bytes>] [--no-avi] [--config <path>] [--json]
    let mut positional = Vec::new();
    let mut cluster = None;
    let mut no_avi = false;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--cluster" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--cluster needs a size"))?;
                cluster = Some(value.parse::<usize>()?);
            }
            "--config" => i += 1,
            "--no-avi" => no_avi = true,
            "--json" => json = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [clip_path, out_path] = positional.as_slice() else {
        bail!("Usage: crabclip-cli convert <clip> <out> [--cluster <bytes>] [--no-avi] [--json]");
    };

    let mut config = load_config(args)?;
    if let Some(cluster) = cluster {
        config.mux.cluster_size = cluster;
    }
    if no_avi {
        config.mux.avi_enabled = false;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    let (root, name) = split_clip_path(clip_path)?;
    let storage = FsStorage::new(&root);
    let out = File::create(out_path).with_context(|| format!("creating {}", out_path))?;
    let mut sink = BufWriter::new(out);

    let stats = upload_clip(&storage, &name, &config, &mut sink)
        .with_context(|| format!("converting {}", clip_path))?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!(
            "{:?}: {} of {} frames, {} audio bytes, {} bytes written",
            stats.mode,
            stats.frames_emitted,
            stats.frames_declared,
            stats.audio_bytes,
            stats.bytes_emitted
        );
    }
    Ok(())
}

fn cmd_inspect(args: &[String]) -> Result<()> {
    // inspect <file> [--json]
    let path = args
        .get(2)
        .ok_or_else(|| anyhow!("Usage: crabclip-cli inspect <file> [--json]"))?;
    let json = args.contains(&"--json".to_string());
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;

    if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"AVI "[..]) {
        let tail = find_index(&bytes).ok_or_else(|| anyhow!("no idx1 block in {}", path))?;
        let entries = IndexEntry::parse_block(tail).ok_or_else(|| anyhow!("malformed index"))?;
        if json {
            let summary: Vec<_> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "tag": String::from_utf8_lossy(&e.tag),
                        "offset": e.offset,
                        "size": e.size,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("AVI, {} bytes, {} chunks", bytes.len(), entries.len());
            for e in entries {
                println!("{} @{} {}", String::from_utf8_lossy(&e.tag), e.offset, e.size);
            }
        }
    } else if let Some(info) = read_wav_header(&bytes) {
        if json {
            println!(
                "{}",
                serde_json::json!({ "sample_rate": info.sample_rate, "data_len": info.data_len })
            );
        } else {
            println!("WAV, {} Hz, {} bytes of samples", info.sample_rate, info.data_len);
        }
    } else {
        let meta = parse_clip_name(path);
        if json {
            println!("{}", serde_json::to_string(&meta)?);
        } else {
            match (meta, parse_name_fields(path)) {
                (Some(m), _) => println!(
                    "Clip {}x{} ({}), {} fps, {} frames",
                    m.frame_size.dimensions().0,
                    m.frame_size.dimensions().1,
                    m.frame_size.label(),
                    m.fps,
                    m.frame_count
                ),
                (None, Some(fields)) => println!("Foreign clip, fields {:?}", fields),
                (None, None) => println!("Foreign clip, no metadata"),
            }
        }
    }
    Ok(())
}

fn find_index(bytes: &[u8]) -> Option<&[u8]> {
    let at = bytes.windows(4).rposition(|w| w == b"idx1")?;
    Some(&bytes[at..])
}

fn cmd_record(args: &[String]) -> Result<()> {
    // record <clip name> [--secs <n>] [--dir <path>] [--json]
    let clip_name = args
        .get(2)
        .ok_or_else(|| anyhow!("Usage: crabclip-cli record <clip name> [--secs <n>] [--json]"))?;
    let mut secs = 3u64;
    let mut dir = None;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--secs" => {
                i += 1;
                secs = args.get(i).ok_or_else(|| anyhow!("--secs needs a value"))?.parse()?;
            }
            "--dir" => {
                i += 1;
                dir = args.get(i).cloned();
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = load_config(args)?;
    config.audio.microphone_enabled = true;
    let storage = FsStorage::new(dir.unwrap_or_else(|| config.storage.clip_directory.clone()));

    let mut recorder = AudioRecorder::new(&config, open_source()?);
    recorder.start_audio_capture()?;
    std::thread::sleep(Duration::from_secs(secs));
    let summary = recorder
        .stop_audio_capture(clip_name, true, &storage)?
        .ok_or_else(|| anyhow!("recording did not start"))?;

    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{} samples -> {}",
            summary.samples_captured,
            summary.wav_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(feature = "microphone")]
fn open_source() -> Result<Arc<dyn AnalogSource>> {
    Ok(Arc::new(crabclip::audio::CpalMicrophone::open()?))
}

#[cfg(not(feature = "microphone"))]
fn open_source() -> Result<Arc<dyn AnalogSource>> {
    log::warn!("Built without the microphone feature, recording a synthetic tone");
    Ok(Arc::new(crabclip::SyntheticTone::new(25)))
}

fn cmd_config(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn cmd_info(args: &[String]) -> Result<()> {
    let info = crabclip::get_info();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&info)?);
    } else {
        println!("{} {} (frame size table v{})", info.name, info.version, info.frame_size_table_version);
    }
    Ok(())
}
