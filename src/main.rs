use anyhow::Result;
use clap::Parser;
use polyscribe::cli::{Cli, Commands};
use polyscribe::config::Config;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run(cli)?,
        Some(Commands::Devices) => list_audio_devices()?,
        Some(Commands::Languages) => list_languages(),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()),
    };
    Ok(config.with_env_overrides())
}

fn list_languages() {
    use polyscribe::lang::{TargetLanguage, SOURCE_LANGUAGE};

    for lang in TargetLanguage::ALL {
        if lang == SOURCE_LANGUAGE {
            println!("{}  {} (source, no translation)", lang.code(), lang.name());
        } else {
            println!("{}  {}", lang.code(), lang.name());
        }
    }
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    use polyscribe::audio::capture::{is_preferred_device, CpalAudioSource};
    use polyscribe::audio::source::AudioSource;

    let source = CpalAudioSource::new(None)?;
    let devices = source.list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    for device in devices {
        if is_preferred_device(&device.name) {
            println!("{} [recommended]", device.name);
        } else {
            println!("{}", device.name);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!(
        "This binary was built without audio capture.\n\
         Rebuild with: cargo build --features cpal-audio"
    );
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(device) = cli.device.clone() {
        config.audio.device = Some(device);
    }
    if let Some(model) = cli.model.clone() {
        config.stt.model = model;
    }
    if let Some(target) = cli.target {
        config.translation.target = target;
    }
    run_pipeline(cli, config)
}

#[cfg(all(feature = "cpal-audio", feature = "whisper"))]
fn run_pipeline(cli: Cli, config: Config) -> Result<()> {
    use polyscribe::audio::capture::{suppress_audio_warnings, CpalAudioSource};
    use polyscribe::defaults;
    use polyscribe::pipeline::PipelineController;
    use polyscribe::stt::whisper::{WhisperConfig, WhisperRecognizer};
    use polyscribe::translate::translator::IdentityTranslator;
    use std::io::Write;
    use std::sync::Arc;
    use std::thread;

    suppress_audio_warnings();

    let mut pipeline_config = config.pipeline_config();
    if let Some(segment) = cli.segment {
        pipeline_config.segment_duration = segment;
    }
    if let Some(ms) = cli.char_delay {
        pipeline_config.char_delay = std::time::Duration::from_millis(ms);
    }

    let source = CpalAudioSource::new(config.audio.device.as_deref())?;
    let recognizer = WhisperRecognizer::new(WhisperConfig {
        model_path: resolve_model_path(&config.stt.model)?,
        threads: None,
    })?;
    let model_name = polyscribe::Recognizer::model_name(&recognizer).to_string();

    let mut controller = PipelineController::with_config(pipeline_config);
    let source_rx = controller.source_chars();
    let translated_rx = controller.translated_chars();
    let status_rx = controller.status_messages();

    // Source text streams live; translated text is buffered per line so the
    // two outputs don't garble each other.
    thread::spawn(move || {
        let mut stdout = std::io::stdout();
        for ch in source_rx.iter() {
            print!("{ch}");
            stdout.flush().ok();
        }
    });
    thread::spawn(move || {
        let mut line = String::new();
        for ch in translated_rx.iter() {
            if ch == '\n' {
                if !line.is_empty() {
                    println!("  → {line}");
                }
                line.clear();
            } else {
                line.push(ch);
            }
        }
    });
    thread::spawn(move || {
        for message in status_rx.iter() {
            eprintln!("polyscribe: {message}");
        }
    });

    controller.start(
        Box::new(source),
        Arc::new(recognizer),
        Arc::new(IdentityTranslator),
    )?;

    eprintln!(
        "polyscribe {}: listening with {} (target: {}). Press Enter to stop.",
        polyscribe::version_string(),
        model_name,
        controller.config().target_language.name()
    );

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    controller.stop_and_wait(defaults::STOP_GRACE)?;
    Ok(())
}

#[cfg(not(all(feature = "cpal-audio", feature = "whisper")))]
fn run_pipeline(_cli: Cli, _config: Config) -> Result<()> {
    anyhow::bail!(
        "This binary was built without audio capture and speech recognition.\n\
         Rebuild with: cargo build --features full"
    );
}

/// Resolve a model name or path to a model file on disk.
///
/// A value that is an existing path is used as-is. Otherwise the name is
/// looked up as `ggml-<name>.bin` in `~/.cache/polyscribe/models/` and the
/// local `models/` directory.
#[cfg(all(feature = "cpal-audio", feature = "whisper"))]
fn resolve_model_path(model: &str) -> Result<std::path::PathBuf> {
    use std::path::PathBuf;

    let direct = PathBuf::from(model);
    if direct.exists() {
        return Ok(direct);
    }

    let filename = format!("ggml-{model}.bin");
    let mut candidates = Vec::new();
    if let Some(cache) = dirs::cache_dir() {
        candidates.push(cache.join("polyscribe/models").join(&filename));
    }
    candidates.push(PathBuf::from("models").join(&filename));

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    anyhow::bail!(
        "Model '{}' not found. Looked for {} in {}",
        model,
        filename,
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}
