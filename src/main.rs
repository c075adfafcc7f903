use airender::logger::{self, LoggerConfig};
use airender::{
    ActionOutcome, DirectoryExporter, GeminiClient, GenerationController, ImageFileCapture,
    JsonSettingsStore, ServiceConfig,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let mut args = env::args().skip(1);
    let Some(image_path) = args.next() else {
        eprintln!("usage: airender <image> <prompt...>");
        std::process::exit(2);
    };
    let prompt = args.collect::<Vec<_>>().join(" ");

    let config = ServiceConfig::from_env();
    let store = Arc::new(JsonSettingsStore::user_default());
    log::debug!("Settings file: {}", store.path().display());

    let client = Arc::new(GeminiClient::new(&config)?);
    let capture = Arc::new(ImageFileCapture::new(vec![PathBuf::from(&image_path)]));
    let exporter = Arc::new(DirectoryExporter::new(env::current_dir()?));

    let mut controller = GenerationController::new(config, client, capture, store, exporter);
    controller.subscribe(|event| log::debug!("event: {:?}", event));

    log::info!("🖼️  Available models:");
    for (id, name) in GeminiClient::supported_models() {
        log::info!("  {} - {}", id, name);
    }

    let applied = controller.update_settings(|s| -> airender::Result<()> {
        if let Ok(style) = env::var("AIRENDER_STYLE") {
            s.select_style_template(&style)?;
        }
        if let Ok(ratio) = env::var("AIRENDER_ASPECT_RATIO") {
            s.set_aspect_ratio(&ratio)?;
        }
        if let Ok(size) = env::var("AIRENDER_IMAGE_SIZE") {
            s.set_image_size(&size)?;
        }
        // Typed words win over a preset's text.
        if !prompt.trim().is_empty() {
            s.set_prompt(prompt.as_str());
        }
        Ok(())
    });
    if let Err(e) = applied {
        log::error!("❌ {}", e);
        return Err(e.into());
    }

    let outcome = controller.capture();
    finish_step(&controller, "Capture", outcome)?;

    let outcome = controller.generate().await;
    finish_step(&controller, "Generation", outcome)?;

    let outcome = controller.save_result();
    finish_step(&controller, "Save", outcome)?;

    log::info!("🎉 {}", controller.status());
    Ok(())
}

fn finish_step(
    controller: &GenerationController,
    step: &str,
    outcome: ActionOutcome,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        ActionOutcome::Completed => {
            log::info!("✅ {}", controller.status());
            Ok(())
        }
        ActionOutcome::Denied(reason) => {
            log::error!("❌ {} not possible ({:?}): {}", step, reason, controller.status());
            Err(format!("{} denied: {:?}", step, reason).into())
        }
        ActionOutcome::Failed(e) => {
            log::error!("❌ {}", controller.status());
            Err(e.into())
        }
    }
}
