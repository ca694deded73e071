use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pixelbind_core::app::LoaderConfig;
use pixelbind_core::domain::{DecodeMode, Shape, TaskState, args_from_json};
use pixelbind_core::{Image, ImageLoader, resolve_as};

#[derive(Parser)]
#[command(name = "pixelbind", version, about = "Geometry value coercion and async image loading")]
struct Cli {
    /// Loader settings (JSON). Missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a JSON argument array into a point, size, rect or scalar.
    Value {
        shape: Shape,
        /// e.g. '[{"x": 1, "y": 2}, {"width": 5, "height": 7}]'
        args: String,
        /// Print the tagged JSON form instead of the display form.
        #[arg(long)]
        json: bool,
    },
    /// Load one image through the worker pool.
    Load {
        path: PathBuf,
        /// unchanged, grayscale, color, anycolor or a numeric flag.
        #[arg(long)]
        mode: Option<DecodeMode>,
        /// Await a future instead of registering a handler.
        #[arg(long)]
        future: bool,
    },
    /// Load every frame of a multi-image file.
    Multi { path: PathBuf },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => LoaderConfig::from_path(path)?,
        None => LoaderConfig::default(),
    };

    match cli.command {
        Commands::Value { shape, args, json } => {
            let args = args_from_json(serde_json::from_str(&args)?)?;
            let value = resolve_as(shape, &args)?;
            if json {
                println!("{}", serde_json::to_string(&value)?);
            } else {
                println!("{shape} {value}");
            }
        }
        Commands::Load { path, mode, future } => {
            let (loader, mut completions) = ImageLoader::builder().config(config).build()?;
            let mode = mode.unwrap_or(loader.default_mode());

            if future {
                let fut = loader.load_image_async(path, mode);
                drop(loader);
                let dispatcher = tokio::spawn(completions.run());
                let image = fut.await?;
                print_image(&image);
                dispatcher.await?;
            } else {
                let id = loader.load_image_with(path, mode, |result| {
                    if let Ok(image) = &result {
                        print_image(image);
                    }
                    Ok(())
                });
                log::info!("scheduled {id}");
                let report = completions
                    .dispatch_next()
                    .await
                    .ok_or("completion loop closed before delivery")?;
                if report.state == TaskState::Failed {
                    return Err(report.error.unwrap_or_default().into());
                }
            }
        }
        Commands::Multi { path } => {
            let (loader, _completions) = ImageLoader::builder().config(config).build()?;
            let frames = loader.load_image_multi(&path).into_result()?;
            println!("{} frame(s)", frames.len());
            for (i, frame) in frames.iter().enumerate() {
                print!("  {i}: ");
                print_image(frame);
            }
        }
    }
    Ok(())
}

fn print_image(image: &Image) {
    println!("{} x {} x {}", image.width(), image.height(), image.channels());
}
