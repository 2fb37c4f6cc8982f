//! Headless viewer driver
//!
//! Replays files as if they were dropped on the window one after another,
//! pumps the frame loop until every load has been applied, and prints what
//! ended up on screen.
//!
//! Run with: cargo run -p lab_viewer -- [--config PATH] [--debug] FILE...

use std::path::PathBuf;
use std::time::Duration;

use lab_scene::{
    DebugLines, DirectionalLight, DropOverlay, HelpOverlay, OrbitCamera, Scene, SceneGraph,
};
use lab_viewer::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    debug: bool,
    files: Vec<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = iter.next().ok_or("--config needs a path")?;
                    args.config = Some(PathBuf::from(path));
                }
                "--debug" | "-d" => args.debug = true,
                "--help" | "-h" => return Err(String::new()),
                flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
                file => args.files.push(PathBuf::from(file)),
            }
        }

        Ok(args)
    }
}

fn usage() {
    eprintln!("usage: lab-viewer [--config PATH] [--debug] FILE...");
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{}", message);
            }
            usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ViewerConfig::load(args.config.as_deref())?;
    if args.debug {
        config.debug.show_bounds = true;
    }

    let mut manager = RuntimeAssetManager::new(LoaderRegistry::with_default_loaders(), &config)?;
    let gate = manager.drop_gate();

    let mut scene = Scene::new();
    let mut camera = OrbitCamera::default();
    let mut sun = DirectionalLight::default();
    let mut help = HelpOverlay::new();

    manager.start(&mut Viewport::new(&mut scene, &mut camera).with_overlay(&mut help));
    if help.is_visible() {
        print!("{}", help.text());
    }

    for file in &args.files {
        // The window refuses drags it cannot load
        if !gate.is_loadable(file) {
            log::info!("Not a loadable file: {}", file.display());
            continue;
        }
        gate.on_file_dropped(file);
    }

    loop {
        let mut viewport = Viewport::new(&mut scene, &mut camera)
            .with_light(&mut sun)
            .with_overlay(&mut help);
        manager.update(&mut viewport);

        for event in manager.drain_events() {
            log::debug!("{:?}", event);
        }

        if !manager.is_loading() {
            break;
        }
        std::thread::sleep(FRAME);
    }

    match manager.active() {
        ActiveAsset::Empty => println!("Nothing loaded"),
        ActiveAsset::Showing(asset) => {
            let nodes = scene.get(asset.id).map_or(0, |n| n.node_count());
            println!("Showing {} ({} nodes)", asset.path.display(), nodes);
            match asset.world_bounds {
                Some(bounds) => println!("  bounds: {} .. {}", bounds.min, bounds.max),
                None => println!("  bounds: none"),
            }
        }
    }

    let pose = camera.pose();
    println!(
        "  camera: focus {} zoom {:.3} theta {:.1} lambda {:.1}",
        pose.focus,
        pose.zoom,
        pose.theta.to_degrees(),
        pose.lambda.to_degrees()
    );
    println!("  shadow distance: {:.3}", sun.shadow_distance);

    if manager.debug_enabled() {
        let mut lines = DebugLines::default();
        manager.draw_debug(&mut lines);
        println!("  debug lines: {}", lines.lines.len());
    }

    Ok(())
}
