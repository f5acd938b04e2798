extern crate vulkano;
extern crate winit;

use keikan::error::StartupError;
use keikan::logging;
use keikan::model::terrain::Terrain;
use keikan::options::{Options, OptionsError};
use keikan::platform::window::WinitPlatform;
use keikan::platform::PlatformSurface;
use keikan::renderer::Renderer;
use keikan::shutdown::StopFlag;
use keikan::state::{self, VulkanDevice};
use keikan::world::setup::default_scene;
use keikan::world::{World, WorldConfig};
use std::process;
use std::sync::Arc;

const SEA_LEVEL: f32 = 64.0;

fn build_terrain(options: &Options) -> Result<Terrain, StartupError> {
    let (width, depth) = options.heightmap_size;
    let terrain = match &options.heightmap {
        Some(path) => Terrain::from_heightmap(path, width, depth, SEA_LEVEL)?,
        None => Terrain::generated(width, depth)?,
    };
    Ok(terrain)
}

fn run(options: Options) -> Result<(), StartupError> {
    let instance = state::create_instance()?;
    let _debug_callback = state::setup_debug_callback(&instance);

    let mut platform = WinitPlatform::create(&instance, &options.window_settings())?;
    let device = VulkanDevice::open(&instance, platform.surface(), options.statistics)?;

    let terrain = Arc::new(build_terrain(&options)?);
    let scene = Arc::new(default_scene(&terrain));
    let exit = StopFlag::new();
    let world = World::create(WorldConfig::default(), scene.clone(), terrain, exit.clone())
        .map_err(|e| StartupError::Thread("world", e))?;

    let renderer = Renderer::start(
        options.renderer_config(),
        scene,
        platform.window_extent(),
        exit.clone(),
        move || Ok(device.into_backend()),
    )
    .map_err(|e| StartupError::Thread("renderer", e))?;

    platform.event_loop(&world.input(), &exit);

    renderer.stop();
    world.destroy();
    log::info!("bye");
    Ok(())
}

fn main() {
    let options = match Options::from_args(std::env::args_os()) {
        Ok(options) => options,
        Err(e) => {
            if let (true, OptionsError::Cli(cli)) = (e.is_informational(), &e) {
                cli.exit();
            }
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = logging::init(options.log_level, options.log_config.as_deref()) {
        eprintln!("{}", e);
        process::exit(2);
    }

    if let Err(e) = run(options) {
        log::error!("{}", e);
        eprintln!("sanpo: {}", e);
        process::exit(1);
    }
}
