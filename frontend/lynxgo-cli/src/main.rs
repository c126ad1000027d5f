use anyhow::Context;
use clap::{CommandFactory, Parser};
use env_logger::Env;
use lynxgo_native_driver::config::SessionConfig;
use lynxgo_native_driver::device::{AudioOutput, GamepadPoller, Presenter};
use lynxgo_native_driver::headless::{HeadlessAudio, HeadlessPresenter, ScriptedGamepad};
use lynxgo_native_driver::{Devices, Session};
use std::path::{Path, PathBuf};
use std::process;
use testcard_core::TestcardCore;

#[derive(Debug, Parser)]
#[command(version, about = "Run a handheld ROM on the session loop")]
struct Args {
    /// ROM file path
    rom: Option<PathBuf>,

    /// BIOS file path; the core emulates the BIOS when not set
    #[arg(long)]
    bios: Option<PathBuf>,

    /// TOML file overriding session settings (axis_trim, display_width, save_directory, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run without a window or audio device and quit after this many frames
    #[arg(long)]
    headless_frames: Option<u64>,
}

impl Args {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let Some(path) = &self.config else { return Ok(SessionConfig::default()) };

        let config = SessionConfig::from_toml_file(path)?;
        log::info!("Loaded config from '{}':\n{config}", path.display());

        Ok(config)
    }

    fn emulate_bios(&self) -> bool {
        self.bios.is_none()
    }

    fn bios_path(&self) -> &Path {
        self.bios.as_deref().unwrap_or(Path::new(""))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let Some(rom_path) = args.rom.clone() else {
        println!("{}", Args::command().render_usage());
        process::exit(1);
    };

    run(&args, &rom_path)
}

fn run(args: &Args, rom_path: &Path) -> anyhow::Result<()> {
    let config = args.session_config()?;

    let core = TestcardCore::open(rom_path, args.bios_path(), args.emulate_bios())
        .with_context(|| format!("Failed to load ROM '{}'", rom_path.display()))?;

    match args.headless_frames {
        Some(frames) => {
            log::info!("Running headless for {frames} frames");
            let devices = Devices {
                presenter: HeadlessPresenter::new(config.display_size()),
                audio: HeadlessAudio::new(testcard_core::AUDIO_SAMPLE_RATE),
                gamepad: ScriptedGamepad::default().quit_after(frames),
            };
            run_session(core, devices, rom_path, &config)
        }
        None => run_windowed(core, rom_path, &config),
    }
}

#[cfg(feature = "sdl3")]
fn run_windowed(
    core: TestcardCore,
    rom_path: &Path,
    config: &SessionConfig,
) -> anyhow::Result<()> {
    lynxgo_native_driver::sdl::with_sdl3_devices(
        config,
        testcard_core::AUDIO_SAMPLE_RATE,
        |devices| run_session(core, devices, rom_path, config),
    )?
}

#[cfg(not(feature = "sdl3"))]
fn run_windowed(
    _core: TestcardCore,
    _rom_path: &Path,
    _config: &SessionConfig,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "Built without SDL3 support; pass --headless-frames <N> or rebuild with --features sdl3"
    )
}

fn run_session<P, A, G>(
    core: TestcardCore,
    devices: Devices<P, A, G>,
    rom_path: &Path,
    config: &SessionConfig,
) -> anyhow::Result<()>
where
    P: Presenter,
    A: AudioOutput,
    G: GamepadPoller,
{
    let mut session = Session::new(core, devices, rom_path, config)?;
    session.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn rom_is_optional_at_parse_time() {
        let args = Args::try_parse_from(["lynxgo"]).unwrap();
        assert!(args.rom.is_none());
        assert!(args.emulate_bios());
    }

    #[test]
    fn all_flags() {
        let args = Args::try_parse_from([
            "lynxgo",
            "game.lnx",
            "--bios",
            "lynxboot.img",
            "--config",
            "lynxgo.toml",
            "--headless-frames",
            "60",
        ])
        .unwrap();

        assert_eq!(args.rom, Some(PathBuf::from("game.lnx")));
        assert_eq!(args.bios_path(), Path::new("lynxboot.img"));
        assert!(!args.emulate_bios());
        assert_eq!(args.config, Some(PathBuf::from("lynxgo.toml")));
        assert_eq!(args.headless_frames, Some(60));
    }

    #[test]
    fn usage_names_rom_argument() {
        let usage = Args::command().render_usage().to_string();
        assert!(usage.contains("[ROM]"), "usage: {usage}");
    }

    #[test]
    fn missing_config_file_is_error() {
        let args = Args::try_parse_from(["lynxgo", "game.lnx", "--config", "/nonexistent/x.toml"])
            .unwrap();
        assert!(args.session_config().is_err());
    }
}
