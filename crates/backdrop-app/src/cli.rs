use backdrop_gpu::SurfaceOptions;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "backdrop", version, about = "Fullscreen animated shader effect")]
pub struct Cli {
    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    #[arg(long, default_value = "Backdrop")]
    pub title: String,

    /// Prefer an sRGB surface format over the platform default.
    #[arg(long)]
    pub srgb: bool,

    #[arg(long, value_enum, default_value_t = PresentMode::Fifo)]
    pub present_mode: PresentMode,

    /// Log filter in `env_logger` syntax (e.g. `debug` or `backdrop_gpu=debug`).
    #[arg(long, value_name = "FILTER", env = "BACKDROP_LOG")]
    pub log: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresentMode {
    /// Present at display refresh (vsync).
    Fifo,
    Mailbox,
    Immediate,
}

impl From<PresentMode> for wgpu::PresentMode {
    fn from(mode: PresentMode) -> Self {
        match mode {
            PresentMode::Fifo => wgpu::PresentMode::Fifo,
            PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
            PresentMode::Immediate => wgpu::PresentMode::Immediate,
        }
    }
}

impl Cli {
    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            prefer_srgb: self.srgb,
            present_mode: self.present_mode.into(),
            ..SurfaceOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_demo() {
        let cli = Cli::try_parse_from(["backdrop"]).unwrap();
        assert_eq!((cli.width, cli.height), (800, 600));
        let opts = cli.surface_options();
        assert!(!opts.prefer_srgb);
        assert_eq!(opts.present_mode, wgpu::PresentMode::Fifo);
        assert_eq!(opts.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "backdrop",
            "--width",
            "1280",
            "--height",
            "720",
            "--srgb",
            "--present-mode",
            "mailbox",
            "--log",
            "debug",
        ])
        .unwrap();
        assert_eq!((cli.width, cli.height), (1280, 720));
        assert_eq!(cli.log.as_deref(), Some("debug"));
        let opts = cli.surface_options();
        assert!(opts.prefer_srgb);
        assert_eq!(opts.present_mode, wgpu::PresentMode::Mailbox);
    }

    #[test]
    fn rejects_unknown_present_mode() {
        assert!(Cli::try_parse_from(["backdrop", "--present-mode", "vsync"]).is_err());
    }
}
