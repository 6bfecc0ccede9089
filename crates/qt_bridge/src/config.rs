use clap::Parser;
use cloudview::ViewerConfig;
use std::path::PathBuf;
use std::time::Duration;

/// `qt_bridge` - headless point-cloud viewer driven by the Qt controller.
///
/// Connects to the controller's line-based TCP endpoint, loads the point
/// clouds it sends, frames the camera on them and reports back.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Host of the Qt controller.
    #[arg(long, env = "QT_HOST", default_value = "localhost")]
    pub qt_host: String,

    /// TCP port of the Qt controller.
    #[arg(long, env = "QT_PORT", default_value_t = 12346)]
    pub qt_port: u16,

    /// Seconds to wait between reconnection attempts.
    #[arg(long, env = "QT_RETRY_SECS", default_value_t = 5)]
    pub retry_secs: u64,

    /// Give up after this many consecutive failed attempts. Unbounded when unset.
    #[arg(long, env = "QT_MAX_RECONNECT_ATTEMPTS")]
    pub max_reconnect_attempts: Option<u32>,

    /// Viewer ticks per second.
    #[arg(long, env = "VIEWER_TICK_HZ", default_value_t = 60)]
    pub tick_hz: u32,

    /// Interval of keep-alive heartbeats. 0 sends one only on connect.
    #[arg(long, env = "QT_HEARTBEAT_SECS", default_value_t = 0)]
    pub heartbeat_secs: u64,

    /// JSON file with camera and layout settings; defaults apply when unset.
    #[arg(long, env = "VIEWER_CONFIG")]
    pub viewer_config: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.qt_host, self.qt_port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_secs > 0).then(|| Duration::from_secs(self.heartbeat_secs))
    }

    pub fn load_viewer_config(&self) -> anyhow::Result<ViewerConfig> {
        let Some(path) = &self.viewer_config else {
            return Ok(ViewerConfig::default());
        };
        let text = std::fs::read_to_string(path)?;
        Ok(ViewerConfig::from_json(&text)?)
    }
}
