pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod sync;
pub mod timer;
pub mod view;
pub mod widget;

use config::WidgetConfig;

pub fn run() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("nowplaying_overlay_lib=info"),
    )
    .init();

    // Append every panic to a crash log next to the config so it survives
    // the terminal the overlay was started from.
    std::panic::set_hook(Box::new(|info| {
        use std::io::Write;
        let crash_dir = dirs::home_dir()
            .unwrap_or_default()
            .join(".nowplaying-overlay");
        let _ = std::fs::create_dir_all(&crash_dir);
        let msg = format!(
            "PANIC at {}: {}\nBacktrace:\n{}\n---\n",
            info.location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown".into()),
            info.payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("(no message)"),
            std::backtrace::Backtrace::force_capture(),
        );
        if let Ok(mut f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(crash_dir.join("crash.log"))
        {
            let _ = f.write_all(msg.as_bytes());
        }
        eprintln!("{}", msg);
    }));

    let config = WidgetConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config: {}. Using defaults.", e);
        let default_config = WidgetConfig::default();
        // Save defaults so the config file exists for next launch
        if let Err(save_err) = default_config.save() {
            log::error!("Failed to save default config: {}", save_err);
        }
        default_config
    });

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(runtime::run_headless(config)) {
        log::error!("Widget failed ({}): {}", e.kind(), e);
        std::process::exit(1);
    }
}
