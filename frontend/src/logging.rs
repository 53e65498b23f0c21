/// Installs the console logger in the browser. On the host this is a no-op so
/// binaries and tests can bring their own `log` implementation.
pub fn init(level: log::Level) {
    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(level).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = level;
    }
}
