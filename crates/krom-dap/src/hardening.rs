use krom_config::{init_tracing, KromConfig};

/// Install logging and a panic hook that records panics through `tracing`
/// before the default hook runs.
///
/// Panics would otherwise only reach stderr, which a DAP client does not
/// always surface.
pub fn init(config: &KromConfig) {
    init_tracing(&config.logging);

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(target: "krom.dap", panic = %info, "krom-dap panicked");
        default_hook(info);
    }));
}
