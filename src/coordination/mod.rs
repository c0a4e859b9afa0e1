pub mod shutdown;

pub use shutdown::{
    install_signal_handlers, shutdown_signal, GracefulShutdown, ShutdownSignal, ShutdownToken,
};
