use std::process::ExitCode;

fn main() -> ExitCode {
    match vigild::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                target: "vigild::process",
                error = %error,
                "daemon exited with an error"
            );
            // Telemetry may not be installed when bootstrap fails early.
            eprintln!("vigild: {error}");
            ExitCode::FAILURE
        }
    }
}
