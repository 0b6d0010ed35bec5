use std::process::ExitCode;

fn main() -> ExitCode {
  match tidy_core::run(
    std::env::args_os().collect()
  ) {
    | Ok(()) => ExitCode::SUCCESS,
    | Err(err) => {
      eprintln!("tidy: {err:#}");
      ExitCode::FAILURE
    }
  }
}
