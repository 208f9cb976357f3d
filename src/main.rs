fn main() -> std::process::ExitCode {
    kpiboard_lib::run()
}
