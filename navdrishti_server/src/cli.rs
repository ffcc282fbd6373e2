use std::env;

/// Handle the (deliberately tiny) command line surface. Everything interesting is configured through the
/// environment; the CLI only answers `--version` and `--help`.
pub fn handle_command_line_args() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("navdrishti_server {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!(
            "navdrishti_server {}\n\nUsage: navdrishti_server\n\nConfiguration is read from the environment \
             (see the config module docs). Key variables:\n  NVD_HOST, NVD_PORT       bind address\n  \
             NVD_DATABASE_URL         sqlite database url\n  NVD_JWT_SECRET           shared identity secret\n  \
             NVD_GATEWAY_*            payment gateway credentials\n  NVD_CARRIER_*            shipping carrier \
             credentials",
            env!("CARGO_PKG_VERSION")
        );
        std::process::exit(0);
    }
}
