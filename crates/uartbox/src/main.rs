use uartbox::{Options, SessionType};

fn usage() -> ! {
    eprintln!(
        "Usage: uartbox [reference|loopback] [--alt-clock] [--majority] \
         [--tx <byte>] [--rx <byte>]"
    );
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let session = args.next().unwrap_or_else(|| "reference".to_string());
    let session = match session.as_str() {
        "reference" | "ref" => SessionType::Reference,
        "loopback" | "loop" => SessionType::Loopback,
        other => {
            eprintln!("Unknown session '{}'. Supported: reference, loopback", other);
            usage();
        }
    };

    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--alt-clock" => options.alternate_clock = true,
            "--majority" => options.majority = true,
            "--tx" | "--rx" => {
                let Some(value) = args.next() else { usage() };
                let byte = match uartbox::parse_byte(&value) {
                    Ok(byte) => byte,
                    Err(err) => {
                        eprintln!("{:#}", err);
                        usage();
                    }
                };
                if arg == "--tx" {
                    options.tx_payload = Some(byte);
                } else {
                    options.rx_byte = Some(byte);
                }
            }
            _ => usage(),
        }
    }

    if let Err(err) = uartbox::run(session, options) {
        log::error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
