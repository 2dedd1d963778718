use clap::Parser;
use dns_lookup::lookup_addr;
use kadmind::{
    kadm5::{AccessControl, AclFile, MemoryDatabase},
    prefix_progname_to_error_if_needed,
    server::{Server, SharedKeyAuthenticator},
    Context,
};
use once_cell::sync::Lazy;
use std::{
    net::{Ipv6Addr, SocketAddr, TcpListener, TcpStream},
    process::ExitCode,
    sync::Arc,
    thread,
};
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

const PROGNAME: &str = "kadmind";

static ARGS: Lazy<Args> = Lazy::new(Args::parse);

#[derive(Parser)]
#[command(name = PROGNAME, version)]
struct Args {
    /// location of config file
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,
    /// location of key file
    #[arg(long = "key-file")]
    key_file: Option<String>,
    /// location of acl file
    #[arg(long = "acl-file")]
    acl_file: Option<String>,
    /// port to listen on
    #[arg(short = 'p', long)]
    port: Option<u16>,
    /// enable debug mode: serve one connection in the foreground, then exit
    #[arg(short = 'd', long, default_value_t = false)]
    debug: bool,
}

fn main() -> ExitCode {
    prefix_progname_to_error_if_needed(PROGNAME, run())
}

fn run() -> anyhow::Result<()> {
    let default_level = if ARGS.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let context = Context::init(ARGS.config_file.as_deref())?;
    let default_realm = context.get_default_realm()?;

    let key_file = ARGS
        .key_file
        .as_deref()
        .or(context.key_file.as_deref())
        .ok_or_else(|| anyhow::anyhow!("Usage: {}: no key file configured", PROGNAME))?;
    let authenticator = SharedKeyAuthenticator::from_key_file(key_file, default_realm)?;

    let acl: Arc<dyn AccessControl> = match ARGS.acl_file.as_deref().or(context.acl_file.as_deref()) {
        Some(acl_file) => Arc::new(AclFile::load(acl_file)?),
        None => {
            warn!("no acl file configured, every request will be denied");
            Arc::new(AclFile::default())
        }
    };

    let server = Arc::new(
        Server::new(Arc::new(authenticator), acl, Arc::new(MemoryDatabase::new()))
            .with_max_frame_size(context.max_frame_size),
    );

    let port = ARGS.port.unwrap_or(context.port);
    let listener = TcpListener::bind((Ipv6Addr::UNSPECIFIED, port))
        .map_err(|e| anyhow::anyhow!("{} while binding port {}", e, port))?;
    info!(port, "listening");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("accept: {}", e);
                continue;
            }
        };
        if ARGS.debug {
            handle_connection(&server, stream);
            return Ok(());
        }
        let server = Arc::clone(&server);
        thread::spawn(move || handle_connection(&server, stream));
    }
    Ok(())
}

fn handle_connection(server: &Server, stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map(|addr| peer_name(&addr))
        .unwrap_or_else(|_| "unknown".to_owned());
    let _span = info_span!("connection", peer = %peer).entered();
    info!("connection from {}", peer);
    if let Err(e) = server.serve(stream) {
        error!("{:#}", e);
    }
}

fn peer_name(addr: &SocketAddr) -> String {
    match lookup_addr(&addr.ip()) {
        Ok(host) => format!("{} ({})", host, addr.ip()),
        Err(_) => addr.ip().to_string(),
    }
}
